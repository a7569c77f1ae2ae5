//! Multi-class CART decision tree.

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::dataset::Dataset;

/// Decision tree configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Maximum depth of tree
    pub max_depth: usize,
    /// Minimum samples required to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf node
    pub min_samples_leaf: usize,
    /// Maximum features to consider for split (None = all)
    pub max_features: Option<usize>,
    /// Random seed for reproducibility
    pub seed: u64,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: 12,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            seed: 42,
        }
    }
}

/// Tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeNode {
    /// Feature index for split (None for leaves)
    pub feature_idx: Option<usize>,
    /// Threshold for split
    pub threshold: Option<f64>,
    /// Class probability distribution at this node
    pub class_probs: Vec<f64>,
    /// Number of samples in this node
    pub n_samples: usize,
    /// Left child (feature <= threshold)
    pub left: Option<Box<TreeNode>>,
    /// Right child
    pub right: Option<Box<TreeNode>>,
    /// Gini impurity at this node
    pub impurity: f64,
}

impl TreeNode {
    pub fn is_leaf(&self) -> bool {
        self.left.is_none() && self.right.is_none()
    }

    pub fn depth(&self) -> usize {
        if self.is_leaf() {
            1
        } else {
            1 + self
                .left
                .as_ref()
                .map(|n| n.depth())
                .unwrap_or(0)
                .max(self.right.as_ref().map(|n| n.depth()).unwrap_or(0))
        }
    }
}

/// Multi-class decision tree.
///
/// Splits minimize weighted Gini impurity; leaves store a class
/// probability distribution derived from (optionally weighted) sample
/// counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionTree {
    config: TreeConfig,
    root: Option<TreeNode>,
    n_classes: usize,
    feature_importances: Vec<f64>,
}

impl DecisionTree {
    /// Create a new decision tree with config
    pub fn new(config: TreeConfig) -> Self {
        Self {
            config,
            root: None,
            n_classes: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Train the tree.
    ///
    /// `sample_weights` must have one entry per sample; pass uniform
    /// weights for unweighted training.
    pub fn fit(&mut self, dataset: &Dataset, n_classes: usize, sample_weights: &[f64]) {
        debug_assert_eq!(sample_weights.len(), dataset.n_samples());

        self.n_classes = n_classes;
        self.feature_importances = vec![0.0; dataset.n_features()];

        let indices: Vec<usize> = (0..dataset.n_samples()).collect();
        let mut rng = ChaCha8Rng::seed_from_u64(self.config.seed);

        self.root = Some(self.build_tree(dataset, sample_weights, &indices, 0, &mut rng));

        // Normalize feature importances
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    fn build_tree(
        &mut self,
        dataset: &Dataset,
        weights: &[f64],
        indices: &[usize],
        depth: usize,
        rng: &mut ChaCha8Rng,
    ) -> TreeNode {
        let counts = self.weighted_class_counts(dataset, weights, indices);
        let impurity = gini(&counts);

        if depth >= self.config.max_depth
            || indices.len() < self.config.min_samples_split
            || impurity < 1e-10
        {
            return self.leaf(&counts, indices.len(), impurity);
        }

        match self.find_best_split(dataset, weights, indices, impurity, rng) {
            Some(split) => {
                if split.left.len() < self.config.min_samples_leaf
                    || split.right.len() < self.config.min_samples_leaf
                {
                    return self.leaf(&counts, indices.len(), impurity);
                }

                self.feature_importances[split.feature_idx] += split.importance;

                let left = self.build_tree(dataset, weights, &split.left, depth + 1, rng);
                let right = self.build_tree(dataset, weights, &split.right, depth + 1, rng);

                TreeNode {
                    feature_idx: Some(split.feature_idx),
                    threshold: Some(split.threshold),
                    class_probs: normalize(&counts),
                    n_samples: indices.len(),
                    left: Some(Box::new(left)),
                    right: Some(Box::new(right)),
                    impurity,
                }
            }
            None => self.leaf(&counts, indices.len(), impurity),
        }
    }

    fn leaf(&self, counts: &[f64], n_samples: usize, impurity: f64) -> TreeNode {
        TreeNode {
            feature_idx: None,
            threshold: None,
            class_probs: normalize(counts),
            n_samples,
            left: None,
            right: None,
            impurity,
        }
    }

    fn weighted_class_counts(
        &self,
        dataset: &Dataset,
        weights: &[f64],
        indices: &[usize],
    ) -> Vec<f64> {
        let mut counts = vec![0.0; self.n_classes];
        for &i in indices {
            counts[dataset.labels[i]] += weights[i];
        }
        counts
    }

    fn find_best_split(
        &self,
        dataset: &Dataset,
        weights: &[f64],
        indices: &[usize],
        parent_impurity: f64,
        rng: &mut ChaCha8Rng,
    ) -> Option<BestSplit> {
        let n_features = dataset.n_features();
        let max_features = self.config.max_features.unwrap_or(n_features).min(n_features);

        let mut feature_indices: Vec<usize> = (0..n_features).collect();
        feature_indices.shuffle(rng);
        feature_indices.truncate(max_features);

        let total_weight: f64 = indices.iter().map(|&i| weights[i]).sum();
        if total_weight <= 0.0 {
            return None;
        }

        let mut best_gain = 0.0;
        let mut best: Option<BestSplit> = None;

        for &feature_idx in &feature_indices {
            let mut values: Vec<f64> = indices
                .iter()
                .map(|&i| dataset.features[i][feature_idx])
                .collect();
            values.sort_by(|a, b| a.partial_cmp(b).unwrap());
            values.dedup();

            // Midpoints between consecutive distinct values as candidates
            for window in values.windows(2) {
                let threshold = (window[0] + window[1]) / 2.0;

                let (left, right): (Vec<usize>, Vec<usize>) = indices
                    .iter()
                    .partition(|&&i| dataset.features[i][feature_idx] <= threshold);

                if left.is_empty() || right.is_empty() {
                    continue;
                }

                let left_counts = self.weighted_class_counts(dataset, weights, &left);
                let right_counts = self.weighted_class_counts(dataset, weights, &right);

                let left_weight: f64 = left_counts.iter().sum();
                let right_weight: f64 = right_counts.iter().sum();

                let weighted_impurity = (left_weight * gini(&left_counts)
                    + right_weight * gini(&right_counts))
                    / total_weight;
                let gain = parent_impurity - weighted_impurity;

                if gain > best_gain {
                    best_gain = gain;
                    best = Some(BestSplit {
                        feature_idx,
                        threshold,
                        importance: gain * total_weight,
                        left,
                        right,
                    });
                }
            }
        }

        best
    }

    /// Class probability distribution for a single sample
    pub fn predict_proba_one(&self, features: &[f64]) -> Vec<f64> {
        match &self.root {
            Some(root) => {
                let mut node = root;
                while let (Some(feature_idx), Some(threshold)) = (node.feature_idx, node.threshold)
                {
                    node = if features[feature_idx] <= threshold {
                        node.left.as_deref().unwrap()
                    } else {
                        node.right.as_deref().unwrap()
                    };
                }
                node.class_probs.clone()
            }
            None => uniform(self.n_classes),
        }
    }

    /// Predicted class index for a single sample
    pub fn predict_one(&self, features: &[f64]) -> usize {
        argmax(&self.predict_proba_one(features))
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Tree depth (0 before fitting)
    pub fn depth(&self) -> usize {
        self.root.as_ref().map(|r| r.depth()).unwrap_or(0)
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    importance: f64,
    left: Vec<usize>,
    right: Vec<usize>,
}

/// Gini impurity of a (weighted) class count vector.
fn gini(counts: &[f64]) -> f64 {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return 0.0;
    }
    1.0 - counts
        .iter()
        .map(|&c| {
            let p = c / total;
            p * p
        })
        .sum::<f64>()
}

fn normalize(counts: &[f64]) -> Vec<f64> {
    let total: f64 = counts.iter().sum();
    if total <= 0.0 {
        return uniform(counts.len());
    }
    counts.iter().map(|&c| c / total).collect()
}

fn uniform(n: usize) -> Vec<f64> {
    if n == 0 {
        return Vec::new();
    }
    vec![1.0 / n as f64; n]
}

/// Index of the largest value; ties resolve to the lower index.
pub(crate) fn argmax(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate() {
        if v > values[best] {
            best = i;
        }
    }
    best
}
