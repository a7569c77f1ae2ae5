//! Random forest classifier over multi-class decision trees.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::Dataset;
use crate::models::tree::{argmax, DecisionTree, TreeConfig};

/// Random forest configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestConfig {
    /// Number of trees in the forest
    pub n_trees: usize,
    /// Maximum depth of each tree
    pub max_depth: usize,
    /// Minimum samples to split
    pub min_samples_split: usize,
    /// Minimum samples in leaf
    pub min_samples_leaf: usize,
    /// Max features per split (sqrt of total if None)
    pub max_features: Option<usize>,
    /// Bootstrap sampling
    pub bootstrap: bool,
    /// Random seed
    pub seed: u64,
    /// Weight samples inversely to class frequency
    pub balanced_class_weights: bool,
}

impl Default for ForestConfig {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: 12,
            min_samples_split: 5,
            min_samples_leaf: 2,
            max_features: None,
            bootstrap: true,
            seed: 42,
            balanced_class_weights: true,
        }
    }
}

/// Random forest model.
///
/// Trees are trained on bootstrap samples in parallel; prediction uses
/// soft voting (mean of per-tree class distributions), so returned
/// probabilities always sum to 1.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForest {
    config: ForestConfig,
    trees: Vec<DecisionTree>,
    n_classes: usize,
    feature_names: Vec<String>,
    feature_importances: Vec<f64>,
}

impl RandomForest {
    /// Create a new random forest
    pub fn new(config: ForestConfig) -> Self {
        Self {
            config,
            trees: Vec::new(),
            n_classes: 0,
            feature_names: Vec::new(),
            feature_importances: Vec::new(),
        }
    }

    /// Train the forest.
    pub fn fit(&mut self, dataset: &Dataset, n_classes: usize) {
        self.n_classes = n_classes;
        self.feature_names = dataset.feature_names.clone();
        let n_features = dataset.n_features();

        let max_features = self
            .config
            .max_features
            .unwrap_or_else(|| (n_features as f64).sqrt().ceil() as usize);

        let weights = if self.config.balanced_class_weights {
            balanced_sample_weights(dataset, n_classes)
        } else {
            vec![1.0; dataset.n_samples()]
        };

        info!(
            trees = self.config.n_trees,
            max_depth = self.config.max_depth,
            max_features = max_features,
            balanced = self.config.balanced_class_weights,
            "Training random forest"
        );

        // Build trees in parallel; per-tree seeds derive from the forest
        // seed so training is reproducible regardless of thread order.
        let trees: Vec<DecisionTree> = (0..self.config.n_trees)
            .into_par_iter()
            .map(|i| {
                let tree_config = TreeConfig {
                    max_depth: self.config.max_depth,
                    min_samples_split: self.config.min_samples_split,
                    min_samples_leaf: self.config.min_samples_leaf,
                    max_features: Some(max_features),
                    seed: self.config.seed.wrapping_add(i as u64),
                };

                let mut tree = DecisionTree::new(tree_config);

                if self.config.bootstrap {
                    let indices =
                        dataset.bootstrap_indices(self.config.seed.wrapping_add(i as u64));
                    let sample = dataset.subset(&indices);
                    let sample_weights: Vec<f64> =
                        indices.iter().map(|&j| weights[j]).collect();
                    tree.fit(&sample, n_classes, &sample_weights);
                } else {
                    tree.fit(dataset, n_classes, &weights);
                }

                tree
            })
            .collect();

        self.trees = trees;

        // Aggregate and normalize feature importances
        self.feature_importances = vec![0.0; n_features];
        for tree in &self.trees {
            for (i, &imp) in tree.feature_importances().iter().enumerate() {
                self.feature_importances[i] += imp;
            }
        }
        let sum: f64 = self.feature_importances.iter().sum();
        if sum > 0.0 {
            for imp in &mut self.feature_importances {
                *imp /= sum;
            }
        }
    }

    /// Class probability distribution for a single sample (soft voting).
    pub fn predict_proba_one(&self, features: &[f64]) -> Vec<f64> {
        if self.trees.is_empty() {
            return vec![1.0 / self.n_classes.max(1) as f64; self.n_classes.max(1)];
        }

        let mut probs = vec![0.0; self.n_classes];
        for tree in &self.trees {
            for (k, p) in tree.predict_proba_one(features).iter().enumerate() {
                probs[k] += p;
            }
        }
        for p in &mut probs {
            *p /= self.trees.len() as f64;
        }
        probs
    }

    /// Predicted class index for a single sample
    pub fn predict_one(&self, features: &[f64]) -> usize {
        argmax(&self.predict_proba_one(features))
    }

    /// Predicted class indices for a dataset
    pub fn predict(&self, dataset: &Dataset) -> Vec<usize> {
        dataset
            .features
            .par_iter()
            .map(|row| self.predict_one(row))
            .collect()
    }

    /// Fraction of correct top-1 predictions on a dataset
    pub fn accuracy(&self, dataset: &Dataset) -> f64 {
        if dataset.n_samples() == 0 {
            return 0.0;
        }
        let correct = self
            .predict(dataset)
            .iter()
            .zip(dataset.labels.iter())
            .filter(|(pred, label)| pred == label)
            .count();
        correct as f64 / dataset.n_samples() as f64
    }

    /// Get feature importances
    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Feature names with importances, sorted descending
    pub fn feature_importance_ranking(&self) -> Vec<(&str, f64)> {
        let mut ranking: Vec<(&str, f64)> = self
            .feature_names
            .iter()
            .zip(self.feature_importances.iter())
            .map(|(n, &i)| (n.as_str(), i))
            .collect();
        ranking.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        ranking
    }

    /// Number of trees
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    /// Number of classes the forest was trained on
    pub fn n_classes(&self) -> usize {
        self.n_classes
    }
}

/// Inverse-frequency sample weights: n / (n_classes * class_count).
///
/// Rare classes get proportionally heavier samples, mirroring the
/// balanced class-weight scheme the labeling heuristics call for.
fn balanced_sample_weights(dataset: &Dataset, n_classes: usize) -> Vec<f64> {
    let mut counts = vec![0usize; n_classes];
    for &label in &dataset.labels {
        counts[label] += 1;
    }

    let n = dataset.n_samples() as f64;
    let class_weights: Vec<f64> = counts
        .iter()
        .map(|&c| {
            if c == 0 {
                0.0
            } else {
                n / (n_classes as f64 * c as f64)
            }
        })
        .collect();

    dataset
        .labels
        .iter()
        .map(|&label| class_weights[label])
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadrant_dataset() -> Dataset {
        // Four classes separable on the first two features
        let mut dataset = Dataset::new();
        for i in 0..200 {
            let x = (i % 20) as f64;
            let y = (i / 20) as f64;
            let label = match (x > 9.5, y > 4.5) {
                (false, false) => 0,
                (false, true) => 1,
                (true, false) => 2,
                (true, true) => 3,
            };
            let row = vec![x, y, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0];
            dataset.add_sample((0.0, 0.0), row, label);
        }
        dataset
    }

    fn small_config() -> ForestConfig {
        ForestConfig {
            n_trees: 15,
            max_depth: 6,
            ..Default::default()
        }
    }

    #[test]
    fn test_forest_separates_quadrants() {
        let dataset = quadrant_dataset();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&dataset, 4);

        assert_eq!(forest.n_trees(), 15);
        assert!(forest.accuracy(&dataset) > 0.9);
    }

    #[test]
    fn test_soft_voting_probabilities_sum_to_one() {
        let dataset = quadrant_dataset();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&dataset, 4);

        for row in dataset.features.iter().step_by(17) {
            let probs = forest.predict_proba_one(row);
            assert_eq!(probs.len(), 4);
            let sum: f64 = probs.iter().sum();
            assert!((sum - 1.0).abs() < 1e-9, "probabilities summed to {}", sum);
        }
    }

    #[test]
    fn test_training_is_deterministic_per_seed() {
        let dataset = quadrant_dataset();

        let mut a = RandomForest::new(small_config());
        a.fit(&dataset, 4);
        let mut b = RandomForest::new(small_config());
        b.fit(&dataset, 4);

        for row in dataset.features.iter().step_by(11) {
            assert_eq!(a.predict_proba_one(row), b.predict_proba_one(row));
        }
        assert_eq!(a.feature_importances(), b.feature_importances());
    }

    #[test]
    fn test_feature_importances_concentrate_on_informative_features() {
        let dataset = quadrant_dataset();
        let mut forest = RandomForest::new(small_config());
        forest.fit(&dataset, 4);

        let importances = forest.feature_importances();
        let informative = importances[0] + importances[1];
        assert!(informative > 0.95, "importances: {:?}", importances);

        let ranking = forest.feature_importance_ranking();
        assert!(ranking[0].0 == "nearby_cafes" || ranking[0].0 == "nearby_groceries");
    }

    #[test]
    fn test_balanced_weights_inverse_to_frequency() {
        let mut dataset = Dataset::new();
        for i in 0..10 {
            let row = vec![0.0; 8];
            dataset.add_sample((0.0, 0.0), row, if i < 8 { 0 } else { 1 });
        }

        let weights = balanced_sample_weights(&dataset, 2);
        // 10 / (2 * 8) = 0.625 for the common class, 10 / (2 * 2) = 2.5 for the rare one
        assert!((weights[0] - 0.625).abs() < 1e-12);
        assert!((weights[9] - 2.5).abs() < 1e-12);
    }
}
