//! Offline training flow: split, standardize, fit, evaluate, package.

use anyhow::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::dataset::Dataset;
use crate::models::forest::{ForestConfig, RandomForest};
use crate::models::pipeline::{ArtifactMetadata, ModelPipeline};
use crate::models::scaler::StandardScaler;
use crate::types::DevelopmentType;

/// Trainer parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingConfig {
    /// Held-out fraction for the single train/test split
    pub test_ratio: f64,
    /// Split seed (forest seed lives in `forest`)
    pub seed: u64,
    pub forest: ForestConfig,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            test_ratio: 0.2,
            seed: 42,
            forest: ForestConfig::default(),
        }
    }
}

/// Per-class evaluation row.
#[derive(Debug, Clone, Serialize)]
pub struct ClassReport {
    pub label: DevelopmentType,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub support: usize,
}

/// Evaluation summary from the held-out split.
#[derive(Debug, Clone, Serialize)]
pub struct TrainingReport {
    pub accuracy: f64,
    pub per_class: Vec<ClassReport>,
    pub n_train: usize,
    pub n_test: usize,
}

impl TrainingReport {
    /// Render the report as a classification table.
    pub fn to_table(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!(
            "{:<14} {:>9} {:>9} {:>9} {:>9}\n",
            "", "precision", "recall", "f1-score", "support"
        ));
        for row in &self.per_class {
            out.push_str(&format!(
                "{:<14} {:>9.2} {:>9.2} {:>9.2} {:>9}\n",
                row.label.as_str(),
                row.precision,
                row.recall,
                row.f1,
                row.support
            ));
        }
        out.push_str(&format!(
            "\n{:<14} {:>9.4} ({} test samples)\n",
            "accuracy", self.accuracy, self.n_test
        ));
        out
    }
}

/// Train a pipeline on the dataset and evaluate it on a held-out split.
///
/// Deterministic: the same dataset and config always produce the same
/// fitted pipeline and the same report.
pub fn train(dataset: &Dataset, config: &TrainingConfig) -> Result<(ModelPipeline, TrainingReport)> {
    if dataset.n_samples() == 0 {
        anyhow::bail!("Cannot train on an empty dataset");
    }

    let split = dataset.stratified_split(config.test_ratio, config.seed);
    info!(
        train = split.train.n_samples(),
        test = split.test.n_samples(),
        "Dataset split"
    );

    // Fit the scaler on the training split only, then standardize both
    let scaler = StandardScaler::fit(&split.train.features);
    let train_std = standardize(&split.train, &scaler);
    let test_std = standardize(&split.test, &scaler);

    let mut forest = RandomForest::new(config.forest.clone());
    forest.fit(&train_std, DevelopmentType::COUNT);

    let report = evaluate(&forest, &test_std, split.train.n_samples());
    info!(accuracy = report.accuracy, "Evaluation complete");

    let pipeline = ModelPipeline {
        scaler,
        forest,
        classes: DevelopmentType::ALL.to_vec(),
        metadata: ArtifactMetadata {
            trained_at: Utc::now(),
            n_train_samples: split.train.n_samples(),
            test_accuracy: report.accuracy,
        },
    };

    Ok((pipeline, report))
}

fn standardize(dataset: &Dataset, scaler: &StandardScaler) -> Dataset {
    Dataset {
        coords: dataset.coords.clone(),
        features: scaler.transform_matrix(&dataset.features),
        labels: dataset.labels.clone(),
        feature_names: dataset.feature_names.clone(),
    }
}

fn evaluate(forest: &RandomForest, test: &Dataset, n_train: usize) -> TrainingReport {
    let predictions = forest.predict(test);

    let mut true_positives = [0usize; DevelopmentType::COUNT];
    let mut predicted = [0usize; DevelopmentType::COUNT];
    let mut actual = [0usize; DevelopmentType::COUNT];

    let mut correct = 0usize;
    for (&pred, &label) in predictions.iter().zip(test.labels.iter()) {
        predicted[pred] += 1;
        actual[label] += 1;
        if pred == label {
            true_positives[pred] += 1;
            correct += 1;
        }
    }

    let per_class = DevelopmentType::ALL
        .iter()
        .map(|&class| {
            let k = class.as_index();
            let precision = ratio(true_positives[k], predicted[k]);
            let recall = ratio(true_positives[k], actual[k]);
            let f1 = if precision + recall > 0.0 {
                2.0 * precision * recall / (precision + recall)
            } else {
                0.0
            };
            ClassReport {
                label: class,
                precision,
                recall,
                f1,
                support: actual[k],
            }
        })
        .collect();

    TrainingReport {
        accuracy: if test.n_samples() > 0 {
            correct as f64 / test.n_samples() as f64
        } else {
            0.0
        },
        per_class,
        n_train,
        n_test: test.n_samples(),
    }
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}
