//! Serialized model pipeline: scaler + forest + label encoding.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;
use tracing::info;

use crate::feature_extractor::FeatureVector;
use crate::models::forest::RandomForest;
use crate::models::scaler::StandardScaler;
use crate::models::tree::argmax;
use crate::types::DevelopmentType;

/// Provenance recorded alongside the fitted pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    /// When the pipeline was trained
    pub trained_at: DateTime<Utc>,
    /// Samples in the training split
    pub n_train_samples: usize,
    /// Held-out accuracy at training time
    pub test_accuracy: f64,
}

/// The single model artifact the service loads at startup.
///
/// Versionless and read-only once loaded; replacing it means rerunning the
/// offline pipeline and restarting the service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelPipeline {
    pub scaler: StandardScaler,
    pub forest: RandomForest,
    /// Class labels in probability-vector order
    pub classes: Vec<DevelopmentType>,
    pub metadata: ArtifactMetadata,
}

/// Output of running the pipeline on one feature vector.
#[derive(Debug, Clone)]
pub struct Classification {
    pub label: DevelopmentType,
    /// Per-class probabilities, ordered like `ModelPipeline::classes`
    pub probabilities: Vec<f64>,
}

impl ModelPipeline {
    /// Standardize and classify one feature vector.
    pub fn classify(&self, features: &FeatureVector) -> Classification {
        let row = self.scaler.transform(&features.to_vec());
        let probabilities = self.forest.predict_proba_one(&row);
        let label = self.classes[argmax(&probabilities)];

        Classification {
            label,
            probabilities,
        }
    }

    /// Serialize the fitted pipeline to disk.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path)
            .with_context(|| format!("Failed to create model artifact at {}", path.display()))?;
        serde_json::to_writer(BufWriter::new(file), self)
            .context("Failed to serialize model pipeline")?;

        info!(path = %path.display(), "Model pipeline saved");
        Ok(())
    }

    /// Load a fitted pipeline from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| {
            format!(
                "Failed to open model artifact at {} (run generate_data and train_model first)",
                path.display()
            )
        })?;

        let pipeline: ModelPipeline = serde_json::from_reader(BufReader::new(file))
            .context("Failed to deserialize model pipeline")?;

        info!(
            path = %path.display(),
            trees = pipeline.forest.n_trees(),
            classes = pipeline.classes.len(),
            trained_at = %pipeline.metadata.trained_at,
            test_accuracy = pipeline.metadata.test_accuracy,
            "Model pipeline loaded"
        );

        Ok(pipeline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::models::forest::ForestConfig;

    fn fitted_pipeline() -> ModelPipeline {
        let mut dataset = Dataset::new();
        for i in 0..80 {
            let x = i as f64;
            let label = if x > 39.5 { 1 } else { 0 };
            dataset.add_sample((0.0, 0.0), vec![x, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0], label);
        }

        let scaler = StandardScaler::fit(&dataset.features);
        let standardized = Dataset {
            coords: dataset.coords.clone(),
            features: scaler.transform_matrix(&dataset.features),
            labels: dataset.labels.clone(),
            feature_names: dataset.feature_names.clone(),
        };

        let mut forest = RandomForest::new(ForestConfig {
            n_trees: 10,
            max_depth: 4,
            ..Default::default()
        });
        forest.fit(&standardized, DevelopmentType::COUNT);

        ModelPipeline {
            scaler,
            forest,
            classes: DevelopmentType::ALL.to_vec(),
            metadata: ArtifactMetadata {
                trained_at: Utc::now(),
                n_train_samples: 80,
                test_accuracy: 1.0,
            },
        }
    }

    #[test]
    fn test_classify_returns_full_distribution() {
        let pipeline = fitted_pipeline();
        let features = FeatureVector::from_slice(&[70.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);

        let result = pipeline.classify(&features);
        assert_eq!(result.probabilities.len(), DevelopmentType::COUNT);
        let sum: f64 = result.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert_eq!(result.label, DevelopmentType::Clinic); // class index 1
    }

    #[test]
    fn test_save_load_roundtrip_preserves_predictions() {
        let pipeline = fitted_pipeline();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");

        pipeline.save(&path).unwrap();
        let loaded = ModelPipeline::load(&path).unwrap();

        for x in [0.0, 10.0, 41.0, 79.0] {
            let features = FeatureVector::from_slice(&[x, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]);
            let a = pipeline.classify(&features);
            let b = loaded.classify(&features);
            assert_eq!(a.label, b.label);
            assert_eq!(a.probabilities, b.probabilities);
        }
    }

    #[test]
    fn test_load_missing_artifact_is_an_error() {
        let result = ModelPipeline::load("/nonexistent/model.json");
        assert!(result.is_err());
    }
}
