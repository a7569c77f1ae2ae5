//! Labeled sample container for training and evaluation.

use anyhow::{Context, Result};
use rand::seq::SliceRandom;
use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::feature_extractor::FEATURE_NAMES;
use crate::types::DevelopmentType;

/// Labeled dataset: one coordinate, feature row and class index per sample.
///
/// Immutable once generated; persisted as a flat CSV file with latitude,
/// longitude, the feature columns and the label name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Dataset {
    /// Sample coordinates (latitude, longitude)
    pub coords: Vec<(f64, f64)>,
    /// Feature matrix (n_samples x n_features)
    pub features: Vec<Vec<f64>>,
    /// Class indices into [`DevelopmentType::ALL`]
    pub labels: Vec<usize>,
    /// Feature names
    pub feature_names: Vec<String>,
}

/// Train/test split result
pub struct Split {
    pub train: Dataset,
    pub test: Dataset,
}

impl Dataset {
    /// Create a new empty dataset with the standard feature columns.
    pub fn new() -> Self {
        Self {
            coords: Vec::new(),
            features: Vec::new(),
            labels: Vec::new(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Number of samples
    pub fn n_samples(&self) -> usize {
        self.features.len()
    }

    /// Number of features
    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Add a sample
    pub fn add_sample(&mut self, coord: (f64, f64), features: Vec<f64>, label: usize) {
        assert_eq!(features.len(), self.feature_names.len());
        self.coords.push(coord);
        self.features.push(features);
        self.labels.push(label);
    }

    /// Sample counts per class, indexed like [`DevelopmentType::ALL`].
    pub fn class_counts(&self) -> [usize; DevelopmentType::COUNT] {
        let mut counts = [0usize; DevelopmentType::COUNT];
        for &label in &self.labels {
            if label < counts.len() {
                counts[label] += 1;
            }
        }
        counts
    }

    /// Create a subset of the dataset by indices
    pub fn subset(&self, indices: &[usize]) -> Dataset {
        Dataset {
            coords: indices.iter().map(|&i| self.coords[i]).collect(),
            features: indices.iter().map(|&i| self.features[i].clone()).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
            feature_names: self.feature_names.clone(),
        }
    }

    /// Bootstrap sample indices (random draw with replacement)
    pub fn bootstrap_indices(&self, seed: u64) -> Vec<usize> {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let n = self.n_samples();
        (0..n).map(|_| rng.gen_range(0..n)).collect()
    }

    /// Stratified train/test split.
    ///
    /// Shuffles and splits each class separately so the test set preserves
    /// class proportions even with heavily imbalanced labels.
    pub fn stratified_split(&self, test_ratio: f64, seed: u64) -> Split {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut train_indices = Vec::new();
        let mut test_indices = Vec::new();

        for class in 0..DevelopmentType::COUNT {
            let mut class_indices: Vec<usize> = (0..self.n_samples())
                .filter(|&i| self.labels[i] == class)
                .collect();
            class_indices.shuffle(&mut rng);

            let test_size = (class_indices.len() as f64 * test_ratio).round() as usize;
            test_indices.extend_from_slice(&class_indices[..test_size]);
            train_indices.extend_from_slice(&class_indices[test_size..]);
        }

        // Re-shuffle so neither split is ordered by class
        train_indices.shuffle(&mut rng);
        test_indices.shuffle(&mut rng);

        Split {
            train: self.subset(&train_indices),
            test: self.subset(&test_indices),
        }
    }

    /// Save to CSV file
    pub fn save_csv(&self, path: &Path) -> Result<()> {
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("Failed to create {}", path.display()))?;

        let mut header = vec!["latitude".to_string(), "longitude".to_string()];
        header.extend(self.feature_names.clone());
        header.push("label".to_string());
        writer.write_record(&header)?;

        for i in 0..self.n_samples() {
            let (lat, lon) = self.coords[i];
            let mut row = vec![format!("{:.5}", lat), format!("{:.5}", lon)];
            row.extend(self.features[i].iter().map(|v| v.to_string()));
            let label = DevelopmentType::from_index(self.labels[i])
                .map(|c| c.as_str())
                .unwrap_or("Residential");
            row.push(label.to_string());
            writer.write_record(&row)?;
        }

        writer.flush()?;
        Ok(())
    }

    /// Load from CSV file
    pub fn load_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open {}", path.display()))?;

        let headers: Vec<String> = reader.headers()?.iter().map(|s| s.to_string()).collect();
        // latitude, longitude, <features...>, label
        if headers.len() < 4 {
            anyhow::bail!("Dataset file {} has too few columns", path.display());
        }
        let n_features = headers.len() - 3;
        let feature_names: Vec<String> = headers[2..2 + n_features].to_vec();

        let mut dataset = Dataset {
            coords: Vec::new(),
            features: Vec::new(),
            labels: Vec::new(),
            feature_names,
        };

        for result in reader.records() {
            let record = result?;

            let lat: f64 = record.get(0).unwrap_or("0").parse().unwrap_or(0.0);
            let lon: f64 = record.get(1).unwrap_or("0").parse().unwrap_or(0.0);

            // Missing feature values fall back to 0, matching the simple
            // imputation applied before training.
            let row: Vec<f64> = (0..n_features)
                .map(|j| record.get(2 + j).unwrap_or("0").parse().unwrap_or(0.0))
                .collect();

            let label_name = record.get(2 + n_features).unwrap_or("Residential");
            let label = label_name
                .parse::<DevelopmentType>()
                .map_err(|e| anyhow::anyhow!(e))?
                .as_index();

            dataset.coords.push((lat, lon));
            dataset.features.push(row);
            dataset.labels.push(label);
        }

        Ok(dataset)
    }
}

impl Default for Dataset {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_dataset() -> Dataset {
        let mut dataset = Dataset::new();
        for i in 0..40 {
            let label = i % 4;
            let row = vec![i as f64, 1.0, 0.0, 5.0, 1.0, 0.0, 50.0, 100.0];
            dataset.add_sample((4.21 + i as f64 * 1e-4, 73.54), row, label);
        }
        dataset
    }

    #[test]
    fn test_dataset_accessors() {
        let dataset = sample_dataset();
        assert_eq!(dataset.n_samples(), 40);
        assert_eq!(dataset.n_features(), 8);
        assert_eq!(dataset.class_counts(), [10, 10, 10, 10]);
    }

    #[test]
    fn test_stratified_split_preserves_proportions() {
        let dataset = sample_dataset();
        let split = dataset.stratified_split(0.2, 42);

        assert_eq!(split.test.n_samples(), 8);
        assert_eq!(split.train.n_samples(), 32);
        assert_eq!(split.test.class_counts(), [2, 2, 2, 2]);
        assert_eq!(split.train.class_counts(), [8, 8, 8, 8]);
    }

    #[test]
    fn test_stratified_split_is_deterministic() {
        let dataset = sample_dataset();
        let a = dataset.stratified_split(0.2, 7);
        let b = dataset.stratified_split(0.2, 7);
        assert_eq!(a.train.features, b.train.features);
        assert_eq!(a.test.labels, b.test.labels);
    }

    #[test]
    fn test_bootstrap_indices_are_seeded() {
        let dataset = sample_dataset();
        assert_eq!(dataset.bootstrap_indices(3), dataset.bootstrap_indices(3));
        assert_ne!(dataset.bootstrap_indices(3), dataset.bootstrap_indices(4));
    }

    #[test]
    fn test_csv_roundtrip() {
        let dataset = sample_dataset();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("samples.csv");
        dataset.save_csv(&path).unwrap();

        let loaded = Dataset::load_csv(&path).unwrap();
        assert_eq!(loaded.n_samples(), dataset.n_samples());
        assert_eq!(loaded.labels, dataset.labels);
        assert_eq!(loaded.feature_names, dataset.feature_names);
        assert_eq!(loaded.features, dataset.features);
    }
}
