//! Feature standardization (z-score).

use serde::{Deserialize, Serialize};

/// Standard scaler fitted on the training split.
///
/// Stores per-feature mean and standard deviation; near-constant features
/// (std below epsilon) pass through unshifted in scale.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

const STD_EPSILON: f64 = 1e-10;

impl StandardScaler {
    /// Fit scaling parameters on a feature matrix.
    pub fn fit(features: &[Vec<f64>]) -> Self {
        let n_samples = features.len();
        let n_features = features.first().map(|row| row.len()).unwrap_or(0);

        let mut means = vec![0.0; n_features];
        let mut stds = vec![1.0; n_features];

        if n_samples == 0 {
            return Self { means, stds };
        }

        for j in 0..n_features {
            let mean = features.iter().map(|row| row[j]).sum::<f64>() / n_samples as f64;
            let variance = features
                .iter()
                .map(|row| (row[j] - mean).powi(2))
                .sum::<f64>()
                / n_samples as f64;

            means[j] = mean;
            stds[j] = variance.sqrt();
        }

        Self { means, stds }
    }

    /// Standardize a single feature row.
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .map(|(j, &v)| {
                let std = self.stds.get(j).copied().unwrap_or(1.0);
                let mean = self.means.get(j).copied().unwrap_or(0.0);
                if std > STD_EPSILON {
                    (v - mean) / std
                } else {
                    v - mean
                }
            })
            .collect()
    }

    /// Standardize a whole feature matrix.
    pub fn transform_matrix(&self, features: &[Vec<f64>]) -> Vec<Vec<f64>> {
        features.iter().map(|row| self.transform(row)).collect()
    }

    /// Number of features the scaler was fitted on.
    pub fn n_features(&self) -> usize {
        self.means.len()
    }
}
