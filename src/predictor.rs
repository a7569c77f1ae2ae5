//! Prediction service: validates a coordinate, resolves its features
//! through the cache and maps classifier output to a structured response.

use anyhow::Result;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

use crate::cache::FeatureCache;
use crate::config::AppConfig;
use crate::feature_extractor::{FeatureExtractor, FeatureVector, FEATURE_NAMES};
use crate::geo::{CityBounds, CoordinateError, RoundedCoord};
use crate::metrics::ServiceMetrics;
use crate::models::pipeline::ModelPipeline;
use crate::types::{DevelopmentType, Prediction};

/// Request handler around the loaded model pipeline.
///
/// The pipeline is immutable after load and shared across requests; the
/// feature cache is the only shared mutable state.
pub struct PredictionService {
    bounds: CityBounds,
    precision: u32,
    extractor: FeatureExtractor,
    cache: FeatureCache,
    pipeline: ModelPipeline,
    metrics: Arc<ServiceMetrics>,
}

impl PredictionService {
    /// Build the service from configuration, loading the model artifact.
    pub fn new(config: &AppConfig, metrics: Arc<ServiceMetrics>) -> Result<Self> {
        let pipeline = ModelPipeline::load(&config.model.artifact_path)?;
        Self::from_parts(config.city, &config.cache, pipeline, metrics)
    }

    /// Build the service from already-loaded parts.
    pub fn from_parts(
        bounds: CityBounds,
        cache_config: &crate::cache::CacheConfig,
        pipeline: ModelPipeline,
        metrics: Arc<ServiceMetrics>,
    ) -> Result<Self> {
        let extractor = FeatureExtractor::new(bounds);
        if pipeline.scaler.n_features() != extractor.feature_count() {
            anyhow::bail!(
                "Model artifact expects {} features but the extractor produces {}",
                pipeline.scaler.n_features(),
                extractor.feature_count()
            );
        }
        if pipeline.classes.len() != DevelopmentType::COUNT {
            anyhow::bail!(
                "Model artifact carries {} classes, expected {}",
                pipeline.classes.len(),
                DevelopmentType::COUNT
            );
        }

        Ok(Self {
            bounds,
            precision: cache_config.precision,
            extractor,
            cache: FeatureCache::new(cache_config),
            pipeline,
            metrics,
        })
    }

    /// Produce a recommendation for a clicked location.
    pub fn predict(&self, lat: f64, lon: f64) -> Result<Prediction, CoordinateError> {
        let start_time = Instant::now();

        if let Err(e) = self.bounds.validate(lat, lon) {
            self.metrics.record_rejection();
            return Err(e);
        }

        let key = RoundedCoord::new(lat, lon, self.precision);
        let (features, cache_hit) = self
            .cache
            .get_or_compute(key, || self.extractor.extract(key));
        self.metrics.record_cache_lookup(cache_hit);

        let classification = self.pipeline.classify(&features);

        let confidence_scores: BTreeMap<String, f64> = self
            .pipeline
            .classes
            .iter()
            .zip(classification.probabilities.iter())
            .map(|(class, &p)| (class.as_str().to_string(), p))
            .collect();

        let top_confidence = confidence_scores
            .get(classification.label.as_str())
            .copied()
            .unwrap_or(0.0);

        let prediction = Prediction {
            prediction: classification.label,
            why: explain(classification.label, &features),
            dominant_features: self.dominant_features(&features),
            confidence_scores,
            features,
        };

        let elapsed = start_time.elapsed();
        self.metrics
            .record_prediction(elapsed, classification.label.as_str(), top_confidence);

        debug!(
            lat = key.latitude(),
            lon = key.longitude(),
            label = %classification.label,
            confidence = top_confidence,
            cache_hit = cache_hit,
            processing_time_us = elapsed.as_micros(),
            "Prediction served"
        );

        Ok(prediction)
    }

    /// The model's two most important features, with this location's values.
    fn dominant_features(&self, features: &FeatureVector) -> Vec<String> {
        let row = features.to_vec();
        self.pipeline
            .forest
            .feature_importance_ranking()
            .iter()
            .take(2)
            .filter_map(|(name, _)| {
                FEATURE_NAMES
                    .iter()
                    .position(|n| n == name)
                    .map(|idx| format!("{}={}", name, row[idx]))
            })
            .collect()
    }

    /// Number of cached feature entries (exposed for tests and logs).
    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }
}

/// Human-readable summary of the recommendation and the features behind it.
fn explain(label: DevelopmentType, features: &FeatureVector) -> String {
    format!(
        "Recommended '{}' based on nearby features: cafes={}, groceries={}, schools={}, \
         houses={}, parks={}, clinics={}, foot traffic={}, dist. to road={:.0}m.",
        label,
        features.nearby_cafes,
        features.nearby_groceries,
        features.nearby_schools,
        features.nearby_houses,
        features.nearby_parks,
        features.nearby_clinics,
        features.foot_traffic_score,
        features.distance_to_main_road
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cache::CacheConfig;
    use crate::generator::{DatasetGenerator, GeneratorConfig};
    use crate::models::forest::ForestConfig;
    use crate::models::trainer::{train, TrainingConfig};

    pub(crate) fn test_service() -> PredictionService {
        let bounds = CityBounds::default();
        let dataset = DatasetGenerator::new(
            bounds,
            GeneratorConfig {
                seed: 42,
                grid_spacing: 0.001,
            },
        )
        .generate();

        let config = TrainingConfig {
            test_ratio: 0.2,
            seed: 42,
            forest: ForestConfig {
                n_trees: 15,
                max_depth: 8,
                ..Default::default()
            },
        };
        let (pipeline, _) = train(&dataset, &config).unwrap();

        PredictionService::from_parts(
            bounds,
            &CacheConfig::default(),
            pipeline,
            Arc::new(ServiceMetrics::new()),
        )
        .unwrap()
    }

    #[test]
    fn test_confidences_sum_to_one_across_the_grid() {
        let service = test_service();
        let bounds = CityBounds::default();

        for (lat, lon) in bounds.grid_points(0.004) {
            let prediction = service.predict(lat, lon).unwrap();
            assert_eq!(prediction.confidence_scores.len(), DevelopmentType::COUNT);
            let sum: f64 = prediction.confidence_scores.values().sum();
            assert!((sum - 1.0).abs() < 1e-9, "confidence sum was {}", sum);
        }
    }

    #[test]
    fn test_identical_requests_get_identical_responses() {
        let service = test_service();

        let first = service.predict(4.2201, 73.5399).unwrap();
        let second = service.predict(4.2201, 73.5399).unwrap();

        let a = serde_json::to_string(&first).unwrap();
        let b = serde_json::to_string(&second).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_top_class_matches_highest_confidence() {
        let service = test_service();
        let prediction = service.predict(4.2395, 73.5360).unwrap();

        let top_label = prediction.prediction.as_str();
        let top_score = prediction.confidence_scores[top_label];
        for score in prediction.confidence_scores.values() {
            assert!(top_score >= *score - 1e-12);
        }
    }

    #[test]
    fn test_out_of_bounds_is_rejected() {
        let service = test_service();

        let err = service.predict(5.0, 73.54).unwrap_err();
        assert!(matches!(err, CoordinateError::OutOfBounds { .. }));

        let err = service.predict(4.22, f64::NAN).unwrap_err();
        assert_eq!(err, CoordinateError::NotFinite);
    }

    #[test]
    fn test_explanation_mentions_label_and_features() {
        let service = test_service();
        let prediction = service.predict(4.2250, 73.5400).unwrap();

        assert!(prediction.why.contains(prediction.prediction.as_str()));
        assert!(prediction.why.contains("foot traffic="));
        assert_eq!(prediction.dominant_features.len(), 2);
    }

    #[test]
    fn test_cache_fills_on_distinct_requests() {
        let service = test_service();
        service.predict(4.2201, 73.5399).unwrap();
        service.predict(4.2201, 73.5399).unwrap();
        service.predict(4.2301, 73.5399).unwrap();
        assert_eq!(service.cache_len(), 2);
    }
}
