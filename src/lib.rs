//! Site Recommender Library
//!
//! Predicts a recommended urban development type (Café, Park, Clinic,
//! Residential) for a clicked map location, backed by a random-forest
//! pipeline trained on synthetic spatial data.

pub mod cache;
pub mod config;
pub mod dataset;
pub mod feature_extractor;
pub mod generator;
pub mod geo;
pub mod metrics;
pub mod models;
pub mod predictor;
pub mod server;
pub mod types;

pub use cache::FeatureCache;
pub use config::AppConfig;
pub use dataset::Dataset;
pub use feature_extractor::{FeatureExtractor, FeatureVector};
pub use generator::DatasetGenerator;
pub use geo::CityBounds;
pub use models::pipeline::ModelPipeline;
pub use predictor::PredictionService;
pub use types::{DevelopmentType, PredictRequest, Prediction};
