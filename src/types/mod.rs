//! Type definitions for the site recommendation service

pub mod prediction;
pub mod request;

pub use prediction::{DevelopmentType, Prediction};
pub use request::PredictRequest;
