//! Prediction response types and the development-type label set

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::feature_extractor::FeatureVector;

/// The recommended development types the classifier can emit.
///
/// Variant order matches the label encoding used at training time, so an
/// index into a probability vector maps directly onto a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DevelopmentType {
    #[serde(rename = "Café")]
    Cafe,
    Clinic,
    Park,
    Residential,
}

impl DevelopmentType {
    /// All classes, in label-encoding order.
    pub const ALL: [DevelopmentType; 4] = [
        DevelopmentType::Cafe,
        DevelopmentType::Clinic,
        DevelopmentType::Park,
        DevelopmentType::Residential,
    ];

    /// Number of classes the classifier distinguishes.
    pub const COUNT: usize = 4;

    pub fn as_str(&self) -> &'static str {
        match self {
            DevelopmentType::Cafe => "Café",
            DevelopmentType::Clinic => "Clinic",
            DevelopmentType::Park => "Park",
            DevelopmentType::Residential => "Residential",
        }
    }

    pub fn as_index(&self) -> usize {
        Self::ALL.iter().position(|c| c == self).unwrap_or(0)
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl fmt::Display for DevelopmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DevelopmentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Café" | "Cafe" => Ok(DevelopmentType::Cafe),
            "Clinic" => Ok(DevelopmentType::Clinic),
            "Park" => Ok(DevelopmentType::Park),
            "Residential" => Ok(DevelopmentType::Residential),
            other => Err(format!("unknown development type: {}", other)),
        }
    }
}

/// Structured response for a single prediction request.
///
/// Constructed per request, never persisted. Field layout follows the shape
/// the map front end renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prediction {
    /// Top-1 recommended development type
    pub prediction: DevelopmentType,

    /// Per-class confidence, keyed by label; values sum to 1.0
    pub confidence_scores: BTreeMap<String, f64>,

    /// Human-readable summary of why the label was recommended
    pub why: String,

    /// Feature values the classifier saw for this location
    pub features: FeatureVector,

    /// Features the model weighs most heavily, with their values
    pub dominant_features: Vec<String>,
}
