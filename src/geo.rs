//! City geometry: serving bounds, coordinate validation, grid iteration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors produced when validating a requested coordinate.
#[derive(Debug, Error, PartialEq)]
pub enum CoordinateError {
    #[error("coordinate ({lat}, {lon}) is outside the serving area")]
    OutOfBounds { lat: f64, lon: f64 },

    #[error("coordinate contains a non-finite value")]
    NotFinite,
}

/// Rectangular serving region for a single city.
///
/// Defaults to the Hulhumalé bounds the dataset was generated for.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CityBounds {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl Default for CityBounds {
    fn default() -> Self {
        // Hulhumalé: southern/northern then western/eastern boundaries
        Self {
            min_lat: 4.2090,
            max_lat: 4.2400,
            min_lon: 73.5350,
            max_lon: 73.5450,
        }
    }
}

impl CityBounds {
    /// Validate a raw lat/lon pair against the serving area.
    pub fn validate(&self, lat: f64, lon: f64) -> Result<(), CoordinateError> {
        if !lat.is_finite() || !lon.is_finite() {
            return Err(CoordinateError::NotFinite);
        }
        if lat < self.min_lat || lat > self.max_lat || lon < self.min_lon || lon > self.max_lon {
            return Err(CoordinateError::OutOfBounds { lat, lon });
        }
        Ok(())
    }

    /// Normalize a coordinate into the unit square spanned by the bounds.
    pub fn normalize(&self, lat: f64, lon: f64) -> (f64, f64) {
        (
            (lat - self.min_lat) / (self.max_lat - self.min_lat),
            (lon - self.min_lon) / (self.max_lon - self.min_lon),
        )
    }

    /// Geographic center of the serving area.
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lon + self.max_lon) / 2.0,
        )
    }

    /// Euclidean distance (in degrees) from the center of the area.
    pub fn distance_from_center(&self, lat: f64, lon: f64) -> f64 {
        let (center_lat, center_lon) = self.center();
        ((lat - center_lat).powi(2) + (lon - center_lon).powi(2)).sqrt()
    }

    /// Latitude span in degrees.
    pub fn lat_span(&self) -> f64 {
        self.max_lat - self.min_lat
    }

    /// Longitude span in degrees.
    pub fn lon_span(&self) -> f64 {
        self.max_lon - self.min_lon
    }

    /// Generate a regular grid of points covering the bounds.
    ///
    /// Spacing is in degrees; 0.0005 is roughly 50 meters at the equator.
    pub fn grid_points(&self, spacing: f64) -> Vec<(f64, f64)> {
        let mut points = Vec::new();
        let mut lat = self.min_lat;
        while lat <= self.max_lat {
            let mut lon = self.min_lon;
            while lon <= self.max_lon {
                points.push((lat, lon));
                lon += spacing;
            }
            lat += spacing;
        }
        points
    }
}

/// A coordinate snapped to a fixed decimal precision.
///
/// Nearby requests collapse onto the same key, which makes it usable both
/// as the cache key and as the seed source for deterministic feature
/// extraction. Stored as scaled integers so equality and hashing are exact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RoundedCoord {
    scaled_lat: i64,
    scaled_lon: i64,
    precision: u32,
}

impl RoundedCoord {
    pub fn new(lat: f64, lon: f64, precision: u32) -> Self {
        let factor = 10f64.powi(precision as i32);
        Self {
            scaled_lat: (lat * factor).round() as i64,
            scaled_lon: (lon * factor).round() as i64,
            precision,
        }
    }

    pub fn latitude(&self) -> f64 {
        self.scaled_lat as f64 / 10f64.powi(self.precision as i32)
    }

    pub fn longitude(&self) -> f64 {
        self.scaled_lon as f64 / 10f64.powi(self.precision as i32)
    }

    /// Deterministic seed derived from the rounded position.
    ///
    /// Two requests that round to the same key always observe the same
    /// synthetic noise, with or without a cache hit in between.
    pub fn noise_seed(&self) -> u64 {
        let a = (self.scaled_lat as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15);
        let b = (self.scaled_lon as u64).wrapping_mul(0xC2B2_AE3D_27D4_EB4F);
        a ^ b.rotate_left(31)
    }
}
