//! Inbound request types for the prediction endpoint

use serde::{Deserialize, Serialize};

/// A clicked map location submitted for a recommendation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PredictRequest {
    /// Latitude in decimal degrees
    #[serde(alias = "lat")]
    pub latitude: f64,

    /// Longitude in decimal degrees
    #[serde(alias = "lon", alias = "lng")]
    pub longitude: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_deserialization() {
        let req: PredictRequest =
            serde_json::from_str(r#"{"latitude": 4.2201, "longitude": 73.5401}"#).unwrap();
        assert_eq!(req.latitude, 4.2201);
        assert_eq!(req.longitude, 73.5401);
    }

    #[test]
    fn test_request_short_aliases() {
        let req: PredictRequest = serde_json::from_str(r#"{"lat": 4.22, "lng": 73.54}"#).unwrap();
        assert_eq!(req.latitude, 4.22);
        assert_eq!(req.longitude, 73.54);
    }

    #[test]
    fn test_non_numeric_coordinate_is_rejected() {
        let result = serde_json::from_str::<PredictRequest>(r#"{"latitude": "x", "longitude": 73.54}"#);
        assert!(result.is_err());
    }
}
