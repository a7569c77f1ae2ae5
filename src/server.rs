//! HTTP API layer: prediction endpoint, health probe and the static map
//! front end.

use anyhow::{Context, Result};
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};
use warp::http::StatusCode;
use warp::{Filter, Rejection, Reply};

use crate::config::ServerConfig;
use crate::geo::CoordinateError;
use crate::predictor::PredictionService;
use crate::types::PredictRequest;

/// JSON error body returned for all failure responses.
#[derive(Debug, Serialize)]
struct ApiError {
    error: String,
    code: String,
}

#[derive(Debug, Serialize)]
struct HealthResponse {
    status: &'static str,
}

/// Build the complete route tree.
pub fn routes(
    service: Arc<PredictionService>,
    static_dir: &str,
) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let health = warp::path("health")
        .and(warp::path::end())
        .and(warp::get())
        .map(|| warp::reply::json(&HealthResponse { status: "healthy" }));

    let predict = warp::path("predict")
        .and(warp::path::end())
        .and(warp::post())
        .and(warp::body::content_length_limit(16 * 1024))
        .and(warp::body::json())
        .and(with_service(service))
        .and_then(handle_predict);

    let index_page = warp::path::end().and(warp::fs::file(
        PathBuf::from(static_dir).join("index.html"),
    ));
    let static_files = warp::path("static").and(warp::fs::dir(PathBuf::from(static_dir)));

    health.or(predict).or(index_page).or(static_files)
}

fn with_service(
    service: Arc<PredictionService>,
) -> impl Filter<Extract = (Arc<PredictionService>,), Error = Infallible> + Clone {
    warp::any().map(move || service.clone())
}

async fn handle_predict(
    request: PredictRequest,
    service: Arc<PredictionService>,
) -> Result<impl Reply, Infallible> {
    match service.predict(request.latitude, request.longitude) {
        Ok(prediction) => Ok(warp::reply::with_status(
            warp::reply::json(&prediction),
            StatusCode::OK,
        )
        .into_response()),
        Err(e @ CoordinateError::OutOfBounds { .. }) => {
            Ok(error_response(StatusCode::BAD_REQUEST, "out_of_bounds", &e.to_string()))
        }
        Err(e @ CoordinateError::NotFinite) => Ok(error_response(
            StatusCode::BAD_REQUEST,
            "invalid_coordinate",
            &e.to_string(),
        )),
    }
}

fn error_response(status: StatusCode, code: &str, message: &str) -> warp::reply::Response {
    warp::reply::with_status(
        warp::reply::json(&ApiError {
            error: message.to_string(),
            code: code.to_string(),
        }),
        status,
    )
    .into_response()
}

/// Map rejections (malformed bodies, unknown routes) onto the JSON error
/// shape so clients never see a bare text response.
pub async fn handle_rejection(err: Rejection) -> Result<impl Reply, Infallible> {
    let (status, code, message) = if err.is_not_found() {
        (StatusCode::NOT_FOUND, "not_found", "Resource not found".to_string())
    } else if let Some(e) = err.find::<warp::filters::body::BodyDeserializeError>() {
        (
            StatusCode::BAD_REQUEST,
            "invalid_body",
            format!("Invalid request body: {}", e),
        )
    } else if err.find::<warp::reject::PayloadTooLarge>().is_some() {
        (
            StatusCode::PAYLOAD_TOO_LARGE,
            "payload_too_large",
            "Request body too large".to_string(),
        )
    } else if err.find::<warp::reject::MethodNotAllowed>().is_some() {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            "method_not_allowed",
            "Method not allowed".to_string(),
        )
    } else {
        warn!(?err, "Unhandled rejection");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal_error",
            "Internal server error".to_string(),
        )
    };

    Ok(error_response(status, code, &message))
}

/// Bind and serve until the process is stopped.
pub async fn run(config: &ServerConfig, service: Arc<PredictionService>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .with_context(|| format!("Invalid bind address {}:{}", config.host, config.port))?;

    let routes = routes(service, &config.static_dir).recover(handle_rejection);

    info!(%addr, static_dir = %config.static_dir, "HTTP server listening");
    warp::serve(routes).run(addr).await;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::tests::test_service;
    use serde_json::Value;

    fn test_routes() -> impl Filter<Extract = (impl Reply,), Error = Infallible> + Clone {
        routes(Arc::new(test_service()), "static").recover(handle_rejection)
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let res = warp::test::request()
            .method("GET")
            .path("/health")
            .reply(&test_routes())
            .await;

        assert_eq!(res.status(), 200);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["status"], "healthy");
    }

    #[tokio::test]
    async fn test_predict_returns_structured_response() {
        let res = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&serde_json::json!({"latitude": 4.2201, "longitude": 73.5399}))
            .reply(&test_routes())
            .await;

        assert_eq!(res.status(), 200);
        let body: Value = serde_json::from_slice(res.body()).unwrap();

        assert!(body["prediction"].is_string());
        assert!(body["why"].as_str().unwrap().starts_with("Recommended"));

        let scores = body["confidence_scores"].as_object().unwrap();
        assert_eq!(scores.len(), 4);
        let sum: f64 = scores.values().map(|v| v.as_f64().unwrap()).sum();
        assert!((sum - 1.0).abs() < 1e-9);

        assert!(body["features"]["nearby_cafes"].is_number());
        assert!(body["features"]["distance_to_main_road"].is_number());
    }

    #[tokio::test]
    async fn test_repeated_requests_return_identical_bodies() {
        let filter = test_routes();
        let request = serde_json::json!({"latitude": 4.2250, "longitude": 73.5420});

        let first = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&request)
            .reply(&filter)
            .await;
        let second = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&request)
            .reply(&filter)
            .await;

        assert_eq!(first.status(), 200);
        assert_eq!(first.body(), second.body());
    }

    #[tokio::test]
    async fn test_out_of_bounds_coordinate_is_a_clean_400() {
        let res = warp::test::request()
            .method("POST")
            .path("/predict")
            .json(&serde_json::json!({"latitude": 52.52, "longitude": 13.40}))
            .reply(&test_routes())
            .await;

        assert_eq!(res.status(), 400);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["code"], "out_of_bounds");
        assert!(body["error"].as_str().unwrap().contains("outside"));
    }

    #[tokio::test]
    async fn test_non_numeric_coordinate_is_a_clean_400() {
        let res = warp::test::request()
            .method("POST")
            .path("/predict")
            .header("content-type", "application/json")
            .body(r#"{"latitude": "not-a-number", "longitude": 73.54}"#)
            .reply(&test_routes())
            .await;

        assert_eq!(res.status(), 400);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["code"], "invalid_body");
    }

    #[tokio::test]
    async fn test_unknown_route_is_a_json_404() {
        let res = warp::test::request()
            .method("GET")
            .path("/api/unknown")
            .reply(&test_routes())
            .await;

        assert_eq!(res.status(), 404);
        let body: Value = serde_json::from_slice(res.body()).unwrap();
        assert_eq!(body["code"], "not_found");
    }
}
