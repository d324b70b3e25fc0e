use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode},
};
use tower::ServiceExt;

use zoomcrop::config::AppConfig;
use zoomcrop::state::AppState;

fn build_app() -> Router {
    let state = AppState::from_config(&AppConfig::default()).expect("app state");
    zoomcrop::build_router(state)
}

fn header_of(resp: &axum::response::Response, name: &str) -> String {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}

#[tokio::test]
async fn request_id_is_generated_when_missing() {
    let resp = build_app()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .expect("request /health");

    assert_eq!(resp.status(), StatusCode::OK);
    let request_id = header_of(&resp, "x-request-id");
    assert!(request_id.starts_with("req_"), "generated id: {request_id}");
}

#[tokio::test]
async fn unsafe_client_request_id_is_replaced() {
    let resp = build_app()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("x-request-id", "has spaces/slash")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /health");

    let request_id = header_of(&resp, "x-request-id");
    assert_ne!(request_id, "has spaces/slash");
    assert!(!request_id.is_empty());
}

#[tokio::test]
async fn validation_problem_echoes_client_request_id() {
    let resp = build_app()
        .oneshot(
            Request::builder()
                .uri("/?zoom=2")
                .header("x-request-id", "zoom.req-001")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .expect("request /");

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(header_of(&resp, "x-request-id"), "zoom.req-001");

    let body = to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    let json: serde_json::Value = serde_json::from_slice(&body).expect("parse json");
    assert_eq!(json["requestId"].as_str(), Some("zoom.req-001"));
    assert_eq!(json["code"].as_str(), Some("VALIDATION_FAILED"));
    assert_eq!(json["type"].as_str(), Some("about:blank"));
}
