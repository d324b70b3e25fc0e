use axum::{
    Router,
    body::Body,
    http::{Request, header},
    routing::get,
};
use tower::ServiceExt;

use zoomcrop::config::CorsConfig;
use zoomcrop::cors::build_cors_layer;

fn app_with(cors: &CorsConfig) -> Router {
    let layer = build_cors_layer(cors).expect("cors layer");
    Router::new()
        .route("/", get(|| async { "jpeg" }))
        .layer(layer)
}

fn preflight(origin: &str, method: &str) -> Request<Body> {
    Request::builder()
        .method("OPTIONS")
        .uri("/")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, method)
        .body(Body::empty())
        .expect("build request")
}

#[tokio::test]
async fn listed_origin_is_echoed_on_get() {
    let cors = CorsConfig {
        enabled: true,
        allowed_origins: vec!["https://viewer.example".to_string()],
        ..CorsConfig::default()
    };

    let req = Request::builder()
        .uri("/?url=x&zoom=1")
        .header(header::ORIGIN, "https://viewer.example")
        .body(Body::empty())
        .expect("build request");
    let resp = app_with(&cors).oneshot(req).await.expect("call app");

    let allow_origin = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|v| v.to_str().ok());
    assert_eq!(allow_origin, Some("https://viewer.example"));
}

#[tokio::test]
async fn empty_method_list_only_allows_get() {
    let cors = CorsConfig {
        enabled: true,
        allowed_origins: vec!["*".to_string()],
        ..CorsConfig::default()
    };

    let resp = app_with(&cors)
        .oneshot(preflight("https://any.example", "GET"))
        .await
        .expect("call app");

    let allow_methods = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_METHODS)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");
    assert!(allow_methods.contains("GET"), "methods: {allow_methods}");
    assert!(!allow_methods.contains("POST"), "methods: {allow_methods}");

    let allow_origin = resp
        .headers()
        .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
        .and_then(|v| v.to_str().ok());
    assert_eq!(allow_origin, Some("*"));
}
