use axum::{Json, Router, routing::get};
use utoipa::openapi::server::ServerBuilder;
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// 文档路径
pub const OPENAPI_JSON_PATH: &str = "/api-docs/openapi.json";

/// 所有接口都挂在根路径下，不带前缀。
struct ApiServers;

impl Modify for ApiServers {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let root = ServerBuilder::new()
            .url("/")
            .description(Some("根路径"))
            .build();
        openapi.servers = Some(vec![root]);
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::features::health::handler::health_check,
        crate::features::zoom::handler::zoom_image,
    ),
    components(schemas(
        crate::error::ProblemDetails,
        crate::features::health::handler::HealthResponse,
    )),
    modifiers(&ApiServers),
    tags(
        (
            name = "Zoom",
            description = "缩放裁剪：拉取远程图片，按倍数缩放后居中裁剪回原尺寸，输出 JPEG。"
        ),
        (name = "Health", description = "健康检查：服务探活。"),
    ),
    info(
        title = "Zoomcrop API",
        version = env!("CARGO_PKG_VERSION"),
        description = "远程图片缩放裁剪服务（Axum + utoipa）。错误统一以 application/problem+json 返回。"
    )
)]
pub struct ApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn create_openapi_router() -> Router<AppState> {
    Router::new().route(OPENAPI_JSON_PATH, get(openapi_json))
}
