/// 统一错误处理模块
pub mod error;

/// 配置模块
pub mod config;

/// 功能聚合模块
pub mod features;

/// 应用状态聚合模块
pub mod state;

/// 优雅退出管理模块
pub mod shutdown;

/// 回源 HTTP Client
pub mod http;

/// 请求追踪 ID
pub mod request_id;

/// CORS 配置
pub mod cors;

/// OpenAPI 文档
pub mod openapi;

use axum::Router;

use crate::features::{health, zoom};
use crate::state::AppState;

// 导出常用类型供外部使用
pub use config::AppConfig;
pub use error::AppError;
pub use shutdown::{ShutdownManager, ShutdownReason};

/// 组装业务路由并挂载 request-id 中间件；CORS 与 Trace 由调用方按配置追加。
pub fn build_router(state: AppState) -> Router {
    Router::<AppState>::new()
        .route("/health", axum::routing::get(health::health_check))
        .merge(openapi::create_openapi_router())
        .merge(zoom::create_zoom_router())
        .with_state(state)
        .layer(axum::middleware::from_fn(
            request_id::request_id_middleware,
        ))
}
