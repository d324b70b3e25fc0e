use axum::{
    Router,
    extract::{Query, State},
    http::{HeaderValue, header},
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{error::AppError, state::AppState};

use super::params::{ZoomQuery, ZoomRequest};

#[utoipa::path(
    get,
    path = "/",
    summary = "缩放并居中裁剪远程图片",
    description = "拉取 base64 编码地址指向的图片，按 zoom 倍数用 Lanczos3 缩放后居中裁剪回原始尺寸，以 JPEG 返回。zoom < 1 时四周补黑边。",
    params(ZoomQuery),
    responses(
        (status = 200, description = "JPEG bytes（image/jpeg），尺寸与源图一致"),
        (
            status = 400,
            description = "参数缺失、base64/URL 非法或 zoom 非法",
            body = crate::error::ProblemDetails,
            content_type = "application/problem+json"
        ),
        (
            status = 500,
            description = "回源失败、图片解码失败或变换失败",
            body = crate::error::ProblemDetails,
            content_type = "application/problem+json"
        )
    ),
    tag = "Zoom"
)]
pub async fn zoom_image(
    State(state): State<AppState>,
    Query(query): Query<ZoomQuery>,
) -> Result<Response, AppError> {
    let req = ZoomRequest::parse(&query, state.zoom.max_zoom())?;
    let output = state.zoom.zoom(&req).await?;

    let mut resp = output.jpeg.into_response();
    resp.headers_mut().insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("image/jpeg"),
    );
    Ok(resp)
}

pub fn create_zoom_router() -> Router<AppState> {
    Router::new().route("/", get(zoom_image))
}
