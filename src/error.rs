use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::features::zoom::BackendError;
use crate::http::FetchError;

/// 应用统一错误类型
#[derive(Error, Debug)]
pub enum AppError {
    /// 参数校验错误（缺参、base64 非法、zoom 非法等）
    #[error("参数校验错误: {0}")]
    Validation(String),

    /// 回源拉图失败
    #[error("拉取图片失败: {0}")]
    Fetch(#[from] FetchError),

    /// 解码/缩放/编码失败
    #[error("图像处理失败: {0}")]
    Image(#[from] BackendError),

    /// 内部服务器错误
    #[error("内部错误: {0}")]
    Internal(String),
}

/// RFC7807 风格的错误响应（Problem Details）。
#[derive(Debug, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProblemDetails {
    /// 问题类型（URI），统一使用 about:blank。
    #[serde(rename = "type")]
    #[schema(example = "about:blank")]
    pub type_url: String,

    /// 简短标题，用于概括错误。
    #[schema(example = "Bad Request")]
    pub title: String,

    /// HTTP 状态码（与响应 status 一致）。
    #[schema(example = 400)]
    pub status: u16,

    /// 人类可读的详细信息。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// 稳定的错误码，用于程序化处理。
    #[schema(example = "VALIDATION_FAILED")]
    pub code: String,

    /// 请求追踪 ID（由 request-id 中间件注入）。
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Fetch(_) | AppError::Image(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    pub fn stable_code(&self) -> &'static str {
        match self {
            AppError::Validation(_) => "VALIDATION_FAILED",
            AppError::Fetch(e) => match e {
                FetchError::Timeout => "UPSTREAM_TIMEOUT",
                FetchError::Status(_) => "UPSTREAM_STATUS",
                FetchError::TooLarge(_) => "UPSTREAM_TOO_LARGE",
                FetchError::Network(_) => "UPSTREAM_ERROR",
            },
            AppError::Image(e) => match e {
                BackendError::UnsupportedFormat(_)
                | BackendError::Decode(_)
                | BackendError::LimitExceeded(_) => "IMAGE_DECODE_FAILED",
                BackendError::Resize(_) | BackendError::Encode(_) => "IMAGE_TRANSFORM_FAILED",
            },
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    fn title(&self) -> &'static str {
        match self.status_code() {
            StatusCode::BAD_REQUEST => "Bad Request",
            StatusCode::INTERNAL_SERVER_ERROR => "Internal Server Error",
            _ => "Error",
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let problem = ProblemDetails {
            type_url: "about:blank".to_string(),
            title: self.title().to_string(),
            status: status.as_u16(),
            detail: Some(self.to_string()),
            code: self.stable_code().to_string(),
            request_id: crate::request_id::current_request_id(),
        };

        let mut res = Json(problem).into_response();
        *res.status_mut() = status;
        res.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static("application/problem+json"),
        );
        res
    }
}
