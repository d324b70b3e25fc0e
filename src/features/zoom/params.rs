use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use reqwest::Url;
use serde::Deserialize;
use utoipa::IntoParams;

use crate::error::AppError;

/// `GET /` 的查询参数（原样接收，由 [`ZoomRequest::parse`] 校验）
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ZoomQuery {
    /// base64（标准字母表，带填充）编码的图片绝对地址
    #[param(example = "aHR0cHM6Ly9leGFtcGxlLmNvbS9jYXQuanBn")]
    pub url: Option<String>,
    /// 缩放倍数，正数；> 1 放大，< 1 缩小并补黑边
    #[param(example = "1.5")]
    pub zoom: Option<String>,
}

/// 校验通过的请求参数
#[derive(Debug, Clone, PartialEq)]
pub struct ZoomRequest {
    pub url: Url,
    pub zoom: f64,
}

impl ZoomRequest {
    /// 按顺序校验：缺参 → base64 → URL → zoom。任何一步失败都是 400。
    pub fn parse(query: &ZoomQuery, max_zoom: f64) -> Result<Self, AppError> {
        let (Some(raw_url), Some(raw_zoom)) = (
            non_empty(query.url.as_deref()),
            non_empty(query.zoom.as_deref()),
        ) else {
            return Err(AppError::Validation(
                "url 与 zoom 参数均为必填".to_string(),
            ));
        };

        let url = decode_url(raw_url)?;
        let zoom = parse_zoom(raw_zoom, max_zoom)?;
        Ok(Self { url, zoom })
    }
}

fn non_empty(v: Option<&str>) -> Option<&str> {
    v.filter(|s| !s.is_empty())
}

/// 解码 base64 地址。
///
/// 未转义的 `+` 经表单解码会变成空格，这里先还原再解码。
fn decode_url(raw: &str) -> Result<Url, AppError> {
    let normalized = raw.replace(' ', "+");
    let bytes = STANDARD
        .decode(normalized.as_bytes())
        .map_err(|_| AppError::Validation("url 不是合法的 base64 编码".to_string()))?;
    let text = String::from_utf8(bytes)
        .map_err(|_| AppError::Validation("url 解码后不是合法的 UTF-8 文本".to_string()))?;
    let url = Url::parse(text.trim())
        .map_err(|e| AppError::Validation(format!("url 不是合法的绝对地址: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::Validation(format!(
            "url 仅支持 http/https，收到 {other}"
        ))),
    }
}

fn parse_zoom(raw: &str, max_zoom: f64) -> Result<f64, AppError> {
    let zoom: f64 = raw
        .trim()
        .parse()
        .map_err(|_| AppError::Validation(format!("zoom 不是合法的数字: {raw}")))?;
    if !zoom.is_finite() || zoom <= 0.0 {
        return Err(AppError::Validation(format!("zoom 必须为正数: {raw}")));
    }
    if zoom > max_zoom {
        return Err(AppError::Validation(format!(
            "zoom 不能超过 {max_zoom}: {raw}"
        )));
    }
    Ok(zoom)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MAX_ZOOM: f64 = 10.0;

    fn query(url: Option<&str>, zoom: Option<&str>) -> ZoomQuery {
        ZoomQuery {
            url: url.map(str::to_string),
            zoom: zoom.map(str::to_string),
        }
    }

    fn encoded(url: &str) -> String {
        STANDARD.encode(url)
    }

    fn assert_validation(result: Result<ZoomRequest, AppError>) {
        match result {
            Err(AppError::Validation(_)) => {}
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn parses_valid_request() {
        let q = query(Some(&encoded("https://example.com/a.png")), Some("2"));
        let req = ZoomRequest::parse(&q, MAX_ZOOM).expect("valid");
        assert_eq!(req.url.as_str(), "https://example.com/a.png");
        assert_eq!(req.zoom, 2.0);
    }

    #[test]
    fn missing_or_empty_params_are_rejected() {
        let url = encoded("https://example.com/a.png");
        assert_validation(ZoomRequest::parse(&query(None, Some("2")), MAX_ZOOM));
        assert_validation(ZoomRequest::parse(&query(Some(&url), None), MAX_ZOOM));
        assert_validation(ZoomRequest::parse(&query(Some(""), Some("2")), MAX_ZOOM));
        assert_validation(ZoomRequest::parse(&query(Some(&url), Some("")), MAX_ZOOM));
    }

    #[test]
    fn invalid_base64_is_rejected() {
        let q = query(Some("not-valid-base64!!!"), Some("1"));
        assert_validation(ZoomRequest::parse(&q, MAX_ZOOM));
    }

    #[test]
    fn non_http_or_relative_urls_are_rejected() {
        for bad in ["ftp://example.com/a.png", "just some text", "/relative/path.png"] {
            let q = query(Some(&encoded(bad)), Some("1"));
            assert_validation(ZoomRequest::parse(&q, MAX_ZOOM));
        }
    }

    #[test]
    fn bad_zoom_values_are_rejected() {
        let url = encoded("http://example.com/a.png");
        for bad in ["-1", "0", "abc", "inf", "NaN", "10.5"] {
            let q = query(Some(&url), Some(bad));
            assert_validation(ZoomRequest::parse(&q, MAX_ZOOM));
        }
    }

    #[test]
    fn fractional_zoom_is_accepted() {
        let url = encoded("http://example.com/a.png");
        let req = ZoomRequest::parse(&query(Some(&url), Some("0.25")), MAX_ZOOM).expect("valid");
        assert_eq!(req.zoom, 0.25);
    }

    #[test]
    fn spaces_from_form_decoding_are_restored_to_plus() {
        // 路径中的 "/~" 编码后会产生 '+'
        let url = "http://example.com/img/~x.png";
        let b64 = encoded(url);
        assert!(b64.contains('+'), "fixture must contain '+': {b64}");
        let mangled = b64.replace('+', " ");

        let req = ZoomRequest::parse(&query(Some(&mangled), Some("1")), MAX_ZOOM).expect("valid");
        assert_eq!(req.url.as_str(), url);
    }
}
