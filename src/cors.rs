use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{Any, CorsLayer};

use crate::config::CorsConfig;

/// 根据配置构建 CORS 中间件（服务只有 GET 接口，方法列表留空时默认仅放行 GET）
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let (any_origin, origins) = parse_list("allowed_origins", &cors.allowed_origins, |v| {
        HeaderValue::from_str(v).ok()
    });
    if !any_origin && origins.is_empty() {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }

    let (any_methods, methods) = parse_list("allowed_methods", &cors.allowed_methods, |v| {
        Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
    });
    let (any_headers, headers) =
        parse_list("allowed_headers", &cors.allowed_headers, parse_header_name);
    let (any_expose, expose) = parse_list("expose_headers", &cors.expose_headers, parse_header_name);

    let mut layer = CorsLayer::new();

    layer = if any_origin {
        layer.allow_origin(Any)
    } else {
        layer.allow_origin(origins)
    };

    layer = if any_methods {
        layer.allow_methods(Any)
    } else if methods.is_empty() {
        layer.allow_methods([Method::GET])
    } else {
        layer.allow_methods(methods)
    };

    if any_headers {
        layer = layer.allow_headers(Any);
    } else if !headers.is_empty() {
        layer = layer.allow_headers(headers);
    }

    if any_expose {
        layer = layer.expose_headers(Any);
    } else if !expose.is_empty() {
        layer = layer.expose_headers(expose);
    }

    if let Some(secs) = cors.max_age_secs
        && secs > 0
    {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}

fn parse_header_name(v: &str) -> Option<HeaderName> {
    HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes()).ok()
}

/// 解析配置列表：`"*"` 表示任意，空白项跳过，无法解析的项记录告警后忽略。
fn parse_list<T>(
    label: &str,
    values: &[String],
    parse: impl Fn(&str) -> Option<T>,
) -> (bool, Vec<T>) {
    let mut any = false;
    let mut parsed = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        if value == "*" {
            any = true;
            continue;
        }
        match parse(value) {
            Some(v) => parsed.push(v),
            None => tracing::warn!("CORS {} 含无效值: {}", label, value),
        }
    }
    (any, parsed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_config_builds_nothing() {
        assert!(build_cors_layer(&CorsConfig::default()).is_none());
    }

    #[test]
    fn build_cors_layer_skips_when_origins_empty() {
        let cors = CorsConfig {
            enabled: true,
            ..CorsConfig::default()
        };
        assert!(build_cors_layer(&cors).is_none());
    }

    #[test]
    fn parse_list_normalizes_methods_and_detects_wildcard() {
        let input = vec!["get".to_string(), " HEAD ".to_string(), "*".to_string()];
        let (any, methods) = parse_list("allowed_methods", &input, |v| {
            Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
        });
        assert!(any);
        assert_eq!(methods, vec![Method::GET, Method::HEAD]);
    }

    #[test]
    fn parse_list_skips_invalid_header_names() {
        let input = vec!["x-ok".to_string(), "bad header".to_string()];
        let (any, headers) = parse_list("allowed_headers", &input, parse_header_name);
        assert!(!any);
        assert_eq!(headers.len(), 1);
        assert_eq!(headers[0].as_str(), "x-ok");
    }
}
