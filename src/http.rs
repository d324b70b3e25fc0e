use axum::body::Bytes;
use futures_util::StreamExt;
use reqwest::{Client, Url};
use thiserror::Error;

use crate::config::FetchConfig;

/// 回源拉图错误
#[derive(Error, Debug)]
pub enum FetchError {
    /// 建连或读取超时
    #[error("请求超时")]
    Timeout,
    /// 网络层错误（DNS、拒绝连接、读取中断等）
    #[error("网络错误: {0}")]
    Network(String),
    /// 上游返回非 2xx
    #[error("上游返回状态码 {0}")]
    Status(u16),
    /// 响应体超过上限
    #[error("响应体超过上限 {0} 字节")]
    TooLarge(u64),
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Network(err.to_string())
        }
    }
}

/// 回源拉图客户端。
///
/// 内部持有一个复用的 `reqwest::Client`（统一连接池/Keep-Alive），
/// 超时与响应体上限来自 [`FetchConfig`]。不做重试。
#[derive(Debug, Clone)]
pub struct ImageFetcher {
    client: Client,
    max_body_bytes: u64,
}

impl ImageFetcher {
    pub fn new(cfg: &FetchConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(cfg.timeout_duration())
            .connect_timeout(cfg.connect_timeout_duration())
            .user_agent(cfg.user_agent.clone())
            .build()?;
        Ok(Self {
            client,
            max_body_bytes: cfg.max_body_bytes,
        })
    }

    /// GET 拉取完整响应体；超过上限时立即中止读取。
    pub async fn fetch(&self, url: &Url) -> Result<Bytes, FetchError> {
        let resp = self.client.get(url.clone()).send().await?;

        let status = resp.status();
        if !status.is_success() {
            return Err(FetchError::Status(status.as_u16()));
        }

        let limit = self.max_body_bytes;
        if let Some(len) = resp.content_length()
            && len > limit
        {
            return Err(FetchError::TooLarge(limit));
        }

        let mut buf: Vec<u8> = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if (buf.len() + chunk.len()) as u64 > limit {
                return Err(FetchError::TooLarge(limit));
            }
            buf.extend_from_slice(&chunk);
        }

        tracing::debug!(url = %url, bytes = buf.len(), "回源拉取完成");
        Ok(Bytes::from(buf))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{Router, http::StatusCode, routing::get};
    use std::time::Duration;

    async fn spawn_upstream(app: Router) -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind tcp listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        addr
    }

    async fn start_hanging_http_server() -> std::net::SocketAddr {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind tcp listener");
        let addr = listener.local_addr().expect("local addr");

        tokio::spawn(async move {
            while let Ok((socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    // 不返回任何 HTTP 响应，触发客户端 read timeout。
                    tokio::time::sleep(Duration::from_secs(3)).await;
                    drop(socket);
                });
            }
        });

        addr
    }

    fn fetcher_with(timeout_secs: u64, max_body_bytes: u64) -> ImageFetcher {
        ImageFetcher::new(&FetchConfig {
            timeout_secs,
            max_body_bytes,
            ..FetchConfig::default()
        })
        .expect("build fetcher")
    }

    #[tokio::test]
    async fn fetch_returns_body_on_success() {
        let addr = spawn_upstream(Router::new().route("/a", get(|| async { "hello" }))).await;
        let url = Url::parse(&format!("http://{addr}/a")).expect("url");

        let body = fetcher_with(5, 1024).fetch(&url).await.expect("fetch ok");
        assert_eq!(&body[..], b"hello");
    }

    #[tokio::test]
    async fn fetch_maps_non_success_status() {
        let addr = spawn_upstream(
            Router::new().route("/missing", get(|| async { (StatusCode::NOT_FOUND, "nope") })),
        )
        .await;
        let url = Url::parse(&format!("http://{addr}/missing")).expect("url");

        let err = fetcher_with(5, 1024).fetch(&url).await.expect_err("404");
        assert!(matches!(err, FetchError::Status(404)), "got: {err:?}");
    }

    #[tokio::test]
    async fn fetch_rejects_oversized_body() {
        let addr = spawn_upstream(
            Router::new().route("/big", get(|| async { vec![0u8; 4096] })),
        )
        .await;
        let url = Url::parse(&format!("http://{addr}/big")).expect("url");

        let err = fetcher_with(5, 100).fetch(&url).await.expect_err("too large");
        assert!(matches!(err, FetchError::TooLarge(100)), "got: {err:?}");
    }

    #[tokio::test]
    async fn fetch_timeout_is_reported_as_timeout() {
        let addr = start_hanging_http_server().await;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("build reqwest client");
        let fetcher = ImageFetcher {
            client,
            max_body_bytes: 1024,
        };
        let url = Url::parse(&format!("http://{addr}/")).expect("url");

        let err = fetcher.fetch(&url).await.expect_err("expected timeout");
        assert!(matches!(err, FetchError::Timeout), "got: {err:?}");
    }
}
