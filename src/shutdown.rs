//! 优雅退出管理模块
//!
//! 监听 SIGINT/SIGTERM（Windows 下为 Ctrl+C），把退出原因广播给
//! HTTP 服务的 graceful shutdown future。

use std::time::Duration;
use tokio::sync::watch;
use tokio::time::timeout;
use tracing::{debug, info, warn};

/// 退出原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShutdownReason {
    /// 用户中断信号 (Ctrl+C)
    Interrupt,
    /// 终止信号 (SIGTERM)
    Terminate,
    /// 应用请求退出
    Application,
}

/// 优雅退出错误类型
#[derive(Debug, thiserror::Error)]
pub enum ShutdownError {
    #[error("信号设置失败: {0}")]
    SignalSetup(String),

    #[error("等待退出信号超时")]
    Timeout,
}

/// 优雅退出管理器。
///
/// 原因只记录第一次触发的那个，后续重复信号被忽略。
#[derive(Debug, Clone)]
pub struct ShutdownManager {
    tx: watch::Sender<Option<ShutdownReason>>,
}

impl ShutdownManager {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx }
    }

    /// 触发优雅退出
    pub fn trigger_shutdown(&self, reason: ShutdownReason) {
        let first = self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });

        if first {
            info!("触发优雅退出: {:?}", reason);
        } else {
            debug!("重复的退出信号被忽略: {:?}", reason);
        }
    }

    /// 检查是否正在关闭
    pub fn is_shutting_down(&self) -> bool {
        self.tx.borrow().is_some()
    }

    /// 等待退出信号，返回第一次触发时的原因
    pub async fn wait_for_shutdown(&self) -> ShutdownReason {
        let mut rx = self.tx.subscribe();
        match rx.wait_for(Option::is_some).await {
            Ok(reason) => (*reason).unwrap_or(ShutdownReason::Application),
            // 发送端与 self 同生命周期，这里只在极端情况下出现
            Err(_) => ShutdownReason::Application,
        }
    }

    /// 带超时的等待退出信号
    pub async fn wait_for_shutdown_with_timeout(
        &self,
        duration: Duration,
    ) -> Result<ShutdownReason, ShutdownError> {
        timeout(duration, self.wait_for_shutdown())
            .await
            .map_err(|_| ShutdownError::Timeout)
    }

    /// 启动信号处理器
    pub fn start_signal_handler(&self) -> Result<(), ShutdownError> {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{SignalKind, signal};

            let mut sigint = signal(SignalKind::interrupt())
                .map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;
            let mut sigterm = signal(SignalKind::terminate())
                .map_err(|e| ShutdownError::SignalSetup(e.to_string()))?;

            let manager = self.clone();
            tokio::spawn(async move {
                tokio::select! {
                    _ = sigint.recv() => {
                        info!("接收到SIGINT信号 (Ctrl+C)");
                        manager.trigger_shutdown(ShutdownReason::Interrupt);
                    }
                    _ = sigterm.recv() => {
                        info!("接收到SIGTERM信号");
                        manager.trigger_shutdown(ShutdownReason::Terminate);
                    }
                }
            });
        }

        #[cfg(not(unix))]
        {
            let manager = self.clone();
            tokio::spawn(async move {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("监听Ctrl+C信号失败: {}", e);
                    return;
                }
                info!("接收到Ctrl+C信号");
                manager.trigger_shutdown(ShutdownReason::Interrupt);
            });
        }

        info!("信号处理器已启动");
        Ok(())
    }

    /// 等待退出信号后，最多再给在途请求 `drain` 时间，超时则强制退出进程。
    pub async fn drain_signal(self, drain: Duration) {
        let reason = self.wait_for_shutdown().await;
        info!(
            "接收到退出信号: {:?}，停止接受新连接，在途请求最多等待 {}s",
            reason,
            drain.as_secs()
        );
        // 服务正常收尾后 main 返回、运行时销毁，这个计时任务随之被丢弃
        tokio::spawn(async move {
            tokio::time::sleep(drain).await;
            warn!("优雅退出超时，在途请求仍未完成，强制退出");
            std::process::exit(1);
        });
    }
}

impl Default for ShutdownManager {
    fn default() -> Self {
        Self::new()
    }
}
