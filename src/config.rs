use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::features::zoom::BackendKind;

/// 全局配置单例
static CONFIG: OnceCell<AppConfig> = OnceCell::new();

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// 回源拉图配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// 整体请求超时（秒），超时按拉取失败处理
    #[serde(default = "FetchConfig::default_timeout")]
    pub timeout_secs: u64,
    /// 建连超时（秒）
    #[serde(default = "FetchConfig::default_connect_timeout")]
    pub connect_timeout_secs: u64,
    /// 响应体字节上限，超过即中止读取
    #[serde(default = "FetchConfig::default_max_body_bytes")]
    pub max_body_bytes: u64,
    /// 回源请求使用的 User-Agent
    #[serde(default = "FetchConfig::default_user_agent")]
    pub user_agent: String,
}

impl FetchConfig {
    fn default_timeout() -> u64 {
        30
    }
    fn default_connect_timeout() -> u64 {
        10
    }
    fn default_max_body_bytes() -> u64 {
        32 * 1024 * 1024
    }
    fn default_user_agent() -> String {
        format!("zoomcrop/{}", env!("CARGO_PKG_VERSION"))
    }

    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn connect_timeout_duration(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
            connect_timeout_secs: Self::default_connect_timeout(),
            max_body_bytes: Self::default_max_body_bytes(),
            user_agent: Self::default_user_agent(),
        }
    }
}

/// 缩放裁剪配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransformConfig {
    /// 图像后端：image | fast
    #[serde(default)]
    pub backend: BackendKind,
    /// JPEG 输出质量（1-100），默认 75
    #[serde(default = "TransformConfig::default_jpeg_quality")]
    pub jpeg_quality: u8,
    /// 允许的最大 zoom
    #[serde(default = "TransformConfig::default_max_zoom")]
    pub max_zoom: f64,
    /// 并发变换许可数（0=自动，取 CPU 核心数）
    #[serde(default)]
    pub max_parallel: u32,
    /// 源图像素上限（解码前按图片头校验）
    #[serde(default = "TransformConfig::default_max_source_pixels")]
    pub max_source_pixels: u64,
    /// 缩放中间图像素上限
    #[serde(default = "TransformConfig::default_max_scaled_pixels")]
    pub max_scaled_pixels: u64,
}

impl TransformConfig {
    fn default_jpeg_quality() -> u8 {
        75
    }
    fn default_max_zoom() -> f64 {
        10.0
    }
    fn default_max_source_pixels() -> u64 {
        40_000_000
    }
    fn default_max_scaled_pixels() -> u64 {
        100_000_000
    }

    /// 实际生效的并发许可数
    pub fn effective_parallelism(&self) -> usize {
        if self.max_parallel == 0 {
            num_cpus::get()
        } else {
            self.max_parallel as usize
        }
    }
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            jpeg_quality: Self::default_jpeg_quality(),
            max_zoom: Self::default_max_zoom(),
            max_parallel: 0,
            max_source_pixels: Self::default_max_source_pixels(),
            max_scaled_pixels: Self::default_max_scaled_pixels(),
        }
    }
}

/// CORS 配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CorsConfig {
    /// 是否启用 CORS
    pub enabled: bool,
    /// 允许的 Origin 列表（支持 "*" 表示任意）
    pub allowed_origins: Vec<String>,
    /// 允许的方法列表（留空时仅放行 GET）
    pub allowed_methods: Vec<String>,
    /// 允许的请求头列表（支持 "*" 表示任意）
    pub allowed_headers: Vec<String>,
    /// 暴露的响应头列表（支持 "*" 表示任意）
    pub expose_headers: Vec<String>,
    /// 预检缓存时间（秒）
    pub max_age_secs: Option<u64>,
}

/// 优雅退出配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShutdownConfig {
    /// 等待在途请求完成的最长时间（秒）
    #[serde(default = "ShutdownConfig::default_timeout")]
    pub timeout_secs: u64,
}

impl ShutdownConfig {
    fn default_timeout() -> u64 {
        30
    }

    /// 获取优雅退出超时时间
    pub fn timeout_duration(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            timeout_secs: Self::default_timeout(),
        }
    }
}

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    /// 回源配置
    #[serde(default)]
    pub fetch: FetchConfig,
    /// 缩放裁剪配置
    #[serde(default)]
    pub transform: TransformConfig,
    /// CORS 配置
    #[serde(default)]
    pub cors: CorsConfig,
    /// 优雅退出配置
    #[serde(default)]
    pub shutdown: ShutdownConfig,
}

impl AppConfig {
    /// 加载配置：可选的 config.toml，再叠加环境变量覆盖
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path();

        tracing::info!("正在从 {:?} 加载配置文件（可选）", config_path);

        let builder = ConfigBuilder::builder()
            .add_source(File::from(config_path).required(false))
            // 环境变量覆盖，例如：APP_TRANSFORM__BACKEND=fast
            .add_source(
                Environment::with_prefix("APP")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = builder.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// 获取全局配置单例
    pub fn global() -> &'static AppConfig {
        CONFIG.get().expect("配置未初始化，请先调用 init_global()")
    }

    /// 初始化全局配置
    pub fn init_global() -> Result<&'static AppConfig, ConfigError> {
        let config = Self::load()?;
        CONFIG
            .set(config)
            .map_err(|_| ConfigError::Message("配置已经被初始化".to_string()))?;
        Ok(Self::global())
    }

    /// 获取配置文件路径
    fn get_config_path() -> PathBuf {
        PathBuf::from("config.toml")
    }

    /// 获取服务器监听地址
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// 启动期校验，拒绝明显无效的取值
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.transform;
        if !(1..=100).contains(&t.jpeg_quality) {
            return Err(ConfigError::Message(format!(
                "transform.jpeg_quality 必须在 1-100 范围内，当前为 {}",
                t.jpeg_quality
            )));
        }
        if !t.max_zoom.is_finite() || t.max_zoom <= 0.0 {
            return Err(ConfigError::Message(format!(
                "transform.max_zoom 必须为正数，当前为 {}",
                t.max_zoom
            )));
        }
        if t.max_source_pixels == 0 || t.max_scaled_pixels == 0 {
            return Err(ConfigError::Message(
                "transform 像素上限不能为 0".to_string(),
            ));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(ConfigError::Message(
                "fetch.timeout_secs 不能为 0".to_string(),
            ));
        }
        if self.fetch.max_body_bytes == 0 {
            return Err(ConfigError::Message(
                "fetch.max_body_bytes 不能为 0".to_string(),
            ));
        }
        Ok(())
    }
}
