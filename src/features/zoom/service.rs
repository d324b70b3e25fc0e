use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Semaphore;

use crate::config::{AppConfig, TransformConfig};
use crate::error::AppError;
use crate::http::ImageFetcher;

use super::backend::{DecodeLimits, ImageBackend, Quality};
use super::geometry::{self, Dimensions};
use super::params::ZoomRequest;

/// 变换参数（启动时从配置固化）
#[derive(Debug, Clone, Copy)]
pub struct TransformSettings {
    pub quality: Quality,
    pub max_zoom: f64,
    pub decode_limits: DecodeLimits,
    pub max_scaled_pixels: u64,
}

impl From<&TransformConfig> for TransformSettings {
    fn from(cfg: &TransformConfig) -> Self {
        Self {
            quality: Quality::new(cfg.jpeg_quality),
            max_zoom: cfg.max_zoom,
            decode_limits: DecodeLimits {
                max_pixels: cfg.max_source_pixels,
            },
            max_scaled_pixels: cfg.max_scaled_pixels,
        }
    }
}

/// 一次变换的产物
#[derive(Debug)]
pub struct ZoomOutput {
    pub jpeg: Vec<u8>,
    pub source: Dimensions,
    pub scaled: Dimensions,
}

/// 拉图 → 解码 → 缩放 → 居中裁剪 → JPEG 编码
pub struct ZoomService {
    fetcher: ImageFetcher,
    backend: Arc<dyn ImageBackend>,
    /// 控制并发变换的信号量（限制 CPU 密集型任务数量）
    semaphore: Arc<Semaphore>,
    settings: TransformSettings,
}

impl ZoomService {
    pub fn new(
        fetcher: ImageFetcher,
        backend: Arc<dyn ImageBackend>,
        settings: TransformSettings,
        max_parallel: usize,
    ) -> Self {
        Self {
            fetcher,
            backend,
            semaphore: Arc::new(Semaphore::new(max_parallel.max(1))),
            settings,
        }
    }

    /// 按配置构建：回源客户端 + 选定的图像后端
    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        let fetcher = ImageFetcher::new(&cfg.fetch)
            .map_err(|e| AppError::Internal(format!("HTTP 客户端初始化失败: {e}")))?;
        let backend = cfg.transform.backend.build();
        Ok(Self::new(
            fetcher,
            backend,
            TransformSettings::from(&cfg.transform),
            cfg.transform.effective_parallelism(),
        ))
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    pub fn max_zoom(&self) -> f64 {
        self.settings.max_zoom
    }

    pub async fn zoom(&self, req: &ZoomRequest) -> Result<ZoomOutput, AppError> {
        let t_total = Instant::now();
        tracing::info!(
            url = %req.url,
            zoom = req.zoom,
            backend = self.backend.name(),
            "Downloading image"
        );

        let t_fetch = Instant::now();
        let bytes = self.fetcher.fetch(&req.url).await.inspect_err(|e| {
            tracing::warn!(url = %req.url, "回源拉图失败: {}", e);
        })?;
        let fetch_ms = t_fetch.elapsed().as_millis();

        let t_wait = Instant::now();
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| AppError::Internal(format!("获取变换信号量失败: {e}")))?;
        let wait_ms = t_wait.elapsed().as_millis();

        // 解码/缩放/编码均为 CPU 密集操作，移出 tokio worker。
        let backend = self.backend.clone();
        let settings = self.settings;
        let zoom = req.zoom;
        let t_transform = Instant::now();
        let output = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            transform_bytes(backend.as_ref(), &bytes, zoom, &settings)
        })
        .await
        .map_err(|e| AppError::Internal(format!("变换任务异常退出: {e}")))?
        .inspect_err(|e| {
            tracing::warn!(url = %req.url, zoom = req.zoom, "图像变换失败: {}", e);
        })?;

        tracing::info!(
            url = %req.url,
            zoom = req.zoom,
            source = %format!("{}x{}", output.source.width, output.source.height),
            scaled = %format!("{}x{}", output.scaled.width, output.scaled.height),
            bytes = output.jpeg.len(),
            fetch_ms = fetch_ms as u64,
            wait_ms = wait_ms as u64,
            transform_ms = t_transform.elapsed().as_millis() as u64,
            total_ms = t_total.elapsed().as_millis() as u64,
            "缩放裁剪完成"
        );
        Ok(output)
    }
}

/// 同步执行解码 → 缩放裁剪 → 编码。
pub fn transform_bytes(
    backend: &dyn ImageBackend,
    bytes: &[u8],
    zoom: f64,
    settings: &TransformSettings,
) -> Result<ZoomOutput, AppError> {
    let frame = backend.decode(bytes, &settings.decode_limits)?;
    let source = frame.dimensions();

    let scaled = geometry::scaled_dimensions(source, zoom);
    if scaled.pixels() > settings.max_scaled_pixels {
        return Err(AppError::Validation(format!(
            "zoom={zoom} 对 {}x{} 的图片过大：缩放后 {}x{} 超过 {} 像素",
            source.width, source.height, scaled.width, scaled.height, settings.max_scaled_pixels
        )));
    }

    let cropped = backend.zoom_and_crop(frame, zoom)?;
    let jpeg = backend.encode_jpeg(&cropped, settings.quality)?;
    Ok(ZoomOutput {
        jpeg,
        source,
        scaled,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::zoom::backend::tests::{encode_png, split_image};
    use crate::features::zoom::{BackendKind, BackendError};
    use image::GenericImageView;

    fn settings() -> TransformSettings {
        TransformSettings::from(&TransformConfig::default())
    }

    #[test]
    fn both_backends_preserve_source_dimensions() {
        let png = encode_png(&split_image(101, 64));
        for kind in [BackendKind::Image, BackendKind::Fast] {
            let backend = kind.build();
            for zoom in [0.5, 1.0, 1.5, 2.0, 3.0] {
                let out = transform_bytes(backend.as_ref(), &png, zoom, &settings())
                    .expect("transform");
                assert_eq!(out.source, Dimensions::new(101, 64));

                let decoded = image::load_from_memory(&out.jpeg).expect("decode jpeg");
                assert_eq!(decoded.dimensions(), (101, 64), "{kind:?} @ {zoom}");
            }
        }
    }

    #[test]
    fn zoom_two_reports_doubled_intermediate() {
        let png = encode_png(&split_image(100, 100));
        let out = transform_bytes(BackendKind::Image.build().as_ref(), &png, 2.0, &settings())
            .expect("transform");
        assert_eq!(out.scaled, Dimensions::new(200, 200));
    }

    #[test]
    fn oversized_intermediate_is_a_validation_error() {
        let png = encode_png(&split_image(100, 100));
        let s = TransformSettings {
            max_scaled_pixels: 10_000,
            ..settings()
        };
        let err = transform_bytes(BackendKind::Image.build().as_ref(), &png, 1.5, &s)
            .expect_err("too large");
        assert!(matches!(err, AppError::Validation(_)), "got: {err:?}");
    }

    #[test]
    fn non_image_bytes_fail_to_decode() {
        let err = transform_bytes(
            BackendKind::Fast.build().as_ref(),
            b"<html>not an image</html>",
            1.0,
            &settings(),
        )
        .expect_err("decode");
        assert!(
            matches!(err, AppError::Image(BackendError::UnsupportedFormat(_))),
            "got: {err:?}"
        );
    }
}
