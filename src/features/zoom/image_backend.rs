use image::imageops::{self, FilterType};

use super::backend::{BackendError, Frame, ImageBackend};
use super::geometry::Dimensions;

/// 基于 `image` crate 的后端：纯 Rust、无额外依赖。
#[derive(Debug, Clone, Copy, Default)]
pub struct ImageRsBackend;

impl ImageBackend for ImageRsBackend {
    fn name(&self) -> &'static str {
        "image"
    }

    fn resize(&self, frame: &Frame, target: Dimensions) -> Result<Frame, BackendError> {
        if target.width == 0 || target.height == 0 {
            return Err(BackendError::Resize(format!(
                "目标尺寸非法: {}x{}",
                target.width, target.height
            )));
        }
        let resized = imageops::resize(
            frame.as_rgba(),
            target.width,
            target.height,
            FilterType::Lanczos3,
        );
        Ok(Frame::new(resized))
    }
}
