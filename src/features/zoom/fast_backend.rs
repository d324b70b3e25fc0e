use fast_image_resize as fr;
use image::RgbaImage;

use super::backend::{BackendError, Frame, ImageBackend};
use super::geometry::Dimensions;

/// 基于 `fast_image_resize` 的后端（SIMD 卷积缩放）。
///
/// `Resizer` 持有内部缓冲，每次调用单独创建并在返回前释放，不跨请求共享。
#[derive(Debug, Clone, Copy, Default)]
pub struct FastResizeBackend;

impl ImageBackend for FastResizeBackend {
    fn name(&self) -> &'static str {
        "fast"
    }

    fn resize(&self, frame: &Frame, target: Dimensions) -> Result<Frame, BackendError> {
        if target.width == 0 || target.height == 0 {
            return Err(BackendError::Resize(format!(
                "目标尺寸非法: {}x{}",
                target.width, target.height
            )));
        }

        let src = frame.as_rgba();
        let (src_width, src_height) = src.dimensions();
        let src_image = fr::images::ImageRef::new(
            src_width,
            src_height,
            src.as_raw(),
            fr::PixelType::U8x4,
        )
        .map_err(|e| BackendError::Resize(format!("构建源图像缓冲失败：{e}")))?;

        let mut dst_image =
            fr::images::Image::new(target.width, target.height, fr::PixelType::U8x4);

        let mut resizer = fr::Resizer::new();
        let options = fr::ResizeOptions::new()
            .resize_alg(fr::ResizeAlg::Convolution(fr::FilterType::Lanczos3));
        resizer
            .resize(&src_image, &mut dst_image, Some(&options))
            .map_err(|e| BackendError::Resize(format!("fast_image_resize 执行失败：{e}")))?;

        let rgba = RgbaImage::from_raw(target.width, target.height, dst_image.into_vec())
            .ok_or_else(|| BackendError::Resize("fast_image_resize 输出缓冲长度异常".to_string()))?;
        Ok(Frame::new(rgba))
    }
}
