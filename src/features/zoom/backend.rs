//! 图像后端抽象。
//!
//! [`ImageBackend`] 描述一次变换所需的全部步骤：解码、缩放、编码 JPEG，
//! 以及组合它们的 [`ImageBackend::zoom_and_crop`]。两个实现只在缩放
//! 环节不同：
//!
//! | 后端 | 缩放实现 |
//! |---|---|
//! | `image` | `image::imageops::resize` + `FilterType::Lanczos3` |
//! | `fast`  | `fast_image_resize` + `FilterType::Lanczos3` |
//!
//! 裁剪由 [`Frame::extract`] 完成，是位图类型自身的能力，不需要后端参与。

use std::io::Cursor;
use std::sync::Arc;

use image::codecs::jpeg::JpegEncoder;
use image::{ColorType, ImageFormat, ImageReader, Limits, Rgba, RgbaImage, imageops};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::fast_backend::FastResizeBackend;
use super::geometry::{self, CropWindow, Dimensions};
use super::image_backend::ImageRsBackend;

/// 越界区域（zoom < 1）的填充色：不透明黑
const PAD_COLOR: Rgba<u8> = Rgba([0, 0, 0, 255]);

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("不支持的图片格式: {0}")]
    UnsupportedFormat(String),
    #[error("图片解码失败: {0}")]
    Decode(String),
    #[error("图片超出限制: {0}")]
    LimitExceeded(String),
    #[error("缩放失败: {0}")]
    Resize(String),
    #[error("JPEG 编码失败: {0}")]
    Encode(String),
}

/// JPEG 编码质量（1-100），构造时钳制到合法范围。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u8);

impl Quality {
    pub fn new(value: u8) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(75)
    }
}

/// 解码期资源上限
#[derive(Debug, Clone, Copy)]
pub struct DecodeLimits {
    pub max_pixels: u64,
}

/// 请求内独占的 RGBA 位图。
#[derive(Debug, Clone, PartialEq)]
pub struct Frame(RgbaImage);

impl Frame {
    pub fn new(image: RgbaImage) -> Self {
        Self(image)
    }

    pub fn dimensions(&self) -> Dimensions {
        Dimensions::new(self.0.width(), self.0.height())
    }

    pub fn as_rgba(&self) -> &RgbaImage {
        &self.0
    }

    pub fn into_rgba(self) -> RgbaImage {
        self.0
    }

    /// 取出 `window` 对应的子区域，结果尺寸恒为窗口尺寸。
    ///
    /// 窗口完全在图内时是普通裁剪；否则以窗口为画布、把本图放在
    /// `(-x, -y)` 处，未覆盖部分填充 [`PAD_COLOR`]。
    pub fn extract(&self, window: CropWindow) -> Frame {
        if window.fits_within(self.dimensions()) {
            let view = imageops::crop_imm(
                &self.0,
                window.x as u32,
                window.y as u32,
                window.width,
                window.height,
            );
            return Frame(view.to_image());
        }

        let mut canvas = RgbaImage::from_pixel(window.width, window.height, PAD_COLOR);
        imageops::replace(&mut canvas, &self.0, -window.x, -window.y);
        Frame(canvas)
    }
}

/// 图像后端：每个后端必须实现解码、缩放、编码三项能力。
pub trait ImageBackend: Send + Sync {
    /// 后端名称（与配置中的取值一致）
    fn name(&self) -> &'static str;

    /// 将字节解码为位图，仅接受 JPEG/PNG。
    fn decode(&self, bytes: &[u8], limits: &DecodeLimits) -> Result<Frame, BackendError> {
        decode_jpeg_or_png(bytes, limits)
    }

    /// 用 Lanczos3 将整幅图缩放到 `target`。
    fn resize(&self, frame: &Frame, target: Dimensions) -> Result<Frame, BackendError>;

    /// 编码为 JPEG（透明通道压到黑底）。
    fn encode_jpeg(&self, frame: &Frame, quality: Quality) -> Result<Vec<u8>, BackendError> {
        encode_jpeg_on_black(frame, quality)
    }

    /// 按 zoom 缩放后居中裁剪回原尺寸；源图在缩放完成后即释放。
    fn zoom_and_crop(&self, frame: Frame, zoom: f64) -> Result<Frame, BackendError> {
        let plan = geometry::plan(frame.dimensions(), zoom);
        let scaled = if plan.scaled == plan.source {
            // zoom 不改变尺寸时跳过重采样
            frame
        } else {
            self.resize(&frame, plan.scaled)?
        };
        if scaled.dimensions() != plan.scaled {
            return Err(BackendError::Resize(format!(
                "缩放结果尺寸异常: 期望 {}x{}，实际 {}x{}",
                plan.scaled.width,
                plan.scaled.height,
                scaled.dimensions().width,
                scaled.dimensions().height
            )));
        }
        Ok(scaled.extract(plan.window))
    }
}

/// 后端类型（配置值小写）
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// `image` crate 的 Lanczos3
    #[default]
    Image,
    /// `fast_image_resize` 的 Lanczos3 卷积
    Fast,
}

impl BackendKind {
    /// 构建进程级共享的后端实例
    pub fn build(self) -> Arc<dyn ImageBackend> {
        match self {
            BackendKind::Image => Arc::new(ImageRsBackend),
            BackendKind::Fast => Arc::new(FastResizeBackend),
        }
    }
}

/// 嗅探格式 → 校验像素上限 → 完整解码。
pub(crate) fn decode_jpeg_or_png(
    bytes: &[u8],
    limits: &DecodeLimits,
) -> Result<Frame, BackendError> {
    let reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))?;

    match reader.format() {
        Some(ImageFormat::Jpeg) | Some(ImageFormat::Png) => {}
        Some(other) => return Err(BackendError::UnsupportedFormat(format!("{other:?}"))),
        None => return Err(BackendError::UnsupportedFormat("无法识别".to_string())),
    }

    let (width, height) = reader
        .into_dimensions()
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    let header = Dimensions::new(width, height);
    if header.pixels() > limits.max_pixels {
        return Err(BackendError::LimitExceeded(format!(
            "{}x{} 超过 {} 像素",
            width, height, limits.max_pixels
        )));
    }

    // into_dimensions 消费了 reader，需重新构建一次用于完整解码
    let mut reader = ImageReader::new(Cursor::new(bytes))
        .with_guessed_format()
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    let mut io_limits = Limits::default();
    io_limits.max_image_width = Some(width);
    io_limits.max_image_height = Some(height);
    reader.limits(io_limits);

    let decoded = reader
        .decode()
        .map_err(|e| BackendError::Decode(e.to_string()))?;
    Ok(Frame(decoded.to_rgba8()))
}

/// 将 RGBA 像素扁平化到黑色背景后编码为 JPEG（JPEG 无透明通道）。
pub(crate) fn encode_jpeg_on_black(frame: &Frame, quality: Quality) -> Result<Vec<u8>, BackendError> {
    let rgba = frame.as_rgba();
    let (w, h) = rgba.dimensions();

    let mut rgb: Vec<u8> = Vec::with_capacity(w as usize * h as usize * 3);
    for px in rgba.pixels() {
        let [r, g, b, a] = px.0;
        let a = a as u16;
        // 过黑底合成：c' = c * a/255
        rgb.push(((r as u16 * a) / 255) as u8);
        rgb.push(((g as u16 * a) / 255) as u8);
        rgb.push(((b as u16 * a) / 255) as u8);
    }

    let mut out = Vec::new();
    let mut enc = JpegEncoder::new_with_quality(&mut out, quality.value());
    enc.encode(&rgb, w, h, ColorType::Rgb8.into())
        .map_err(|e| BackendError::Encode(e.to_string()))?;
    Ok(out)
}
