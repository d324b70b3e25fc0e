//! 缩放与居中裁剪的尺寸计算。
//!
//! 全部为纯函数，不涉及任何图像数据，可直接单测。

use serde::Serialize;

/// 图像宽高
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Dimensions {
    pub width: u32,
    pub height: u32,
}

impl Dimensions {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// 像素总数（u64，避免大图溢出）
    pub fn pixels(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

/// 在缩放图上取窗口的位置与大小。
///
/// `x`/`y` 可以为负：zoom < 1 时缩放图比原图小，窗口超出缩放图边界，
/// 越界部分由调用方填充背景色。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub x: i64,
    pub y: i64,
    pub width: u32,
    pub height: u32,
}

impl CropWindow {
    /// 窗口是否完全落在 `bounds` 内（即普通裁剪，无需填充）
    pub fn fits_within(&self, bounds: Dimensions) -> bool {
        self.x >= 0
            && self.y >= 0
            && self.x + self.width as i64 <= bounds.width as i64
            && self.y + self.height as i64 <= bounds.height as i64
    }
}

/// 一次缩放裁剪的完整计划
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomPlan {
    pub source: Dimensions,
    pub scaled: Dimensions,
    pub window: CropWindow,
}

/// 按 zoom 计算缩放后的尺寸：两个方向各自 `floor(边长 × zoom)`，至少为 1。
///
/// 调用方保证 `zoom` 为有限正数。
pub fn scaled_dimensions(source: Dimensions, zoom: f64) -> Dimensions {
    let scale = |len: u32| -> u32 {
        let v = (len as f64 * zoom).floor();
        if v >= u32::MAX as f64 {
            u32::MAX
        } else {
            (v as u32).max(1)
        }
    };
    Dimensions::new(scale(source.width), scale(source.height))
}

/// 居中偏移：`(scaled - target) / 2`，有符号整数除法向零截断。
pub fn center_offset(scaled: u32, target: u32) -> i64 {
    (scaled as i64 - target as i64) / 2
}

/// 生成缩放裁剪计划：输出窗口尺寸恒等于源图尺寸。
pub fn plan(source: Dimensions, zoom: f64) -> ZoomPlan {
    let scaled = scaled_dimensions(source, zoom);
    ZoomPlan {
        source,
        scaled,
        window: CropWindow {
            x: center_offset(scaled.width, source.width),
            y: center_offset(scaled.height, source.height),
            width: source.width,
            height: source.height,
        },
    }
}
