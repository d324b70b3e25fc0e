/// 健康检查
pub mod health;

/// 缩放裁剪主流程
pub mod zoom;
