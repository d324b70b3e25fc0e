use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::AppError;
use crate::features::zoom::ZoomService;

/// 聚合的应用共享状态
#[derive(Clone)]
pub struct AppState {
    pub zoom: Arc<ZoomService>,
}

impl AppState {
    pub fn new(zoom: ZoomService) -> Self {
        Self {
            zoom: Arc::new(zoom),
        }
    }

    pub fn from_config(cfg: &AppConfig) -> Result<Self, AppError> {
        Ok(Self::new(ZoomService::from_config(cfg)?))
    }
}
