pub mod backend;
pub mod fast_backend;
pub mod geometry;
pub mod handler;
pub mod image_backend;
pub mod params;
pub mod service;

pub use backend::{BackendError, BackendKind, DecodeLimits, Frame, ImageBackend, Quality};
pub use handler::create_zoom_router;
pub use params::{ZoomQuery, ZoomRequest};
pub use service::{TransformSettings, ZoomOutput, ZoomService};
