// Re-export model types and service functions
pub mod model;
pub mod service;

pub use model::{MediaFile, MediaKind, VIDEO_EXTENSIONS};
pub use service::*;
