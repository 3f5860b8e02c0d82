use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

use crate::error::{CatalogError, CatalogResult};

/// Extensions presented with a video player; everything else is an image.
pub const VIDEO_EXTENSIONS: [&str; 3] = ["mp4", "webm", "ogg"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// Classify a media URL by the extension of its last path segment.
    /// Query strings and fragments are ignored.
    pub fn from_url(url: &str) -> Self {
        let path = url.split(['?', '#']).next().unwrap_or(url);
        let file = path.rsplit('/').next().unwrap_or(path);
        match file.rsplit_once('.') {
            Some((_, ext)) if VIDEO_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()) => {
                MediaKind::Video
            }
            _ => MediaKind::Image,
        }
    }
}

/// A media file sent with an upload or edit request.
#[derive(Debug, Clone, Deserialize)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    /// Standard base64 of the file bytes.
    pub data: String,
}

impl MediaFile {
    pub fn bytes(&self) -> CatalogResult<Vec<u8>> {
        STANDARD
            .decode(self.data.as_bytes())
            .map_err(|_| CatalogError::Validation(format!("{} is not valid base64", self.file_name)))
    }
}
