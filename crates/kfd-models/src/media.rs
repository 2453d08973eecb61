//! Upload media classification.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Extensions routed through keyframe extraction.
pub const VIDEO_EXTENSIONS: &[&str] = &["h264"];

/// Extensions submitted directly as a single frame.
pub const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

/// Kind of media carried by an upload, decided from its filename.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    /// Raw H.264 elementary stream
    Video,
    /// Still image (PNG/JPEG)
    Image,
}

impl MediaKind {
    /// Classify an upload by its filename extension (case-insensitive).
    ///
    /// Returns `None` for anything that is neither a supported video nor a
    /// supported image.
    pub fn from_filename(filename: &str) -> Option<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())?
            .to_ascii_lowercase();

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Video)
        } else if IMAGE_EXTENSIONS.contains(&ext.as_str()) {
            Some(MediaKind::Image)
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Video => "video",
            MediaKind::Image => "image",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
