//! Upload intake policy.
//!
//! The web layer validates uploads before they reach the pipeline; the same
//! policy is exposed here so every entry point applies identical limits.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Default maximum upload size (100 MB).
pub const MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

/// Video container extensions accepted by default.
pub const ALLOWED_VIDEO_EXTENSIONS: &[&str] = &[".mp4", ".avi", ".mov"];

/// Why an upload was refused.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum UploadRejection {
    #[error("Invalid file type '{extension}'. Allowed: {allowed:?}")]
    InvalidExtension {
        extension: String,
        allowed: Vec<String>,
    },

    #[error("File too large ({size_mb:.1} MB). Max allowed: {max_mb:.0} MB")]
    TooLarge { size_mb: f64, max_mb: f64 },
}

impl UploadRejection {
    /// HTTP status the web layer should answer with.
    pub fn status_code(&self) -> u16 {
        match self {
            UploadRejection::InvalidExtension { .. } => 400,
            UploadRejection::TooLarge { .. } => 413,
        }
    }
}

/// Size and type limits for uploaded videos.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadPolicy {
    pub max_size_bytes: u64,
    /// Lowercase extensions including the leading dot
    pub allowed_extensions: Vec<String>,
}

impl Default for UploadPolicy {
    fn default() -> Self {
        Self {
            max_size_bytes: MAX_UPLOAD_BYTES,
            allowed_extensions: ALLOWED_VIDEO_EXTENSIONS
                .iter()
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

impl UploadPolicy {
    /// Validate a filename and byte size, returning the normalized extension.
    pub fn validate(&self, filename: &str, size_bytes: u64) -> Result<String, UploadRejection> {
        let extension = extension_of(filename);
        if !self.allowed_extensions.iter().any(|e| e == &extension) {
            return Err(UploadRejection::InvalidExtension {
                extension,
                allowed: self.allowed_extensions.clone(),
            });
        }

        if size_bytes > self.max_size_bytes {
            return Err(UploadRejection::TooLarge {
                size_mb: size_bytes as f64 / (1024.0 * 1024.0),
                max_mb: self.max_size_bytes as f64 / (1024.0 * 1024.0),
            });
        }

        Ok(extension)
    }
}

/// Lowercase extension with leading dot, or an empty string.
pub fn extension_of(filename: &str) -> String {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| format!(".{}", e.to_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_known_video_types() {
        let policy = UploadPolicy::default();
        assert_eq!(policy.validate("clip.MP4", 10).unwrap(), ".mp4");
        assert_eq!(policy.validate("a.b.mov", 10).unwrap(), ".mov");
        assert_eq!(policy.validate("x.avi", MAX_UPLOAD_BYTES).unwrap(), ".avi");
    }

    #[test]
    fn test_rejects_wrong_extension() {
        let policy = UploadPolicy::default();
        let err = policy.validate("notes.txt", 10).unwrap_err();
        assert_eq!(err.status_code(), 400);
        assert!(err.to_string().contains("Invalid file type '.txt'"));

        let err = policy.validate("no_extension", 10).unwrap_err();
        assert!(matches!(err, UploadRejection::InvalidExtension { ref extension, .. } if extension.is_empty()));
    }

    #[test]
    fn test_rejects_oversized_upload() {
        let policy = UploadPolicy::default();
        let err = policy.validate("big.mp4", MAX_UPLOAD_BYTES + 1).unwrap_err();
        assert_eq!(err.status_code(), 413);
        assert!(err.to_string().contains("Max allowed: 100 MB"));
    }

    #[test]
    fn test_still_images_rejected() {
        let policy = UploadPolicy::default();
        for name in ["frame.jpg", "frame.jpeg", "frame.PNG"] {
            assert!(policy.validate(name, 1).is_err());
        }
    }
}
