//! Client-side media attachment gate.
//!
//! Size limits here fail fast before an upload starts; the server enforces
//! the same limits authoritatively.
use crate::error::{ClientError, Result};

pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
pub const MAX_VIDEO_BYTES: usize = 50 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    pub fn max_bytes(self) -> usize {
        match self {
            MediaKind::Image => MAX_IMAGE_BYTES,
            MediaKind::Video => MAX_VIDEO_BYTES,
        }
    }

    /// Value of the upload form's `fileType` field.
    pub fn as_str(self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

/// A file picked by the user
#[derive(Debug, Clone, PartialEq)]
pub struct MediaFile {
    pub file_name: String,
    pub content_type: String,
    pub bytes: Vec<u8>,
}

/// At most one image or one video attached to the composer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MediaAttachment {
    selected: Option<(MediaKind, MediaFile)>,
}

impl MediaAttachment {
    /// Attach `file`, replacing whatever was attached. An oversize file is
    /// rejected and the previous attachment stays.
    pub fn select(&mut self, kind: MediaKind, file: MediaFile) -> Result<()> {
        if file.bytes.len() > kind.max_bytes() {
            return Err(ClientError::MediaRejected(match kind {
                MediaKind::Image => "Image files must be less than 5MB".to_string(),
                MediaKind::Video => "Video files must be less than 50MB".to_string(),
            }));
        }
        self.selected = Some((kind, file));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.selected = None;
    }

    pub fn selected(&self) -> Option<(MediaKind, &MediaFile)> {
        self.selected.as_ref().map(|(kind, file)| (*kind, file))
    }

    pub fn image(&self) -> Option<&MediaFile> {
        match &self.selected {
            Some((MediaKind::Image, file)) => Some(file),
            _ => None,
        }
    }

    pub fn video(&self) -> Option<&MediaFile> {
        match &self.selected {
            Some((MediaKind::Video, file)) => Some(file),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.selected.is_none()
    }
}
