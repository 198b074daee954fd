//! Webpify Core - upload-time WebP conversion
//!
//! This crate converts freshly uploaded JPEG and PNG files into WebP,
//! optionally shrinking them to configured maximum dimensions, and decides
//! whether the WebP file replaces the original upload.
//!
//! # Pipeline
//!
//! 1. [`validate`] - descriptor checks, content sniffing, storage confinement
//! 2. [`guard`] - decoded-size estimate against the memory ceiling
//! 3. [`decode`] - decode, EXIF orientation (JPEG), truecolor + alpha (PNG), resize
//! 4. [`encode`] - lossy WebP at the configured quality, written next to the source
//! 5. [`replace`] - adopt the WebP file or roll back to the original
//!
//! Every stage can abort; [`convert_upload`] then hands the descriptor back
//! unchanged.

pub mod config;
pub mod decode;
pub mod encode;
pub mod guard;
pub mod hooks;
pub mod pipeline;
pub mod replace;
pub mod validate;

#[cfg(test)]
mod fixtures;

use std::collections::HashMap;
use std::path::{Path, PathBuf};

pub use config::{ConversionConfig, ConversionSettings};
pub use hooks::{ConversionHooks, DefaultHooks};
pub use pipeline::{convert, convert_upload, try_convert_upload, ConversionError, UploadConverter};
pub use replace::ReplacePolicy;

/// MIME type reported for converted uploads.
pub const WEBP_MIME_TYPE: &str = "image/webp";

/// File extension used for converted uploads.
pub const WEBP_EXTENSION: &str = "webp";

/// A stored upload as reported by the host's upload handler.
///
/// Field names on the wire follow the host (`file`, `url`, `type`).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct UploadDescriptor {
    /// Absolute location of the stored file
    pub file: PathBuf,
    /// Public URL of the stored file
    pub url: String,
    /// MIME type claimed by the upload source
    #[serde(rename = "type")]
    pub mime_type: String,
}

impl UploadDescriptor {
    pub fn new(file: impl Into<PathBuf>, url: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            file: file.into(),
            url: url.into(),
            mime_type: mime_type.into(),
        }
    }

    /// Descriptor for the WebP sibling of this upload.
    ///
    /// `source_extension` is the extension being swapped out of the URL.
    /// Returns `None` when the URL does not end with it, since the path and
    /// URL could then no longer be kept in lockstep.
    pub fn converted_to(&self, webp_path: &Path, source_extension: &str) -> Option<Self> {
        let url = rewrite_url_extension(&self.url, source_extension)?;
        Some(Self {
            file: webp_path.to_path_buf(),
            url,
            mime_type: WEBP_MIME_TYPE.to_string(),
        })
    }

    /// Check whether this descriptor already points at a WebP file
    pub fn is_webp(&self) -> bool {
        self.mime_type == WEBP_MIME_TYPE
    }
}

/// Outcome of one conversion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConversionResult {
    /// Conversion did not happen; the original descriptor is passed through.
    Unchanged(UploadDescriptor),
    /// The WebP file replaced the original upload.
    Converted(UploadDescriptor),
}

impl ConversionResult {
    /// The descriptor to hand back to the host.
    pub fn into_descriptor(self) -> UploadDescriptor {
        match self {
            ConversionResult::Unchanged(upload) | ConversionResult::Converted(upload) => upload,
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, ConversionResult::Converted(_))
    }
}

/// Replace a trailing `.<extension>` in `url` (case-insensitive) with `.webp`.
pub(crate) fn rewrite_url_extension(url: &str, extension: &str) -> Option<String> {
    if extension.is_empty() {
        return None;
    }
    let suffix_len = extension.len() + 1;
    let split = url.len().checked_sub(suffix_len)?;
    let suffix = url.get(split..)?;
    let ext = suffix.strip_prefix('.')?;
    if !ext.eq_ignore_ascii_case(extension) {
        return None;
    }
    Some(format!("{}.{}", &url[..split], WEBP_EXTENSION))
}

/// Register WebP in a host's extension -> MIME allow-list.
///
/// Hosts that filter uploads by extension would otherwise refuse files that
/// are already WebP.
pub fn allow_webp_uploads(mimes: &mut HashMap<String, String>) {
    mimes.insert(WEBP_EXTENSION.to_string(), WEBP_MIME_TYPE.to_string());
}
