//! Extension points called by the pipeline.
//!
//! The host implements [`ConversionHooks`] to adjust the encode quality or to
//! veto replacing an original upload. Both hooks receive the configured
//! default and return the effective value.

use std::path::Path;

/// Per-conversion overrides supplied by the host.
pub trait ConversionHooks: Send + Sync {
    /// Override the WebP quality.
    ///
    /// The returned value is clamped to 0-100 before use.
    fn quality(&self, default_quality: u8) -> i64 {
        default_quality as i64
    }

    /// Decide whether the converted file replaces `original`.
    fn replace_original(&self, original: &Path, converted: &Path, default: bool) -> bool {
        let _ = (original, converted);
        default
    }
}

/// Hooks that keep every configured default.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultHooks;

impl ConversionHooks for DefaultHooks {}
