//! Resource guard.
//!
//! Estimates decoded memory from the image header alone and refuses
//! conversions that would come too close to the process memory limit.

use std::path::Path;

use image::ImageReader;
use thiserror::Error;

use crate::config::{clamp_guard_fraction, ConversionConfig};
use crate::decode::SourceFormat;

/// Working-set bytes assumed per pixel while decoding and encoding.
pub const BYTES_PER_PIXEL_ESTIMATE: u64 = 5;

#[derive(Debug, Error)]
pub enum GuardError {
    #[error(
        "Decoding {width}x{height} needs about {estimated} bytes, above the {ceiling} byte ceiling"
    )]
    ExceedsMemory {
        estimated: u64,
        ceiling: u64,
        width: u32,
        height: u32,
    },
}

/// Estimated working memory for a `width` x `height` image.
pub fn estimate_decoded_bytes(width: u32, height: u32) -> u64 {
    (width as u64)
        .saturating_mul(height as u64)
        .saturating_mul(BYTES_PER_PIXEL_ESTIMATE)
}

/// Memory ceiling check applied before decoding.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResourceGuard {
    memory_limit: Option<u64>,
    fraction: f64,
}

impl ResourceGuard {
    /// Guard against `memory_limit` bytes, `None` meaning unlimited.
    pub fn new(memory_limit: Option<u64>, fraction: f64) -> Self {
        Self {
            memory_limit,
            fraction: clamp_guard_fraction(fraction),
        }
    }

    pub fn from_config(config: &ConversionConfig) -> Self {
        Self::new(config.memory_limit(), config.guard_fraction())
    }

    /// Largest allowed estimate, or `None` when the guard is disabled.
    pub fn ceiling(&self) -> Option<u64> {
        self.memory_limit
            .map(|limit| (limit as f64 * self.fraction) as u64)
    }

    /// Check known dimensions against the ceiling.
    pub fn check_dimensions(&self, width: u32, height: u32) -> Result<(), GuardError> {
        let Some(ceiling) = self.ceiling() else {
            return Ok(());
        };

        let estimated = estimate_decoded_bytes(width, height);
        if estimated > ceiling {
            return Err(GuardError::ExceedsMemory {
                estimated,
                ceiling,
                width,
                height,
            });
        }
        Ok(())
    }

    /// Read the dimensions of `path` from its header and check them.
    ///
    /// Returns the dimensions when they could be read. Unreadable headers are
    /// not rejected here; the decoder reports them properly.
    pub fn check_file(
        &self,
        path: &Path,
        format: SourceFormat,
    ) -> Result<Option<(u32, u32)>, GuardError> {
        if self.ceiling().is_none() {
            return Ok(None);
        }

        match read_dimensions(path, format) {
            Some((width, height)) => {
                self.check_dimensions(width, height)?;
                Ok(Some((width, height)))
            }
            None => {
                tracing::debug!(path = %path.display(), "Image dimensions unreadable, skipping memory check");
                Ok(None)
            }
        }
    }
}

impl Default for ResourceGuard {
    fn default() -> Self {
        Self::from_config(&ConversionConfig::default())
    }
}

/// Read width and height without decoding pixel data.
pub fn read_dimensions(path: &Path, format: SourceFormat) -> Option<(u32, u32)> {
    let mut reader = ImageReader::open(path).ok()?;
    reader.set_format(format.image_format());
    reader.into_dimensions().ok()
}
