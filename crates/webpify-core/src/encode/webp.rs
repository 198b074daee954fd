//! WebP encoding and output.
//!
//! Encoding uses libwebp (through the `webp` crate) in lossy mode with the
//! configured quality factor. Output goes through a temporary file in the
//! destination directory that is renamed into place without clobbering, so a
//! failed write never leaves a partial `.webp` behind and an existing file is
//! never overwritten.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::decode::Raster;

/// Largest width or height libwebp can encode.
pub const MAX_WEBP_DIMENSION: u32 = 16383;

/// Errors that can occur during WebP encoding and writing.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// Pixel data length doesn't match expected dimensions
    #[error("Invalid pixel data: expected {expected} bytes, got {actual}")]
    InvalidPixelData { expected: usize, actual: usize },

    /// Width or height is zero
    #[error("Invalid dimensions: width ({width}) and height ({height}) must be non-zero")]
    InvalidDimensions { width: u32, height: u32 },

    /// Width or height is beyond what WebP can store
    #[error("Dimensions {width}x{height} exceed the WebP limit of {MAX_WEBP_DIMENSION}")]
    DimensionsTooLarge { width: u32, height: u32 },

    /// libwebp reported an error
    #[error("WebP encoding failed: {0}")]
    EncodingFailed(String),

    /// The destination path has no parent directory
    #[error("Destination has no parent directory: {0}")]
    NoParentDirectory(PathBuf),

    /// The destination directory cannot be written to
    #[error("Directory is not writable: {path}")]
    DirectoryNotWritable { path: PathBuf },

    /// The destination already exists
    #[error("Destination already exists: {0}")]
    DestinationExists(PathBuf),

    /// Writing the output failed
    #[error("Failed to write {path}: {source}")]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The rename reported success but the file is not there
    #[error("Output file missing after write: {0}")]
    OutputMissing(PathBuf),
}

/// Encode a raster to lossy WebP bytes.
///
/// # Arguments
///
/// * `raster` - RGB or RGBA raster
/// * `quality` - WebP quality (0-100, clamped)
///
/// # Errors
///
/// Returns an error for empty or oversized rasters, mismatched pixel data,
/// or an encoder failure.
pub fn encode_webp(raster: &Raster, quality: u8) -> Result<Vec<u8>, EncodeError> {
    let (width, height) = (raster.width, raster.height);

    if width == 0 || height == 0 {
        return Err(EncodeError::InvalidDimensions { width, height });
    }
    if width > MAX_WEBP_DIMENSION || height > MAX_WEBP_DIMENSION {
        return Err(EncodeError::DimensionsTooLarge { width, height });
    }

    let expected = raster.expected_len();
    if raster.pixels.len() != expected {
        return Err(EncodeError::InvalidPixelData {
            expected,
            actual: raster.pixels.len(),
        });
    }

    let quality = quality.min(100) as f32;

    let encoder = if raster.has_alpha {
        webp::Encoder::from_rgba(&raster.pixels, width, height)
    } else {
        webp::Encoder::from_rgb(&raster.pixels, width, height)
    };

    let memory = encoder
        .encode_simple(false, quality)
        .map_err(|e| EncodeError::EncodingFailed(format!("{:?}", e)))?;

    Ok(memory.to_vec())
}

/// Encode `raster` and write it to `destination`.
///
/// Returns the number of bytes written. On any error nothing is left at
/// `destination`.
pub fn write_webp(raster: &Raster, quality: u8, destination: &Path) -> Result<u64, EncodeError> {
    let dir = destination
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| EncodeError::NoParentDirectory(destination.to_path_buf()))?;

    ensure_writable(dir)?;

    let bytes = encode_webp(raster, quality)?;

    let mut tmp = tempfile::Builder::new()
        .prefix(".webpify-")
        .suffix(".tmp")
        .tempfile_in(dir)
        .map_err(|_| EncodeError::DirectoryNotWritable {
            path: dir.to_path_buf(),
        })?;

    let write_err = |source| EncodeError::WriteFailed {
        path: destination.to_path_buf(),
        source,
    };
    tmp.write_all(&bytes).map_err(write_err)?;
    tmp.as_file().sync_all().map_err(write_err)?;

    // The temporary file is removed when the persist error is dropped
    tmp.persist_noclobber(destination).map_err(|e| {
        if e.error.kind() == io::ErrorKind::AlreadyExists {
            EncodeError::DestinationExists(destination.to_path_buf())
        } else {
            write_err(e.error)
        }
    })?;

    if !destination.is_file() {
        return Err(EncodeError::OutputMissing(destination.to_path_buf()));
    }

    Ok(bytes.len() as u64)
}

fn ensure_writable(dir: &Path) -> Result<(), EncodeError> {
    let writable = fs::metadata(dir)
        .map(|m| m.is_dir() && !m.permissions().readonly())
        .unwrap_or(false);
    if writable {
        Ok(())
    } else {
        Err(EncodeError::DirectoryNotWritable {
            path: dir.to_path_buf(),
        })
    }
}


// ============================================================================
// Property-Based Tests
// ============================================================================
