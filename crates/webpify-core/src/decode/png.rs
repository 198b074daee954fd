//! PNG image decoding.
//!
//! Palette, greyscale and 16-bit inputs are all expanded to 8-bit RGBA so the
//! alpha channel is explicit from decode through encode.

use std::io::Cursor;

use image::{ImageFormat, ImageReader};

use super::{DecodeError, Raster};

/// Decode a PNG image from bytes into an RGBA `Raster`.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the PNG is corrupted.
pub fn decode_png(bytes: &[u8]) -> Result<Raster, DecodeError> {
    let reader = ImageReader::with_format(Cursor::new(bytes), ImageFormat::Png);
    let img = reader.decode()?;

    Ok(Raster::from_rgba_image(img.into_rgba8()))
}
