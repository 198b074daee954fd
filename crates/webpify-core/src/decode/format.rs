//! Source formats accepted for conversion.

use image::ImageFormat;

use super::{decode_jpeg, decode_png, DecodeError, Raster};

const JPEG_MAGIC: &[u8] = &[0xFF, 0xD8, 0xFF];
const PNG_MAGIC: &[u8] = &[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Number of leading bytes needed by [`SourceFormat::sniff`].
pub const SNIFF_LEN: usize = 8;

/// A raster format that can be converted to WebP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceFormat {
    Jpeg,
    Png,
}

impl SourceFormat {
    /// Map a declared MIME type to a source format.
    ///
    /// Anything other than `image/jpeg` and `image/png`, WebP included, is
    /// not a conversion source.
    pub fn from_mime(mime_type: &str) -> Option<Self> {
        match mime_type {
            "image/jpeg" => Some(SourceFormat::Jpeg),
            "image/png" => Some(SourceFormat::Png),
            _ => None,
        }
    }

    /// Detect the format from leading magic bytes.
    pub fn sniff(header: &[u8]) -> Option<Self> {
        if header.starts_with(JPEG_MAGIC) {
            Some(SourceFormat::Jpeg)
        } else if header.starts_with(PNG_MAGIC) {
            Some(SourceFormat::Png)
        } else {
            None
        }
    }

    pub fn image_format(self) -> ImageFormat {
        match self {
            SourceFormat::Jpeg => ImageFormat::Jpeg,
            SourceFormat::Png => ImageFormat::Png,
        }
    }

    /// Decode `bytes` and apply the format's normalization.
    ///
    /// - JPEG: EXIF orientation correction, RGB output
    /// - PNG: truecolor with an explicit alpha channel
    pub fn decode(self, bytes: &[u8]) -> Result<Raster, DecodeError> {
        match self {
            SourceFormat::Jpeg => decode_jpeg(bytes),
            SourceFormat::Png => decode_png(bytes),
        }
    }
}
