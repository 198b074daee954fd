//! JPEG image decoding with EXIF orientation handling.
//!
//! Only the pure rotations are corrected: orientation 3 (180°), 6 (90° CW)
//! and 8 (90° CCW). The mirrored orientations 2, 4, 5 and 7 are decoded as
//! stored, without any flip or rotation.

use std::io::Cursor;

use exif::{In, Reader, Tag};
use image::{DynamicImage, ImageFormat, ImageReader};

use super::{DecodeError, Orientation, Raster};

/// Decode a JPEG image from bytes, applying EXIF orientation correction.
///
/// # Arguments
///
/// * `bytes` - Raw JPEG file bytes
///
/// # Returns
///
/// An RGB `Raster` with rotation applied.
///
/// # Errors
///
/// Returns `DecodeError::CorruptedFile` if the JPEG is corrupted.
pub fn decode_jpeg(bytes: &[u8]) -> Result<Raster, DecodeError> {
    // Extract EXIF orientation before decoding
    let orientation = get_orientation(bytes);

    let reader = ImageReader::with_format(Cursor::new(bytes), ImageFormat::Jpeg);
    let img = reader.decode()?;

    let oriented_img = apply_orientation(img, orientation);

    Ok(Raster::from_rgb_image(oriented_img.into_rgb8()))
}

/// Extract EXIF orientation from JPEG bytes.
///
/// Returns `Orientation::Normal` if no EXIF data is found or orientation
/// cannot be determined.
pub fn get_orientation(bytes: &[u8]) -> Orientation {
    let exif_reader = Reader::new();
    let mut cursor = Cursor::new(bytes);

    match exif_reader.read_from_container(&mut cursor) {
        Ok(exif) => exif
            .get_field(Tag::Orientation, In::PRIMARY)
            .and_then(|field| field.value.get_uint(0))
            .map(Orientation::from)
            .unwrap_or_default(),
        Err(_) => Orientation::Normal,
    }
}

/// Apply EXIF orientation rotation to an image.
fn apply_orientation(img: DynamicImage, orientation: Orientation) -> DynamicImage {
    if orientation.is_mirrored() {
        tracing::debug!(?orientation, "Mirrored EXIF orientation left uncorrected");
        return img;
    }

    match orientation {
        Orientation::Rotate180 => img.rotate180(),
        Orientation::Rotate90CW => img.rotate90(),
        Orientation::Rotate270CW => img.rotate270(),
        _ => img,
    }
}
