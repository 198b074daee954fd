//! Downscaling to configured maximum dimensions.
//!
//! A single uniform scale factor is applied to both axes so the aspect ratio
//! is preserved:
//!
//! ```text
//! scale_w = max_width  > 0 ? max_width  / width  : 1
//! scale_h = max_height > 0 ? max_height / height : 1
//! scale   = min(scale_w, scale_h, 1)
//! ```
//!
//! Images are only ever shrunk (`scale < 1`), never enlarged.

use super::{DecodeError, FilterType, Raster};

/// Resize a raster to exact dimensions.
///
/// Allocates a new raster; the alpha channel, if any, is resampled with the
/// color channels so transparency is preserved.
///
/// # Errors
///
/// Returns `DecodeError::InvalidFormat` for zero target dimensions or a
/// source buffer that does not match its dimensions.
pub fn resize(
    raster: &Raster,
    width: u32,
    height: u32,
    filter: FilterType,
) -> Result<Raster, DecodeError> {
    if width == 0 || height == 0 || raster.is_empty() {
        return Err(DecodeError::InvalidFormat);
    }

    let filter = filter.to_image_filter();

    if raster.has_alpha {
        let src = image::ImageBuffer::<image::Rgba<u8>, &[u8]>::from_raw(
            raster.width,
            raster.height,
            &raster.pixels[..],
        )
        .ok_or(DecodeError::InvalidFormat)?;
        Ok(Raster::from_rgba_image(image::imageops::resize(
            &src, width, height, filter,
        )))
    } else {
        let src = image::ImageBuffer::<image::Rgb<u8>, &[u8]>::from_raw(
            raster.width,
            raster.height,
            &raster.pixels[..],
        )
        .ok_or(DecodeError::InvalidFormat)?;
        Ok(Raster::from_rgb_image(image::imageops::resize(
            &src, width, height, filter,
        )))
    }
}

/// Shrink a raster to fit within `max_width` x `max_height`.
///
/// A limit of 0 leaves that axis unconstrained. Returns the same raster when
/// no shrinking is needed. If resampling fails the unresized raster is
/// returned, so a resize problem never aborts a conversion.
pub fn resize_to_fit(raster: Raster, max_width: u32, max_height: u32, filter: FilterType) -> Raster {
    let Some((new_width, new_height)) =
        calculate_fit_dimensions(raster.width, raster.height, max_width, max_height)
    else {
        return raster;
    };

    match resize(&raster, new_width, new_height, filter) {
        Ok(resized) => {
            tracing::debug!(
                from_width = raster.width,
                from_height = raster.height,
                to_width = resized.width,
                to_height = resized.height,
                "Resized raster"
            );
            resized
        }
        Err(e) => {
            tracing::warn!(error = %e, "Resize failed, keeping original dimensions");
            raster
        }
    }
}

/// Calculate the dimensions that fit within the limits.
///
/// Returns `None` when no resize is needed: both limits are 0, the image
/// already fits, or the source has a zero dimension.
pub fn calculate_fit_dimensions(
    width: u32,
    height: u32,
    max_width: u32,
    max_height: u32,
) -> Option<(u32, u32)> {
    if width == 0 || height == 0 || (max_width == 0 && max_height == 0) {
        return None;
    }

    let scale_w = if max_width > 0 {
        max_width as f64 / width as f64
    } else {
        1.0
    };
    let scale_h = if max_height > 0 {
        max_height as f64 / height as f64
    } else {
        1.0
    };
    let scale = scale_w.min(scale_h).min(1.0);

    if scale >= 1.0 {
        return None;
    }

    let new_width = ((width as f64 * scale).round() as u32).clamp(1, width);
    let new_height = ((height as f64 * scale).round() as u32).clamp(1, height);

    if (new_width, new_height) == (width, height) {
        return None;
    }
    Some((new_width, new_height))
}


// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// Property: output respects both limits and never exceeds the source.
        #[test]
        fn prop_fit_within_bounds(
            width in 1u32..=10_000,
            height in 1u32..=10_000,
            max_width in 0u32..=5_000,
            max_height in 0u32..=5_000,
        ) {
            let (w, h) = calculate_fit_dimensions(width, height, max_width, max_height)
                .unwrap_or((width, height));

            prop_assert!(w >= 1 && h >= 1);
            prop_assert!(w <= width && h <= height, "Never upscale");
            if max_width > 0 {
                prop_assert!(w <= max_width, "{} > max_width {}", w, max_width);
            }
            if max_height > 0 {
                prop_assert!(h <= max_height, "{} > max_height {}", h, max_height);
            }
        }

        /// Property: aspect ratio is preserved within one pixel.
        #[test]
        fn prop_aspect_ratio_preserved(
            width in 1u32..=10_000,
            height in 1u32..=10_000,
            max_width in 0u32..=5_000,
            max_height in 0u32..=5_000,
        ) {
            prop_assume!(max_width > 0 || max_height > 0);

            if let Some((w, h)) = calculate_fit_dimensions(width, height, max_width, max_height) {
                // Derive the shorter side from the longer one and compare
                let error = if width >= height {
                    (h as f64 - w as f64 * height as f64 / width as f64).abs()
                } else {
                    (w as f64 - h as f64 * width as f64 / height as f64).abs()
                };
                prop_assert!(error <= 1.0, "{}x{} -> {}x{} (error {})", width, height, w, h, error);
            }
        }

        /// Property: sources that already fit are never resized.
        #[test]
        fn prop_no_upscale(
            width in 1u32..=5_000,
            height in 1u32..=5_000,
            extra_w in 0u32..=5_000,
            extra_h in 0u32..=5_000,
        ) {
            prop_assert_eq!(
                calculate_fit_dimensions(width, height, width + extra_w, height + extra_h),
                None
            );
        }
    }
}
