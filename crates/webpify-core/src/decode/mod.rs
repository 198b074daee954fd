//! Image decoding and normalization.
//!
//! This module provides functionality for:
//! - Decoding JPEG images with EXIF orientation correction
//! - Decoding PNG images to RGBA so transparency is kept
//! - Shrinking rasters to fit configured maximum dimensions
//!
//! # Architecture
//!
//! [`SourceFormat`] is the closed set of inputs the pipeline converts. Each
//! variant knows how to decode and normalize its bytes into a [`Raster`];
//! supporting another input format means adding a variant.
//!
//! # Examples
//!
//! ```ignore
//! use webpify_core::decode::{resize_to_fit, FilterType, SourceFormat};
//!
//! let bytes = std::fs::read("photo.jpg").unwrap();
//! let raster = SourceFormat::Jpeg.decode(&bytes).unwrap();
//! let raster = resize_to_fit(raster, 1920, 0, FilterType::Bilinear);
//! println!("Decoded {}x{} image", raster.width, raster.height);
//! ```

mod format;
mod jpeg;
mod png;
mod resize;
mod types;

pub use format::{SourceFormat, SNIFF_LEN};
pub use jpeg::{decode_jpeg, get_orientation};
pub use png::decode_png;
pub use resize::{calculate_fit_dimensions, resize, resize_to_fit};
pub use types::{DecodeError, FilterType, Orientation, Raster};
