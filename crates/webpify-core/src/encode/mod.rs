//! Image encoding for converted uploads.
//!
//! This module provides functionality for:
//! - Encoding rasters to lossy WebP with configurable quality
//! - Writing the result next to the source without clobbering existing files
//!
//! # Examples
//!
//! ```ignore
//! use webpify_core::encode::write_webp;
//!
//! let bytes = write_webp(&raster, 80, Path::new("/uploads/photo.webp")).unwrap();
//! println!("Wrote {} bytes", bytes);
//! ```

mod webp;

pub use self::webp::{encode_webp, write_webp, EncodeError, MAX_WEBP_DIMENSION};
