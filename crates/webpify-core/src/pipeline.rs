//! Conversion pipeline.
//!
//! Runs one upload through validation, the resource guard, decoding,
//! resizing, WebP encoding and the replacement policy. Any failure leaves the
//! original upload in place; [`convert_upload`] then returns the descriptor
//! it was given.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::{clamp_quality, ConversionConfig};
use crate::decode::{resize_to_fit, DecodeError};
use crate::encode::{write_webp, EncodeError};
use crate::guard::{GuardError, ResourceGuard};
use crate::hooks::{ConversionHooks, DefaultHooks};
use crate::replace::{apply_replacement, ReplaceError};
use crate::validate::{validate_upload, ValidationError};
use crate::{ConversionResult, UploadDescriptor};

/// Why an upload was not converted.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Not a conversion candidate: {0}")]
    Validation(#[from] ValidationError),

    #[error("Skipped by resource guard: {0}")]
    Guard(#[from] GuardError),

    #[error("Decoding failed: {0}")]
    Decode(#[from] DecodeError),

    #[error("Encoding failed: {0}")]
    Encode(#[from] EncodeError),

    #[error("Original kept: {0}")]
    Replace(#[from] ReplaceError),
}

impl ConversionError {
    /// Short name of the stage that stopped the conversion.
    pub fn stage(&self) -> &'static str {
        match self {
            ConversionError::Validation(_) => "validate",
            ConversionError::Guard(_) => "guard",
            ConversionError::Decode(_) => "decode",
            ConversionError::Encode(_) => "encode",
            ConversionError::Replace(_) => "replace",
        }
    }

    /// Whether this is a routine outcome rather than a fault.
    ///
    /// Non-image uploads, oversized images and declined replacements happen
    /// in normal operation. Spoofed content and paths escaping the storage
    /// root are not routine and are reported as faults.
    pub fn is_expected(&self) -> bool {
        match self {
            ConversionError::Validation(
                ValidationError::ContentMismatch { .. } | ValidationError::OutsideStorageRoot(_),
            ) => false,
            ConversionError::Validation(_) | ConversionError::Guard(_) => true,
            ConversionError::Replace(ReplaceError::Declined | ReplaceError::NotSmaller { .. }) => true,
            _ => false,
        }
    }
}

/// Convert `upload`, reporting why it was left alone.
///
/// On `Ok` the original file is gone and the returned descriptor points at
/// the WebP file. On `Err` the original is untouched. A declined
/// replacement leaves the WebP file next to it; every other error leaves no
/// WebP file created by this call.
pub fn try_convert_upload(
    upload: &UploadDescriptor,
    storage_root: &Path,
    config: &ConversionConfig,
    hooks: &dyn ConversionHooks,
) -> Result<UploadDescriptor, ConversionError> {
    let plan = validate_upload(upload, storage_root)?;
    let converted = upload
        .converted_to(&plan.webp_path, &plan.extension)
        .ok_or_else(|| ValidationError::UrlMismatch {
            url: upload.url.clone(),
            extension: plan.extension.clone(),
        })?;

    ResourceGuard::from_config(config).check_file(&plan.source, plan.format)?;

    let raster = {
        let bytes = fs::read(&plan.source).map_err(DecodeError::from)?;
        plan.format.decode(&bytes)?
    };
    let raster = resize_to_fit(
        raster,
        config.max_width(),
        config.max_height(),
        config.resize_filter(),
    );

    let quality = clamp_quality(hooks.quality(config.quality()));
    let written = write_webp(&raster, quality, &plan.webp_path)?;
    drop(raster);

    let replace = hooks.replace_original(&plan.source, &plan.webp_path, config.replace_original());
    apply_replacement(config.replace_policy(), replace, &plan.source, &plan.webp_path)?;

    tracing::info!(
        source = %plan.source.display(),
        target = %plan.webp_path.display(),
        quality,
        bytes = written,
        "Converted upload to WebP"
    );

    Ok(converted)
}

/// Convert `upload` and classify the outcome.
pub fn convert(
    upload: &UploadDescriptor,
    storage_root: &Path,
    config: &ConversionConfig,
    hooks: &dyn ConversionHooks,
) -> ConversionResult {
    match try_convert_upload(upload, storage_root, config, hooks) {
        Ok(converted) => ConversionResult::Converted(converted),
        Err(e) => {
            if e.is_expected() {
                tracing::debug!(file = %upload.file.display(), stage = e.stage(), reason = %e, "Upload left unchanged");
            } else {
                tracing::warn!(file = %upload.file.display(), stage = e.stage(), error = %e, "WebP conversion failed, keeping original");
            }
            ConversionResult::Unchanged(upload.clone())
        }
    }
}

/// Upload handler entry point: the converted descriptor, or `upload` itself.
pub fn convert_upload(
    upload: &UploadDescriptor,
    storage_root: &Path,
    config: &ConversionConfig,
    hooks: &dyn ConversionHooks,
) -> UploadDescriptor {
    convert(upload, storage_root, config, hooks).into_descriptor()
}

/// A configured converter bound to one storage root.
pub struct UploadConverter {
    storage_root: PathBuf,
    config: ConversionConfig,
    hooks: Box<dyn ConversionHooks>,
}

impl UploadConverter {
    pub fn new(storage_root: impl Into<PathBuf>, config: ConversionConfig) -> Self {
        Self {
            storage_root: storage_root.into(),
            config,
            hooks: Box::new(DefaultHooks),
        }
    }

    /// Replace the host hooks.
    pub fn with_hooks(mut self, hooks: impl ConversionHooks + 'static) -> Self {
        self.hooks = Box::new(hooks);
        self
    }

    pub fn storage_root(&self) -> &Path {
        &self.storage_root
    }

    pub fn config(&self) -> &ConversionConfig {
        &self.config
    }

    pub fn try_convert(&self, upload: &UploadDescriptor) -> Result<UploadDescriptor, ConversionError> {
        try_convert_upload(upload, &self.storage_root, &self.config, self.hooks.as_ref())
    }

    pub fn convert(&self, upload: &UploadDescriptor) -> UploadDescriptor {
        convert_upload(upload, &self.storage_root, &self.config, self.hooks.as_ref())
    }
}

impl std::fmt::Debug for UploadConverter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadConverter")
            .field("storage_root", &self.storage_root)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
