//! Replacement policy applied after a successful encode.
//!
//! Exactly one [`ReplacePolicy`] is deployed. When replacement is declined
//! both files stay side by side. Otherwise only one survives: either the
//! original is deleted and the WebP file is adopted, or the WebP file is
//! deleted and the original stays.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a converted file takes over from the original upload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReplacePolicy {
    /// Replace whenever the replace decision allows it.
    #[default]
    Always,
    /// Replace only when the WebP file is strictly smaller than the original.
    IfSmaller,
}

impl ReplacePolicy {
    /// Parse a policy name (`always`, `if_smaller`).
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "always" => Some(ReplacePolicy::Always),
            "if_smaller" | "only_if_smaller" => Some(ReplacePolicy::IfSmaller),
            _ => None,
        }
    }
}

/// Reasons the converted file was not adopted.
#[derive(Debug, Error)]
pub enum ReplaceError {
    /// The replace decision (configuration or hook) said no.
    #[error("Replacement of the original declined")]
    Declined,

    /// The WebP file is not smaller than the original.
    #[error("WebP output ({converted} bytes) is not smaller than the original ({original} bytes)")]
    NotSmaller { original: u64, converted: u64 },

    /// A file size could not be read.
    #[error("Failed to stat {path}: {source}")]
    Metadata { path: PathBuf, source: io::Error },

    /// The original could not be deleted.
    #[error("Failed to delete original {path}: {source}")]
    DeleteFailed { path: PathBuf, source: io::Error },
}

/// Apply `policy` to an `original`/`converted` pair.
///
/// `replace` is the effective replace decision. On `Ok` the original has
/// been deleted and the converted file is the upload. On
/// [`ReplaceError::Declined`] both files are kept. On any other `Err` the
/// converted file has been removed and the original is untouched.
pub fn apply_replacement(
    policy: ReplacePolicy,
    replace: bool,
    original: &Path,
    converted: &Path,
) -> Result<(), ReplaceError> {
    let outcome = adopt(policy, replace, original, converted);
    match &outcome {
        Ok(()) | Err(ReplaceError::Declined) => {}
        Err(_) => discard(converted),
    }
    outcome
}

fn adopt(
    policy: ReplacePolicy,
    replace: bool,
    original: &Path,
    converted: &Path,
) -> Result<(), ReplaceError> {
    if !replace {
        return Err(ReplaceError::Declined);
    }

    if policy == ReplacePolicy::IfSmaller {
        let original_size = file_size(original)?;
        let converted_size = file_size(converted)?;
        if converted_size >= original_size {
            return Err(ReplaceError::NotSmaller {
                original: original_size,
                converted: converted_size,
            });
        }
    }

    fs::remove_file(original).map_err(|source| ReplaceError::DeleteFailed {
        path: original.to_path_buf(),
        source,
    })
}

fn file_size(path: &Path) -> Result<u64, ReplaceError> {
    fs::metadata(path)
        .map(|m| m.len())
        .map_err(|source| ReplaceError::Metadata {
            path: path.to_path_buf(),
            source,
        })
}

/// Remove a generated file, logging instead of failing.
pub(crate) fn discard(path: &Path) {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Failed to remove generated WebP file");
        }
    }
}
