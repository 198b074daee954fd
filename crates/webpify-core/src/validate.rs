//! Upload validation.
//!
//! Decides whether an upload is a conversion candidate before any decoding
//! work or filesystem change happens. Checks run in a fixed order and the
//! first failing one rejects the upload.

use std::fs::File;
use std::io::{self, Read};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::decode::{SourceFormat, SNIFF_LEN};
use crate::{rewrite_url_extension, UploadDescriptor, WEBP_EXTENSION};

/// Reasons an upload is not converted.
#[derive(Debug, Error)]
pub enum ValidationError {
    #[error("Upload descriptor is missing its {0}")]
    MissingField(&'static str),

    #[error("Type {0} is not converted")]
    UnsupportedType(String),

    #[error("File is not readable: {path}: {source}")]
    Unreadable { path: PathBuf, source: io::Error },

    #[error("Content of {path} does not match declared type {declared}")]
    ContentMismatch { path: PathBuf, declared: String },

    #[error("Storage root is not accessible: {path}: {source}")]
    StorageRootUnavailable { path: PathBuf, source: io::Error },

    #[error("File resolves outside the storage root: {0}")]
    OutsideStorageRoot(PathBuf),

    #[error("Path has no directory, name or extension: {0}")]
    MalformedPath(PathBuf),

    #[error("URL {url} does not end with .{extension}")]
    UrlMismatch { url: String, extension: String },

    #[error("Target already exists: {0}")]
    TargetExists(PathBuf),
}

/// A validated conversion job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionPlan {
    /// The uploaded file
    pub source: PathBuf,
    /// Format confirmed by both the declared type and the file content
    pub format: SourceFormat,
    /// Extension of the uploaded file, as stored
    pub extension: String,
    /// `<dir>/<stem>.webp` next to the source
    pub webp_path: PathBuf,
}

/// Validate `upload` against `storage_root`.
pub fn validate_upload(
    upload: &UploadDescriptor,
    storage_root: &Path,
) -> Result<ConversionPlan, ValidationError> {
    if upload.file.as_os_str().is_empty() {
        return Err(ValidationError::MissingField("file"));
    }
    if upload.mime_type.is_empty() {
        return Err(ValidationError::MissingField("type"));
    }
    if upload.url.is_empty() {
        return Err(ValidationError::MissingField("url"));
    }

    let format = SourceFormat::from_mime(&upload.mime_type)
        .ok_or_else(|| ValidationError::UnsupportedType(upload.mime_type.clone()))?;

    let source = upload.file.as_path();

    let header = read_header(source).map_err(|e| ValidationError::Unreadable {
        path: source.to_path_buf(),
        source: e,
    })?;
    if SourceFormat::sniff(&header) != Some(format) {
        return Err(ValidationError::ContentMismatch {
            path: source.to_path_buf(),
            declared: upload.mime_type.clone(),
        });
    }

    ensure_within_root(source, storage_root)?;

    let (dir, stem, extension) = split_path(source)
        .ok_or_else(|| ValidationError::MalformedPath(source.to_path_buf()))?;

    if rewrite_url_extension(&upload.url, &extension).is_none() {
        return Err(ValidationError::UrlMismatch {
            url: upload.url.clone(),
            extension,
        });
    }

    let webp_path = dir.join(format!("{stem}.{WEBP_EXTENSION}"));
    if webp_path.exists() {
        return Err(ValidationError::TargetExists(webp_path));
    }

    Ok(ConversionPlan {
        source: source.to_path_buf(),
        format,
        extension,
        webp_path,
    })
}

/// Read up to [`SNIFF_LEN`] bytes from the start of a regular file.
fn read_header(path: &Path) -> io::Result<Vec<u8>> {
    let file = File::open(path)?;
    if !file.metadata()?.is_file() {
        return Err(io::Error::new(io::ErrorKind::InvalidInput, "not a regular file"));
    }
    let mut header = Vec::with_capacity(SNIFF_LEN);
    file.take(SNIFF_LEN as u64).read_to_end(&mut header)?;
    Ok(header)
}

/// Reject files whose resolved path escapes the resolved storage root.
fn ensure_within_root(path: &Path, storage_root: &Path) -> Result<(), ValidationError> {
    let root = storage_root
        .canonicalize()
        .map_err(|e| ValidationError::StorageRootUnavailable {
            path: storage_root.to_path_buf(),
            source: e,
        })?;
    let resolved = path
        .canonicalize()
        .map_err(|_| ValidationError::OutsideStorageRoot(path.to_path_buf()))?;

    if resolved.starts_with(&root) {
        Ok(())
    } else {
        Err(ValidationError::OutsideStorageRoot(path.to_path_buf()))
    }
}

/// Split a path into directory, file stem and extension, all non-empty.
fn split_path(path: &Path) -> Option<(PathBuf, String, String)> {
    let dir = path.parent().filter(|d| !d.as_os_str().is_empty())?;
    let stem = path.file_stem()?.to_str().filter(|s| !s.is_empty())?;
    let extension = path.extension()?.to_str().filter(|e| !e.is_empty())?;
    Some((dir.to_path_buf(), stem.to_string(), extension.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{encode_jpeg, encode_png, noise_image, write_file};
    use std::fs;
    use tempfile::tempdir;

    fn jpeg_upload(dir: &Path, name: &str) -> UploadDescriptor {
        let path = write_file(dir, name, &encode_jpeg(8, 8));
        UploadDescriptor::new(path, format!("https://example.test/uploads/{name}"), "image/jpeg")
    }

    #[test]
    fn test_valid_jpeg_plan() {
        let dir = tempdir().unwrap();
        let upload = jpeg_upload(dir.path(), "photo.jpg");

        let plan = validate_upload(&upload, dir.path()).unwrap();

        assert_eq!(plan.format, SourceFormat::Jpeg);
        assert_eq!(plan.extension, "jpg");
        assert_eq!(plan.webp_path, dir.path().join("photo.webp"));
        assert_eq!(plan.source, upload.file);
    }

    #[test]
    fn test_valid_png_plan() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "Logo.PNG", &encode_png(&noise_image(4, 4)));
        let upload = UploadDescriptor::new(path, "https://example.test/Logo.PNG", "image/png");

        let plan = validate_upload(&upload, dir.path()).unwrap();

        assert_eq!(plan.format, SourceFormat::Png);
        assert_eq!(plan.extension, "PNG");
        assert_eq!(plan.webp_path, dir.path().join("Logo.webp"));
    }

    #[test]
    fn test_missing_fields() {
        let dir = tempdir().unwrap();
        let upload = jpeg_upload(dir.path(), "photo.jpg");

        let mut no_url = upload.clone();
        no_url.url.clear();
        assert!(matches!(
            validate_upload(&no_url, dir.path()),
            Err(ValidationError::MissingField("url"))
        ));

        let mut no_type = upload.clone();
        no_type.mime_type.clear();
        assert!(matches!(
            validate_upload(&no_type, dir.path()),
            Err(ValidationError::MissingField("type"))
        ));

        let mut no_file = upload;
        no_file.file = PathBuf::new();
        assert!(matches!(
            validate_upload(&no_file, dir.path()),
            Err(ValidationError::MissingField("file"))
        ));
    }

    #[test]
    fn test_unsupported_types_pass_through() {
        let dir = tempdir().unwrap();
        for mime in ["image/webp", "image/gif", "application/pdf"] {
            let upload = UploadDescriptor::new(dir.path().join("x.bin"), "https://h/x.bin", mime);
            assert!(matches!(
                validate_upload(&upload, dir.path()),
                Err(ValidationError::UnsupportedType(_))
            ));
        }
    }

    #[test]
    fn test_missing_file_unreadable() {
        let dir = tempdir().unwrap();
        let upload = UploadDescriptor::new(dir.path().join("nope.jpg"), "https://h/nope.jpg", "image/jpeg");
        assert!(matches!(
            validate_upload(&upload, dir.path()),
            Err(ValidationError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let dir = tempdir().unwrap();
        let sub = dir.path().join("folder.jpg");
        fs::create_dir(&sub).unwrap();
        let upload = UploadDescriptor::new(sub, "https://h/folder.jpg", "image/jpeg");
        assert!(matches!(
            validate_upload(&upload, dir.path()),
            Err(ValidationError::Unreadable { .. })
        ));
    }

    #[test]
    fn test_spoofed_content_rejected() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "shell.jpg", b"<?php system($_GET['c']); ?>");
        let upload = UploadDescriptor::new(path, "https://h/shell.jpg", "image/jpeg");
        assert!(matches!(
            validate_upload(&upload, dir.path()),
            Err(ValidationError::ContentMismatch { .. })
        ));
    }

    #[test]
    fn test_png_declared_as_jpeg_rejected() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "photo.jpg", &encode_png(&noise_image(4, 4)));
        let upload = UploadDescriptor::new(path, "https://h/photo.jpg", "image/jpeg");
        assert!(matches!(
            validate_upload(&upload, dir.path()),
            Err(ValidationError::ContentMismatch { .. })
        ));
    }

    #[test]
    fn test_outside_storage_root_rejected() {
        let root = tempdir().unwrap();
        let elsewhere = tempdir().unwrap();
        let upload = jpeg_upload(elsewhere.path(), "photo.jpg");
        assert!(matches!(
            validate_upload(&upload, root.path()),
            Err(ValidationError::OutsideStorageRoot(_))
        ));
    }

    #[test]
    fn test_traversal_through_dot_dot_rejected() {
        let base = tempdir().unwrap();
        let root = base.path().join("uploads");
        fs::create_dir(&root).unwrap();
        write_file(base.path(), "secret.jpg", &encode_jpeg(4, 4));

        let sneaky = root.join("..").join("secret.jpg");
        let upload = UploadDescriptor::new(sneaky, "https://h/secret.jpg", "image/jpeg");
        assert!(matches!(
            validate_upload(&upload, &root),
            Err(ValidationError::OutsideStorageRoot(_))
        ));
    }

    #[test]
    fn test_sibling_prefix_directory_is_outside() {
        // "/tmp/x/uploads-evil" must not count as inside "/tmp/x/uploads"
        let base = tempdir().unwrap();
        let root = base.path().join("uploads");
        let evil = base.path().join("uploads-evil");
        fs::create_dir(&root).unwrap();
        fs::create_dir(&evil).unwrap();
        let upload = jpeg_upload(&evil, "photo.jpg");
        assert!(matches!(
            validate_upload(&upload, &root),
            Err(ValidationError::OutsideStorageRoot(_))
        ));
    }

    #[test]
    fn test_missing_storage_root() {
        let dir = tempdir().unwrap();
        let upload = jpeg_upload(dir.path(), "photo.jpg");
        assert!(matches!(
            validate_upload(&upload, &dir.path().join("does-not-exist")),
            Err(ValidationError::StorageRootUnavailable { .. })
        ));
    }

    #[test]
    fn test_missing_extension_rejected() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "photo", &encode_jpeg(4, 4));
        let upload = UploadDescriptor::new(path, "https://h/photo", "image/jpeg");
        assert!(matches!(
            validate_upload(&upload, dir.path()),
            Err(ValidationError::MalformedPath(_))
        ));
    }

    #[test]
    fn test_url_must_end_with_extension() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "photo.jpg", &encode_jpeg(4, 4));
        let upload = UploadDescriptor::new(path, "https://h/photo.jpg?ver=2", "image/jpeg");
        assert!(matches!(
            validate_upload(&upload, dir.path()),
            Err(ValidationError::UrlMismatch { .. })
        ));
    }

    #[test]
    fn test_existing_target_rejected() {
        let dir = tempdir().unwrap();
        let upload = jpeg_upload(dir.path(), "photo.jpg");
        write_file(dir.path(), "photo.webp", b"already here");

        assert!(matches!(
            validate_upload(&upload, dir.path()),
            Err(ValidationError::TargetExists(_))
        ));
    }

    #[test]
    fn test_split_path() {
        let (dir, stem, ext) = split_path(Path::new("/srv/up/2024/a.b.jpeg")).unwrap();
        assert_eq!(dir, PathBuf::from("/srv/up/2024"));
        assert_eq!(stem, "a.b");
        assert_eq!(ext, "jpeg");

        assert!(split_path(Path::new("/srv/up/.hidden")).is_none());
        assert!(split_path(Path::new("photo.jpg")).is_none());
    }
}
