//! Assets (one manuscript page image each) and the uploads they come from.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::error::MaterializeError;
use crate::metadata;

/// Literal used wherever an identifier or page number could not be derived.
pub const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DocumentId {
    Known(String),
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageNumber {
    Number(u64),
    Unknown,
}

impl Serialize for DocumentId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            DocumentId::Known(id) => serializer.serialize_str(id),
            DocumentId::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl Serialize for PageNumber {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            PageNumber::Number(n) => serializer.serialize_u64(*n),
            PageNumber::Unknown => serializer.serialize_str(UNKNOWN),
        }
    }
}

impl PageNumber {
    pub fn as_number(&self) -> Option<u64> {
        match self {
            PageNumber::Number(n) => Some(*n),
            PageNumber::Unknown => None,
        }
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DocumentId::Known(id) => f.write_str(id),
            DocumentId::Unknown => f.write_str(UNKNOWN),
        }
    }
}

impl fmt::Display for PageNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PageNumber::Number(n) => write!(f, "{}", n),
            PageNumber::Unknown => f.write_str(UNKNOWN),
        }
    }
}

/// A single page image on local storage, ready for analysis.
///
/// Created by the materializer and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Location on disk.
    pub path: PathBuf,
    /// Location relative to the materialization root, used for metadata and report links.
    pub relative_path: PathBuf,
    pub document_id: DocumentId,
    pub page_number: PageNumber,
    pub size_bytes: u64,
}

impl Asset {
    /// Builds an asset for a file below `root`, reading its size from disk.
    pub fn from_path(path: PathBuf, root: &Path) -> std::io::Result<Self> {
        let size_bytes = std::fs::metadata(&path)?.len();
        let relative_path = path
            .strip_prefix(root)
            .map(Path::to_path_buf)
            .unwrap_or_else(|_| path.clone());
        Ok(Self::with_relative(path, relative_path, size_bytes))
    }

    pub fn with_relative(path: PathBuf, relative_path: PathBuf, size_bytes: u64) -> Self {
        let meta = metadata::extract(&relative_path);
        Self {
            path,
            relative_path,
            document_id: meta.document_id,
            page_number: meta.page_number,
            size_bytes,
        }
    }

    /// File name only; safe for log lines and span fields.
    pub fn file_name(&self) -> String {
        crate::sanitize::redact_path(&self.path)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadKind {
    Archive,
    Image,
}

/// One uploaded item before materialization.
#[derive(Clone)]
pub struct Upload {
    pub name: String,
    pub kind: UploadKind,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for Upload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Upload")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("bytes", &self.bytes.len())
            .finish()
    }
}

impl Upload {
    pub fn new(name: impl Into<String>, kind: UploadKind, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            kind,
            bytes,
        }
    }

    /// Reads a file from disk and classifies it by MIME type.
    pub fn from_path(path: &Path) -> Result<Self, MaterializeError> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("upload")
            .to_string();

        let kind = classify(path).ok_or_else(|| MaterializeError::UnsupportedUpload {
            name: name.clone(),
            reason: "expected an image or a zip archive".to_string(),
        })?;

        let bytes = std::fs::read(path).map_err(|e| MaterializeError::ReadUpload {
            path: path.to_path_buf(),
            source: e,
        })?;

        Ok(Self { name, kind, bytes })
    }
}

/// Classifies a path as archive or image using its guessed MIME type.
pub fn classify(path: &Path) -> Option<UploadKind> {
    let mime = mime_guess::from_path(path).first()?;
    match (mime.type_().as_str(), mime.subtype().as_str()) {
        ("application", "zip") | ("application", "x-zip-compressed") => Some(UploadKind::Archive),
        ("image", _) => Some(UploadKind::Image),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_sentinels_render_as_unknown() {
        assert_eq!(DocumentId::Unknown.to_string(), "unknown");
        assert_eq!(PageNumber::Unknown.to_string(), "unknown");
        assert_eq!(PageNumber::Number(7).to_string(), "7");
    }

    #[test]
    fn test_sentinels_serialize_as_strings() {
        let json = serde_json::to_value(PageNumber::Unknown).unwrap();
        assert_eq!(json, serde_json::json!("unknown"));
        let json = serde_json::to_value(PageNumber::Number(12)).unwrap();
        assert_eq!(json, serde_json::json!(12));
        let json = serde_json::to_value(DocumentId::Known("1234".into())).unwrap();
        assert_eq!(json, serde_json::json!("1234"));
    }

    #[test]
    fn test_classify_by_extension() {
        assert_eq!(classify(Path::new("a.zip")), Some(UploadKind::Archive));
        assert_eq!(classify(Path::new("a.JPG")), Some(UploadKind::Image));
        assert_eq!(classify(Path::new("a.tif")), Some(UploadKind::Image));
        assert_eq!(classify(Path::new("a.png")), Some(UploadKind::Image));
        assert_eq!(classify(Path::new("notes.txt")), None);
    }

    #[test]
    fn test_asset_from_path_uses_relative_metadata() {
        let tmp = TempDir::new().unwrap();
        let dir = tmp.path().join("1234");
        std::fs::create_dir_all(&dir).unwrap();
        let file = dir.join("007_a.jpg");
        std::fs::write(&file, b"abc").unwrap();

        let asset = Asset::from_path(file.clone(), tmp.path()).unwrap();
        assert_eq!(asset.relative_path, PathBuf::from("1234/007_a.jpg"));
        assert_eq!(asset.document_id, DocumentId::Known("1234".into()));
        assert_eq!(asset.page_number, PageNumber::Number(7));
        assert_eq!(asset.size_bytes, 3);
        assert_eq!(asset.file_name(), "007_a.jpg");
    }

    #[test]
    fn test_flat_upload_has_unknown_document() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("flatname.jpg");
        std::fs::write(&file, b"x").unwrap();

        let asset = Asset::from_path(file, tmp.path()).unwrap();
        assert_eq!(asset.document_id, DocumentId::Unknown);
        assert_eq!(asset.page_number, PageNumber::Unknown);
    }

    #[test]
    fn test_upload_from_path_rejects_unknown_types() {
        let tmp = TempDir::new().unwrap();
        let file = tmp.path().join("notes.txt");
        std::fs::write(&file, b"x").unwrap();

        let err = Upload::from_path(&file).unwrap_err();
        assert!(matches!(err, MaterializeError::UnsupportedUpload { .. }));
    }
}
