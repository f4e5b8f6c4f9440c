//! Document identifier and page number derived from an asset path.
//!
//! Paths follow `<document-id>/<page-id>_<suffix>.<ext>` relative to the
//! materialization root; flat uploads (`<filename>.<ext>`) carry no identifier.
//! Extraction never fails: anything unparseable degrades to the `unknown` sentinel.

use std::path::{Component, Path};
use std::sync::LazyLock;

use regex::Regex;

use crate::asset::{DocumentId, PageNumber};

static LEADING_DIGITS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+)").expect("static regex"));

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetMetadata {
    pub document_id: DocumentId,
    pub page_number: PageNumber,
}

pub fn extract(path: &Path) -> AssetMetadata {
    AssetMetadata {
        document_id: document_id(path),
        page_number: page_number(path),
    }
}

/// The path segment immediately preceding the file name.
pub fn document_id(path: &Path) -> DocumentId {
    let mut components = path.components().rev();
    // skip the file name itself
    if components.next().is_none() {
        return DocumentId::Unknown;
    }

    match components.next() {
        Some(Component::Normal(segment)) => match segment.to_str() {
            Some(s) if !s.trim().is_empty() => DocumentId::Known(s.to_string()),
            _ => DocumentId::Unknown,
        },
        _ => DocumentId::Unknown,
    }
}

/// The leading numeric run of the file stem, e.g. `007_a.jpg` -> 7.
pub fn page_number(path: &Path) -> PageNumber {
    let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
        return PageNumber::Unknown;
    };

    LEADING_DIGITS
        .captures(stem)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<u64>().ok())
        .map(PageNumber::Number)
        .unwrap_or(PageNumber::Unknown)
}
