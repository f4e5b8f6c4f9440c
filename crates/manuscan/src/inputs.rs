//! Turns command-line inputs (files, directories, glob patterns) into uploads.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use walkdir::WalkDir;

use crate::asset::{classify, Upload};
use crate::error::{MaterializeError, WorkerError};

/// Resolves inputs to upload candidates.
///
/// Directories are walked recursively and only images and zip archives are
/// kept. Files named explicitly are always kept so an unsupported type is
/// reported instead of silently dropped. Duplicates are removed; the first
/// occurrence wins.
#[derive(Debug, Default)]
pub struct InputScanner {
    inputs: Vec<String>,
}

impl InputScanner {
    pub fn new<I, S>(inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn scan(&self) -> Result<Vec<PathBuf>, WorkerError> {
        let mut seen = HashSet::new();
        let mut paths = Vec::new();

        for input in &self.inputs {
            let found = if is_pattern(input) {
                Self::expand_pattern(input)?
            } else {
                Self::walk(Path::new(input))?
            };

            for path in found {
                if seen.insert(path.clone()) {
                    paths.push(path);
                }
            }
        }

        info!("Scanned {} inputs, found {} uploads", self.inputs.len(), paths.len());
        Ok(paths)
    }

    fn expand_pattern(pattern: &str) -> Result<Vec<PathBuf>, WorkerError> {
        let entries = glob::glob(pattern).map_err(|e| WorkerError::InvalidPattern {
            pattern: pattern.to_string(),
            reason: e.to_string(),
        })?;

        let mut paths = Vec::new();
        for entry in entries {
            match entry {
                Ok(path) if path.is_dir() => paths.extend(Self::walk(&path)?),
                Ok(path) if classify(&path).is_some() => paths.push(path),
                Ok(path) => debug!("Pattern match skipped, unsupported: {}", path.display()),
                Err(e) => warn!("Unreadable pattern match: {}", e),
            }
        }

        if paths.is_empty() {
            warn!("Pattern '{}' matched no uploads", pattern);
        }
        Ok(paths)
    }

    fn walk(root: &Path) -> Result<Vec<PathBuf>, WorkerError> {
        let mut paths = Vec::new();

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(|e| WorkerError::ScanFailed {
                path: root.to_path_buf(),
                source: e,
            })?;

            if entry.file_type().is_dir() {
                continue;
            }

            let path = entry.path();
            if entry.depth() == 0 || classify(path).is_some() {
                debug!("Found upload: {}", path.display());
                paths.push(path.to_path_buf());
            } else {
                debug!("Unsupported format: {}", path.display());
            }
        }

        Ok(paths)
    }
}

fn is_pattern(input: &str) -> bool {
    input.contains(['*', '?', '['])
}

/// Reads every path into an [`Upload`]. Unreadable or unsupported files are
/// returned separately and do not stop the rest.
pub fn load_uploads(paths: &[PathBuf]) -> (Vec<Upload>, Vec<(PathBuf, MaterializeError)>) {
    let mut uploads = Vec::with_capacity(paths.len());
    let mut errors = Vec::new();

    for path in paths {
        match Upload::from_path(path) {
            Ok(upload) => uploads.push(upload),
            Err(e) => {
                warn!("Skipping upload {}: {}", path.display(), e);
                errors.push((path.clone(), e));
            }
        }
    }

    (uploads, errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::UploadKind;
    use tempfile::TempDir;

    fn setup() -> TempDir {
        let tmp = TempDir::new().unwrap();
        let nested = tmp.path().join("batch").join("1234");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("002_b.jpg"), b"b").unwrap();
        std::fs::write(nested.join("001_a.jpg"), b"a").unwrap();
        std::fs::write(nested.join("notes.txt"), b"n").unwrap();
        std::fs::write(tmp.path().join("batch").join("pages.zip"), b"PK").unwrap();
        tmp
    }

    #[test]
    fn test_directory_is_walked_recursively_and_filtered() {
        let tmp = setup();
        let dir = tmp.path().join("batch");

        let paths = InputScanner::new([dir.to_string_lossy()]).scan().unwrap();
        let names: Vec<_> = paths
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["001_a.jpg", "002_b.jpg", "pages.zip"]);
    }

    #[test]
    fn test_explicit_file_is_kept_even_if_unsupported() {
        let tmp = setup();
        let file = tmp.path().join("batch/1234/notes.txt");

        let paths = InputScanner::new([file.to_string_lossy()]).scan().unwrap();
        assert_eq!(paths, vec![file.clone()]);

        let (uploads, errors) = load_uploads(&paths);
        assert!(uploads.is_empty());
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0].1, MaterializeError::UnsupportedUpload { .. }));
    }

    #[test]
    fn test_glob_pattern_and_dedup() {
        let tmp = setup();
        let pattern = tmp.path().join("batch/1234/*.jpg");
        let file = tmp.path().join("batch/1234/001_a.jpg");

        let paths = InputScanner::new([
            pattern.to_string_lossy().into_owned(),
            file.to_string_lossy().into_owned(),
        ])
        .scan()
        .unwrap();

        assert_eq!(paths.len(), 2);
        assert!(paths[0].ends_with("001_a.jpg"));
    }

    #[test]
    fn test_missing_path_fails() {
        let tmp = TempDir::new().unwrap();
        let missing = tmp.path().join("nope");

        let err = InputScanner::new([missing.to_string_lossy()]).scan().unwrap_err();
        assert!(matches!(err, WorkerError::ScanFailed { .. }));
    }

    #[test]
    fn test_invalid_pattern() {
        let err = InputScanner::new(["[unclosed"]).scan().unwrap_err();
        assert!(matches!(err, WorkerError::InvalidPattern { .. }));
    }

    #[test]
    fn test_load_uploads_classifies() {
        let tmp = setup();
        let paths = InputScanner::new([tmp.path().join("batch").to_string_lossy()])
            .scan()
            .unwrap();

        let (uploads, errors) = load_uploads(&paths);
        assert!(errors.is_empty());
        assert_eq!(uploads.len(), 3);
        assert_eq!(uploads[2].kind, UploadKind::Archive);
        assert_eq!(uploads[0].bytes, b"a");
    }
}
