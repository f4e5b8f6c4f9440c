use std::io::Write;
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::error::MaterializeError;
use crate::sanitize;

const MAX_NAME_ATTEMPTS: usize = 1000;

/// The directory tree materialized images live in.
///
/// Every file and directory created through the workspace is remembered so
/// [`Workspace::cleanup`] removes exactly those. Nothing is removed on drop.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    files: Vec<PathBuf>,
    dirs: Vec<PathBuf>,
}

/// What [`Workspace::cleanup`] removed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct CleanupSummary {
    pub files_removed: usize,
    pub dirs_removed: usize,
}

impl Workspace {
    pub fn create<P: AsRef<Path>>(root: P) -> Result<Self, MaterializeError> {
        let root = root.as_ref().to_path_buf();
        let mut workspace = Self {
            root: root.clone(),
            files: Vec::new(),
            dirs: Vec::new(),
        };
        workspace.ensure_dir(&root)?;
        Ok(workspace)
    }

    /// A fresh workspace under the system temp directory, `manuscan-<uuid>`.
    pub fn temporary() -> Result<Self, MaterializeError> {
        let root = std::env::temp_dir().join(format!("manuscan-{}", uuid::Uuid::new_v4()));
        Self::create(root)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Creates `dir` and any missing parents, registering the ones it made.
    pub fn ensure_dir(&mut self, dir: &Path) -> Result<(), MaterializeError> {
        let mut missing = Vec::new();
        let mut current = Some(dir);
        while let Some(path) = current {
            if path.as_os_str().is_empty() || path.exists() {
                break;
            }
            missing.push(path.to_path_buf());
            current = path.parent();
        }

        for path in missing.into_iter().rev() {
            match std::fs::create_dir(&path) {
                Ok(()) => self.dirs.push(path),
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(MaterializeError::CreateDirectory { path, source: e }),
            }
        }
        Ok(())
    }

    /// Creates a fresh directory `parent/name`, falling back to `name_2`, `name_3`, ...
    pub fn unique_dir(&mut self, parent: &Path, name: &str) -> Result<PathBuf, MaterializeError> {
        self.ensure_dir(parent)?;

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let candidate = if counter == 1 {
                parent.join(name)
            } else {
                parent.join(format!("{}_{}", name, counter))
            };

            match std::fs::create_dir(&candidate) {
                Ok(()) => {
                    self.dirs.push(candidate.clone());
                    return Ok(candidate);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(MaterializeError::CreateDirectory {
                        path: candidate,
                        source: e,
                    })
                }
            }
        }

        Err(MaterializeError::NameExhausted(parent.join(name)))
    }

    /// Writes `content` to `dir/filename` without overwriting anything,
    /// numbering the name (`page_2.jpg`, ...) on conflict.
    pub fn write_unique(
        &mut self,
        dir: &Path,
        filename: &str,
        content: &[u8],
    ) -> Result<PathBuf, MaterializeError> {
        self.ensure_dir(dir)?;

        let (base, ext) = match filename.rfind('.') {
            Some(dot) if dot > 0 => (&filename[..dot], Some(&filename[dot..])),
            _ => (filename, None),
        };

        for counter in 1..=MAX_NAME_ATTEMPTS {
            let try_name = if counter == 1 {
                filename.to_string()
            } else {
                match ext {
                    Some(ext) => format!("{}_{}{}", base, counter, ext),
                    None => format!("{}_{}", base, counter),
                }
            };
            let try_path = dir.join(&try_name);

            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&try_path)
            {
                Ok(mut file) => {
                    self.files.push(try_path.clone());
                    file.write_all(content)
                        .map_err(|e| MaterializeError::WriteFile {
                            path: try_path.clone(),
                            source: e,
                        })?;
                    return Ok(try_path);
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
                Err(e) => {
                    return Err(MaterializeError::WriteFile {
                        path: try_path,
                        source: e,
                    })
                }
            }
        }

        Err(MaterializeError::NameExhausted(dir.join(filename)))
    }

    /// Deletes a registered file right away.
    pub fn remove_file(&mut self, path: &Path) -> Result<(), MaterializeError> {
        match std::fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(MaterializeError::RemoveFile {
                    path: path.to_path_buf(),
                    source: e,
                })
            }
        }
        self.files.retain(|f| f != path);
        Ok(())
    }

    /// Removes every registered file, then every registered directory that is
    /// empty afterwards. Files placed there by someone else are left alone.
    pub fn cleanup(&mut self) -> CleanupSummary {
        let mut summary = CleanupSummary::default();

        for file in self.files.drain(..) {
            match std::fs::remove_file(&file) {
                Ok(()) => summary.files_removed += 1,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => warn!(
                    "Failed to remove {}: {}",
                    sanitize::redact_path(&file),
                    e
                ),
            }
        }

        // deepest first
        for dir in self.dirs.drain(..).rev() {
            let is_empty = std::fs::read_dir(&dir)
                .map(|mut entries| entries.next().is_none())
                .unwrap_or(false);
            if !is_empty {
                continue;
            }
            match std::fs::remove_dir(&dir) {
                Ok(()) => summary.dirs_removed += 1,
                Err(e) => warn!(
                    "Failed to remove directory {}: {}",
                    sanitize::redact_path(&dir),
                    e
                ),
            }
        }

        debug!(
            "Workspace cleanup removed {} files and {} directories",
            summary.files_removed, summary.dirs_removed
        );
        summary
    }
}
