//! Turning uploads (loose images and zip archives) into image files on disk.

pub mod archive;
pub mod convert;
pub mod workspace;

use std::path::{Path, PathBuf};

use log::{info, warn};

use crate::asset::{Asset, Upload, UploadKind};
use crate::error::MaterializeError;

pub use archive::{extract_archive, ArchiveOutcome};
pub use workspace::{CleanupSummary, Workspace};

/// A failure tied to the upload it came from.
#[derive(Debug)]
pub struct UploadError {
    pub upload: String,
    pub error: MaterializeError,
}

impl std::fmt::Display for UploadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.upload, self.error)
    }
}

#[derive(Debug, Default)]
pub struct MaterializeReport {
    /// Archive order, then member order; loose images in upload order.
    pub assets: Vec<Asset>,
    pub errors: Vec<UploadError>,
}

pub struct AssetMaterializer {
    jpeg_quality: u8,
}

impl AssetMaterializer {
    pub fn new(jpeg_quality: u8) -> Self {
        Self { jpeg_quality }
    }

    /// Materializes every upload into `workspace`. A failing upload is logged
    /// and recorded in the report; the others are still processed.
    pub fn materialize(&self, uploads: &[Upload], workspace: &mut Workspace) -> MaterializeReport {
        let mut report = MaterializeReport::default();
        let root = workspace.root().to_path_buf();

        for upload in uploads {
            let paths = match upload.kind {
                UploadKind::Archive => {
                    match extract_archive(&upload.name, &upload.bytes, workspace, self.jpeg_quality)
                    {
                        Ok(outcome) => {
                            for error in outcome.errors {
                                report.errors.push(UploadError {
                                    upload: upload.name.clone(),
                                    error,
                                });
                            }
                            outcome.images
                        }
                        Err(error) => {
                            warn!("Skipping archive {}: {}", upload.name, error);
                            report.errors.push(UploadError {
                                upload: upload.name.clone(),
                                error,
                            });
                            continue;
                        }
                    }
                }
                UploadKind::Image => match self.store_image(upload, workspace, &root) {
                    Ok(path) => vec![path],
                    Err(error) => {
                        warn!("Skipping image {}: {}", upload.name, error);
                        report.errors.push(UploadError {
                            upload: upload.name.clone(),
                            error,
                        });
                        continue;
                    }
                },
            };

            for path in paths {
                match Asset::from_path(path.clone(), &root) {
                    Ok(asset) => report.assets.push(asset),
                    Err(e) => {
                        let error = MaterializeError::ReadUpload { path, source: e };
                        warn!("{}", error);
                        report.errors.push(UploadError {
                            upload: upload.name.clone(),
                            error,
                        });
                    }
                }
            }
        }

        info!(
            "Materialized {} assets from {} uploads ({} errors)",
            report.assets.len(),
            uploads.len(),
            report.errors.len()
        );
        report
    }

    fn store_image(
        &self,
        upload: &Upload,
        workspace: &mut Workspace,
        root: &Path,
    ) -> Result<PathBuf, MaterializeError> {
        // only the final component; upload names are untrusted
        let file_name = Path::new(&upload.name)
            .file_name()
            .and_then(|n| n.to_str())
            .filter(|n| !n.is_empty())
            .ok_or_else(|| MaterializeError::UnsupportedUpload {
                name: upload.name.clone(),
                reason: "upload has no file name".to_string(),
            })?;

        workspace.write_unique(root, file_name, &upload.bytes)
    }
}
