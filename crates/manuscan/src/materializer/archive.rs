use std::io::{Cursor, Read};
use std::path::{Component, Path, PathBuf};

use log::{debug, warn};

use super::convert;
use super::workspace::Workspace;
use crate::error::MaterializeError;
use crate::sanitize;

/// Images extracted from one archive plus the entries that could not be.
#[derive(Debug, Default)]
pub struct ArchiveOutcome {
    pub images: Vec<PathBuf>,
    pub errors: Vec<MaterializeError>,
}

fn is_resource_fork(path: &Path) -> bool {
    path.components().any(|c| matches!(c, Component::Normal(s) if s == "__MACOSX"))
        || path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("._"))
}

/// Extracts the images of a zip archive into its own directory under the root.
///
/// Legacy rasters are converted to JPEG and the originals removed. The last
/// image member in listing order is the calibration page; it is deleted and
/// not returned. If that member could not be extracted, nothing else is
/// dropped. A member that fails to read, write or convert is recorded in
/// [`ArchiveOutcome::errors`] and the rest of the archive continues.
pub fn extract_archive(
    name: &str,
    bytes: &[u8],
    workspace: &mut Workspace,
    jpeg_quality: u8,
) -> Result<ArchiveOutcome, MaterializeError> {
    let mut archive =
        zip::ZipArchive::new(Cursor::new(bytes)).map_err(|e| MaterializeError::OpenArchive {
            name: name.to_string(),
            source: e,
        })?;

    let stem = Path::new(name)
        .file_stem()
        .and_then(|s| s.to_str())
        .filter(|s| !s.is_empty())
        .unwrap_or("archive");
    let root = workspace.root().to_path_buf();
    let target_dir = workspace.unique_dir(&root, stem)?;

    let mut outcome = ArchiveOutcome::default();
    // listing index of the last image member, whether or not it made it to disk
    let mut last_image_entry = None;
    // listing index of each collected image, parallel to `outcome.images`
    let mut image_entries = Vec::new();

    for index in 0..archive.len() {
        let mut entry = match archive.by_index(index) {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Skipping entry {} of {}: {}", index, name, e);
                outcome.errors.push(MaterializeError::ExtractEntry {
                    name: name.to_string(),
                    entry: format!("#{}", index),
                    reason: e.to_string(),
                });
                continue;
            }
        };

        if entry.is_dir() {
            continue;
        }

        let entry_name = entry.name().to_string();
        let Some(relative) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry path in {}: {}", name, entry_name);
            continue;
        };
        if is_resource_fork(&relative) {
            debug!("Skipping resource fork {}", entry_name);
            continue;
        }
        if !convert::is_image(&relative) {
            debug!("Skipping non-image entry {}", entry_name);
            continue;
        }
        last_image_entry = Some(index);

        let mut content = Vec::new();
        if let Err(e) = entry.read_to_end(&mut content) {
            warn!("Failed to read {} from {}: {}", entry_name, name, e);
            outcome.errors.push(MaterializeError::ExtractEntry {
                name: name.to_string(),
                entry: entry_name,
                reason: e.to_string(),
            });
            continue;
        }

        let dest_dir = match relative.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => target_dir.join(parent),
            _ => target_dir.clone(),
        };
        let file_name = relative
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("page")
            .to_string();

        let extracted = match workspace.write_unique(&dest_dir, &file_name, &content) {
            Ok(path) => path,
            Err(e) => {
                warn!("Failed to write {} from {}: {}", entry_name, name, e);
                outcome.errors.push(MaterializeError::ExtractEntry {
                    name: name.to_string(),
                    entry: entry_name,
                    reason: e.to_string(),
                });
                continue;
            }
        };

        let image = if convert::is_legacy_raster(&extracted) {
            match convert_in_place(&extracted, workspace, jpeg_quality) {
                Ok(converted) => converted,
                Err(e) => {
                    warn!("{}", e);
                    workspace.remove_file(&extracted)?;
                    outcome.errors.push(e);
                    continue;
                }
            }
        } else {
            extracted
        };

        outcome.images.push(image);
        image_entries.push(index);
    }

    // a calibration member that failed is already gone; real pages stay
    if last_image_entry.is_some() && image_entries.last().copied() == last_image_entry {
        if let Some(calibration) = outcome.images.pop() {
            debug!(
                "Dropping calibration page {} from {}",
                sanitize::redact_path(&calibration),
                name
            );
            workspace.remove_file(&calibration)?;
        }
    }

    Ok(outcome)
}

fn convert_in_place(
    path: &Path,
    workspace: &mut Workspace,
    jpeg_quality: u8,
) -> Result<PathBuf, MaterializeError> {
    let jpeg = convert::encode_jpeg(path, jpeg_quality)?;

    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let stem = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("page");
    let converted = workspace.write_unique(dir, &format!("{}.jpg", stem), &jpeg)?;

    workspace.remove_file(path)?;
    debug!(
        "Converted {} -> {}",
        sanitize::redact_path(path),
        sanitize::redact_path(&converted)
    );
    Ok(converted)
}
