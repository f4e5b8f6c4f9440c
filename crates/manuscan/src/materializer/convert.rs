use std::path::Path;

use image::codecs::jpeg::JpegEncoder;

use crate::error::MaterializeError;

/// Formats the analysis endpoint does not take; re-encoded as JPEG.
const LEGACY_EXTENSIONS: &[&str] = &["tif", "tiff"];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "bmp", "webp", "tif", "tiff"];

fn extension(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

pub fn is_image(path: &Path) -> bool {
    extension(path).is_some_and(|e| IMAGE_EXTENSIONS.contains(&e.as_str()))
}

pub fn is_legacy_raster(path: &Path) -> bool {
    extension(path).is_some_and(|e| LEGACY_EXTENSIONS.contains(&e.as_str()))
}

/// Decodes `path` and re-encodes it as an RGB JPEG at `quality` (1-100).
pub fn encode_jpeg(path: &Path, quality: u8) -> Result<Vec<u8>, MaterializeError> {
    let img = image::open(path).map_err(|e| MaterializeError::ConvertImage {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;
    let rgb = img.to_rgb8();

    let mut buffer = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut buffer, quality.clamp(1, 100));
    encoder
        .encode_image(&rgb)
        .map_err(|e| MaterializeError::ConvertImage {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_checks_are_case_insensitive() {
        assert!(is_image(Path::new("a/B.JPG")));
        assert!(is_image(Path::new("scan.Tiff")));
        assert!(!is_image(Path::new("notes.txt")));
        assert!(!is_image(Path::new("noext")));

        assert!(is_legacy_raster(Path::new("x.TIF")));
        assert!(!is_legacy_raster(Path::new("x.jpg")));
    }

    #[test]
    fn test_encode_tiff_as_jpeg() {
        let tmp = tempfile::tempdir().unwrap();
        let tif = tmp.path().join("page.tif");
        image::RgbImage::from_pixel(8, 8, image::Rgb([200, 10, 10]))
            .save(&tif)
            .unwrap();

        let bytes = encode_jpeg(&tif, 70).unwrap();
        assert_eq!(&bytes[..2], &[0xFF, 0xD8]);
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!(decoded.width(), 8);
    }

    #[test]
    fn test_encode_garbage_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let tif = tmp.path().join("broken.tif");
        std::fs::write(&tif, b"not a tiff").unwrap();

        let err = encode_jpeg(&tif, 70).unwrap_err();
        assert!(matches!(err, MaterializeError::ConvertImage { .. }));
    }
}
