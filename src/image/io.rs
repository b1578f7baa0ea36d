//! ImageSource collaborator: decode micrograph files into pixel matrices,
//! plus the atomic JSON writer shared by the persistence stores.
use super::{GrayImageU8, RgbImageU8, SourceImage};
use crate::error::{AnalysisError, Result};
use serde::Serialize;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Load a micrograph from disk into gray + RGB planes.
///
/// The `image_id` of the returned [`SourceImage`] is the file stem.
pub fn load_source_image(path: &Path) -> Result<SourceImage> {
    if !path.exists() {
        return Err(AnalysisError::ImageNotFound(path.to_path_buf()));
    }
    let decoded = image::open(path).map_err(|e| AnalysisError::ImageDecode {
        path: path.to_path_buf(),
        reason: e.to_string(),
    })?;

    let rgb = decoded.to_rgb8();
    let width = rgb.width() as usize;
    let height = rgb.height() as usize;
    let rgb = RgbImageU8::new(width, height, rgb.into_raw());

    let luma = decoded.into_luma8();
    let gray = GrayImageU8::new(width, height, luma.into_raw());

    let image_id = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    Ok(SourceImage::new(image_id, gray, Some(rgb)))
}

/// Serialize a value as pretty JSON and atomically rename it over `path`.
///
/// The temporary file lives in the target directory so the rename stays on
/// one filesystem; an interrupted write never leaves a partial document and
/// a failed rename leaves the previous version intact.
pub fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let parent = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .ok_or_else(|| AnalysisError::invalid(format!("{} has no parent directory", path.display())))?;
    std::fs::create_dir_all(parent).map_err(|e| AnalysisError::io(parent, e))?;

    let json = serde_json::to_string_pretty(value)
        .map_err(|e| AnalysisError::io(path, std::io::Error::other(e)))?;

    let mut tmp = NamedTempFile::new_in(parent).map_err(|e| AnalysisError::io(parent, e))?;
    tmp.write_all(json.as_bytes())
        .map_err(|e| AnalysisError::io(path, e))?;
    tmp.flush().map_err(|e| AnalysisError::io(path, e))?;
    tmp.persist(path)
        .map_err(|e| AnalysisError::io(path, e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.png");
        assert!(matches!(
            load_source_image(&path),
            Err(AnalysisError::ImageNotFound(_))
        ));
    }

    #[test]
    fn undecodable_file_reports_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        assert!(matches!(
            load_source_image(&path),
            Err(AnalysisError::ImageDecode { .. })
        ));
    }

    #[test]
    fn png_loads_with_both_planes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("field.png");
        let buffer = image::GrayImage::from_raw(4, 2, vec![0, 50, 100, 150, 200, 250, 10, 20])
            .unwrap();
        buffer.save(&path).unwrap();

        let source = load_source_image(&path).unwrap();
        assert_eq!(source.image_id(), "field");
        assert_eq!((source.width(), source.height()), (4, 2));
        assert_eq!(source.gray().get(1, 0), 50);
        assert!(source.rgb().is_some());
    }
}
