use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// The single image type accepted by the upload surface.
pub const SUPPORTED_IMAGE_MIME: &str = "image/png";

/// Errors emitted while collecting intake targets.
#[derive(Debug, Error)]
pub enum IntakeError {
    #[error("failed to read intake path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unsupported image type: {path}")]
    UnsupportedFile { path: PathBuf },
    #[error("intake path must be a file or directory: {path}")]
    NotAFileOrDirectory { path: PathBuf },
}

#[must_use]
pub fn image_mime_for_path(path: &Path) -> Option<&'static str> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    match ext.as_str() {
        "png" => Some(SUPPORTED_IMAGE_MIME),
        _ => None,
    }
}

/// Collect the image files to enqueue from a file or directory.
///
/// Non-image entries in a directory are silently filtered. Results sort by
/// file name ascending so the enqueue (and therefore processing) order is
/// deterministic.
pub fn collect_image_targets(
    path: &Path,
    limit: Option<usize>,
) -> Result<Vec<PathBuf>, IntakeError> {
    let metadata = fs::metadata(path).map_err(|source| IntakeError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    if metadata.is_file() {
        if image_mime_for_path(path).is_some() {
            return Ok(vec![path.to_path_buf()]);
        }
        return Err(IntakeError::UnsupportedFile {
            path: path.to_path_buf(),
        });
    }

    if metadata.is_dir() {
        let mut files = Vec::new();
        for entry in fs::read_dir(path).map_err(|source| IntakeError::Io {
            path: path.to_path_buf(),
            source,
        })? {
            let entry = entry.map_err(|source| IntakeError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            let entry_path = entry.path();
            if !entry.file_type().map(|ft| ft.is_file()).unwrap_or(false) {
                continue;
            }
            if image_mime_for_path(&entry_path).is_none() {
                continue;
            }
            files.push(entry_path);
        }

        files.sort();
        if let Some(limit) = limit
            && limit < files.len()
        {
            files.truncate(limit);
        }
        return Ok(files);
    }

    Err(IntakeError::NotAFileOrDirectory {
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::io::Write;
    use tempfile::TempDir;

    fn touch(dir: &Path, name: &str) {
        let mut file = File::create(dir.join(name)).expect("create test file");
        file.write_all(b"bytes").expect("write test file");
    }

    #[test]
    fn filters_to_the_supported_mime_type() {
        let temp = TempDir::new().expect("temp dir");
        touch(temp.path(), "b.png");
        touch(temp.path(), "a.png");
        touch(temp.path(), "photo.jpg");
        touch(temp.path(), "notes.txt");
        touch(temp.path(), "upper.PNG");

        let targets = collect_image_targets(temp.path(), None).expect("collect succeeds");
        let names: Vec<_> = targets
            .iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.png", "b.png", "upper.PNG"]);
    }

    #[test]
    fn limit_truncates_after_sorting() {
        let temp = TempDir::new().expect("temp dir");
        touch(temp.path(), "c.png");
        touch(temp.path(), "a.png");
        touch(temp.path(), "b.png");

        let targets = collect_image_targets(temp.path(), Some(2)).expect("collect succeeds");
        let names: Vec<_> = targets
            .iter()
            .filter_map(|path| path.file_name().and_then(|n| n.to_str()))
            .collect();
        assert_eq!(names, vec!["a.png", "b.png"]);
    }

    #[test]
    fn single_supported_file_passes_through() {
        let temp = TempDir::new().expect("temp dir");
        touch(temp.path(), "icon.png");

        let target = temp.path().join("icon.png");
        let targets = collect_image_targets(&target, None).expect("collect succeeds");
        assert_eq!(targets, vec![target]);
    }

    #[test]
    fn single_unsupported_file_is_rejected() {
        let temp = TempDir::new().expect("temp dir");
        touch(temp.path(), "notes.txt");

        let err = collect_image_targets(&temp.path().join("notes.txt"), None)
            .expect_err("unsupported file fails");
        match err {
            IntakeError::UnsupportedFile { path } => {
                assert!(path.ends_with("notes.txt"));
            }
            other => panic!("expected unsupported file, got {other:?}"),
        }
    }

    #[test]
    fn missing_path_reports_io_error() {
        let temp = TempDir::new().expect("temp dir");
        let err = collect_image_targets(&temp.path().join("missing"), None)
            .expect_err("missing path fails");
        assert!(matches!(err, IntakeError::Io { .. }));
    }
}
