use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::services::queue::{FileRecord, FileStatus};

/// One renamed file handed to the archiver.
#[derive(Debug, Clone)]
pub struct BundleEntry {
    pub name: String,
    pub bytes: Vec<u8>,
}

/// Errors emitted while assembling or writing a bundle.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error("no completed records to export")]
    NothingCompleted,
    #[error("failed to access bundle path {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Black-box collaborator turning a set of renamed files into one bundle.
pub trait Archiver: Send + Sync {
    fn bundle(&self, entries: &[BundleEntry]) -> Result<PathBuf, ArchiveError>;
}

/// Archiver that writes the renamed set into a destination directory.
#[derive(Debug, Clone)]
pub struct DirArchiver {
    dest: PathBuf,
}

impl DirArchiver {
    pub fn new(dest: impl Into<PathBuf>) -> Self {
        Self { dest: dest.into() }
    }
}

impl Archiver for DirArchiver {
    fn bundle(&self, entries: &[BundleEntry]) -> Result<PathBuf, ArchiveError> {
        if entries.is_empty() {
            return Err(ArchiveError::NothingCompleted);
        }
        fs::create_dir_all(&self.dest).map_err(|source| ArchiveError::Io {
            path: self.dest.clone(),
            source,
        })?;
        for entry in entries {
            let path = self.dest.join(&entry.name);
            fs::write(&path, &entry.bytes).map_err(|source| ArchiveError::Io {
                path: path.clone(),
                source,
            })?;
        }
        Ok(self.dest.clone())
    }
}

/// Pair every completed record's final name with its original file bytes.
///
/// Refuses when nothing completed; the archiver is only ever invoked with at
/// least one entry.
pub fn collect_completed(
    records: &[FileRecord],
    source_dir: &Path,
) -> Result<Vec<BundleEntry>, ArchiveError> {
    let mut entries = Vec::new();
    for record in records {
        if record.status != FileStatus::Completed {
            continue;
        }
        let Some(name) = record.new_name.as_deref() else {
            continue;
        };
        let path = source_dir.join(&record.original_name);
        let bytes = fs::read(&path).map_err(|source| ArchiveError::Io {
            path: path.clone(),
            source,
        })?;
        entries.push(BundleEntry {
            name: name.to_string(),
            bytes,
        });
    }
    if entries.is_empty() {
        return Err(ArchiveError::NothingCompleted);
    }
    Ok(entries)
}
