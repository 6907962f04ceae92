//! Application-level error type shared across the binary and services.

use std::path::PathBuf;

use inquire::InquireError;
use thiserror::Error;

use crate::config::AppConfigError;
use crate::services::{ArchiveError, IntakeError, OracleError, QueueError};

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    ConfigLoad(#[from] AppConfigError),
    #[error(transparent)]
    Oracle(#[from] OracleError),
    #[error(transparent)]
    Queue(#[from] QueueError),
    #[error(transparent)]
    Archive(#[from] ArchiveError),
    #[error(transparent)]
    Intake(#[from] IntakeError),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error("failed to resolve current working directory: {0}")]
    WorkingDir(#[source] std::io::Error),
    #[error("export cancelled for {path}")]
    ExportCancelled { path: PathBuf },
    #[error("failed to read export confirmation input: {source}")]
    ExportPromptFailed {
        #[source]
        source: InquireError,
    },
}
