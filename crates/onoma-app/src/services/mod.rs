//! Orchestration layer for IO-bound rename services.
//!
//! Modules exposed here coordinate external systems (the naming service,
//! the filesystem, rate limiting) and must avoid embedding pure transforms.
//! Keep stateless helpers in `crate::text` and `crate::naming` so concurrency
//! and resource accounting stay localized.

pub mod bundle;
pub mod gemini;
pub mod intake;
pub mod oracle;
pub mod orchestrator;
pub mod queue;

pub use bundle::{ArchiveError, Archiver, BundleEntry, DirArchiver, collect_completed};
pub use gemini::GeminiNamingClient;
pub use intake::{IntakeError, SUPPORTED_IMAGE_MIME, collect_image_targets, image_mime_for_path};
pub use oracle::{
    GenericRateLimiter, NamingOracle, OracleError, OracleItem, OracleLabel, OracleResult,
    RetryPolicy, RetryingOracle,
};
pub use orchestrator::{BatchOrchestrator, CycleOutcome, OrchestratorConfig};
pub use queue::{
    FileRecord, FileStatus, NameLabels, QueueCounts, QueueError, RecordId, RenameQueue,
};
