use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Opaque identifier assigned to a record at enqueue time.
pub type RecordId = Uuid;

/// Lifecycle state of a rename record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileStatus {
    Pending,
    Processing,
    Completed,
    Error,
}

/// Label triple inferred by the naming service, stored alongside the final
/// name on completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NameLabels {
    pub english: String,
    pub chinese: String,
    pub domain: String,
}

/// One uploaded file tracked through the rename run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub id: RecordId,
    pub original_name: String,
    pub status: FileStatus,
    #[serde(default)]
    pub new_name: Option<String>,
    #[serde(default)]
    pub labels: Option<NameLabels>,
    #[serde(default)]
    pub error: Option<String>,
    pub created_at_ms: i64,
    pub updated_at_ms: i64,
}

pub(crate) fn current_timestamp_ms() -> i64 {
    let since_epoch = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default();
    since_epoch.as_millis() as i64
}

/// Errors emitted by the rename queue.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("record `{0}` not found")]
    NotFound(RecordId),
    #[error("record `{id}` cannot move from {from:?} to {to:?}")]
    InvalidTransition {
        id: RecordId,
        from: FileStatus,
        to: FileStatus,
    },
}

/// Aggregate status counts for progress reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueCounts {
    pub pending: usize,
    pub processing: usize,
    pub completed: usize,
    pub errored: usize,
}

impl QueueCounts {
    /// Records a run no longer has to handle; errors count as processed so a
    /// run with failures still terminates.
    #[must_use]
    pub fn processed(&self) -> usize {
        self.completed.saturating_add(self.errored)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.pending
            .saturating_add(self.processing)
            .saturating_add(self.completed)
            .saturating_add(self.errored)
    }
}

/// In-memory FIFO store for rename records.
///
/// Insertion order is preserved for iteration and chunk selection. Records
/// mutate only through the transition methods below; callers observe state
/// through cloned snapshots.
#[derive(Debug, Default)]
pub struct RenameQueue {
    records: Vec<FileRecord>,
}

impl RenameQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, original_name: impl Into<String>) -> RecordId {
        let original_name = original_name.into();
        debug_assert!(!original_name.is_empty());
        let now_ms = current_timestamp_ms();
        let id = Uuid::new_v4();
        self.records.push(FileRecord {
            id,
            original_name,
            status: FileStatus::Pending,
            new_name: None,
            labels: None,
            error: None,
            created_at_ms: now_ms,
            updated_at_ms: now_ms,
        });
        id
    }

    #[must_use]
    pub fn get(&self, id: RecordId) -> Option<&FileRecord> {
        self.records.iter().find(|record| record.id == id)
    }

    #[must_use]
    pub fn status(&self, id: RecordId) -> Option<FileStatus> {
        self.get(id).map(|record| record.status)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    #[must_use]
    pub fn snapshot(&self) -> Vec<FileRecord> {
        self.records.clone()
    }

    /// Ids of the first `limit` pending records in enqueue order.
    #[must_use]
    pub fn pending_chunk(&self, limit: usize) -> Vec<RecordId> {
        self.records
            .iter()
            .filter(|record| record.status == FileStatus::Pending)
            .take(limit)
            .map(|record| record.id)
            .collect()
    }

    #[must_use]
    pub fn processing_ids(&self) -> Vec<RecordId> {
        self.records
            .iter()
            .filter(|record| record.status == FileStatus::Processing)
            .map(|record| record.id)
            .collect()
    }

    /// Names of all completed records, in enqueue order.
    #[must_use]
    pub fn completed_names(&self) -> Vec<String> {
        self.records
            .iter()
            .filter(|record| record.status == FileStatus::Completed)
            .filter_map(|record| record.new_name.clone())
            .collect()
    }

    #[must_use]
    pub fn counts(&self) -> QueueCounts {
        let mut counts = QueueCounts::default();
        for record in &self.records {
            match record.status {
                FileStatus::Pending => counts.pending += 1,
                FileStatus::Processing => counts.processing += 1,
                FileStatus::Completed => counts.completed += 1,
                FileStatus::Error => counts.errored += 1,
            }
        }
        counts
    }

    pub fn begin_processing(&mut self, id: RecordId) -> Result<(), QueueError> {
        let record = self.record_mut(id)?;
        if record.status != FileStatus::Pending {
            return Err(QueueError::InvalidTransition {
                id,
                from: record.status,
                to: FileStatus::Processing,
            });
        }
        record.status = FileStatus::Processing;
        record.updated_at_ms = current_timestamp_ms();
        Ok(())
    }

    pub fn complete(
        &mut self,
        id: RecordId,
        new_name: impl Into<String>,
        labels: NameLabels,
    ) -> Result<(), QueueError> {
        let record = self.record_mut(id)?;
        if record.status != FileStatus::Processing {
            return Err(QueueError::InvalidTransition {
                id,
                from: record.status,
                to: FileStatus::Completed,
            });
        }
        record.status = FileStatus::Completed;
        record.new_name = Some(new_name.into());
        record.labels = Some(labels);
        record.error = None;
        record.updated_at_ms = current_timestamp_ms();
        Ok(())
    }

    pub fn fail(&mut self, id: RecordId, reason: impl Into<String>) -> Result<(), QueueError> {
        let record = self.record_mut(id)?;
        if record.status != FileStatus::Processing {
            return Err(QueueError::InvalidTransition {
                id,
                from: record.status,
                to: FileStatus::Error,
            });
        }
        record.status = FileStatus::Error;
        record.error = Some(reason.into());
        record.updated_at_ms = current_timestamp_ms();
        Ok(())
    }

    /// Return a processing record to pending; only valid on stop/cancel.
    pub fn release(&mut self, id: RecordId) -> Result<(), QueueError> {
        let record = self.record_mut(id)?;
        if record.status != FileStatus::Processing {
            return Err(QueueError::InvalidTransition {
                id,
                from: record.status,
                to: FileStatus::Pending,
            });
        }
        record.status = FileStatus::Pending;
        record.error = None;
        record.updated_at_ms = current_timestamp_ms();
        Ok(())
    }

    pub fn remove(&mut self, id: RecordId) -> Result<FileRecord, QueueError> {
        let idx = self
            .records
            .iter()
            .position(|record| record.id == id)
            .ok_or(QueueError::NotFound(id))?;
        Ok(self.records.remove(idx))
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn record_mut(&mut self, id: RecordId) -> Result<&mut FileRecord, QueueError> {
        self.records
            .iter_mut()
            .find(|record| record.id == id)
            .ok_or(QueueError::NotFound(id))
    }
}
