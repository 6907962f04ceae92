use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::sync::Mutex;

use crate::constants::{DEFAULT_CHUNK_SIZE, DEFAULT_COOLDOWN_SECS};
use crate::naming::{UsedNames, resolve_unique_name, split_extension};
use crate::services::oracle::{NamingOracle, OracleItem, OracleLabel};
use crate::services::queue::{
    FileRecord, FileStatus, NameLabels, QueueCounts, RecordId, RenameQueue,
};
use crate::text::sanitize_label;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    /// Maximum number of records submitted to the oracle per cycle.
    pub chunk_size: usize,
    /// Idle interval after each oracle call, protecting its rate limits.
    pub cooldown: Duration,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            cooldown: Duration::from_secs(DEFAULT_COOLDOWN_SECS),
        }
    }
}

/// What a single orchestration cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Processing is not enabled, or another cycle is already in flight.
    Skipped,
    /// No pending or stuck records remained; the processing flag was cleared.
    Finished,
    /// Stuck processing records were failed without invoking the oracle.
    Reaped { failed: usize },
    /// A chunk went through the oracle and was merged back.
    Merged { completed: usize, failed: usize },
}

/// Drives rename cycles over the shared queue, one oracle call at a time.
///
/// The queue is the single shared resource; it is locked only for short
/// transition sections, never across the oracle call or the cooldown sleep.
/// A compare-and-swap guard rejects overlapping cycle triggers, so at most
/// one oracle call is in flight regardless of how `cycle` is invoked.
#[derive(Clone)]
pub struct BatchOrchestrator {
    queue: Arc<Mutex<RenameQueue>>,
    oracle: Arc<dyn NamingOracle>,
    config: OrchestratorConfig,
    processing: Arc<AtomicBool>,
    in_flight: Arc<AtomicBool>,
}

impl BatchOrchestrator {
    pub fn new(
        queue: Arc<Mutex<RenameQueue>>,
        oracle: Arc<dyn NamingOracle>,
        config: OrchestratorConfig,
    ) -> Self {
        debug_assert!(config.chunk_size > 0);
        Self {
            queue,
            oracle,
            config,
            processing: Arc::new(AtomicBool::new(false)),
            in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    #[must_use]
    pub fn queue(&self) -> Arc<Mutex<RenameQueue>> {
        Arc::clone(&self.queue)
    }

    #[must_use]
    pub fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    pub async fn snapshot(&self) -> Vec<FileRecord> {
        self.queue.lock().await.snapshot()
    }

    pub async fn counts(&self) -> QueueCounts {
        self.queue.lock().await.counts()
    }

    /// Enable processing and drive cycles until the queue drains or `stop`
    /// is requested.
    pub async fn run(&self) {
        self.processing.store(true, Ordering::SeqCst);
        loop {
            match self.cycle().await {
                CycleOutcome::Skipped | CycleOutcome::Finished => break,
                CycleOutcome::Reaped { .. } | CycleOutcome::Merged { .. } => {
                    if !self.is_processing() {
                        break;
                    }
                }
            }
        }
    }

    /// Run one cycle: select a chunk, call the oracle, merge results, and
    /// cool down. Does nothing when processing is disabled or a cycle is
    /// already in flight.
    pub async fn cycle(&self) -> CycleOutcome {
        if !self.processing.load(Ordering::SeqCst) {
            return CycleOutcome::Skipped;
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return CycleOutcome::Skipped;
        }
        let outcome = self.cycle_inner().await;
        self.in_flight.store(false, Ordering::SeqCst);
        outcome
    }

    /// Disable processing and return every in-flight record to pending.
    ///
    /// An oracle call already in flight is allowed to finish; its late
    /// results only apply to records still in `Processing`, so the reverted
    /// records stay untouched.
    pub async fn stop(&self) {
        self.processing.store(false, Ordering::SeqCst);
        let mut queue = self.queue.lock().await;
        let mut reverted = 0usize;
        for id in queue.processing_ids() {
            if queue.release(id).is_ok() {
                reverted += 1;
            }
        }
        tracing::info!(event = "rename_run_stopped", reverted, "processing canceled");
    }

    /// Discard every record and clear all flags. Destructive; callers are
    /// expected to confirm with the user first.
    pub async fn reset(&self) {
        self.processing.store(false, Ordering::SeqCst);
        self.queue.lock().await.clear();
        tracing::info!(event = "rename_queue_reset", "queue discarded");
    }

    async fn cycle_inner(&self) -> CycleOutcome {
        let chunk = {
            let mut queue = self.queue.lock().await;
            let pending = queue.pending_chunk(self.config.chunk_size);
            if pending.is_empty() {
                let stale = queue.processing_ids();
                if stale.is_empty() {
                    self.processing.store(false, Ordering::SeqCst);
                    tracing::debug!(event = "rename_run_complete", "no pending records remain");
                    return CycleOutcome::Finished;
                }
                let mut failed = 0usize;
                for id in stale {
                    if queue
                        .fail(id, "stuck in processing with no active cycle")
                        .is_ok()
                    {
                        failed += 1;
                    }
                }
                tracing::warn!(event = "rename_zombies_reaped", count = failed);
                return CycleOutcome::Reaped { failed };
            }

            // A record still marked processing here belongs to an earlier
            // cycle that never reconciled; it cannot be merged anymore.
            for id in queue.processing_ids() {
                let _ = queue.fail(id, "stuck in processing from an earlier cycle");
            }

            let mut chunk = Vec::with_capacity(pending.len());
            for id in pending {
                if queue.begin_processing(id).is_err() {
                    continue;
                }
                let Some(record) = queue.get(id) else { continue };
                let (stem, _) = split_extension(&record.original_name);
                chunk.push((
                    id,
                    OracleItem {
                        id: id.to_string(),
                        stem: stem.to_string(),
                    },
                ));
            }
            chunk
        };

        debug_assert!(chunk.len() <= self.config.chunk_size);
        let request: Vec<OracleItem> = chunk.iter().map(|(_, item)| item.clone()).collect();
        tracing::debug!(event = "rename_cycle_submit", items = request.len());
        let response = self.oracle.infer(&request).await;

        let outcome = {
            let mut queue = self.queue.lock().await;
            match response {
                Ok(labels) => self.merge_labels(&mut queue, &chunk, labels),
                Err(err) => {
                    let reason = err.to_string();
                    let mut failed = 0usize;
                    for (id, _) in &chunk {
                        if queue.status(*id) == Some(FileStatus::Processing)
                            && queue.fail(*id, reason.clone()).is_ok()
                        {
                            failed += 1;
                        }
                    }
                    tracing::warn!(event = "rename_chunk_failed", error = %reason, count = failed);
                    CycleOutcome::Merged {
                        completed: 0,
                        failed,
                    }
                }
            }
        };

        tokio::time::sleep(self.config.cooldown).await;
        outcome
    }

    fn merge_labels(
        &self,
        queue: &mut RenameQueue,
        chunk: &[(RecordId, OracleItem)],
        labels: Vec<OracleLabel>,
    ) -> CycleOutcome {
        let mut by_id: HashMap<String, OracleLabel> = labels
            .into_iter()
            .map(|label| (label.id.clone(), label))
            .collect();
        let mut used = UsedNames::seed(queue.completed_names());

        let mut completed = 0usize;
        let mut failed = 0usize;
        for (id, _) in chunk {
            // Records reverted by a cancel (or removed) while the call was
            // in flight stay untouched.
            if queue.status(*id) != Some(FileStatus::Processing) {
                continue;
            }
            match by_id.remove(&id.to_string()) {
                Some(label) => {
                    let labels = NameLabels {
                        english: sanitize_label(&label.english, false),
                        chinese: sanitize_label(&label.chinese, false),
                        domain: sanitize_label(&label.domain, false),
                    };
                    let extension = queue
                        .get(*id)
                        .map(|record| split_extension(&record.original_name).1.to_string())
                        .unwrap_or_default();
                    let name = resolve_unique_name(
                        &labels.english,
                        &labels.chinese,
                        &labels.domain,
                        &extension,
                        &mut used,
                    );
                    if queue.complete(*id, name, labels).is_ok() {
                        completed += 1;
                    }
                }
                None => {
                    if queue
                        .fail(*id, "oracle response missing this record")
                        .is_ok()
                    {
                        failed += 1;
                    }
                }
            }
        }
        tracing::debug!(event = "rename_chunk_merged", completed, failed);
        CycleOutcome::Merged { completed, failed }
    }
}
