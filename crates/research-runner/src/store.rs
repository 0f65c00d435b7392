//! Shared, persisted run metadata.
//!
//! Phase outcomes arrive from concurrently running workers; the append and the
//! disk write happen together under one exclusive lock so two phases
//! completing simultaneously can never interleave their updates or lose one.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use research_core::{Result, RunMetadata};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Handle to the run's metadata, shared across phase workers.
///
/// Clones are cheap and refer to the same underlying record.
#[derive(Clone, Debug)]
pub struct MetadataStore {
    work_dir: PathBuf,
    inner: Arc<Mutex<RunMetadata>>,
}

impl MetadataStore {
    /// Creates a store for `metadata`, persisting the initial document into
    /// `work_dir` immediately.
    pub fn create(work_dir: impl Into<PathBuf>, metadata: RunMetadata) -> Result<Self> {
        let work_dir = work_dir.into();
        metadata.save(&work_dir)?;
        Ok(Self {
            work_dir,
            inner: Arc::new(Mutex::new(metadata)),
        })
    }

    /// The work directory this store persists into.
    #[must_use]
    pub fn work_dir(&self) -> &Path {
        &self.work_dir
    }

    /// Records a successful phase completion and persists.
    pub async fn record_success(&self, phase: &str) {
        let mut meta = self.inner.lock().await;
        meta.record_completed(phase);
        debug!(phase, "recorded phase success");
        self.persist(&meta);
    }

    /// Records a failed phase with its error string and persists.
    pub async fn record_failure(&self, phase: &str, error: impl Into<String>) {
        let mut meta = self.inner.lock().await;
        meta.record_failed(phase, error);
        debug!(phase, "recorded phase failure");
        self.persist(&meta);
    }

    /// Records provider provenance for a named concern and persists.
    pub async fn record_data_source(&self, concern: &str, provider: &str) {
        let mut meta = self.inner.lock().await;
        meta.record_data_source(concern, provider);
        self.persist(&meta);
    }

    /// Returns a point-in-time copy of the metadata.
    pub async fn snapshot(&self) -> RunMetadata {
        self.inner.lock().await.clone()
    }

    /// Best-effort disk mirror; a failed write must not fail the run.
    fn persist(&self, meta: &RunMetadata) {
        if let Err(e) = meta.save(&self.work_dir) {
            warn!(error = %e, "Failed to persist run metadata");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use research_core::Symbol;

    fn store_in(dir: &Path) -> MetadataStore {
        MetadataStore::create(dir, RunMetadata::new(Symbol::new("TSLA"))).unwrap()
    }

    #[tokio::test]
    async fn test_create_persists_initial_document() {
        let dir = tempfile::tempdir().unwrap();
        let _store = store_in(dir.path());
        let loaded = RunMetadata::load(dir.path()).unwrap();
        assert!(loaded.phases_completed.is_empty());
    }

    #[tokio::test]
    async fn test_outcomes_reach_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        store.record_success("technical").await;
        store.record_failure("sec", "HTTP 403").await;

        let loaded = RunMetadata::load(dir.path()).unwrap();
        assert_eq!(loaded.phases_completed, vec!["technical"]);
        assert_eq!(loaded.phases_failed, vec!["sec"]);
        assert_eq!(loaded.errors, vec!["HTTP 403"]);
    }

    #[tokio::test]
    async fn test_simultaneous_completions_all_land() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(dir.path());

        let mut tasks = Vec::new();
        for phase in ["fundamental", "research", "wikipedia", "sec"] {
            let store = store.clone();
            tasks.push(tokio::spawn(async move {
                store.record_success(phase).await;
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let meta = store.snapshot().await;
        assert_eq!(meta.phases_completed.len(), 4);
        for phase in ["fundamental", "research", "wikipedia", "sec"] {
            assert!(meta.has_outcome(phase));
        }
        // Disk mirror agrees with memory
        assert_eq!(RunMetadata::load(dir.path()).unwrap(), meta);
    }
}
