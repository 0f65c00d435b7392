//! Per-run metadata document and its JSON persistence.
//!
//! One [`RunMetadata`] exists per research run. It is created before any phase
//! executes and persisted to `00_metadata.json` in the run's work directory
//! after every phase outcome, so a partially-completed run is always
//! inspectable from disk.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use crate::error::{ResearchError, Result};
use crate::types::Symbol;

/// File name of the metadata document within a work directory.
pub const METADATA_FILE: &str = "00_metadata.json";

/// Outcome record for one research run.
///
/// Invariant: a phase name appears in at most one of `phases_completed` and
/// `phases_failed`; it is added to exactly one list when it terminates.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Symbol this run researches.
    pub symbol: Symbol,
    /// Calendar date of the run.
    pub research_date: NaiveDate,
    /// Exact creation timestamp.
    pub research_timestamp: DateTime<Utc>,
    /// Phase names that completed successfully, in completion order.
    pub phases_completed: Vec<String>,
    /// Phase names that failed, in completion order.
    pub phases_failed: Vec<String>,
    /// Error strings recorded against failed phases.
    pub errors: Vec<String>,
    /// Free-form provenance map: which provider served which concern.
    pub data_sources: BTreeMap<String, String>,
}

impl RunMetadata {
    /// Creates fresh metadata for a run starting now.
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        let now = Utc::now();
        Self {
            symbol,
            research_date: now.date_naive(),
            research_timestamp: now,
            phases_completed: Vec::new(),
            phases_failed: Vec::new(),
            errors: Vec::new(),
            data_sources: BTreeMap::new(),
        }
    }

    /// Records a successful phase completion.
    pub fn record_completed(&mut self, phase: &str) {
        debug_assert!(!self.has_outcome(phase), "phase recorded twice: {phase}");
        self.phases_completed.push(phase.to_string());
    }

    /// Records a failed phase along with its error string.
    pub fn record_failed(&mut self, phase: &str, error: impl Into<String>) {
        debug_assert!(!self.has_outcome(phase), "phase recorded twice: {phase}");
        self.phases_failed.push(phase.to_string());
        self.errors.push(error.into());
    }

    /// Records which provider served a named concern (e.g., "peers").
    pub fn record_data_source(&mut self, concern: &str, provider: &str) {
        self.data_sources
            .insert(concern.to_string(), provider.to_string());
    }

    /// Returns true if the phase already has a terminal outcome.
    #[must_use]
    pub fn has_outcome(&self, phase: &str) -> bool {
        self.phases_completed.iter().any(|p| p == phase)
            || self.phases_failed.iter().any(|p| p == phase)
    }

    /// Writes the metadata document into `work_dir`.
    pub fn save(&self, work_dir: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .map_err(|e| ResearchError::Other(e.to_string()))?;
        std::fs::write(work_dir.join(METADATA_FILE), json)
            .map_err(|e| ResearchError::Io(e.to_string()))
    }

    /// Reads the metadata document from `work_dir`.
    pub fn load(work_dir: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(work_dir.join(METADATA_FILE))
            .map_err(|e| ResearchError::Io(e.to_string()))?;
        serde_json::from_str(&json).map_err(|e| ResearchError::Parse(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_lands_in_exactly_one_list() {
        let mut meta = RunMetadata::new(Symbol::new("TSLA"));
        meta.record_completed("technical");
        meta.record_failed("sec", "HTTP 403");

        assert_eq!(meta.phases_completed, vec!["technical"]);
        assert_eq!(meta.phases_failed, vec!["sec"]);
        assert_eq!(meta.errors, vec!["HTTP 403"]);
        assert!(meta.has_outcome("technical"));
        assert!(meta.has_outcome("sec"));
        assert!(!meta.has_outcome("report"));
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let mut meta = RunMetadata::new(Symbol::new("INTC"));
        meta.record_completed("wikipedia");
        meta.record_data_source("ticker_lookup", "Finnhub");
        meta.save(dir.path()).unwrap();

        let loaded = RunMetadata::load(dir.path()).unwrap();
        assert_eq!(loaded, meta);
        assert!(dir.path().join(METADATA_FILE).exists());
    }

    #[test]
    fn test_load_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = RunMetadata::load(dir.path()).unwrap_err();
        assert!(matches!(err, ResearchError::Io(_)));
    }
}
