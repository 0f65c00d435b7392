//! Work-directory naming and cleanup.
//!
//! Each run owns `work/{SYMBOL}_{YYYYMMDD}`. Phases write only to their own
//! subdirectories inside it; the orchestrator deletes prior runs of the same
//! symbol before starting a new one unless cleanup is suppressed.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use research_core::Symbol;
use tracing::{debug, warn};

/// Returns the work directory path for a run of `symbol` on `date`.
#[must_use]
pub fn work_dir_for(root: &Path, symbol: &Symbol, date: NaiveDate) -> PathBuf {
    root.join(format!("{}_{}", symbol.as_str(), date.format("%Y%m%d")))
}

/// Deletes older run directories for `symbol` under `root`, preserving `keep`.
///
/// Only directories whose name starts with `{SYMBOL}_` are touched. Individual
/// deletion failures are logged and skipped. Returns the number of directories
/// removed.
pub fn cleanup_old_runs(root: &Path, symbol: &Symbol, keep: &Path) -> usize {
    let prefix = format!("{}_", symbol.as_str());
    let entries = match std::fs::read_dir(root) {
        Ok(entries) => entries,
        // Nothing to clean before the first run ever
        Err(_) => return 0,
    };

    let mut deleted = 0;
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_dir() || path == keep {
            continue;
        }
        let matches_symbol = entry
            .file_name()
            .to_str()
            .is_some_and(|name| name.starts_with(&prefix));
        if !matches_symbol {
            continue;
        }
        match std::fs::remove_dir_all(&path) {
            Ok(()) => {
                debug!(path = %path.display(), "Deleted old run directory");
                deleted += 1;
            }
            Err(e) => warn!(path = %path.display(), error = %e, "Could not delete old run directory"),
        }
    }
    deleted
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_dir_naming() {
        let date = NaiveDate::from_ymd_opt(2025, 3, 14).unwrap();
        let dir = work_dir_for(Path::new("work"), &Symbol::new("tsla"), date);
        assert_eq!(dir, Path::new("work/TSLA_20250314"));
    }

    #[test]
    fn test_cleanup_preserves_current_and_other_symbols() {
        let root = tempfile::tempdir().unwrap();
        let current = root.path().join("TSLA_20250314");
        let stale_a = root.path().join("TSLA_20250301");
        let stale_b = root.path().join("TSLA_20240101");
        let other = root.path().join("INTC_20250314");
        for dir in [&current, &stale_a, &stale_b, &other] {
            std::fs::create_dir_all(dir).unwrap();
        }

        let deleted = cleanup_old_runs(root.path(), &Symbol::new("TSLA"), &current);

        assert_eq!(deleted, 2);
        assert!(current.exists());
        assert!(other.exists());
        assert!(!stale_a.exists());
        assert!(!stale_b.exists());
    }

    #[test]
    fn test_cleanup_of_missing_root_is_a_noop() {
        let root = tempfile::tempdir().unwrap();
        let missing = root.path().join("does-not-exist");
        let keep = missing.join("TSLA_20250314");
        assert_eq!(cleanup_old_runs(&missing, &Symbol::new("TSLA"), &keep), 0);
    }
}
