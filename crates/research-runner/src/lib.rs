#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/research/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Phase subprocess runner and run-state persistence.
//!
//! - [`PhaseRunner`](runner::PhaseRunner) - runs one phase as a child process
//! - [`MetadataStore`](store::MetadataStore) - lock-guarded, disk-mirrored metadata
//! - [`work_dir_for`](workdir::work_dir_for) / [`cleanup_old_runs`](workdir::cleanup_old_runs)

/// Phase subprocess execution.
pub mod runner;
/// Shared, persisted run metadata.
pub mod store;
/// Work-directory naming and cleanup.
pub mod workdir;

pub use runner::PhaseRunner;
pub use store::MetadataStore;
pub use workdir::{cleanup_old_runs, work_dir_for};
