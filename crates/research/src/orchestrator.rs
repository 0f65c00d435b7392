//! Research run orchestration.
//!
//! One run researches one symbol: validate, clean up prior runs, grab a quick
//! company-overview snapshot, then execute the requested phases in dependency
//! order. The technical phase always runs alone first because it produces the
//! peer list later phases consume. The remaining data phases run concurrently
//! under a bounded worker pool, and the report → deep → final tail runs
//! strictly sequentially, proceeding best-effort even when upstream phases
//! failed. A phase whose script is absent is skipped, not failed.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::Local;
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use research_core::{
    PhaseDescriptor, PhaseName, ResearchError, Result, RunMetadata, Symbol, standard_phases,
};
use research_runner::{MetadataStore, PhaseRunner, cleanup_old_runs, work_dir_for};

use crate::registry::ProviderRegistry;

/// Default bound on concurrently running data phases.
pub const DEFAULT_MAX_PARALLEL: usize = 6;

/// Configuration for one research run.
#[derive(Clone, Debug)]
pub struct RunConfig {
    /// Symbol to research.
    pub symbol: Symbol,
    /// Phases to run, in any order; scheduling order is fixed by the pipeline.
    pub phases: Vec<PhaseName>,
    /// Keep prior run directories for this symbol.
    pub skip_cleanup: bool,
    /// User-supplied peer override; bypasses peer discovery entirely.
    pub peers: Option<Vec<Symbol>>,
    /// Whether the technical phase should filter auto-detected peers.
    pub filter_peers: bool,
    /// Root directory holding per-run work directories.
    pub work_root: PathBuf,
    /// Directory holding the phase scripts.
    pub skills_dir: PathBuf,
    /// Bound on concurrently running data phases.
    pub max_parallel: usize,
}

impl RunConfig {
    /// Creates a config requesting every phase with default paths.
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            phases: PhaseName::ALL.to_vec(),
            skip_cleanup: false,
            peers: None,
            filter_peers: true,
            work_root: PathBuf::from("work"),
            skills_dir: PathBuf::from("skills"),
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

/// Aggregate outcome of a finished run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunOutcome {
    /// Every executed phase completed.
    Success,
    /// Some phases completed, some failed.
    Partial,
    /// No phase completed.
    Failure,
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Partial => f.write_str("partial"),
            Self::Failure => f.write_str("failure"),
        }
    }
}

/// Progress of a run through its fixed stage sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunState {
    /// No run started yet.
    NotStarted,
    /// Validating symbol and credentials.
    Validating,
    /// The technical phase is executing alone.
    TechnicalRunning,
    /// Data phases are executing under the worker pool.
    ParallelPhasesRunning,
    /// The report phase is executing.
    ReportRunning,
    /// The deep research phase is executing.
    DeepRunning,
    /// The final report phase is executing.
    FinalRunning,
    /// The run finished with the given outcome.
    Done(RunOutcome),
}

/// Summary of a finished run, printed for the operator.
#[derive(Clone, Debug)]
pub struct RunSummary {
    /// Symbol researched.
    pub symbol: Symbol,
    /// The run's work directory.
    pub work_dir: PathBuf,
    /// Phases that completed, in completion order.
    pub completed: Vec<String>,
    /// Phases that failed, in completion order.
    pub failed: Vec<String>,
    /// Error strings recorded against failed phases.
    pub errors: Vec<String>,
    /// Requested phases skipped because their script is not installed.
    pub skipped: Vec<String>,
    /// Aggregate outcome.
    pub outcome: RunOutcome,
}

impl RunSummary {
    /// Process exit code: 0 if at least one phase completed, 1 otherwise.
    #[must_use]
    pub fn exit_code(&self) -> i32 {
        if self.completed.is_empty() { 1 } else { 0 }
    }
}

/// Schedules and executes research runs.
#[derive(Debug)]
pub struct Orchestrator {
    registry: ProviderRegistry,
    phase_table: Vec<PhaseDescriptor>,
    state: RunState,
}

impl Orchestrator {
    /// Creates an orchestrator over `registry` with the standard phase table.
    #[must_use]
    pub fn new(registry: ProviderRegistry) -> Self {
        Self {
            registry,
            phase_table: standard_phases(),
            state: RunState::NotStarted,
        }
    }

    /// Replaces the phase table. Used by tests and exotic deployments.
    #[must_use]
    pub fn with_phase_table(mut self, phase_table: Vec<PhaseDescriptor>) -> Self {
        self.phase_table = phase_table;
        self
    }

    /// Current run state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Executes one research run to completion.
    ///
    /// Returns an error only for pre-flight failures (invalid symbol, missing
    /// credentials, unusable work directory). Phase failures never surface as
    /// errors; they are recorded in the summary.
    pub async fn run(&mut self, config: RunConfig) -> Result<RunSummary> {
        let symbol = config.symbol.clone();
        self.state = RunState::Validating;
        info!(symbol = %symbol, phases = config.phases.len(), "Starting research run");

        self.validate_symbol(&symbol).await?;
        self.validate_credentials(&config.phases)?;

        // Cleanup happens before the new directory exists, so the current
        // run's directory can never match the deletion sweep.
        let work_dir = work_dir_for(&config.work_root, &symbol, Local::now().date_naive());
        if config.skip_cleanup {
            info!("Skipping cleanup of old run directories");
        } else {
            let deleted = cleanup_old_runs(&config.work_root, &symbol, &work_dir);
            info!(deleted, "Cleaned up old run directories");
        }
        std::fs::create_dir_all(&work_dir).map_err(|e| ResearchError::Io(e.to_string()))?;
        info!(work_dir = %work_dir.display(), "Created work directory");

        let store = MetadataStore::create(&work_dir, RunMetadata::new(symbol.clone()))?;
        let runner = PhaseRunner::new(&config.skills_dir);

        self.fetch_company_overview(&symbol, &store).await;
        let technical_args = self.resolve_technical_args(&config, &store).await;

        let mut skipped: Vec<String> = Vec::new();

        // Technical runs alone first: it generates the peer list consumed by
        // the fundamental phase and the final report.
        if let Some(descriptor) = self.requested(&config, PhaseName::Technical) {
            self.state = RunState::TechnicalRunning;
            if runner.script_path(&descriptor).exists() {
                let ok = runner
                    .run_phase(&descriptor, &symbol, &work_dir, &store, &technical_args)
                    .await;
                if !ok {
                    warn!("Technical phase failed - downstream phases may have incomplete peer data");
                }
            } else {
                info!("Skipping 'technical' - script not installed");
                skipped.push(PhaseName::Technical.as_str().to_string());
            }
        }

        self.run_parallel_stage(&config, &runner, &symbol, &work_dir, &store, &mut skipped)
            .await;

        // Sequential tail: each runs after the previous finished, successful
        // or not, so partial data still yields a degraded report.
        for phase in [PhaseName::Report, PhaseName::Deep, PhaseName::Final] {
            let Some(descriptor) = self.requested(&config, phase) else {
                continue;
            };
            self.state = match phase {
                PhaseName::Deep => RunState::DeepRunning,
                PhaseName::Final => RunState::FinalRunning,
                _ => RunState::ReportRunning,
            };
            if runner.script_path(&descriptor).exists() {
                runner
                    .run_phase(&descriptor, &symbol, &work_dir, &store, &[])
                    .await;
            } else {
                info!("Skipping '{phase}' - script not installed");
                skipped.push(phase.as_str().to_string());
            }
        }

        let metadata = store.snapshot().await;
        let outcome = if metadata.phases_completed.is_empty() {
            RunOutcome::Failure
        } else if metadata.phases_failed.is_empty() {
            RunOutcome::Success
        } else {
            RunOutcome::Partial
        };
        self.state = RunState::Done(outcome);
        info!(
            completed = metadata.phases_completed.len(),
            failed = metadata.phases_failed.len(),
            %outcome,
            "Research run finished"
        );

        Ok(RunSummary {
            symbol,
            work_dir,
            completed: metadata.phases_completed,
            failed: metadata.phases_failed,
            errors: metadata.errors,
            skipped,
            outcome,
        })
    }

    /// Provider-backed symbol validation. Aborts the run when providers ran
    /// and none matched; skipped with a warning when no provider is configured.
    async fn validate_symbol(&self, symbol: &Symbol) -> Result<()> {
        if !self.registry.has_search_providers() {
            warn!("No search providers configured; skipping ticker validation");
            return Ok(());
        }

        let lookup = self.registry.search_ticker(symbol.as_str(), 1).await;
        if lookup.resolved() {
            info!(provider = %lookup.provider, "Ticker validated");
            Ok(())
        } else {
            Err(ResearchError::SymbolNotFound(format!(
                "{symbol} ({})",
                lookup.describe_errors()
            )))
        }
    }

    /// Presence check for every credential any requested phase needs.
    fn validate_credentials(&self, phases: &[PhaseName]) -> Result<()> {
        let missing: BTreeSet<&str> = self
            .phase_table
            .iter()
            .filter(|descriptor| phases.contains(&descriptor.name))
            .flat_map(|descriptor| descriptor.credentials.iter())
            .filter(|key| std::env::var(key.as_str()).is_err())
            .map(String::as_str)
            .collect();

        if missing.is_empty() {
            return Ok(());
        }
        Err(ResearchError::MissingCredential(
            missing.into_iter().collect::<Vec<_>>().join(", "),
        ))
    }

    /// Quick win: snapshot company reference data before any phase runs.
    /// Best effort only: a miss is a warning, never a phase failure.
    async fn fetch_company_overview(&self, symbol: &Symbol, store: &MetadataStore) {
        if !self.registry.has_overview_providers() {
            return;
        }

        let out_dir = store.work_dir().join("02_fundamental");
        let path = out_dir.join("company_overview.json");
        if path.exists() {
            info!("Company overview already exists, skipping");
            return;
        }

        let mut resolution = self.registry.company_overview(symbol).await;
        let Some(overview) = std::mem::take(&mut resolution.items).into_iter().next() else {
            warn!(
                errors = %resolution.describe_errors(),
                "Could not fetch company overview, continuing with other phases"
            );
            return;
        };

        let written = std::fs::create_dir_all(&out_dir)
            .and_then(|()| {
                let json = serde_json::to_string_pretty(&overview)
                    .map_err(|e| std::io::Error::other(e.to_string()))?;
                std::fs::write(&path, json)
            })
            .map_err(|e| e.to_string());

        match written {
            Ok(()) => {
                info!(provider = %resolution.provider, "Company overview ready");
                store
                    .record_data_source("company_overview", &resolution.provider)
                    .await;
            }
            Err(e) => warn!(error = %e, "Could not write company overview"),
        }
    }

    /// Builds the technical phase's extra arguments: either the user's peer
    /// override or a best-effort resolution through the peer fallback chain.
    async fn resolve_technical_args(
        &self,
        config: &RunConfig,
        store: &MetadataStore,
    ) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(peers) = config.peers.as_deref() {
            if !peers.is_empty() {
                args.push("--peers".to_string());
                args.push(join_symbols(peers));
                store.record_data_source("peers", "user").await;
            }
        } else if config.phases.contains(&PhaseName::Technical)
            && self.registry.has_peer_providers()
        {
            let resolution = self.registry.peers(&config.symbol).await;
            if resolution.resolved() {
                info!(
                    provider = %resolution.provider,
                    count = resolution.items.len(),
                    "Resolved peer list"
                );
                args.push("--peers".to_string());
                args.push(join_symbols(&resolution.items));
                store.record_data_source("peers", &resolution.provider).await;
            } else {
                warn!(
                    errors = %resolution.describe_errors(),
                    "Peer discovery exhausted all providers; technical phase will auto-detect"
                );
            }
        }

        if !config.filter_peers {
            args.push("--no-filter-peers".to_string());
        }
        args
    }

    /// Runs the non-technical data phases concurrently under the worker pool,
    /// collecting outcomes in completion order.
    async fn run_parallel_stage(
        &mut self,
        config: &RunConfig,
        runner: &PhaseRunner,
        symbol: &Symbol,
        work_dir: &std::path::Path,
        store: &MetadataStore,
        skipped: &mut Vec<String>,
    ) {
        let parallel: Vec<PhaseDescriptor> = self
            .phase_table
            .iter()
            .filter(|descriptor| {
                config.phases.contains(&descriptor.name)
                    && descriptor.name != PhaseName::Technical
                    && !descriptor.name.is_sequential_tail()
            })
            .cloned()
            .collect();
        if parallel.is_empty() {
            return;
        }

        self.state = RunState::ParallelPhasesRunning;
        info!(count = parallel.len(), "Executing data phases in parallel");

        let semaphore = Arc::new(Semaphore::new(config.max_parallel.max(1)));
        let mut tasks = FuturesUnordered::new();

        for descriptor in parallel {
            if !runner.script_path(&descriptor).exists() {
                info!("Skipping '{}' - script not installed", descriptor.name);
                skipped.push(descriptor.name.as_str().to_string());
                continue;
            }

            let name = descriptor.name;
            let semaphore = Arc::clone(&semaphore);
            let runner = runner.clone();
            let symbol = symbol.clone();
            let work_dir = work_dir.to_path_buf();
            let store = store.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok();
                runner
                    .run_phase(&descriptor, &symbol, &work_dir, &store, &[])
                    .await
            });
            tasks.push(async move { (name, handle.await) });
        }

        // Outcomes arrive in completion order, not submission order
        while let Some((name, joined)) = tasks.next().await {
            if let Err(e) = joined {
                warn!(phase = %name, error = %e, "Unexpected error in parallel execution");
                store
                    .record_failure(
                        name.as_str(),
                        format!("Phase '{name}' encountered unexpected error: {e}"),
                    )
                    .await;
            }
        }
    }

    /// Descriptor for `phase` if it is in the requested set.
    fn requested(&self, config: &RunConfig, phase: PhaseName) -> Option<PhaseDescriptor> {
        if !config.phases.contains(&phase) {
            return None;
        }
        self.phase_table
            .iter()
            .find(|descriptor| descriptor.name == phase)
            .cloned()
    }
}

/// Joins symbols into the comma-separated form phase scripts accept.
fn join_symbols(symbols: &[Symbol]) -> String {
    symbols
        .iter()
        .map(Symbol::as_str)
        .collect::<Vec<_>>()
        .join(",")
}
