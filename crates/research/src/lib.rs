#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/research/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod orchestrator;
pub mod registry;

pub use orchestrator::{
    DEFAULT_MAX_PARALLEL, Orchestrator, RunConfig, RunOutcome, RunState, RunSummary,
};
pub use registry::{NO_PROVIDER, ProviderRegistry, Resolution};

pub use research_core::{
    CompanyOverview, METADATA_FILE, PhaseDescriptor, PhaseName, ResearchError, Result,
    RunMetadata, Symbol, TickerMatch, parse_phase_list, standard_phases,
};
pub use research_runner::{MetadataStore, PhaseRunner};
