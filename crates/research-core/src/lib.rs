#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/research/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Core traits and types for the equity research pipeline.
//!
//! This crate provides the foundational abstractions shared by every other crate:
//!
//! - [`ResearchProvider`](provider::ResearchProvider) - Base trait for all providers
//! - [`SymbolSearchProvider`](provider::SymbolSearchProvider) - Ticker lookup
//! - [`PeerDataProvider`](provider::PeerDataProvider) - Peer-company discovery
//! - [`CompanyOverviewProvider`](provider::CompanyOverviewProvider) - Company snapshots
//! - [`PhaseDescriptor`](phase::PhaseDescriptor) - Static phase definitions
//! - [`RunMetadata`](metadata::RunMetadata) - Per-run outcome record

/// Error types for research operations.
pub mod error;
/// Per-run metadata document and its JSON persistence.
pub mod metadata;
/// Phase names, descriptors, and the standard phase table.
pub mod phase;
/// Provider traits for sourcing research data.
pub mod provider;
/// Core data types (Symbol, TickerMatch, CompanyOverview).
pub mod types;

// Re-export commonly used items at crate root
pub use error::{ResearchError, Result};
pub use metadata::{METADATA_FILE, RunMetadata};
pub use phase::{PhaseDescriptor, PhaseName, parse_phase_list, standard_phases};
pub use provider::{
    CompanyOverviewProvider, PeerDataProvider, ResearchProvider, SymbolSearchProvider,
};
pub use types::{CompanyOverview, Symbol, TickerMatch};
