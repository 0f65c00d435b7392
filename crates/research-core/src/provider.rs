//! Provider traits for sourcing research data.
//!
//! This module defines the core provider traits:
//!
//! - [`ResearchProvider`] - Base trait for all data providers
//! - [`SymbolSearchProvider`] - Ticker/company lookup
//! - [`PeerDataProvider`] - Peer-company discovery
//! - [`CompanyOverviewProvider`] - Company reference snapshots
//!
//! Providers of the same kind are arranged into ordered fallback chains by the
//! registry in the `research` crate; each implementation covers one vendor.

use async_trait::async_trait;
use std::fmt::Debug;

use crate::{
    error::Result,
    types::{CompanyOverview, Symbol, TickerMatch},
};

/// Base trait for all research data providers.
///
/// All providers must implement this trait to provide basic metadata about
/// the provider and its capabilities.
pub trait ResearchProvider: Send + Sync + Debug {
    /// Returns the name of this provider (e.g., "Finnhub").
    fn name(&self) -> &str;

    /// Returns a description of this provider.
    fn description(&self) -> &str;
}

/// Provider for ticker symbol search.
///
/// Implement this trait to resolve a free-form query (ticker or company name)
/// into matching symbols. A successful search must return at least one match;
/// the fallback resolver treats an empty result as a failed attempt.
#[async_trait]
pub trait SymbolSearchProvider: ResearchProvider {
    /// Searches for symbols matching `query`, returning at most `limit` hits.
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TickerMatch>>;
}

/// Provider for peer-company discovery.
///
/// Implement this trait to list companies comparable to a given symbol
/// (typically by industry classification). The target symbol itself must not
/// appear in the returned list.
#[async_trait]
pub trait PeerDataProvider: ResearchProvider {
    /// Returns peer symbols for `symbol`.
    async fn peers(&self, symbol: &Symbol) -> Result<Vec<Symbol>>;
}

/// Provider for company reference snapshots.
#[async_trait]
pub trait CompanyOverviewProvider: ResearchProvider {
    /// Fetches a company overview for `symbol`.
    async fn overview(&self, symbol: &Symbol) -> Result<CompanyOverview>;
}
