//! Core data types for the research pipeline.
//!
//! This module defines the fundamental data structures:
//!
//! - [`Symbol`] - Trading symbol/ticker
//! - [`TickerMatch`] - One hit from a symbol search
//! - [`CompanyOverview`] - Snapshot of company reference data

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A trading symbol/ticker.
///
/// Symbols are automatically uppercased on creation.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Symbol(String);

impl Symbol {
    /// Creates a new symbol from a string, converting to uppercase.
    #[must_use]
    pub fn new(s: impl Into<String>) -> Self {
        Self(s.into().to_uppercase())
    }

    /// Returns the symbol as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Symbol {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl From<&str> for Symbol {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Symbol {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

/// One hit from a ticker symbol search.
///
/// Providers populate the fields they know about; everything beyond the symbol
/// itself is optional because vendors disagree on what a search result carries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickerMatch {
    /// The matched trading symbol.
    pub symbol: Symbol,
    /// Company or instrument name.
    pub name: Option<String>,
    /// Listing exchange, if reported.
    pub exchange: Option<String>,
    /// Instrument type (e.g., "Common Stock", "EQUITY").
    pub asset_type: Option<String>,
    /// Market identifier code, if reported.
    pub mic: Option<String>,
    /// Trading currency, if reported.
    pub currency: Option<String>,
}

impl TickerMatch {
    /// Creates a match carrying only the symbol.
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            name: None,
            exchange: None,
            asset_type: None,
            mic: None,
            currency: None,
        }
    }
}

/// Snapshot of company reference data.
///
/// Fetched once at the start of a run ("quick win") because several later
/// phases benefit from having it cached early.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CompanyOverview {
    /// Symbol this overview describes.
    pub symbol: Symbol,
    /// When the snapshot was fetched.
    pub fetched_at: DateTime<Utc>,
    /// Full company name.
    pub company_name: Option<String>,
    /// GICS sector.
    pub sector: Option<String>,
    /// Industry classification.
    pub industry: Option<String>,
    /// Country of incorporation.
    pub country: Option<String>,
    /// Company website.
    pub website: Option<String>,
    /// Long-form business description.
    pub business_summary: Option<String>,
    /// Full-time employee count.
    pub employees: Option<u64>,
    /// Market capitalization in the listing currency.
    pub market_cap: Option<f64>,
    /// Trailing price/earnings ratio.
    pub trailing_pe: Option<f64>,
    /// Forward price/earnings ratio.
    pub forward_pe: Option<f64>,
}

impl CompanyOverview {
    /// Creates an empty overview for a symbol, stamped with the current time.
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            fetched_at: Utc::now(),
            company_name: None,
            sector: None,
            industry: None,
            country: None,
            website: None,
            business_summary: None,
            employees: None,
            market_cap: None,
            trailing_pe: None,
            forward_pe: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symbol_uppercases() {
        let symbol = Symbol::new("tsla");
        assert_eq!(symbol.as_str(), "TSLA");
        assert_eq!(symbol.to_string(), "TSLA");
    }

    #[test]
    fn test_symbol_from_str() {
        let symbol: Symbol = "intc".parse().unwrap();
        assert_eq!(symbol, Symbol::new("INTC"));
    }

    #[test]
    fn test_ticker_match_roundtrip() {
        let hit = TickerMatch {
            name: Some("Broadcom Inc.".to_string()),
            exchange: Some("NMS".to_string()),
            ..TickerMatch::new(Symbol::new("AVGO"))
        };
        let json = serde_json::to_string(&hit).unwrap();
        let back: TickerMatch = serde_json::from_str(&json).unwrap();
        assert_eq!(hit, back);
    }
}
