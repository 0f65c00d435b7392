#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/research/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Financial Modeling Prep (FMP) data provider.
//!
//! This crate implements the research-core traits for the
//! [Financial Modeling Prep](https://financialmodelingprep.com/) API.
//! It sits last in the standard fallback chains: free-tier keys cover search
//! and profiles, while the peers endpoint may require a paid plan. In that
//! case the error string says so and the resolver records it.
//!
//! # Usage
//!
//! ```rust,ignore
//! use research_fmp::FmpProvider;
//! use research_core::{SymbolSearchProvider, PeerDataProvider, Symbol};
//!
//! let provider = FmpProvider::new("your_api_key");
//! let matches = provider.search("Broadcom", 5).await?;
//! let peers = provider.peers(&Symbol::new("AVGO")).await?;
//! ```

use std::fmt;

use async_trait::async_trait;
use chrono::Utc;
use research_core::{
    CompanyOverview, CompanyOverviewProvider, PeerDataProvider, ResearchError, ResearchProvider,
    Result, Symbol, SymbolSearchProvider, TickerMatch,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Base URL for the FMP stable API.
const FMP_BASE_URL: &str = "https://financialmodelingprep.com/stable";

/// Financial Modeling Prep data provider.
///
/// Provides access to:
/// - Ticker symbol search
/// - Peer-company lists
/// - Company profiles
#[derive(Clone)]
pub struct FmpProvider {
    client: Client,
    api_key: String,
}

impl fmt::Debug for FmpProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FmpProvider")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl FmpProvider {
    /// Create a new FMP provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Create a new FMP provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Build a URL with the API key appended.
    fn url(&self, endpoint: &str) -> String {
        if endpoint.contains('?') {
            format!("{FMP_BASE_URL}/{endpoint}&apikey={}", self.api_key)
        } else {
            format!("{FMP_BASE_URL}/{endpoint}?apikey={}", self.api_key)
        }
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        debug!("FMP request: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResearchError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ResearchError::RateLimited {
                provider: "FMP".to_string(),
                retry_after: None,
            });
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            // FMP reports plan restrictions as HTTP errors with a prose body
            if text.to_lowercase().contains("subscription") || text.to_lowercase().contains("plan")
            {
                return Err(ResearchError::NotSupported(format!(
                    "FMP endpoint requires a paid subscription: {text}"
                )));
            }
            return Err(ResearchError::Network(format!("HTTP {status}: {text}")));
        }

        let text = response
            .text()
            .await
            .map_err(|e| ResearchError::Network(e.to_string()))?;

        // Check for FMP error responses
        if text.contains("\"Error Message\"") || text.contains("\"error\"") {
            return Err(ResearchError::Network(text));
        }

        serde_json::from_str(&text).map_err(|e| ResearchError::Parse(format!("{e}: {text}")))
    }
}

impl ResearchProvider for FmpProvider {
    fn name(&self) -> &str {
        "FMP"
    }

    fn description(&self) -> &str {
        "Financial Modeling Prep provider for search, peer lists, and company profiles"
    }
}

#[async_trait]
impl SymbolSearchProvider for FmpProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TickerMatch>> {
        let endpoint = format!(
            "search-symbol?query={}&limit={limit}",
            query.replace(' ', "%20")
        );
        let hits: Vec<FmpSearchHit> = self.get(&endpoint).await?;

        let matches: Vec<TickerMatch> = hits
            .into_iter()
            .take(limit)
            .map(|hit| TickerMatch {
                symbol: Symbol::new(hit.symbol),
                name: hit.name,
                exchange: hit.exchange.or(hit.exchange_full_name),
                asset_type: None,
                mic: None,
                currency: hit.currency,
            })
            .collect();

        debug!("FMP search returned {} matches", matches.len());
        Ok(matches)
    }
}

#[async_trait]
impl PeerDataProvider for FmpProvider {
    async fn peers(&self, symbol: &Symbol) -> Result<Vec<Symbol>> {
        let endpoint = format!("stock-peers?symbol={}", symbol.as_str());
        let peers: Vec<FmpPeer> = self.get(&endpoint).await?;

        let peers: Vec<Symbol> = peers
            .into_iter()
            .map(|peer| Symbol::new(peer.symbol))
            .filter(|peer| peer != symbol)
            .collect();

        debug!("FMP returned {} peers for {}", peers.len(), symbol);
        Ok(peers)
    }
}

#[async_trait]
impl CompanyOverviewProvider for FmpProvider {
    async fn overview(&self, symbol: &Symbol) -> Result<CompanyOverview> {
        let endpoint = format!("profile?symbol={}", symbol.as_str());
        let profiles: Vec<FmpProfile> = self.get(&endpoint).await?;

        let profile = profiles
            .into_iter()
            .next()
            .ok_or_else(|| ResearchError::SymbolNotFound(symbol.to_string()))?;

        Ok(CompanyOverview {
            symbol: symbol.clone(),
            fetched_at: Utc::now(),
            company_name: profile.company_name,
            sector: profile.sector,
            industry: profile.industry,
            country: profile.country,
            website: profile.website,
            business_summary: profile.description,
            employees: profile
                .full_time_employees
                .and_then(|n| n.parse::<u64>().ok()),
            market_cap: profile.market_cap,
            trailing_pe: None,
            forward_pe: None,
        })
    }
}

// ============================================================================
// FMP API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpSearchHit {
    symbol: String,
    name: Option<String>,
    currency: Option<String>,
    exchange: Option<String>,
    exchange_full_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FmpPeer {
    symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FmpProfile {
    company_name: Option<String>,
    sector: Option<String>,
    industry: Option<String>,
    country: Option<String>,
    website: Option<String>,
    description: Option<String>,
    // FMP serializes employee counts as strings
    full_time_employees: Option<String>,
    market_cap: Option<f64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_info() {
        let provider = FmpProvider::new("test-key");
        assert_eq!(provider.name(), "FMP");
        assert!(provider.description().contains("peer"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = FmpProvider::new("super-secret");
        let debug = format!("{provider:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn test_url_builder() {
        let provider = FmpProvider::new("abc");
        assert_eq!(
            provider.url("stock-peers?symbol=AVGO"),
            "https://financialmodelingprep.com/stable/stock-peers?symbol=AVGO&apikey=abc"
        );
    }

    #[test]
    fn test_profile_parsing() {
        let json = r#"[{
            "symbol": "AVGO",
            "companyName": "Broadcom Inc.",
            "sector": "Technology",
            "industry": "Semiconductors",
            "fullTimeEmployees": "37000",
            "marketCap": 1500000000000.0
        }]"#;
        let parsed: Vec<FmpProfile> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0].company_name.as_deref(), Some("Broadcom Inc."));
        assert_eq!(parsed[0].full_time_employees.as_deref(), Some("37000"));
    }
}
