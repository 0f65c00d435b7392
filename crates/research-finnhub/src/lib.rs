#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/research/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Finnhub data provider.
//!
//! Implements symbol search and peer discovery against the
//! [Finnhub](https://finnhub.io/) REST API.
//!
//! # Usage
//!
//! ```rust,ignore
//! use research_finnhub::FinnhubProvider;
//! use research_core::{PeerDataProvider, Symbol};
//!
//! let provider = FinnhubProvider::new("your_api_key");
//! let peers = provider.peers(&Symbol::new("INTC")).await?;
//! ```

use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use research_core::{
    PeerDataProvider, ResearchError, ResearchProvider, Result, Symbol, SymbolSearchProvider,
    TickerMatch,
};
use reqwest::Client;
use serde::Deserialize;
use tracing::debug;

/// Base URL for the Finnhub REST API.
const FINNHUB_BASE_URL: &str = "https://finnhub.io/api/v1";

/// Finnhub data provider.
///
/// Provides access to:
/// - Symbol lookup (`/search`)
/// - Peer companies by GICS sub-industry (`/stock/peers`)
#[derive(Clone)]
pub struct FinnhubProvider {
    client: Client,
    api_key: String,
}

impl fmt::Debug for FinnhubProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FinnhubProvider")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl FinnhubProvider {
    /// Create a new Finnhub provider with the given API key.
    #[must_use]
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
        }
    }

    /// Create a new Finnhub provider with a custom HTTP client.
    #[must_use]
    pub fn with_client(client: Client, api_key: impl Into<String>) -> Self {
        Self {
            client,
            api_key: api_key.into(),
        }
    }

    /// Build a URL with the API token appended.
    fn url(&self, endpoint: &str) -> String {
        if endpoint.contains('?') {
            format!("{FINNHUB_BASE_URL}/{endpoint}&token={}", self.api_key)
        } else {
            format!("{FINNHUB_BASE_URL}/{endpoint}?token={}", self.api_key)
        }
    }

    /// Make a GET request and parse the JSON response.
    async fn get<T: serde::de::DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let url = self.url(endpoint);
        debug!("Finnhub request: {}", endpoint);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResearchError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ResearchError::RateLimited {
                provider: "Finnhub".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::UNAUTHORIZED
            || response.status() == reqwest::StatusCode::FORBIDDEN
        {
            return Err(ResearchError::MissingCredential(
                "FINNHUB_API_KEY rejected by Finnhub".to_string(),
            ));
        }

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(ResearchError::Network(format!("HTTP {status}: {text}")));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| ResearchError::Parse(e.to_string()))
    }
}

impl ResearchProvider for FinnhubProvider {
    fn name(&self) -> &str {
        "Finnhub"
    }

    fn description(&self) -> &str {
        "Finnhub provider for symbol search and GICS sub-industry peer discovery"
    }
}

#[async_trait]
impl SymbolSearchProvider for FinnhubProvider {
    async fn search(&self, query: &str, limit: usize) -> Result<Vec<TickerMatch>> {
        let endpoint = format!("search?q={}", urlencode(query));
        let response: SearchResponse = self.get(&endpoint).await?;

        let matches: Vec<TickerMatch> = response
            .result
            .into_iter()
            .take(limit)
            .map(|item| TickerMatch {
                symbol: Symbol::new(item.symbol),
                name: item.description,
                exchange: item.display_symbol,
                asset_type: item.kind,
                mic: item.mic,
                currency: None,
            })
            .collect();

        debug!("Finnhub search returned {} matches", matches.len());
        Ok(matches)
    }
}

#[async_trait]
impl PeerDataProvider for FinnhubProvider {
    async fn peers(&self, symbol: &Symbol) -> Result<Vec<Symbol>> {
        let endpoint = format!("stock/peers?symbol={}", symbol.as_str());
        let peers: Vec<String> = self.get(&endpoint).await?;

        // Finnhub includes the target symbol in its own peer list
        let peers: Vec<Symbol> = peers
            .into_iter()
            .map(Symbol::new)
            .filter(|peer| peer != symbol)
            .collect();

        debug!("Finnhub returned {} peers for {}", peers.len(), symbol);
        Ok(peers)
    }
}

/// Minimal percent-encoding for query strings.
fn urlencode(s: &str) -> String {
    s.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '~') {
                c.to_string()
            } else {
                c.to_string()
                    .bytes()
                    .map(|b| format!("%{b:02X}"))
                    .collect()
            }
        })
        .collect()
}

// ============================================================================
// Finnhub API Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    result: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchItem {
    symbol: String,
    description: Option<String>,
    display_symbol: Option<String>,
    #[serde(rename = "type")]
    kind: Option<String>,
    mic: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_info() {
        let provider = FinnhubProvider::new("test-key");
        assert_eq!(provider.name(), "Finnhub");
        assert!(provider.description().contains("peer"));
    }

    #[test]
    fn test_debug_redacts_api_key() {
        let provider = FinnhubProvider::new("super-secret");
        let debug = format!("{provider:?}");
        assert!(!debug.contains("super-secret"));
        assert!(debug.contains("REDACTED"));
    }

    #[test]
    fn test_url_builder() {
        let provider = FinnhubProvider::new("abc");
        assert_eq!(
            provider.url("stock/peers?symbol=INTC"),
            "https://finnhub.io/api/v1/stock/peers?symbol=INTC&token=abc"
        );
        assert_eq!(
            provider.url("quote"),
            "https://finnhub.io/api/v1/quote?token=abc"
        );
    }

    #[test]
    fn test_urlencode() {
        assert_eq!(urlencode("Apple Inc"), "Apple%20Inc");
        assert_eq!(urlencode("BRK.B"), "BRK.B");
    }

    #[test]
    fn test_search_response_parsing() {
        let json = r#"{
            "count": 1,
            "result": [
                {"symbol": "AVGO", "description": "BROADCOM INC", "displaySymbol": "AVGO", "type": "Common Stock"}
            ]
        }"#;
        let parsed: SearchResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.result.len(), 1);
        assert_eq!(parsed.result[0].symbol, "AVGO");
    }
}
