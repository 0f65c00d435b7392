#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/research/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

//! Yahoo Finance data provider.
//!
//! Yahoo has no public company-name search API, so this provider only
//! validates queries that already look like ticker symbols; anything else is
//! rejected with a descriptive error so the fallback chain can move on to a
//! vendor with real search. It also serves [`CompanyOverview`] snapshots from
//! the quote-summary endpoint.
//!
//! # Example
//!
//! ```rust,ignore
//! use research_yahoo::YahooProvider;
//! use research_core::{SymbolSearchProvider, Symbol};
//!
//! let provider = YahooProvider::new();
//! let matches = provider.search("AVGO", 1).await?;
//! ```

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use research_core::{
    CompanyOverview, CompanyOverviewProvider, ResearchError, ResearchProvider, Result, Symbol,
    SymbolSearchProvider, TickerMatch,
};
use serde::Deserialize;
use tokio::time::sleep;
use tracing::debug;

/// Yahoo Finance quote summary API base URL.
const QUOTE_SUMMARY_URL: &str = "https://query2.finance.yahoo.com/v10/finance/quoteSummary";

/// Default rate limit delay in milliseconds.
const DEFAULT_RATE_LIMIT_MS: u64 = 1000;

/// User agent for HTTP requests.
const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36";

/// Longest query that is still treated as a ticker symbol.
const MAX_SYMBOL_LEN: usize = 5;

/// Yahoo Finance data provider.
///
/// Implements [`SymbolSearchProvider`] (symbol validation only) and
/// [`CompanyOverviewProvider`].
#[derive(Debug)]
pub struct YahooProvider {
    client: reqwest::Client,
    rate_limit_ms: u64,
    last_request_time: AtomicU64,
}

impl YahooProvider {
    /// Create a new Yahoo Finance provider with default settings.
    ///
    /// Uses built-in rate limiting of 1 request per second.
    #[must_use]
    pub fn new() -> Self {
        Self::with_rate_limit(Duration::from_millis(DEFAULT_RATE_LIMIT_MS))
    }

    /// Create a new Yahoo Finance provider with a custom HTTP client.
    ///
    /// Uses the provided client for all HTTP requests. Rate limiting
    /// is still applied.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self {
            client,
            rate_limit_ms: DEFAULT_RATE_LIMIT_MS,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Create a new Yahoo Finance provider with custom rate limiting.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be constructed, which only happens
    /// when the TLS backend is unavailable.
    #[must_use]
    pub fn with_rate_limit(rate_limit: Duration) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            client,
            rate_limit_ms: rate_limit.as_millis() as u64,
            last_request_time: AtomicU64::new(0),
        }
    }

    /// Apply rate limiting before making a request.
    async fn apply_rate_limit(&self) {
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        let last = self.last_request_time.load(Ordering::Relaxed);
        let elapsed = now.saturating_sub(last);

        if elapsed < self.rate_limit_ms {
            let wait_time = self.rate_limit_ms - elapsed;
            debug!("Rate limiting: waiting {}ms", wait_time);
            sleep(Duration::from_millis(wait_time)).await;
        }

        self.last_request_time.store(
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap_or_default()
                .as_millis() as u64,
            Ordering::Relaxed,
        );
    }

    /// Fetch quote summary data for a symbol.
    async fn fetch_quote_summary(&self, symbol: &Symbol) -> Result<QuoteSummaryData> {
        self.apply_rate_limit().await;

        let url = format!(
            "{}/{}?modules=assetProfile,summaryDetail,defaultKeyStatistics,price",
            QUOTE_SUMMARY_URL,
            symbol.as_str()
        );

        debug!("Fetching quote summary: {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ResearchError::Network(e.to_string()))?;

        if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ResearchError::RateLimited {
                provider: "Yahoo Finance".to_string(),
                retry_after: Some(Duration::from_secs(60)),
            });
        }

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(ResearchError::SymbolNotFound(symbol.to_string()));
        }

        if !response.status().is_success() {
            return Err(ResearchError::Network(format!(
                "HTTP {} for {}",
                response.status(),
                symbol
            )));
        }

        let summary: QuoteSummaryResponse = response
            .json()
            .await
            .map_err(|e| ResearchError::Parse(e.to_string()))?;

        summary
            .quote_summary
            .result
            .into_iter()
            .next()
            .ok_or_else(|| ResearchError::SymbolNotFound(symbol.to_string()))
    }
}

impl Default for YahooProvider {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns true if the query plausibly is a ticker symbol rather than a
/// company name. Short, alphabetic, dots allowed (e.g. "BRK.B").
fn looks_like_symbol(query: &str) -> bool {
    let trimmed = query.trim();
    !trimmed.is_empty()
        && trimmed.len() <= MAX_SYMBOL_LEN + 2
        && trimmed
            .chars()
            .filter(|c| *c != '.')
            .all(|c| c.is_ascii_alphabetic())
        && trimmed.chars().filter(|c| *c != '.').count() <= MAX_SYMBOL_LEN
}

impl ResearchProvider for YahooProvider {
    fn name(&self) -> &str {
        "Yahoo Finance"
    }

    fn description(&self) -> &str {
        "Yahoo Finance provider for ticker validation and company overviews"
    }
}

#[async_trait]
impl SymbolSearchProvider for YahooProvider {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<TickerMatch>> {
        if !looks_like_symbol(query) {
            return Err(ResearchError::NotSupported(
                "Yahoo Finance supports symbol validation only, not company name search"
                    .to_string(),
            ));
        }

        let symbol = Symbol::new(query.trim());
        let data = self.fetch_quote_summary(&symbol).await?;

        let price = data.price.unwrap_or_default();

        Ok(vec![TickerMatch {
            symbol: price.symbol.map_or_else(|| symbol.clone(), Symbol::new),
            name: price.long_name.or(price.short_name),
            exchange: price.exchange_name,
            asset_type: price.quote_type,
            mic: None,
            currency: price.currency,
        }])
    }
}

#[async_trait]
impl CompanyOverviewProvider for YahooProvider {
    async fn overview(&self, symbol: &Symbol) -> Result<CompanyOverview> {
        let data = self.fetch_quote_summary(symbol).await?;

        let profile = data.asset_profile.unwrap_or_default();
        let detail = data.summary_detail.unwrap_or_default();
        let stats = data.default_key_statistics.unwrap_or_default();
        let price = data.price.unwrap_or_default();

        Ok(CompanyOverview {
            symbol: symbol.clone(),
            fetched_at: Utc::now(),
            company_name: price.long_name.or(price.short_name),
            sector: profile.sector,
            industry: profile.industry,
            country: profile.country,
            website: profile.website,
            business_summary: profile.long_business_summary,
            employees: profile.full_time_employees,
            market_cap: detail.market_cap.map(RawValue::as_f64),
            trailing_pe: detail.trailing_pe.map(RawValue::as_f64),
            forward_pe: stats.forward_pe.map(RawValue::as_f64),
        })
    }
}

// ============================================================================
// Yahoo Finance API Response Types
// ============================================================================

/// Quote Summary API response.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryResponse {
    quote_summary: QuoteSummaryResult,
}

#[derive(Debug, Deserialize)]
struct QuoteSummaryResult {
    #[serde(default)]
    result: Vec<QuoteSummaryData>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct QuoteSummaryData {
    asset_profile: Option<AssetProfile>,
    summary_detail: Option<SummaryDetail>,
    default_key_statistics: Option<KeyStatistics>,
    price: Option<PriceBlock>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssetProfile {
    sector: Option<String>,
    industry: Option<String>,
    country: Option<String>,
    website: Option<String>,
    long_business_summary: Option<String>,
    full_time_employees: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SummaryDetail {
    market_cap: Option<RawValue>,
    trailing_pe: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct KeyStatistics {
    forward_pe: Option<RawValue>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PriceBlock {
    symbol: Option<String>,
    long_name: Option<String>,
    short_name: Option<String>,
    exchange_name: Option<String>,
    quote_type: Option<String>,
    currency: Option<String>,
}

/// Yahoo wraps numbers as `{"raw": 1.23, "fmt": "1.23"}`.
#[derive(Debug, Default, Deserialize)]
struct RawValue {
    raw: Option<f64>,
}

impl RawValue {
    fn as_f64(self) -> f64 {
        self.raw.unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_info() {
        let provider = YahooProvider::new();
        assert_eq!(provider.name(), "Yahoo Finance");
        assert!(!provider.description().is_empty());
    }

    #[test]
    fn test_default() {
        let provider = YahooProvider::default();
        assert_eq!(provider.name(), "Yahoo Finance");
    }

    #[test]
    fn test_looks_like_symbol() {
        assert!(looks_like_symbol("AVGO"));
        assert!(looks_like_symbol("tsla"));
        assert!(looks_like_symbol("BRK.B"));
        assert!(!looks_like_symbol("Apple Inc"));
        assert!(!looks_like_symbol("Broadcom"));
        assert!(!looks_like_symbol(""));
    }

    #[tokio::test]
    async fn test_name_search_is_rejected_without_network() {
        let provider = YahooProvider::new();
        let err = provider.search("Broadcom Incorporated", 5).await.unwrap_err();
        assert!(matches!(err, ResearchError::NotSupported(_)));
    }

    #[test]
    fn test_raw_value_parsing() {
        let value: RawValue = serde_json::from_str(r#"{"raw": 28.5, "fmt": "28.50"}"#).unwrap();
        assert_eq!(value.as_f64(), 28.5);
    }
}
