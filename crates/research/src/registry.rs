//! Provider registry with ordered fallback resolution.
//!
//! Providers of the same kind form a fallback chain: they are tried strictly
//! in registration order, each gets exactly one attempt per resolution, and
//! the first non-empty success wins. Every attempt's error is kept so an
//! exhausted chain can report what each vendor said.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, warn};

use research_core::{
    CompanyOverview, CompanyOverviewProvider, PeerDataProvider, Result, Symbol,
    SymbolSearchProvider, TickerMatch,
};

/// Sentinel provider name returned when every provider in a chain failed.
pub const NO_PROVIDER: &str = "none";

/// Outcome of walking one fallback chain.
///
/// `errors` has one entry per provider attempted: `None` for the provider
/// that succeeded, an error string for each one that failed before it.
/// Providers after the winning one are never attempted and never appear.
#[derive(Clone, Debug)]
pub struct Resolution<T> {
    /// Items returned by the winning provider; empty when the chain was exhausted.
    pub items: Vec<T>,
    /// Name of the provider that succeeded, or [`NO_PROVIDER`].
    pub provider: String,
    /// Per-provider attempt outcomes, in provider name order.
    pub errors: BTreeMap<String, Option<String>>,
}

impl<T> Resolution<T> {
    /// Returns true if some provider in the chain succeeded.
    #[must_use]
    pub fn resolved(&self) -> bool {
        self.provider != NO_PROVIDER
    }

    /// Formats the per-provider errors for a diagnostic message.
    #[must_use]
    pub fn describe_errors(&self) -> String {
        self.errors
            .iter()
            .filter_map(|(provider, error)| error.as_ref().map(|e| format!("{provider}: {e}")))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Walks a fallback chain: one attempt per provider, strict order, first
/// non-empty success short-circuits. An `Ok` with zero items counts as a
/// failed attempt even though the provider raised no error.
async fn resolve_chain<T>(attempts: Vec<(String, BoxFuture<'_, Result<Vec<T>>>)>) -> Resolution<T> {
    let total = attempts.len();
    let mut errors = BTreeMap::new();

    for (index, (name, attempt)) in attempts.into_iter().enumerate() {
        debug!(provider = %name, "Trying provider {}/{}", index + 1, total);

        match attempt.await {
            Ok(items) if !items.is_empty() => {
                debug!(provider = %name, count = items.len(), "Provider succeeded");
                errors.insert(name.clone(), None);
                return Resolution {
                    items,
                    provider: name,
                    errors,
                };
            }
            Ok(_) => {
                warn!(provider = %name, "Provider returned an empty result, trying next");
                errors.insert(name, Some("returned empty result".to_string()));
            }
            Err(e) if e.is_rate_limit() => {
                warn!(provider = %name, error = %e, "Provider rate limited, trying next");
                errors.insert(name, Some(e.to_string()));
            }
            Err(e) => {
                warn!(provider = %name, error = %e, "Provider failed, trying next");
                errors.insert(name, Some(e.to_string()));
            }
        }
    }

    Resolution {
        items: Vec::new(),
        provider: NO_PROVIDER.to_string(),
        errors,
    }
}

/// Registry of data providers arranged into fallback chains.
///
/// # Example
///
/// ```rust,ignore
/// use research::ProviderRegistry;
///
/// let registry = ProviderRegistry::new()
///     .with_yahoo()
///     .with_finnhub("finnhub_key")
///     .with_fmp("fmp_key");
///
/// let lookup = registry.search_ticker("AVGO", 5).await;
/// let peers = registry.peers(&"AVGO".into()).await;
/// ```
#[derive(Default)]
pub struct ProviderRegistry {
    search_providers: Vec<Arc<dyn SymbolSearchProvider>>,
    peer_providers: Vec<Arc<dyn PeerDataProvider>>,
    overview_providers: Vec<Arc<dyn CompanyOverviewProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field(
                "search_providers",
                &self
                    .search_providers
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "peer_providers",
                &self
                    .peer_providers
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .field(
                "overview_providers",
                &self
                    .overview_providers
                    .iter()
                    .map(|p| p.name())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl ProviderRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a symbol search provider at the end of the search chain.
    pub fn register_search(&mut self, provider: Arc<dyn SymbolSearchProvider>) {
        debug!(provider = provider.name(), "Registering search provider");
        self.search_providers.push(provider);
    }

    /// Register a peer data provider at the end of the peer chain.
    pub fn register_peer(&mut self, provider: Arc<dyn PeerDataProvider>) {
        debug!(provider = provider.name(), "Registering peer provider");
        self.peer_providers.push(provider);
    }

    /// Register a company overview provider at the end of the overview chain.
    pub fn register_overview(&mut self, provider: Arc<dyn CompanyOverviewProvider>) {
        debug!(provider = provider.name(), "Registering overview provider");
        self.overview_providers.push(provider);
    }

    /// Returns true if at least one search provider is registered.
    #[must_use]
    pub fn has_search_providers(&self) -> bool {
        !self.search_providers.is_empty()
    }

    /// Returns true if at least one peer provider is registered.
    #[must_use]
    pub fn has_peer_providers(&self) -> bool {
        !self.peer_providers.is_empty()
    }

    /// Returns true if at least one overview provider is registered.
    #[must_use]
    pub fn has_overview_providers(&self) -> bool {
        !self.overview_providers.is_empty()
    }

    /// Resolves a ticker search through the search fallback chain.
    pub async fn search_ticker(&self, query: &str, limit: usize) -> Resolution<TickerMatch> {
        let attempts = self
            .search_providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let query = query.to_string();
                (
                    provider.name().to_string(),
                    async move { provider.search(&query, limit).await }.boxed(),
                )
            })
            .collect();
        resolve_chain(attempts).await
    }

    /// Resolves peer discovery through the peer fallback chain.
    pub async fn peers(&self, symbol: &Symbol) -> Resolution<Symbol> {
        let attempts = self
            .peer_providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let symbol = symbol.clone();
                (
                    provider.name().to_string(),
                    async move { provider.peers(&symbol).await }.boxed(),
                )
            })
            .collect();
        resolve_chain(attempts).await
    }

    /// Resolves a company overview through the overview fallback chain.
    pub async fn company_overview(&self, symbol: &Symbol) -> Resolution<CompanyOverview> {
        let attempts = self
            .overview_providers
            .iter()
            .map(|provider| {
                let provider = Arc::clone(provider);
                let symbol = symbol.clone();
                (
                    provider.name().to_string(),
                    async move { provider.overview(&symbol).await.map(|o| vec![o]) }.boxed(),
                )
            })
            .collect();
        resolve_chain(attempts).await
    }

    // Builder methods for easy setup with specific providers

    /// Add the Yahoo Finance provider (symbol validation, company overviews).
    #[cfg(feature = "yahoo")]
    #[must_use]
    pub fn with_yahoo(mut self) -> Self {
        let provider = Arc::new(research_yahoo::YahooProvider::new());
        self.register_search(provider.clone());
        self.register_overview(provider);
        self
    }

    /// Add the Finnhub provider (symbol search, peer discovery).
    #[cfg(feature = "finnhub")]
    #[must_use]
    pub fn with_finnhub(mut self, api_key: &str) -> Self {
        let provider = Arc::new(research_finnhub::FinnhubProvider::new(api_key));
        self.register_search(provider.clone());
        self.register_peer(provider);
        self
    }

    /// Add the Financial Modeling Prep provider (search, peers, profiles).
    #[cfg(feature = "fmp")]
    #[must_use]
    pub fn with_fmp(mut self, api_key: &str) -> Self {
        let provider = Arc::new(research_fmp::FmpProvider::new(api_key));
        self.register_search(provider.clone());
        self.register_peer(provider.clone());
        self.register_overview(provider);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use research_core::{ResearchError, ResearchProvider};
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    enum StubBehavior {
        Hits(usize),
        Empty,
        Fail(&'static str),
        RateLimit,
    }

    #[derive(Debug)]
    struct StubProvider {
        name: &'static str,
        behavior: StubBehavior,
        calls: AtomicUsize,
    }

    impl StubProvider {
        fn new(name: &'static str, behavior: StubBehavior) -> Arc<Self> {
            Arc::new(Self {
                name,
                behavior,
                calls: AtomicUsize::new(0),
            })
        }

        fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn respond<T>(&self, make: impl Fn(usize) -> T) -> Result<Vec<T>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            match &self.behavior {
                StubBehavior::Hits(n) => Ok((0..*n).map(make).collect()),
                StubBehavior::Empty => Ok(Vec::new()),
                StubBehavior::Fail(msg) => Err(ResearchError::Network((*msg).to_string())),
                StubBehavior::RateLimit => Err(ResearchError::RateLimited {
                    provider: self.name.to_string(),
                    retry_after: None,
                }),
            }
        }
    }

    impl ResearchProvider for StubProvider {
        fn name(&self) -> &str {
            self.name
        }

        fn description(&self) -> &str {
            "stub"
        }
    }

    #[async_trait]
    impl SymbolSearchProvider for StubProvider {
        async fn search(&self, query: &str, _limit: usize) -> Result<Vec<TickerMatch>> {
            let query = query.to_string();
            self.respond(move |_| TickerMatch::new(Symbol::new(query.clone())))
        }
    }

    #[async_trait]
    impl PeerDataProvider for StubProvider {
        async fn peers(&self, _symbol: &Symbol) -> Result<Vec<Symbol>> {
            self.respond(|i| Symbol::new(format!("PEER{i}")))
        }
    }

    #[tokio::test]
    async fn test_first_success_short_circuits() {
        let first = StubProvider::new("first", StubBehavior::Hits(1));
        let second = StubProvider::new("second", StubBehavior::Hits(3));
        let mut registry = ProviderRegistry::new();
        registry.register_search(first.clone());
        registry.register_search(second.clone());

        let resolution = registry.search_ticker("TSLA", 5).await;

        assert!(resolution.resolved());
        assert_eq!(resolution.provider, "first");
        assert_eq!(resolution.items.len(), 1);
        assert_eq!(first.call_count(), 1);
        assert_eq!(second.call_count(), 0, "later providers must not be invoked");
        assert_eq!(resolution.errors.len(), 1);
        assert_eq!(resolution.errors["first"], None);
    }

    #[tokio::test]
    async fn test_exhausted_chain_yields_sentinel_and_full_error_map() {
        let a = StubProvider::new("alpha", StubBehavior::Fail("boom"));
        let b = StubProvider::new("beta", StubBehavior::RateLimit);
        let c = StubProvider::new("gamma", StubBehavior::Empty);
        let mut registry = ProviderRegistry::new();
        for provider in [a, b, c] {
            registry.register_search(provider);
        }

        let resolution = registry.search_ticker("TSLA", 5).await;

        assert!(!resolution.resolved());
        assert_eq!(resolution.provider, NO_PROVIDER);
        assert!(resolution.items.is_empty());
        assert_eq!(resolution.errors.len(), 3);
        assert!(resolution.errors["alpha"].as_ref().unwrap().contains("boom"));
        assert!(
            resolution.errors["beta"]
                .as_ref()
                .unwrap()
                .contains("Rate limited")
        );
        assert!(
            resolution.errors["gamma"]
                .as_ref()
                .unwrap()
                .contains("empty")
        );
    }

    #[tokio::test]
    async fn test_empty_result_falls_through_to_next_provider() {
        let empty = StubProvider::new("empty", StubBehavior::Empty);
        let full = StubProvider::new("full", StubBehavior::Hits(2));
        let mut registry = ProviderRegistry::new();
        registry.register_search(empty);
        registry.register_search(full);

        let resolution = registry.search_ticker("TSLA", 5).await;

        assert_eq!(resolution.provider, "full");
        assert_eq!(resolution.items.len(), 2);
        // Winner gets a None entry, loser keeps its error string
        assert_eq!(resolution.errors["full"], None);
        assert!(resolution.errors["empty"].is_some());
    }

    #[tokio::test]
    async fn test_peer_chain_uses_same_resolution_algorithm() {
        let down = StubProvider::new("down", StubBehavior::Fail("offline"));
        let up = StubProvider::new("up", StubBehavior::Hits(4));
        let mut registry = ProviderRegistry::new();
        registry.register_peer(down);
        registry.register_peer(up.clone());

        let resolution = registry.peers(&Symbol::new("INTC")).await;

        assert_eq!(resolution.provider, "up");
        assert_eq!(resolution.items.len(), 4);
        assert_eq!(up.call_count(), 1);
    }

    #[tokio::test]
    async fn test_no_providers_resolves_to_sentinel() {
        let registry = ProviderRegistry::new();
        let resolution = registry.search_ticker("TSLA", 5).await;
        assert!(!resolution.resolved());
        assert!(resolution.errors.is_empty());
    }

    #[test]
    fn test_describe_errors_skips_winner() {
        let mut errors = BTreeMap::new();
        errors.insert("alpha".to_string(), Some("boom".to_string()));
        errors.insert("beta".to_string(), None);
        let resolution: Resolution<TickerMatch> = Resolution {
            items: Vec::new(),
            provider: "beta".to_string(),
            errors,
        };
        assert_eq!(resolution.describe_errors(), "alpha: boom");
    }
}
