//! Error types for research operations.
//!
//! This module defines [`ResearchError`] which covers all error cases that can
//! occur while sourcing data from providers or orchestrating a research run.

use thiserror::Error;

/// Errors that can occur during research operations.
#[derive(Error, Debug)]
pub enum ResearchError {
    /// Network-related errors (connection failures, HTTP errors, etc.).
    #[error("Network error: {0}")]
    Network(String),

    /// Rate limit exceeded by a provider.
    #[error("Rate limited by {provider}: retry after {retry_after:?}")]
    RateLimited {
        /// The provider that rate limited the request.
        provider: String,
        /// Suggested time to wait before retrying.
        retry_after: Option<std::time::Duration>,
    },

    /// The requested symbol was not found by any provider.
    #[error("Symbol not found: {0}")]
    SymbolNotFound(String),

    /// A credential required by a provider or phase is absent from the environment.
    #[error("Missing credential: {0}")]
    MissingCredential(String),

    /// Error parsing data from a provider.
    #[error("Parse error: {0}")]
    Parse(String),

    /// A phase name outside the known phase set was requested.
    #[error("Unknown phase: {0}")]
    InvalidPhase(String),

    /// The requested lookup is not supported by this provider.
    #[error("Not supported: {0}")]
    NotSupported(String),

    /// Filesystem error while persisting or reading run state.
    #[error("I/O error: {0}")]
    Io(String),

    /// Any other error.
    #[error("{0}")]
    Other(String),
}

impl ResearchError {
    /// Returns true if this error came from a provider rate limit.
    ///
    /// Rate-limited attempts are logged distinctly by the fallback resolver but
    /// still count as terminal failures for the attempt.
    #[must_use]
    pub const fn is_rate_limit(&self) -> bool {
        matches!(self, Self::RateLimited { .. })
    }
}

/// Result type alias using [`ResearchError`].
pub type Result<T> = std::result::Result<T, ResearchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_limit_classification() {
        let err = ResearchError::RateLimited {
            provider: "Finnhub".to_string(),
            retry_after: None,
        };
        assert!(err.is_rate_limit());
        assert!(!ResearchError::Network("timeout".to_string()).is_rate_limit());
    }

    #[test]
    fn test_error_display() {
        let err = ResearchError::MissingCredential("FINNHUB_API_KEY".to_string());
        assert_eq!(err.to_string(), "Missing credential: FINNHUB_API_KEY");
    }
}
