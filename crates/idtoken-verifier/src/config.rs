//! Verifier configuration loaded from environment variables.

use std::env;
use std::time::Duration;

use idtoken_client::fetcher::DEFAULT_FRESHNESS_MARGIN;
use idtoken_core::token::DEFAULT_TRUSTED_DOMAIN;
use thiserror::Error;

/// Errors during configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable is set but cannot be parsed.
    #[error("invalid value '{value}' for environment variable {var}")]
    Invalid {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Identity verifier runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifierConfig {
    /// Domain suffix certificate hosts must belong to (e.g. `apple.com`).
    pub trusted_domain: String,
    /// Margin subtracted from the origin's `max-age` before caching.
    pub cache_margin: Duration,
    /// Optional bound on each certificate request.
    pub fetch_timeout: Option<Duration>,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            trusted_domain: DEFAULT_TRUSTED_DOMAIN.to_owned(),
            cache_margin: DEFAULT_FRESHNESS_MARGIN,
            fetch_timeout: None,
        }
    }
}

impl VerifierConfig {
    /// Load configuration from environment variables.
    ///
    /// `IDTOKEN_TRUSTED_DOMAIN`, `IDTOKEN_CACHE_MARGIN_MS` and
    /// `IDTOKEN_FETCH_TIMEOUT_MS` are all optional.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if a millisecond value is not an integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            trusted_domain: lookup("IDTOKEN_TRUSTED_DOMAIN").unwrap_or(defaults.trusted_domain),
            cache_margin: millis(&lookup, "IDTOKEN_CACHE_MARGIN_MS")?
                .unwrap_or(defaults.cache_margin),
            fetch_timeout: millis(&lookup, "IDTOKEN_FETCH_TIMEOUT_MS")?,
        })
    }
}

fn millis(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    lookup(var)
        .map(|value| {
            value
                .trim()
                .parse()
                .map(Duration::from_millis)
                .map_err(|_| ConfigError::Invalid { var, value })
        })
        .transpose()
}
