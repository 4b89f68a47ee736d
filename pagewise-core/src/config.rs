//! Configuration types

use crate::*;
use serde::{Deserialize, Serialize};
use std::num::NonZeroU64;

/// Environment variable consulted by [`LoaderConfig::from_env`].
pub const DELEGATE_FETCH_LIMIT_ENV: &str = "PAGEWISE_DELEGATE_FETCH_LIMIT";

/// Loader configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoaderConfig {
    /// Maximum number of records requested from a delegate in one fetch call.
    pub delegate_fetch_limit: u64,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            delegate_fetch_limit: 1000,
        }
    }
}

impl LoaderConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the delegate fetch limit.
    pub fn with_delegate_fetch_limit(mut self, limit: u64) -> Self {
        self.delegate_fetch_limit = limit;
        self
    }

    /// Create from environment variables with fallback to defaults.
    ///
    /// Environment variables:
    /// - `PAGEWISE_DELEGATE_FETCH_LIMIT`: per-call delegate fetch limit (default: 1000)
    pub fn from_env() -> Self {
        let defaults = Self::default();

        Self {
            delegate_fetch_limit: std::env::var(DELEGATE_FETCH_LIMIT_ENV)
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(defaults.delegate_fetch_limit),
        }
    }

    /// Validate the configuration.
    /// Returns the fetch limit as a `NonZeroU64` on success.
    pub fn validate(&self) -> LoaderResult<NonZeroU64> {
        validate_fetch_limit(self.delegate_fetch_limit)
    }
}

/// Reject a zero fetch limit.
pub fn validate_fetch_limit(limit: u64) -> LoaderResult<NonZeroU64> {
    NonZeroU64::new(limit).ok_or_else(|| {
        LoaderError::Config(ConfigError::InvalidValue {
            field: "delegate_fetch_limit".to_string(),
            value: limit.to_string(),
            reason: "delegate_fetch_limit must be at least 1".to_string(),
        })
    })
}

// =============================================================================
// TESTS
// =============================================================================
