//! Core error types for commutewise-core.
//!
//! Terminal failures of an analysis or a proxied request each get their own
//! variant so callers can pick distinct remediation copy. Per-call provider
//! failures live in [`ProviderError`] and are normally absorbed by the
//! orchestrator rather than propagated.

use std::path::PathBuf;
use thiserror::Error;

use crate::governor::Denial;

/// Core error type for commutewise-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// The window ends before it starts.
    #[error("Invalid time window: end ({end}) is before start ({start})")]
    InvalidWindow { start: String, end: String },

    /// The sampling interval is not a positive number of minutes.
    #[error("Invalid sampling interval: {0} minutes (must be at least 1)")]
    InvalidInterval(u32),

    /// Every slot in the window is already in the past for the chosen date.
    #[error("All departure times in the {period} window ({window}) on {date} have already passed")]
    NoFutureSlots {
        period: String,
        window: String,
        date: chrono::NaiveDate,
    },

    /// The batch finished with zero usable slots.
    #[error("Could not get travel times for any departure: {cause}")]
    AllSlotsFailed { cause: String },

    /// The request governor refused the call.
    #[error("{0}")]
    GovernorDenied(Denial),

    /// The proxy's governor refused a call mid-batch; the batch was stopped.
    #[error("Rate limited by the travel time proxy: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A single provider call failed outside of a batch.
    #[error("Travel time provider error: {0}")]
    Provider(#[from] ProviderError),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl CoreError {
    /// True when the failure means there was nothing to analyze, as opposed
    /// to the provider being unreachable.
    pub fn is_nothing_to_analyze(&self) -> bool {
        matches!(
            self,
            CoreError::NoFutureSlots { .. }
                | CoreError::InvalidWindow { .. }
                | CoreError::InvalidInterval(_)
        )
    }
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Missing required configuration key
    #[error("Missing required configuration key: {0}")]
    MissingKey(String),

    /// Failed to parse configuration
    #[error("Failed to parse configuration: {0}")]
    ParseFailed(String),
}

/// Errors returned by a [`TravelTimeProvider`](crate::provider::TravelTimeProvider).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// No route exists between origin and destination.
    #[error("No route found: {0}")]
    NoRoute(String),

    /// The provider refused the credential or the request.
    #[error("Request denied by travel time service: {0}")]
    Denied(String),

    /// Any other non-OK provider status, or a 400 from the proxy.
    #[error("Travel time service rejected the request ({status}): {message}")]
    Rejected { status: String, message: String },

    /// The proxy's request governor refused the call.
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after_secs: Option<u64>,
    },

    /// The proxy or upstream failed unexpectedly.
    #[error("Travel time service error: {0}")]
    Server(String),

    /// The request never got a response.
    #[error("Could not reach travel time service: {0}")]
    Transport(String),

    /// A response arrived but could not be understood.
    #[error("Unexpected response from travel time service: {0}")]
    Malformed(String),
}

impl ProviderError {
    pub fn is_no_route(&self) -> bool {
        matches!(self, ProviderError::NoRoute(_))
    }

    pub fn is_denied(&self) -> bool {
        matches!(self, ProviderError::Denied(_))
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ProviderError::RateLimited { .. })
    }

    /// Whether the failure happened on the client side of the wire or in the
    /// service itself, rather than being a verdict about the request.
    pub fn is_unexpected(&self) -> bool {
        matches!(
            self,
            ProviderError::Server(_) | ProviderError::Transport(_) | ProviderError::Malformed(_)
        )
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ProviderError::Malformed(err.to_string())
        } else {
            ProviderError::Transport(err.to_string())
        }
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(err: toml::de::Error) -> Self {
        ConfigError::ParseFailed(err.to_string())
    }
}

/// Result type alias for CoreError
pub type Result<T, E = CoreError> = std::result::Result<T, E>;
