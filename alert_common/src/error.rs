//! Error types shared by the scanner components.
//!
//! The `AlertError` enum unifies the failure cases of every stage of a scan:
//! configuration, broker login and fetches, chat delivery, and the snapshot log.
//! Only `Config` is fatal; the orchestrator logs and skips everything else.
use std::io;

use thiserror::Error;

/// Startup configuration problems. Each maps to a distinct process exit code.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A credential the live broker needs was not provided.
    #[error("Missing required credential: {0}")]
    MissingCredential(&'static str),

    /// The configured broker client shape is not available in this build.
    #[error("Broker client unavailable: {0}")]
    BrokerUnavailable(String),

    /// A configuration value could not be parsed.
    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid {
        /// Environment key or flag that carried the value.
        key: &'static str,
        /// Human-readable parse failure.
        reason: String,
    },
}

impl ConfigError {
    /// Process exit code reported for this configuration failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            ConfigError::MissingCredential(_) => 2,
            ConfigError::BrokerUnavailable(_) => 3,
            ConfigError::Invalid { .. } => 1,
        }
    }
}

/// Unified error type for the scanner.
#[derive(Error, Debug)]
pub enum AlertError {
    /// Fatal startup configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Broker login was rejected or could not be performed.
    #[error("Auth error: {0}")]
    Auth(String),

    /// A broker data call failed for one symbol.
    #[error("Fetch error for {symbol} via {operation}: {message}")]
    Fetch {
        /// Symbol being fetched.
        symbol: String,
        /// Broker operation that was attempted.
        operation: String,
        /// Raw error text.
        message: String,
    },

    /// Chat delivery failed.
    #[error("Notify error: {0}")]
    Notify(String),

    /// The snapshot log could not be opened or written.
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    /// HTTP transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Failure while encoding/decoding JSON via serde_json.
    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Filesystem error while locating the snapshot log.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Generic formatting/validation error with a human-readable message.
    #[error("Format error: {0}")]
    Format(String),
}

impl AlertError {
    /// Build a `Fetch` error with symbol and operation context.
    pub fn fetch(symbol: &str, operation: &str, message: impl Into<String>) -> Self {
        AlertError::Fetch {
            symbol: symbol.to_string(),
            operation: operation.to_string(),
            message: message.into(),
        }
    }
}
