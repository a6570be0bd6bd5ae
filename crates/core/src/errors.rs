//! Error types for the deploy-notify core library.
//!
//! Each subsystem has its own error type derived with `thiserror`; binaries
//! wrap them in `anyhow` at the top level.

use thiserror::Error;

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

/// Errors from configuration loading and validation.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Config file not found.
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    /// TOML parse error.
    #[error("configuration parse error: {0}")]
    ParseError(String),

    /// A config value is invalid.
    #[error("invalid configuration value for '{field}': {detail}")]
    InvalidValue {
        field: String,
        detail: String,
    },

    /// Generic I/O error reading the config file.
    #[error("configuration I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// State store errors
// ---------------------------------------------------------------------------

/// Errors from the persisted dedup-state layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying rusqlite error.
    #[error("state store error: {0}")]
    SqliteError(#[from] rusqlite::Error),

    /// The stored record could not be decoded.
    #[error("corrupt state record: {0}")]
    CorruptRecord(String),

    /// The record could not be encoded for storage.
    #[error("state serialization error: {0}")]
    SerializeError(#[from] serde_json::Error),

    /// Generic I/O error (e.g. file permissions).
    #[error("state store I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

// ---------------------------------------------------------------------------
// Notification channel errors
// ---------------------------------------------------------------------------

/// Errors from the notification channel (Telegram).
#[derive(Debug, Error)]
pub enum ChannelError {
    /// HTTP-level transport error (network, TLS, etc.).
    #[error("notification HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// The chat API returned a non-success status code.
    #[error("Telegram API error (HTTP {status}): {body}")]
    ApiError {
        status: u16,
        body: String,
    },

    /// The chat API answered 2xx but flagged the call as failed.
    #[error("Telegram API rejected the message: {0}")]
    Rejected(String),
}
