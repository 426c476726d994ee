//! Error types for the expense ledger bot

use thiserror::Error;

/// Result type alias for ledger operations
pub type Result<T> = std::result::Result<T, BotError>;

#[derive(Error, Debug)]
pub enum BotError {

    // =============================
    // Core Pipeline Errors
    // =============================

    /// Transient failure reaching the tabular service. Store operations
    /// reconnect and retry once before letting this escape.
    #[error("store connectivity error: {0}")]
    Connectivity(String),

    #[error("backend error: {0}")]
    Backend(String),

    #[error("schema resolution error: {0}")]
    Schema(String),

    #[error("configuration error: {0}")]
    Config(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
