//! Error types for scribe

use thiserror::Error;

/// Result type alias using scribe's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// All possible errors in scribe
#[derive(Error, Debug)]
pub enum Error {
    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Provider not configured: {0}")]
    ProviderNotConfigured(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
