//! Decoy-Cloner: a recursive website cloner
//!
//! This crate crawls a seed URL up to a bounded depth, fetches every in-scope page
//! either through a plain HTTP client or a headless browser render, and writes each
//! page to a unique directory on disk so that a decoy web server can replay it later.

pub mod config;
pub mod crawler;
pub mod output;
pub mod state;
pub mod storage;
pub mod url;
pub mod validate;

use thiserror::Error;

/// Main error type for Decoy-Cloner operations
#[derive(Debug, Error)]
pub enum CloneError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The abstract fetch capability was invoked directly
    #[error("fetch_data is not implemented by the {backend} backend")]
    NotImplemented { backend: &'static str },

    #[error("Browser error: {0}")]
    Browser(#[from] crawler::BrowserError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    StorageError(#[from] storage::StorageError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("URL parse error: {0}")]
    UrlParse(#[from] ::url::ParseError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

impl CloneError {
    /// Returns true for wiring bugs that must never be treated as a transient failure
    pub fn is_contract_violation(&self) -> bool {
        matches!(self, Self::NotImplemented { .. })
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain pattern: {0}")]
    InvalidPattern(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Malformed URL: {0}")]
    Malformed(String),
}

/// Result type alias for Decoy-Cloner operations
pub type Result<T> = std::result::Result<T, CloneError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

// Re-export commonly used types
pub use config::Config;
pub use crawler::{CloneReport, Cloner};
pub use state::{PageState, VisitedSet};
pub use crate::url::{extract_domain, normalize_url, LinkScope};
