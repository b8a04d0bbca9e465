//! Store error types

use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Store-related errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Object or bucket does not exist
    #[error("Not found: {0}")]
    NotFound(String),

    /// Conditional write rejected because another writer committed first
    #[error("Generation mismatch for {url}: local={expected}, remote={actual}")]
    GenerationMismatch {
        url: String,
        expected: u64,
        actual: u64,
    },

    /// URL could not be parsed into bucket and path
    #[error("Invalid store URL: {0}")]
    InvalidUrl(String),

    /// Object content is not valid UTF-8
    #[error("Failed to decode {url}: {reason}")]
    Decode { url: String, reason: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Whether this is the optimistic-concurrency rejection
    pub fn is_generation_mismatch(&self) -> bool {
        matches!(self, Self::GenerationMismatch { .. })
    }
}

/// Errors raised while fetching a resource to local disk
#[derive(Debug, Error)]
pub enum DownloadError {
    /// Failure from the backing store
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Server answered with a non-success status
    #[error("HTTP {status} fetching {url}")]
    HttpStatus { url: String, status: u16 },

    /// Transport-level HTTP error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error writing the artifact
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// No downloader handles this URL
    #[error("Unsupported URL scheme: {0}")]
    UnsupportedScheme(String),
}
