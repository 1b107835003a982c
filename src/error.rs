//! Error types for the reading engine.
//!
//! Parsing and cache lookups never fail (they degrade to defaults), so the
//! types here only cover the operations whose callers must inspect the
//! outcome: server round-trips, mark-done, term saves, configuration and
//! the persisted store.

use thiserror::Error;

/// Failure of a single call to the reading server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ServerError {
    /// The request never got a response (connection, DNS, timeout).
    #[error("network error: {0}")]
    Network(String),

    /// The server answered with a non-success status.
    #[error("server rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
}

impl ServerError {
    /// Only transient connectivity failures are worth another attempt.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ServerError::Network(_))
    }
}

/// Mark-done failed and the page was not advanced.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("marking page {page_num} done failed after {attempts} attempt(s): {source}")]
pub struct SyncError {
    pub page_num: u32,
    pub attempts: u32,
    #[source]
    pub source: ServerError,
}

#[derive(Debug, Error)]
pub enum SaveTermError {
    #[error("term {0} has no id; nothing to save")]
    MissingTermId(u64),

    #[error("saving term {term_id} failed: {source}")]
    Server {
        term_id: u64,
        #[source]
        source: ServerError,
    },
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to (de)serialize store data: {0}")]
    Serde(#[from] serde_json::Error),
}
