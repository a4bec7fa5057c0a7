//! Error types for the offline cache layer.
//!
//! Every fallible operation in this crate returns `OfflineResult<T>`.
//! Errors stay local to the operation that produced them; the manager
//! reports them on that operation's result and keeps running.

use thiserror::Error;

use crate::worker::GenerationState;

pub type OfflineResult<T> = Result<T, OfflineError>;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Network error fetching {url}: {reason}")]
    Network { url: String, reason: String },

    #[error("Bad response for {url}: status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("Failed to populate cache generation {version}: {source}")]
    Population {
        version: String,
        #[source]
        source: Box<OfflineError>,
    },

    #[error("Invalid lifecycle transition for {version}: {from} -> {to}")]
    InvalidTransition {
        version: String,
        from: GenerationState,
        to: GenerationState,
    },

    #[error("Invalid asset manifest: {0}")]
    Manifest(String),

    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Cache store error: {0}")]
    Store(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl OfflineError {
    pub fn network(url: impl Into<String>, reason: impl ToString) -> Self {
        OfflineError::Network {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// True for failures of the network fetch primitive itself.
    pub fn is_network(&self) -> bool {
        matches!(self, OfflineError::Network { .. })
    }
}
