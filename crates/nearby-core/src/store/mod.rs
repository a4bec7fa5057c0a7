//! Cache store: key-versioned response cache.
//!
//! A store holds any number of generations, each addressed by its version
//! string and mapping request identities to response snapshots:
//!
//! ```text
//! generation version -> (request identity -> response snapshot)
//! ```
//!
//! Two implementations are provided:
//! - `MemoryCacheStore`: process-local, used by tests and short-lived hosts
//! - `DiskCacheStore`: one JSON file per generation, survives restarts

pub mod disk;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::OfflineResult;
use crate::http::{RequestKey, Response};

pub use disk::DiskCacheStore;
pub use memory::MemoryCacheStore;

/// A stored `(request identity -> response snapshot)` pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: RequestKey,
    pub response: Response,
    pub cached_at: DateTime<Utc>,
}

impl CacheEntry {
    pub fn new(key: RequestKey, response: Response) -> Self {
        Self {
            key,
            response,
            cached_at: Utc::now(),
        }
    }
}

/// Storage backend for cache generations.
///
/// Implementations are internally synchronized. Callers always pass the
/// generation version explicitly; there is no notion of a "current" cache at
/// this level.
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Open a generation, creating it empty if absent.
    async fn open(&self, generation: &str) -> OfflineResult<()>;

    /// Store every entry in one commit, creating the generation if absent.
    /// Either all entries become visible or none do.
    async fn put_all(&self, generation: &str, entries: Vec<CacheEntry>) -> OfflineResult<()>;

    /// Look up a request in one generation. An absent generation is a miss.
    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> OfflineResult<Option<Response>>;

    /// All generation versions currently in the store, sorted.
    async fn keys(&self) -> OfflineResult<Vec<String>>;

    /// Delete a generation and all its entries. Returns false if it was absent.
    async fn delete(&self, generation: &str) -> OfflineResult<bool>;

    /// Request identities stored in a generation (empty if absent), sorted.
    async fn entries(&self, generation: &str) -> OfflineResult<Vec<RequestKey>>;

    async fn has(&self, generation: &str) -> OfflineResult<bool> {
        Ok(self.keys().await?.iter().any(|k| k == generation))
    }
}
