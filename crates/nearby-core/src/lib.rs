//! Core library for master-nearby.
//!
//! The heart of the crate is the offline asset cache: a versioned cache
//! generation is pre-populated with the application shell, stale
//! generations are evicted on activation, and GET requests are answered
//! cache-first with a network fallback.
//!
//! - `store`: where generations live (memory or disk)
//! - `network`: the fetch primitive
//! - `worker`: lifecycle state machine and `OfflineCacheManager`
//! - `host`: drives the lifecycle and routes client requests
//! - `api`, `models`: the masters search client

pub mod api;
pub mod config;
pub mod error;
pub mod host;
pub mod http;
pub mod models;
pub mod network;
pub mod store;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;

pub use config::{AssetManifest, Config, GenerationConfig};
pub use error::{OfflineError, OfflineResult};
pub use host::{Host, Registration};
pub use http::{Method, Request, RequestKey, Response};
pub use network::{HttpNetwork, Network};
pub use store::{CacheEntry, CacheStore, DiskCacheStore, MemoryCacheStore};
pub use worker::{GenerationState, OfflineCacheManager, Served, Source};
