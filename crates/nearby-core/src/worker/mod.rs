//! Offline cache worker: generation lifecycle and the cache manager.
//!
//! This module provides:
//! - `GenerationState`: the per-generation lifecycle state machine
//! - `OfflineCacheManager`: install / activate / fetch transition functions

pub mod lifecycle;
pub mod manager;

pub use lifecycle::GenerationState;
pub use manager::{ActivateReport, InstallReport, OfflineCacheManager, Served, Source};
