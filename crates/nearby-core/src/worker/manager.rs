//! The offline cache manager.
//!
//! One manager owns one cache generation. The host calls its transition
//! functions in lifecycle order:
//!
//! - `on_install`: pre-cache every manifest asset, all or nothing
//! - `on_activate`: delete every other generation from the store
//! - `on_fetch`: serve GET requests cache-first, falling back to the network
//!
//! The manager only ever addresses the store through its own version
//! string. Lookups never fall back to another generation.

use std::sync::Arc;

use futures::future::{join_all, try_join_all};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::error::{OfflineError, OfflineResult};
use crate::http::{resolve, Request, RequestKey, Response};
use crate::network::Network;
use crate::store::{CacheEntry, CacheStore};

use super::GenerationState;

/// Result of a successful install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallReport {
    pub version: String,
    pub cached: usize,
    /// Asks the host to skip waiting for clients of the old generation to close.
    pub skip_waiting: bool,
}

/// Result of an activation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivateReport {
    pub version: String,
    pub deleted: Vec<String>,
    /// Stale generations whose deletion failed, with the reason.
    pub failed: Vec<(String, String)>,
    /// Asks the host to bind this generation to all open clients now.
    pub claim_clients: bool,
}

/// Where an intercepted request was answered from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Source {
    Cache,
    Network,
    /// Not intercepted (non-GET); sent to the network untouched.
    PassThrough,
}

impl Source {
    pub fn as_str(self) -> &'static str {
        match self {
            Source::Cache => "cache",
            Source::Network => "network",
            Source::PassThrough => "pass-through",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Served {
    pub source: Source,
    pub response: Response,
}

pub struct OfflineCacheManager {
    config: GenerationConfig,
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    state: RwLock<GenerationState>,
}

impl OfflineCacheManager {
    pub fn new(
        config: GenerationConfig,
        store: Arc<dyn CacheStore>,
        network: Arc<dyn Network>,
    ) -> Self {
        Self {
            config,
            store,
            network,
            state: RwLock::new(GenerationState::Registered),
        }
    }

    pub fn version(&self) -> &str {
        &self.config.version
    }

    pub async fn state(&self) -> GenerationState {
        *self.state.read().await
    }

    async fn transition(&self, to: GenerationState) -> OfflineResult<GenerationState> {
        let mut state = self.state.write().await;
        let from = *state;
        if !from.can_transition_to(to) {
            return Err(OfflineError::InvalidTransition {
                version: self.config.version.clone(),
                from,
                to,
            });
        }
        *state = to;
        debug!(version = %self.config.version, %from, %to, "Generation state change");
        Ok(from)
    }

    fn manifest_requests(&self) -> OfflineResult<Vec<Request>> {
        self.config
            .manifest
            .paths()
            .iter()
            .map(|path| resolve(&self.config.origin, path).map(Request::get))
            .collect()
    }

    // ===== Install =====

    pub async fn on_install(&self) -> OfflineResult<InstallReport> {
        self.transition(GenerationState::Installing).await?;

        match self.populate().await {
            Ok(cached) => {
                self.transition(GenerationState::Installed).await?;
                info!(version = %self.config.version, cached, "Cache generation installed");
                Ok(InstallReport {
                    version: self.config.version.clone(),
                    cached,
                    skip_waiting: self.config.skip_waiting,
                })
            }
            Err(e) => {
                self.transition(GenerationState::Failed).await?;
                warn!(version = %self.config.version, error = %e, "Cache generation install failed");
                Err(OfflineError::Population {
                    version: self.config.version.clone(),
                    source: Box::new(e),
                })
            }
        }
    }

    /// Fetch every manifest asset, then commit them in one batch.
    /// Nothing reaches the store unless every fetch succeeded.
    async fn populate(&self) -> OfflineResult<usize> {
        let requests = self.manifest_requests()?;

        let fetches = requests.iter().map(|request| async move {
            let response = self.network.fetch(request).await?;
            if !response.is_ok() {
                return Err(OfflineError::BadStatus {
                    url: request.url.to_string(),
                    status: response.status,
                });
            }
            Ok(CacheEntry::new(request.key(), response))
        });
        let entries = try_join_all(fetches).await?;
        let cached = entries.len();

        self.store.put_all(&self.config.version, entries).await?;
        Ok(cached)
    }

    /// Adopt a generation already fully present in the store, as a host does
    /// after a restart. Returns false (state unchanged) if any asset is missing.
    pub async fn adopt_existing(&self) -> OfflineResult<bool> {
        if !self.is_complete().await? {
            return Ok(false);
        }
        self.transition(GenerationState::Installing).await?;
        self.transition(GenerationState::Installed).await?;
        debug!(version = %self.config.version, "Adopted existing cache generation");
        Ok(true)
    }

    /// True when every manifest asset is stored under this generation.
    pub async fn is_complete(&self) -> OfflineResult<bool> {
        let stored = self.store.entries(&self.config.version).await?;
        let wanted: Vec<RequestKey> = self
            .manifest_requests()?
            .iter()
            .map(|r| r.key())
            .collect();
        Ok(self.store.has(&self.config.version).await?
            && wanted.iter().all(|key| stored.contains(key)))
    }

    // ===== Activate =====

    pub async fn on_activate(&self) -> OfflineResult<ActivateReport> {
        self.transition(GenerationState::Activating).await?;
        let evicted = self.evict_stale().await;
        // Activation is host-driven; a failed cleanup does not keep us inactive.
        self.transition(GenerationState::Active).await?;

        let (deleted, failed) = evicted?;
        info!(
            version = %self.config.version,
            deleted = deleted.len(),
            failed = failed.len(),
            "Cache generation active"
        );
        Ok(ActivateReport {
            version: self.config.version.clone(),
            deleted,
            failed,
            claim_clients: true,
        })
    }

    /// Delete every generation but ours. Deletions run independently; one
    /// failure never stops the others.
    async fn evict_stale(&self) -> OfflineResult<(Vec<String>, Vec<(String, String)>)> {
        let stale: Vec<String> = self
            .store
            .keys()
            .await?
            .into_iter()
            .filter(|k| k != &self.config.version)
            .collect();

        let deletions = stale.iter().map(|generation| async move {
            (generation.clone(), self.store.delete(generation).await)
        });

        let mut deleted = Vec::new();
        let mut failed = Vec::new();
        for (generation, result) in join_all(deletions).await {
            match result {
                Ok(true) => {
                    debug!(version = %generation, "Deleted stale cache generation");
                    deleted.push(generation);
                }
                Ok(false) => debug!(version = %generation, "Stale cache generation already gone"),
                Err(e) => {
                    warn!(version = %generation, error = %e, "Failed to delete stale cache generation");
                    failed.push((generation, e.to_string()));
                }
            }
        }
        Ok((deleted, failed))
    }

    // ===== Supersede =====

    /// Called by the host when a newer generation takes over.
    pub async fn supersede(&self) -> OfflineResult<()> {
        self.transition(GenerationState::Superseded).await?;
        Ok(())
    }

    /// Mark a superseded generation deleted once its entries are gone.
    /// Returns false if the store still holds it.
    pub async fn retire(&self) -> OfflineResult<bool> {
        if self.store.has(&self.config.version).await? {
            return Ok(false);
        }
        self.transition(GenerationState::Deleted).await?;
        Ok(true)
    }

    // ===== Fetch =====

    pub fn intercepts(&self, request: &Request) -> bool {
        request.is_get()
    }

    pub async fn on_fetch(&self, request: &Request) -> OfflineResult<Served> {
        if !self.intercepts(request) {
            let response = self.network.fetch(request).await?;
            return Ok(Served {
                source: Source::PassThrough,
                response,
            });
        }

        if self.state().await.is_active() {
            let key = request.key();
            match self.store.match_request(&self.config.version, &key).await {
                Ok(Some(response)) => {
                    debug!(version = %self.config.version, %key, "Cache hit");
                    return Ok(Served {
                        source: Source::Cache,
                        response,
                    });
                }
                Ok(None) => debug!(version = %self.config.version, %key, "Cache miss"),
                Err(e) => {
                    warn!(version = %self.config.version, %key, error = %e, "Cache lookup failed, using network")
                }
            }
        }

        let response = self.network.fetch(request).await?;
        Ok(Served {
            source: Source::Network,
            response,
        })
    }
}
