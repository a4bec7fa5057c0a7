//! Host supervisor for cache generations.
//!
//! Plays the part a browser's worker supervisor plays: it creates a manager
//! per generation, delivers the install and activate signals in order,
//! routes client requests to the active generation, and retires the
//! generation that was replaced.
//!
//! ```text
//! Host
//!  ├── active: OfflineCacheManager (serves fetches)
//!  ├── waiting: installed, held back until `activate_waiting`
//!  └── retired: superseded managers whose generation is not yet gone
//! ```

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::config::GenerationConfig;
use crate::error::OfflineResult;
use crate::http::Request;
use crate::network::Network;
use crate::store::CacheStore;
use crate::worker::{ActivateReport, InstallReport, OfflineCacheManager, Served, Source};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// The generation is now active. `install` is `None` when an already
    /// complete generation was adopted from the store.
    Activated {
        install: Option<InstallReport>,
        activate: ActivateReport,
    },
    /// Installed, but another generation is active and the new one did not
    /// ask to skip waiting. It takes over on `Host::activate_waiting`.
    Waiting(InstallReport),
    /// The requested version is already the active one.
    Unchanged,
}

pub struct Host {
    store: Arc<dyn CacheStore>,
    network: Arc<dyn Network>,
    active: Option<Arc<OfflineCacheManager>>,
    waiting: Option<Arc<OfflineCacheManager>>,
    retired: Vec<Arc<OfflineCacheManager>>,
    clients_claimed: bool,
}

impl Host {
    pub fn new(store: Arc<dyn CacheStore>, network: Arc<dyn Network>) -> Self {
        Self {
            store,
            network,
            active: None,
            waiting: None,
            retired: Vec::new(),
            clients_claimed: false,
        }
    }

    pub fn active(&self) -> Option<&Arc<OfflineCacheManager>> {
        self.active.as_ref()
    }

    pub fn active_version(&self) -> Option<&str> {
        self.active.as_ref().map(|m| m.version())
    }

    pub fn waiting_version(&self) -> Option<&str> {
        self.waiting.as_ref().map(|m| m.version())
    }

    pub fn clients_claimed(&self) -> bool {
        self.clients_claimed
    }

    fn is_active_version(&self, version: &str) -> bool {
        self.active_version() == Some(version)
    }

    /// Install a generation and activate it.
    ///
    /// With another generation active, activation happens right away only
    /// when the install asked to skip waiting; otherwise the new manager
    /// waits for `activate_waiting`. A newer waiting manager replaces an
    /// older one.
    ///
    /// If the install fails the previous active generation (if any) keeps
    /// serving and the error is returned; the caller decides whether to retry.
    pub async fn register(&mut self, config: GenerationConfig) -> OfflineResult<Registration> {
        if self.is_active_version(&config.version) {
            debug!(version = %config.version, "Generation already active");
            return Ok(Registration::Unchanged);
        }

        let manager = Arc::new(OfflineCacheManager::new(
            config,
            self.store.clone(),
            self.network.clone(),
        ));
        let install = manager.on_install().await?;

        if self.active.is_some() && !install.skip_waiting {
            info!(version = %install.version, "Generation installed, waiting to activate");
            if let Some(previous) = self.waiting.replace(manager) {
                previous.supersede().await?;
                self.retired.push(previous);
            }
            return Ok(Registration::Waiting(install));
        }

        debug!(version = %install.version, skip_waiting = install.skip_waiting, "Activating installed generation");
        let activate = self.activate(manager).await?;
        Ok(Registration::Activated {
            install: Some(install),
            activate,
        })
    }

    /// Promote the waiting generation, if there is one.
    pub async fn activate_waiting(&mut self) -> OfflineResult<Option<ActivateReport>> {
        match self.waiting.take() {
            Some(manager) => Ok(Some(self.activate(manager).await?)),
            None => Ok(None),
        }
    }

    /// Bind a generation already complete in the store, as after a restart.
    /// Falls back to a full `register` when anything is missing.
    pub async fn resume(&mut self, config: GenerationConfig) -> OfflineResult<Registration> {
        if self.is_active_version(&config.version) {
            return Ok(Registration::Unchanged);
        }

        let manager = Arc::new(OfflineCacheManager::new(
            config.clone(),
            self.store.clone(),
            self.network.clone(),
        ));
        if manager.adopt_existing().await? {
            info!(version = %manager.version(), "Resuming cached generation");
            let activate = self.activate(manager).await?;
            return Ok(Registration::Activated {
                install: None,
                activate,
            });
        }
        self.register(config).await
    }

    async fn activate(&mut self, manager: Arc<OfflineCacheManager>) -> OfflineResult<ActivateReport> {
        let result = manager.on_activate().await;

        // Activation evicted any waiting generation from the store.
        if let Some(waiting) = self.waiting.take() {
            waiting.supersede().await?;
            self.retired.push(waiting);
        }

        if let Some(previous) = self.active.replace(manager) {
            previous.supersede().await?;
            self.retired.push(previous);
        }
        self.sweep_retired().await;

        let report = result?;
        if report.claim_clients {
            self.clients_claimed = true;
        }
        Ok(report)
    }

    /// Move superseded managers whose generation is gone to `Deleted`.
    async fn sweep_retired(&mut self) {
        let mut still_present = Vec::new();
        for manager in self.retired.drain(..) {
            match manager.retire().await {
                Ok(true) => debug!(version = %manager.version(), "Generation deleted"),
                Ok(false) => still_present.push(manager),
                Err(e) => {
                    warn!(version = %manager.version(), error = %e, "Failed to retire generation");
                    still_present.push(manager);
                }
            }
        }
        self.retired = still_present;
    }

    /// Route a client request through the active generation, or straight to
    /// the network when nothing is active.
    pub async fn fetch(&self, request: &Request) -> OfflineResult<Served> {
        if let Some(ref manager) = self.active {
            return manager.on_fetch(request).await;
        }
        let source = if request.is_get() {
            Source::Network
        } else {
            Source::PassThrough
        };
        Ok(Served {
            source,
            response: self.network.fetch(request).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AssetManifest;
    use crate::error::OfflineError;
    use crate::http::Method;
    use crate::testing::{url, CountingStore, FakeNetwork, ORIGIN};
    use crate::worker::GenerationState;
    use url::Url;

    const SHELL: &[&str] = &["/", "/index.html", "/app.js"];

    fn generation(version: &str) -> GenerationConfig {
        GenerationConfig::new(
            version,
            Url::parse(ORIGIN).unwrap(),
            AssetManifest::new(SHELL.iter().copied()).unwrap(),
        )
        .unwrap()
    }

    fn get(path: &str) -> Request {
        Request::get(Url::parse(&url(path)).unwrap())
    }

    #[tokio::test]
    async fn test_uncontrolled_fetch_goes_to_network() {
        let network = Arc::new(FakeNetwork::serving(SHELL, "live"));
        let host = Host::new(Arc::new(CountingStore::new()), network.clone());

        let served = host.fetch(&get("/app.js")).await.unwrap();
        assert_eq!(served.source, Source::Network);
        assert_eq!(network.calls(), 1);
        assert!(!host.clients_claimed());
    }

    #[tokio::test]
    async fn test_uncontrolled_non_get_passes_through() {
        let network = Arc::new(FakeNetwork::serving(SHELL, "live"));
        let host = Host::new(Arc::new(CountingStore::new()), network.clone());

        let request = Request::new(Method::POST, Url::parse(&url("/app.js")).unwrap());
        let served = host.fetch(&request).await.unwrap();
        assert_eq!(served.source, Source::PassThrough);
        assert_eq!(network.calls(), 1);
    }

    #[tokio::test]
    async fn test_register_activates_and_claims() {
        let store = Arc::new(CountingStore::new());
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store.clone(), network.clone());

        match host.register(generation("v1")).await.unwrap() {
            Registration::Activated { install, activate } => {
                assert_eq!(install.unwrap().cached, 3);
                assert!(activate.claim_clients);
            }
            other => panic!("unexpected registration: {:?}", other),
        }
        assert_eq!(host.active_version(), Some("v1"));
        assert!(host.clients_claimed());

        let served = host.fetch(&get("/")).await.unwrap();
        assert_eq!(served.source, Source::Cache);
    }

    #[tokio::test]
    async fn test_new_generation_supersedes_and_deletes_old() {
        let store = Arc::new(CountingStore::new());
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store.clone(), network.clone());
        host.register(generation("v1")).await.unwrap();
        let v1 = host.active().unwrap().clone();

        network.serve(SHELL, "v2");
        host.register(generation("v2")).await.unwrap();

        assert_eq!(host.active_version(), Some("v2"));
        assert_eq!(v1.state().await, GenerationState::Deleted);
        assert_eq!(store.keys().await.unwrap(), vec!["v2".to_string()]);
        assert_eq!(host.fetch(&get("/app.js")).await.unwrap().response.text(), "/app.js@v2");
    }

    #[tokio::test]
    async fn test_failed_register_keeps_previous_generation_serving() {
        let store = Arc::new(CountingStore::new());
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store.clone(), network.clone());
        host.register(generation("v1")).await.unwrap();

        network.fail(&url("/app.js"));
        let err = host.register(generation("v2")).await.unwrap_err();
        assert!(matches!(err, OfflineError::Population { .. }));

        assert_eq!(host.active_version(), Some("v1"));
        assert_eq!(store.keys().await.unwrap(), vec!["v1".to_string()]);
        let served = host.fetch(&get("/app.js")).await.unwrap();
        assert_eq!(served.source, Source::Cache);
        assert_eq!(served.response.text(), "/app.js@v1");
    }

    #[tokio::test]
    async fn test_same_version_is_unchanged() {
        let store = Arc::new(CountingStore::new());
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store, network.clone());
        host.register(generation("v1")).await.unwrap();
        let calls = network.calls();

        assert_eq!(host.register(generation("v1")).await.unwrap(), Registration::Unchanged);
        assert_eq!(host.resume(generation("v1")).await.unwrap(), Registration::Unchanged);
        assert_eq!(network.calls(), calls);
    }

    #[tokio::test]
    async fn test_resume_adopts_complete_generation_offline() {
        let store = Arc::new(CountingStore::new());
        store.seed("v1", SHELL).await;
        store.seed("v0", &["/"]).await;
        let network = Arc::new(FakeNetwork::new());
        let mut host = Host::new(store.clone(), network.clone());

        match host.resume(generation("v1")).await.unwrap() {
            Registration::Activated { install, activate } => {
                assert!(install.is_none());
                assert_eq!(activate.deleted, vec!["v0".to_string()]);
            }
            other => panic!("unexpected registration: {:?}", other),
        }
        assert_eq!(network.calls(), 0);
        assert_eq!(host.fetch(&get("/index.html")).await.unwrap().source, Source::Cache);
    }

    #[tokio::test]
    async fn test_resume_incomplete_generation_reinstalls() {
        let store = Arc::new(CountingStore::new());
        store.seed("v1", &["/"]).await;
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store.clone(), network.clone());

        match host.resume(generation("v1")).await.unwrap() {
            Registration::Activated { install, .. } => assert_eq!(install.unwrap().cached, 3),
            other => panic!("unexpected registration: {:?}", other),
        }
        assert_eq!(network.calls(), 3);
    }

    #[tokio::test]
    async fn test_skip_waiting_activates_over_active_generation() {
        let store = Arc::new(CountingStore::new());
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store.clone(), network.clone());
        host.register(generation("v1")).await.unwrap();

        network.serve(SHELL, "v2");
        let registration = host
            .register(generation("v2").with_skip_waiting(true))
            .await
            .unwrap();
        assert!(matches!(registration, Registration::Activated { install: Some(_), .. }));
        assert_eq!(host.active_version(), Some("v2"));
        assert_eq!(host.waiting_version(), None);
    }

    #[tokio::test]
    async fn test_without_skip_waiting_new_generation_waits() {
        let store = Arc::new(CountingStore::new());
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store.clone(), network.clone());
        host.register(generation("v1")).await.unwrap();

        network.serve(SHELL, "v2");
        match host.register(generation("v2").with_skip_waiting(false)).await.unwrap() {
            Registration::Waiting(install) => {
                assert_eq!(install.version, "v2");
                assert!(!install.skip_waiting);
            }
            other => panic!("unexpected registration: {:?}", other),
        }

        // v1 keeps serving and both generations are stored.
        assert_eq!(host.active_version(), Some("v1"));
        assert_eq!(host.waiting_version(), Some("v2"));
        assert_eq!(store.keys().await.unwrap(), vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(host.fetch(&get("/app.js")).await.unwrap().response.text(), "/app.js@v1");

        let v1 = host.active().unwrap().clone();
        let report = host.activate_waiting().await.unwrap().unwrap();
        assert_eq!(report.version, "v2");
        assert_eq!(report.deleted, vec!["v1".to_string()]);
        assert_eq!(host.active_version(), Some("v2"));
        assert_eq!(host.waiting_version(), None);
        assert_eq!(v1.state().await, GenerationState::Deleted);
        assert_eq!(host.fetch(&get("/app.js")).await.unwrap().response.text(), "/app.js@v2");

        assert!(host.activate_waiting().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_first_generation_activates_without_skip_waiting() {
        let store = Arc::new(CountingStore::new());
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store, network);

        let registration = host
            .register(generation("v1").with_skip_waiting(false))
            .await
            .unwrap();
        assert!(matches!(registration, Registration::Activated { .. }));
        assert_eq!(host.active_version(), Some("v1"));
    }

    #[tokio::test]
    async fn test_newer_waiting_generation_replaces_older() {
        let store = Arc::new(CountingStore::new());
        let network = Arc::new(FakeNetwork::serving(SHELL, "v1"));
        let mut host = Host::new(store.clone(), network.clone());
        host.register(generation("v1")).await.unwrap();

        network.serve(SHELL, "v2");
        host.register(generation("v2").with_skip_waiting(false)).await.unwrap();
        network.serve(SHELL, "v3");
        host.register(generation("v3").with_skip_waiting(false)).await.unwrap();
        assert_eq!(host.waiting_version(), Some("v3"));

        let report = host.activate_waiting().await.unwrap().unwrap();
        assert_eq!(report.deleted, vec!["v1".to_string(), "v2".to_string()]);
        assert_eq!(store.keys().await.unwrap(), vec!["v3".to_string()]);
    }
}
