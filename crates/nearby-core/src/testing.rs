//! In-crate fakes for the cache store and the network primitive.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::error::{OfflineError, OfflineResult};
use crate::http::{Request, RequestKey, Response};
use crate::network::Network;
use crate::store::{CacheEntry, CacheStore, MemoryCacheStore};

pub const ORIGIN: &str = "https://nearby.example/";

/// Network that answers from a route table and records every call.
#[derive(Default)]
pub struct FakeNetwork {
    routes: Mutex<HashMap<String, Response>>,
    failing: Mutex<HashSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl FakeNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve every path under `ORIGIN` with a 200 whose body names the path and label.
    pub fn serving(paths: &[&str], label: &str) -> Self {
        let network = Self::new();
        network.serve(paths, label);
        network
    }

    pub fn serve(&self, paths: &[&str], label: &str) {
        for path in paths {
            let url = url(path);
            self.route(&url, Response::new(url.clone(), 200, format!("{}@{}", path, label)));
        }
    }

    pub fn route(&self, url: &str, response: Response) {
        self.routes.lock().unwrap().insert(url.to_string(), response);
    }

    pub fn fail(&self, url: &str) {
        self.failing.lock().unwrap().insert(url.to_string());
    }

    pub fn calls(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    pub fn called(&self, url: &str) -> bool {
        self.calls.lock().unwrap().iter().any(|u| u == url)
    }
}

#[async_trait]
impl Network for FakeNetwork {
    async fn fetch(&self, request: &Request) -> OfflineResult<Response> {
        let url = request.url.to_string();
        self.calls.lock().unwrap().push(url.clone());
        if self.failing.lock().unwrap().contains(&url) {
            return Err(OfflineError::network(url, "connection refused"));
        }
        let routed = self.routes.lock().unwrap().get(&url).cloned();
        Ok(routed.unwrap_or_else(|| Response::new(url, 404, "not found")))
    }
}

/// Memory store that counts reads and writes and can be told to fail
/// commits or deletes.
#[derive(Default)]
pub struct CountingStore {
    inner: MemoryCacheStore,
    reads: AtomicUsize,
    writes: AtomicUsize,
    failing_deletes: Mutex<HashSet<String>>,
    failing_puts: Mutex<HashSet<String>>,
}

impl CountingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    pub fn fail_delete(&self, generation: &str) {
        self.failing_deletes.lock().unwrap().insert(generation.to_string());
    }

    pub fn fail_put(&self, generation: &str) {
        self.failing_puts.lock().unwrap().insert(generation.to_string());
    }

    /// Seed a generation without counting it as a write.
    pub async fn seed(&self, generation: &str, paths: &[&str]) {
        let entries = paths
            .iter()
            .map(|path| {
                let u = url::Url::parse(&url(path)).unwrap();
                CacheEntry::new(RequestKey::get(&u), Response::new(u.as_str(), 200, *path))
            })
            .collect();
        self.inner.put_all(generation, entries).await.unwrap();
    }
}

#[async_trait]
impl CacheStore for CountingStore {
    async fn open(&self, generation: &str) -> OfflineResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        self.inner.open(generation).await
    }

    async fn put_all(&self, generation: &str, entries: Vec<CacheEntry>) -> OfflineResult<()> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_puts.lock().unwrap().contains(generation) {
            return Err(OfflineError::Store(format!("cannot write {}", generation)));
        }
        self.inner.put_all(generation, entries).await
    }

    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> OfflineResult<Option<Response>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        self.inner.match_request(generation, key).await
    }

    async fn keys(&self) -> OfflineResult<Vec<String>> {
        self.inner.keys().await
    }

    async fn delete(&self, generation: &str) -> OfflineResult<bool> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        if self.failing_deletes.lock().unwrap().contains(generation) {
            return Err(OfflineError::Store(format!("cannot delete {}", generation)));
        }
        self.inner.delete(generation).await
    }

    async fn entries(&self, generation: &str) -> OfflineResult<Vec<RequestKey>> {
        self.inner.entries(generation).await
    }
}

pub fn url(path: &str) -> String {
    url::Url::parse(ORIGIN)
        .unwrap()
        .join(path)
        .unwrap()
        .to_string()
}
