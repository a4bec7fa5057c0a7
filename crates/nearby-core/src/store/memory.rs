use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::OfflineResult;
use crate::http::{RequestKey, Response};

use super::{CacheEntry, CacheStore};

type Generation = HashMap<RequestKey, CacheEntry>;

#[derive(Debug, Default)]
pub struct MemoryCacheStore {
    generations: RwLock<HashMap<String, Generation>>,
}

impl MemoryCacheStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CacheStore for MemoryCacheStore {
    async fn open(&self, generation: &str) -> OfflineResult<()> {
        self.generations
            .write()
            .await
            .entry(generation.to_string())
            .or_default();
        Ok(())
    }

    async fn put_all(&self, generation: &str, entries: Vec<CacheEntry>) -> OfflineResult<()> {
        let mut generations = self.generations.write().await;
        let cache = generations.entry(generation.to_string()).or_default();
        for entry in entries {
            cache.insert(entry.key.clone(), entry);
        }
        Ok(())
    }

    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> OfflineResult<Option<Response>> {
        let generations = self.generations.read().await;
        Ok(generations
            .get(generation)
            .and_then(|cache| cache.get(key))
            .map(|entry| entry.response.clone()))
    }

    async fn keys(&self) -> OfflineResult<Vec<String>> {
        let mut keys: Vec<String> = self.generations.read().await.keys().cloned().collect();
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, generation: &str) -> OfflineResult<bool> {
        Ok(self.generations.write().await.remove(generation).is_some())
    }

    async fn entries(&self, generation: &str) -> OfflineResult<Vec<RequestKey>> {
        let generations = self.generations.read().await;
        let mut keys: Vec<RequestKey> = generations
            .get(generation)
            .map(|cache| cache.keys().cloned().collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
