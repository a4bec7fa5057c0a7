//! On-disk cache store.
//!
//! Each generation is one JSON file in the store directory. The file name is
//! the hex-encoded version string, so arbitrary version labels map to safe,
//! collision-free names. Commits write a temp file and rename it over the
//! generation file; readers never observe a half-written generation.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{OfflineError, OfflineResult};
use crate::http::{RequestKey, Response};

use super::{CacheEntry, CacheStore};

const GENERATION_EXT: &str = "json";

#[derive(Debug, Serialize, Deserialize)]
struct GenerationFile {
    version: String,
    created_at: DateTime<Utc>,
    entries: Vec<CacheEntry>,
}

impl GenerationFile {
    fn new(version: &str) -> Self {
        Self {
            version: version.to_string(),
            created_at: Utc::now(),
            entries: Vec::new(),
        }
    }
}

pub struct DiskCacheStore {
    dir: PathBuf,
    // Serializes read-modify-write commits and deletes.
    write_lock: Mutex<()>,
}

impl DiskCacheStore {
    pub fn new(dir: PathBuf) -> OfflineResult<Self> {
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            write_lock: Mutex::new(()),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn generation_path(&self, version: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", hex::encode(version), GENERATION_EXT))
    }

    fn version_from_path(path: &Path) -> Option<String> {
        if path.extension().and_then(|e| e.to_str()) != Some(GENERATION_EXT) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        let bytes = hex::decode(stem).ok()?;
        String::from_utf8(bytes).ok()
    }

    async fn load(&self, version: &str) -> OfflineResult<Option<GenerationFile>> {
        let path = self.generation_path(version);
        let contents = match tokio::fs::read(&path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        let file: GenerationFile = serde_json::from_slice(&contents).map_err(|e| {
            OfflineError::Store(format!("Failed to parse cache generation {}: {}", version, e))
        })?;
        Ok(Some(file))
    }

    async fn save(&self, file: &GenerationFile) -> OfflineResult<()> {
        let path = self.generation_path(&file.version);
        let tmp = path.with_extension("tmp");
        let contents = serde_json::to_vec(file)?;
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

#[async_trait]
impl CacheStore for DiskCacheStore {
    async fn open(&self, generation: &str) -> OfflineResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.load(generation).await?.is_none() {
            debug!(version = %generation, "Creating cache generation");
            self.save(&GenerationFile::new(generation)).await?;
        }
        Ok(())
    }

    async fn put_all(&self, generation: &str, entries: Vec<CacheEntry>) -> OfflineResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self
            .load(generation)
            .await?
            .unwrap_or_else(|| GenerationFile::new(generation));

        let mut merged: BTreeMap<RequestKey, CacheEntry> = file
            .entries
            .drain(..)
            .map(|e| (e.key.clone(), e))
            .collect();
        for entry in entries {
            merged.insert(entry.key.clone(), entry);
        }
        file.entries = merged.into_values().collect();

        self.save(&file).await
    }

    async fn match_request(
        &self,
        generation: &str,
        key: &RequestKey,
    ) -> OfflineResult<Option<Response>> {
        Ok(self.load(generation).await?.and_then(|file| {
            file.entries
                .into_iter()
                .find(|e| &e.key == key)
                .map(|e| e.response)
        }))
    }

    async fn keys(&self) -> OfflineResult<Vec<String>> {
        let mut keys = Vec::new();
        let mut dir = tokio::fs::read_dir(&self.dir).await?;
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            match Self::version_from_path(&path) {
                Some(version) => keys.push(version),
                None => debug!(path = %path.display(), "Skipping non-generation file"),
            }
        }
        keys.sort();
        Ok(keys)
    }

    async fn delete(&self, generation: &str) -> OfflineResult<bool> {
        let _guard = self.write_lock.lock().await;
        match tokio::fs::remove_file(self.generation_path(generation)).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    async fn entries(&self, generation: &str) -> OfflineResult<Vec<RequestKey>> {
        let mut keys: Vec<RequestKey> = self
            .load(generation)
            .await?
            .map(|file| file.entries.into_iter().map(|e| e.key).collect())
            .unwrap_or_default();
        keys.sort();
        Ok(keys)
    }
}
