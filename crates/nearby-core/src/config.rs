//! Application configuration management.
//!
//! The configuration names the cache generation (its version string), the
//! asset manifest pre-cached for offline use, the origin the manifest paths
//! are resolved against, and where the on-disk cache store lives.
//!
//! Configuration is stored at `~/.config/master-nearby/config.json`.
//! When the file is absent the deployed defaults are used.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{OfflineError, OfflineResult};
use crate::http::{resolve, RequestKey};

/// Application name used for config/cache directory paths
const APP_NAME: &str = "master-nearby";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const DEFAULT_ORIGIN: &str = "http://localhost:8000/";

const DEFAULT_VERSION: &str = "master-nearby-v1";

/// The application shell.
const DEFAULT_ASSETS: &[&str] = &[
    "/",
    "/index.html",
    "/styles.css",
    "/app.js",
    "/manifest.webmanifest",
    "/sw.js",
    "/icons/icon-192.png",
    "/icons/icon-512.png",
];

/// Ordered, duplicate-free list of paths pre-cached by a generation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetManifest {
    paths: Vec<String>,
}

impl AssetManifest {
    pub fn new<I, S>(paths: I) -> OfflineResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut out: Vec<String> = Vec::new();
        for path in paths {
            let path = path.into();
            if path.trim().is_empty() {
                return Err(OfflineError::Manifest("empty asset path".to_string()));
            }
            if out.contains(&path) {
                return Err(OfflineError::Manifest(format!("duplicate asset path: {}", path)));
            }
            out.push(path);
        }
        Ok(Self { paths: out })
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Everything a cache manager needs to know about its generation.
#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub version: String,
    pub origin: Url,
    pub manifest: AssetManifest,
    /// Take over from the active generation as soon as install finishes.
    pub skip_waiting: bool,
}

impl GenerationConfig {
    /// Paths that resolve to the same request against `origin`
    /// (`/app.js`, `app.js`, `./app.js`) are rejected as duplicates.
    pub fn new(version: impl Into<String>, origin: Url, manifest: AssetManifest) -> OfflineResult<Self> {
        let version = version.into();
        if version.trim().is_empty() {
            return Err(OfflineError::Config("cache version must not be empty".to_string()));
        }

        let mut seen: Vec<(RequestKey, &str)> = Vec::with_capacity(manifest.len());
        for path in manifest.paths() {
            let key = RequestKey::get(&resolve(&origin, path)?);
            if let Some((_, first)) = seen.iter().find(|(k, _)| *k == key) {
                return Err(OfflineError::Manifest(format!(
                    "asset paths {} and {} both resolve to {}",
                    first, path, key
                )));
            }
            seen.push((key, path.as_str()));
        }

        Ok(Self {
            version,
            origin,
            manifest,
            skip_waiting: true,
        })
    }

    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub origin: String,
    pub version: String,
    pub assets: Vec<String>,
    #[serde(default)]
    pub cache_dir: Option<PathBuf>,
    #[serde(default = "default_skip_waiting")]
    pub skip_waiting: bool,
}

fn default_skip_waiting() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            origin: DEFAULT_ORIGIN.to_string(),
            version: DEFAULT_VERSION.to_string(),
            assets: DEFAULT_ASSETS.iter().map(|s| s.to_string()).collect(),
            cache_dir: None,
            skip_waiting: true,
        }
    }
}

impl Config {
    /// Load from the default location, falling back to defaults.
    pub fn load() -> OfflineResult<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> OfflineResult<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            Ok(serde_json::from_str(&contents)?)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> OfflineResult<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> OfflineResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    pub fn config_path() -> OfflineResult<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| OfflineError::Config("Could not find config directory".to_string()))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn cache_dir(&self) -> OfflineResult<PathBuf> {
        if let Some(ref dir) = self.cache_dir {
            return Ok(dir.clone());
        }
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| OfflineError::Config("Could not find cache directory".to_string()))?;
        Ok(cache_dir.join(APP_NAME).join("generations"))
    }

    pub fn origin_url(&self) -> OfflineResult<Url> {
        Url::parse(&self.origin).map_err(|e| OfflineError::InvalidUrl {
            url: self.origin.clone(),
            reason: e.to_string(),
        })
    }

    /// Validate and build the generation this configuration describes.
    pub fn generation(&self) -> OfflineResult<GenerationConfig> {
        let manifest = AssetManifest::new(self.assets.iter().cloned())?;
        Ok(GenerationConfig::new(self.version.clone(), self.origin_url()?, manifest)?
            .with_skip_waiting(self.skip_waiting))
    }
}
