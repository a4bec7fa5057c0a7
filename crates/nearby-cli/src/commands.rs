//! Command implementations.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{info, warn};

use nearby_core::api::{MastersClient, MastersQuery};
use nearby_core::http::resolve;
use nearby_core::{
    CacheStore, Config, DiskCacheStore, Host, HttpNetwork, Method, Registration, Request,
};

use crate::cli::{GetArgs, SearchArgs};

fn open_store(config: &Config) -> Result<Arc<DiskCacheStore>> {
    let dir = config.cache_dir().context("Failed to locate cache directory")?;
    let store = DiskCacheStore::new(dir.clone())
        .with_context(|| format!("Failed to open cache store at {}", dir.display()))?;
    Ok(Arc::new(store))
}

fn host(config: &Config) -> Result<Host> {
    let network = HttpNetwork::new().context("Failed to create HTTP client")?;
    Ok(Host::new(open_store(config)?, Arc::new(network)))
}

/// Bring up a host controlled by the configured generation if possible.
/// When the generation is neither cached nor installable (e.g. offline on
/// first run) requests simply go to the network.
async fn controlled_host(config: &Config) -> Result<Host> {
    let mut host = host(config)?;
    let generation = config.generation()?;
    if let Err(e) = host.resume(generation).await {
        warn!(error = %e, "Offline cache unavailable, using network only");
    }
    Ok(host)
}

pub async fn sync(config: &Config) -> Result<()> {
    let mut host = host(config)?;
    let generation = config.generation()?;
    let version = generation.version.clone();

    match host
        .register(generation)
        .await
        .with_context(|| format!("Failed to install cache generation {}", version))?
    {
        Registration::Activated { install, activate } => {
            if let Some(install) = install {
                println!("Installed {} ({} assets)", install.version, install.cached);
            }
            for stale in &activate.deleted {
                println!("Deleted stale generation {}", stale);
            }
            for (stale, reason) in &activate.failed {
                eprintln!("Could not delete stale generation {}: {}", stale, reason);
            }
            println!("Active: {}", activate.version);
        }
        Registration::Waiting(install) => {
            println!("Installed {} ({} assets)", install.version, install.cached);
            println!("Waiting: {} (skip_waiting is off)", install.version);
        }
        Registration::Unchanged => println!("Active: {}", version),
    }
    Ok(())
}

pub async fn status(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    let keys = store.keys().await.context("Failed to list cache generations")?;
    println!("Cache store: {}", store.dir().display());
    if keys.is_empty() {
        println!("No cache generations (run `nearby sync`)");
        return Ok(());
    }

    for key in keys {
        let count = store.entries(&key).await?.len();
        let marker = if key == config.version { "*" } else { " " };
        println!("{} {} ({} entries)", marker, key, count);
    }
    Ok(())
}

pub async fn get(config: &Config, args: GetArgs) -> Result<()> {
    let method: Method = args
        .method
        .to_uppercase()
        .parse()
        .with_context(|| format!("Invalid HTTP method: {}", args.method))?;
    let url = resolve(&config.origin_url()?, &args.path)?;

    let host = controlled_host(config).await?;
    let served = host
        .fetch(&Request::new(method, url.clone()))
        .await
        .with_context(|| format!("Request to {} failed", url))?;

    info!(url = %url, source = served.source.as_str(), status = served.response.status, "Fetched");
    eprintln!(
        "{} {} [{}] {}",
        served.response.status,
        url,
        served.source.as_str(),
        served.response.header("content-type").unwrap_or("-")
    );
    std::io::stdout()
        .write_all(&served.response.body)
        .context("Failed to write response body")?;
    Ok(())
}

pub async fn search(config: &Config, args: SearchArgs) -> Result<()> {
    let query = MastersQuery::new(args.service, args.lat, args.lng).with_radius(args.radius);
    let client = MastersClient::new(config.origin_url()?);

    let host = controlled_host(config).await?;
    let results = client
        .search(&host, &query)
        .await
        .context("Masters search failed")?;

    if results.masters.is_empty() {
        println!("No {} masters within {} km yet.", args.service.display_name(), args.radius);
        return Ok(());
    }

    println!("Found {} (showing up to 5)", results.masters.len());
    for master in &results.masters {
        println!("{}", master.name);
        if !master.tagline.is_empty() {
            println!("  {}", master.tagline);
        }
        println!("  {}", master.summary_line());
        println!("  {}  {}", master.tel_uri(), master.sms_uri());
    }
    Ok(())
}

pub async fn clear(config: &Config) -> Result<()> {
    let store = open_store(config)?;
    for key in store.keys().await? {
        if store.delete(&key).await? {
            println!("Deleted {}", key);
        }
    }
    Ok(())
}
