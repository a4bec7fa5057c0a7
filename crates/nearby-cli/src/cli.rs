//! CLI argument definitions using clap derive

use std::path::PathBuf;

use clap::{ArgAction, Parser, Subcommand};
use nearby_core::models::Service;

/// Find a master nearby - with an offline copy of the app shell
#[derive(Parser, Debug)]
#[command(name = "nearby")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "NEARBY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the origin asset paths are resolved against
    #[arg(long, global = true, env = "NEARBY_ORIGIN")]
    pub origin: Option<String>,

    /// Override the cache generation version
    #[arg(long = "cache-version", global = true, env = "NEARBY_CACHE_VERSION")]
    pub cache_version: Option<String>,

    /// Also write logs to a daily rolling file in this directory
    #[arg(long, global = true, env = "NEARBY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install the configured cache generation and make it current
    Sync,

    /// List cache generations in the store
    Status,

    /// Fetch a path through the offline cache
    Get(GetArgs),

    /// Search for masters near a location
    Search(SearchArgs),

    /// Delete every cache generation
    Clear,
}

#[derive(Parser, Debug)]
pub struct GetArgs {
    /// Path (or absolute URL) to fetch, e.g. /app.js
    pub path: String,

    /// HTTP method; anything but GET bypasses the cache
    #[arg(short = 'X', long, default_value = "GET")]
    pub method: String,
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    /// Kind of work: plumber, electrician, furniture, handyman
    #[arg(short, long)]
    pub service: Service,

    /// Search radius in kilometres
    #[arg(short, long, default_value_t = nearby_core::api::client::DEFAULT_RADIUS_KM)]
    pub radius: f64,

    /// Latitude
    #[arg(long, allow_hyphen_values = true)]
    pub lat: f64,

    /// Longitude
    #[arg(long, allow_hyphen_values = true)]
    pub lng: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_search() {
        let cli = Cli::try_parse_from([
            "nearby", "search", "--service", "plumber", "--lat", "52.52", "--lng", "-13.4",
        ])
        .unwrap();
        match cli.command {
            Commands::Search(args) => {
                assert_eq!(args.service, Service::Plumber);
                assert_eq!(args.radius, 2.0);
                assert_eq!(args.lng, -13.4);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_get_with_global_flags() {
        let cli = Cli::try_parse_from([
            "nearby", "-vv", "get", "/app.js", "-X", "POST", "--cache-version", "v2",
        ])
        .unwrap();
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.cache_version.as_deref(), Some("v2"));
        match cli.command {
            Commands::Get(args) => {
                assert_eq!(args.path, "/app.js");
                assert_eq!(args.method, "POST");
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_service_is_rejected() {
        assert!(Cli::try_parse_from([
            "nearby", "search", "--service", "gardener", "--lat", "0", "--lng", "0",
        ])
        .is_err());
    }
}
