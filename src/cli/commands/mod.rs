//! CLI command definitions and dispatch.
//!
//! Each subcommand is implemented in its own submodule:
//! - `download`: Run the download-and-tag pipeline
//! - `search`: Query a provider's catalog
//! - `info`: List downloaders and print the effective configuration

mod download;
mod info;
mod search;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::downloader::{DownloaderRegistry, LocalDownloader};
use crate::pipeline::{DownloadRequest, DownloadTarget};

pub use download::cmd_download;
pub use info::{cmd_config, cmd_downloaders};
pub use search::{SearchKind, cmd_search};

/// music-fetch CLI
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Downloader to use (defaults to the configured one)
    #[arg(short, long, global = true, env = "MUSIC_FETCH_DOWNLOADER")]
    pub downloader: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "MUSIC_FETCH_CONFIG")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand)]
pub enum Commands {
    /// Download and tag music
    Download {
        #[command(subcommand)]
        target: DownloadCommand,
        /// Output directory (defaults to the configured download root)
        #[arg(short, long, global = true)]
        output: Option<PathBuf>,
        /// Print the result as JSON
        #[arg(long, global = true)]
        json: bool,
    },
    /// Search a downloader's catalog
    Search {
        /// Search query
        query: String,
        /// Search albums instead of tracks
        #[arg(long, conflicts_with = "artists")]
        albums: bool,
        /// Search artists instead of tracks
        #[arg(long)]
        artists: bool,
        /// Maximum number of results
        #[arg(short, long, default_value = "20")]
        limit: usize,
    },
    /// List registered downloaders with their capabilities and health
    Downloaders,
    /// Print the effective configuration
    Config {
        /// Write the effective configuration to the config file
        #[arg(long)]
        save: bool,
    },
}

/// What to download
#[derive(Subcommand)]
pub enum DownloadCommand {
    /// A single track
    Track { id: String },
    /// Every track of an album
    Album { id: String },
    /// Every album of an artist
    Artist { id: String },
    /// Several tracks by ID
    Batch {
        #[arg(required = true)]
        ids: Vec<String>,
    },
    /// Every track of a playlist
    Playlist { id: String },
    /// Whatever a provider link points at
    Link { url: String },
}

impl DownloadCommand {
    fn target(&self) -> DownloadTarget {
        match self {
            Self::Track { id } => DownloadTarget::Track {
                track_id: id.clone(),
            },
            Self::Album { id } => DownloadTarget::Album {
                album_id: id.clone(),
            },
            Self::Artist { id } => DownloadTarget::Artist {
                artist_id: id.clone(),
            },
            Self::Batch { ids } => DownloadTarget::Batch {
                track_ids: ids.clone(),
            },
            Self::Playlist { id } => DownloadTarget::Playlist {
                playlist_id: id.clone(),
            },
            Self::Link { url } => DownloadTarget::Link { url: url.clone() },
        }
    }
}

/// Run the specified CLI command.
pub fn run_command(cli: &Cli) -> anyhow::Result<()> {
    let rt = Runtime::new()?;
    let config = match &cli.config_file {
        Some(path) => config::load_from(path),
        None => config::load(),
    };
    let registry = build_registry(&config);
    let downloader = cli
        .downloader
        .clone()
        .unwrap_or_else(|| config.download.default_downloader.clone());

    match &cli.command {
        Commands::Download {
            target,
            output,
            json,
        } => {
            let mut request = DownloadRequest::new(downloader, target.target());
            request.output_dir = output.clone();
            cmd_download(&rt, registry, &config, &request, *json)
        }
        Commands::Search {
            query,
            albums,
            artists,
            limit,
        } => {
            let kind = if *albums {
                SearchKind::Albums
            } else if *artists {
                SearchKind::Artists
            } else {
                SearchKind::Tracks
            };
            cmd_search(&rt, &registry, &downloader, query, kind, *limit)
        }
        Commands::Downloaders => cmd_downloaders(&rt, &registry),
        Commands::Config { save } => cmd_config(&config, cli.config_file.as_deref(), *save),
    }
}

/// Register every downloader the configuration enables.
fn build_registry(config: &Config) -> Arc<DownloaderRegistry> {
    let registry = Arc::new(DownloaderRegistry::new());
    match &config.local.catalog {
        Some(catalog) => registry.register(Arc::new(LocalDownloader::new(catalog))),
        None => tracing::debug!("No local catalog configured"),
    }
    registry
}
