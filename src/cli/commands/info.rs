//! Downloader listing and configuration commands.

use std::path::Path;
use tokio::runtime::Runtime;

use crate::config::{self, Config};
use crate::downloader::{Capabilities, DownloaderRegistry};

/// List registered downloaders with health and capabilities
pub fn cmd_downloaders(rt: &Runtime, registry: &DownloaderRegistry) -> anyhow::Result<()> {
    if registry.is_empty() {
        println!("No downloaders configured.");
        println!("Set [local] catalog in the config file to enable the local catalog.");
        return Ok(());
    }

    rt.block_on(async {
        for downloader in registry.all() {
            let status = downloader.status().await;
            let mark = if status.healthy { "✓" } else { "✗" };
            println!("{} {} - {}", mark, downloader.name(), status.message);
            println!("    {}", capability_list(&downloader.capabilities()));
        }
    });
    Ok(())
}

fn capability_list(caps: &Capabilities) -> String {
    let flags = [
        ("search", caps.supports_search),
        ("artist search", caps.supports_artist_search),
        ("links", caps.supports_direct_links),
        ("charts", caps.supports_chart_tracks),
        ("listing", caps.supports_track_listing),
        ("playlists", caps.supports_playlists),
    ];
    let enabled: Vec<&str> = flags
        .iter()
        .filter(|(_, on)| *on)
        .map(|(name, _)| *name)
        .collect();
    if enabled.is_empty() {
        "downloads only".to_string()
    } else {
        enabled.join(", ")
    }
}

/// Print the effective configuration, optionally saving it
pub fn cmd_config(config: &Config, path: Option<&Path>, save: bool) -> anyhow::Result<()> {
    let path = path.map(Path::to_path_buf).or_else(config::config_path);
    match &path {
        Some(path) => println!("# {}", path.display()),
        None => println!("# (no config directory)"),
    }
    print!("{}", toml::to_string_pretty(config)?);

    if save {
        match &path {
            Some(path) => config::save_to(config, path)?,
            None => config::save(config)?,
        }
        eprintln!("Saved.");
    }
    Ok(())
}
