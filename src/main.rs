//! music-fetch - download music from pluggable providers and tag it.
//!
//! A download request runs through one pipeline: the chosen downloader
//! writes raw audio files, metadata is normalized and validated, cover art
//! is resolved, and tags are written in place. Everything is driven from
//! the command line.

pub mod cli;
pub mod config;
pub mod cover;
pub mod downloader;
pub mod error;
pub mod metadata;
pub mod model;
pub mod pipeline;
pub mod tagger;
#[cfg(test)]
pub mod test_utils;

use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

fn main() -> anyhow::Result<()> {
    let args = cli::Cli::parse();

    // Logs go to stderr so JSON results on stdout stay clean
    tracing_subscriber::registry()
        .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive("music_fetch=info".parse()?))
        .init();

    cli::run_command(&args)
}
