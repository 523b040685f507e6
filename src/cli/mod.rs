//! Command-line interface for music-fetch.
//!
//! This module provides CLI commands for downloading and tagging music,
//! searching providers and inspecting the configuration.

mod commands;

pub use commands::{Cli, Commands, DownloadCommand, run_command};
