//! The downloader capability interface.
//!
//! Concrete providers implement a subset of the operations below. Anything a
//! provider does not override fails with
//! [`DownloaderError::MethodNotSupported`], and [`Capabilities`] tells
//! callers up front which optional paths are safe to take.
//!
//! # Example
//!
//! ```ignore
//! use music_fetch::downloader::{Downloader, Capabilities};
//!
//! struct MyProvider;
//!
//! #[async_trait]
//! impl Downloader for MyProvider {
//!     fn name(&self) -> &str { "my-provider" }
//!     fn capabilities(&self) -> Capabilities { Capabilities::default() }
//!     async fn download_track(&self, id: &str, dir: &Path, progress: Option<&ByteProgress<'_>>)
//!         -> Result<Track, DownloaderError> { ... }
//! }
//! ```

use std::path::Path;

use async_trait::async_trait;
use serde::Serialize;

use crate::model::{Album, Artist, Track};

/// Byte-level progress callback: `(downloaded_bytes, total_bytes)`.
///
/// Bulk entry points report a coarse percentage as `(percent, 100)`.
pub type ByteProgress<'a> = dyn Fn(u64, u64) + Send + Sync + 'a;

/// Which optional operations a downloader supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Capabilities {
    pub supports_search: bool,
    pub supports_artist_search: bool,
    pub supports_direct_links: bool,
    pub supports_chart_tracks: bool,
    /// `album_tracks` / `artist_albums` work, so batches can be planned item by item
    pub supports_track_listing: bool,
    pub supports_playlists: bool,
}

/// Health report of a downloader.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloaderStatus {
    pub healthy: bool,
    pub message: String,
}

impl DownloaderStatus {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
        }
    }
}

/// Account details of the user a downloader is logged in as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub name: String,
    /// Subscription or quality tier, provider-specific
    pub plan: Option<String>,
}

/// Errors raised by downloader plugins.
#[derive(Debug, Clone, thiserror::Error)]
pub enum DownloaderError {
    #[error("method not supported: {method}")]
    MethodNotSupported { method: &'static str },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("network error: {0}")]
    Network(String),

    #[error("authentication required: {0}")]
    Unauthorized(String),

    #[error("IO error: {0}")]
    Io(String),

    #[error("provider error: {0}")]
    Provider(String),
}

impl DownloaderError {
    pub fn unsupported(method: &'static str) -> Self {
        Self::MethodNotSupported { method }
    }

    pub fn is_not_supported(&self) -> bool {
        matches!(self, Self::MethodNotSupported { .. })
    }
}

impl From<std::io::Error> for DownloaderError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e.to_string())
    }
}

/// A music provider plugin.
///
/// Download operations write the raw audio file into `dir` and return a
/// populated [`Track`] whose `path` points at it. The pipeline only
/// post-processes what the provider produced.
#[async_trait]
pub trait Downloader: Send + Sync {
    /// Registry name, e.g. "local" or "deezer".
    fn name(&self) -> &str;

    fn capabilities(&self) -> Capabilities;

    /// Health of the provider (reachable, logged in, ...).
    async fn status(&self) -> DownloaderStatus;

    async fn user_info(&self) -> Result<UserInfo, DownloaderError> {
        Err(DownloaderError::unsupported("user_info"))
    }

    async fn search_tracks(&self, _query: &str, _limit: usize) -> Result<Vec<Track>, DownloaderError> {
        Err(DownloaderError::unsupported("search_tracks"))
    }

    async fn search_albums(&self, _query: &str, _limit: usize) -> Result<Vec<Album>, DownloaderError> {
        Err(DownloaderError::unsupported("search_albums"))
    }

    async fn search_artists(
        &self,
        _query: &str,
        _limit: usize,
    ) -> Result<Vec<Artist>, DownloaderError> {
        Err(DownloaderError::unsupported("search_artists"))
    }

    /// Resolve a provider URL into the tracks it points at.
    async fn resolve_link(&self, _url: &str) -> Result<Vec<Track>, DownloaderError> {
        Err(DownloaderError::unsupported("resolve_link"))
    }

    async fn album_tracks(&self, _album_id: &str) -> Result<Vec<Track>, DownloaderError> {
        Err(DownloaderError::unsupported("album_tracks"))
    }

    async fn artist_albums(&self, _artist_id: &str) -> Result<Vec<Album>, DownloaderError> {
        Err(DownloaderError::unsupported("artist_albums"))
    }

    async fn playlist_tracks(&self, _playlist_id: &str) -> Result<Vec<Track>, DownloaderError> {
        Err(DownloaderError::unsupported("playlist_tracks"))
    }

    async fn chart_tracks(&self, _limit: usize) -> Result<Vec<Track>, DownloaderError> {
        Err(DownloaderError::unsupported("chart_tracks"))
    }

    async fn download_track(
        &self,
        _track_id: &str,
        _dir: &Path,
        _progress: Option<&ByteProgress<'_>>,
    ) -> Result<Track, DownloaderError> {
        Err(DownloaderError::unsupported("download_track"))
    }

    /// Bulk album download; progress is a coarse `(percent, 100)`.
    async fn download_album(
        &self,
        _album_id: &str,
        _dir: &Path,
        _progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<Track>, DownloaderError> {
        Err(DownloaderError::unsupported("download_album"))
    }

    async fn download_artist(
        &self,
        _artist_id: &str,
        _dir: &Path,
        _progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<Track>, DownloaderError> {
        Err(DownloaderError::unsupported("download_artist"))
    }

    async fn download_link(
        &self,
        _url: &str,
        _dir: &Path,
        _progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<Track>, DownloaderError> {
        Err(DownloaderError::unsupported("download_link"))
    }
}
