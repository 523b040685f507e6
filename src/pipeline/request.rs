//! Download requests.

use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

/// The kind of content a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestKind {
    Track,
    Album,
    Artist,
    Batch,
    Playlist,
    Link,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Track => "track",
            Self::Album => "album",
            Self::Artist => "artist",
            Self::Batch => "batch",
            Self::Playlist => "playlist",
            Self::Link => "link",
        }
    }
}

impl fmt::Display for RequestKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What to download, with the provider-specific identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadTarget {
    Track { track_id: String },
    Album { album_id: String },
    Artist { artist_id: String },
    Batch { track_ids: Vec<String> },
    Playlist { playlist_id: String },
    Link { url: String },
}

/// A request handed to the pipeline by the job scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadRequest {
    /// Registry name of the downloader to use
    pub downloader: String,
    pub target: DownloadTarget,
    /// Overrides the configured download root
    pub output_dir: Option<PathBuf>,
}

impl DownloadRequest {
    pub fn new(downloader: impl Into<String>, target: DownloadTarget) -> Self {
        Self {
            downloader: downloader.into(),
            target,
            output_dir: None,
        }
    }

    pub fn track(downloader: impl Into<String>, track_id: impl Into<String>) -> Self {
        Self::new(
            downloader,
            DownloadTarget::Track {
                track_id: track_id.into(),
            },
        )
    }

    pub fn album(downloader: impl Into<String>, album_id: impl Into<String>) -> Self {
        Self::new(
            downloader,
            DownloadTarget::Album {
                album_id: album_id.into(),
            },
        )
    }

    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn kind(&self) -> RequestKind {
        match self.target {
            DownloadTarget::Track { .. } => RequestKind::Track,
            DownloadTarget::Album { .. } => RequestKind::Album,
            DownloadTarget::Artist { .. } => RequestKind::Artist,
            DownloadTarget::Batch { .. } => RequestKind::Batch,
            DownloadTarget::Playlist { .. } => RequestKind::Playlist,
            DownloadTarget::Link { .. } => RequestKind::Link,
        }
    }

    /// Top-level identifier reported in the result.
    pub fn item_id(&self) -> String {
        match &self.target {
            DownloadTarget::Track { track_id } => track_id.clone(),
            DownloadTarget::Album { album_id } => album_id.clone(),
            DownloadTarget::Artist { artist_id } => artist_id.clone(),
            DownloadTarget::Batch { track_ids } => track_ids.join(","),
            DownloadTarget::Playlist { playlist_id } => playlist_id.clone(),
            DownloadTarget::Link { url } => url.clone(),
        }
    }

    /// Generic job name used until the first item tells us something better.
    pub fn placeholder_name(&self) -> String {
        match &self.target {
            DownloadTarget::Batch { track_ids } => format!("Batch of {} tracks", track_ids.len()),
            _ => format!("{} {}", capitalize(self.kind().as_str()), self.item_id()),
        }
    }
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_and_ids() {
        let request = DownloadRequest::album("local", "John Lennon/Imagine");
        assert_eq!(request.kind(), RequestKind::Album);
        assert_eq!(request.item_id(), "John Lennon/Imagine");
        assert_eq!(request.placeholder_name(), "Album John Lennon/Imagine");

        let batch = DownloadRequest::new(
            "local",
            DownloadTarget::Batch {
                track_ids: vec!["a".into(), "b".into()],
            },
        );
        assert_eq!(batch.kind().to_string(), "batch");
        assert_eq!(batch.item_id(), "a,b");
        assert_eq!(batch.placeholder_name(), "Batch of 2 tracks");
    }

    #[test]
    fn test_output_dir_override() {
        let request = DownloadRequest::track("local", "1").with_output_dir("/tmp/out");
        assert_eq!(request.output_dir, Some(PathBuf::from("/tmp/out")));
    }
}
