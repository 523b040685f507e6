//! Application-wide error types.
//!
//! This module provides the error hierarchy for the download-and-tag
//! pipeline. Library modules use specific error types via `thiserror`
//! ([`DownloaderError`], [`TagError`]) while the CLI uses `anyhow` at the
//! edge.
//!
//! # Propagation
//!
//! - [`Error::DownloaderNotFound`], [`Error::UnsupportedDownloadType`] and
//!   [`Error::Cancelled`] always end the whole job.
//! - [`Error::MissingMetadata`] and [`Error::TagWrite`] end a single-track
//!   job but only skip the item inside a batch.
//! - [`Error::ArtworkFetch`] is never fatal; artwork is best-effort.
//!
//! [`DownloaderError`]: crate::downloader::DownloaderError
//! [`TagError`]: crate::tagger::TagError

use std::fmt;
use std::path::PathBuf;

use crate::downloader::DownloaderError;
use crate::tagger::TagError;

/// Application-wide result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level pipeline error.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No downloader registered under this name
    #[error("downloader not found: {0}")]
    DownloaderNotFound(String),

    /// The downloader cannot serve this kind of request
    #[error("unsupported download type '{kind}' for downloader {downloader}")]
    UnsupportedDownloadType { downloader: String, kind: String },

    /// Required fields still absent after normalization
    #[error("missing required metadata fields: {0}")]
    MissingMetadata(MissingFields),

    /// A provider call failed
    #[error("download failed ({downloader}): {source}")]
    DownloadFailed {
        downloader: String,
        #[source]
        source: DownloaderError,
    },

    /// Tag serialization failed
    #[error("failed to write tags to {path}: {source}")]
    TagWrite {
        path: PathBuf,
        #[source]
        source: TagError,
    },

    /// Cover art could not be obtained or decoded
    #[error("artwork fetch failed: {0}")]
    ArtworkFetch(String),

    /// File I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The job's cancellation token fired
    #[error("download cancelled")]
    Cancelled,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Create a download failure for the named downloader.
    pub fn download(downloader: impl Into<String>, source: DownloaderError) -> Self {
        Self::DownloadFailed {
            downloader: downloader.into(),
            source,
        }
    }

    /// Create a tag write failure.
    pub fn tag_write(path: impl Into<PathBuf>, source: TagError) -> Self {
        Self::TagWrite {
            path: path.into(),
            source,
        }
    }

    /// Create an artwork fetch error.
    pub fn artwork(message: impl Into<String>) -> Self {
        Self::ArtworkFetch(message.into())
    }

    /// Create a config error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Add context to an error.
    pub fn context(self, ctx: impl Into<String>) -> Self {
        Self::WithContext {
            context: ctx.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error ends the whole job regardless of request type.
    pub fn is_fatal(&self) -> bool {
        match self {
            Self::DownloaderNotFound(_) | Self::UnsupportedDownloadType { .. } | Self::Cancelled => {
                true
            }
            Self::WithContext { source, .. } => source.is_fatal(),
            _ => false,
        }
    }

    /// Whether this error (or the error it wraps) is a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// A metadata field the tagger refuses to write without.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum MissingField {
    Title,
    Artist,
    Album,
    Year,
}

impl fmt::Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Title => "Title",
            Self::Artist => "Artist",
            Self::Album => "Album",
            Self::Year => "Year",
        };
        f.write_str(name)
    }
}

/// The set of fields reported by a failed validation, in field order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MissingFields(pub Vec<MissingField>);

impl MissingFields {
    pub fn contains(&self, field: MissingField) -> bool {
        self.0.contains(&field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for MissingFields {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{}", field)?;
        }
        Ok(())
    }
}

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn with_context(self, ctx: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.context(ctx))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, std::io::Error> {
    fn with_context(self, ctx: impl Into<String>) -> Result<T> {
        self.map_err(|e| Error::Io(e).context(ctx))
    }
}
