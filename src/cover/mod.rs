//! Cover art resolution, processing and caching.
//!
//! Artwork for a track comes from, in priority order:
//!
//! 1. **Provider bytes** - raw image data shipped with the download
//! 2. **Album images** - the largest published album cover URL
//! 3. **Artist image** - the main artist's picture, as a last resort
//!
//! Remote images are cached on disk keyed by URL hash. Whatever the source,
//! the bytes go through [`process`] so that the embedded image respects the
//! configured size and format.
//!
//! Artwork is best-effort: a failure anywhere here is logged by the caller
//! and the file is tagged without a picture.

mod cache;
mod fetch;
mod process;
mod resolver;
mod sidecar;

pub use cache::ArtworkCache;
pub use fetch::{ArtworkFetcher, HttpArtworkFetcher};
pub use process::{detect_mime, process};
pub use resolver::{ArtworkGuard, ArtworkResolver, ResolvedArtwork};
pub use sidecar::{local_cover_name, save_local_cover};

#[cfg(test)]
pub use fetch::mocks;

use crate::config::ArtworkConfig;

/// Image container formats recognized from magic bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageMime {
    Jpeg,
    Png,
    Webp,
}

impl ImageMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Jpeg => "image/jpeg",
            Self::Png => "image/png",
            Self::Webp => "image/webp",
        }
    }

    /// File extensions for this format, preferred first.
    pub fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Jpeg => &["jpg", "jpeg"],
            Self::Png => &["png"],
            Self::Webp => &["webp"],
        }
    }
}

/// Processed cover art ready for embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artwork {
    pub data: Vec<u8>,
    pub mime: ImageMime,
    pub width: u32,
    pub height: u32,
}

/// Size and encoding rules applied to every embedded image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArtworkPolicy {
    /// Longest edge in pixels; larger images are downscaled
    pub max_size: u32,
    /// JPEG quality used whenever an image is re-encoded
    pub quality: u8,
    /// Re-encode PNG as JPEG even when it fits
    pub convert_to_jpeg: bool,
}

impl ArtworkPolicy {
    /// The same policy with a different size bound.
    pub fn with_max_size(self, max_size: u32) -> Self {
        Self { max_size, ..self }
    }
}

impl Default for ArtworkPolicy {
    fn default() -> Self {
        Self::from(&ArtworkConfig::default())
    }
}

impl From<&ArtworkConfig> for ArtworkPolicy {
    fn from(config: &ArtworkConfig) -> Self {
        Self {
            max_size: config.max_size,
            quality: config.quality,
            convert_to_jpeg: config.convert_to_jpeg,
        }
    }
}
