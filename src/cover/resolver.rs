//! Artwork resolver - picks a source, fetches through the cache, processes.
//!
//! The resolved image is staged in a temp file for consumers that need it
//! on disk (the local cover writer). The staged copy belongs to an
//! [`ArtworkGuard`] and is removed when the guard is dropped, on success
//! and error paths alike.

use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempPath;

use super::cache::ArtworkCache;
use super::fetch::{ArtworkFetcher, HttpArtworkFetcher};
use super::{Artwork, ArtworkPolicy, ImageMime, process};
use crate::config::ArtworkConfig;
use crate::error::{Error, Result};
use crate::model::Track;

/// Owns the staged copy of a processed image.
pub struct ArtworkGuard {
    staged: Option<TempPath>,
}

impl ArtworkGuard {
    fn stage(artwork: &Artwork) -> Result<Self> {
        let ext = match artwork.mime {
            ImageMime::Png => ".png",
            ImageMime::Webp => ".webp",
            ImageMime::Jpeg => ".jpg",
        };
        let mut file = tempfile::Builder::new()
            .prefix("music-fetch-cover-")
            .suffix(ext)
            .tempfile()?;
        file.write_all(&artwork.data)?;
        Ok(Self {
            staged: Some(file.into_temp_path()),
        })
    }

    /// Path of the staged image.
    pub fn path(&self) -> Option<&Path> {
        self.staged.as_deref()
    }
}

impl Drop for ArtworkGuard {
    fn drop(&mut self) {
        if let Some(path) = self.staged.take() {
            let staged = path.to_path_buf();
            if let Err(e) = path.close() {
                tracing::warn!("Failed to remove staged artwork {:?}: {}", staged, e);
            }
        }
    }
}

/// Artwork ready for embedding plus the data needed to derive other sizes.
pub struct ResolvedArtwork {
    pub artwork: Artwork,
    /// Source bytes before processing
    pub original: Vec<u8>,
    pub guard: ArtworkGuard,
}

/// Resolves cover art for tracks.
pub struct ArtworkResolver {
    cache: ArtworkCache,
    fetcher: Arc<dyn ArtworkFetcher>,
}

impl ArtworkResolver {
    /// Create a resolver using HTTP fetching and the configured cache.
    pub fn new(config: &ArtworkConfig) -> Result<Self> {
        let fetcher = HttpArtworkFetcher::new(Duration::from_secs(config.fetch_timeout_secs))?;
        Ok(Self::with_fetcher(
            ArtworkCache::new(config.cache_dir(), ttl(config)),
            Arc::new(fetcher),
        ))
    }

    pub fn with_fetcher(cache: ArtworkCache, fetcher: Arc<dyn ArtworkFetcher>) -> Self {
        Self { cache, fetcher }
    }

    /// Resolve, process and stage artwork for `track`.
    ///
    /// `Ok(None)` when the track has no artwork source at all.
    pub async fn resolve(
        &self,
        track: &Track,
        policy: &ArtworkPolicy,
    ) -> Result<Option<ResolvedArtwork>> {
        let Some(original) = self.source_bytes(track).await? else {
            tracing::debug!("No artwork source for {}", track.display_name());
            return Ok(None);
        };

        let policy = *policy;
        tokio::task::spawn_blocking(move || -> Result<Option<ResolvedArtwork>> {
            let artwork = process(&original, &policy)?;
            let guard = ArtworkGuard::stage(&artwork)?;
            Ok(Some(ResolvedArtwork {
                artwork,
                original,
                guard,
            }))
        })
        .await
        .map_err(|e| Error::artwork(format!("artwork task failed: {}", e)))?
    }

    /// Raw bytes from the highest-priority source.
    async fn source_bytes(&self, track: &Track) -> Result<Option<Vec<u8>>> {
        if let Some(data) = track
            .album
            .as_ref()
            .and_then(|a| a.artwork.as_ref())
            .filter(|d| !d.is_empty())
        {
            return Ok(Some(data.clone()));
        }

        let urls = candidate_urls(track);
        let mut last_error = None;
        for url in urls {
            match self.fetch_cached(url).await {
                Ok(data) => return Ok(Some(data)),
                Err(e) => {
                    tracing::debug!("Artwork candidate failed: {}", e);
                    last_error = Some(e);
                }
            }
        }
        match last_error {
            Some(e) => Err(e),
            None => Ok(None),
        }
    }

    async fn fetch_cached(&self, url: &str) -> Result<Vec<u8>> {
        if let Some(data) = self.cache.get(url) {
            tracing::debug!("Artwork cache hit for {}", url);
            return Ok(data);
        }

        let data = self.fetcher.fetch(url).await?;
        if let Err(e) = self.cache.put(url, &data) {
            tracing::warn!("Failed to cache artwork for {}: {}", url, e);
        }
        Ok(data)
    }
}

fn ttl(config: &ArtworkConfig) -> Duration {
    Duration::from_secs(config.cache_ttl_hours.saturating_mul(3600))
}

/// Album cover (largest first), then the main artist's picture.
fn candidate_urls(track: &Track) -> Vec<&str> {
    let album_url = track.album.as_ref().and_then(|a| a.images.best());
    let artist_url = track
        .primary_artist()
        .and_then(|a| a.image_url.as_deref())
        .filter(|u| !u.trim().is_empty());
    album_url.into_iter().chain(artist_url).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::mocks::MockFetcher;
    use crate::model::{Artist, ArtistRole, Role};
    use crate::test_utils::{mock_track, test_image};
    use image::ImageFormat;
    use tempfile::TempDir;

    const XL: &str = "https://img.example/album-1/xl.jpg";

    fn resolver(dir: &TempDir, fetcher: Arc<MockFetcher>) -> ArtworkResolver {
        ArtworkResolver::with_fetcher(
            ArtworkCache::new(dir.path(), Duration::from_secs(3600)),
            fetcher,
        )
    }

    #[tokio::test]
    async fn test_provider_bytes_take_priority() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::with(XL, test_image(10, 10, ImageFormat::Jpeg)));
        let resolver = resolver(&dir, Arc::clone(&fetcher));

        let mut track = mock_track("1", "Imagine");
        let album = track.album.as_mut().unwrap();
        album.artwork = Some(test_image(40, 40, ImageFormat::Jpeg));
        album.images.xl = Some(XL.to_string());

        let resolved = resolver
            .resolve(&track, &ArtworkPolicy::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(resolved.artwork.width, 40);
        assert_eq!(fetcher.request_count(), 0);
    }

    #[tokio::test]
    async fn test_remote_fetch_is_cached() {
        let dir = TempDir::new().unwrap();
        let fetcher = Arc::new(MockFetcher::with(XL, test_image(1500, 1500, ImageFormat::Png)));
        let resolver = resolver(&dir, Arc::clone(&fetcher));

        let mut track = mock_track("1", "Imagine");
        track.album.as_mut().unwrap().images.xl = Some(XL.to_string());

        let first = resolver
            .resolve(&track, &ArtworkPolicy::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.artwork.mime, ImageMime::Jpeg);
        assert_eq!((first.artwork.width, first.artwork.height), (1000, 1000));

        let second = resolver
            .resolve(&track, &ArtworkPolicy::default())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(second.artwork, first.artwork);
        assert_eq!(fetcher.request_count(), 1);
    }

    #[tokio::test]
    async fn test_falls_back_to_artist_image() {
        let dir = TempDir::new().unwrap();
        let artist_url = "https://img.example/artist-1.jpg";
        let fetcher = Arc::new(MockFetcher::with(
            artist_url,
            test_image(20, 20, ImageFormat::Jpeg),
        ));
        let resolver = resolver(&dir, Arc::clone(&fetcher));

        let mut track = mock_track("1", "Imagine");
        track.album.as_mut().unwrap().images.xl = Some(XL.to_string());
        let mut artist = Artist::new("artist-1", "John Lennon");
        artist.image_url = Some(artist_url.to_string());
        track.artists = vec![ArtistRole::new(Arc::new(artist), Role::Main)];

        let resolved = resolver
            .resolve(&track, &ArtworkPolicy::default())
            .await
            .unwrap();
        assert!(resolved.is_some());
        assert_eq!(fetcher.request_count(), 2);
    }

    #[tokio::test]
    async fn test_no_source_is_none_and_failure_is_error() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, Arc::new(MockFetcher::default()));

        let track = mock_track("1", "Imagine");
        assert!(
            resolver
                .resolve(&track, &ArtworkPolicy::default())
                .await
                .unwrap()
                .is_none()
        );

        let mut track = mock_track("2", "Jealous Guy");
        track.album.as_mut().unwrap().images.large = Some(XL.to_string());
        let err = resolver
            .resolve(&track, &ArtworkPolicy::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, Error::ArtworkFetch(_)));
        assert!(!err.is_fatal());
    }

    #[tokio::test]
    async fn test_guard_removes_staged_file() {
        let dir = TempDir::new().unwrap();
        let resolver = resolver(&dir, Arc::new(MockFetcher::default()));
        let mut track = mock_track("1", "Imagine");
        track.album.as_mut().unwrap().artwork = Some(test_image(8, 8, ImageFormat::Jpeg));

        let resolved = resolver
            .resolve(&track, &ArtworkPolicy::default())
            .await
            .unwrap()
            .unwrap();
        let staged = resolved.guard.path().unwrap().to_path_buf();
        assert!(staged.exists());

        drop(resolved);
        assert!(!staged.exists());
    }
}
