//! Write a cover image file next to downloaded audio.
//!
//! The file name comes from a template such as `cover.jpg` or
//! `{artist} - {album}.jpg`. An existing file is never overwritten.

use std::path::{Path, PathBuf};

use super::{ArtworkPolicy, ImageMime, ResolvedArtwork, process};
use crate::error::Result;
use crate::metadata::{UNKNOWN_ALBUM, UNKNOWN_ARTIST};
use crate::model::Track;

/// Characters that are unsafe in file names on at least one platform
const UNSAFE_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Render the cover file name for `track`.
pub fn local_cover_name(template: &str, track: &Track) -> String {
    let artist = track
        .album_artist_names()
        .first()
        .map(|s| s.to_string())
        .unwrap_or_else(|| UNKNOWN_ARTIST.to_string());
    let album = track
        .album
        .as_ref()
        .map(|a| a.title.clone())
        .filter(|t| !t.trim().is_empty())
        .unwrap_or_else(|| UNKNOWN_ALBUM.to_string());

    template
        .replace("{artist}", &sanitize(&artist))
        .replace("{album}", &sanitize(&album))
}

fn sanitize(component: &str) -> String {
    component
        .chars()
        .map(|c| if UNSAFE_CHARS.contains(&c) { '_' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Save the cover beside `audio_path`, sized to `local_size`.
///
/// Returns the written path, or `None` when a file already exists. When the
/// local size matches the embedded size the staged image is copied as-is.
/// The extension always follows the image format actually written.
pub fn save_local_cover(
    audio_path: &Path,
    track: &Track,
    resolved: &ResolvedArtwork,
    template: &str,
    policy: &ArtworkPolicy,
    local_size: u32,
) -> Result<Option<PathBuf>> {
    let dir = audio_path.parent().unwrap_or(Path::new("."));
    let name = dir.join(local_cover_name(template, track));

    let staged = resolved.guard.path().filter(|_| local_size == policy.max_size);
    let (mime, data) = match staged {
        Some(_) => (resolved.artwork.mime, None),
        None => {
            let artwork = process(&resolved.original, &policy.with_max_size(local_size))?;
            (artwork.mime, Some(artwork.data))
        }
    };

    let dest = with_image_extension(name, mime);
    if dest.exists() {
        tracing::debug!("Cover file {:?} already exists, leaving it", dest);
        return Ok(None);
    }
    match (staged, data) {
        (_, Some(data)) => std::fs::write(&dest, data)?,
        (Some(staged), None) => {
            std::fs::copy(staged, &dest)?;
        }
        (None, None) => return Ok(None),
    }

    tracing::debug!("Saved cover file {:?}", dest);
    Ok(Some(dest))
}

/// Swap the extension of `path` for one matching `mime`, unless it already does.
fn with_image_extension(mut path: PathBuf, mime: ImageMime) -> PathBuf {
    let current = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase());
    let extensions = mime.extensions();
    if !current.is_some_and(|e| extensions.contains(&e.as_str())) {
        path.set_extension(extensions[0]);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cover::{ArtworkCache, ArtworkResolver, mocks::MockFetcher};
    use crate::test_utils::{mock_track, test_image};
    use image::{GenericImageView, ImageFormat};
    use std::sync::Arc;
    use std::time::Duration;
    use tempfile::TempDir;

    async fn resolved_for(track: &Track, cache: &TempDir) -> ResolvedArtwork {
        let resolver = ArtworkResolver::with_fetcher(
            ArtworkCache::new(cache.path(), Duration::from_secs(60)),
            Arc::new(MockFetcher::default()),
        );
        resolver
            .resolve(track, &ArtworkPolicy::default())
            .await
            .unwrap()
            .unwrap()
    }

    #[test]
    fn test_template_placeholders() {
        let mut track = mock_track("1", "Imagine");
        track.album.as_mut().unwrap().title = "Live/Peace: Toronto".to_string();

        assert_eq!(local_cover_name("cover.jpg", &track), "cover.jpg");
        assert_eq!(
            local_cover_name("{artist} - {album}.jpg", &track),
            "John Lennon - Live_Peace_ Toronto.jpg"
        );
    }

    #[tokio::test]
    async fn test_save_local_cover_at_local_size() {
        let dir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let audio = dir.path().join("01.flac");

        let mut track = mock_track("1", "Imagine");
        track.album.as_mut().unwrap().artwork = Some(test_image(1600, 1600, ImageFormat::Jpeg));
        let resolved = resolved_for(&track, &cache).await;
        assert_eq!(resolved.artwork.width, 1000);

        let written = save_local_cover(
            &audio,
            &track,
            &resolved,
            "cover.jpg",
            &ArtworkPolicy::default(),
            1200,
        )
        .unwrap()
        .unwrap();

        let img = image::open(&written).unwrap();
        assert_eq!(img.dimensions(), (1200, 1200));
    }

    #[tokio::test]
    async fn test_existing_cover_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        std::fs::write(dir.path().join("cover.jpg"), b"keep me").unwrap();

        let mut track = mock_track("1", "Imagine");
        track.album.as_mut().unwrap().artwork = Some(test_image(50, 50, ImageFormat::Jpeg));
        let resolved = resolved_for(&track, &cache).await;

        let result = save_local_cover(
            &dir.path().join("01.flac"),
            &track,
            &resolved,
            "cover.jpg",
            &ArtworkPolicy::default(),
            1000,
        )
        .unwrap();
        assert!(result.is_none());
        assert_eq!(std::fs::read(dir.path().join("cover.jpg")).unwrap(), b"keep me");
    }

    #[tokio::test]
    async fn test_matching_size_copies_staged_image() {
        let dir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let mut track = mock_track("1", "Imagine");
        track.album.as_mut().unwrap().artwork = Some(test_image(1400, 700, ImageFormat::Png));
        let resolved = resolved_for(&track, &cache).await;

        let written = save_local_cover(
            &dir.path().join("01.flac"),
            &track,
            &resolved,
            "folder.jpg",
            &ArtworkPolicy::default(),
            1000,
        )
        .unwrap()
        .unwrap();
        assert_eq!(std::fs::read(written).unwrap(), resolved.artwork.data);
    }

    #[tokio::test]
    async fn test_png_cover_gets_png_extension() {
        let dir = TempDir::new().unwrap();
        let cache = TempDir::new().unwrap();
        let policy = ArtworkPolicy {
            convert_to_jpeg: false,
            ..ArtworkPolicy::default()
        };
        let mut track = mock_track("1", "Imagine");
        track.album.as_mut().unwrap().artwork = Some(test_image(64, 64, ImageFormat::Png));
        let resolver = ArtworkResolver::with_fetcher(
            ArtworkCache::new(cache.path(), Duration::from_secs(60)),
            Arc::new(MockFetcher::default()),
        );
        let resolved = resolver.resolve(&track, &policy).await.unwrap().unwrap();
        assert_eq!(resolved.artwork.mime, ImageMime::Png);

        let written = save_local_cover(
            &dir.path().join("01.flac"),
            &track,
            &resolved,
            "cover.jpg",
            &policy,
            policy.max_size,
        )
        .unwrap()
        .unwrap();

        assert_eq!(written, dir.path().join("cover.png"));
        assert!(!dir.path().join("cover.jpg").exists());
        assert_eq!(
            image::ImageFormat::from_path(&written).unwrap(),
            ImageFormat::Png
        );
    }

    #[test]
    fn test_extension_follows_format() {
        let jpeg = with_image_extension(PathBuf::from("a/cover.JPEG"), ImageMime::Jpeg);
        assert_eq!(jpeg, PathBuf::from("a/cover.JPEG"));
        let png = with_image_extension(PathBuf::from("a/cover.jpg"), ImageMime::Png);
        assert_eq!(png, PathBuf::from("a/cover.png"));
        let bare = with_image_extension(PathBuf::from("a/cover"), ImageMime::Jpeg);
        assert_eq!(bare, PathBuf::from("a/cover.jpg"));
    }
}
