//! A downloader serving a local catalog directory.
//!
//! The catalog is laid out as `<artist>/<album>/<track file>`, with
//! playlists stored as `.m3u` files anywhere below the root. IDs are
//! catalog-relative paths using `/` separators:
//!
//! | Kind     | ID example                     |
//! |----------|--------------------------------|
//! | track    | `John Lennon/Imagine/01.flac`  |
//! | album    | `John Lennon/Imagine`          |
//! | artist   | `John Lennon`                  |
//! | playlist | `playlists/road trip.m3u`      |
//!
//! Direct links are `file://` URLs pointing inside the catalog.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use walkdir::WalkDir;

use super::traits::{ByteProgress, Capabilities, Downloader, DownloaderError, DownloaderStatus};
use crate::metadata::read_track;
use crate::model::{Album, Artist, ArtistRole, Role, Track};

const COPY_CHUNK: usize = 64 * 1024;
const AUDIO_EXTENSIONS: &[&str] = &["mp3", "flac"];

/// Serves tracks from a directory tree on disk.
pub struct LocalDownloader {
    catalog: PathBuf,
}

impl LocalDownloader {
    pub fn new(catalog: impl Into<PathBuf>) -> Self {
        Self {
            catalog: catalog.into(),
        }
    }

    pub fn catalog(&self) -> &Path {
        &self.catalog
    }

    /// Map a catalog ID to a path, rejecting anything that escapes the root.
    fn resolve(&self, id: &str) -> Result<PathBuf, DownloaderError> {
        let rel = Path::new(id.trim_matches('/'));
        if rel
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(DownloaderError::NotFound(id.to_string()));
        }
        let path = self.catalog.join(rel);
        if path.exists() {
            Ok(path)
        } else {
            Err(DownloaderError::NotFound(id.to_string()))
        }
    }

    fn id_for(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.catalog).ok()?;
        let parts: Vec<_> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }

    fn track_from_file(&self, path: &Path) -> Result<Track, DownloaderError> {
        let mut track = read_track(path).map_err(|e| DownloaderError::Provider(format!("{:#}", e)))?;
        let id = self
            .id_for(path)
            .ok_or_else(|| DownloaderError::NotFound(path.display().to_string()))?;
        let parts: Vec<&str> = id.split('/').collect();

        if track.title.trim().is_empty() {
            track.title = path
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default();
        }

        // Fall back to the directory layout for untagged files
        if let [artist, album, _file] = parts.as_slice() {
            if track.artist_names().is_empty() {
                let artist = Arc::new(Artist::new(*artist, *artist));
                track.artists = vec![ArtistRole::new(artist, Role::Main)];
            }
            let album_id = format!("{}/{}", artist, album);
            match track.album.as_mut() {
                Some(existing) => existing.id = album_id,
                None => {
                    let mut fallback = Album::new(album_id, *album);
                    fallback.artists = vec![ArtistRole::main(*artist)];
                    track.album = Some(fallback);
                }
            }
        }

        track.external_id = Some(format!("local:{}", id));
        track.id = id;
        Ok(track)
    }

    fn tracks_under(&self, dir: &Path) -> Result<Vec<Track>, DownloaderError> {
        audio_files(dir)
            .iter()
            .map(|path| self.track_from_file(path))
            .collect()
    }

    fn playlist_entries(&self, playlist: &Path) -> Result<Vec<PathBuf>, DownloaderError> {
        let contents = std::fs::read_to_string(playlist)?;
        let base = playlist.parent().unwrap_or(&self.catalog);
        Ok(contents
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(|line| {
                let entry = Path::new(line);
                if entry.is_absolute() {
                    lexical(entry)
                } else {
                    lexical(&base.join(entry))
                }
            })
            .filter(|path| {
                let inside = path.starts_with(&self.catalog) && path.is_file();
                if !inside {
                    tracing::debug!("Skipping playlist entry {:?}", path);
                }
                inside
            })
            .collect())
    }

    fn link_target(&self, url: &str) -> Result<PathBuf, DownloaderError> {
        let path = url
            .strip_prefix("file://")
            .ok_or_else(|| DownloaderError::NotFound(format!("not a file:// link: {}", url)))?;
        let rel = Path::new(path)
            .strip_prefix(&self.catalog)
            .map_err(|_| DownloaderError::NotFound(format!("outside catalog: {}", url)))?;
        self.resolve(&rel.to_string_lossy())
    }

    async fn copy_into(
        &self,
        track: Track,
        dir: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Track, DownloaderError> {
        let source = track
            .path
            .clone()
            .ok_or_else(|| DownloaderError::NotFound(track.id.clone()))?;
        // <dir>/<artist>/<album>/<file>, mirroring the catalog
        let dest = dir.join(track.id.split('/').collect::<PathBuf>());
        let parent = dest.parent().unwrap_or(dir);

        tokio::fs::create_dir_all(parent).await?;
        if same_file(&source, &dest).await {
            let total = tokio::fs::metadata(&source).await?.len();
            if let Some(progress) = progress {
                progress(total, total);
            }
            tracing::debug!("{} is already in place at {:?}", track.id, dest);
            return Ok(track);
        }
        let mut reader = tokio::fs::File::open(&source).await?;
        let total = reader.metadata().await?.len();
        let mut writer = tokio::fs::File::create(&dest).await?;

        let mut buf = vec![0u8; COPY_CHUNK];
        let mut copied = 0u64;
        if let Some(progress) = progress {
            progress(0, total);
        }
        loop {
            let n = reader.read(&mut buf).await?;
            if n == 0 {
                break;
            }
            writer.write_all(&buf[..n]).await?;
            copied += n as u64;
            if let Some(progress) = progress {
                progress(copied, total);
            }
        }
        writer.flush().await?;

        tracing::debug!("Copied {} ({} bytes) to {:?}", track.id, copied, dest);
        Ok(Track {
            path: Some(dest),
            ..track
        })
    }

    async fn copy_all(
        &self,
        tracks: Vec<Track>,
        dir: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<Track>, DownloaderError> {
        let total = tracks.len().max(1) as u64;
        let mut done = Vec::with_capacity(tracks.len());
        for (i, track) in tracks.into_iter().enumerate() {
            let id = track.id.clone();
            match self.copy_into(track, dir, None).await {
                Ok(track) => done.push(track),
                Err(e) => tracing::warn!("Skipping {}: {}", id, e),
            }
            if let Some(progress) = progress {
                progress((i as u64 + 1) * 100 / total, 100);
            }
        }
        Ok(done)
    }
}

/// Whether `dest` already resolves to `source`.
async fn same_file(source: &Path, dest: &Path) -> bool {
    match (tokio::fs::canonicalize(source).await, tokio::fs::canonicalize(dest).await) {
        (Ok(source), Ok(dest)) => source == dest,
        _ => false,
    }
}

fn is_audio(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| AUDIO_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

fn audio_files(dir: &Path) -> Vec<PathBuf> {
    if dir.is_file() {
        return if is_audio(dir) {
            vec![dir.to_path_buf()]
        } else {
            Vec::new()
        };
    }
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && is_audio(e.path()))
        .map(|e| e.into_path())
        .collect()
}

/// Directories exactly `depth` levels below `root`, sorted by name.
fn dirs_at(root: &Path, depth: usize) -> Vec<PathBuf> {
    WalkDir::new(root)
        .min_depth(depth)
        .max_depth(depth)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_dir())
        .map(|e| e.into_path())
        .collect()
}

/// Resolve `.` and `..` without touching the filesystem.
fn lexical(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::ParentDir => {
                out.pop();
            }
            Component::CurDir => {}
            other => out.push(other),
        }
    }
    out
}

fn dir_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn contains_ci(haystack: &str, query: &str) -> bool {
    haystack.to_lowercase().contains(query)
}

#[async_trait]
impl Downloader for LocalDownloader {
    fn name(&self) -> &str {
        "local"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            supports_search: true,
            supports_artist_search: true,
            supports_direct_links: true,
            supports_chart_tracks: false,
            supports_track_listing: true,
            supports_playlists: true,
        }
    }

    async fn status(&self) -> DownloaderStatus {
        if self.catalog.is_dir() {
            DownloaderStatus::ok(format!("catalog at {}", self.catalog.display()))
        } else {
            DownloaderStatus::unhealthy(format!("catalog {} not found", self.catalog.display()))
        }
    }

    async fn search_tracks(&self, query: &str, limit: usize) -> Result<Vec<Track>, DownloaderError> {
        let query = query.to_lowercase();
        let mut found = Vec::new();
        for path in audio_files(&self.catalog) {
            if found.len() >= limit {
                break;
            }
            let track = match self.track_from_file(&path) {
                Ok(track) => track,
                Err(e) => {
                    tracing::debug!("Unreadable catalog file {:?}: {}", path, e);
                    continue;
                }
            };
            let album = track.album.as_ref().map(|a| a.title.as_str()).unwrap_or("");
            if contains_ci(&track.title, &query)
                || contains_ci(album, &query)
                || track.artist_names().iter().any(|a| contains_ci(a, &query))
            {
                found.push(track);
            }
        }
        Ok(found)
    }

    async fn search_albums(&self, query: &str, limit: usize) -> Result<Vec<Album>, DownloaderError> {
        let query = query.to_lowercase();
        Ok(dirs_at(&self.catalog, 2)
            .into_iter()
            .filter(|dir| contains_ci(&dir_name(dir), &query))
            .filter_map(|dir| {
                let id = self.id_for(&dir)?;
                let mut album = Album::new(id, dir_name(&dir));
                if let Some(parent) = dir.parent() {
                    album.artists = vec![ArtistRole::main(dir_name(parent))];
                }
                Some(album)
            })
            .take(limit)
            .collect())
    }

    async fn search_artists(&self, query: &str, limit: usize) -> Result<Vec<Artist>, DownloaderError> {
        let query = query.to_lowercase();
        Ok(dirs_at(&self.catalog, 1)
            .into_iter()
            .map(|dir| dir_name(&dir))
            .filter(|name| contains_ci(name, &query))
            .map(|name| Artist::new(name.clone(), name))
            .take(limit)
            .collect())
    }

    async fn resolve_link(&self, url: &str) -> Result<Vec<Track>, DownloaderError> {
        let target = self.link_target(url)?;
        self.tracks_under(&target)
    }

    async fn album_tracks(&self, album_id: &str) -> Result<Vec<Track>, DownloaderError> {
        let dir = self.resolve(album_id)?;
        self.tracks_under(&dir)
    }

    async fn artist_albums(&self, artist_id: &str) -> Result<Vec<Album>, DownloaderError> {
        let dir = self.resolve(artist_id)?;
        let artist = dir_name(&dir);
        Ok(dirs_at(&dir, 1)
            .into_iter()
            .filter_map(|album_dir| {
                let mut album = Album::new(self.id_for(&album_dir)?, dir_name(&album_dir));
                album.artists = vec![ArtistRole::main(artist.clone())];
                Some(album)
            })
            .collect())
    }

    async fn playlist_tracks(&self, playlist_id: &str) -> Result<Vec<Track>, DownloaderError> {
        let playlist = self.resolve(playlist_id)?;
        self.playlist_entries(&playlist)?
            .iter()
            .map(|path| self.track_from_file(path))
            .collect()
    }

    async fn download_track(
        &self,
        track_id: &str,
        dir: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Track, DownloaderError> {
        let source = self.resolve(track_id)?;
        if !source.is_file() || !is_audio(&source) {
            return Err(DownloaderError::NotFound(track_id.to_string()));
        }
        let track = self.track_from_file(&source)?;
        self.copy_into(track, dir, progress).await
    }

    async fn download_album(
        &self,
        album_id: &str,
        dir: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<Track>, DownloaderError> {
        let tracks = self.album_tracks(album_id).await?;
        self.copy_all(tracks, dir, progress).await
    }

    async fn download_artist(
        &self,
        artist_id: &str,
        dir: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<Track>, DownloaderError> {
        let root = self.resolve(artist_id)?;
        let tracks = self.tracks_under(&root)?;
        self.copy_all(tracks, dir, progress).await
    }

    async fn download_link(
        &self,
        url: &str,
        dir: &Path,
        progress: Option<&ByteProgress<'_>>,
    ) -> Result<Vec<Track>, DownloaderError> {
        let tracks = self.resolve_link(url).await?;
        self.copy_all(tracks, dir, progress).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{write_minimal_flac, write_minimal_mp3};
    use parking_lot::Mutex;
    use tempfile::TempDir;

    fn catalog() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        let album = dir.path().join("John Lennon").join("Imagine");
        std::fs::create_dir_all(&album).unwrap();
        write_minimal_flac(&album.join("01 Imagine.flac")).unwrap();
        write_minimal_mp3(&album.join("02 Crippled Inside.mp3")).unwrap();
        std::fs::write(album.join("notes.txt"), "liner notes").unwrap();

        let other = dir.path().join("Yoko Ono").join("Fly");
        std::fs::create_dir_all(&other).unwrap();
        write_minimal_flac(&other.join("Midsummer New York.flac")).unwrap();

        let lists = dir.path().join("playlists");
        std::fs::create_dir_all(&lists).unwrap();
        std::fs::write(
            lists.join("mix.m3u"),
            "#EXTM3U\n../Yoko Ono/Fly/Midsummer New York.flac\n../missing.flac\n../John Lennon/Imagine/01 Imagine.flac\n",
        )
        .unwrap();
        dir
    }

    #[tokio::test]
    async fn test_status_reflects_catalog() {
        let dir = catalog();
        assert!(LocalDownloader::new(dir.path()).status().await.healthy);
        assert!(!LocalDownloader::new(dir.path().join("nope")).status().await.healthy);
    }

    #[tokio::test]
    async fn test_album_tracks_use_layout_fallback() {
        let dir = catalog();
        let local = LocalDownloader::new(dir.path());

        let tracks = local.album_tracks("John Lennon/Imagine").await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].id, "John Lennon/Imagine/01 Imagine.flac");
        assert_eq!(tracks[0].title, "01 Imagine");
        assert_eq!(tracks[0].artist_names(), vec!["John Lennon"]);
        assert_eq!(tracks[0].album.as_ref().unwrap().id, "John Lennon/Imagine");
        assert_eq!(tracks[0].metadata.year, 0);
    }

    #[tokio::test]
    async fn test_download_track_copies_with_progress() {
        let dir = catalog();
        let out = tempfile::tempdir().unwrap();
        let local = LocalDownloader::new(dir.path());
        let seen = Mutex::new(Vec::new());
        let progress = |done: u64, total: u64| seen.lock().push((done, total));

        let track = local
            .download_track("John Lennon/Imagine/01 Imagine.flac", &out.path().join("new"), Some(&progress))
            .await
            .unwrap();

        let path = track.path.unwrap();
        assert!(path.starts_with(out.path()));
        assert!(path.exists());

        let seen = seen.lock();
        let (last_done, total) = *seen.last().unwrap();
        assert_eq!(last_done, total);
        assert!(seen.windows(2).all(|w| w[0].0 <= w[1].0));
    }

    #[tokio::test]
    async fn test_path_escape_rejected() {
        let dir = catalog();
        let out = tempfile::tempdir().unwrap();
        let local = LocalDownloader::new(dir.path().join("John Lennon"));

        let err = local
            .download_track("../Yoko Ono/Fly/Midsummer New York.flac", out.path(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, DownloaderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_search() {
        let dir = catalog();
        let local = LocalDownloader::new(dir.path());

        let tracks = local.search_tracks("imagine", 10).await.unwrap();
        assert_eq!(tracks.len(), 2);

        let albums = local.search_albums("fly", 10).await.unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].id, "Yoko Ono/Fly");

        let artists = local.search_artists("lennon", 10).await.unwrap();
        assert_eq!(artists.len(), 1);
        assert_eq!(artists[0].name, "John Lennon");
    }

    #[tokio::test]
    async fn test_playlist_skips_missing_entries() {
        let dir = catalog();
        let local = LocalDownloader::new(dir.path());

        let tracks = local.playlist_tracks("playlists/mix.m3u").await.unwrap();
        let titles: Vec<_> = tracks.iter().map(|t| t.title.as_str()).collect();
        assert_eq!(titles, vec!["Midsummer New York", "01 Imagine"]);
        assert_eq!(tracks[0].id, "Yoko Ono/Fly/Midsummer New York.flac");
    }

    #[tokio::test]
    async fn test_artist_albums_and_bulk_download() {
        let dir = catalog();
        let out = tempfile::tempdir().unwrap();
        let local = LocalDownloader::new(dir.path());

        let albums = local.artist_albums("John Lennon").await.unwrap();
        assert_eq!(albums.len(), 1);
        assert_eq!(albums[0].title, "Imagine");

        let tracks = local.download_artist("John Lennon", out.path(), None).await.unwrap();
        assert_eq!(tracks.len(), 2);
        assert!(tracks.iter().all(|t| t.path.as_ref().unwrap().exists()));
        assert_eq!(
            tracks[0].path.as_deref(),
            Some(out.path().join("John Lennon").join("Imagine").join("01 Imagine.flac").as_path())
        );
    }

    #[tokio::test]
    async fn test_file_link() {
        let dir = catalog();
        let local = LocalDownloader::new(dir.path());
        let url = format!("file://{}", dir.path().join("Yoko Ono").display());

        let tracks = local.resolve_link(&url).await.unwrap();
        assert_eq!(tracks.len(), 1);

        let err = local.resolve_link("https://example.com/track/1").await.unwrap_err();
        assert!(matches!(err, DownloaderError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_download_into_catalog_leaves_source_intact() {
        let dir = catalog();
        let local = LocalDownloader::new(dir.path());
        let source = dir.path().join("John Lennon").join("Imagine").join("01 Imagine.flac");
        let before = std::fs::read(&source).unwrap();

        let track = local
            .download_track("John Lennon/Imagine/01 Imagine.flac", dir.path(), None)
            .await
            .unwrap();

        assert_eq!(track.path.as_deref(), Some(source.as_path()));
        assert_eq!(std::fs::read(&source).unwrap(), before);
    }
}
