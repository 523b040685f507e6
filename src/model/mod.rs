//! Core data models for downloaded content.
//!
//! Defines the primary entities: [`Track`], [`Album`], [`Artist`] and the
//! [`ArtistRole`] pairing that links them.
//!
//! Instances are built fresh by a downloader for every download call. The
//! metadata normalizer and the artwork resolver mutate them in place; after
//! that they are handed read-only to the tag writer and dropped when the
//! pipeline returns.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, Utc};

/// An artist as reported by a provider.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Artist {
    /// Provider-specific ID
    pub id: String,
    /// Display name
    pub name: String,
    /// Artist picture, used as a last-resort cover
    pub image_url: Option<String>,
}

impl Artist {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            image_url: None,
        }
    }
}

/// How an artist contributed to a track or album.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Role {
    #[default]
    Main,
    Featured,
    Remixer,
    Other(String),
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Main => "main",
            Self::Featured => "featured",
            Self::Remixer => "remixer",
            Self::Other(role) => role,
        }
    }

    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "main" | "primary" => Self::Main,
            "featured" | "feat" | "ft" => Self::Featured,
            "remixer" | "remix" => Self::Remixer,
            other => Self::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An artist reference paired with its role.
///
/// The artist is shared: the same `Arc<Artist>` may sit under a track and
/// under its album.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtistRole {
    pub artist: Arc<Artist>,
    pub role: Role,
}

impl ArtistRole {
    pub fn new(artist: Arc<Artist>, role: Role) -> Self {
        Self { artist, role }
    }

    /// Shorthand for a main artist built from a bare name.
    pub fn main(name: impl Into<String>) -> Self {
        Self {
            artist: Arc::new(Artist::new("", name)),
            role: Role::Main,
        }
    }

    pub fn name(&self) -> &str {
        &self.artist.name
    }
}

/// Release type of an album.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AlbumType {
    #[default]
    Default,
    Compilation,
    Soundtrack,
    Ep,
    Single,
}

impl AlbumType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Default => "album",
            Self::Compilation => "compilation",
            Self::Soundtrack => "soundtrack",
            Self::Ep => "ep",
            Self::Single => "single",
        }
    }
}

/// Release details of an album.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ReleaseInfo {
    pub date: Option<NaiveDate>,
    pub label: Option<String>,
    pub catalog_number: Option<String>,
    pub barcode: Option<String>,
    pub country: Option<String>,
    pub status: Option<String>,
}

/// Cover image URLs published by a provider, smallest to largest.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AlbumImages {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
    pub xl: Option<String>,
}

impl AlbumImages {
    /// The largest available image URL.
    pub fn best(&self) -> Option<&str> {
        [&self.xl, &self.large, &self.medium, &self.small]
            .into_iter()
            .flatten()
            .map(String::as_str)
            .find(|url| !url.trim().is_empty())
    }
}

/// An album as reported by a provider.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Album {
    pub id: String,
    pub title: String,
    pub album_type: AlbumType,
    pub artists: Vec<ArtistRole>,
    pub release: ReleaseInfo,
    pub images: AlbumImages,
    /// Raw cover bytes when the provider ships them with the download
    pub artwork: Option<Vec<u8>>,
    pub genre: Option<String>,
}

impl Album {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// The first main artist, falling back to the first artist of any role.
    pub fn primary_artist(&self) -> Option<&Artist> {
        primary(&self.artists)
    }
}

/// Per-track descriptive metadata.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Metadata {
    pub composer: Option<String>,
    pub genre: String,
    /// Release year, zero when unknown
    pub year: u32,
    pub duration: Duration,
    /// Original release year, zero when unknown
    pub original_year: u32,
    pub disc_number: u32,
    pub track_number: u32,
    pub track_total: u32,
    pub lyrics: Option<String>,
    pub explicit: bool,
    pub bpm: u32,
    /// Track gain in dB
    pub replay_gain: Option<f64>,
}

/// Audio container format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AudioFormat {
    Mp3,
    Flac,
    Other(String),
    #[default]
    Unknown,
}

impl AudioFormat {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "mp3" => Self::Mp3,
            "flac" => Self::Flac,
            "" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map(Self::from_extension)
            .unwrap_or(Self::Unknown)
    }

    pub fn extension(&self) -> &str {
        match self {
            Self::Mp3 => "mp3",
            Self::Flac => "flac",
            Self::Other(ext) => ext,
            Self::Unknown => "",
        }
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => f.write_str("unknown"),
            other => f.write_str(other.extension()),
        }
    }
}

/// A single track produced by a downloader.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    /// Provider-specific ID
    pub id: String,
    /// Where the provider wrote the audio file
    pub path: Option<PathBuf>,
    pub title: String,
    /// Version suffix such as "Remastered 2009" or "Live"
    pub version: Option<String>,
    pub artists: Vec<ArtistRole>,
    pub album: Option<Album>,
    pub metadata: Metadata,
    pub isrc: Option<String>,
    /// Chromaprint fingerprint string
    pub fingerprint: Option<String>,
    /// The provider's own identifier, written as a user-defined tag
    pub external_id: Option<String>,
    pub format: AudioFormat,
    pub sample_rate: u32,
    pub bit_depth: u8,
    pub channels: u8,
    pub attributes: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Default for Track {
    fn default() -> Self {
        let now = Utc::now();
        Self {
            id: String::new(),
            path: None,
            title: String::new(),
            version: None,
            artists: Vec::new(),
            album: None,
            metadata: Metadata::default(),
            isrc: None,
            fingerprint: None,
            external_id: None,
            format: AudioFormat::Unknown,
            sample_rate: 0,
            bit_depth: 0,
            channels: 0,
            attributes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Track {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    /// Title with the version appended, e.g. "Help! (Remastered 2009)".
    pub fn full_title(&self) -> String {
        match self.version.as_deref().map(str::trim) {
            Some(version) if !version.is_empty() => format!("{} ({})", self.title, version),
            _ => self.title.clone(),
        }
    }

    pub fn primary_artist(&self) -> Option<&Artist> {
        primary(&self.artists)
    }

    /// Non-blank artist names in credit order.
    pub fn artist_names(&self) -> Vec<&str> {
        names(&self.artists)
    }

    /// Non-blank album artist names, falling back to the main track artists.
    pub fn album_artist_names(&self) -> Vec<&str> {
        let album_artists = self
            .album
            .as_ref()
            .map(|a| names(&a.artists))
            .unwrap_or_default();
        if !album_artists.is_empty() {
            return album_artists;
        }
        self.artists
            .iter()
            .filter(|a| a.role == Role::Main)
            .map(ArtistRole::name)
            .filter(|n| !n.trim().is_empty())
            .collect()
    }

    /// Container format, falling back to the file extension.
    pub fn effective_format(&self) -> AudioFormat {
        match (&self.format, &self.path) {
            (AudioFormat::Unknown, Some(path)) => AudioFormat::from_path(path),
            (format, _) => format.clone(),
        }
    }

    /// "Artist - Title" label used in logs and job names.
    pub fn display_name(&self) -> String {
        match self.primary_artist() {
            Some(artist) if !artist.name.trim().is_empty() => {
                format!("{} - {}", artist.name, self.full_title())
            }
            _ => self.full_title(),
        }
    }
}

fn primary(artists: &[ArtistRole]) -> Option<&Artist> {
    artists
        .iter()
        .find(|a| a.role == Role::Main)
        .or_else(|| artists.first())
        .map(|a| a.artist.as_ref())
}

fn names(artists: &[ArtistRole]) -> Vec<&str> {
    artists
        .iter()
        .map(ArtistRole::name)
        .filter(|n| !n.trim().is_empty())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_title_with_version() {
        let mut track = Track::new("1", "Help!");
        assert_eq!(track.full_title(), "Help!");

        track.version = Some("Remastered 2009".to_string());
        assert_eq!(track.full_title(), "Help! (Remastered 2009)");

        track.version = Some("  ".to_string());
        assert_eq!(track.full_title(), "Help!");
    }

    #[test]
    fn test_primary_artist_prefers_main_role() {
        let mut track = Track::new("1", "Song");
        track.artists = vec![
            ArtistRole::new(Arc::new(Artist::new("2", "Guest")), Role::Featured),
            ArtistRole::main("Headliner"),
        ];
        assert_eq!(track.primary_artist().unwrap().name, "Headliner");
        assert_eq!(track.display_name(), "Headliner - Song");
    }

    #[test]
    fn test_album_artist_fallback() {
        let mut track = Track::new("1", "Song");
        track.artists = vec![
            ArtistRole::main("A"),
            ArtistRole::new(Arc::new(Artist::new("", "B")), Role::Featured),
        ];
        assert_eq!(track.album_artist_names(), vec!["A"]);

        let mut album = Album::new("10", "Record");
        album.artists = vec![ArtistRole::main("Various Artists")];
        track.album = Some(album);
        assert_eq!(track.album_artist_names(), vec!["Various Artists"]);
    }

    #[test]
    fn test_shared_artist_reference() {
        let artist = Arc::new(Artist::new("7", "John Lennon"));
        let mut album = Album::new("1", "Imagine");
        album.artists.push(ArtistRole::new(Arc::clone(&artist), Role::Main));
        let mut track = Track::new("2", "Imagine");
        track.artists.push(ArtistRole::new(Arc::clone(&artist), Role::Main));
        track.album = Some(album);

        assert_eq!(Arc::strong_count(&artist), 3);
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(AudioFormat::from_path(Path::new("/a/b.MP3")), AudioFormat::Mp3);
        assert_eq!(AudioFormat::from_path(Path::new("b.flac")), AudioFormat::Flac);
        assert_eq!(
            AudioFormat::from_path(Path::new("b.ogg")),
            AudioFormat::Other("ogg".to_string())
        );
        assert_eq!(AudioFormat::from_path(Path::new("noext")), AudioFormat::Unknown);

        let mut track = Track::new("1", "x");
        track.path = Some(PathBuf::from("/tmp/x.flac"));
        assert_eq!(track.effective_format(), AudioFormat::Flac);
    }

    #[test]
    fn test_best_image_url() {
        let images = AlbumImages {
            small: Some("s".into()),
            medium: Some("m".into()),
            large: Some(String::new()),
            xl: None,
        };
        assert_eq!(images.best(), Some("m"));
        assert_eq!(AlbumImages::default().best(), None);
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("Main"), Role::Main);
        assert_eq!(Role::parse("feat"), Role::Featured);
        assert_eq!(Role::parse("Remixer"), Role::Remixer);
        assert_eq!(Role::parse("producer"), Role::Other("producer".into()));
    }
}
