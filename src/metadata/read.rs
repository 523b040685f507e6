//! Audio file metadata reading.
//!
//! Uses the lofty crate for format-independent tag access. Providers that
//! hand over files which already carry tags (the local catalog, mostly) use
//! this to populate a [`Track`].

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use lofty::file::{AudioFile, TaggedFileExt};
use lofty::picture::PictureType;
use lofty::probe::Probe;
use lofty::tag::{Accessor, ItemKey, Tag};

use crate::model::{Album, Artist, ArtistRole, AudioFormat, Role, Track};

/// Read a file's tags and audio properties into a fresh [`Track`].
///
/// Missing tags are left empty; filling defaults is the normalizer's job.
pub fn read_track(path: &Path) -> Result<Track> {
    // Probe the file to determine format and read tags
    let tagged_file = Probe::open(path)
        .context("Failed to open file for probing")?
        .read()
        .context("Failed to read file metadata")?;

    let mut track = Track {
        path: Some(path.to_path_buf()),
        format: AudioFormat::from_path(path),
        ..Default::default()
    };

    let properties = tagged_file.properties();
    track.metadata.duration = properties.duration();
    track.sample_rate = properties.sample_rate().unwrap_or(0);
    track.bit_depth = properties.bit_depth().unwrap_or(0);
    track.channels = properties.channels().unwrap_or(0);

    // Get the primary tag, or fall back to the first available tag
    let Some(tag) = tagged_file
        .primary_tag()
        .or_else(|| tagged_file.first_tag())
    else {
        return Ok(track);
    };

    apply_tag(&mut track, tag);
    Ok(track)
}

fn apply_tag(track: &mut Track, tag: &Tag) {
    track.title = tag.title().map(|s| s.to_string()).unwrap_or_default();
    track.version = text(tag, &ItemKey::TrackSubtitle);
    track.isrc = text(tag, &ItemKey::Isrc);

    track.artists = tag
        .get_strings(&ItemKey::TrackArtist)
        .filter(|s| !s.trim().is_empty())
        .map(|name| ArtistRole::new(Arc::new(Artist::new("", name)), Role::Main))
        .collect();

    let meta = &mut track.metadata;
    meta.genre = tag.genre().map(|s| s.to_string()).unwrap_or_default();
    meta.year = tag.year().unwrap_or(0);
    meta.track_number = tag.track().unwrap_or(0);
    meta.track_total = tag.track_total().unwrap_or(0);
    meta.disc_number = tag.disk().unwrap_or(0);
    meta.composer = text(tag, &ItemKey::Composer);
    meta.lyrics = text(tag, &ItemKey::Lyrics);
    meta.bpm = text(tag, &ItemKey::Bpm)
        .and_then(|s| s.parse::<f32>().ok())
        .map(|bpm| bpm.round().max(0.0) as u32)
        .unwrap_or(0);
    meta.replay_gain = text(tag, &ItemKey::ReplayGainTrackGain).and_then(|s| parse_gain(&s));

    if let Some(title) = tag.album() {
        let mut album = Album::new("", title.to_string());
        album.artists = tag
            .get_strings(&ItemKey::AlbumArtist)
            .filter(|s| !s.trim().is_empty())
            .map(|name| ArtistRole::new(Arc::new(Artist::new("", name)), Role::Main))
            .collect();
        album.release.label = text(tag, &ItemKey::Label);
        album.release.catalog_number = text(tag, &ItemKey::CatalogNumber);
        album.release.barcode = text(tag, &ItemKey::Barcode);

        // Prefer front cover, fall back to first picture
        let pictures = tag.pictures();
        album.artwork = pictures
            .iter()
            .find(|p| p.pic_type() == PictureType::CoverFront)
            .or_else(|| pictures.first())
            .map(|p| p.data().to_vec());

        track.album = Some(album);
    }
}

fn text(tag: &Tag, key: &ItemKey) -> Option<String> {
    tag.get_string(key)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// Parse a gain value such as "-5.23 dB".
fn parse_gain(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s.strip_suffix("dB").unwrap_or(s);
    s.trim().parse().ok()
}
