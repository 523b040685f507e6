//! Track metadata normalization and validation.
//!
//! Two pure operations run, in this order, on every track before it is
//! tagged:
//!
//! 1. [`ensure_defaults`] substitutes placeholders for a missing artist,
//!    album and genre.
//! 2. [`validate_required`] rejects tracks still lacking a title, artist,
//!    album or year.
//!
//! The year "default" is zero, which the validator still reports as missing.
//! A track whose provider gave no year therefore never reaches the tag
//! writer; the pipeline skips it (batch) or fails the job (single track).
//!
//! Reading tags back from files lives in [`read`].

pub mod read;

pub use read::read_track;

use std::sync::Arc;

use crate::error::{Error, MissingField, MissingFields, Result};
use crate::model::{Album, Artist, ArtistRole, Role, Track};

pub const UNKNOWN_ARTIST: &str = "Unknown Artist";
pub const UNKNOWN_ALBUM: &str = "Unknown Album";
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Year used when the provider supplied none.
///
/// Zero is also what [`validate_required`] treats as missing, so this
/// fallback never satisfies validation.
pub const DEFAULT_YEAR: u32 = 0;

/// Fill placeholders for missing artist, album and genre.
pub fn ensure_defaults(track: &mut Track) {
    track.artists.retain(|a| !a.name().trim().is_empty());
    if track.artists.is_empty() {
        tracing::debug!("Track {} has no artist, using placeholder", track.id);
        track.artists.push(ArtistRole::new(
            Arc::new(Artist::new("", UNKNOWN_ARTIST)),
            Role::Main,
        ));
    }

    match track.album.as_mut() {
        Some(album) if album.title.trim().is_empty() => {
            album.title = UNKNOWN_ALBUM.to_string();
        }
        Some(_) => {}
        None => {
            track.album = Some(Album::new("", UNKNOWN_ALBUM));
        }
    }

    if track.metadata.genre.trim().is_empty() {
        track.metadata.genre = track
            .album
            .as_ref()
            .and_then(|a| a.genre.clone())
            .filter(|g| !g.trim().is_empty())
            .unwrap_or_else(|| UNKNOWN_GENRE.to_string());
    }

    if track.metadata.year == 0 {
        track.metadata.year = DEFAULT_YEAR;
    }
}

/// Fields absent from `track`, in reporting order.
pub fn missing_fields(track: &Track) -> MissingFields {
    let mut missing = Vec::new();

    if track.title.trim().is_empty() {
        missing.push(MissingField::Title);
    }
    if track.artist_names().is_empty() {
        missing.push(MissingField::Artist);
    }
    if track
        .album
        .as_ref()
        .is_none_or(|a| a.title.trim().is_empty())
    {
        missing.push(MissingField::Album);
    }
    if track.metadata.year == 0 {
        missing.push(MissingField::Year);
    }

    MissingFields(missing)
}

/// Fail with [`Error::MissingMetadata`] listing every absent field.
pub fn validate_required(track: &Track) -> Result<()> {
    let missing = missing_fields(track);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(Error::MissingMetadata(missing))
    }
}

/// Apply [`ensure_defaults`] then [`validate_required`].
pub fn normalize(track: &mut Track) -> Result<()> {
    ensure_defaults(track);
    validate_required(track)
}
