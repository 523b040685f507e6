//! Container-independent view of the values written to tags.

use chrono::{Datelike, NaiveDate};

use crate::model::Track;

/// Tag values derived from a [`Track`], empty values already dropped.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TagFields {
    pub title: String,
    pub version: Option<String>,
    pub artists: Vec<String>,
    pub album_artists: Vec<String>,
    pub album: Option<String>,
    pub genre: Option<String>,
    pub year: u32,
    /// Full release date when the provider has one matching `year`
    pub release_date: Option<NaiveDate>,
    pub original_year: Option<u32>,
    pub isrc: Option<String>,
    pub track_number: Option<u32>,
    pub track_total: Option<u32>,
    pub disc_number: Option<u32>,
    pub composer: Option<String>,
    pub lyrics: Option<String>,
    pub bpm: Option<u32>,
    pub length_ms: Option<u64>,
    pub label: Option<String>,
    pub barcode: Option<String>,
    pub catalog_number: Option<String>,
    pub fingerprint: Option<String>,
    pub external_id: Option<String>,
    /// Formatted as "-6.50 dB"
    pub replay_gain: Option<String>,
    /// iTunes advisory rating: "1" explicit, "0" none
    pub advisory: &'static str,
}

impl TagFields {
    pub fn from_track(track: &Track) -> Self {
        let meta = &track.metadata;
        let album = track.album.as_ref();
        let release = album.map(|a| &a.release);

        let year = meta.year;
        let release_date = release
            .and_then(|r| r.date)
            .filter(|d| year == 0 || d.year() == year as i32);

        Self {
            title: track.title.trim().to_string(),
            version: non_empty(track.version.as_deref()),
            artists: track.artist_names().into_iter().map(str::to_string).collect(),
            album_artists: track
                .album_artist_names()
                .into_iter()
                .map(str::to_string)
                .collect(),
            album: non_empty(album.map(|a| a.title.as_str())),
            genre: non_empty(Some(meta.genre.as_str())),
            year,
            release_date,
            original_year: positive(meta.original_year),
            isrc: non_empty(track.isrc.as_deref()),
            track_number: positive(meta.track_number),
            track_total: positive(meta.track_total),
            disc_number: positive(meta.disc_number),
            composer: non_empty(meta.composer.as_deref()),
            lyrics: non_empty(meta.lyrics.as_deref()),
            bpm: positive(meta.bpm),
            length_ms: Some(meta.duration.as_millis() as u64).filter(|ms| *ms > 0),
            label: non_empty(release.and_then(|r| r.label.as_deref())),
            barcode: non_empty(release.and_then(|r| r.barcode.as_deref())),
            catalog_number: non_empty(release.and_then(|r| r.catalog_number.as_deref())),
            fingerprint: non_empty(track.fingerprint.as_deref()),
            external_id: non_empty(track.external_id.as_deref()),
            replay_gain: meta.replay_gain.map(|gain| format!("{:.2} dB", gain)),
            advisory: if meta.explicit { "1" } else { "0" },
        }
    }

    /// Release date as "YYYY-MM-DD", or "YYYY" when only the year is known.
    pub fn date(&self) -> Option<String> {
        match (self.release_date, self.year) {
            (Some(date), _) => Some(date.format("%Y-%m-%d").to_string()),
            (None, 0) => None,
            (None, year) => Some(year.to_string()),
        }
    }

    /// Track number with total, e.g. "3/12".
    pub fn track_position(&self) -> Option<String> {
        position(self.track_number, self.track_total)
    }
}

fn position(number: Option<u32>, total: Option<u32>) -> Option<String> {
    match (number, total) {
        (Some(n), Some(t)) => Some(format!("{}/{}", n, t)),
        (Some(n), None) => Some(n.to_string()),
        _ => None,
    }
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn positive(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}
