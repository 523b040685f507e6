//! ID3v2 tag writing for MP3 files.
//!
//! | Field          | Frame                          |
//! |----------------|--------------------------------|
//! | title          | TIT2                           |
//! | version        | TIT3                           |
//! | artists        | TPE1 (null-separated)          |
//! | album artists  | TPE2 (null-separated)          |
//! | album          | TALB                           |
//! | genre          | TCON                           |
//! | date           | TDRC                           |
//! | original year  | TDOR                           |
//! | ISRC           | TSRC                           |
//! | track / total  | TRCK                           |
//! | disc           | TPOS                           |
//! | composer       | TCOM                           |
//! | BPM            | TBPM                           |
//! | length (ms)    | TLEN                           |
//! | label          | TPUB                           |
//! | lyrics         | USLT                           |
//! | everything else| TXXX with a description        |
//! | cover          | APIC (front cover)             |

use std::borrow::Cow;
use std::fs::File;
use std::path::Path;

use chrono::{Datelike, NaiveDate};
use lofty::TextEncoding;
use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::id3::v2::{
    Frame, FrameId, Id3v2Tag, TextInformationFrame, TimestampFrame, UnsynchronizedTextFrame,
};
use lofty::mpeg::MpegFile;
use lofty::picture::Picture;
use lofty::tag::TagExt;
use lofty::tag::items::Timestamp;

use super::{TagError, TagFields};

/// Multi-value separator defined by ID3v2.4
const SEPARATOR: &str = "\0";

/// Write `fields` (and `picture`) into the MP3 at `path`.
pub fn write(path: &Path, fields: &TagFields, picture: Option<Picture>) -> Result<(), TagError> {
    let mut tag = {
        let mut file = File::open(path)?;
        let mpeg = MpegFile::read_from(&mut file, ParseOptions::new())?;
        mpeg.id3v2().cloned().unwrap_or_default()
    };

    apply(&mut tag, fields);

    if let Some(picture) = picture {
        // Drop every existing APIC so only one front cover remains
        let _ = tag.remove(&frame_id("APIC")).count();
        tag.insert_picture(picture);
    }

    tag.save_to_path(path, WriteOptions::default())?;
    Ok(())
}

/// Map `fields` onto ID3v2 frames, replacing existing values.
pub fn apply(tag: &mut Id3v2Tag, fields: &TagFields) {
    set_text(tag, "TIT2", Some(fields.title.clone()));
    set_text(tag, "TIT3", fields.version.clone());
    set_text(tag, "TPE1", join(&fields.artists));
    set_text(tag, "TPE2", join(&fields.album_artists));
    set_text(tag, "TALB", fields.album.clone());
    set_text(tag, "TCON", fields.genre.clone());
    set_text(tag, "TSRC", fields.isrc.clone());
    set_text(tag, "TRCK", fields.track_position());
    set_text(tag, "TPOS", fields.disc_number.map(|n| n.to_string()));
    set_text(tag, "TCOM", fields.composer.clone());
    set_text(tag, "TBPM", fields.bpm.map(|n| n.to_string()));
    set_text(tag, "TLEN", fields.length_ms.map(|n| n.to_string()));
    set_text(tag, "TPUB", fields.label.clone());

    if fields.year > 0 {
        set_timestamp(tag, "TDRC", fields.year, fields.release_date);
    }
    if let Some(year) = fields.original_year {
        set_timestamp(tag, "TDOR", year, None);
    }

    if let Some(lyrics) = &fields.lyrics {
        tag.insert(Frame::UnsynchronizedText(UnsynchronizedTextFrame::new(
            TextEncoding::UTF8,
            *b"eng",
            String::new(),
            lyrics.clone(),
        )));
    }

    let user_text = [
        ("ACOUSTID_FINGERPRINT", fields.fingerprint.clone()),
        ("EXTERNAL_ID", fields.external_id.clone()),
        ("REPLAYGAIN_TRACK_GAIN", fields.replay_gain.clone()),
        ("BARCODE", fields.barcode.clone()),
        ("CATALOGNUMBER", fields.catalog_number.clone()),
        ("ITUNESADVISORY", Some(fields.advisory.to_string())),
    ];
    for (description, value) in user_text {
        if let Some(value) = value {
            tag.insert_user_text(description.to_string(), value);
        }
    }
}

fn frame_id(id: &'static str) -> FrameId<'static> {
    FrameId::Valid(Cow::Borrowed(id))
}

fn set_text(tag: &mut Id3v2Tag, id: &'static str, value: Option<String>) {
    if let Some(value) = value {
        tag.insert(Frame::Text(TextInformationFrame::new(
            frame_id(id),
            TextEncoding::UTF8,
            value,
        )));
    }
}

fn set_timestamp(tag: &mut Id3v2Tag, id: &'static str, year: u32, date: Option<NaiveDate>) {
    let timestamp = Timestamp {
        year: year.min(u16::MAX as u32) as u16,
        month: date.map(|d| d.month() as u8),
        day: date.map(|d| d.day() as u8),
        ..Timestamp::default()
    };
    tag.insert(Frame::Timestamp(TimestampFrame::new(
        frame_id(id),
        TextEncoding::UTF8,
        timestamp,
    )));
}

fn join(values: &[String]) -> Option<String> {
    (!values.is_empty()).then(|| values.join(SEPARATOR))
}
