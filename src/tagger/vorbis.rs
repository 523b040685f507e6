//! Vorbis comment and PICTURE block writing for FLAC files.
//!
//! Single-valued fields are removed before being re-added so a re-tag never
//! accumulates duplicates. ARTIST and ALBUMARTIST are multi-valued: one
//! comment per artist.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use lofty::config::{ParseOptions, WriteOptions};
use lofty::file::AudioFile;
use lofty::flac::FlacFile;
use lofty::ogg::{OggPictureStorage, VorbisComments};
use lofty::picture::{Picture, PictureType};

use super::{TagError, TagFields};

/// PADDING bytes added behind a lone STREAMINFO block
const PADDING_LEN: usize = 1024;

/// Write `fields` (and `picture`) into the FLAC file at `path`.
pub fn write(path: &Path, fields: &TagFields, picture: Option<Picture>) -> Result<(), TagError> {
    ensure_padding(path)?;
    let mut flac = {
        let mut file = File::open(path)?;
        FlacFile::read_from(&mut file, ParseOptions::new())?
    };

    let mut comments = flac.vorbis_comments().cloned().unwrap_or_default();
    apply(&mut comments, fields);
    flac.set_vorbis_comments(comments);

    if let Some(picture) = picture {
        flac.remove_picture_type(PictureType::CoverFront);
        flac.insert_picture(picture, None)?;
    }

    flac.save_to_path(path, WriteOptions::default())?;

    let mut file = File::open(path)?;
    let written = FlacFile::read_from(&mut file, ParseOptions::new())?;
    if written.vorbis_comments().is_none() {
        return Err(TagError::NotPersisted);
    }
    Ok(())
}

/// Append a PADDING block when STREAMINFO is the last metadata block.
///
/// New blocks are only visible to readers when the block before them does
/// not carry the last-metadata-block flag.
fn ensure_padding(path: &Path) -> Result<(), TagError> {
    let mut header = [0u8; 8];
    File::open(path)?.read_exact(&mut header)?;
    if &header[..4] != b"fLaC" || header[4] & 0x80 == 0 {
        return Ok(());
    }

    let mut bytes = std::fs::read(path)?;
    let end = 8 + u32::from_be_bytes([0, header[5], header[6], header[7]]) as usize;
    if end > bytes.len() {
        return Ok(());
    }
    bytes[4] &= 0x7F;
    let mut padding = vec![0x81];
    padding.extend_from_slice(&(PADDING_LEN as u32).to_be_bytes()[1..]);
    padding.resize(4 + PADDING_LEN, 0);
    bytes.splice(end..end, padding);

    std::fs::write(path, bytes)?;
    tracing::debug!("Added PADDING block to {:?}", path);
    Ok(())
}

/// Map `fields` onto Vorbis comments, replacing existing values.
pub fn apply(comments: &mut VorbisComments, fields: &TagFields) {
    let single = [
        ("TITLE", Some(fields.title.clone())),
        ("VERSION", fields.version.clone()),
        ("ALBUM", fields.album.clone()),
        ("DATE", fields.date()),
        ("ORIGINALDATE", fields.original_year.map(|y| y.to_string())),
        ("GENRE", fields.genre.clone()),
        ("ISRC", fields.isrc.clone()),
        ("TRACKNUMBER", fields.track_number.map(|n| n.to_string())),
        ("TRACKTOTAL", fields.track_total.map(|n| n.to_string())),
        ("DISCNUMBER", fields.disc_number.map(|n| n.to_string())),
        ("COMPOSER", fields.composer.clone()),
        ("LYRICS", fields.lyrics.clone()),
        ("ACOUSTID_FINGERPRINT", fields.fingerprint.clone()),
        ("EXTERNAL_ID", fields.external_id.clone()),
        ("BPM", fields.bpm.map(|n| n.to_string())),
        ("REPLAYGAIN_TRACK_GAIN", fields.replay_gain.clone()),
        ("LABEL", fields.label.clone()),
        ("BARCODE", fields.barcode.clone()),
        ("CATALOGNUMBER", fields.catalog_number.clone()),
        ("ITUNESADVISORY", Some(fields.advisory.to_string())),
    ];
    for (key, value) in single {
        if let Some(value) = value {
            let _ = comments.remove(key).count();
            comments.push(key.to_string(), value);
        }
    }

    set_multi(comments, "ARTIST", &fields.artists);
    set_multi(comments, "ALBUMARTIST", &fields.album_artists);
}

fn set_multi(comments: &mut VorbisComments, key: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    let _ = comments.remove(key).count();
    for value in values {
        comments.push(key.to_string(), value.clone());
    }
}
