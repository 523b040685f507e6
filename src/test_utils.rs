//! Test utilities and fixtures for music-fetch tests.
//!
//! Provides mock tracks, minimal but valid audio files for the tag writer to
//! operate on, and generated cover images.
//!
//! # Example
//!
//! ```ignore
//! use music_fetch::test_utils::{mock_track, write_minimal_flac};
//!
//! let dir = tempfile::tempdir()?;
//! let path = dir.path().join("song.flac");
//! write_minimal_flac(&path)?;
//! let mut track = mock_track("t1", "Imagine");
//! track.path = Some(path);
//! ```

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage};

use crate::model::{Album, Artist, ArtistRole, AudioFormat, Role, Track};

/// A fully populated track that passes validation.
///
/// Artist "John Lennon", album "Imagine", year 1971. Customize using struct
/// update syntax or by mutating the returned value.
pub fn mock_track(id: &str, title: &str) -> Track {
    let artist = Arc::new(Artist::new("artist-1", "John Lennon"));
    let mut album = Album::new("album-1", "Imagine");
    album.artists.push(ArtistRole::new(Arc::clone(&artist), Role::Main));
    album.release.label = Some("Apple".to_string());

    let mut track = Track::new(id, title);
    track.artists.push(ArtistRole::new(artist, Role::Main));
    track.album = Some(album);
    track.format = AudioFormat::Flac;
    track.metadata.year = 1971;
    track.metadata.genre = "Rock".to_string();
    track.metadata.track_number = 1;
    track.metadata.disc_number = 1;
    track
}

/// Write a FLAC file holding only a STREAMINFO block and a stub of audio.
///
/// 44.1 kHz, stereo, 16-bit, one second of declared samples.
pub fn write_minimal_flac(path: &Path) -> std::io::Result<()> {
    let mut bytes = Vec::with_capacity(128);
    bytes.extend_from_slice(b"fLaC");
    // Last-metadata-block flag + STREAMINFO type, then 24-bit length 34
    bytes.extend_from_slice(&[0x80, 0x00, 0x00, 0x22]);
    // Min/max block size 4096
    bytes.extend_from_slice(&[0x10, 0x00, 0x10, 0x00]);
    // Min/max frame size unknown
    bytes.extend_from_slice(&[0x00; 6]);
    // 44100 Hz, 2 channels, 16 bits per sample, 44100 total samples
    bytes.extend_from_slice(&[0x0A, 0xC4, 0x42, 0xF0, 0x00, 0x00, 0xAC, 0x44]);
    // MD5 of the unencoded audio
    bytes.extend_from_slice(&[0x00; 16]);
    // Frame sync followed by filler standing in for the audio stream
    bytes.extend_from_slice(&[0xFF, 0xF8]);
    bytes.extend_from_slice(&[0x00; 62]);
    std::fs::write(path, bytes)
}

/// Write an MP3 file of eight silent MPEG-1 Layer III frames.
///
/// 128 kbps, 44.1 kHz, stereo, no tags.
pub fn write_minimal_mp3(path: &Path) -> std::io::Result<()> {
    const FRAME_LEN: usize = 417;
    let mut bytes = Vec::with_capacity(FRAME_LEN * 8);
    for _ in 0..8 {
        bytes.extend_from_slice(&[0xFF, 0xFB, 0x90, 0x00]);
        bytes.extend(std::iter::repeat_n(0u8, FRAME_LEN - 4));
    }
    std::fs::write(path, bytes)
}

/// Encode a solid-color test image of the given size.
pub fn test_image(width: u32, height: u32, format: ImageFormat) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([200, 40, 40])));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("Failed to encode test image");
    buf
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mock_track_defaults() {
        let track = mock_track("t1", "Imagine");
        assert_eq!(track.id, "t1");
        assert_eq!(track.artist_names(), vec!["John Lennon"]);
        assert_eq!(track.album.as_ref().unwrap().title, "Imagine");
        assert_eq!(track.metadata.year, 1971);
    }

    #[test]
    fn test_minimal_files_written() {
        let dir = tempfile::tempdir().unwrap();
        let flac = dir.path().join("a.flac");
        let mp3 = dir.path().join("a.mp3");
        write_minimal_flac(&flac).unwrap();
        write_minimal_mp3(&mp3).unwrap();

        assert_eq!(&std::fs::read(&flac).unwrap()[..4], b"fLaC");
        assert_eq!(std::fs::metadata(&mp3).unwrap().len(), 417 * 8);
    }

    #[test]
    fn test_image_decodes() {
        let png = test_image(40, 20, ImageFormat::Png);
        let img = image::load_from_memory(&png).unwrap();
        assert_eq!((img.width(), img.height()), (40, 20));
    }
}
