//! Tag writing for downloaded files.
//!
//! Maps a [`Track`] onto the native tag structure of its container:
//!
//! - **MP3**: ID3v2 frames (see [`id3`])
//! - **FLAC**: Vorbis comments plus a PICTURE block (see [`vorbis`])
//!
//! Writing is idempotent: re-tagging a file replaces values instead of
//! appending duplicates. All writes in the process are serialized through
//! one lock, so concurrent jobs never interleave tag rewrites.

mod fields;
pub mod id3;
pub mod vorbis;

pub use fields::TagFields;

use std::path::PathBuf;

use lofty::picture::{MimeType, Picture, PictureType};
use parking_lot::Mutex;

use crate::cover::{Artwork, ArtworkPolicy, ImageMime, detect_mime, process};
use crate::error::{Error, Result};
use crate::model::{AudioFormat, Track};

/// Serializes every tag write in the process.
static TAG_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Low-level tag writing failures.
#[derive(Debug, thiserror::Error)]
pub enum TagError {
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("track has no file path")]
    MissingPath,

    #[error("tag library error: {0}")]
    Lofty(#[from] lofty::error::LoftyError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("tags were not readable after the write")]
    NotPersisted,

    #[error("tag task failed: {0}")]
    Task(String),
}

/// Writes tags and embedded artwork to audio files.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagWriter {
    policy: ArtworkPolicy,
}

impl TagWriter {
    pub fn new(policy: ArtworkPolicy) -> Self {
        Self { policy }
    }

    /// Write `track`'s metadata (and `artwork`, if any) to its file.
    ///
    /// Blocking; see [`TagWriter::write_blocking`] for async callers.
    pub fn write(&self, track: &Track, artwork: Option<&Artwork>) -> Result<()> {
        let path = track
            .path
            .as_deref()
            .ok_or_else(|| Error::tag_write(PathBuf::new(), TagError::MissingPath))?;
        let format = track.effective_format();
        let fields = TagFields::from_track(track);
        let picture = artwork.and_then(|art| self.picture(art));

        let _guard = TAG_LOCK.lock();
        let result = match &format {
            AudioFormat::Mp3 => id3::write(path, &fields, picture),
            AudioFormat::Flac => vorbis::write(path, &fields, picture),
            other => Err(TagError::UnsupportedFormat(other.to_string())),
        };
        result.map_err(|e| Error::tag_write(path, e))?;

        tracing::debug!("Tagged {:?} ({})", path, format);
        Ok(())
    }

    /// Run [`TagWriter::write`] on the blocking thread pool.
    pub async fn write_blocking(&self, track: Track, artwork: Option<Artwork>) -> Result<()> {
        let writer = *self;
        let path = track.path.clone().unwrap_or_default();
        tokio::task::spawn_blocking(move || writer.write(&track, artwork.as_ref()))
            .await
            .map_err(|e| Error::tag_write(path, TagError::Task(e.to_string())))?
    }

    /// Build a front-cover picture, re-applying the artwork policy.
    fn picture(&self, artwork: &Artwork) -> Option<Picture> {
        let processed = match process(&artwork.data, &self.policy) {
            Ok(processed) => processed,
            Err(e) => {
                tracing::warn!("Skipping cover art: {}", e);
                return None;
            }
        };
        let mime = detect_mime(&processed.data).map(|mime| match mime {
            ImageMime::Jpeg => MimeType::Jpeg,
            ImageMime::Png => MimeType::Png,
            ImageMime::Webp => MimeType::Unknown(mime.as_str().to_string()),
        });
        Some(Picture::new_unchecked(
            PictureType::CoverFront,
            mime,
            None,
            processed.data,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{mock_track, test_image, write_minimal_flac};
    use image::ImageFormat;
    use lofty::file::TaggedFileExt;
    use lofty::probe::Probe;
    use lofty::tag::{Accessor, ItemKey};

    #[test]
    fn test_unsupported_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.ogg");
        std::fs::write(&path, b"OggS").unwrap();

        let mut track = mock_track("1", "Imagine");
        track.path = Some(path);
        track.format = AudioFormat::Unknown;

        let err = TagWriter::default().write(&track, None).unwrap_err();
        assert!(matches!(
            err,
            Error::TagWrite { source: TagError::UnsupportedFormat(ref f), .. } if f == "ogg"
        ));
        assert!(err.to_string().contains("unsupported format"));
    }

    #[test]
    fn test_missing_path() {
        let track = mock_track("1", "Imagine");
        let err = TagWriter::default().write(&track, None).unwrap_err();
        assert!(matches!(
            err,
            Error::TagWrite { source: TagError::MissingPath, .. }
        ));
    }

    #[test]
    fn test_oversized_artwork_reprocessed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("song.flac");
        write_minimal_flac(&path).unwrap();
        let mut track = mock_track("1", "Imagine");
        track.path = Some(path.clone());

        let raw = Artwork {
            data: test_image(900, 300, ImageFormat::Png),
            mime: ImageMime::Png,
            width: 900,
            height: 300,
        };
        let writer = TagWriter::new(ArtworkPolicy {
            max_size: 300,
            quality: 80,
            convert_to_jpeg: true,
        });
        writer.write(&track, Some(&raw)).unwrap();

        let tagged = Probe::open(&path).unwrap().read().unwrap();
        let tag = tagged.primary_tag().unwrap();
        assert_eq!(tag.title().as_deref(), Some("Imagine"));
        let picture = &tag.pictures()[0];
        assert_eq!(picture.mime_type(), Some(&MimeType::Jpeg));
        let img = image::load_from_memory(picture.data()).unwrap();
        assert_eq!((img.width(), img.height()), (300, 100));
        assert_eq!(tag.get_string(&ItemKey::AlbumTitle), Some("Imagine"));
    }

    #[tokio::test]
    async fn test_concurrent_writes_serialize() {
        let dir = tempfile::tempdir().unwrap();
        let mut handles = Vec::new();
        for i in 0..4 {
            let path = dir.path().join(format!("{}.flac", i));
            write_minimal_flac(&path).unwrap();
            let mut track = mock_track(&i.to_string(), &format!("Song {}", i));
            track.path = Some(path);
            handles.push(tokio::spawn(async move {
                TagWriter::default().write_blocking(track, None).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        for i in 0..4 {
            let tagged = Probe::open(dir.path().join(format!("{}.flac", i)))
                .unwrap()
                .read()
                .unwrap();
            let title = tagged.primary_tag().unwrap().title().map(|t| t.to_string());
            assert_eq!(title, Some(format!("Song {}", i)));
        }
    }
}
