//! Image decoding, resizing and re-encoding.

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView};

use super::{Artwork, ArtworkPolicy, ImageMime};
use crate::error::{Error, Result};

/// Detect the image format from its leading bytes.
pub fn detect_mime(data: &[u8]) -> Option<ImageMime> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(ImageMime::Jpeg)
    } else if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
        Some(ImageMime::Png)
    } else if data.len() >= 12 && &data[0..4] == b"RIFF" && &data[8..12] == b"WEBP" {
        Some(ImageMime::Webp)
    } else {
        None
    }
}

/// Apply `policy` to raw image bytes.
///
/// Images within bounds that need no format change pass through untouched,
/// so processing already-processed artwork is a no-op.
pub fn process(data: &[u8], policy: &ArtworkPolicy) -> Result<Artwork> {
    let mime = detect_mime(data).ok_or_else(|| Error::artwork("unrecognized image data"))?;
    let img = image::load_from_memory(data)
        .map_err(|e| Error::artwork(format!("failed to decode {}: {}", mime.as_str(), e)))?;
    let (width, height) = img.dimensions();

    let oversized = policy.max_size > 0 && width.max(height) > policy.max_size;
    let reencode = oversized
        || mime == ImageMime::Webp
        || (mime == ImageMime::Png && policy.convert_to_jpeg);

    if !reencode {
        return Ok(Artwork {
            data: data.to_vec(),
            mime,
            width,
            height,
        });
    }

    let img = if oversized {
        img.resize(policy.max_size, policy.max_size, FilterType::Lanczos3)
    } else {
        img
    };
    let (width, height) = img.dimensions();
    tracing::debug!(
        "Re-encoding {} cover as {}x{} JPEG (quality {})",
        mime.as_str(),
        width,
        height,
        policy.quality
    );

    Ok(Artwork {
        data: encode_jpeg(img, policy.quality)?,
        mime: ImageMime::Jpeg,
        width,
        height,
    })
}

fn encode_jpeg(img: DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // JPEG has no alpha channel
    let rgb = DynamicImage::ImageRgb8(img.into_rgb8());
    let mut out = Vec::new();
    let encoder = JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100));
    rgb.write_with_encoder(encoder)
        .map_err(|e| Error::artwork(format!("failed to encode JPEG: {}", e)))?;
    Ok(out)
}
