//! Artwork disk cache.
//!
//! Caches fetched cover art to avoid repeated network requests. The key is
//! the SHA-256 of the image URL; entries older than the TTL are treated as
//! absent and refetched.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use sha2::{Digest, Sha256};

/// Artwork disk cache.
pub struct ArtworkCache {
    cache_dir: PathBuf,
    ttl: Duration,
}

impl ArtworkCache {
    /// Create a new cache in the specified directory.
    pub fn new(cache_dir: impl Into<PathBuf>, ttl: Duration) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            ttl,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Cached bytes for `url`, if present and younger than the TTL.
    pub fn get(&self, url: &str) -> Option<Vec<u8>> {
        let path = self.cache_path(url);
        let modified = fs::metadata(&path).and_then(|m| m.modified()).ok()?;
        if !self.is_fresh(modified) {
            tracing::debug!("Cached artwork for {} expired", url);
            return None;
        }
        fs::read(&path).ok()
    }

    /// Store bytes for `url`.
    ///
    /// Written to a temp file in the cache directory and renamed into place,
    /// so readers never see a partial image.
    pub fn put(&self, url: &str, data: &[u8]) -> Result<PathBuf, std::io::Error> {
        fs::create_dir_all(&self.cache_dir)?;
        let path = self.cache_path(url);

        let mut temp = tempfile::NamedTempFile::new_in(&self.cache_dir)?;
        temp.write_all(data)?;
        temp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }

    /// Get the cache path for a URL.
    pub fn cache_path(&self, url: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.img", cache_key(url)))
    }

    fn is_fresh(&self, modified: SystemTime) -> bool {
        // A clock that went backwards counts as fresh
        modified.elapsed().map(|age| age < self.ttl).unwrap_or(true)
    }
}

/// Hex-encoded SHA-256 of the URL.
pub fn cache_key(url: &str) -> String {
    format!("{:x}", Sha256::digest(url.as_bytes()))
}
