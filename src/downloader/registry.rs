//! Named downloader registry.
//!
//! Lookups happen on every job and may run concurrently; registration is
//! rare. A `parking_lot::RwLock` gives many readers and one exclusive writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;

use super::Downloader;
use crate::error::{Error, Result};

/// Registry of downloader plugins keyed by [`Downloader::name`].
#[derive(Default)]
pub struct DownloaderRegistry {
    downloaders: RwLock<BTreeMap<String, Arc<dyn Downloader>>>,
}

impl DownloaderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a downloader, replacing any previous one with the same name.
    pub fn register(&self, downloader: Arc<dyn Downloader>) {
        let name = downloader.name().to_string();
        let replaced = self.downloaders.write().insert(name.clone(), downloader);
        if replaced.is_some() {
            tracing::info!("Replaced downloader '{}'", name);
        } else {
            tracing::debug!("Registered downloader '{}'", name);
        }
    }

    /// Remove a downloader. Returns whether it was registered.
    pub fn unregister(&self, name: &str) -> bool {
        self.downloaders.write().remove(name).is_some()
    }

    /// Look up a downloader by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn Downloader>> {
        self.downloaders
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::DownloaderNotFound(name.to_string()))
    }

    /// Registered names in sorted order.
    pub fn names(&self) -> Vec<String> {
        self.downloaders.read().keys().cloned().collect()
    }

    /// Snapshot of all registered downloaders.
    pub fn all(&self) -> Vec<Arc<dyn Downloader>> {
        self.downloaders.read().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.downloaders.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.downloaders.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::downloader::traits::mocks::MockDownloader;

    fn named(name: &str) -> Arc<dyn Downloader> {
        let mut mock = MockDownloader::with_tracks(vec![]);
        mock.name = name.to_string();
        Arc::new(mock)
    }

    #[test]
    fn test_register_and_get() {
        let registry = DownloaderRegistry::new();
        registry.register(named("deezer"));
        registry.register(named("local"));

        assert_eq!(registry.names(), vec!["deezer", "local"]);
        assert_eq!(registry.get("local").unwrap().name(), "local");
    }

    #[test]
    fn test_missing_downloader() {
        let registry = DownloaderRegistry::new();
        let err = registry.get("tidal").err().unwrap();
        assert!(matches!(err, Error::DownloaderNotFound(ref n) if n == "tidal"));
    }

    #[test]
    fn test_replace_and_unregister() {
        let registry = DownloaderRegistry::new();
        registry.register(named("local"));
        registry.register(named("local"));
        assert_eq!(registry.len(), 1);

        assert!(registry.unregister("local"));
        assert!(!registry.unregister("local"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_concurrent_lookups() {
        let registry = Arc::new(DownloaderRegistry::new());
        registry.register(named("local"));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        assert!(registry.get("local").is_ok());
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
    }
}
