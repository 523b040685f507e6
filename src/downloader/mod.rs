//! Downloader plugins - the boundary to external music providers.
//!
//! # Architecture
//!
//! - **Trait** (`traits.rs`) - the [`Downloader`] capability interface every
//!   provider implements. Optional operations have default bodies that fail
//!   with [`DownloaderError::MethodNotSupported`].
//! - **Capabilities** - a small flags struct callers check *before* invoking
//!   optional operations, so the happy path never relies on errors for
//!   control flow.
//! - **Registry** (`registry.rs`) - named downloaders behind a reader/writer
//!   lock.
//! - **Local provider** (`local.rs`) - serves a directory catalog; used by
//!   the CLI and as a reference implementation.
//!
//! # Usage
//!
//! ```ignore
//! let registry = DownloaderRegistry::new();
//! registry.register(Arc::new(LocalDownloader::new("/srv/catalog")));
//!
//! let downloader = registry.get("local")?;
//! if downloader.capabilities().supports_search {
//!     let hits = downloader.search_tracks("imagine", 10).await?;
//! }
//! ```

pub mod local;
pub mod registry;
pub mod traits;

pub use local::LocalDownloader;
pub use registry::DownloaderRegistry;
pub use traits::{
    ByteProgress, Capabilities, Downloader, DownloaderError, DownloaderStatus, UserInfo,
};
