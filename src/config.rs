//! Configuration system using TOML files.
//!
//! Config is stored in the OS-standard config directory:
//! - Windows: %APPDATA%\music-fetch\config.toml
//! - macOS: ~/Library/Application Support/music-fetch/config.toml
//! - Linux: ~/.config/music-fetch/config.toml
//!
//! The pipeline consumes config read-only. Every section is optional in the
//! file; missing keys take their defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Where and how downloads land
    pub download: DownloadConfig,

    /// Cover art embedding and caching
    pub artwork: ArtworkConfig,

    /// The local catalog provider
    pub local: LocalConfig,
}

/// Download settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadConfig {
    /// Root directory for downloaded files
    pub root: PathBuf,

    /// Write tags after downloading (batch jobs keep untagged files either way)
    pub tag_files: bool,

    /// Downloader used when the CLI is not told otherwise
    pub default_downloader: String,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self {
            root: dirs::audio_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("music-fetch"),
            tag_files: true,
            default_downloader: "local".to_string(),
        }
    }
}

/// Cover art settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ArtworkConfig {
    /// Embed cover art into tags
    pub embed: bool,

    /// Longest edge of embedded artwork in pixels
    pub max_size: u32,

    /// JPEG quality (1-100)
    pub quality: u8,

    /// Re-encode PNG covers as JPEG
    pub convert_to_jpeg: bool,

    /// How long fetched covers stay fresh in the cache
    pub cache_ttl_hours: u64,

    /// Timeout for a single cover fetch
    pub fetch_timeout_secs: u64,

    /// Cache directory (defaults to the OS cache dir)
    pub cache_dir: Option<PathBuf>,

    /// Also write a cover image file beside the audio
    pub save_local: bool,

    /// File name template; `{artist}` and `{album}` are substituted
    pub local_filename: String,

    /// Longest edge of the local cover file in pixels
    pub local_size: u32,
}

impl Default for ArtworkConfig {
    fn default() -> Self {
        Self {
            embed: true,
            max_size: 1000,
            quality: 90,
            convert_to_jpeg: true,
            cache_ttl_hours: 24,
            fetch_timeout_secs: 15,
            cache_dir: None,
            save_local: false,
            local_filename: "cover.jpg".to_string(),
            local_size: 1200,
        }
    }
}

impl ArtworkConfig {
    /// The configured cache directory or the OS default.
    pub fn cache_dir(&self) -> PathBuf {
        self.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(|| PathBuf::from(".cache"))
                .join("music-fetch")
                .join("artwork")
        })
    }
}

/// Local catalog provider settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LocalConfig {
    /// Catalog root laid out as `<artist>/<album>/<file>`
    pub catalog: Option<PathBuf>,
}

// ============================================================================
// Config File Operations
// ============================================================================

/// Get the config directory path
pub fn config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("music-fetch"))
}

/// Get the full path to the config file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|d| d.join("config.toml"))
}

/// Load configuration from the default location.
///
/// Returns default config if the file doesn't exist or can't be parsed.
pub fn load() -> Config {
    let Some(path) = config_path() else {
        tracing::warn!("Could not determine config directory, using defaults");
        return Config::default();
    };
    load_from(&path)
}

/// Load configuration from a specific file.
///
/// Logs warnings but doesn't fail - we always return a usable config.
pub fn load_from(path: &Path) -> Config {
    if !path.exists() {
        tracing::info!("No config file found at {:?}, using defaults", path);
        return Config::default();
    }

    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => {
                tracing::info!("Loaded config from {:?}", path);
                config
            }
            Err(e) => {
                tracing::error!("Failed to parse config file {:?}: {}", path, e);
                tracing::warn!("Using default configuration");
                Config::default()
            }
        },
        Err(e) => {
            tracing::error!("Failed to read config file {:?}: {}", path, e);
            Config::default()
        }
    }
}

/// Save configuration to the default location.
pub fn save(config: &Config) -> Result<(), ConfigError> {
    let path = config_path().ok_or(ConfigError::NoConfigDir)?;
    save_to(config, &path)
}

/// Save configuration to a specific file.
///
/// Creates the parent directory if it doesn't exist.
pub fn save_to(config: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| ConfigError::CreateDir(dir.to_path_buf(), e))?;
    }

    // Serialize to pretty TOML
    let contents = toml::to_string_pretty(config).map_err(ConfigError::Serialize)?;

    // Write atomically (write to temp, then rename)
    let temp_path = path.with_extension("toml.tmp");
    std::fs::write(&temp_path, &contents).map_err(|e| ConfigError::Write(temp_path.clone(), e))?;
    std::fs::rename(&temp_path, path)
        .map_err(|e| ConfigError::Rename(temp_path, path.to_path_buf(), e))?;

    tracing::info!("Saved config to {:?}", path);
    Ok(())
}

// ============================================================================
// Error Types
// ============================================================================

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Could not determine config directory")]
    NoConfigDir,

    #[error("Failed to create config directory {0}: {1}")]
    CreateDir(PathBuf, std::io::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(toml::ser::Error),

    #[error("Failed to write config to {0}: {1}")]
    Write(PathBuf, std::io::Error),

    #[error("Failed to rename temp file {0} to {1}: {2}")]
    Rename(PathBuf, PathBuf, std::io::Error),
}

// ============================================================================
// Tests
// ============================================================================
