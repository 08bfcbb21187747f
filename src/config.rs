//! Gallery configuration.
//!
//! Loaded from `config.toml` in the gallery root (or a path given with
//! `--config`). Every option has a default, so the file is optional and may
//! override just the values it cares about.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [images]
//! extensions = ["jpg", "jpeg", "png"]  # Matched case-insensitively
//!
//! [urls]
//! image_base = "/api/images"           # Prefix of each image's URL
//!
//! [reorder]
//! max_name_attempts = 1000             # Random suffix redraws on name collision
//!
//! [processing]
//! max_processes = 4                    # Hashing threads (omit for auto = CPU cores)
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Default config filename inside a gallery root.
pub const CONFIG_FILENAME: &str = "config.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Gallery configuration loaded from `config.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GalleryConfig {
    /// Which files count as images.
    pub images: ImagesConfig,
    /// How image URLs are derived.
    pub urls: UrlsConfig,
    /// Reorder engine limits.
    pub reorder: ReorderConfig,
    /// Parallel hashing settings.
    pub processing: ProcessingConfig,
}

impl GalleryConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.images.extensions.is_empty() {
            return Err(ConfigError::Validation(
                "images.extensions must not be empty".into(),
            ));
        }
        if let Some(bad) = self
            .images
            .extensions
            .iter()
            .find(|e| e.is_empty() || e.contains('.') || e.contains('/'))
        {
            return Err(ConfigError::Validation(format!(
                "images.extensions entry {bad:?} must be a bare extension like \"jpg\""
            )));
        }
        if self.reorder.max_name_attempts == 0 {
            return Err(ConfigError::Validation(
                "reorder.max_name_attempts must be at least 1".into(),
            ));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Image file recognition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImagesConfig {
    /// File extensions (without dot) treated as images.
    pub extensions: Vec<String>,
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["jpg".into(), "jpeg".into(), "png".into()],
        }
    }
}

impl ImagesConfig {
    /// Whether `name` has one of the configured extensions.
    pub fn is_image(&self, name: &str) -> bool {
        let Some(ext) = Path::new(name).extension() else {
            return false;
        };
        let ext = ext.to_string_lossy();
        self.extensions.iter().any(|e| e.eq_ignore_ascii_case(&ext))
    }
}

/// URL derivation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UrlsConfig {
    /// Prefix joined with the content hash to form an image URL.
    pub image_base: String,
}

impl Default for UrlsConfig {
    fn default() -> Self {
        Self {
            image_base: "/api/images".into(),
        }
    }
}

/// Reorder engine limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReorderConfig {
    /// How many random suffixes to try before giving up on a free filename.
    pub max_name_attempts: u32,
}

impl Default for ReorderConfig {
    fn default() -> Self {
        Self {
            max_name_attempts: 1000,
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of hashing threads.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<GalleryConfig, ConfigError> {
    let config: GalleryConfig = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from an explicit file path.
pub fn load_config_file(path: &Path) -> Result<GalleryConfig, ConfigError> {
    parse_config(&fs::read_to_string(path)?)
}

/// Load `config.toml` from a gallery root, or defaults if it doesn't exist.
pub fn load_config(root: &Path) -> Result<GalleryConfig, ConfigError> {
    let path = root.join(CONFIG_FILENAME);
    if path.exists() {
        load_config_file(&path)
    } else {
        Ok(GalleryConfig::default())
    }
}

/// A documented stock `config.toml` with every option at its default.
pub fn stock_config_toml() -> &'static str {
    r#"# gallery-order configuration
# All options are optional. Values shown are the defaults.

[images]
# File extensions (without dot) treated as images, matched case-insensitively.
extensions = ["jpg", "jpeg", "png"]

[urls]
# Prefix joined with an image's content hash to form its URL.
image_base = "/api/images"

[reorder]
# Random suffix redraws allowed when a computed filename is already taken.
max_name_attempts = 1000

[processing]
# Maximum hashing threads. Omit to use all CPU cores.
# max_processes = 4
"#
}
