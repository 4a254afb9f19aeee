//! Configuration file support for tubesnap.
//!
//! This module handles loading and validating application settings from the
//! configuration file located at `~/.config/tubesnap/config.toml`. Settings
//! include storage and download locations, page timing and PDF fonts.
//!
//! If no config file exists, sensible defaults are used automatically. The
//! user-facing capture preferences (quality, limits, captions) are not part of
//! this file; they live in the settings store.

pub mod types;

pub use types::{DownloadsConfig, NotificationsConfig, PageConfig, PdfConfig, StorageConfig};

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::delivery::DownloadLayout;
use crate::page::PageOptions;

/// Main configuration structure.
///
/// # Example TOML
/// ```toml
/// [storage]
/// directory = "/home/me/.local/share/tubesnap"
///
/// [downloads]
/// directory = "/home/me/Downloads"
/// folder = "youtube-screenshots"
/// pdf_filename = "youtube-screenshots.pdf"
///
/// [page]
/// readiness_timeout_ms = 10000
/// readiness_poll_ms = 1000
/// max_init_retries = 3
/// notification_duration_ms = 3000
///
/// [pdf]
/// font_family = "Sans"
///
/// [notifications]
/// desktop = false
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub downloads: DownloadsConfig,

    #[serde(default)]
    pub page: PageConfig,

    #[serde(default)]
    pub pdf: PdfConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,
}

impl Config {
    /// Clamps out-of-range values and replaces unusable names, logging a
    /// warning for each change.
    ///
    /// Validated ranges:
    /// - `readiness_timeout_ms`: 1000 - 60000
    /// - `readiness_poll_ms`: 50 - 10000
    /// - `max_init_retries`: 1 - 10
    /// - `notification_duration_ms`: 500 - 30000
    fn validate_and_clamp(&mut self) {
        if !(1_000..=60_000).contains(&self.page.readiness_timeout_ms) {
            log::warn!(
                "Invalid readiness_timeout_ms {}, clamping to 1000-60000 range",
                self.page.readiness_timeout_ms
            );
            self.page.readiness_timeout_ms = self.page.readiness_timeout_ms.clamp(1_000, 60_000);
        }

        if !(50..=10_000).contains(&self.page.readiness_poll_ms) {
            log::warn!(
                "Invalid readiness_poll_ms {}, clamping to 50-10000 range",
                self.page.readiness_poll_ms
            );
            self.page.readiness_poll_ms = self.page.readiness_poll_ms.clamp(50, 10_000);
        }

        if !(1..=10).contains(&self.page.max_init_retries) {
            log::warn!(
                "Invalid max_init_retries {}, clamping to 1-10 range",
                self.page.max_init_retries
            );
            self.page.max_init_retries = self.page.max_init_retries.clamp(1, 10);
        }

        if !(500..=30_000).contains(&self.page.notification_duration_ms) {
            log::warn!(
                "Invalid notification_duration_ms {}, clamping to 500-30000 range",
                self.page.notification_duration_ms
            );
            self.page.notification_duration_ms =
                self.page.notification_duration_ms.clamp(500, 30_000);
        }

        if self.pdf.font_family.trim().is_empty() {
            log::warn!("Empty pdf font_family, falling back to 'Sans'");
            self.pdf.font_family = "Sans".to_string();
        }

        if !is_plain_name(&self.downloads.folder) {
            log::warn!(
                "Invalid downloads folder '{}', falling back to 'youtube-screenshots'",
                self.downloads.folder
            );
            self.downloads.folder = "youtube-screenshots".to_string();
        }

        if !is_plain_name(&self.downloads.pdf_filename) {
            log::warn!(
                "Invalid pdf_filename '{}', falling back to 'youtube-screenshots.pdf'",
                self.downloads.pdf_filename
            );
            self.downloads.pdf_filename = "youtube-screenshots.pdf".to_string();
        }
    }

    /// Returns the path to the configuration file.
    ///
    /// # Errors
    /// Returns an error if the config directory cannot be determined (e.g., HOME not set).
    pub fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Could not find config directory")?
            .join("tubesnap");

        Ok(config_dir.join("config.toml"))
    }

    /// Loads the configuration from the default location, or returns defaults
    /// if no file exists there.
    pub fn load() -> Result<Self> {
        let config_path = Self::get_config_path()?;
        Self::load_from(&config_path)
    }

    /// Loads configuration from `config_path`, or returns defaults if the file
    /// does not exist. Loaded values are validated and clamped.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found, using defaults");
            debug!("Expected config at: {}", config_path.display());
            return Ok(Self::default());
        }

        let config_str = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config from {}", config_path.display()))?;

        let mut config: Config = toml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config from {}", config_path.display()))?;

        config.validate_and_clamp();

        info!("Loaded config from {}", config_path.display());
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Writes the configuration as TOML, creating parent directories.
    ///
    /// # Errors
    /// Returns an error if a file already exists at `config_path` and
    /// `overwrite` is false, or if the file cannot be written.
    pub fn save_to(&self, config_path: &Path, overwrite: bool) -> Result<()> {
        if config_path.exists() && !overwrite {
            return Err(anyhow::anyhow!(
                "Config file already exists at {}",
                config_path.display()
            ));
        }

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let config_str = toml::to_string_pretty(self).context("Failed to serialize config")?;

        fs::write(config_path, config_str)
            .with_context(|| format!("Failed to write config to {}", config_path.display()))?;

        info!("Saved config to {}", config_path.display());
        Ok(())
    }

    pub fn page_options(&self) -> PageOptions {
        PageOptions {
            readiness_timeout: Duration::from_millis(self.page.readiness_timeout_ms),
            readiness_poll: Duration::from_millis(self.page.readiness_poll_ms),
            max_init_retries: self.page.max_init_retries,
            font_family: self.pdf.font_family.clone(),
        }
    }

    pub fn download_layout(&self) -> DownloadLayout {
        DownloadLayout {
            folder: self.downloads.folder.clone(),
            pdf_filename: self.downloads.pdf_filename.clone(),
        }
    }

    pub fn notification_duration(&self) -> Duration {
        Duration::from_millis(self.page.notification_duration_ms)
    }
}

/// A single path component without separators.
fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && name != "." && name != ".." && !name.contains(['/', '\\'])
}
