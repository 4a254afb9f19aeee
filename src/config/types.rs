//! Configuration type definitions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where captures and settings are persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding `local.json` and `sync.json`
    /// (default: `~/.local/share/tubesnap`)
    #[serde(default = "default_storage_directory")]
    pub directory: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            directory: default_storage_directory(),
        }
    }
}

/// Where exported artifacts are saved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DownloadsConfig {
    /// Downloads directory (default: the XDG download directory)
    #[serde(default = "default_downloads_directory")]
    pub directory: PathBuf,

    /// Sub-folder for exported PNG files and their index
    #[serde(default = "default_folder")]
    pub folder: String,

    /// File name suggested for the PDF export
    #[serde(default = "default_pdf_filename")]
    pub pdf_filename: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            directory: default_downloads_directory(),
            folder: default_folder(),
            pdf_filename: default_pdf_filename(),
        }
    }
}

/// Page context timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageConfig {
    /// How long to wait for a video element (valid range: 1000 - 60000)
    #[serde(default = "default_readiness_timeout_ms")]
    pub readiness_timeout_ms: u64,

    /// Interval between video element checks (valid range: 50 - 10000)
    #[serde(default = "default_readiness_poll_ms")]
    pub readiness_poll_ms: u64,

    /// Reinitialization attempts before giving up (valid range: 1 - 10)
    #[serde(default = "default_max_init_retries")]
    pub max_init_retries: u32,

    /// How long a notification stays visible (valid range: 500 - 30000)
    #[serde(default = "default_notification_duration_ms")]
    pub notification_duration_ms: u64,
}

impl Default for PageConfig {
    fn default() -> Self {
        Self {
            readiness_timeout_ms: default_readiness_timeout_ms(),
            readiness_poll_ms: default_readiness_poll_ms(),
            max_init_retries: default_max_init_retries(),
            notification_duration_ms: default_notification_duration_ms(),
        }
    }
}

/// PDF rendering.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PdfConfig {
    /// Font family for timestamp and caption labels (e.g., "Sans", "DejaVu Serif")
    #[serde(default = "default_font_family")]
    pub font_family: String,
}

impl Default for PdfConfig {
    fn default() -> Self {
        Self {
            font_family: default_font_family(),
        }
    }
}

/// Notification surfaces.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NotificationsConfig {
    /// Also send desktop notifications over D-Bus
    #[serde(default)]
    pub desktop: bool,
}

fn default_storage_directory() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("tubesnap")
}

fn default_downloads_directory() -> PathBuf {
    dirs::download_dir()
        .or_else(|| dirs::home_dir().map(|home| home.join("Downloads")))
        .unwrap_or_else(|| PathBuf::from("."))
}

fn default_folder() -> String {
    "youtube-screenshots".to_string()
}

fn default_pdf_filename() -> String {
    "youtube-screenshots.pdf".to_string()
}

fn default_readiness_timeout_ms() -> u64 {
    10_000
}

fn default_readiness_poll_ms() -> u64 {
    1_000
}

fn default_max_init_retries() -> u32 {
    3
}

fn default_notification_duration_ms() -> u64 {
    3_000
}

fn default_font_family() -> String {
    "Sans".to_string()
}
