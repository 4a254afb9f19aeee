//! User settings persisted in the sync storage scope.
//!
//! Reads merge stored values over [`Settings::default`], so settings added in
//! later releases pick up their defaults for existing users. Writes replace
//! every field in one storage call and then publish the new value to all
//! subscribers.

mod editor;

pub use editor::{SettingsEdit, clamp_max_screenshots};

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::storage::{KeyValueStore, StorageError, StorageScope};

pub const DEFAULT_MAX_SCREENSHOTS: u32 = 50;
pub const MAX_SCREENSHOTS_CAP: u32 = 100;

/// Quality preset. Controls the resampling filter used when frames are
/// scaled onto document pages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Low,
    Medium,
    High,
}

impl ImageQuality {
    pub fn as_str(self) -> &'static str {
        match self {
            ImageQuality::Low => "low",
            ImageQuality::Medium => "medium",
            ImageQuality::High => "high",
        }
    }
}

impl fmt::Display for ImageQuality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ImageQuality {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "low" => Ok(ImageQuality::Low),
            "medium" => Ok(ImageQuality::Medium),
            "high" => Ok(ImageQuality::High),
            other => Err(format!(
                "unknown image quality '{}' (expected low, medium or high)",
                other
            )),
        }
    }
}

/// User-configurable options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub image_quality: ImageQuality,
    /// Capture limit (1-100). Clamped by the edit surface, not by the store.
    pub max_screenshots: u32,
    /// Print the timestamp label on document pages.
    pub auto_timestamp: bool,
    /// Ask for a caption after each capture.
    pub prompt_caption: bool,
    pub dark_mode: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            image_quality: ImageQuality::High,
            max_screenshots: DEFAULT_MAX_SCREENSHOTS,
            auto_timestamp: true,
            prompt_caption: true,
            dark_mode: false,
        }
    }
}

const FIELD_KEYS: [&str; 5] = [
    "imageQuality",
    "maxScreenshots",
    "autoTimestamp",
    "promptCaption",
    "darkMode",
];

/// Reads and writes [`Settings`] and notifies subscribers after each save.
pub struct SettingsStore {
    storage: Arc<dyn KeyValueStore>,
    sender: watch::Sender<Settings>,
}

impl SettingsStore {
    pub fn new(storage: Arc<dyn KeyValueStore>) -> Self {
        let (sender, _) = watch::channel(Settings::default());
        Self { storage, sender }
    }

    /// Receive every saved value. The receiver starts at the latest value.
    pub fn subscribe(&self) -> watch::Receiver<Settings> {
        self.sender.subscribe()
    }

    /// Stored values merged over defaults.
    pub async fn load(&self) -> Result<Settings, StorageError> {
        let stored = self.storage.get_many(StorageScope::Sync, &FIELD_KEYS).await?;
        let settings = merge_over_defaults(stored);
        debug!("Settings loaded: {:?}", settings);
        self.sender.send_replace(settings.clone());
        Ok(settings)
    }

    /// Replace all stored settings with `settings`, then notify subscribers.
    pub async fn save(&self, settings: &Settings) -> Result<(), StorageError> {
        let entries = match serde_json::to_value(settings)? {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        self.storage.set_many(StorageScope::Sync, entries).await?;

        info!("Settings saved successfully!");
        self.sender.send_replace(settings.clone());
        Ok(())
    }
}

fn merge_over_defaults(stored: Map<String, Value>) -> Settings {
    let defaults = Settings::default();
    let mut merged = match serde_json::to_value(&defaults) {
        Ok(Value::Object(map)) => map,
        _ => return defaults,
    };

    for (key, value) in stored {
        let mut candidate = merged.clone();
        candidate.insert(key.clone(), value);
        if serde_json::from_value::<Settings>(Value::Object(candidate.clone())).is_ok() {
            merged = candidate;
        } else {
            warn!("Ignoring invalid stored setting '{}'", key);
        }
    }

    serde_json::from_value(Value::Object(merged)).unwrap_or(defaults)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use serde_json::json;

    #[tokio::test]
    async fn read_before_any_save_returns_defaults() {
        let store = SettingsStore::new(Arc::new(MemoryStore::new()));
        assert_eq!(store.load().await.unwrap(), Settings::default());
    }

    #[tokio::test]
    async fn save_then_load_round_trips_exactly() {
        let storage = Arc::new(MemoryStore::new());
        let store = SettingsStore::new(storage.clone());
        let edited = SettingsEdit {
            image_quality: Some(ImageQuality::Low),
            max_screenshots: Some("250".into()),
            auto_timestamp: Some(false),
            prompt_caption: Some(false),
            dark_mode: Some(true),
        }
        .apply_to(&Settings::default());
        assert_eq!(edited.max_screenshots, 100);

        store.save(&edited).await.unwrap();

        let reopened = SettingsStore::new(storage);
        assert_eq!(reopened.load().await.unwrap(), edited);
    }

    #[tokio::test]
    async fn missing_keys_fall_back_to_defaults() {
        let storage = Arc::new(MemoryStore::new());
        storage
            .set(StorageScope::Sync, "darkMode", json!(true))
            .await
            .unwrap();
        storage
            .set(StorageScope::Sync, "imageQuality", json!("ultra"))
            .await
            .unwrap();

        let settings = SettingsStore::new(storage).load().await.unwrap();
        assert!(settings.dark_mode);
        assert_eq!(settings.image_quality, ImageQuality::High);
        assert_eq!(settings.max_screenshots, DEFAULT_MAX_SCREENSHOTS);
    }

    #[tokio::test]
    async fn subscribers_see_saved_value() {
        let store = SettingsStore::new(Arc::new(MemoryStore::new()));
        let mut receiver = store.subscribe();

        let settings = Settings {
            prompt_caption: false,
            ..Settings::default()
        };
        store.save(&settings).await.unwrap();

        assert!(receiver.has_changed().unwrap());
        assert_eq!(*receiver.borrow_and_update(), settings);
    }

    #[test]
    fn quality_parses_case_insensitively() {
        assert_eq!("Medium".parse::<ImageQuality>(), Ok(ImageQuality::Medium));
        assert!("ultra".parse::<ImageQuality>().is_err());
    }
}
