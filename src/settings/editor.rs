use super::{DEFAULT_MAX_SCREENSHOTS, ImageQuality, MAX_SCREENSHOTS_CAP, Settings};

/// Clamp the capture-limit input to 1-100.
///
/// Unparseable input keeps the default limit.
pub fn clamp_max_screenshots(input: &str) -> u32 {
    match input.trim().parse::<i64>() {
        Ok(value) => value.clamp(1, MAX_SCREENSHOTS_CAP as i64) as u32,
        Err(_) => {
            log::warn!(
                "Invalid capture limit '{}', using {}",
                input,
                DEFAULT_MAX_SCREENSHOTS
            );
            DEFAULT_MAX_SCREENSHOTS
        }
    }
}

/// Values entered on the settings surface. `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct SettingsEdit {
    pub image_quality: Option<ImageQuality>,
    /// Raw text as typed; clamped when applied.
    pub max_screenshots: Option<String>,
    pub auto_timestamp: Option<bool>,
    pub prompt_caption: Option<bool>,
    pub dark_mode: Option<bool>,
}

impl SettingsEdit {
    /// Build the complete record that will be saved.
    pub fn apply_to(&self, current: &Settings) -> Settings {
        Settings {
            image_quality: self.image_quality.unwrap_or(current.image_quality),
            max_screenshots: self
                .max_screenshots
                .as_deref()
                .map(clamp_max_screenshots)
                .unwrap_or(current.max_screenshots),
            auto_timestamp: self.auto_timestamp.unwrap_or(current.auto_timestamp),
            prompt_caption: self.prompt_caption.unwrap_or(current.prompt_caption),
            dark_mode: self.dark_mode.unwrap_or(current.dark_mode),
        }
    }
}
