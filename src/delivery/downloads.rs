//! File saving for delivered artifacts.

use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::task;

use super::DeliveryError;

/// A named artifact to save.
#[derive(Debug, Clone)]
pub struct DownloadRequest {
    /// Path relative to the downloads directory (may contain folders).
    pub filename: String,
    pub bytes: Vec<u8>,
    /// Ask the user where to save instead of using the default location.
    pub save_as: bool,
}

/// The host's file-save mechanism.
#[async_trait]
pub trait Downloads: Send + Sync {
    /// Save the artifact and return where it was written.
    async fn download(&self, request: DownloadRequest) -> Result<PathBuf, DeliveryError>;
}

/// Chooses a location for save-as downloads. `None` means the user declined.
pub trait SaveAsPrompt: Send + Sync {
    fn choose(&self, suggested: &Path) -> Option<PathBuf>;
}

/// Saves under the suggested path without asking.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptSuggested;

impl SaveAsPrompt for AcceptSuggested {
    fn choose(&self, suggested: &Path) -> Option<PathBuf> {
        Some(suggested.to_path_buf())
    }
}

/// Always saves at one preset location.
#[derive(Debug, Clone)]
pub struct FixedLocation(pub PathBuf);

impl SaveAsPrompt for FixedLocation {
    fn choose(&self, _suggested: &Path) -> Option<PathBuf> {
        Some(self.0.clone())
    }
}

/// Asks on the terminal. An empty line accepts the suggestion; EOF declines.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalSavePrompt;

impl SaveAsPrompt for TerminalSavePrompt {
    fn choose(&self, suggested: &Path) -> Option<PathBuf> {
        let mut stdout = io::stdout();
        write!(stdout, "Save as [{}]: ", suggested.display()).ok()?;
        stdout.flush().ok()?;

        let mut line = String::new();
        match io::stdin().lock().read_line(&mut line) {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let answer = line.trim();
                if answer.is_empty() {
                    Some(suggested.to_path_buf())
                } else {
                    Some(PathBuf::from(answer))
                }
            }
        }
    }
}

/// Writes downloads into a directory on disk.
#[derive(Clone)]
pub struct FileSystemDownloads {
    directory: PathBuf,
    prompt: Arc<dyn SaveAsPrompt>,
}

impl FileSystemDownloads {
    pub fn new(directory: impl Into<PathBuf>, prompt: Arc<dyn SaveAsPrompt>) -> Self {
        Self {
            directory: directory.into(),
            prompt,
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn save_blocking(&self, request: DownloadRequest) -> Result<PathBuf, DeliveryError> {
        let relative = sanitize_relative(&request.filename)?;
        let suggested = self.directory.join(relative);

        let target = if request.save_as {
            self.prompt
                .choose(&suggested)
                .ok_or(DeliveryError::DeliveryDenied)?
        } else {
            suggested
        };

        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            if !parent.exists() {
                log::info!("Creating download directory: {}", parent.display());
            }
            fs::create_dir_all(parent).map_err(|e| {
                DeliveryError::DeliveryFailed(format!("{}: {}", parent.display(), e))
            })?;
        }

        log::info!(
            "Saving {} to: {} ({} bytes)",
            request.filename,
            target.display(),
            request.bytes.len()
        );
        fs::write(&target, &request.bytes)
            .map_err(|e| DeliveryError::DeliveryFailed(format!("{}: {}", target.display(), e)))?;

        Ok(target)
    }
}

#[async_trait]
impl Downloads for FileSystemDownloads {
    async fn download(&self, request: DownloadRequest) -> Result<PathBuf, DeliveryError> {
        let downloads = self.clone();
        task::spawn_blocking(move || downloads.save_blocking(request))
            .await
            .map_err(|e| DeliveryError::DeliveryFailed(format!("Save task failed: {}", e)))?
    }
}

/// Reject absolute paths and parent-directory components.
fn sanitize_relative(filename: &str) -> Result<PathBuf, DeliveryError> {
    let path = Path::new(filename);
    let valid = !filename.is_empty()
        && path
            .components()
            .all(|component| matches!(component, Component::Normal(_) | Component::CurDir));
    if valid {
        Ok(path.to_path_buf())
    } else {
        Err(DeliveryError::DeliveryFailed(format!(
            "invalid download filename '{}'",
            filename
        )))
    }
}
