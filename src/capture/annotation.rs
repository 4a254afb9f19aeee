//! Caption entry for freshly captured frames.
//!
//! An annotation is bound to the capture's [`CaptureId`], never to its
//! position, so a reset or another capture in between cannot redirect the
//! caption to the wrong record.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;
use tokio::task;

use super::store::CaptureStore;
use super::types::{CaptureError, CaptureId, CaptureRecord};

/// What the user did with the caption entry surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CaptionResponse {
    /// Explicit save with the entered text.
    Save(String),
    /// Single-line submit gesture; saved like `Save`.
    Submit(String),
    /// Dismissed without a caption.
    Skip,
}

/// Surface that asks the user for a caption.
#[async_trait]
pub trait CaptionPrompt: Send + Sync {
    async fn ask(&self, record: &CaptureRecord) -> CaptionResponse;
}

/// A caption entry waiting for the user's answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingAnnotation {
    id: CaptureId,
}

impl PendingAnnotation {
    pub fn target(&self) -> CaptureId {
        self.id
    }

    /// Save `text` as the caption.
    pub async fn confirm(
        self,
        store: &mut CaptureStore,
        text: impl Into<String>,
    ) -> Result<(), CaptureError> {
        store.set_caption(self.id, text).await
    }

    /// The submit gesture. Text entered before it is kept whole, line breaks
    /// included.
    pub async fn submit_line(self, store: &mut CaptureStore, text: &str) -> Result<(), CaptureError> {
        self.confirm(store, text).await
    }

    /// Leave the caption empty.
    pub fn skip(self) {
        log::debug!("Caption skipped for capture {}", self.id);
    }

    pub async fn resolve(
        self,
        store: &mut CaptureStore,
        response: CaptionResponse,
    ) -> Result<(), CaptureError> {
        match response {
            CaptionResponse::Save(text) => self.confirm(store, text).await,
            CaptionResponse::Submit(text) => self.submit_line(store, &text).await,
            CaptionResponse::Skip => {
                self.skip();
                Ok(())
            }
        }
    }
}

/// Starts caption entries for captures.
#[derive(Debug, Default, Clone, Copy)]
pub struct AnnotationFlow;

impl AnnotationFlow {
    pub fn begin(&self, id: CaptureId) -> PendingAnnotation {
        PendingAnnotation { id }
    }
}

/// Prompt that answers with a preset caption (or skips when there is none).
#[derive(Debug, Clone, Default)]
pub struct PresetCaption(pub Option<String>);

#[async_trait]
impl CaptionPrompt for PresetCaption {
    async fn ask(&self, _record: &CaptureRecord) -> CaptionResponse {
        match &self.0 {
            Some(text) => CaptionResponse::Save(text.clone()),
            None => CaptionResponse::Skip,
        }
    }
}

/// Reads a single caption line from stdin. An empty line or EOF skips.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalCaptionPrompt;

#[async_trait]
impl CaptionPrompt for TerminalCaptionPrompt {
    async fn ask(&self, record: &CaptureRecord) -> CaptionResponse {
        let heading = format!(
            "Add caption for screenshot at {} (empty line to skip): ",
            record.time_formatted
        );

        let line = task::spawn_blocking(move || -> io::Result<String> {
            let mut stdout = io::stdout();
            stdout.write_all(heading.as_bytes())?;
            stdout.flush()?;
            let mut line = String::new();
            io::stdin().lock().read_line(&mut line)?;
            Ok(line)
        })
        .await;

        match line {
            Ok(Ok(line)) if !line.trim().is_empty() => {
                CaptionResponse::Submit(line.trim_end_matches(['\r', '\n']).to_string())
            }
            Ok(Ok(_)) => CaptionResponse::Skip,
            Ok(Err(e)) => {
                log::warn!("Failed to read caption: {}", e);
                CaptionResponse::Skip
            }
            Err(e) => {
                log::warn!("Caption prompt task failed: {}", e);
                CaptionResponse::Skip
            }
        }
    }
}
