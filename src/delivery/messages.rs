//! Messages exchanged between the page context and the host context.
//!
//! Every message is a JSON object tagged by its `action` field.

use serde::{Deserialize, Serialize};

use super::DeliveryError;
use crate::settings::Settings;

/// One image of a discrete-files export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScreenshotPayload {
    /// `data:image/png;base64,` URL.
    pub data: String,
    pub filename: String,
    /// Formatted `HH:MM:SS` position.
    pub timestamp: String,
    pub caption: String,
}

/// Requests the page sends to the host. Each gets exactly one response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum HostRequest {
    #[serde(rename = "saveScreenshots")]
    SaveScreenshots { screenshots: Vec<ScreenshotPayload> },

    #[serde(rename = "downloadPDF")]
    DownloadPdf {
        /// Base64 data URL of the PDF.
        blob: String,
    },
}

impl HostRequest {
    pub fn action(&self) -> &'static str {
        match self {
            HostRequest::SaveScreenshots { .. } => "saveScreenshots",
            HostRequest::DownloadPdf { .. } => "downloadPDF",
        }
    }
}

/// Notifications pushed to the page. No response is expected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action")]
pub enum PageMessage {
    #[serde(rename = "settingsUpdated")]
    SettingsUpdated { settings: Settings },

    #[serde(rename = "pdfError")]
    PdfError { error: String },
}

/// Machine-readable reason attached to a failed response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum FailureKind {
    Denied,
    Failed,
    Partial { failed: usize, total: usize },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
}

impl HostResponse {
    pub fn ok() -> Self {
        Self {
            success: true,
            error: None,
            failure: None,
        }
    }

    pub fn from_error(error: &DeliveryError) -> Self {
        let failure = match error {
            DeliveryError::DeliveryDenied => FailureKind::Denied,
            DeliveryError::Partial { failed, total } => FailureKind::Partial {
                failed: *failed,
                total: *total,
            },
            DeliveryError::DeliveryFailed(_) | DeliveryError::ContextInvalidated => {
                FailureKind::Failed
            }
        };
        Self {
            success: false,
            error: Some(error.to_string()),
            failure: Some(failure),
        }
    }

    /// Convert back into a typed result on the page side.
    pub fn into_result(self) -> Result<(), DeliveryError> {
        if self.success {
            return Ok(());
        }
        let message = self
            .error
            .unwrap_or_else(|| "Unknown error during download".to_string());
        Err(match self.failure {
            Some(FailureKind::Denied) => DeliveryError::DeliveryDenied,
            Some(FailureKind::Partial { failed, total }) => DeliveryError::Partial { failed, total },
            Some(FailureKind::Failed) | None => DeliveryError::DeliveryFailed(message),
        })
    }
}

/// Host lifecycle events. Logged only.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Installed,
    Startup,
}
