use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::{mpsc, oneshot};

use super::{
    DeliveryError, data_url,
    downloads::{DownloadRequest, Downloads},
    messages::{HostRequest, HostResponse, LifecycleEvent, ScreenshotPayload},
};
use crate::export::files::{MANIFEST_FILENAME, manifest_text};

/// Where delivered artifacts land inside the downloads directory.
#[derive(Debug, Clone)]
pub struct DownloadLayout {
    /// Folder for discrete-file exports.
    pub folder: String,
    /// File name of the paginated document.
    pub pdf_filename: String,
}

impl Default for DownloadLayout {
    fn default() -> Self {
        Self {
            folder: "youtube-screenshots".to_string(),
            pdf_filename: "youtube-screenshots.pdf".to_string(),
        }
    }
}

enum HostCommand {
    Request {
        request: HostRequest,
        reply: oneshot::Sender<HostResponse>,
    },
    Lifecycle(LifecycleEvent),
    Shutdown,
}

/// Page-side handle to the host context.
///
/// Cloning is cheap. Once the host task has stopped every request fails with
/// [`DeliveryError::ContextInvalidated`].
#[derive(Clone)]
pub struct HostHandle {
    command_tx: mpsc::UnboundedSender<HostCommand>,
}

impl HostHandle {
    /// Send a request and wait for its single response.
    pub async fn request(&self, request: HostRequest) -> Result<HostResponse, DeliveryError> {
        let (reply, response) = oneshot::channel();
        self.command_tx
            .send(HostCommand::Request { request, reply })
            .map_err(|_| DeliveryError::ContextInvalidated)?;
        response.await.map_err(|_| DeliveryError::ContextInvalidated)
    }

    /// Whether the host task is still receiving.
    pub fn is_alive(&self) -> bool {
        !self.command_tx.is_closed()
    }

    pub fn lifecycle(&self, event: LifecycleEvent) {
        let _ = self.command_tx.send(HostCommand::Lifecycle(event));
    }

    /// Stop the host task. Requests already queued are still answered.
    pub fn shutdown(&self) {
        let _ = self.command_tx.send(HostCommand::Shutdown);
    }
}

/// The host context: receives delivery requests and saves artifacts.
pub struct HostContext {
    downloads: Arc<dyn Downloads>,
    layout: DownloadLayout,
}

impl HostContext {
    pub fn new(downloads: Arc<dyn Downloads>, layout: DownloadLayout) -> Self {
        Self { downloads, layout }
    }

    /// Start the host task on `runtime_handle` and return its handle.
    pub fn spawn(self, runtime_handle: &tokio::runtime::Handle) -> HostHandle {
        let (command_tx, mut command_rx) = mpsc::unbounded_channel::<HostCommand>();

        runtime_handle.spawn(async move {
            while let Some(command) = command_rx.recv().await {
                match command {
                    HostCommand::Request { request, reply } => {
                        log::debug!("Received message: {}", request.action());
                        let response = self.handle(request).await;
                        if reply.send(response).is_err() {
                            log::debug!("Requester went away before the response was sent");
                        }
                    }
                    HostCommand::Lifecycle(LifecycleEvent::Installed) => {
                        log::info!("tubesnap installed/updated");
                    }
                    HostCommand::Lifecycle(LifecycleEvent::Startup) => {
                        log::info!("tubesnap started");
                    }
                    HostCommand::Shutdown => {
                        log::debug!("Host context shutting down");
                        break;
                    }
                }
            }
            command_rx.close();
            while let Some(command) = command_rx.recv().await {
                if let HostCommand::Request { request, reply } = command {
                    let response = self.handle(request).await;
                    let _ = reply.send(response);
                }
            }
        });

        HostHandle { command_tx }
    }

    async fn handle(&self, request: HostRequest) -> HostResponse {
        let result = match request {
            HostRequest::SaveScreenshots { screenshots } => {
                self.save_screenshots(&screenshots).await
            }
            HostRequest::DownloadPdf { blob } => self.download_pdf(&blob).await,
        };

        match result {
            Ok(()) => HostResponse::ok(),
            Err(err) => {
                log::error!("Delivery failed: {}", err);
                HostResponse::from_error(&err)
            }
        }
    }

    async fn save_screenshots(&self, screenshots: &[ScreenshotPayload]) -> Result<(), DeliveryError> {
        let images = screenshots.iter().map(|shot| async move {
            let bytes = data_url::decode(&shot.data)?;
            self.downloads
                .download(DownloadRequest {
                    filename: format!("{}/{}", self.layout.folder, shot.filename),
                    bytes,
                    save_as: false,
                })
                .await
        });

        let manifest = manifest_text(screenshots.iter().map(|shot| {
            (
                shot.filename.as_str(),
                shot.timestamp.as_str(),
                shot.caption.as_str(),
            )
        }));
        let manifest_download = self.downloads.download(DownloadRequest {
            filename: format!("{}/{}", self.layout.folder, MANIFEST_FILENAME),
            bytes: manifest.into_bytes(),
            save_as: false,
        });

        let (image_results, manifest_result) = futures::join!(join_all(images), manifest_download);

        let total = image_results.len() + 1;
        let mut failed = 0;
        for result in image_results.iter().chain(std::iter::once(&manifest_result)) {
            if let Err(err) = result {
                log::error!("Error downloading file: {}", err);
                failed += 1;
            }
        }

        if failed == 0 {
            log::info!("Saved {} screenshots and the index", screenshots.len());
            Ok(())
        } else {
            Err(DeliveryError::Partial { failed, total })
        }
    }

    async fn download_pdf(&self, blob: &str) -> Result<(), DeliveryError> {
        let bytes = data_url::decode(blob)?;
        let path = self
            .downloads
            .download(DownloadRequest {
                filename: self.layout.pdf_filename.clone(),
                bytes,
                save_as: true,
            })
            .await?;
        log::info!("PDF saved to {}", path.display());
        Ok(())
    }
}
