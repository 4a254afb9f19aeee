use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info};
use tokio::sync::{mpsc, watch};

use super::PageError;
use super::readiness::{
    DEFAULT_READINESS_POLL, DEFAULT_READINESS_TIMEOUT, NavigationEvent, NavigationWatcher,
    Readiness, wait_for_media,
};
use super::reinit::{DEFAULT_MAX_INIT_RETRIES, HostConnector, RELOAD_REQUIRED, ReinitPolicy};
use crate::capture::{
    AnnotationFlow, CaptionPrompt, CaptionResponse, CaptureError, CaptureId, CaptureStore,
    FrameCapturer, MediaPage,
};
use crate::delivery::{
    DeliveryError, HostHandle, HostRequest, PageMessage, ScreenshotPayload, data_url,
};
use crate::export::{
    DocumentOptions, ExportError, FileNaming, PdfOptions, RendererHandle, assemble_pdf,
    build_batch,
};
use crate::notification::{Notification, Notifier};
use crate::settings::Settings;
use crate::storage::KeyValueStore;

const REFRESH_TO_CAPTURE: &str = "Please refresh the page to continue capturing screenshots.";
const REFRESH_TO_EXPORT: &str = "Please refresh the page to generate PDF.";

/// Tunables of a page context.
#[derive(Debug, Clone)]
pub struct PageOptions {
    pub readiness_timeout: Duration,
    pub readiness_poll: Duration,
    pub max_init_retries: u32,
    /// Font family used for PDF labels.
    pub font_family: String,
}

impl Default for PageOptions {
    fn default() -> Self {
        Self {
            readiness_timeout: DEFAULT_READINESS_TIMEOUT,
            readiness_poll: DEFAULT_READINESS_POLL,
            max_init_retries: DEFAULT_MAX_INIT_RETRIES,
            font_family: "Sans".to_string(),
        }
    }
}

/// One line of the capture listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureSummary {
    /// 1-based position in capture order.
    pub index: usize,
    pub id: CaptureId,
    pub time_formatted: String,
    pub caption: Option<String>,
}

impl fmt::Display for CaptureSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}. {} - {}",
            self.index,
            self.time_formatted,
            self.caption.as_deref().unwrap_or("No caption")
        )
    }
}

/// Page-side state and operations.
///
/// Every public operation reports its own failures through the notifier
/// before returning them.
pub struct PageContext {
    page: Arc<dyn MediaPage>,
    store: CaptureStore,
    capturer: FrameCapturer,
    annotations: AnnotationFlow,
    renderer: RendererHandle,
    connector: Arc<dyn HostConnector>,
    host: Option<HostHandle>,
    reinit: ReinitPolicy,
    notifier: Arc<dyn Notifier>,
    settings_rx: watch::Receiver<Settings>,
    settings: Settings,
    caption_prompt: Option<Arc<dyn CaptionPrompt>>,
    captions_tx: mpsc::UnboundedSender<(CaptureId, CaptionResponse)>,
    captions_rx: mpsc::UnboundedReceiver<(CaptureId, CaptionResponse)>,
    open_captions: usize,
    options: PageOptions,
    initialized: bool,
}

impl PageContext {
    pub fn new(
        page: Arc<dyn MediaPage>,
        storage: Arc<dyn KeyValueStore>,
        connector: Arc<dyn HostConnector>,
        mut settings_rx: watch::Receiver<Settings>,
        notifier: Arc<dyn Notifier>,
        options: PageOptions,
    ) -> Self {
        let settings = settings_rx.borrow_and_update().clone();
        let store = CaptureStore::with_limit(storage, settings.max_screenshots);
        let (captions_tx, captions_rx) = mpsc::unbounded_channel();
        Self {
            page,
            store,
            capturer: FrameCapturer::new(),
            annotations: AnnotationFlow,
            renderer: RendererHandle::default(),
            connector,
            host: None,
            reinit: ReinitPolicy::new(options.max_init_retries),
            notifier,
            settings_rx,
            settings,
            caption_prompt: None,
            captions_tx,
            captions_rx,
            open_captions: 0,
            options,
            initialized: false,
        }
    }

    pub fn with_renderer(mut self, renderer: RendererHandle) -> Self {
        self.renderer = renderer;
        self
    }

    /// Ask for a caption after each capture when `promptCaption` is on. The
    /// prompt runs on its own task; answers are applied by
    /// [`PageContext::apply_captions`] and [`PageContext::settle_captions`].
    pub fn with_caption_prompt(mut self, prompt: Arc<dyn CaptionPrompt>) -> Self {
        self.caption_prompt = Some(prompt);
        self
    }

    pub fn store(&self) -> &CaptureStore {
        &self.store
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn reinit_policy(&self) -> &ReinitPolicy {
        &self.reinit
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Wait for the media element, then initialize. Initialization runs even
    /// when the wait times out.
    pub async fn start(&mut self) -> Result<Readiness, PageError> {
        let readiness = wait_for_media(
            self.page.as_ref(),
            self.options.readiness_timeout,
            self.options.readiness_poll,
        )
        .await;

        if let Err(err) = self.init().await {
            return Err(self.report(err, None));
        }
        Ok(readiness)
    }

    /// Connect to the host and restore persisted captures.
    pub async fn init(&mut self) -> Result<(), PageError> {
        debug!("Initializing page context");
        self.sync_settings();

        let host = self.connector.connect().await?;
        let restored = self.store.load().await?;
        self.host = Some(host);
        self.initialized = true;

        info!("Page context initialized with {} captures", restored);
        Ok(())
    }

    /// Try to re-establish the host link. Gives up for good once the retry
    /// cap has been reached.
    pub async fn reinitialize(&mut self) -> bool {
        debug!("Attempting to reinitialize extension...");
        if !self.reinit.begin_attempt() {
            self.notifier.show(Notification::error(RELOAD_REQUIRED));
            return false;
        }

        match self.init().await {
            Ok(()) => {
                self.reinit.succeeded();
                true
            }
            Err(err) => {
                debug!(
                    "Reinitialization attempt {} of {} failed: {}",
                    self.reinit.attempts(),
                    self.reinit.max_retries(),
                    err
                );
                false
            }
        }
    }

    async fn ensure_context(&mut self, hint: &'static str) -> Result<(), PageError> {
        if self.host.as_ref().is_some_and(HostHandle::is_alive) {
            return Ok(());
        }
        if self.reinitialize().await {
            return Ok(());
        }
        self.notifier.show(Notification::error(hint));
        Err(PageError::ReloadRequired)
    }

    /// Capture the current frame and persist it. When captions are prompted
    /// for, the entry is opened without waiting for its answer.
    pub async fn capture(&mut self) -> Result<CaptureId, PageError> {
        self.sync_settings();
        self.ensure_context(REFRESH_TO_CAPTURE).await?;
        self.apply_captions().await;

        let record = match self.capturer.capture(self.page.as_ref()) {
            Ok(record) => record,
            Err(err) => return Err(self.report(err.into(), None)),
        };
        let id = match self.store.append(record).await {
            Ok(id) => id,
            Err(err) => return Err(self.report(err.into(), None)),
        };
        self.notifier.show(Notification::success("Screenshot captured!"));

        if self.settings.prompt_caption {
            if let Some(prompt) = self.caption_prompt.clone() {
                self.spawn_caption_prompt(id, prompt);
            }
        }
        Ok(id)
    }

    fn spawn_caption_prompt(&mut self, id: CaptureId, prompt: Arc<dyn CaptionPrompt>) {
        let Some(record) = self.store.get(id).cloned() else {
            return;
        };
        let captions_tx = self.captions_tx.clone();
        self.open_captions += 1;
        tokio::spawn(async move {
            let response = prompt.ask(&record).await;
            if captions_tx.send((id, response)).is_err() {
                debug!("Page closed before caption for {} was answered", id);
            }
        });
    }

    /// Number of caption entries still waiting for an answer.
    pub fn open_captions(&self) -> usize {
        self.open_captions
    }

    /// Save the caption answers that have arrived so far.
    pub async fn apply_captions(&mut self) {
        while let Ok((id, response)) = self.captions_rx.try_recv() {
            self.finish_caption(id, response).await;
        }
    }

    /// Wait for every open caption entry to be answered and save the answers.
    pub async fn settle_captions(&mut self) {
        while self.open_captions > 0 {
            match self.captions_rx.recv().await {
                Some((id, response)) => self.finish_caption(id, response).await,
                None => break,
            }
        }
    }

    async fn finish_caption(&mut self, id: CaptureId, response: CaptionResponse) {
        self.open_captions = self.open_captions.saturating_sub(1);
        // A failed caption leaves the capture in place.
        let _ = self.annotate(id, response).await;
    }

    /// Resolve a caption entry for the identified capture.
    pub async fn annotate(
        &mut self,
        id: CaptureId,
        response: CaptionResponse,
    ) -> Result<(), PageError> {
        let pending = self.annotations.begin(id);
        match pending.resolve(&mut self.store, response).await {
            Ok(()) => Ok(()),
            Err(err) => Err(self.caption_failed(err)),
        }
    }

    fn caption_failed(&self, err: CaptureError) -> PageError {
        error!("Error saving caption: {}", err);
        self.notifier.show(Notification::error("Error saving caption!"));
        err.into()
    }

    /// List the captures in order.
    pub fn view(&self) -> Result<Vec<CaptureSummary>, PageError> {
        if self.store.is_empty() {
            self.notifier
                .show(Notification::error(PageError::NothingToView.to_string()));
            return Err(PageError::NothingToView);
        }

        Ok(self
            .store
            .records()
            .iter()
            .enumerate()
            .map(|(i, record)| CaptureSummary {
                index: i + 1,
                id: record.id,
                time_formatted: record.time_formatted.clone(),
                caption: Some(record.caption.clone()).filter(|c| !c.is_empty()),
            })
            .collect())
    }

    /// Drop every capture after `confirm` agrees. Returns `false` when the
    /// user declined.
    pub async fn reset(&mut self, confirm: impl FnOnce(usize) -> bool) -> Result<bool, PageError> {
        if self.store.is_empty() {
            self.notifier
                .show(Notification::error(PageError::NothingToReset.to_string()));
            return Err(PageError::NothingToReset);
        }
        if !confirm(self.store.len()) {
            debug!("Reset cancelled");
            return Ok(false);
        }

        match self.store.reset().await {
            Ok(()) => {
                self.notifier.show(Notification::success("All captures reset!"));
                Ok(true)
            }
            Err(err) => {
                error!("Error resetting screenshots: {}", err);
                self.notifier
                    .show(Notification::error("Error resetting screenshots!"));
                Err(err.into())
            }
        }
    }

    /// Render all captures into one PDF and hand it to the host.
    pub async fn export_pdf(&mut self) -> Result<(), PageError> {
        self.sync_settings();
        self.ensure_context(REFRESH_TO_EXPORT).await?;
        self.apply_captions().await;

        let records = self.store.snapshot();
        if records.is_empty() {
            return Err(self.report(ExportError::NoCaptures.into(), None));
        }

        self.notifier.show(Notification::success("Generating PDF..."));
        match self.deliver_pdf(&records).await {
            Ok(()) => {
                self.notifier
                    .show(Notification::success("PDF generated successfully!"));
                Ok(())
            }
            Err(err) => Err(self.report(err, Some("Error generating PDF"))),
        }
    }

    async fn deliver_pdf(&self, records: &[crate::capture::CaptureRecord]) -> Result<(), PageError> {
        let backend = self.renderer.get().await?;
        let options = PdfOptions {
            document: DocumentOptions {
                font_family: self.options.font_family.clone(),
                quality: self.settings.image_quality,
            },
        };
        let bytes = assemble_pdf(records, backend.as_ref(), &options)?;
        debug!("PDF assembled ({} bytes), sending to host", bytes.len());

        self.send(HostRequest::DownloadPdf {
            blob: data_url::encode(data_url::PDF_MIME, &bytes),
        })
        .await
    }

    /// Hand every capture to the host as a separate PNG plus the manifest.
    pub async fn export_files(&mut self, naming: &FileNaming) -> Result<usize, PageError> {
        self.ensure_context(REFRESH_TO_EXPORT).await?;
        self.apply_captions().await;

        let records = self.store.snapshot();
        if records.is_empty() {
            return Err(self.report(PageError::NothingToExport, None));
        }

        let batch = build_batch(&records, naming);
        let count = batch.len();
        let screenshots = batch
            .entries
            .into_iter()
            .map(|entry| ScreenshotPayload {
                data: data_url::encode(data_url::PNG_MIME, &entry.image),
                filename: entry.filename,
                timestamp: entry.timestamp,
                caption: entry.caption,
            })
            .collect();

        match self.send(HostRequest::SaveScreenshots { screenshots }).await {
            Ok(()) => {
                self.notifier
                    .show(Notification::success(format!("Saved {} screenshots!", count)));
                Ok(count)
            }
            Err(err) => Err(self.report(err, None)),
        }
    }

    async fn send(&self, request: HostRequest) -> Result<(), PageError> {
        let host = self
            .host
            .as_ref()
            .ok_or(DeliveryError::ContextInvalidated)?;
        host.request(request).await?.into_result()?;
        Ok(())
    }

    /// React to a message pushed by the host.
    pub fn handle_message(&mut self, message: PageMessage) {
        match message {
            PageMessage::SettingsUpdated { settings } => {
                debug!("Settings updated: {:?}", settings);
                self.apply_settings(settings);
            }
            PageMessage::PdfError { error } => {
                self.notifier
                    .show(Notification::error(format!("Error generating PDF: {}", error)));
            }
        }
    }

    /// Start following the page location from where the page is now. Later
    /// locations are published on the returned sender.
    pub fn watch_navigation(
        &self,
        runtime_handle: &tokio::runtime::Handle,
    ) -> (
        watch::Sender<String>,
        NavigationWatcher,
        mpsc::UnboundedReceiver<NavigationEvent>,
    ) {
        let (location_tx, location_rx) = watch::channel(self.page.location());
        let (watcher, events) = NavigationWatcher::spawn(runtime_handle, location_rx);
        (location_tx, watcher, events)
    }

    /// The page moved to another watch page: wait for its player and
    /// initialize again.
    pub async fn handle_navigation(&mut self, event: NavigationEvent) -> Result<Readiness, PageError> {
        info!("Navigated to {}", event.location);
        self.start().await
    }

    fn sync_settings(&mut self) {
        if self.settings_rx.has_changed().unwrap_or(false) {
            let settings = self.settings_rx.borrow_and_update().clone();
            self.apply_settings(settings);
        }
    }

    fn apply_settings(&mut self, settings: Settings) {
        self.store.set_limit(settings.max_screenshots);
        self.settings = settings;
    }

    /// Show `err` to the user and hand it back.
    fn report(&mut self, err: PageError, prefix: Option<&str>) -> PageError {
        let message = if err.is_context_invalidated() {
            self.host = None;
            RELOAD_REQUIRED.to_string()
        } else {
            match (&err, prefix) {
                (PageError::Export(ExportError::NoCaptures), _) | (_, None) => err.to_string(),
                (_, Some(prefix)) => format!("{}: {}", prefix, err),
            }
        };

        error!("{}", message);
        self.notifier.show(Notification::error(message));
        err
    }
}
