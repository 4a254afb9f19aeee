//! User-facing notifications.
//!
//! Operation-level failures are never returned to other components; they end
//! up here as a short message that disappears on its own after a while.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use zbus::{Connection, proxy};

pub const DEFAULT_NOTIFICATION_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub kind: NotificationKind,
}

impl Notification {
    pub fn success(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Success,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: NotificationKind::Error,
        }
    }
}

/// Surface that displays notifications.
pub trait Notifier: Send + Sync {
    fn show(&self, notification: Notification);

    /// Withdraw whatever this surface is currently showing. Surfaces that
    /// cannot take a message back ignore this.
    fn dismiss(&self) {}
}

/// Keeps at most one visible notification and dismisses it after `duration`.
///
/// Showing a new notification replaces the current one. Dismissal runs on the
/// tokio runtime the notifier was created with, and is passed on to the
/// display surface when one is attached.
#[derive(Clone)]
pub struct TransientNotifier {
    current: Arc<Mutex<Option<(u64, Notification)>>>,
    duration: Duration,
    runtime_handle: tokio::runtime::Handle,
    display: Option<Arc<dyn Notifier>>,
}

impl TransientNotifier {
    pub fn new(runtime_handle: &tokio::runtime::Handle, duration: Duration) -> Self {
        Self {
            current: Arc::new(Mutex::new(None)),
            duration,
            runtime_handle: runtime_handle.clone(),
            display: None,
        }
    }

    /// Render through `display`.
    pub fn with_display(mut self, display: Arc<dyn Notifier>) -> Self {
        self.display = Some(display);
        self
    }

    /// The notification currently on screen.
    pub fn visible(&self) -> Option<Notification> {
        self.current
            .lock()
            .ok()
            .and_then(|current| current.as_ref().map(|(_, n)| n.clone()))
    }
}

impl Notifier for TransientNotifier {
    fn show(&self, notification: Notification) {
        log::info!("Showing notification: {} ({:?})", notification.message, notification.kind);

        let generation = match self.current.lock() {
            Ok(mut current) => {
                let generation = current.as_ref().map_or(0, |(g, _)| g + 1);
                *current = Some((generation, notification.clone()));
                generation
            }
            Err(_) => return,
        };
        if let Some(display) = &self.display {
            display.show(notification);
        }

        let current = Arc::clone(&self.current);
        let display = self.display.clone();
        let duration = self.duration;
        self.runtime_handle.spawn(async move {
            tokio::time::sleep(duration).await;
            let expired = match current.lock() {
                Ok(mut current) if current.as_ref().is_some_and(|(g, _)| *g == generation) => {
                    *current = None;
                    true
                }
                _ => false,
            };
            if let (true, Some(display)) = (expired, display) {
                display.dismiss();
            }
        });
    }
}

/// Prints notifications on the terminal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleNotifier;

impl Notifier for ConsoleNotifier {
    fn show(&self, notification: Notification) {
        match notification.kind {
            NotificationKind::Success => println!("{}", notification.message),
            NotificationKind::Error => eprintln!("{}", notification.message),
        }
    }
}

/// Fans a notification out to several surfaces.
pub struct MultiNotifier(pub Vec<Arc<dyn Notifier>>);

impl Notifier for MultiNotifier {
    fn show(&self, notification: Notification) {
        for notifier in &self.0 {
            notifier.show(notification.clone());
        }
    }

    fn dismiss(&self) {
        for notifier in &self.0 {
            notifier.dismiss();
        }
    }
}

/// D-Bus interface for freedesktop Notifications.
#[proxy(
    interface = "org.freedesktop.Notifications",
    default_service = "org.freedesktop.Notifications",
    default_path = "/org/freedesktop/Notifications"
)]
trait Notifications {
    /// Send a notification.
    ///
    /// # Returns
    /// Notification ID
    fn notify(
        &self,
        app_name: &str,
        replaces_id: u32,
        app_icon: &str,
        summary: &str,
        body: &str,
        actions: Vec<&str>,
        hints: HashMap<&str, zbus::zvariant::Value<'_>>,
        expire_timeout: i32,
    ) -> zbus::Result<u32>;

    /// Close a notification before it expires.
    fn close_notification(&self, id: u32) -> zbus::Result<()>;
}

async fn notifications_proxy() -> Result<NotificationsProxy<'static>, String> {
    let connection = Connection::session()
        .await
        .map_err(|e| format!("Failed to connect to session bus: {}", e))?;

    NotificationsProxy::new(&connection)
        .await
        .map_err(|e| format!("Failed to create notifications proxy: {}", e))
}

/// Send a desktop notification over the session bus, replacing notification
/// `replaces_id` when it is non-zero. Returns the id the server assigned.
pub async fn send_notification(
    summary: &str,
    body: &str,
    icon: &str,
    replaces_id: u32,
    expire_timeout: Duration,
) -> Result<u32, String> {
    let proxy = notifications_proxy().await?;
    proxy
        .notify(
            "TubeSnap",
            replaces_id,
            icon,
            summary,
            body,
            vec![],
            HashMap::new(),
            expire_timeout.as_millis().min(i32::MAX as u128) as i32,
        )
        .await
        .map_err(|e| format!("Failed to send notification: {}", e))
}

/// Close desktop notification `id`.
pub async fn close_notification(id: u32) -> Result<(), String> {
    let proxy = notifications_proxy().await?;
    proxy
        .close_notification(id)
        .await
        .map_err(|e| format!("Failed to close notification: {}", e))
}

/// Desktop notifications, sent in the background. Failures are logged.
///
/// Each notification replaces the previous one, so at most one is on screen.
#[derive(Clone)]
pub struct DesktopNotifier {
    runtime_handle: tokio::runtime::Handle,
    duration: Duration,
    /// Server id of the notification on screen, 0 when there is none.
    shown_id: Arc<tokio::sync::Mutex<u32>>,
}

impl DesktopNotifier {
    pub fn new(runtime_handle: &tokio::runtime::Handle, duration: Duration) -> Self {
        Self {
            runtime_handle: runtime_handle.clone(),
            duration,
            shown_id: Arc::new(tokio::sync::Mutex::new(0)),
        }
    }
}

impl Notifier for DesktopNotifier {
    fn show(&self, notification: Notification) {
        let duration = self.duration;
        let shown_id = Arc::clone(&self.shown_id);
        self.runtime_handle.spawn(async move {
            let icon = match notification.kind {
                NotificationKind::Success => "camera-photo",
                NotificationKind::Error => "dialog-error",
            };
            let mut shown_id = shown_id.lock().await;
            match send_notification("TubeSnap", &notification.message, icon, *shown_id, duration)
                .await
            {
                Ok(id) => *shown_id = id,
                Err(e) => log::warn!("Failed to send notification: {}", e),
            }
        });
    }

    fn dismiss(&self) {
        let shown_id = Arc::clone(&self.shown_id);
        self.runtime_handle.spawn(async move {
            let mut shown_id = shown_id.lock().await;
            if *shown_id == 0 {
                return;
            }
            if let Err(e) = close_notification(*shown_id).await {
                log::debug!("{}", e);
            }
            *shown_id = 0;
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct RecordingDisplay {
        shown: Mutex<Vec<String>>,
        dismissed: AtomicUsize,
    }

    impl Notifier for RecordingDisplay {
        fn show(&self, notification: Notification) {
            self.shown.lock().unwrap().push(notification.message);
        }

        fn dismiss(&self) {
            self.dismissed.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn display_is_dismissed_once_the_latest_expires() {
        let display = Arc::new(RecordingDisplay::default());
        let notifier =
            TransientNotifier::new(&tokio::runtime::Handle::current(), Duration::from_secs(3))
                .with_display(display.clone());

        notifier.show(Notification::success("Generating PDF..."));
        tokio::time::sleep(Duration::from_secs(1)).await;
        notifier.show(Notification::success("PDF generated successfully!"));

        // The first timer fires here but the first message is already replaced.
        tokio::time::sleep(Duration::from_millis(2500)).await;
        assert_eq!(display.dismissed.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(display.dismissed.load(Ordering::SeqCst), 1);
        assert_eq!(
            *display.shown.lock().unwrap(),
            vec!["Generating PDF...", "PDF generated successfully!"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn notification_dismisses_after_duration() {
        let notifier =
            TransientNotifier::new(&tokio::runtime::Handle::current(), Duration::from_secs(3));
        notifier.show(Notification::success("Screenshot captured!"));
        assert_eq!(
            notifier.visible(),
            Some(Notification::success("Screenshot captured!"))
        );

        tokio::time::sleep(Duration::from_millis(3100)).await;
        assert_eq!(notifier.visible(), None);
    }

    #[tokio::test(start_paused = true)]
    async fn newer_notification_replaces_and_outlives_older() {
        let notifier =
            TransientNotifier::new(&tokio::runtime::Handle::current(), Duration::from_secs(3));
        notifier.show(Notification::success("first"));
        tokio::time::sleep(Duration::from_secs(2)).await;
        notifier.show(Notification::error("second"));

        tokio::time::sleep(Duration::from_millis(1500)).await;
        assert_eq!(notifier.visible(), Some(Notification::error("second")));

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(notifier.visible(), None);
    }
}
