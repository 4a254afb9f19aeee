//! Waiting for the media element and following in-page navigation.

use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use crate::capture::MediaPage;

pub const DEFAULT_READINESS_TIMEOUT: Duration = Duration::from_millis(10_000);
pub const DEFAULT_READINESS_POLL: Duration = Duration::from_millis(1_000);

/// Outcome of [`wait_for_media`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    Ready,
    TimedOut,
}

/// Poll `page` every `interval` until it exposes a media element or
/// `timeout` has elapsed.
pub async fn wait_for_media(page: &dyn MediaPage, timeout: Duration, interval: Duration) -> Readiness {
    log::debug!("Waiting for video element");

    let interval = interval.max(Duration::from_millis(1));
    let mut elapsed = Duration::ZERO;
    loop {
        if page.media_element().is_some() {
            log::debug!("Video element found");
            return Readiness::Ready;
        }
        if elapsed >= timeout {
            log::debug!("Timeout waiting for video element");
            return Readiness::TimedOut;
        }
        tokio::time::sleep(interval).await;
        elapsed += interval;
    }
}

/// Whether `location` is a watch page.
pub fn is_watch_page(location: &str) -> bool {
    let path = location
        .split_once("://")
        .map_or(location, |(_, rest)| rest.find('/').map_or("", |i| &rest[i..]));
    let path = path.split(['?', '#']).next().unwrap_or_default();
    path.contains("/watch")
}

/// Emitted when the page navigates to a watch page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NavigationEvent {
    pub location: String,
}

/// Background task observing the page location.
///
/// There is one watcher per page lifetime. Dropping it stops the task.
pub struct NavigationWatcher {
    task: JoinHandle<()>,
}

impl NavigationWatcher {
    pub fn spawn(
        runtime_handle: &tokio::runtime::Handle,
        mut location_rx: watch::Receiver<String>,
    ) -> (Self, mpsc::UnboundedReceiver<NavigationEvent>) {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let mut last = location_rx.borrow_and_update().clone();

        let task = runtime_handle.spawn(async move {
            while location_rx.changed().await.is_ok() {
                let location = location_rx.borrow_and_update().clone();
                if location == last {
                    continue;
                }
                log::debug!("URL changed");
                last = location.clone();

                if is_watch_page(&location) {
                    log::debug!("New watch page detected: {}", location);
                    if event_tx.send(NavigationEvent { location }).is_err() {
                        break;
                    }
                }
            }
        });

        (Self { task }, event_rx)
    }

    pub fn cancel(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for NavigationWatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}
