use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;

use crate::delivery::{
    DeliveryError, DownloadLayout, Downloads, HostContext, HostHandle, LifecycleEvent,
};

pub const DEFAULT_MAX_INIT_RETRIES: u32 = 3;

/// Shown once reinitialization has been given up.
pub const RELOAD_REQUIRED: &str = "Extension needs to be reloaded. Please refresh the page.";

/// Establishes (or re-establishes) the link to the host context.
#[async_trait]
pub trait HostConnector: Send + Sync {
    async fn connect(&self) -> Result<HostHandle, DeliveryError>;
}

/// Spawns a fresh in-process host context on every connect.
pub struct SpawnedHost {
    runtime_handle: tokio::runtime::Handle,
    downloads: Arc<dyn Downloads>,
    layout: DownloadLayout,
    fresh_install: AtomicBool,
}

impl SpawnedHost {
    pub fn new(
        runtime_handle: &tokio::runtime::Handle,
        downloads: Arc<dyn Downloads>,
        layout: DownloadLayout,
    ) -> Self {
        Self {
            runtime_handle: runtime_handle.clone(),
            downloads,
            layout,
            fresh_install: AtomicBool::new(false),
        }
    }

    /// Report an install event to the first host spawned.
    pub fn fresh_install(self) -> Self {
        self.fresh_install.store(true, Ordering::Relaxed);
        self
    }
}

#[async_trait]
impl HostConnector for SpawnedHost {
    async fn connect(&self) -> Result<HostHandle, DeliveryError> {
        let host = HostContext::new(Arc::clone(&self.downloads), self.layout.clone())
            .spawn(&self.runtime_handle);
        if self.fresh_install.swap(false, Ordering::Relaxed) {
            host.lifecycle(LifecycleEvent::Installed);
        }
        host.lifecycle(LifecycleEvent::Startup);
        Ok(host)
    }
}

/// Counts reinitialization attempts against a fixed cap.
///
/// The counter goes back to zero after a successful reinitialization. Once
/// the cap has been reached no further attempt is made.
#[derive(Debug, Clone)]
pub struct ReinitPolicy {
    max_retries: u32,
    attempts: u32,
}

impl ReinitPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            attempts: 0,
        }
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_retries
    }

    /// Count an attempt. Returns `false` when the cap was already reached.
    pub fn begin_attempt(&mut self) -> bool {
        if self.exhausted() {
            return false;
        }
        self.attempts += 1;
        true
    }

    pub fn succeeded(&mut self) {
        self.attempts = 0;
    }
}

impl Default for ReinitPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_INIT_RETRIES)
    }
}
