//! Library exports for tubesnap.
//!
//! The page context captures frames and drives exports; the host context
//! receives artifacts and saves them. Both run as tasks on one tokio runtime
//! and share nothing but the key-value store and the request channel.

pub mod capture;
pub mod config;
pub mod delivery;
pub mod export;
pub mod notification;
pub mod page;
pub mod settings;
pub mod storage;

pub use config::Config;
