//! deploy-notify core library.
//!
//! This crate provides the foundational components for the deployment
//! notification pipeline: configuration, the persisted dedup state store,
//! payload normalization and message formatting, and the Telegram
//! notification channel.

pub mod config;
pub mod errors;
pub mod formatter;
pub mod models;
pub mod notify;
pub mod state;
pub mod store;

// Re-exports for convenience.
pub use config::AppConfig;
pub use models::{DeploymentKind, DeploymentNotification, PushDeploymentPayload};
pub use notify::{NotificationChannel, TelegramChannel};
pub use state::StateStore;
pub use store::{BlobStore, MemoryStore, SqliteStore};
