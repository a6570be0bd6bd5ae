//! Notification channel for rendered deployment messages.
//!
//! [`NotificationChannel`] is the seam the request pipeline sends through;
//! [`TelegramChannel`] is the production implementation. There is no retry
//! or batching guarantee beyond a fixed inter-message delay.

pub mod telegram;

use std::time::Duration;

use async_trait::async_trait;

use crate::errors::ChannelError;

pub use telegram::TelegramChannel;

/// Delay between messages in a batch, to respect chat API rate limits.
const BATCH_DELAY: Duration = Duration::from_millis(100);

/// A channel that delivers rendered message strings to an external chat API.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    /// Deliver a single message. Fails if the remote API responds with a
    /// non-success status or an application-level failure flag.
    async fn send(&self, text: &str) -> Result<(), ChannelError>;

    /// Deliver each message sequentially with a fixed inter-message delay;
    /// stops and propagates on the first failure.
    async fn send_batch(&self, messages: &[String]) -> Result<(), ChannelError> {
        for message in messages {
            self.send(message).await?;
            tokio::time::sleep(BATCH_DELAY).await;
        }
        Ok(())
    }

    /// Best-effort liveness probe; returns `false` on any error rather than
    /// propagating it.
    async fn test_connection(&self) -> bool;
}
