//! Transport seam: the two capabilities the moderation core consumes.
//!
//! The core is a logic layer behind an injected transport. Incoming traffic
//! is a stream of [`MessageEvent`]s; outgoing effects go through an
//! [`ActionSink`]. Implementations own connection handling, auth, and retry
//! policy; the core treats every sink call as best-effort and never retries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single incoming chat message, as delivered by the platform layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Stable platform ID of the author.
    pub author_id: String,
    /// Display name used in warning and mute notices.
    pub author_display_name: String,
    /// Whether the author is an automated account.
    #[serde(default)]
    pub author_is_bot: bool,
    /// Channel the message arrived in.
    pub channel_id: String,
    /// Human-readable channel name, used in notices and log output.
    pub channel_name: String,
    /// Arrival instant as reported by the platform.
    pub timestamp: DateTime<Utc>,
}

/// Failure taxonomy for sink operations.
///
/// Every variant is non-fatal to the processing loop: failures are logged
/// once and never propagated past the escalation layer.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    /// The platform refused a permission change: insufficient privilege or
    /// the target user is no longer present.
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    /// A channel lookup failed (deleted, hidden, or never existed).
    #[error("channel not found: {0}")]
    ChannelNotFound(String),
    /// Any other transport failure.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Outbound actions the moderation core can take.
#[async_trait]
pub trait ActionSink: Send + Sync {
    /// Send a text message into a channel.
    async fn send_channel_message(&self, channel_id: &str, text: &str) -> Result<(), SinkError>;

    /// Set a user's send-permission override in a channel.
    ///
    /// `Some(false)` denies sending, `Some(true)` grants it explicitly, and
    /// `None` clears the override so the channel default applies again.
    async fn set_send_permission(
        &self,
        channel_id: &str,
        user_id: &str,
        allowed: Option<bool>,
    ) -> Result<(), SinkError>;
}
