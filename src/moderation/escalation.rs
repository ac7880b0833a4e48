//! Escalation actions: warnings, mutes, and the deferred unmute.
//!
//! Consumes tracker decisions and drives the action sink. Every sink call
//! is best-effort: failures are logged once and the processing loop stays
//! live. The one concurrency-sensitive piece is the deferred unmute, which
//! runs on an independent timer task and re-enters the coordinator through
//! its own event channel instead of touching user state directly.

use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::sync::mpsc;

use super::coordinator::ModerationEvent;
use crate::channels::traits::{ActionSink, MessageEvent, SinkError};

/// Executes the warn / warn / mute ladder through the action sink.
pub struct EscalationController {
    sink: Arc<dyn ActionSink>,
    /// Channel receiving staff notices for mutes and unmutes.
    staff_channel_id: String,
    /// Delay before the automatic reversal of a mute.
    mute_duration: std::time::Duration,
    /// Sender back into the coordinator, used by unmute timers.
    events: mpsc::Sender<ModerationEvent>,
}

impl EscalationController {
    pub fn new(
        sink: Arc<dyn ActionSink>,
        staff_channel_id: String,
        mute_duration: std::time::Duration,
        events: mpsc::Sender<ModerationEvent>,
    ) -> Self {
        Self {
            sink,
            staff_channel_id,
            mute_duration,
            events,
        }
    }

    /// Send a "Warning N/3" notice in the originating channel.
    pub async fn warn(&self, event: &MessageEvent, stage: u8) {
        let text = format!(
            "{}, Warning {stage}/3 for spamming.",
            event.author_display_name
        );
        if let Err(e) = self
            .sink
            .send_channel_message(&event.channel_id, &text)
            .await
        {
            tracing::error!(
                user_id = %event.author_id,
                channel = %event.channel_name,
                "Failed to send warning notice: {e}"
            );
        }
        tracing::warn!(
            user_id = %event.author_id,
            channel = %event.channel_name,
            stage,
            "Warning issued for spamming"
        );
    }

    /// Revoke the user's send permission and announce the mute.
    ///
    /// Returns `false` if the permission change failed, in which case
    /// nothing else happens (no notices, no timer) and the caller must
    /// leave the user's stage untouched so a later burst retries.
    pub async fn mute(&self, event: &MessageEvent, now: DateTime<Utc>) -> bool {
        if let Err(e) = self
            .sink
            .set_send_permission(&event.channel_id, &event.author_id, Some(false))
            .await
        {
            tracing::error!(
                user_id = %event.author_id,
                channel = %event.channel_name,
                "Could not mute {}: {e}",
                event.author_display_name
            );
            return false;
        }

        let text = format!(
            "{}, Warning 3/3. You have been muted for spamming.",
            event.author_display_name
        );
        if let Err(e) = self
            .sink
            .send_channel_message(&event.channel_id, &text)
            .await
        {
            tracing::error!(
                user_id = %event.author_id,
                channel = %event.channel_name,
                "Failed to send mute notice: {e}"
            );
        }
        tracing::warn!(
            user_id = %event.author_id,
            channel = %event.channel_name,
            "User muted for spamming"
        );

        self.notify_staff(&format!(
            "User {} has been muted for spamming in #{} (Time: {} Date: {})",
            event.author_display_name,
            event.channel_name,
            now.format("%H:%M"),
            now.format("%Y-%m-%d"),
        ))
        .await;

        true
    }

    /// Schedule the automatic reversal for a mute that just landed.
    ///
    /// Each mute gets its own timer; a second mute for the same user during
    /// the wait is not merged with the first. The timer re-enters the
    /// coordinator rather than mutating state from here.
    pub fn schedule_unmute(&self, event: &MessageEvent) {
        let events = self.events.clone();
        let delay = self.mute_duration;
        let unmute = ModerationEvent::Unmute {
            channel_id: event.channel_id.clone(),
            channel_name: event.channel_name.clone(),
            user_id: event.author_id.clone(),
            display_name: event.author_display_name.clone(),
        };
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            // A closed channel means the coordinator is gone; there is
            // nothing left to restore.
            let _ = events.send(unmute).await;
        });
    }

    /// Clear the mute override and announce the reversal.
    pub async fn unmute(
        &self,
        channel_id: &str,
        channel_name: &str,
        user_id: &str,
        display_name: &str,
    ) {
        // Clear the explicit override so the channel default applies again;
        // no attempt is made to restore any earlier explicit grant.
        if let Err(e) = self
            .sink
            .set_send_permission(channel_id, user_id, None)
            .await
        {
            tracing::error!(
                user_id,
                channel = channel_name,
                "Could not lift mute for {display_name}: {e}"
            );
            return;
        }

        let text = format!("{display_name}, your mute has been removed.");
        if let Err(e) = self.sink.send_channel_message(channel_id, &text).await {
            tracing::error!(
                user_id,
                channel = channel_name,
                "Failed to send unmute notice: {e}"
            );
        }

        self.notify_staff(&format!(
            "User {display_name} has been unmuted automatically after {} minutes.",
            self.mute_duration.as_secs() / 60,
        ))
        .await;

        tracing::info!(user_id, channel = channel_name, "User unmuted automatically");
    }

    /// Staff notices are best-effort: a missing staff channel skips the
    /// notice, anything else is logged, and neither blocks the action that
    /// triggered it.
    async fn notify_staff(&self, text: &str) {
        match self
            .sink
            .send_channel_message(&self.staff_channel_id, text)
            .await
        {
            Ok(()) => {}
            Err(SinkError::ChannelNotFound(channel)) => {
                tracing::warn!(%channel, "Staff channel unavailable, notice skipped");
            }
            Err(e) => tracing::error!("Failed to notify staff channel: {e}"),
        }
    }
}
