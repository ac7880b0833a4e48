//! Single-owner event loop for moderation state.
//!
//! All per-user state lives inside one spawned task; message events and
//! unmute timer firings arrive over the same mpsc channel, so tracker
//! mutation needs no locking at all. A periodic tick sweeps idle users.

use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use super::escalation::EscalationController;
use super::tracker::{Decision, RateTracker};
use crate::channels::traits::{ActionSink, MessageEvent};
use crate::config::Config;

/// Event channel depth. Bursty platforms deliver faster than the sink
/// round-trips; 256 absorbs that without unbounded growth.
const EVENT_BUFFER: usize = 256;

/// Everything the coordinator reacts to.
#[derive(Debug, Clone)]
pub enum ModerationEvent {
    /// An incoming chat message.
    Message(MessageEvent),
    /// A mute timer fired: restore the channel default for this user.
    Unmute {
        channel_id: String,
        channel_name: String,
        user_id: String,
        display_name: String,
    },
}

/// Cloneable handle for feeding events to a running coordinator.
#[derive(Clone)]
pub struct CoordinatorHandle {
    tx: mpsc::Sender<ModerationEvent>,
}

impl CoordinatorHandle {
    /// Queue an incoming message for processing.
    pub async fn submit(&self, event: MessageEvent) -> anyhow::Result<()> {
        self.tx
            .send(ModerationEvent::Message(event))
            .await
            .map_err(|_| anyhow::anyhow!("moderation coordinator is gone"))
    }
}

/// The owning task: tracker, controller, and the event loop.
pub struct ModerationCoordinator {
    tracker: RateTracker,
    controller: EscalationController,
    sweep_interval: std::time::Duration,
}

impl ModerationCoordinator {
    /// Build the coordinator, spawn its event loop, and return the feed
    /// handle plus the join handle for shutdown.
    pub fn spawn(config: &Config, sink: Arc<dyn ActionSink>) -> (CoordinatorHandle, JoinHandle<()>) {
        let (tx, rx) = mpsc::channel(EVENT_BUFFER);
        let controller = EscalationController::new(
            sink,
            config.staff_channel_id.clone(),
            config.mute_duration(),
            tx.clone(),
        );
        let coordinator = Self {
            tracker: RateTracker::from_config(config),
            controller,
            sweep_interval: config.sweep_interval(),
        };
        let task = tokio::spawn(coordinator.run(rx));
        (CoordinatorHandle { tx }, task)
    }

    /// Drain events until every sender is gone.
    async fn run(mut self, mut rx: mpsc::Receiver<ModerationEvent>) {
        let mut sweep = tokio::time::interval(self.sweep_interval);
        sweep.tick().await; // the first tick fires immediately

        loop {
            tokio::select! {
                event = rx.recv() => match event {
                    Some(ModerationEvent::Message(msg)) => self.on_message(msg).await,
                    Some(ModerationEvent::Unmute { channel_id, channel_name, user_id, display_name }) => {
                        self.controller
                            .unmute(&channel_id, &channel_name, &user_id, &display_name)
                            .await;
                    }
                    None => break,
                },
                _ = sweep.tick() => {
                    let removed = self.tracker.sweep_stale(Utc::now());
                    if removed > 0 {
                        tracing::debug!(removed, "Swept idle user state");
                    }
                }
            }
        }
        tracing::debug!("Moderation coordinator stopped");
    }

    async fn on_message(&mut self, event: MessageEvent) {
        // Self- and bot-authored traffic never reaches the rate logic.
        if event.author_is_bot {
            return;
        }

        match self
            .tracker
            .record(&event.author_id, &event.channel_id, event.timestamp)
        {
            Decision::None => {
                if !self.tracker.is_monitored(&event.channel_id) {
                    tracing::debug!(
                        channel = %event.channel_name,
                        "Message ignored (channel not monitored)"
                    );
                }
            }
            Decision::Warn(stage) => self.controller.warn(&event, stage).await,
            Decision::Mute => {
                if self.controller.mute(&event, event.timestamp).await {
                    // The mute is now independent of further tracker
                    // activity: the user starts a fresh cycle immediately.
                    self.tracker.reset_cycle(&event.author_id);
                    self.controller.schedule_unmute(&event);
                }
            }
        }
    }
}
