//! Sliding-window spam detection with 3-stage escalation.
//!
//! Tracks, per user, the message instants inside a trailing window and a
//! warning-stage counter. Crossing the threshold clears the window and
//! advances the stage; a long enough quiet gap walks the stage back to
//! clean.
//!
//! ## Design
//! - Pure state + decision function: no clock, no I/O. The caller supplies
//!   `now`, which keeps every path deterministic under test
//! - Messages outside the monitored channel set touch nothing
//! - Idle-reset and escalation are mutually exclusive per message
//! - Stage-0 users idle past the TTL are swept; users mid-escalation stay

use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, HashSet};

use crate::config::Config;

/// Outcome of recording one message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// Below threshold, or channel not monitored.
    None,
    /// Threshold crossed while the user was clean or warned once:
    /// issue "Warning N/3".
    Warn(u8),
    /// Third (or later) crossing: revoke send permission.
    Mute,
}

/// Per-user tracking state.
#[derive(Debug, Clone)]
struct UserState {
    /// Message instants within the current window, oldest first.
    timestamps: Vec<DateTime<Utc>>,
    /// Thresholds crossed since the last reset. 0 = clean, 1–2 = warned,
    /// 3+ = mute owed. Stays put when a mute attempt fails, so the next
    /// crossing retries it.
    stage: u8,
    /// Most recent message instant, for the idle-reset gap and the sweep.
    last_seen: DateTime<Utc>,
}

impl UserState {
    fn new(now: DateTime<Utc>) -> Self {
        Self {
            timestamps: Vec::new(),
            stage: 0,
            last_seen: now,
        }
    }
}

/// Sliding-window rate tracker over the monitored channel set.
pub struct RateTracker {
    /// Messages within the window that trigger an escalation step.
    threshold: usize,
    /// Sliding-window length.
    window: Duration,
    /// Quiet gap after which the stage resets.
    warning_reset: Duration,
    /// How long an idle, clean user's state is kept.
    stale_ttl: Duration,
    /// Channels subject to moderation.
    monitored: HashSet<String>,
    /// Per-user states, created lazily on first message.
    states: HashMap<String, UserState>,
}

impl RateTracker {
    pub fn new(
        threshold: usize,
        window: Duration,
        warning_reset: Duration,
        stale_ttl: Duration,
        monitored: impl IntoIterator<Item = String>,
    ) -> Self {
        Self {
            threshold: threshold.max(1),
            window,
            warning_reset,
            stale_ttl,
            monitored: monitored.into_iter().collect(),
            states: HashMap::new(),
        }
    }

    /// Build from config (convenience for coordinator wiring).
    pub fn from_config(config: &Config) -> Self {
        Self::new(
            config.message_threshold,
            config.time_window(),
            config.warning_reset(),
            config.stale_ttl(),
            config.monitored_channels.iter().cloned(),
        )
    }

    /// Record one message and decide what, if anything, it triggers.
    pub fn record(&mut self, user_id: &str, channel_id: &str, now: DateTime<Utc>) -> Decision {
        if !self.monitored.contains(channel_id) {
            return Decision::None;
        }

        let state = self
            .states
            .entry(user_id.to_string())
            .or_insert_with(|| UserState::new(now));

        // Gap since the previous message, taken before this one lands: the
        // window may already have been pruned empty by the time a quiet
        // user comes back.
        let gap = now.signed_duration_since(state.last_seen);

        state
            .timestamps
            .retain(|&t| now.signed_duration_since(t) <= self.window);
        state.timestamps.push(now);
        state.last_seen = now;

        if state.timestamps.len() < self.threshold {
            if gap > self.warning_reset {
                state.stage = 0;
            }
            return Decision::None;
        }

        // Threshold reached: the window restarts and the stage advances.
        state.timestamps.clear();
        state.stage = state.stage.saturating_add(1);
        match state.stage {
            1 => Decision::Warn(1),
            2 => Decision::Warn(2),
            _ => Decision::Mute,
        }
    }

    /// Zero a user's stage and window after a completed mute.
    pub fn reset_cycle(&mut self, user_id: &str) {
        if let Some(state) = self.states.get_mut(user_id) {
            state.stage = 0;
            state.timestamps.clear();
        }
    }

    /// Operator escape hatch: forget a user entirely.
    pub fn reset_user(&mut self, user_id: &str) {
        self.states.remove(user_id);
    }

    /// Drop clean users idle past the TTL. Returns how many were removed.
    pub fn sweep_stale(&mut self, now: DateTime<Utc>) -> usize {
        let before = self.states.len();
        let ttl = self.stale_ttl;
        self.states
            .retain(|_, state| state.stage > 0 || now.signed_duration_since(state.last_seen) <= ttl);
        before - self.states.len()
    }

    /// Current warning stage for a user (0 if untracked).
    pub fn stage(&self, user_id: &str) -> u8 {
        self.states.get(user_id).map_or(0, |s| s.stage)
    }

    /// Whether a channel is subject to moderation.
    pub fn is_monitored(&self, channel_id: &str) -> bool {
        self.monitored.contains(channel_id)
    }

    /// Number of users currently tracked.
    pub fn tracked_users(&self) -> usize {
        self.states.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const CHANNEL: &str = "c-general";
    const USER: &str = "u-1";

    fn tracker() -> RateTracker {
        RateTracker::new(
            5,
            Duration::seconds(5),
            Duration::seconds(10),
            Duration::seconds(7200),
            vec![CHANNEL.to_string()],
        )
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 8, 6, 12, 0, 0).unwrap()
    }

    /// Run one 5-message burst starting at `start`, 100ms apart, and return
    /// the decision on the final message.
    fn burst(tracker: &mut RateTracker, start: DateTime<Utc>) -> Decision {
        let mut last = Decision::None;
        for i in 0..5 {
            last = tracker.record(USER, CHANNEL, start + Duration::milliseconds(i * 100));
        }
        last
    }

    #[test]
    fn burst_at_threshold_issues_first_warning() {
        let mut tracker = tracker();
        for i in 0..4 {
            let d = tracker.record(USER, CHANNEL, t0() + Duration::milliseconds(i * 400));
            assert_eq!(d, Decision::None);
        }
        // Fifth message within the window crosses the threshold.
        let d = tracker.record(USER, CHANNEL, t0() + Duration::milliseconds(1600));
        assert_eq!(d, Decision::Warn(1));
        assert_eq!(tracker.stage(USER), 1);
        assert!(tracker.states[USER].timestamps.is_empty());
    }

    #[test]
    fn three_bursts_escalate_in_order() {
        let mut tracker = tracker();
        assert_eq!(burst(&mut tracker, t0()), Decision::Warn(1));
        assert_eq!(burst(&mut tracker, t0() + Duration::seconds(3)), Decision::Warn(2));
        assert_eq!(burst(&mut tracker, t0() + Duration::seconds(6)), Decision::Mute);
        assert_eq!(tracker.stage(USER), 3);
    }

    #[test]
    fn window_boundary_is_inclusive() {
        let mut tracker = tracker();
        tracker.record(USER, CHANNEL, t0());
        for i in 1..4 {
            tracker.record(USER, CHANNEL, t0() + Duration::seconds(i));
        }
        // Exactly window seconds after the first message: it still counts.
        let d = tracker.record(USER, CHANNEL, t0() + Duration::seconds(5));
        assert_eq!(d, Decision::Warn(1));
    }

    #[test]
    fn slow_traffic_never_escalates() {
        let mut tracker = tracker();
        for i in 0..20 {
            let d = tracker.record(USER, CHANNEL, t0() + Duration::seconds(i * 6));
            assert_eq!(d, Decision::None);
        }
        assert_eq!(tracker.stage(USER), 0);
    }

    #[test]
    fn unmonitored_channel_touches_nothing() {
        let mut tracker = tracker();
        for i in 0..10 {
            let d = tracker.record(USER, "c-other", t0() + Duration::milliseconds(i * 50));
            assert_eq!(d, Decision::None);
        }
        assert_eq!(tracker.tracked_users(), 0);
    }

    #[test]
    fn idle_gap_resets_stage() {
        let mut tracker = tracker();
        assert_eq!(burst(&mut tracker, t0()), Decision::Warn(1));

        // 10.5s of quiet, then a lone message: back to clean.
        let d = tracker.record(
            USER,
            CHANNEL,
            t0() + Duration::milliseconds(400) + Duration::milliseconds(10_500),
        );
        assert_eq!(d, Decision::None);
        assert_eq!(tracker.stage(USER), 0);
    }

    #[test]
    fn gap_below_reset_time_keeps_stage() {
        let mut tracker = tracker();
        assert_eq!(burst(&mut tracker, t0()), Decision::Warn(1));

        let d = tracker.record(USER, CHANNEL, t0() + Duration::seconds(9));
        assert_eq!(d, Decision::None);
        assert_eq!(tracker.stage(USER), 1);
    }

    #[test]
    fn reset_skipped_when_threshold_crossed_on_same_message() {
        // Threshold 1 makes every message a crossing, so a long gap and a
        // crossing can land on the same call. Escalation must win.
        let mut tracker = RateTracker::new(
            1,
            Duration::seconds(5),
            Duration::seconds(10),
            Duration::seconds(7200),
            vec![CHANNEL.to_string()],
        );
        assert_eq!(tracker.record(USER, CHANNEL, t0()), Decision::Warn(1));
        let d = tracker.record(USER, CHANNEL, t0() + Duration::seconds(60));
        assert_eq!(d, Decision::Warn(2));
    }

    #[test]
    fn fresh_cycle_after_reset_cycle() {
        let mut tracker = tracker();
        burst(&mut tracker, t0());
        burst(&mut tracker, t0() + Duration::seconds(3));
        assert_eq!(burst(&mut tracker, t0() + Duration::seconds(6)), Decision::Mute);

        // The mute landed; the controller resets the cycle.
        tracker.reset_cycle(USER);
        assert_eq!(tracker.stage(USER), 0);

        assert_eq!(burst(&mut tracker, t0() + Duration::seconds(9)), Decision::Warn(1));
    }

    #[test]
    fn failed_mute_retries_on_next_burst() {
        let mut tracker = tracker();
        burst(&mut tracker, t0());
        burst(&mut tracker, t0() + Duration::seconds(3));
        assert_eq!(burst(&mut tracker, t0() + Duration::seconds(6)), Decision::Mute);

        // No reset_cycle: the permission change failed. The next qualifying
        // burst must decide Mute again, not restart the warning ladder.
        assert_eq!(tracker.stage(USER), 3);
        assert_eq!(burst(&mut tracker, t0() + Duration::seconds(9)), Decision::Mute);
    }

    #[test]
    fn separate_users_tracked_independently() {
        let mut tracker = tracker();
        assert_eq!(burst(&mut tracker, t0()), Decision::Warn(1));
        let d = tracker.record("u-2", CHANNEL, t0() + Duration::seconds(1));
        assert_eq!(d, Decision::None);
        assert_eq!(tracker.stage("u-2"), 0);
    }

    #[test]
    fn sweep_drops_only_idle_clean_users() {
        let mut tracker = tracker();
        // u-quiet: one message, stage 0. USER: warned once.
        tracker.record("u-quiet", CHANNEL, t0());
        burst(&mut tracker, t0());
        assert_eq!(tracker.tracked_users(), 2);

        let removed = tracker.sweep_stale(t0() + Duration::seconds(7201));
        assert_eq!(removed, 1);
        assert_eq!(tracker.tracked_users(), 1);
        assert_eq!(tracker.stage(USER), 1);
    }

    #[test]
    fn sweep_keeps_recent_users() {
        let mut tracker = tracker();
        tracker.record(USER, CHANNEL, t0());
        assert_eq!(tracker.sweep_stale(t0() + Duration::seconds(60)), 0);
        assert_eq!(tracker.tracked_users(), 1);
    }

    #[test]
    fn reset_user_forgets_everything() {
        let mut tracker = tracker();
        burst(&mut tracker, t0());
        tracker.reset_user(USER);
        assert_eq!(tracker.tracked_users(), 0);
        assert_eq!(tracker.stage(USER), 0);
    }
}
