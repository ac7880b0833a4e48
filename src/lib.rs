//! Rate-based chat moderation core.
//!
//! floodwarden watches messages in a configured set of channels, counts each
//! user's traffic over a sliding window, and answers persistent flooding
//! with an escalating warn → warn → mute ladder. Mutes reverse automatically
//! after a fixed delay.
//!
//! The chat platform itself is injected: incoming traffic arrives as
//! [`channels::traits::MessageEvent`]s and outgoing actions go through an
//! implementation of [`channels::traits::ActionSink`]. The shipped binary
//! wires both ends to newline-delimited JSON over stdio.
//!
//! All state is in-memory only; nothing survives a restart, including
//! pending unmute timers.

pub mod channels;
pub mod config;
pub mod moderation;
