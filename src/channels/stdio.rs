//! Newline-delimited JSON transport over stdio.
//!
//! The shipped binary exercises the core with the simplest injectable
//! transport: one [`MessageEvent`] JSON object per stdin line in, one
//! action JSON object per stdout line out. A platform adapter process (or
//! test harness) sits on the other side of the pipe. Swapping in a real
//! chat-platform connection means implementing [`ActionSink`] and feeding
//! the coordinator directly; nothing in the core changes.

use async_trait::async_trait;
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::channels::traits::{ActionSink, MessageEvent, SinkError};
use crate::moderation::CoordinatorHandle;

/// One outbound action, serialized per line on stdout.
#[derive(Debug, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ActionLine<'a> {
    SendMessage {
        channel_id: &'a str,
        text: &'a str,
    },
    SetSendPermission {
        channel_id: &'a str,
        user_id: &'a str,
        allowed: Option<bool>,
    },
}

/// Sink that prints each action as one JSON line on stdout.
#[derive(Debug, Default, Clone)]
pub struct StdioSink;

#[async_trait]
impl ActionSink for StdioSink {
    async fn send_channel_message(&self, channel_id: &str, text: &str) -> Result<(), SinkError> {
        emit(&ActionLine::SendMessage { channel_id, text });
        Ok(())
    }

    async fn set_send_permission(
        &self,
        channel_id: &str,
        user_id: &str,
        allowed: Option<bool>,
    ) -> Result<(), SinkError> {
        emit(&ActionLine::SetSendPermission {
            channel_id,
            user_id,
            allowed,
        });
        Ok(())
    }
}

fn emit(line: &ActionLine<'_>) {
    match serde_json::to_string(line) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!("Failed to encode action line: {e}"),
    }
}

/// Pump newline-delimited `MessageEvent` JSON from `reader` into the
/// coordinator until EOF. Malformed lines are logged and skipped; a closed
/// coordinator ends the pump with an error.
pub async fn pump_events<R>(reader: R, handle: &CoordinatorHandle) -> anyhow::Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<MessageEvent>(&line) {
            Ok(event) => handle.submit(event).await?,
            Err(e) => tracing::warn!("Dropping malformed event line: {e}"),
        }
    }
    Ok(())
}

/// Pump from the process's stdin.
pub async fn pump_stdin(handle: &CoordinatorHandle) -> anyhow::Result<()> {
    pump_events(BufReader::new(tokio::io::stdin()), handle).await
}
