//! Transport layer: event/sink seam plus the stdio implementation.

pub mod stdio;
pub mod traits;

pub use traits::{ActionSink, MessageEvent, SinkError};
