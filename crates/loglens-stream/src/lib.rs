//! Live log stream transport for loglens
//!
//! Owns the lifecycle of the service's `/logs/stream` feed: connecting,
//! decoding the pseudo-SSE wire format, detecting silent stalls,
//! reconnecting with fixed delays, and batching decoded records into the
//! display pipeline.

mod connection;
mod decode;
mod dispatch;
mod error;

pub use connection::{LogStreamManager, STALL_TIMEOUT, StreamConfig, WATCHDOG_INTERVAL};
pub use decode::{DecodedEvent, EventDecoder};
pub use dispatch::{BatchDispatcher, MAX_BATCH, StreamItem};
pub use error::StreamError;
