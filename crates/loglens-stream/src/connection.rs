use std::time::{Duration, Instant};

use chrono::Utc;
use futures::StreamExt;
use reqwest::StatusCode;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use loglens_types::{ConnectionState, DisconnectReason};

use crate::decode::{DecodedEvent, EventDecoder};
use crate::dispatch::StreamItem;
use crate::error::StreamError;

/// How often the watchdog checks for silence
pub const WATCHDOG_INTERVAL: Duration = Duration::from_secs(2);

/// Silence threshold after which the connection is considered stalled.
/// The server keepalives every few seconds, so a quiet quarter minute
/// means the link is dead even if no error surfaced.
pub const STALL_TIMEOUT: Duration = Duration::from_secs(15);

/// Where and how to reach the log stream endpoint
#[derive(Clone, Debug)]
pub struct StreamConfig {
    /// Service base URL, e.g. `http://127.0.0.1:8000`
    pub base_url: String,

    /// Bearer token, if the deployment requires one
    pub token: Option<String>,

    /// How many historical records to request on connect
    pub limit: usize,
}

impl StreamConfig {
    fn stream_url(&self) -> String {
        format!("{}/logs/stream", self.base_url.trim_end_matches('/'))
    }
}

/// How one connection attempt ended without a transport error
enum AttemptEnd {
    /// Teardown was requested
    Cancelled,
    /// The server closed the stream cleanly
    Closed,
}

/// Owns the live log feed.
///
/// A single driver task runs the whole connect → decode → reconnect
/// cycle, so attempts are serialized by construction: a new attempt
/// cannot begin until the previous one's request, decoder and timers are
/// gone. Decoded records flow into the dispatcher FIFO; connection state
/// is published through a watch channel.
pub struct LogStreamManager {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
    state_rx: watch::Receiver<ConnectionState>,
}

impl LogStreamManager {
    /// Start the driver task. Records (and buffer resets) are sent to
    /// `items`; drop of the receiving side counts as teardown.
    pub fn connect(config: StreamConfig, items: mpsc::UnboundedSender<StreamItem>) -> Self {
        let (state_tx, state_rx) = watch::channel(ConnectionState::Idle);
        let cancel = CancellationToken::new();
        let task = tokio::spawn(drive(config, items, state_tx, cancel.clone()));

        Self {
            cancel,
            task,
            state_rx,
        }
    }

    /// A watch handle over the connection state
    pub fn state(&self) -> watch::Receiver<ConnectionState> {
        self.state_rx.clone()
    }

    /// Tear the stream down: cancels the in-flight request, the
    /// watchdog and any pending reconnect. Idempotent; after this no
    /// records are emitted and no reconnect fires.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

impl Drop for LogStreamManager {
    fn drop(&mut self) {
        self.cancel.cancel();
        self.task.abort();
    }
}

/// The reconnect loop. Terminal conditions return; everything else maps
/// to a [`DisconnectReason`] whose fixed delay is awaited (cancellably)
/// before the next attempt.
async fn drive(
    config: StreamConfig,
    items: mpsc::UnboundedSender<StreamItem>,
    state: watch::Sender<ConnectionState>,
    cancel: CancellationToken,
) {
    let client = reqwest::Client::new();

    loop {
        if cancel.is_cancelled() {
            let _ = state.send(ConnectionState::Closed);
            return;
        }

        let _ = state.send(ConnectionState::Connecting);

        let reason = match run_attempt(&client, &config, &items, &state, &cancel).await {
            Ok(AttemptEnd::Cancelled) => {
                let _ = state.send(ConnectionState::Closed);
                return;
            }
            Ok(AttemptEnd::Closed) => {
                tracing::info!("log stream closed by server");
                DisconnectReason::StreamClosed
            }
            Err(StreamError::SessionInvalid) => {
                tracing::warn!("session rejected, handing off to auth");
                let _ = state.send(ConnectionState::SessionInvalid);
                return;
            }
            Err(StreamError::AccessDenied) => {
                tracing::warn!("log access denied, not retrying");
                let _ = state.send(ConnectionState::AccessDenied);
                return;
            }
            Err(err @ (StreamError::Connect(_) | StreamError::Http(_))) => {
                tracing::warn!(%err, "log stream connect failed");
                DisconnectReason::NetworkError
            }
            Err(err @ StreamError::Read(_)) => {
                tracing::warn!(%err, "log stream failed mid-read");
                DisconnectReason::StreamFailed
            }
            Err(err @ StreamError::Stalled(_)) => {
                tracing::warn!(%err, "log stream stalled, reconnecting");
                DisconnectReason::Stalled
            }
        };

        let delay = reason.retry_delay();
        if !delay.is_zero() {
            let retry_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or_default();
            let _ = state.send(ConnectionState::Disconnected { reason, retry_at });

            tokio::select! {
                _ = cancel.cancelled() => {
                    let _ = state.send(ConnectionState::Closed);
                    return;
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }

        let _ = state.send(ConnectionState::Reconnecting);
    }
}

async fn run_attempt(
    client: &reqwest::Client,
    config: &StreamConfig,
    items: &mpsc::UnboundedSender<StreamItem>,
    state: &watch::Sender<ConnectionState>,
    cancel: &CancellationToken,
) -> Result<AttemptEnd, StreamError> {
    let mut request = client
        .get(config.stream_url())
        .query(&[("limit", config.limit)]);
    if let Some(token) = &config.token {
        request = request.bearer_auth(token);
    }

    let response = tokio::select! {
        _ = cancel.cancelled() => return Ok(AttemptEnd::Cancelled),
        result = request.send() => result?,
    };

    match response.status() {
        StatusCode::UNAUTHORIZED => return Err(StreamError::SessionInvalid),
        StatusCode::FORBIDDEN => return Err(StreamError::AccessDenied),
        status if !status.is_success() => return Err(StreamError::Http(status.as_u16())),
        _ => {}
    }

    // The server replays history on every connect; the reset rides the
    // record FIFO so entries from two attempts can never interleave.
    if items.send(StreamItem::Reset).is_err() {
        return Ok(AttemptEnd::Cancelled);
    }
    let _ = state.send(ConnectionState::Connected);

    let mut body = response.bytes_stream();
    let mut decoder = EventDecoder::new();
    let mut last_activity = Instant::now();

    let mut watchdog = tokio::time::interval(WATCHDOG_INTERVAL);
    watchdog.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(AttemptEnd::Cancelled),

            _ = watchdog.tick() => {
                let idle = last_activity.elapsed();
                if idle >= STALL_TIMEOUT {
                    return Err(StreamError::Stalled(idle));
                }
            }

            chunk = body.next() => match chunk {
                None => return Ok(AttemptEnd::Closed),
                Some(Err(err)) => return Err(StreamError::Read(err)),
                Some(Ok(bytes)) => {
                    // Keepalive comments land here too; any byte counts
                    last_activity = Instant::now();
                    for event in decoder.push(&bytes) {
                        match event {
                            DecodedEvent::AccessDenied => return Err(StreamError::AccessDenied),
                            DecodedEvent::Record(record) => {
                                if items.send(StreamItem::Record(record)).is_err() {
                                    return Ok(AttemptEnd::Cancelled);
                                }
                            }
                        }
                    }
                }
            }
        }
    }
}
