use loglens_types::LogRecord;
use serde_json::Value;

/// One decoded wire event
#[derive(Debug)]
pub enum DecodedEvent {
    /// A structured log record
    Record(LogRecord),
    /// The server reported a permission revocation in-band; the stream
    /// must stop and not reconnect
    AccessDenied,
}

/// Incremental decoder for the service's pseudo-SSE framing.
///
/// Events are separated by a blank line; each carries one or more
/// `data:` payload lines (concatenated) holding a flat JSON record.
/// Lines starting with `:` are keepalive comments. An incomplete
/// trailing fragment is retained for the next chunk, so multi-byte
/// characters split across chunk boundaries never corrupt.
#[derive(Default)]
pub struct EventDecoder {
    buf: Vec<u8>,
}

impl EventDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes, returning every event completed by it
    pub fn push(&mut self, chunk: &[u8]) -> Vec<DecodedEvent> {
        self.buf.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = find_frame_end(&self.buf) {
            let frame: Vec<u8> = self.buf.drain(..pos + 2).collect();
            let text = String::from_utf8_lossy(&frame);
            if let Some(event) = decode_frame(&text) {
                events.push(event);
            }
        }
        events
    }

    /// Bytes held back waiting for a frame boundary
    pub fn pending(&self) -> usize {
        self.buf.len()
    }
}

fn find_frame_end(buf: &[u8]) -> Option<usize> {
    buf.windows(2).position(|w| w == b"\n\n")
}

fn decode_frame(frame: &str) -> Option<DecodedEvent> {
    let mut payload = String::new();

    for line in frame.lines() {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.starts_with(':') {
            // keepalive comment; already counted as activity upstream
            continue;
        }
        if let Some(data) = line.strip_prefix("data:") {
            if !payload.is_empty() {
                payload.push('\n');
            }
            payload.push_str(data.strip_prefix(' ').unwrap_or(data));
        }
    }

    if payload.is_empty() {
        return None;
    }

    let value: Value = match serde_json::from_str(&payload) {
        Ok(value) => value,
        Err(err) => {
            tracing::warn!(%err, "skipping malformed stream event");
            return None;
        }
    };

    if is_access_denied(&value) {
        return Some(DecodedEvent::AccessDenied);
    }

    match LogRecord::from_value(value) {
        Some(record) => Some(DecodedEvent::Record(record)),
        None => {
            tracing::warn!("skipping non-object stream payload");
            None
        }
    }
}

/// The service stops a revoked stream by sending a final record whose
/// message names the revocation; there is no out-of-band signal.
fn is_access_denied(value: &Value) -> bool {
    let message = value
        .get("message")
        .or_else(|| value.get("error").and_then(|e| e.get("message")))
        .and_then(Value::as_str)
        .unwrap_or("");

    message.contains("access rights revoked") || message.contains("permission denied")
}
