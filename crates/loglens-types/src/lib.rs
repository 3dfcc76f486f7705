//! Shared types for loglens
//!
//! This crate contains data structures used across multiple loglens crates.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use ratatui::style::Color;
use serde::Deserialize;
use serde_json::Value;

// ============================================================================
// Log Records
// ============================================================================

/// Log severity level
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum LogLevel {
    Trace,
    Debug,
    #[default]
    Info,
    Warn,
    Error,
    Fatal,
    Unknown,
}

impl LogLevel {
    /// Parse log level from common formats, including the service's
    /// three-letter short names
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "trace" | "trc" => Self::Trace,
            "debug" | "dbg" => Self::Debug,
            "info" | "inf" | "information" => Self::Info,
            "warn" | "warning" | "wrn" => Self::Warn,
            "error" | "err" => Self::Error,
            "fatal" | "panic" | "critical" | "crit" | "ftl" => Self::Fatal,
            _ => Self::Unknown,
        }
    }

    /// Default display color for this level
    pub fn color(&self) -> Color {
        match self {
            Self::Trace => Color::DarkGray,
            Self::Debug => Color::Cyan,
            Self::Info => Color::Green,
            Self::Warn => Color::Yellow,
            Self::Error => Color::Red,
            Self::Fatal => Color::Magenta,
            Self::Unknown => Color::White,
        }
    }

    /// Short display string (3 chars), matching the service's short names
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRC",
            Self::Debug => "DBG",
            Self::Info => "INF",
            Self::Warn => "WRN",
            Self::Error => "ERR",
            Self::Fatal => "FTL",
            Self::Unknown => "???",
        }
    }

    /// Ordinal for minimum-severity comparisons. Unknown ranks as Info so
    /// unparseable lines are not hidden by a conservative threshold.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Trace => 0,
            Self::Debug => 1,
            Self::Info => 2,
            Self::Warn => 3,
            Self::Error => 4,
            Self::Fatal => 5,
            Self::Unknown => 2,
        }
    }
}

/// A single structured log record received from the stream.
///
/// The service emits a flat JSON mapping per record; the known fields are
/// `asctime`, `msecs`, `message`, `module`, `funcName`, `process`,
/// `session_id` and `levelname`, but unknown fields are kept as well.
/// Records are immutable once decoded.
#[derive(Clone, Debug)]
pub struct LogRecord {
    /// All fields of the decoded payload
    pub fields: HashMap<String, Value>,

    /// Severity parsed from the `levelname` field (cached)
    pub level: LogLevel,

    /// When this record was received by the client
    pub received_at: DateTime<Utc>,
}

impl LogRecord {
    /// Build a record from a decoded JSON object. Returns `None` if the
    /// payload is not an object.
    pub fn from_value(value: Value) -> Option<Self> {
        let obj = value.as_object()?;
        let fields: HashMap<String, Value> = obj.clone().into_iter().collect();

        let level = fields
            .get("levelname")
            .and_then(Value::as_str)
            .map(LogLevel::parse)
            .unwrap_or(LogLevel::Unknown);

        Some(Self {
            fields,
            level,
            received_at: Utc::now(),
        })
    }

    /// Render one field as display text. Strings render verbatim, numbers
    /// and booleans through their usual formatting, missing fields as "".
    pub fn field_text(&self, name: &str) -> String {
        match self.fields.get(name) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Number(n)) => n.to_string(),
            Some(Value::Bool(b)) => b.to_string(),
            Some(Value::Null) | None => String::new(),
            Some(other) => other.to_string(),
        }
    }

    /// The message field, or "" when absent
    pub fn message(&self) -> &str {
        self.fields
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("")
    }
}

// ============================================================================
// Connection State
// ============================================================================

/// Why the stream was lost; selects the fixed reconnect delay
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectReason {
    /// Server closed the stream cleanly
    StreamClosed,
    /// Request could not be sent, or a non-2xx/non-auth status came back
    NetworkError,
    /// The body stream failed mid-read
    StreamFailed,
    /// Watchdog saw no bytes for too long
    Stalled,
}

impl DisconnectReason {
    /// Fixed delay before the next connection attempt. A stalled stream
    /// reconnects immediately.
    pub fn retry_delay(&self) -> Duration {
        match self {
            Self::StreamClosed => Duration::from_secs(1),
            Self::NetworkError => Duration::from_secs(5),
            Self::StreamFailed => Duration::from_secs(3),
            Self::Stalled => Duration::ZERO,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::StreamClosed => "stream closed",
            Self::NetworkError => "network error",
            Self::StreamFailed => "stream error",
            Self::Stalled => "stalled",
        }
    }
}

/// Lifecycle of the live log feed connection.
///
/// `Closed`, `SessionInvalid` and `AccessDenied` are terminal: no further
/// records are emitted and no reconnect is scheduled.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    Idle,
    Connecting,
    Connected,
    Disconnected {
        reason: DisconnectReason,
        retry_at: DateTime<Utc>,
    },
    Reconnecting,
    /// Session expired or invalid; the auth collaborator takes over
    SessionInvalid,
    /// Access rights revoked server-side; retrying is pointless
    AccessDenied,
    /// Explicit teardown
    Closed,
}

impl ConnectionState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::SessionInvalid | Self::AccessDenied | Self::Closed
        )
    }
}

// ============================================================================
// Settings
// ============================================================================

/// The service's default display template (from its own console format)
pub const DEFAULT_TEMPLATE: &str =
    "[ %(asctime)s.%(msecs)s %(module)-20s ][%(process)s][%(levelname)s] %(message)s";

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_stream_limit() -> usize {
    1000
}

fn default_buffer_size() -> usize {
    1000
}

fn default_min_level() -> String {
    "trace".to_string()
}

fn default_template() -> String {
    DEFAULT_TEMPLATE.to_string()
}

/// Settings consumed from the optional toml config file. CLI flags
/// override individual values; every field has a default so the file may
/// be partial or absent.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Base URL of the service exposing /logs/stream
    pub base_url: String,

    /// Bearer token for the stream request (optional)
    pub token: Option<String>,

    /// How many historical records to request from the server
    pub stream_limit: usize,

    /// Display buffer bound
    pub buffer_size: usize,

    /// Minimum severity to display (trace/debug/info/warn/error/fatal)
    pub min_level: String,

    /// Display template, %(field)s style
    pub template: String,

    /// Per-level color overrides, e.g. `error = "red"`
    pub colors: HashMap<String, String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            token: None,
            stream_limit: default_stream_limit(),
            buffer_size: default_buffer_size(),
            min_level: default_min_level(),
            template: default_template(),
            colors: HashMap::new(),
        }
    }
}

impl Settings {
    /// Minimum severity as a level, defaulting to Trace on unknown input
    pub fn min_level(&self) -> LogLevel {
        match LogLevel::parse(&self.min_level) {
            LogLevel::Unknown => LogLevel::Trace,
            level => level,
        }
    }

    /// Display color for a level, honoring the `colors` overrides
    pub fn color_for(&self, level: LogLevel) -> Color {
        let key = match level {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
            LogLevel::Fatal => "fatal",
            LogLevel::Unknown => return level.color(),
        };
        self.colors
            .get(key)
            .and_then(|name| parse_color(name))
            .unwrap_or_else(|| level.color())
    }
}

fn parse_color(name: &str) -> Option<Color> {
    match name.to_lowercase().as_str() {
        "black" => Some(Color::Black),
        "red" => Some(Color::Red),
        "green" => Some(Color::Green),
        "yellow" => Some(Color::Yellow),
        "blue" => Some(Color::Blue),
        "magenta" => Some(Color::Magenta),
        "cyan" => Some(Color::Cyan),
        "gray" | "grey" => Some(Color::Gray),
        "darkgray" | "darkgrey" => Some(Color::DarkGray),
        "white" => Some(Color::White),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_level_parse_short_names() {
        assert_eq!(LogLevel::parse("INF"), LogLevel::Info);
        assert_eq!(LogLevel::parse("err"), LogLevel::Error);
        assert_eq!(LogLevel::parse("WRN"), LogLevel::Warn);
        assert_eq!(LogLevel::parse("FTL"), LogLevel::Fatal);
        assert_eq!(LogLevel::parse("nonsense"), LogLevel::Unknown);
    }

    #[test]
    fn test_record_from_value() {
        let record = LogRecord::from_value(json!({
            "asctime": "01.02.2026 10:30:00",
            "msecs": "042",
            "message": "started",
            "levelname": "INF",
            "process": "1234",
        }))
        .unwrap();

        assert_eq!(record.level, LogLevel::Info);
        assert_eq!(record.message(), "started");
        assert_eq!(record.field_text("process"), "1234");
        assert_eq!(record.field_text("missing"), "");
    }

    #[test]
    fn test_record_rejects_non_object() {
        assert!(LogRecord::from_value(json!("just a string")).is_none());
        assert!(LogRecord::from_value(json!([1, 2, 3])).is_none());
    }

    #[test]
    fn test_settings_defaults_and_overrides() {
        let settings = Settings::default();
        assert_eq!(settings.min_level(), LogLevel::Trace);
        assert_eq!(settings.color_for(LogLevel::Error), Color::Red);

        let mut settings = Settings::default();
        settings.colors.insert("error".into(), "magenta".into());
        assert_eq!(settings.color_for(LogLevel::Error), Color::Magenta);
    }

    #[test]
    fn test_disconnect_delays_within_band() {
        for reason in [
            DisconnectReason::StreamClosed,
            DisconnectReason::NetworkError,
            DisconnectReason::StreamFailed,
        ] {
            let delay = reason.retry_delay();
            assert!(delay >= Duration::from_secs(1) && delay <= Duration::from_secs(5));
        }
        assert_eq!(DisconnectReason::Stalled.retry_delay(), Duration::ZERO);
    }
}
