use std::time::{Duration, Instant};

use loglens_logs::{ArcRecord, DisplayBuffer};
use loglens_query::{FilterQuery, evaluate, parse};
use loglens_types::{ConnectionState, LogLevel, Settings};

/// All possible actions in the application (command pattern)
#[derive(Clone, Debug)]
pub enum Action {
    Quit,
    ToggleHelp,

    // Filter input
    OpenFilter,
    CloseFilter,
    FilterInput(char),
    FilterBackspace,
    ApplyFilter,
    ClearFilter,

    // Log navigation
    ScrollUp(usize),
    ScrollDown(usize),
    PageUp,
    PageDown,
    ScrollToTop,
    ScrollToBottom,
    ToggleFollow,

    Tick,
}

/// Cache of the visible (filtered) slice of the display buffer.
///
/// Filtering every buffered entry on each redraw is wasted work while
/// nothing changed; the cache is keyed on the applied query, the
/// severity threshold, and the buffer's length plus newest id (length
/// alone misses the evict-one-push-one case).
#[derive(Default)]
pub struct FilterCache {
    cached_query: String,
    cached_min_level: Option<LogLevel>,
    cached_len: usize,
    cached_last_id: Option<u64>,
    valid: bool,

    /// The visible entries, in arrival order
    pub entries: Vec<ArcRecord>,
}

impl FilterCache {
    /// Recompute the visible slice if anything it depends on changed
    pub fn refresh(
        &mut self,
        buffer: &DisplayBuffer,
        query_raw: &str,
        query: &FilterQuery,
        min_level: LogLevel,
    ) {
        let len = buffer.len();
        let last_id = buffer.tail(1).first().map(|e| e.id);

        let fresh = self.valid
            && self.cached_query == query_raw
            && self.cached_min_level == Some(min_level)
            && self.cached_len == len
            && self.cached_last_id == last_id;
        if fresh {
            return;
        }

        self.entries = buffer
            .filtered(|e| e.record.level.rank() >= min_level.rank() && evaluate(&e.text, query));

        self.cached_query = query_raw.to_string();
        self.cached_min_level = Some(min_level);
        self.cached_len = len;
        self.cached_last_id = last_id;
        self.valid = true;
    }

    pub fn invalidate(&mut self) {
        self.valid = false;
    }
}

/// Show "connecting" only after this long in the state, so a fast
/// reconnect does not flicker the indicator
const CONNECTING_GRACE: Duration = Duration::from_millis(300);

/// How long the "connected" confirmation stays before auto-dismissing
const CONNECTED_NOTICE: Duration = Duration::from_secs(2);

/// Global application state
pub struct AppState {
    pub settings: Settings,

    /// Filter text being edited (input mode)
    pub filter_input: String,

    /// Is the filter input line focused?
    pub input_active: bool,

    /// The applied raw filter string
    pub filter_raw: String,

    /// The applied parsed query
    pub query: FilterQuery,

    /// Scroll position into the visible entries
    pub log_scroll: usize,

    /// Follow mode: keep the newest entries in view
    pub auto_scroll: bool,

    pub help_visible: bool,

    pub should_quit: bool,

    /// Latest observed connection state
    pub connection: ConnectionState,

    /// When `connection` last changed, for grace/auto-dismiss timing
    pub connection_since: Instant,

    pub filter_cache: FilterCache,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            filter_input: String::new(),
            input_active: false,
            filter_raw: String::new(),
            query: FilterQuery::default(),
            log_scroll: 0,
            auto_scroll: true,
            help_visible: false,
            should_quit: false,
            connection: ConnectionState::Idle,
            connection_since: Instant::now(),
            filter_cache: FilterCache::default(),
        }
    }

    /// Record a connection state change
    pub fn set_connection(&mut self, state: ConnectionState) {
        if self.connection != state {
            self.connection = state;
            self.connection_since = Instant::now();
        }
    }

    /// Status indicator text, or `None` when nothing should show.
    /// Connecting waits out a short grace period, Connected
    /// auto-dismisses, Disconnected counts down to the retry.
    pub fn status_text(&self) -> Option<String> {
        match &self.connection {
            ConnectionState::Idle => None,
            ConnectionState::Connecting | ConnectionState::Reconnecting => {
                if self.connection_since.elapsed() >= CONNECTING_GRACE {
                    Some("connecting…".to_string())
                } else {
                    None
                }
            }
            ConnectionState::Connected => {
                if self.connection_since.elapsed() < CONNECTED_NOTICE {
                    Some("connected".to_string())
                } else {
                    None
                }
            }
            ConnectionState::Disconnected { reason, retry_at } => {
                let remaining = (*retry_at - chrono::Utc::now()).num_seconds().max(0);
                Some(format!(
                    "disconnected ({}) — retry in {}s",
                    reason.label(),
                    remaining
                ))
            }
            ConnectionState::SessionInvalid => Some("session expired — sign in again".to_string()),
            ConnectionState::AccessDenied => Some("log access revoked".to_string()),
            ConnectionState::Closed => Some("stream closed".to_string()),
        }
    }

    pub fn open_filter(&mut self) {
        self.input_active = true;
        self.filter_input = self.filter_raw.clone();
    }

    pub fn close_filter(&mut self) {
        self.input_active = false;
        self.filter_input.clear();
    }

    /// Parse and apply the edited filter. Applies retroactively: the
    /// cache is invalidated so every buffered entry is re-evaluated.
    pub fn apply_filter(&mut self) {
        self.input_active = false;
        self.filter_raw = self.filter_input.clone();
        self.query = parse(&self.filter_raw);
        self.filter_cache.invalidate();
    }

    pub fn clear_filter(&mut self) {
        self.filter_input.clear();
        self.filter_raw.clear();
        self.query = FilterQuery::default();
        self.filter_cache.invalidate();
    }

    pub fn scroll_up(&mut self, lines: usize) {
        self.auto_scroll = false;
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_add(lines);
    }

    pub fn scroll_to_top(&mut self) {
        self.auto_scroll = false;
        self.log_scroll = 0;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.auto_scroll = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loglens_logs::{LogView, Template};
    use loglens_types::LogRecord;
    use serde_json::json;

    fn view_with(messages: &[(&str, &str)]) -> LogView {
        let view = LogView::new(Template::parse("%(message)s"), 100);
        for (level, message) in messages {
            view.apply(
                LogRecord::from_value(json!({"levelname": level, "message": message})).unwrap(),
            );
        }
        view
    }

    #[test]
    fn test_filter_applies_retroactively() {
        let view = view_with(&[("INF", "alpha"), ("INF", "beta"), ("INF", "alpha two")]);
        let buffer = view.buffer();
        let mut state = AppState::new(Settings::default());

        state.filter_cache.refresh(
            &buffer,
            &state.filter_raw,
            &state.query,
            state.settings.min_level(),
        );
        assert_eq!(state.filter_cache.entries.len(), 3);

        state.filter_input = "alpha".to_string();
        state.apply_filter();
        state.filter_cache.refresh(
            &buffer,
            &state.filter_raw,
            &state.query,
            state.settings.min_level(),
        );
        assert_eq!(state.filter_cache.entries.len(), 2);
    }

    #[test]
    fn test_min_level_gates_visibility() {
        let view = view_with(&[("DBG", "noise"), ("ERR", "boom")]);
        let buffer = view.buffer();
        let mut state = AppState::new(Settings {
            min_level: "warn".to_string(),
            ..Settings::default()
        });

        state.filter_cache.refresh(
            &buffer,
            &state.filter_raw,
            &state.query,
            state.settings.min_level(),
        );
        assert_eq!(state.filter_cache.entries.len(), 1);
        assert_eq!(state.filter_cache.entries[0].text, "boom");
    }

    #[test]
    fn test_cache_detects_evict_push_with_same_len() {
        let view = LogView::new(Template::parse("%(message)s"), 2);
        let buffer = view.buffer();
        for m in ["a", "b"] {
            view.apply(LogRecord::from_value(json!({"message": m, "levelname": "INF"})).unwrap());
        }

        let mut state = AppState::new(Settings::default());
        state.filter_cache.refresh(
            &buffer,
            &state.filter_raw,
            &state.query,
            state.settings.min_level(),
        );
        assert_eq!(state.filter_cache.entries.len(), 2);

        // One evicted, one pushed: length is unchanged but content moved
        view.apply(LogRecord::from_value(json!({"message": "c", "levelname": "INF"})).unwrap());
        state.filter_cache.refresh(
            &buffer,
            &state.filter_raw,
            &state.query,
            state.settings.min_level(),
        );
        let texts: Vec<&str> = state
            .filter_cache
            .entries
            .iter()
            .map(|e| e.text.as_str())
            .collect();
        assert_eq!(texts, vec!["b", "c"]);
    }

    #[test]
    fn test_connected_notice_dismisses() {
        let mut state = AppState::new(Settings::default());
        state.set_connection(ConnectionState::Connected);
        assert_eq!(state.status_text().as_deref(), Some("connected"));

        state.connection_since = Instant::now() - Duration::from_secs(3);
        assert_eq!(state.status_text(), None);
    }

    #[test]
    fn test_connecting_grace_hides_fast_reconnects() {
        let mut state = AppState::new(Settings::default());
        state.set_connection(ConnectionState::Connecting);
        assert_eq!(state.status_text(), None);

        state.connection_since = Instant::now() - Duration::from_secs(1);
        assert_eq!(state.status_text().as_deref(), Some("connecting…"));
    }

    #[test]
    fn test_disconnected_counts_down() {
        let mut state = AppState::new(Settings::default());
        state.set_connection(ConnectionState::Disconnected {
            reason: loglens_types::DisconnectReason::StreamClosed,
            retry_at: chrono::Utc::now() + chrono::Duration::seconds(4),
        });
        let text = state.status_text().unwrap();
        assert!(text.starts_with("disconnected (stream closed)"));
        assert!(text.contains("retry in"));
    }
}
