use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use loglens_types::{LogLevel, LogRecord};

/// Eviction headroom reserved beyond the configured bound
const SLACK: usize = 50;

/// A record together with its rendered display text
#[derive(Clone, Debug)]
pub struct RenderedRecord {
    /// Sequential id, unique per buffer lifetime
    pub id: u64,

    /// The decoded record
    pub record: LogRecord,

    /// Template-rendered, sanitized display text
    pub text: String,
}

pub type ArcRecord = Arc<RenderedRecord>;

/// Thread-safe bounded buffer of rendered log entries.
///
/// Oldest entries are evicted first once the configured bound is
/// reached; entries keep strict arrival order.
#[derive(Clone)]
pub struct DisplayBuffer {
    entries: Arc<RwLock<VecDeque<ArcRecord>>>,

    capacity: usize,

    next_id: Arc<AtomicU64>,
}

impl DisplayBuffer {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Arc::new(RwLock::new(VecDeque::with_capacity(capacity + SLACK))),
            capacity,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Append an entry, evicting oldest entries past the bound
    pub fn push(&self, record: LogRecord, text: String) {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let mut entries = self.entries.write();
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(Arc::new(RenderedRecord { id, record, text }));
    }

    /// All entries in arrival order (cheap Arc clones)
    pub fn all(&self) -> Vec<ArcRecord> {
        self.entries.read().iter().cloned().collect()
    }

    /// Entries passing a predicate, in arrival order
    pub fn filtered<F>(&self, predicate: F) -> Vec<ArcRecord>
    where
        F: Fn(&RenderedRecord) -> bool,
    {
        self.entries
            .read()
            .iter()
            .filter(|e| predicate(e))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Drop all entries. Ids keep counting so stale cached entries can
    /// never be mistaken for fresh ones.
    pub fn clear(&self) {
        self.entries.write().clear();
    }

    /// The last N entries
    pub fn tail(&self, n: usize) -> Vec<ArcRecord> {
        let entries = self.entries.read();
        let start = entries.len().saturating_sub(n);
        entries.iter().skip(start).cloned().collect()
    }

    /// Entry count per severity
    pub fn level_counts(&self) -> LevelCounts {
        let entries = self.entries.read();
        let mut counts = LevelCounts::default();

        for entry in entries.iter() {
            match entry.record.level {
                LogLevel::Trace => counts.trace += 1,
                LogLevel::Debug => counts.debug += 1,
                LogLevel::Info => counts.info += 1,
                LogLevel::Warn => counts.warn += 1,
                LogLevel::Error => counts.error += 1,
                LogLevel::Fatal => counts.fatal += 1,
                LogLevel::Unknown => counts.unknown += 1,
            }
        }

        counts
    }
}

/// Counts per log level
#[derive(Clone, Debug, Default)]
pub struct LevelCounts {
    pub trace: usize,
    pub debug: usize,
    pub info: usize,
    pub warn: usize,
    pub error: usize,
    pub fatal: usize,
    pub unknown: usize,
}

impl LevelCounts {
    pub fn total(&self) -> usize {
        self.trace + self.debug + self.info + self.warn + self.error + self.fatal + self.unknown
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(message: &str) -> LogRecord {
        LogRecord::from_value(json!({"message": message, "levelname": "INF"})).unwrap()
    }

    #[test]
    fn test_push_and_order() {
        let buffer = DisplayBuffer::new(10);
        for i in 0..3 {
            buffer.push(record(&format!("m{}", i)), format!("m{}", i));
        }

        let all = buffer.all();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].text, "m0");
        assert_eq!(all[2].text, "m2");
        assert!(all[0].id < all[1].id && all[1].id < all[2].id);
    }

    #[test]
    fn test_fifo_eviction_at_bound() {
        let bound = 100;
        let buffer = DisplayBuffer::new(bound);
        for i in 0..bound + 50 {
            buffer.push(record(&format!("m{}", i)), format!("m{}", i));
        }

        assert!(buffer.len() <= bound + SLACK);
        let all = buffer.all();
        // The earliest 50 are gone, the rest survive in order
        assert_eq!(all.first().unwrap().text, "m50");
        assert_eq!(all.last().unwrap().text, format!("m{}", bound + 49));
    }

    #[test]
    fn test_clear_keeps_id_sequence() {
        let buffer = DisplayBuffer::new(10);
        buffer.push(record("a"), "a".into());
        buffer.push(record("b"), "b".into());
        buffer.clear();
        assert!(buffer.is_empty());

        buffer.push(record("c"), "c".into());
        assert_eq!(buffer.all()[0].id, 2);
    }

    #[test]
    fn test_level_counts() {
        let buffer = DisplayBuffer::new(10);
        buffer.push(
            LogRecord::from_value(json!({"levelname": "ERR"})).unwrap(),
            String::new(),
        );
        buffer.push(
            LogRecord::from_value(json!({"levelname": "INF"})).unwrap(),
            String::new(),
        );

        let counts = buffer.level_counts();
        assert_eq!(counts.error, 1);
        assert_eq!(counts.info, 1);
        assert_eq!(counts.total(), 2);
    }
}
