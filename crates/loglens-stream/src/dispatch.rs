use std::time::Duration;

use tokio::sync::mpsc;

use loglens_logs::LogView;
use loglens_types::LogRecord;

/// Maximum records rendered per flush tick
pub const MAX_BATCH: usize = 1000;

/// Pause between flush ticks while the queue stays non-empty
const FLUSH_DELAY: Duration = Duration::from_millis(10);

/// One unit of work flowing from the connection to the renderer.
///
/// `Reset` rides the same FIFO as the records: a new connection's
/// history replay must never interleave with entries still queued from
/// the previous connection.
#[derive(Debug)]
pub enum StreamItem {
    Record(LogRecord),
    Reset,
}

/// Decouples arrival rate from render rate.
///
/// Incoming items queue without bound; a background task drains them
/// into the renderer in arrival order, at most [`MAX_BATCH`] per tick
/// with a short pause between ticks. Bursts cost bounded render time per
/// tick instead of dropped records.
pub struct BatchDispatcher {
    tx: mpsc::UnboundedSender<StreamItem>,
    task: tokio::task::JoinHandle<()>,
}

impl BatchDispatcher {
    /// Spawn the flush loop feeding `view`
    pub fn new(view: LogView) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let task = tokio::spawn(flush_loop(rx, view));
        Self { tx, task }
    }

    /// A sender handle for the connection side
    pub fn sender(&self) -> mpsc::UnboundedSender<StreamItem> {
        self.tx.clone()
    }

    pub fn enqueue(&self, item: StreamItem) {
        let _ = self.tx.send(item);
    }
}

impl Drop for BatchDispatcher {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn flush_loop(mut rx: mpsc::UnboundedReceiver<StreamItem>, view: LogView) {
    // Idle until something arrives, then drain up to a batch
    while let Some(first) = rx.recv().await {
        let mut batch = Vec::with_capacity(64);
        batch.push(first);
        while batch.len() < MAX_BATCH {
            match rx.try_recv() {
                Ok(item) => batch.push(item),
                Err(_) => break,
            }
        }

        for item in batch {
            match item {
                StreamItem::Record(record) => view.apply(record),
                StreamItem::Reset => view.reset(),
            }
        }

        if !rx.is_empty() {
            tokio::time::sleep(FLUSH_DELAY).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loglens_logs::Template;
    use serde_json::json;

    fn record(message: &str) -> LogRecord {
        LogRecord::from_value(json!({"message": message, "levelname": "INF"})).unwrap()
    }

    async fn wait_for_len(buffer: &loglens_logs::DisplayBuffer, len: usize) {
        tokio::time::timeout(Duration::from_secs(2), async {
            while buffer.len() != len {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("buffer never reached expected length");
    }

    #[tokio::test]
    async fn test_flush_preserves_arrival_order() {
        let view = LogView::new(Template::parse("%(message)s"), 100);
        let buffer = view.buffer();
        let dispatcher = BatchDispatcher::new(view);

        for i in 0..20 {
            dispatcher.enqueue(StreamItem::Record(record(&format!("m{}", i))));
        }

        wait_for_len(&buffer, 20).await;
        let texts: Vec<String> = buffer.all().iter().map(|e| e.text.clone()).collect();
        let expected: Vec<String> = (0..20).map(|i| format!("m{}", i)).collect();
        assert_eq!(texts, expected);
    }

    #[tokio::test]
    async fn test_reset_drops_earlier_queued_records() {
        let view = LogView::new(Template::parse("%(message)s"), 100);
        let buffer = view.buffer();
        let dispatcher = BatchDispatcher::new(view);

        dispatcher.enqueue(StreamItem::Record(record("stale")));
        dispatcher.enqueue(StreamItem::Reset);
        dispatcher.enqueue(StreamItem::Record(record("fresh")));

        tokio::time::timeout(Duration::from_secs(2), async {
            while !buffer.all().iter().any(|e| e.text == "fresh") {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("fresh record never arrived");

        let texts: Vec<String> = buffer.all().iter().map(|e| e.text.clone()).collect();
        assert_eq!(texts, vec!["fresh".to_string()]);
    }

    #[tokio::test]
    async fn test_burst_larger_than_batch_still_complete_and_ordered() {
        let view = LogView::new(Template::parse("%(message)s"), MAX_BATCH * 3);
        let buffer = view.buffer();
        let dispatcher = BatchDispatcher::new(view);

        let total = MAX_BATCH + 500;
        for i in 0..total {
            dispatcher.enqueue(StreamItem::Record(record(&format!("m{}", i))));
        }

        wait_for_len(&buffer, total).await;
        let all = buffer.all();
        assert_eq!(all.first().unwrap().text, "m0");
        assert_eq!(all.last().unwrap().text, format!("m{}", total - 1));
    }
}
