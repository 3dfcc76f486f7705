use loglens_types::LogRecord;

use crate::buffer::DisplayBuffer;
use crate::sanitize::sanitize;
use crate::template::Template;

/// The record renderer: formats incoming records through the display
/// template, sanitizes the result and appends it to the bounded buffer.
///
/// Visibility and highlighting run against the buffer's rendered text at
/// read time, so filter edits apply retroactively to everything still
/// buffered.
#[derive(Clone)]
pub struct LogView {
    template: Template,
    buffer: DisplayBuffer,
}

impl LogView {
    pub fn new(template: Template, capacity: usize) -> Self {
        Self {
            template,
            buffer: DisplayBuffer::new(capacity),
        }
    }

    /// Render one record into the buffer
    pub fn apply(&self, record: LogRecord) {
        let text = sanitize(&self.template.render(&record));
        self.buffer.push(record, text);
    }

    /// Drop everything buffered; used when a fresh connection replays
    /// history from the server
    pub fn reset(&self) {
        self.buffer.clear();
    }

    /// A shared handle to the underlying buffer
    pub fn buffer(&self) -> DisplayBuffer {
        self.buffer.clone()
    }
}
