//! Record rendering and display buffer for loglens
//!
//! Formats structured records through a display template, sanitizes the
//! result for the terminal, and holds rendered entries in a bounded
//! buffer that evicts oldest-first.

mod buffer;
mod sanitize;
mod template;
mod view;

pub use buffer::{ArcRecord, DisplayBuffer, LevelCounts, RenderedRecord};
pub use sanitize::sanitize;
pub use template::Template;
pub use view::LogView;
