//! Terminal UI for loglens
//!
//! Renders the live log view: filter bar, highlighted log lines,
//! connection status, and the keybindings and terminal plumbing around
//! them.

pub mod app;
pub mod keybindings;
pub mod theme;
pub mod tui;
pub mod ui;

pub use app::{Action, AppState, FilterCache};
pub use keybindings::{KeyBinding, KeyBindings, KeyContext};
pub use theme::Theme;
pub use tui::{Event, EventHandler, Tui};
pub use ui::log_viewer::LogViewerScreen;
