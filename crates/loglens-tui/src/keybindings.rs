use std::collections::HashMap;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::Action;

/// A key combination
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct KeyBinding {
    pub code: KeyCode,
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    pub fn new(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    pub fn ctrl(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::CONTROL,
        }
    }

    pub fn from_event(event: &KeyEvent) -> Self {
        Self {
            code: event.code,
            modifiers: event.modifiers,
        }
    }
}

/// Which input mode a binding belongs to
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum KeyContext {
    Global,
    LogViewer,
    FilterInput,
}

/// Keybinding configuration
pub struct KeyBindings {
    bindings: HashMap<KeyContext, HashMap<KeyBinding, Action>>,
}

impl KeyBindings {
    pub fn new() -> Self {
        let mut bindings = HashMap::new();

        let mut global = HashMap::new();
        global.insert(KeyBinding::new(KeyCode::Char('q')), Action::Quit);
        global.insert(KeyBinding::ctrl(KeyCode::Char('c')), Action::Quit);
        global.insert(KeyBinding::new(KeyCode::Char('?')), Action::ToggleHelp);
        bindings.insert(KeyContext::Global, global);

        let mut log_viewer = HashMap::new();
        log_viewer.insert(KeyBinding::new(KeyCode::Char('j')), Action::ScrollDown(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Down), Action::ScrollDown(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Char('k')), Action::ScrollUp(1));
        log_viewer.insert(KeyBinding::new(KeyCode::Up), Action::ScrollUp(1));
        log_viewer.insert(KeyBinding::new(KeyCode::PageDown), Action::PageDown);
        log_viewer.insert(KeyBinding::new(KeyCode::PageUp), Action::PageUp);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('d')), Action::PageDown);
        log_viewer.insert(KeyBinding::ctrl(KeyCode::Char('u')), Action::PageUp);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('g')), Action::ScrollToTop);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('G')), Action::ScrollToBottom);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('f')), Action::ToggleFollow);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('/')), Action::OpenFilter);
        log_viewer.insert(KeyBinding::new(KeyCode::Char('n')), Action::ClearFilter);
        bindings.insert(KeyContext::LogViewer, log_viewer);

        let mut filter_input = HashMap::new();
        filter_input.insert(KeyBinding::new(KeyCode::Enter), Action::ApplyFilter);
        filter_input.insert(KeyBinding::new(KeyCode::Esc), Action::CloseFilter);
        filter_input.insert(KeyBinding::new(KeyCode::Backspace), Action::FilterBackspace);
        bindings.insert(KeyContext::FilterInput, filter_input);

        Self { bindings }
    }

    /// Resolve a key press in the log viewer
    pub fn get_viewer_action(&self, event: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(event);
        self.bindings
            .get(&KeyContext::LogViewer)
            .and_then(|map| map.get(&binding))
            .or_else(|| {
                self.bindings
                    .get(&KeyContext::Global)
                    .and_then(|map| map.get(&binding))
            })
            .cloned()
    }

    /// Resolve a key press while the filter line is focused. Unmapped
    /// printable characters become filter input.
    pub fn get_filter_action(&self, event: &KeyEvent) -> Option<Action> {
        let binding = KeyBinding::from_event(event);
        if let Some(action) = self
            .bindings
            .get(&KeyContext::FilterInput)
            .and_then(|map| map.get(&binding))
        {
            return Some(action.clone());
        }

        match event.code {
            KeyCode::Char(c) if !event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(Action::FilterInput(c))
            }
            _ => None,
        }
    }
}

impl Default for KeyBindings {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_viewer_falls_back_to_global() {
        let bindings = KeyBindings::new();
        let quit = KeyEvent::from(KeyCode::Char('q'));
        assert!(matches!(
            bindings.get_viewer_action(&quit),
            Some(Action::Quit)
        ));
    }

    #[test]
    fn test_filter_input_captures_q() {
        // 'q' must type into the filter, not quit
        let bindings = KeyBindings::new();
        let q = KeyEvent::from(KeyCode::Char('q'));
        assert!(matches!(
            bindings.get_filter_action(&q),
            Some(Action::FilterInput('q'))
        ));
    }

    #[test]
    fn test_filter_enter_applies() {
        let bindings = KeyBindings::new();
        let enter = KeyEvent::from(KeyCode::Enter);
        assert!(matches!(
            bindings.get_filter_action(&enter),
            Some(Action::ApplyFilter)
        ));
    }
}
