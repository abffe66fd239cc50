//! Maps terminal key events to chat actions.

use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UiAction {
    Quit,
    Send,
    Newline,
    NewChat,
    DeleteSession,
    PreviousSession,
    NextSession,
    PageUp,
    PageDown,
    /// Copy the newest answer in the active session.
    CopyLast,
    /// Send the welcome-screen suggestion with this index.
    Suggestion(usize),
    /// Anything else is handed to the input box.
    Edit,
}

pub fn action_for(key: &KeyEvent) -> UiAction {
    let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
    let alt = key.modifiers.contains(KeyModifiers::ALT);

    match key.code {
        KeyCode::Esc => UiAction::Quit,
        KeyCode::Char('c') if ctrl => UiAction::Quit,
        KeyCode::Char('n') if ctrl => UiAction::NewChat,
        KeyCode::Char('x') if ctrl => UiAction::DeleteSession,
        KeyCode::Char('k') if ctrl => UiAction::PreviousSession,
        KeyCode::Char('j') if ctrl => UiAction::NextSession,
        KeyCode::Char('y') if ctrl => UiAction::CopyLast,
        KeyCode::Enter if alt || key.modifiers.contains(KeyModifiers::SHIFT) => UiAction::Newline,
        KeyCode::Enter => UiAction::Send,
        KeyCode::PageUp => UiAction::PageUp,
        KeyCode::PageDown => UiAction::PageDown,
        KeyCode::F(n @ 1..=4) => UiAction::Suggestion(usize::from(n - 1)),
        _ => UiAction::Edit,
    }
}
