// Keyboard input handling and command dispatch.
//
// Translates crossterm key events into UserCommand messages for the app
// orchestrator, or into local ViewState mutations (chat scroll).

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use super::ViewState;
use crate::protocol::UserCommand;

/// Lines moved per PageUp/PageDown.
const PAGE: usize = 5;

/// Handle a keyboard event.
///
/// Returns `Some(UserCommand)` when the key should go to the app
/// orchestrator, `None` when it was handled locally or ignored.
pub fn handle_key(key_event: KeyEvent, view_state: &mut ViewState) -> Option<UserCommand> {
    // Only process key press events. On Windows, crossterm emits both
    // Press and Release events for each physical keypress.
    if key_event.kind != KeyEventKind::Press {
        return None;
    }

    let ctrl = key_event.modifiers.contains(KeyModifiers::CONTROL);

    // Ctrl+C always quits, whatever has focus.
    if ctrl && key_event.code == KeyCode::Char('c') {
        return Some(UserCommand::Quit);
    }

    // An alert is modal: it only listens for dismissal.
    if view_state.chat.alert.is_some() {
        return match key_event.code {
            KeyCode::Esc | KeyCode::Enter => Some(UserCommand::DismissAlert),
            _ => None,
        };
    }

    if view_state.chat.is_open {
        return handle_open_chat(key_event, ctrl, view_state);
    }

    match key_event.code {
        KeyCode::Char('c') => Some(UserCommand::ToggleChat),
        KeyCode::Char('q') => Some(UserCommand::Quit),
        _ => None,
    }
}

/// The panel has focus: printable keys edit the input line.
fn handle_open_chat(
    key_event: KeyEvent,
    ctrl: bool,
    view_state: &mut ViewState,
) -> Option<UserCommand> {
    match key_event.code {
        KeyCode::Esc => Some(UserCommand::CloseChat),
        KeyCode::Enter => Some(UserCommand::Submit),
        KeyCode::Backspace => Some(UserCommand::Backspace),
        KeyCode::Char('u') if ctrl => Some(UserCommand::ClearInput),
        KeyCode::Up => {
            scroll_up(view_state, 1);
            None
        }
        KeyCode::Down => {
            scroll_down(view_state, 1);
            None
        }
        KeyCode::PageUp => {
            scroll_up(view_state, PAGE);
            None
        }
        KeyCode::PageDown => {
            scroll_down(view_state, PAGE);
            None
        }
        KeyCode::Char(_) if ctrl => None,
        KeyCode::Char(c) => Some(UserCommand::InputChar(c)),
        _ => None,
    }
}

// Scroll is measured up from the bottom; the renderer clamps the top.
fn scroll_up(view_state: &mut ViewState, lines: usize) {
    view_state.chat_scroll = view_state.chat_scroll.saturating_add(lines);
}

fn scroll_down(view_state: &mut ViewState, lines: usize) {
    view_state.chat_scroll = view_state.chat_scroll.saturating_sub(lines);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
