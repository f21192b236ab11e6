//! Key bindings: normal and vim-style.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

/// Action from a key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    CursorUp,
    CursorDown,
    CursorLeft,
    CursorRight,
    Select,
    Restart,
    Quit,
    None,
}

/// Map key event to game action. Supports both normal (arrows, enter) and vim (hjkl) keys.
pub fn key_to_action(key: KeyEvent) -> Action {
    let KeyEvent { code, modifiers, .. } = key;
    if modifiers == KeyModifiers::CONTROL && code == KeyCode::Char('c') {
        return Action::Quit;
    }
    if !(modifiers.is_empty() || modifiers == KeyModifiers::SHIFT) {
        return Action::None;
    }
    match code {
        KeyCode::Char('q' | 'Q') | KeyCode::Esc => Action::Quit,
        KeyCode::Char('r' | 'R') => Action::Restart,
        KeyCode::Up | KeyCode::Char('k') => Action::CursorUp,
        KeyCode::Down | KeyCode::Char('j') => Action::CursorDown,
        KeyCode::Left | KeyCode::Char('h') => Action::CursorLeft,
        KeyCode::Right | KeyCode::Char('l') => Action::CursorRight,
        KeyCode::Enter | KeyCode::Char(' ') => Action::Select,
        _ => Action::None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Action {
        key_to_action(KeyEvent::new(code, modifiers))
    }

    #[test]
    fn test_arrows_and_vim_keys_agree() {
        assert_eq!(press(KeyCode::Up, KeyModifiers::NONE), Action::CursorUp);
        assert_eq!(press(KeyCode::Char('k'), KeyModifiers::NONE), Action::CursorUp);
        assert_eq!(press(KeyCode::Left, KeyModifiers::NONE), Action::CursorLeft);
        assert_eq!(press(KeyCode::Char('h'), KeyModifiers::NONE), Action::CursorLeft);
        assert_eq!(press(KeyCode::Char('j'), KeyModifiers::NONE), Action::CursorDown);
        assert_eq!(press(KeyCode::Char('l'), KeyModifiers::NONE), Action::CursorRight);
    }

    #[test]
    fn test_select_restart_quit() {
        assert_eq!(press(KeyCode::Enter, KeyModifiers::NONE), Action::Select);
        assert_eq!(press(KeyCode::Char(' '), KeyModifiers::NONE), Action::Select);
        assert_eq!(press(KeyCode::Char('R'), KeyModifiers::SHIFT), Action::Restart);
        assert_eq!(press(KeyCode::Esc, KeyModifiers::NONE), Action::Quit);
        assert_eq!(press(KeyCode::Char('c'), KeyModifiers::CONTROL), Action::Quit);
    }

    #[test]
    fn test_other_modifiers_are_ignored() {
        assert_eq!(press(KeyCode::Char('q'), KeyModifiers::ALT), Action::None);
        assert_eq!(press(KeyCode::Char('x'), KeyModifiers::NONE), Action::None);
    }
}
