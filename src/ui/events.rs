//! Terminal event polling and key classification.

use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// How long to wait for input before emitting a tick.
const TICK_RATE: Duration = Duration::from_millis(250);

pub enum Event {
    Key(KeyEvent),
    Resize,
    Tick,
}

pub struct EventHandler;

impl EventHandler {
    pub fn new() -> Self {
        Self
    }

    /// Block up to the tick rate for the next event. Key releases and
    /// repeats are dropped so Windows terminals do not double-fire.
    pub fn next(&self) -> Result<Event> {
        if event::poll(TICK_RATE)? {
            match event::read()? {
                CrosstermEvent::Key(key) if key.kind == KeyEventKind::Press => {
                    return Ok(Event::Key(key));
                }
                CrosstermEvent::Resize(_, _) => return Ok(Event::Resize),
                _ => {}
            }
        }
        Ok(Event::Tick)
    }
}

impl Default for EventHandler {
    fn default() -> Self {
        Self::new()
    }
}

pub fn is_quit(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('q'))
        || (key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL))
}

pub fn is_enter(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter
}

pub fn is_backspace(key: &KeyEvent) -> bool {
    key.code == KeyCode::Backspace
}

pub fn is_escape(key: &KeyEvent) -> bool {
    key.code == KeyCode::Esc
}

pub fn is_space(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char(' ')
}

pub fn is_tab(key: &KeyEvent) -> bool {
    key.code == KeyCode::Tab
}

pub fn is_up(key: &KeyEvent) -> bool {
    key.code == KeyCode::Up
}

pub fn is_down(key: &KeyEvent) -> bool {
    key.code == KeyCode::Down
}

pub fn is_pin(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('p')
}

pub fn is_delete(key: &KeyEvent) -> bool {
    matches!(key.code, KeyCode::Char('d') | KeyCode::Delete)
}

/// Shift+K moves the selected watchlist entry up the display.
pub fn is_move_up(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('K')
}

/// Shift+J moves the selected watchlist entry down the display.
pub fn is_move_down(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('J')
}

pub fn is_info_toggle(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('i')
}

pub fn is_block_mode(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('b') && key.modifiers.contains(KeyModifiers::CONTROL)
}

pub fn is_image_mode(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('h') && key.modifiers.contains(KeyModifiers::CONTROL)
}

pub fn is_debug_mode(key: &KeyEvent) -> bool {
    key.code == KeyCode::Char('t') && key.modifiers.contains(KeyModifiers::CONTROL)
}

/// 1-9 jump to a watchlist slot; returns the zero-based display index.
pub fn digit_from_event(key: &KeyEvent) -> Option<usize> {
    if let KeyCode::Char(c) = key.code {
        if let Some(digit) = c.to_digit(10) {
            if (1..=9).contains(&digit) {
                return Some(digit as usize - 1);
            }
        }
    }
    None
}

/// Symbol characters: letters, digits, and the separators Yahoo accepts
/// ("BRK-B", "^GSPC" style class/index tickers).
pub fn is_ticker_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '^' | '=')
}

pub fn get_char(key: &KeyEvent) -> Option<char> {
    if key.modifiers.contains(KeyModifiers::CONTROL) {
        return None;
    }
    match key.code {
        KeyCode::Char(c) => Some(c),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    #[test]
    fn quit_matches_q_and_ctrl_c() {
        assert!(is_quit(&key(KeyCode::Char('q'))));
        assert!(is_quit(&ctrl('c')));
        assert!(!is_quit(&key(KeyCode::Char('x'))));
    }

    #[test]
    fn mode_switches_require_control() {
        assert!(is_block_mode(&ctrl('b')));
        assert!(is_image_mode(&ctrl('h')));
        assert!(is_debug_mode(&ctrl('t')));
        assert!(!is_block_mode(&key(KeyCode::Char('b'))));
    }

    #[test]
    fn move_keys_are_shifted() {
        assert!(is_move_up(&key(KeyCode::Char('K'))));
        assert!(is_move_down(&key(KeyCode::Char('J'))));
        assert!(!is_move_up(&key(KeyCode::Char('k'))));
    }

    #[test]
    fn digits_map_to_display_indices() {
        assert_eq!(digit_from_event(&key(KeyCode::Char('1'))), Some(0));
        assert_eq!(digit_from_event(&key(KeyCode::Char('9'))), Some(8));
        assert_eq!(digit_from_event(&key(KeyCode::Char('0'))), None);
        assert_eq!(digit_from_event(&key(KeyCode::Char('a'))), None);
    }

    #[test]
    fn ticker_chars_accept_symbol_punctuation() {
        assert!(is_ticker_char('A'));
        assert!(is_ticker_char('7'));
        assert!(is_ticker_char('-'));
        assert!(is_ticker_char('.'));
        assert!(is_ticker_char('^'));
        assert!(!is_ticker_char(' '));
        assert!(!is_ticker_char('!'));
    }

    #[test]
    fn control_chords_are_not_text_input() {
        assert_eq!(get_char(&ctrl('b')), None);
        assert_eq!(get_char(&key(KeyCode::Char('a'))), Some('a'));
    }
}
