// ABOUTME: Event handling system mapping keyboard and paste input to app actions

use crate::app::state::{AppState, View};
use crate::terminal::keys::encode_key;
use crossterm::event::{Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Lines moved per Shift+PageUp/PageDown in the coding view
const SCROLL_STEP: isize = 10;

/// Action derived from a terminal event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppEvent {
    /// Exit the application
    Quit,
    // Launcher form events
    /// Typed character for the identifier
    LauncherInputChar(char),
    /// Pasted text for the identifier
    LauncherPaste(String),
    /// Delete the last identifier character
    LauncherBackspace,
    /// Select the next runtime
    LauncherNextRuntime,
    /// Select the previous runtime
    LauncherPreviousRuntime,
    /// Submit the form
    LauncherSubmit,
    // Coding view events
    /// Encoded keystrokes or pasted text for the shell
    TerminalInput(String),
    /// Scroll the shell history by this many lines
    TerminalScroll(isize),
    /// Detach and return to the launcher
    LeaveCoding,
}

/// Maps crossterm events to [`AppEvent`]s and applies them
pub struct EventHandler;

impl EventHandler {
    /// Map any terminal event to an app event
    pub fn handle_event(event: Event, state: &AppState) -> Option<AppEvent> {
        match event {
            Event::Key(key_event) => Self::handle_key_event(key_event, state),
            Event::Paste(text) => match state.current_view {
                View::Coding => Some(AppEvent::TerminalInput(text)),
                View::Launcher => Some(AppEvent::LauncherPaste(text)),
            },
            Event::Mouse(_) | Event::Resize(_, _) | Event::FocusGained | Event::FocusLost => None,
        }
    }

    /// Map a key press for the current view
    pub fn handle_key_event(key_event: KeyEvent, state: &AppState) -> Option<AppEvent> {
        if key_event.kind == KeyEventKind::Release {
            return None;
        }

        match state.current_view {
            View::Launcher => Self::handle_launcher_keys(key_event),
            View::Coding => Self::handle_coding_keys(key_event),
        }
    }

    fn handle_launcher_keys(key_event: KeyEvent) -> Option<AppEvent> {
        match key_event.code {
            KeyCode::Esc => Some(AppEvent::Quit),
            KeyCode::Char('c') if key_event.modifiers.contains(KeyModifiers::CONTROL) => {
                Some(AppEvent::Quit)
            }
            KeyCode::Enter => Some(AppEvent::LauncherSubmit),
            KeyCode::Tab | KeyCode::Right | KeyCode::Down => Some(AppEvent::LauncherNextRuntime),
            KeyCode::BackTab | KeyCode::Left | KeyCode::Up => {
                Some(AppEvent::LauncherPreviousRuntime)
            }
            KeyCode::Backspace => Some(AppEvent::LauncherBackspace),
            KeyCode::Char(ch) => Some(AppEvent::LauncherInputChar(ch)),
            _ => None,
        }
    }

    fn handle_coding_keys(key_event: KeyEvent) -> Option<AppEvent> {
        let shift = key_event.modifiers.contains(KeyModifiers::SHIFT);
        match key_event.code {
            KeyCode::Char('q') | KeyCode::Char('Q')
                if key_event.modifiers.contains(KeyModifiers::CONTROL) =>
            {
                Some(AppEvent::LeaveCoding)
            }
            KeyCode::PageUp if shift => Some(AppEvent::TerminalScroll(SCROLL_STEP)),
            KeyCode::PageDown if shift => Some(AppEvent::TerminalScroll(-SCROLL_STEP)),
            _ => encode_key(key_event).map(AppEvent::TerminalInput),
        }
    }

    /// Apply an app event to the state
    pub fn process_event(event: AppEvent, state: &mut AppState) {
        match event {
            AppEvent::Quit => state.quit(),
            AppEvent::LauncherInputChar(ch) => state.launcher.push_char(ch),
            AppEvent::LauncherPaste(text) => state.launcher.push_str(&text),
            AppEvent::LauncherBackspace => state.launcher.backspace(),
            AppEvent::LauncherNextRuntime => state.launcher.next_runtime(),
            AppEvent::LauncherPreviousRuntime => state.launcher.previous_runtime(),
            AppEvent::LauncherSubmit => state.submit_launcher(),
            AppEvent::TerminalInput(data) => state.send_terminal_input(&data),
            AppEvent::TerminalScroll(lines) => state.scroll_terminal(lines),
            AppEvent::LeaveCoding => state.leave_coding(),
        }
    }
}
