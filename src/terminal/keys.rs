// ABOUTME: Translates crossterm key events into the input sequences a terminal emulator sends to a shell

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

/// Encode a key press as shell input. `None` for keys with no terminal encoding.
pub fn encode_key(key: KeyEvent) -> Option<String> {
    if key.kind == KeyEventKind::Release {
        return None;
    }

    let data = match key.code {
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL) {
                return control_char(c).map(String::from);
            }
            if key.modifiers.contains(KeyModifiers::ALT) {
                // Alt sends an ESC prefix
                return Some(format!("\x1b{}", c));
            }
            return Some(c.to_string());
        }
        KeyCode::Enter => "\r",
        KeyCode::Tab => "\t",
        KeyCode::BackTab => "\x1b[Z",
        KeyCode::Backspace => "\x7f",
        KeyCode::Esc => "\x1b",
        KeyCode::Up => "\x1b[A",
        KeyCode::Down => "\x1b[B",
        KeyCode::Right => "\x1b[C",
        KeyCode::Left => "\x1b[D",
        KeyCode::Home => "\x1b[H",
        KeyCode::End => "\x1b[F",
        KeyCode::PageUp => "\x1b[5~",
        KeyCode::PageDown => "\x1b[6~",
        KeyCode::Delete => "\x1b[3~",
        KeyCode::Insert => "\x1b[2~",
        KeyCode::F(n) => function_key(n)?,
        _ => return None,
    };

    Some(data.to_string())
}

fn control_char(c: char) -> Option<char> {
    match c {
        'a'..='z' | 'A'..='Z' => Some(char::from((c.to_ascii_lowercase() as u8) & 0x1f)),
        '@' | ' ' => Some('\0'),
        '[' => Some('\x1b'),
        '\\' => Some('\x1c'),
        ']' => Some('\x1d'),
        '^' => Some('\x1e'),
        '_' => Some('\x1f'),
        _ => None,
    }
}

fn function_key(n: u8) -> Option<&'static str> {
    let seq = match n {
        1 => "\x1bOP",
        2 => "\x1bOQ",
        3 => "\x1bOR",
        4 => "\x1bOS",
        5 => "\x1b[15~",
        6 => "\x1b[17~",
        7 => "\x1b[18~",
        8 => "\x1b[19~",
        9 => "\x1b[20~",
        10 => "\x1b[21~",
        11 => "\x1b[23~",
        12 => "\x1b[24~",
        _ => return None,
    };
    Some(seq)
}
