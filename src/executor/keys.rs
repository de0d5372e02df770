//! Key name resolution and chord parsing.
//!
//! A chord such as `"Ctrl+Shift+Esc"` is lower-cased, split on `+`, and each
//! token is looked up in a fixed alias table. Keys are pressed in input order
//! and released in reverse so modifiers are always released last.

use serde::{Serialize, Serializer};

use crate::errors::{DeskError, DeskResult};

/// Platform-independent key identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Control,
    Alt,
    Shift,
    LeftMeta,
    RightMeta,
    Enter,
    Tab,
    Escape,
    Backspace,
    Delete,
    Insert,
    Space,
    Up,
    Down,
    Left,
    Right,
    Home,
    End,
    PageUp,
    PageDown,
    PrintScreen,
    Pause,
    CapsLock,
    NumLock,
    ScrollLock,
    /// F1–F12.
    F(u8),
    /// Upper-case ASCII letter, digit, or one of the named punctuation keys.
    Char(char),
}

impl KeyCode {
    pub fn name(&self) -> String {
        let fixed = match self {
            KeyCode::Control => "ctrl",
            KeyCode::Alt => "alt",
            KeyCode::Shift => "shift",
            KeyCode::LeftMeta => "left-meta",
            KeyCode::RightMeta => "right-meta",
            KeyCode::Enter => "enter",
            KeyCode::Tab => "tab",
            KeyCode::Escape => "escape",
            KeyCode::Backspace => "backspace",
            KeyCode::Delete => "delete",
            KeyCode::Insert => "insert",
            KeyCode::Space => "space",
            KeyCode::Up => "up",
            KeyCode::Down => "down",
            KeyCode::Left => "left",
            KeyCode::Right => "right",
            KeyCode::Home => "home",
            KeyCode::End => "end",
            KeyCode::PageUp => "page-up",
            KeyCode::PageDown => "page-down",
            KeyCode::PrintScreen => "print-screen",
            KeyCode::Pause => "pause",
            KeyCode::CapsLock => "caps-lock",
            KeyCode::NumLock => "num-lock",
            KeyCode::ScrollLock => "scroll-lock",
            KeyCode::F(n) => return format!("f{n}"),
            KeyCode::Char(c) => return c.to_ascii_lowercase().to_string(),
        };
        fixed.to_string()
    }

    /// Windows virtual-key code.
    pub fn vk(&self) -> u8 {
        match self {
            KeyCode::Control => 0x11,
            KeyCode::Alt => 0x12,
            KeyCode::Shift => 0x10,
            KeyCode::LeftMeta => 0x5b,
            KeyCode::RightMeta => 0x5c,
            KeyCode::Enter => 0x0d,
            KeyCode::Tab => 0x09,
            KeyCode::Escape => 0x1b,
            KeyCode::Backspace => 0x08,
            KeyCode::Delete => 0x2e,
            KeyCode::Insert => 0x2d,
            KeyCode::Space => 0x20,
            KeyCode::Up => 0x26,
            KeyCode::Down => 0x28,
            KeyCode::Left => 0x25,
            KeyCode::Right => 0x27,
            KeyCode::Home => 0x24,
            KeyCode::End => 0x23,
            KeyCode::PageUp => 0x21,
            KeyCode::PageDown => 0x22,
            KeyCode::PrintScreen => 0x2c,
            KeyCode::Pause => 0x13,
            KeyCode::CapsLock => 0x14,
            KeyCode::NumLock => 0x90,
            KeyCode::ScrollLock => 0x91,
            KeyCode::F(n) => 0x6f_u8.saturating_add(*n),
            KeyCode::Char(c) => match c {
                ';' => 0xba,
                '=' => 0xbb,
                ',' => 0xbc,
                '-' => 0xbd,
                '.' => 0xbe,
                '/' => 0xbf,
                '`' => 0xc0,
                '[' => 0xdb,
                '\\' => 0xdc,
                ']' => 0xdd,
                '\'' => 0xde,
                other => *other as u8,
            },
        }
    }
}

impl Serialize for KeyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.name())
    }
}

/// Maps one lower-cased, trimmed token to a key.
fn lookup(token: &str) -> Option<KeyCode> {
    let code = match token {
        "ctrl" | "control" => KeyCode::Control,
        "alt" => KeyCode::Alt,
        "shift" => KeyCode::Shift,
        "win" | "lwin" | "meta" | "super" | "cmd" => KeyCode::LeftMeta,
        "rwin" => KeyCode::RightMeta,

        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "escape" | "esc" => KeyCode::Escape,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "space" => KeyCode::Space,

        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdn" => KeyCode::PageDown,

        "printscreen" | "prtsc" => KeyCode::PrintScreen,
        "pause" => KeyCode::Pause,
        "capslock" => KeyCode::CapsLock,
        "numlock" => KeyCode::NumLock,
        "scrolllock" => KeyCode::ScrollLock,

        "comma" | "," => KeyCode::Char(','),
        "period" | "dot" | "." => KeyCode::Char('.'),
        "minus" | "-" => KeyCode::Char('-'),
        "equal" | "equals" | "=" => KeyCode::Char('='),
        "slash" | "/" => KeyCode::Char('/'),
        "backslash" | "\\" => KeyCode::Char('\\'),
        "semicolon" | ";" => KeyCode::Char(';'),
        "quote" | "'" => KeyCode::Char('\''),
        "backquote" | "grave" | "`" => KeyCode::Char('`'),
        "bracketleft" | "[" => KeyCode::Char('['),
        "bracketright" | "]" => KeyCode::Char(']'),

        _ => return function_key(token).or_else(|| single_alphanumeric(token)),
    };
    Some(code)
}

fn function_key(token: &str) -> Option<KeyCode> {
    let n: u8 = token.strip_prefix('f')?.parse().ok()?;
    (1..=12).contains(&n).then_some(KeyCode::F(n))
}

fn single_alphanumeric(token: &str) -> Option<KeyCode> {
    let mut chars = token.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii_alphanumeric() => Some(KeyCode::Char(c.to_ascii_uppercase())),
        _ => None,
    }
}

/// Resolved chord. Guaranteed non-empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyChord {
    keys: Vec<KeyCode>,
}

impl KeyChord {
    pub fn down_sequence(&self) -> &[KeyCode] {
        &self.keys
    }

    pub fn up_sequence(&self) -> Vec<KeyCode> {
        self.keys.iter().rev().copied().collect()
    }
}

/// Parses a `+`-joined chord. Unknown tokens are dropped; the chord fails
/// with `UnknownKey` only when nothing resolves.
pub fn resolve_chord(input: &str) -> DeskResult<KeyChord> {
    let lower = input.to_lowercase();
    let mut keys = Vec::new();
    for token in lower.split('+').map(str::trim) {
        match lookup(token) {
            Some(code) => keys.push(code),
            None if token.is_empty() => {}
            None => tracing::warn!(token = %token, chord = %input, "unmapped key token dropped"),
        }
    }
    if keys.is_empty() {
        return Err(DeskError::UnknownKey(input.to_string()));
    }
    Ok(KeyChord { keys })
}
