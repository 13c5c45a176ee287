//! Keypad entry: key classification and the target-mass input buffer.

/// Maximum number of characters the target field accepts.
pub const MAX_INPUT_LEN: usize = 6;

/// A keypad key as seen by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    Digit(u8),
    Point,
    /// `#`: finalize the entry.
    Enter,
    /// `*`: discard the entry.
    Cancel,
    /// Anything else on the pad (A-C on a 4x4 matrix).
    Other(char),
}

impl From<char> for Key {
    fn from(c: char) -> Self {
        match c {
            '0'..='9' => Key::Digit(c as u8 - b'0'),
            '.' => Key::Point,
            '#' => Key::Enter,
            '*' => Key::Cancel,
            other => Key::Other(other),
        }
    }
}

/// Digits and at most one decimal point, never longer than `MAX_INPUT_LEN`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InputBuffer {
    chars: String,
}

impl InputBuffer {
    pub fn new() -> Self {
        Self {
            chars: String::with_capacity(MAX_INPUT_LEN),
        }
    }

    /// Append a digit or decimal point. Returns false when the key was dropped
    /// (buffer full, second point, or not an input character).
    pub fn push(&mut self, key: Key) -> bool {
        if self.chars.len() >= MAX_INPUT_LEN {
            return false;
        }
        match key {
            Key::Digit(d) if d <= 9 => {
                self.chars.push(char::from(b'0' + d));
                true
            }
            Key::Point if !self.chars.contains('.') => {
                self.chars.push('.');
                true
            }
            _ => false,
        }
    }

    pub fn clear(&mut self) {
        self.chars.clear();
    }

    pub fn as_str(&self) -> &str {
        &self.chars
    }

    pub fn len(&self) -> usize {
        self.chars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chars.is_empty()
    }

    /// Parse the buffer as grams. `None` unless the value is finite and > 0.
    pub fn parse_target(&self) -> Option<f32> {
        self.chars
            .parse::<f32>()
            .ok()
            .filter(|g| g.is_finite() && *g > 0.0)
    }
}
