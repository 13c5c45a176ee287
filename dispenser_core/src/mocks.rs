//! Test and helper mocks for dispenser_core

use std::collections::VecDeque;

use dispenser_traits::{GatewayError, Keypad};

/// A keypad that replays a fixed key sequence, one key per poll, then goes quiet.
///
/// Used by the CLI `dispense` command and by tests that drive a whole cycle.
#[derive(Debug, Clone, Default)]
pub struct ScriptedKeypad {
    keys: VecDeque<char>,
}

impl ScriptedKeypad {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue more keys behind whatever is still pending.
    pub fn push_keys(&mut self, keys: &str) {
        self.keys.extend(keys.chars());
    }

    /// Keys not yet delivered.
    pub fn remaining(&self) -> usize {
        self.keys.len()
    }
}

impl From<&str> for ScriptedKeypad {
    fn from(keys: &str) -> Self {
        Self {
            keys: keys.chars().collect(),
        }
    }
}

impl Keypad for ScriptedKeypad {
    fn poll_key(&mut self) -> Result<Option<char>, GatewayError> {
        Ok(self.keys.pop_front())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replays_in_order_then_goes_quiet() {
        let mut k = ScriptedKeypad::from("1#");
        k.push_keys("*");
        assert_eq!(k.poll_key().unwrap(), Some('1'));
        assert_eq!(k.poll_key().unwrap(), Some('#'));
        assert_eq!(k.poll_key().unwrap(), Some('*'));
        assert_eq!(k.poll_key().unwrap(), None);
        assert_eq!(k.remaining(), 0);
    }
}
