//! Matrix keypad scanning.
//!
//! Rows are driven low one at a time and the pulled-up columns are read back.
//! `KeyScanner` turns the raw "which key is down" result of each scan into
//! single key presses: a key is reported once when it goes down and not
//! again until it has been released.

use crate::error::{HwError, Result};

/// 4x3 telephone layout.
const LAYOUT_4X3: [[char; 3]; 4] = [
    ['1', '2', '3'],
    ['4', '5', '6'],
    ['7', '8', '9'],
    ['*', '0', '#'],
];

/// 4x4 layout. `D` is wired as the decimal point.
const LAYOUT_4X4: [[char; 4]; 4] = [
    ['1', '2', '3', 'A'],
    ['4', '5', '6', 'B'],
    ['7', '8', '9', 'C'],
    ['*', '0', '#', '.'],
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyScanner {
    cols: usize,
    held: Option<char>,
}

impl KeyScanner {
    pub fn new(rows: usize, cols: usize) -> Result<Self> {
        if rows != 4 {
            return Err(HwError::PinLayout("keypad needs 4 rows"));
        }
        if !(3..=4).contains(&cols) {
            return Err(HwError::PinLayout("keypad needs 3 or 4 columns"));
        }
        Ok(Self { cols, held: None })
    }

    /// Character at a matrix position, if the position exists.
    pub fn key_at(&self, row: usize, col: usize) -> Option<char> {
        match self.cols {
            3 => LAYOUT_4X3.get(row).and_then(|r| r.get(col)).copied(),
            _ => LAYOUT_4X4.get(row).and_then(|r| r.get(col)).copied(),
        }
    }

    /// Feed the result of one full scan; returns a key only on its press edge.
    pub fn observe(&mut self, down: Option<(usize, usize)>) -> Option<char> {
        let key = down.and_then(|(r, c)| self.key_at(r, c));
        let pressed = match (self.held, key) {
            (None, Some(k)) => Some(k),
            (Some(prev), Some(k)) if prev != k => Some(k),
            _ => None,
        };
        self.held = key;
        pressed
    }
}

#[cfg(feature = "hardware")]
pub use driver::MatrixKeypad;

#[cfg(feature = "hardware")]
mod driver {
    use dispenser_traits::{GatewayError, Keypad};
    use rppal::gpio::{Gpio, InputPin, OutputPin};

    use super::KeyScanner;
    use crate::error::Result;

    pub struct MatrixKeypad {
        rows: Vec<OutputPin>,
        cols: Vec<InputPin>,
        scanner: KeyScanner,
    }

    impl MatrixKeypad {
        pub fn new(gpio: &Gpio, row_pins: &[u8], col_pins: &[u8]) -> Result<Self> {
            let scanner = KeyScanner::new(row_pins.len(), col_pins.len())?;
            let mut rows = Vec::with_capacity(row_pins.len());
            for &p in row_pins {
                let mut pin = gpio.get(p)?.into_output();
                pin.set_high();
                rows.push(pin);
            }
            let mut cols = Vec::with_capacity(col_pins.len());
            for &p in col_pins {
                cols.push(gpio.get(p)?.into_input_pullup());
            }
            Ok(Self {
                rows,
                cols,
                scanner,
            })
        }

        fn scan(&mut self) -> Option<(usize, usize)> {
            let mut found = None;
            for (r, row) in self.rows.iter_mut().enumerate() {
                row.set_low();
                if found.is_none() {
                    found = self.cols.iter().position(InputPin::is_low).map(|c| (r, c));
                }
                row.set_high();
            }
            found
        }
    }

    impl Keypad for MatrixKeypad {
        fn poll_key(&mut self) -> std::result::Result<Option<char>, GatewayError> {
            let down = self.scan();
            let key = self.scanner.observe(down);
            if let Some(k) = key {
                tracing::debug!(key = %k, "keypad press");
            }
            Ok(key)
        }
    }
}
