//! In-memory character display.
//!
//! `LcdBuffer` behaves like an HD44780-style module: a fixed grid of cells,
//! a cursor that advances as text is written, and text past the end of a row
//! is dropped rather than wrapped.

use dispenser_traits::{CharDisplay, GatewayError};

use crate::error::UiError;

pub const DEFAULT_COLS: usize = 16;
pub const DEFAULT_ROWS: usize = 2;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LcdBuffer {
    cols: usize,
    rows: usize,
    cells: Vec<char>,
    cursor: (usize, usize),
    dirty: bool,
}

impl Default for LcdBuffer {
    fn default() -> Self {
        Self::new(DEFAULT_COLS, DEFAULT_ROWS)
    }
}

impl LcdBuffer {
    pub fn new(cols: usize, rows: usize) -> Self {
        let cols = cols.max(1);
        let rows = rows.max(1);
        Self {
            cols,
            rows,
            cells: vec![' '; cols * rows],
            cursor: (0, 0),
            dirty: false,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Row contents with trailing blanks removed. Empty for rows that do not exist.
    pub fn row_text(&self, row: usize) -> String {
        if row >= self.rows {
            return String::new();
        }
        let start = row * self.cols;
        let s: String = self.cells[start..start + self.cols].iter().collect();
        s.trim_end().to_owned()
    }

    /// Every row at full width.
    pub fn frame(&self) -> Vec<String> {
        self.cells
            .chunks(self.cols)
            .map(|r| r.iter().collect())
            .collect()
    }

    /// True if anything changed since the last call.
    pub fn take_dirty(&mut self) -> bool {
        std::mem::take(&mut self.dirty)
    }

    fn clear(&mut self) {
        self.cells.fill(' ');
        self.cursor = (0, 0);
        self.dirty = true;
    }

    fn put_str(&mut self, text: &str) {
        let (mut col, row) = self.cursor;
        for ch in text.chars() {
            if col >= self.cols {
                break;
            }
            let idx = row * self.cols + col;
            if self.cells[idx] != ch {
                self.cells[idx] = ch;
                self.dirty = true;
            }
            col += 1;
        }
        self.cursor = (col.min(self.cols), row);
    }
}

impl CharDisplay for LcdBuffer {
    fn clear_and_show(&mut self, text: &str) -> Result<(), GatewayError> {
        self.clear();
        self.put_str(text);
        Ok(())
    }

    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), GatewayError> {
        let (c, r) = (usize::from(col), usize::from(row));
        if c >= self.cols || r >= self.rows {
            return Err(Box::new(UiError::CursorOutOfRange { col, row }));
        }
        self.cursor = (c, r);
        Ok(())
    }

    fn write_text(&mut self, text: &str) -> Result<(), GatewayError> {
        self.put_str(text);
        Ok(())
    }

    fn write_number(&mut self, value: f32, decimals: u8) -> Result<(), GatewayError> {
        let s = format!("{value:.prec$}", prec = usize::from(decimals));
        self.put_str(&s);
        Ok(())
    }
}
