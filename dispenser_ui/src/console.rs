//! Terminal stand-ins for the LCD and the keypad.

use std::io::{BufRead, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel as xch;
use dispenser_traits::{CharDisplay, GatewayError, Keypad};

use crate::error::UiError;
use crate::lcd::LcdBuffer;

/// Draws an `LcdBuffer` to a writer, once per flush and only when it changed.
pub struct ConsoleDisplay<W: Write> {
    lcd: LcdBuffer,
    out: W,
}

impl ConsoleDisplay<std::io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(LcdBuffer::default(), std::io::stdout())
    }
}

impl<W: Write> ConsoleDisplay<W> {
    pub fn new(lcd: LcdBuffer, out: W) -> Self {
        Self { lcd, out }
    }

    pub fn lcd(&self) -> &LcdBuffer {
        &self.lcd
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn render(&mut self) -> Result<(), UiError> {
        let border = format!("+{}+", "-".repeat(self.lcd.cols()));
        writeln!(self.out, "{border}")?;
        for line in self.lcd.frame() {
            writeln!(self.out, "|{line}|")?;
        }
        writeln!(self.out, "{border}")?;
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> CharDisplay for ConsoleDisplay<W> {
    fn clear_and_show(&mut self, text: &str) -> Result<(), GatewayError> {
        self.lcd.clear_and_show(text)
    }
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), GatewayError> {
        self.lcd.set_cursor(col, row)
    }
    fn write_text(&mut self, text: &str) -> Result<(), GatewayError> {
        self.lcd.write_text(text)
    }
    fn write_number(&mut self, value: f32, decimals: u8) -> Result<(), GatewayError> {
        self.lcd.write_number(value, decimals)
    }
    fn flush(&mut self) -> Result<(), GatewayError> {
        if self.lcd.take_dirty() {
            self.render()?;
        }
        Ok(())
    }
}

/// Keypad fed from a line-oriented reader (stdin in the CLI).
///
/// A reader thread forwards every non-blank character over a bounded
/// channel; `poll_key` never blocks. The thread exits at end of input or once
/// the keypad is dropped and the next line arrives.
pub struct ConsoleKeypad {
    rx: xch::Receiver<char>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<JoinHandle<()>>,
}

/// Keys buffered ahead of the controller.
const KEY_QUEUE: usize = 64;

impl ConsoleKeypad {
    pub fn stdin() -> Self {
        Self::spawn(std::io::BufReader::new(std::io::stdin()))
    }

    pub fn spawn<R: BufRead + Send + 'static>(reader: R) -> Self {
        let (tx, rx) = xch::bounded(KEY_QUEUE);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_clone = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            for line in reader.lines() {
                if shutdown_clone.load(Ordering::Relaxed) {
                    break;
                }
                let line = match line {
                    Ok(l) => l,
                    Err(e) => {
                        tracing::warn!(error = %e, "keypad input read failed");
                        break;
                    }
                };
                for ch in line.chars().filter(|c| !c.is_whitespace()) {
                    if tx.send(ch).is_err() {
                        tracing::debug!("keypad consumer disconnected, exiting thread");
                        return;
                    }
                }
            }
            tracing::trace!("keypad reader thread exiting");
        });

        Self {
            rx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }
}

impl Keypad for ConsoleKeypad {
    fn poll_key(&mut self) -> Result<Option<char>, GatewayError> {
        match self.rx.try_recv() {
            Ok(c) => Ok(Some(c)),
            Err(xch::TryRecvError::Empty | xch::TryRecvError::Disconnected) => Ok(None),
        }
    }
}

impl Drop for ConsoleKeypad {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // The reader may be parked in a blocking read; only reap it if it is done.
        if let Some(h) = self.join_handle.take()
            && h.is_finished()
        {
            let _ = h.join();
        }
    }
}
