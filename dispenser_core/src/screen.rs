//! What the controller puts on the character display for each state.

use dispenser_traits::CharDisplay;
use eyre::WrapErr;

use crate::error::Result;
use crate::hw_error::report;
use crate::input::MAX_INPUT_LEN;

pub const PROMPT: &str = "Target (g):";
pub const CALIBRATING: &str = "Calibrating...";
pub const DISPENSING: &str = "Dispensing...";
pub const COMPLETED: &str = "Completed!";

/// Digits shown after the decimal point for masses.
const MASS_DECIMALS: u8 = 2;

/// Columns on the character display.
const ROW_WIDTH: usize = 16;

/// Prompt on row 0, the entry so far on row 1.
pub fn prompt<D: CharDisplay + ?Sized>(display: &mut D, entry: &str) -> Result<()> {
    display
        .clear_and_show(PROMPT)
        .map_err(report)
        .wrap_err("display prompt")?;
    entry_field(display, entry)
}

/// Redraw only the entry field, padded so a shorter entry leaves no residue.
pub fn entry_field<D: CharDisplay + ?Sized>(display: &mut D, entry: &str) -> Result<()> {
    let padded = format!("{entry:<width$}", width = MAX_INPUT_LEN);
    display
        .set_cursor(0, 1)
        .and_then(|()| display.write_text(&padded))
        .map_err(report)
        .wrap_err("display entry")
}

pub fn calibrating<D: CharDisplay + ?Sized>(display: &mut D) -> Result<()> {
    display
        .clear_and_show(CALIBRATING)
        .map_err(report)
        .wrap_err("display calibrating")
}

pub fn dispensing<D: CharDisplay + ?Sized>(display: &mut D) -> Result<()> {
    display
        .clear_and_show(DISPENSING)
        .map_err(report)
        .wrap_err("display dispensing")
}

/// `current/target` on row 1, padded to the row so a shorter reading
/// overwrites the previous one.
pub fn progress<D: CharDisplay + ?Sized>(display: &mut D, current_g: f32, target_g: f32) -> Result<()> {
    let prec = usize::from(MASS_DECIMALS);
    let line = format!("{current_g:.prec$}/{target_g:.prec$}");
    let padded = format!("{line:<width$}", width = ROW_WIDTH);
    display
        .set_cursor(0, 1)
        .and_then(|()| display.write_text(&padded))
        .map_err(report)
        .wrap_err("display progress")
}

/// Completion banner with the final mass on row 1.
pub fn completed<D: CharDisplay + ?Sized>(display: &mut D, final_g: f32) -> Result<()> {
    display
        .clear_and_show(COMPLETED)
        .and_then(|()| display.set_cursor(0, 1))
        .and_then(|()| display.write_number(final_g, MASS_DECIMALS))
        .and_then(|()| display.write_text(" g"))
        .map_err(report)
        .wrap_err("display completed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispenser_traits::GatewayError;

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl CharDisplay for Recorder {
        fn clear_and_show(&mut self, text: &str) -> std::result::Result<(), GatewayError> {
            self.0.push(format!("clear:{text}"));
            Ok(())
        }
        fn set_cursor(&mut self, col: u8, row: u8) -> std::result::Result<(), GatewayError> {
            self.0.push(format!("at:{col},{row}"));
            Ok(())
        }
        fn write_text(&mut self, text: &str) -> std::result::Result<(), GatewayError> {
            self.0.push(format!("text:{text}"));
            Ok(())
        }
        fn write_number(&mut self, value: f32, decimals: u8) -> std::result::Result<(), GatewayError> {
            self.0.push(format!("num:{value:.prec$}", prec = usize::from(decimals)));
            Ok(())
        }
    }

    #[test]
    fn prompt_draws_both_rows() {
        let mut d = Recorder::default();
        prompt(&mut d, "12").unwrap();
        assert_eq!(d.0, ["clear:Target (g):", "at:0,1", "text:12    "]);
    }

    #[test]
    fn progress_uses_two_decimals() {
        let mut d = Recorder::default();
        progress(&mut d, 12.345, 500.0).unwrap();
        assert_eq!(d.0, ["at:0,1", "text:12.35/500.00    "]);
    }

    #[test]
    fn shorter_reading_leaves_no_residue() {
        let mut lcd = dispenser_ui::LcdBuffer::default();
        progress(&mut lcd, 10.0, 500.0).unwrap();
        assert_eq!(lcd.row_text(1), "10.00/500.00");
        progress(&mut lcd, 9.99, 500.0).unwrap();
        assert_eq!(lcd.row_text(1), "9.99/500.00");
    }

    #[test]
    fn display_errors_carry_context() {
        struct Broken;
        impl CharDisplay for Broken {
            fn clear_and_show(&mut self, _: &str) -> std::result::Result<(), GatewayError> {
                Err("i2c nack".into())
            }
            fn set_cursor(&mut self, _: u8, _: u8) -> std::result::Result<(), GatewayError> {
                Ok(())
            }
            fn write_text(&mut self, _: &str) -> std::result::Result<(), GatewayError> {
                Ok(())
            }
            fn write_number(&mut self, _: f32, _: u8) -> std::result::Result<(), GatewayError> {
                Ok(())
            }
        }
        let err = calibrating(&mut Broken).unwrap_err();
        assert!(format!("{err:#}").contains("display calibrating"));
    }
}
