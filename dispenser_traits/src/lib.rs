//! Gateway traits between the dispensing controller and the device it drives.
//!
//! Every call is expected to return promptly: the controller runs a single
//! cooperative polling loop and never waits inside a gateway.

pub mod clock;

pub use clock::{Clock, ManualClock, MonotonicClock};

/// Error type crossing a gateway boundary.
pub type GatewayError = Box<dyn std::error::Error + Send + Sync>;

/// Direction the dispensing motor turns when enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Forward,
    Reverse,
}

/// Load-cell front end: acquisition, readings and the tare handshake.
pub trait WeightSensor {
    /// Start continuous acquisition. Called once at bring-up.
    fn begin_acquisition(&mut self) -> Result<(), GatewayError>;
    /// Non-blocking: true when a fresh reading has been latched since the last poll.
    fn poll_new_reading(&mut self) -> Result<bool, GatewayError>;
    /// Latest latched mass in grams (signed, relative to the last tare).
    fn current_reading(&self) -> f32;
    /// Begin a tare; completion is reported through `tare_complete`.
    fn request_tare(&mut self) -> Result<(), GatewayError>;
    /// True once the requested tare has finished.
    fn tare_complete(&mut self) -> bool;
    /// The front end gave up on the tare itself.
    fn tare_timed_out(&self) -> bool;
    /// The front end stopped delivering conversions.
    fn signal_timed_out(&self) -> bool;
}

/// Single-motor actuator with directional enable.
pub trait Actuator {
    fn enable(&mut self, direction: Direction) -> Result<(), GatewayError>;
    fn disable(&mut self) -> Result<(), GatewayError>;
}

/// Matrix keypad scanner. Returns at most one key per poll.
pub trait Keypad {
    fn poll_key(&mut self) -> Result<Option<char>, GatewayError>;
}

/// Character display (e.g. a 16x2 LCD).
pub trait CharDisplay {
    fn clear_and_show(&mut self, text: &str) -> Result<(), GatewayError>;
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), GatewayError>;
    fn write_text(&mut self, text: &str) -> Result<(), GatewayError>;
    fn write_number(&mut self, value: f32, decimals: u8) -> Result<(), GatewayError>;
    /// Push buffered output to the device. Called once per controller tick.
    fn flush(&mut self) -> Result<(), GatewayError> {
        Ok(())
    }
}

impl<T: WeightSensor + ?Sized> WeightSensor for Box<T> {
    fn begin_acquisition(&mut self) -> Result<(), GatewayError> {
        (**self).begin_acquisition()
    }
    fn poll_new_reading(&mut self) -> Result<bool, GatewayError> {
        (**self).poll_new_reading()
    }
    fn current_reading(&self) -> f32 {
        (**self).current_reading()
    }
    fn request_tare(&mut self) -> Result<(), GatewayError> {
        (**self).request_tare()
    }
    fn tare_complete(&mut self) -> bool {
        (**self).tare_complete()
    }
    fn tare_timed_out(&self) -> bool {
        (**self).tare_timed_out()
    }
    fn signal_timed_out(&self) -> bool {
        (**self).signal_timed_out()
    }
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn enable(&mut self, direction: Direction) -> Result<(), GatewayError> {
        (**self).enable(direction)
    }
    fn disable(&mut self) -> Result<(), GatewayError> {
        (**self).disable()
    }
}

impl<T: Keypad + ?Sized> Keypad for Box<T> {
    fn poll_key(&mut self) -> Result<Option<char>, GatewayError> {
        (**self).poll_key()
    }
}

impl<T: CharDisplay + ?Sized> CharDisplay for Box<T> {
    fn clear_and_show(&mut self, text: &str) -> Result<(), GatewayError> {
        (**self).clear_and_show(text)
    }
    fn set_cursor(&mut self, col: u8, row: u8) -> Result<(), GatewayError> {
        (**self).set_cursor(col, row)
    }
    fn write_text(&mut self, text: &str) -> Result<(), GatewayError> {
        (**self).write_text(text)
    }
    fn write_number(&mut self, value: f32, decimals: u8) -> Result<(), GatewayError> {
        (**self).write_number(value, decimals)
    }
    fn flush(&mut self) -> Result<(), GatewayError> {
        (**self).flush()
    }
}
