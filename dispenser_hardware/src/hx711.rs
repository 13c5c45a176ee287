//! HX711 load-cell front end.
//!
//! The driver never waits for data-ready: `poll_new_reading` returns false
//! while DT is high and clocks out a conversion only once the chip has one.
//! Taring averages the next `tare_samples` conversions, so it completes over
//! several polls. The conversion math and the tare/signal bookkeeping live in
//! `Hx711State`, which has no GPIO and is exercised by the unit tests.

use tracing::trace;

/// Sign-extend a 24-bit two's complement conversion.
#[inline]
pub fn sign_extend_24(raw: u32) -> i32 {
    let v = (raw & 0x00FF_FFFF) as i32;
    if v & 0x0080_0000 != 0 { v | !0x00FF_FFFF } else { v }
}

/// Conversion and tare bookkeeping shared by the GPIO driver.
#[derive(Debug, Clone)]
pub struct Hx711State {
    counts_per_gram: f32,
    tare_samples: u16,
    signal_timeout_ms: u64,
    offset_counts: i32,
    latest_g: f32,
    last_ready_ms: Option<u64>,
    started_ms: u64,
    tare_sum: i64,
    tare_seen: u16,
    tare_pending: bool,
    tare_done: bool,
}

impl Hx711State {
    pub fn new(counts_per_gram: f32, tare_samples: u16, signal_timeout_ms: u64) -> Self {
        Self {
            counts_per_gram,
            tare_samples: tare_samples.max(1),
            signal_timeout_ms,
            offset_counts: 0,
            latest_g: 0.0,
            last_ready_ms: None,
            started_ms: 0,
            tare_sum: 0,
            tare_seen: 0,
            tare_pending: false,
            tare_done: false,
        }
    }

    /// Mark the start of acquisition; the signal watchdog counts from here.
    pub fn start(&mut self, now_ms: u64) {
        self.started_ms = now_ms;
        self.last_ready_ms = None;
    }

    /// Fold one raw conversion in and update the latest reading.
    pub fn accept(&mut self, raw: i32, now_ms: u64) {
        self.last_ready_ms = Some(now_ms);
        if self.tare_pending {
            self.tare_sum += i64::from(raw);
            self.tare_seen += 1;
            if self.tare_seen >= self.tare_samples {
                let avg = self.tare_sum / i64::from(self.tare_seen);
                self.offset_counts = i32::try_from(avg).unwrap_or(raw);
                self.tare_pending = false;
                self.tare_done = true;
                trace!(offset = self.offset_counts, "hx711 tare done");
            }
        }
        self.latest_g = self.to_grams(raw);
    }

    pub fn to_grams(&self, raw: i32) -> f32 {
        let delta = i64::from(raw) - i64::from(self.offset_counts);
        delta as f32 / self.counts_per_gram
    }

    pub fn latest_g(&self) -> f32 {
        self.latest_g
    }

    pub fn request_tare(&mut self) {
        self.tare_sum = 0;
        self.tare_seen = 0;
        self.tare_pending = true;
        self.tare_done = false;
    }

    pub fn tare_done(&self) -> bool {
        self.tare_done
    }

    pub fn tare_pending(&self) -> bool {
        self.tare_pending
    }

    /// No conversion within `signal_timeout_ms` of the last one (or of start).
    pub fn signal_lost(&self, now_ms: u64) -> bool {
        let since = self.last_ready_ms.unwrap_or(self.started_ms);
        now_ms.saturating_sub(since) > self.signal_timeout_ms
    }
}

#[cfg(feature = "hardware")]
pub use driver::Hx711Sensor;

#[cfg(feature = "hardware")]
mod driver {
    use std::sync::Arc;
    use std::time::Instant;

    use dispenser_traits::{Clock, GatewayError, WeightSensor};
    use rppal::gpio::{Gpio, InputPin, OutputPin};

    use super::{Hx711State, sign_extend_24};
    use crate::error::Result;

    /// Extra SCK pulses after the 24 data bits: 1 selects channel A, gain 128.
    const GAIN_PULSES: u8 = 1;

    pub struct Hx711Sensor {
        dt: InputPin,
        sck: OutputPin,
        state: Hx711State,
        clock: Arc<dyn Clock + Send + Sync>,
        epoch: Instant,
    }

    impl Hx711Sensor {
        pub fn new(
            gpio: &Gpio,
            dt_pin: u8,
            sck_pin: u8,
            state: Hx711State,
            clock: Arc<dyn Clock + Send + Sync>,
        ) -> Result<Self> {
            let dt = gpio.get(dt_pin)?.into_input();
            let mut sck = gpio.get(sck_pin)?.into_output();
            sck.set_low(); // clock idle low
            let epoch = clock.now();
            Ok(Self {
                dt,
                sck,
                state,
                clock,
                epoch,
            })
        }

        fn now_ms(&self) -> u64 {
            self.clock.ms_since(self.epoch)
        }

        /// Clock out one conversion. Only valid once DT is low.
        fn shift_in(&mut self) -> i32 {
            let mut value: u32 = 0;
            for _ in 0..24 {
                self.sck.set_high();
                std::hint::spin_loop();
                value = (value << 1) | u32::from(self.dt.is_high());
                self.sck.set_low();
                std::hint::spin_loop();
            }
            for _ in 0..GAIN_PULSES {
                self.sck.set_high();
                std::hint::spin_loop();
                self.sck.set_low();
                std::hint::spin_loop();
            }
            sign_extend_24(value)
        }
    }

    impl WeightSensor for Hx711Sensor {
        fn begin_acquisition(&mut self) -> std::result::Result<(), GatewayError> {
            let now = self.now_ms();
            self.state.start(now);
            // Power-up: SCK low takes the chip out of power-down.
            self.sck.set_low();
            tracing::info!("hx711 acquisition started");
            Ok(())
        }

        fn poll_new_reading(&mut self) -> std::result::Result<bool, GatewayError> {
            if self.dt.is_high() {
                return Ok(false);
            }
            let raw = self.shift_in();
            let now = self.now_ms();
            self.state.accept(raw, now);
            tracing::trace!(raw, grams = self.state.latest_g(), "hx711 sample");
            Ok(true)
        }

        fn current_reading(&self) -> f32 {
            self.state.latest_g()
        }

        fn request_tare(&mut self) -> std::result::Result<(), GatewayError> {
            self.state.request_tare();
            Ok(())
        }

        fn tare_complete(&mut self) -> bool {
            self.state.tare_done()
        }

        fn tare_timed_out(&self) -> bool {
            self.state.tare_pending()
        }

        fn signal_timed_out(&self) -> bool {
            self.state.signal_lost(self.now_ms())
        }
    }
}
