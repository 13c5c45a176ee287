#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Device gateways for the dispenser.
//!
//! Without features this crate offers the simulated plant (`sim`) plus the
//! GPIO-free parts of the drivers. The `hardware` feature adds the
//! Raspberry Pi drivers built on `rppal`.

pub mod error;
pub mod hx711;
pub mod keypad;
pub mod motor;
pub mod sim;

pub use sim::{SimConfig, SimulatedActuator, SimulatedPlant, SimulatedScale};

#[cfg(feature = "hardware")]
pub mod hardware {
    //! Real device bring-up.

    use std::sync::Arc;

    use dispenser_traits::Clock;
    use rppal::gpio::Gpio;

    pub use crate::hx711::{Hx711Sensor, Hx711State};
    pub use crate::keypad::MatrixKeypad;
    pub use crate::motor::HBridgeMotor;

    use crate::error::Result;

    /// GPIO assignment for the whole device.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct PinMap {
        pub hx711_dt: u8,
        pub hx711_sck: u8,
        pub motor_fwd: u8,
        pub motor_rev: u8,
        pub motor_en: Option<u8>,
        pub keypad_rows: Vec<u8>,
        pub keypad_cols: Vec<u8>,
    }

    /// HX711 calibration and watchdog settings.
    #[derive(Debug, Clone, Copy, PartialEq)]
    pub struct SensorSettings {
        pub counts_per_gram: f32,
        pub tare_samples: u16,
        pub signal_timeout_ms: u64,
    }

    pub struct Gateways {
        pub sensor: Hx711Sensor,
        pub motor: HBridgeMotor,
        /// Absent when no keypad pins are configured.
        pub keypad: Option<MatrixKeypad>,
    }

    /// Claim every configured pin. The motor is left braked.
    pub fn open(
        pins: &PinMap,
        sensor: SensorSettings,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Result<Gateways> {
        let gpio = Gpio::new()?;
        let state = Hx711State::new(
            sensor.counts_per_gram,
            sensor.tare_samples,
            sensor.signal_timeout_ms,
        );
        let sensor = Hx711Sensor::new(&gpio, pins.hx711_dt, pins.hx711_sck, state, clock)?;
        let motor = HBridgeMotor::new(&gpio, pins.motor_fwd, pins.motor_rev, pins.motor_en)?;
        let keypad = if pins.keypad_rows.is_empty() {
            None
        } else {
            Some(MatrixKeypad::new(&gpio, &pins.keypad_rows, &pins.keypad_cols)?)
        };
        tracing::info!(keypad = keypad.is_some(), "gpio gateways opened");
        Ok(Gateways {
            sensor,
            motor,
            keypad,
        })
    }
}
