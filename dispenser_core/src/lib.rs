#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core dispensing logic (hardware-agnostic).
//!
//! This crate provides the hardware-independent dispensing controller. All
//! hardware interactions go through the gateway traits in `dispenser_traits`:
//! `WeightSensor`, `Actuator`, `Keypad` and `CharDisplay`.
//!
//! ## Architecture
//!
//! - **State machine**: Input → Zeroing → Dispensing → Finished → Input (`DispenserCore`)
//! - **Input**: six-character target entry with one decimal point (`input` module)
//! - **Taring**: resumable tare handshake with a timeout (`tare` module)
//! - **Control**: continuous drive far from target, pulsed drive near it (`pulse` module)
//! - **Configuration**: runtime thresholds and timings (`config` module)
//! - **Runner**: paced polling loop with an error budget (`runner` module)
//!
//! Every handler returns promptly; waits are timestamps compared against the
//! injected `Clock`, so tests drive whole cycles with a `ManualClock`.

pub mod builder;
pub mod config;
pub mod conversions;
pub mod core;
pub mod error;
pub mod hw_error;
pub mod input;
pub mod mocks;
pub mod pulse;
pub mod runner;
pub mod screen;
pub mod status;
pub mod tare;
pub mod util;

pub use builder::{Dispenser, DispenserBuilder, DispenserG, build_dispenser};
pub use config::{ControlCfg, TimingCfg};
pub use crate::core::DispenserCore;
pub use error::{BuildError, DispenserError, Result};
pub use input::{InputBuffer, Key, MAX_INPUT_LEN};
pub use pulse::{PulseDrive, PulseEdge, PulsePhase};
pub use runner::{RunParams, RunSummary};
pub use status::{CycleEvent, SystemState};
pub use tare::{TareHandshake, TareStatus};
