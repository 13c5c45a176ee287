#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema for the dispenser.
//!
//! - `Config` and sub-structs are deserialized from TOML and validated.
//! - Every section except `[pins]` is optional and falls back to the
//!   factory calibration of the device.
use serde::Deserialize;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Pins {
    pub hx711_dt: u8,
    pub hx711_sck: u8,
    /// H-bridge input driving the motor forward
    pub motor_fwd: u8,
    /// H-bridge input driving the motor in reverse
    pub motor_rev: u8,
    pub motor_en: Option<u8>,
    /// Keypad row outputs (4 rows)
    #[serde(default)]
    pub keypad_rows: Vec<u8>,
    /// Keypad column inputs (3 or 4 columns)
    #[serde(default)]
    pub keypad_cols: Vec<u8>,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SensorCfg {
    /// Raw counts per gram
    pub calibration_factor: f32,
    /// Conversions averaged into a tare baseline
    pub tare_samples: u16,
    /// Flag a signal timeout if no conversion arrives within this window (ms)
    pub signal_timeout_ms: u64,
}

impl Default for SensorCfg {
    fn default() -> Self {
        Self {
            calibration_factor: 696.0,
            tare_samples: 16,
            signal_timeout_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MotorDirection {
    #[default]
    Forward,
    Reverse,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct ControlCfg {
    /// Targets at or below this mass use pulsed drive from the start
    pub fine_force_max_g: f32,
    /// Switch from full power to pulsed drive within this distance of target
    pub fine_band_g: f32,
    /// Use the short pulse within this distance of target
    pub near_target_g: f32,
    pub near_pulse_on_ms: u64,
    pub far_pulse_on_ms: u64,
    pub pulse_off_ms: u64,
    pub direction: MotorDirection,
}

impl Default for ControlCfg {
    fn default() -> Self {
        Self {
            fine_force_max_g: 600.0,
            fine_band_g: 500.0,
            near_target_g: 200.0,
            near_pulse_on_ms: 20,
            far_pulse_on_ms: 80,
            pulse_off_ms: 200,
            direction: MotorDirection::Forward,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TimingCfg {
    pub sample_interval_ms: u64,
    pub display_interval_ms: u64,
    pub tare_timeout_ms: u64,
    pub finished_dwell_ms: u64,
    /// Sleep between loop iterations (0 = spin)
    pub loop_period_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            sample_interval_ms: 200,
            display_interval_ms: 500,
            tare_timeout_ms: 10_000,
            finished_dwell_ms: 5_000,
            loop_period_ms: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RunnerCfg {
    /// Give up after this many consecutive ticks fail with a gateway error
    pub max_consecutive_errors: u32,
}

impl Default for RunnerCfg {
    fn default() -> Self {
        Self {
            max_consecutive_errors: 5,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SimulationCfg {
    /// Material flow onto the scale while the motor is enabled (g/s)
    pub flow_rate_gps: f32,
    /// Time the simulated front end needs to finish a tare
    pub tare_latency_ms: u64,
    /// Conversion rate of the simulated front end
    pub sample_rate_hz: u32,
    /// Never report tare completion
    pub fail_tare: bool,
}

impl Default for SimulationCfg {
    fn default() -> Self {
        Self {
            flow_rate_gps: 50.0,
            tare_latency_ms: 1200,
            sample_rate_hz: 10,
            fail_tare: false,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub pins: Pins,
    #[serde(default)]
    pub sensor: SensorCfg,
    #[serde(default)]
    pub control: ControlCfg,
    #[serde(default)]
    pub timing: TimingCfg,
    #[serde(default)]
    pub runner: RunnerCfg,
    #[serde(default)]
    pub simulation: SimulationCfg,
    #[serde(default)]
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

/// Read, parse and validate a config file.
pub fn load_file(path: &Path) -> eyre::Result<Config> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("read config {:?}: {}", path, e))?;
    let cfg = load_toml(&text).map_err(|e| eyre::eyre!("parse config {:?}: {}", path, e))?;
    cfg.validate()
        .map_err(|e| e.wrap_err(format!("invalid config {path:?}")))?;
    Ok(cfg)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Pins
        if !self.pins.keypad_rows.is_empty() || !self.pins.keypad_cols.is_empty() {
            if self.pins.keypad_rows.len() != 4 {
                eyre::bail!("pins.keypad_rows must list exactly 4 pins");
            }
            if !(3..=4).contains(&self.pins.keypad_cols.len()) {
                eyre::bail!("pins.keypad_cols must list 3 or 4 pins");
            }
        }
        if self.pins.motor_fwd == self.pins.motor_rev {
            eyre::bail!("pins.motor_fwd and pins.motor_rev must differ");
        }

        // Sensor
        if !self.sensor.calibration_factor.is_finite() || self.sensor.calibration_factor == 0.0 {
            eyre::bail!("sensor.calibration_factor must be finite and non-zero");
        }
        if self.sensor.tare_samples == 0 {
            eyre::bail!("sensor.tare_samples must be >= 1");
        }
        if self.sensor.signal_timeout_ms == 0 {
            eyre::bail!("sensor.signal_timeout_ms must be >= 1");
        }

        // Control
        for (name, v) in [
            ("fine_force_max_g", self.control.fine_force_max_g),
            ("fine_band_g", self.control.fine_band_g),
            ("near_target_g", self.control.near_target_g),
        ] {
            if !v.is_finite() || v < 0.0 {
                eyre::bail!("control.{name} must be finite and >= 0");
            }
        }
        if self.control.near_target_g > self.control.fine_band_g {
            eyre::bail!("control.near_target_g must be <= control.fine_band_g");
        }
        if self.control.near_pulse_on_ms == 0 || self.control.far_pulse_on_ms == 0 {
            eyre::bail!("control pulse on-widths must be >= 1 ms");
        }
        if self.control.pulse_off_ms == 0 {
            eyre::bail!("control.pulse_off_ms must be >= 1");
        }

        // Timing
        if self.timing.sample_interval_ms == 0 {
            eyre::bail!("timing.sample_interval_ms must be >= 1");
        }
        if self.timing.display_interval_ms == 0 {
            eyre::bail!("timing.display_interval_ms must be >= 1");
        }
        if self.timing.tare_timeout_ms == 0 {
            eyre::bail!("timing.tare_timeout_ms must be >= 1");
        }
        if self.timing.finished_dwell_ms > 10 * 60 * 1000 {
            eyre::bail!("timing.finished_dwell_ms is unreasonably large (>10min)");
        }
        if self.timing.loop_period_ms > 1000 {
            eyre::bail!("timing.loop_period_ms must be <= 1000");
        }

        // Runner
        if self.runner.max_consecutive_errors == 0 {
            eyre::bail!("runner.max_consecutive_errors must be >= 1");
        }

        // Simulation
        if !(self.simulation.flow_rate_gps.is_finite() && self.simulation.flow_rate_gps > 0.0) {
            eyre::bail!("simulation.flow_rate_gps must be > 0");
        }
        if self.simulation.sample_rate_hz == 0 {
            eyre::bail!("simulation.sample_rate_hz must be > 0");
        }

        // Logging
        if let Some(rot) = self.logging.rotation.as_deref()
            && !matches!(rot, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly");
        }

        Ok(())
    }
}
