//! Gateway assembly: the simulated plant by default, GPIO with `--features hardware`.

use std::sync::Arc;

use dispenser_config::Config;
use dispenser_traits::{Actuator, Clock, Keypad, WeightSensor};
use eyre::Result;

/// Overrides the simulated flow rate (g/s).
pub const ENV_SIM_RATE: &str = "DISPENSER_SIM_RATE_GPS";
/// Any value other than `0`/`false` makes the simulated tare never finish.
pub const ENV_SIM_FAIL_TARE: &str = "DISPENSER_SIM_FAIL_TARE";

pub struct Backend {
    pub name: &'static str,
    pub sensor: Box<dyn WeightSensor>,
    pub actuator: Box<dyn Actuator>,
    /// Device keypad, if the backend has one.
    pub keypad: Option<Box<dyn Keypad>>,
}

impl core::fmt::Debug for Backend {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Backend")
            .field("name", &self.name)
            .field("keypad", &self.keypad.is_some())
            .finish_non_exhaustive()
    }
}

pub const fn name() -> &'static str {
    if cfg!(all(feature = "hardware", target_os = "linux")) {
        "hardware"
    } else {
        "sim"
    }
}

/// Build the simulation settings from `[simulation]` plus the test env overrides.
#[cfg_attr(all(feature = "hardware", target_os = "linux"), allow(dead_code))]
pub fn sim_config(cfg: &Config) -> Result<dispenser_hardware::SimConfig> {
    let mut sim = dispenser_hardware::SimConfig {
        flow_rate_gps: cfg.simulation.flow_rate_gps,
        tare_latency_ms: cfg.simulation.tare_latency_ms,
        sample_rate_hz: cfg.simulation.sample_rate_hz,
        fail_tare: cfg.simulation.fail_tare,
    };
    if let Ok(v) = std::env::var(ENV_SIM_RATE) {
        sim.flow_rate_gps = v
            .trim()
            .parse()
            .map_err(|e| eyre::eyre!("{ENV_SIM_RATE}={v:?}: {e}"))?;
    }
    if let Ok(v) = std::env::var(ENV_SIM_FAIL_TARE) {
        sim.fail_tare = !matches!(v.trim(), "" | "0" | "false");
    }
    Ok(sim)
}

#[cfg(not(all(feature = "hardware", target_os = "linux")))]
pub fn open(cfg: &Config, clock: Arc<dyn Clock + Send + Sync>) -> Result<Backend> {
    let sim = sim_config(cfg)?;
    tracing::info!(
        flow_rate_gps = sim.flow_rate_gps,
        tare_latency_ms = sim.tare_latency_ms,
        fail_tare = sim.fail_tare,
        "using simulated plant"
    );
    let plant = dispenser_hardware::SimulatedPlant::new(sim, clock);
    Ok(Backend {
        name: name(),
        sensor: Box::new(plant.scale()),
        actuator: Box::new(plant.actuator()),
        keypad: None,
    })
}

#[cfg(all(feature = "hardware", target_os = "linux"))]
pub fn open(cfg: &Config, clock: Arc<dyn Clock + Send + Sync>) -> Result<Backend> {
    use dispenser_hardware::hardware::{self, PinMap, SensorSettings};
    use eyre::WrapErr;

    let pins = PinMap {
        hx711_dt: cfg.pins.hx711_dt,
        hx711_sck: cfg.pins.hx711_sck,
        motor_fwd: cfg.pins.motor_fwd,
        motor_rev: cfg.pins.motor_rev,
        motor_en: cfg.pins.motor_en,
        keypad_rows: cfg.pins.keypad_rows.clone(),
        keypad_cols: cfg.pins.keypad_cols.clone(),
    };
    let settings = SensorSettings {
        counts_per_gram: cfg.sensor.calibration_factor,
        tare_samples: cfg.sensor.tare_samples,
        signal_timeout_ms: cfg.sensor.signal_timeout_ms,
    };
    let gw = hardware::open(&pins, settings, clock).wrap_err("open gpio gateways")?;
    Ok(Backend {
        name: name(),
        sensor: Box::new(gw.sensor),
        actuator: Box::new(gw.motor),
        keypad: gw.keypad.map(|k| Box::new(k) as Box<dyn Keypad>),
    })
}
