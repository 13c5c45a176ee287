//! `From` implementations bridging `dispenser_config` types to `dispenser_core` types.

use dispenser_config::MotorDirection;
use dispenser_traits::Direction;

use crate::config::{ControlCfg, TimingCfg};

// ── Direction ────────────────────────────────────────────────────────────────

const fn direction(d: MotorDirection) -> Direction {
    match d {
        MotorDirection::Forward => Direction::Forward,
        MotorDirection::Reverse => Direction::Reverse,
    }
}

// ── ControlCfg ───────────────────────────────────────────────────────────────

impl From<&dispenser_config::ControlCfg> for ControlCfg {
    fn from(c: &dispenser_config::ControlCfg) -> Self {
        Self {
            fine_force_max_g: c.fine_force_max_g,
            fine_band_g: c.fine_band_g,
            near_target_g: c.near_target_g,
            near_pulse_on_ms: c.near_pulse_on_ms,
            far_pulse_on_ms: c.far_pulse_on_ms,
            pulse_off_ms: c.pulse_off_ms,
            direction: direction(c.direction),
        }
    }
}

// ── TimingCfg ────────────────────────────────────────────────────────────────

impl From<&dispenser_config::TimingCfg> for TimingCfg {
    fn from(c: &dispenser_config::TimingCfg) -> Self {
        Self {
            sample_interval_ms: c.sample_interval_ms,
            display_interval_ms: c.display_interval_ms,
            tare_timeout_ms: c.tare_timeout_ms,
            finished_dwell_ms: c.finished_dwell_ms,
        }
    }
}
