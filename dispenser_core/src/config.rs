//! Configuration types for the dispensing controller.
//!
//! These are the runtime configuration structs used by `DispenserCore`.
//! They are separate from the TOML-deserialized config in `dispenser_config`.

use dispenser_traits::Direction;

/// Coarse/fine control thresholds and pulse timing.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlCfg {
    /// Targets at or below this many grams run pulsed from the first poll.
    pub fine_force_max_g: f32,
    /// Engage pulsed drive once `current > target - fine_band_g`.
    pub fine_band_g: f32,
    /// Use the short pulse once `current >= target - near_target_g`.
    pub near_target_g: f32,
    /// On-width of a pulse near the target (ms).
    pub near_pulse_on_ms: u64,
    /// On-width of a pulse before the near-target zone (ms).
    pub far_pulse_on_ms: u64,
    /// Off-width between pulses (ms).
    pub pulse_off_ms: u64,
    /// Motor direction used for dispensing.
    pub direction: Direction,
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
            direction: Direction::Forward,
        }
    }
}

/// Rate limits, the tare timeout and the completion dwell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimingCfg {
    /// Minimum spacing between sensor polls while dispensing (ms).
    pub sample_interval_ms: u64,
    /// Minimum spacing between progress redraws (ms).
    pub display_interval_ms: u64,
    /// The tare handshake fails once it has been pending longer than this (ms).
    pub tare_timeout_ms: u64,
    /// Time the completion screen stays up before the automatic reset (ms).
    pub finished_dwell_ms: u64,
}

impl Default for TimingCfg {
    fn default() -> Self {
        Self {
            sample_interval_ms: 200,
            display_interval_ms: 500,
            tare_timeout_ms: 10_000,
            finished_dwell_ms: 5_000,
        }
    }
}
