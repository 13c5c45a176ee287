//! Builder for the boxed `Dispenser` and the generic `build_dispenser` constructor.
//!
//! Both paths share `validate_and_build`, so a configuration accepted by one
//! is accepted by the other.

use std::sync::Arc;

use dispenser_traits::clock::{Clock, MonotonicClock};
use dispenser_traits::{Actuator, CharDisplay, Keypad, WeightSensor};

use crate::config::{ControlCfg, TimingCfg};
use crate::core::DispenserCore;
use crate::error::{BuildError, Result};

/// Dynamic (boxed) controller used by the CLI, where the gateways are picked at runtime.
pub type Dispenser = DispenserCore<
    Box<dyn WeightSensor>,
    Box<dyn Actuator>,
    Box<dyn Keypad>,
    Box<dyn CharDisplay>,
>;

/// Generic, statically-dispatched alias using the unified core.
pub type DispenserG<S, A, K, D> = DispenserCore<S, A, K, D>;

impl Dispenser {
    /// Start building a Dispenser.
    pub fn builder() -> DispenserBuilder {
        DispenserBuilder::default()
    }
}

fn invalid(msg: &'static str) -> eyre::Report {
    eyre::Report::new(BuildError::InvalidConfig(msg))
}

fn non_negative(v: f32) -> bool {
    v.is_finite() && v >= 0.0
}

/// Validate configuration and construct a `DispenserCore`.
///
/// This is the single source of truth for validation and construction,
/// used by both `DispenserBuilder::try_build()` and `build_dispenser()`.
fn validate_and_build<S, A, K, D>(
    sensor: S,
    actuator: A,
    keypad: K,
    display: D,
    control: ControlCfg,
    timing: TimingCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<DispenserCore<S, A, K, D>>
where
    S: WeightSensor,
    A: Actuator,
    K: Keypad,
    D: CharDisplay,
{
    // ── Validation ───────────────────────────────────────────────────────────
    if !non_negative(control.fine_force_max_g) {
        return Err(invalid("fine_force_max_g must be finite and >= 0"));
    }
    if !non_negative(control.fine_band_g) {
        return Err(invalid("fine_band_g must be finite and >= 0"));
    }
    if !non_negative(control.near_target_g) {
        return Err(invalid("near_target_g must be finite and >= 0"));
    }
    if control.near_target_g > control.fine_band_g {
        return Err(invalid("near_target_g must be <= fine_band_g"));
    }
    if control.near_pulse_on_ms == 0 || control.far_pulse_on_ms == 0 {
        return Err(invalid("pulse on-widths must be >= 1 ms"));
    }
    if control.pulse_off_ms == 0 {
        return Err(invalid("pulse_off_ms must be >= 1"));
    }
    if timing.sample_interval_ms == 0 {
        return Err(invalid("sample_interval_ms must be >= 1"));
    }
    if timing.display_interval_ms == 0 {
        return Err(invalid("display_interval_ms must be >= 1"));
    }
    if timing.tare_timeout_ms == 0 {
        return Err(invalid("tare_timeout_ms must be >= 1"));
    }

    let clock = clock.unwrap_or_else(|| Arc::new(MonotonicClock::new()));
    Ok(DispenserCore::from_parts(
        sensor, actuator, keypad, display, control, timing, clock,
    ))
}

/// Builder for `Dispenser`. All gateways are required; config defaults apply.
#[derive(Default)]
pub struct DispenserBuilder {
    sensor: Option<Box<dyn WeightSensor>>,
    actuator: Option<Box<dyn Actuator>>,
    keypad: Option<Box<dyn Keypad>>,
    display: Option<Box<dyn CharDisplay>>,
    control: Option<ControlCfg>,
    timing: Option<TimingCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl core::fmt::Debug for DispenserBuilder {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispenserBuilder")
            .field("sensor", &self.sensor.is_some())
            .field("actuator", &self.actuator.is_some())
            .field("keypad", &self.keypad.is_some())
            .field("display", &self.display.is_some())
            .field("control", &self.control)
            .field("timing", &self.timing)
            .finish_non_exhaustive()
    }
}

impl DispenserBuilder {
    pub fn with_sensor(mut self, sensor: impl WeightSensor + 'static) -> Self {
        self.sensor = Some(Box::new(sensor));
        self
    }
    pub fn with_actuator(mut self, actuator: impl Actuator + 'static) -> Self {
        self.actuator = Some(Box::new(actuator));
        self
    }
    pub fn with_keypad(mut self, keypad: impl Keypad + 'static) -> Self {
        self.keypad = Some(Box::new(keypad));
        self
    }
    pub fn with_display(mut self, display: impl CharDisplay + 'static) -> Self {
        self.display = Some(Box::new(display));
        self
    }
    pub fn with_control(mut self, control: ControlCfg) -> Self {
        self.control = Some(control);
        self
    }
    pub fn with_timing(mut self, timing: TimingCfg) -> Self {
        self.timing = Some(timing);
        self
    }
    /// Provide a custom clock implementation; defaults to `MonotonicClock` when not provided.
    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Fallible build; returns a `BuildError` for the first missing piece or bad value.
    pub fn try_build(self) -> Result<Dispenser> {
        let sensor = self
            .sensor
            .ok_or_else(|| eyre::Report::new(BuildError::MissingSensor))?;
        let actuator = self
            .actuator
            .ok_or_else(|| eyre::Report::new(BuildError::MissingActuator))?;
        let keypad = self
            .keypad
            .ok_or_else(|| eyre::Report::new(BuildError::MissingKeypad))?;
        let display = self
            .display
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDisplay))?;

        validate_and_build(
            sensor,
            actuator,
            keypad,
            display,
            self.control.unwrap_or_default(),
            self.timing.unwrap_or_default(),
            self.clock,
        )
    }
}

/// Build a generic, statically-dispatched `DispenserG` from concrete gateways.
pub fn build_dispenser<S, A, K, D>(
    sensor: S,
    actuator: A,
    keypad: K,
    display: D,
    control: ControlCfg,
    timing: TimingCfg,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
) -> Result<DispenserG<S, A, K, D>>
where
    S: WeightSensor,
    A: Actuator,
    K: Keypad,
    D: CharDisplay,
{
    validate_and_build(sensor, actuator, keypad, display, control, timing, clock)
}
