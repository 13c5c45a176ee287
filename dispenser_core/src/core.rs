//! The dispensing controller (`DispenserCore`).
//!
//! One `tick()` polls the handler for the current state exactly once and
//! returns without waiting: keypad entry in Input, the tare handshake in
//! Zeroing, sampling plus coarse/fine drive in Dispensing, and the completion
//! dwell in Finished.

use std::sync::Arc;
use std::time::Instant;

use dispenser_traits::clock::Clock;
use dispenser_traits::{Actuator, CharDisplay, Keypad, WeightSensor};
use eyre::WrapErr;

use crate::config::{ControlCfg, TimingCfg};
use crate::error::{DispenserError, Result};
use crate::hw_error::report;
use crate::input::{InputBuffer, Key};
use crate::pulse::{PulseDrive, PulseEdge, PulsePhase};
use crate::screen;
use crate::status::{CycleEvent, SystemState};
use crate::tare::{TareHandshake, TareStatus};
use crate::util::Every;

/// Controller generic over its four gateways. See `crate::Dispenser` for the
/// boxed variant.
pub struct DispenserCore<S, A, K, D>
where
    S: WeightSensor,
    A: Actuator,
    K: Keypad,
    D: CharDisplay,
{
    pub(crate) sensor: S,
    pub(crate) actuator: A,
    pub(crate) keypad: K,
    pub(crate) display: D,
    pub(crate) control: ControlCfg,
    pub(crate) timing: TimingCfg,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) epoch: Instant,

    pub(crate) state: SystemState,
    pub(crate) input: InputBuffer,
    pub(crate) target_g: Option<f32>,
    pub(crate) current_g: f32,
    pub(crate) fine_enabled: bool,
    pub(crate) tare: TareHandshake,
    pub(crate) pulse: PulseDrive,
    pub(crate) sample_gate: Every,
    pub(crate) display_gate: Every,
    pub(crate) finished_at_ms: Option<u64>,
    pub(crate) cycles: u64,
}

impl<S, A, K, D> core::fmt::Debug for DispenserCore<S, A, K, D>
where
    S: WeightSensor,
    A: Actuator,
    K: Keypad,
    D: CharDisplay,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DispenserCore")
            .field("state", &self.state)
            .field("target_g", &self.target_g)
            .field("current_g", &self.current_g)
            .field("fine_enabled", &self.fine_enabled)
            .field("entry", &self.input.as_str())
            .field("cycles", &self.cycles)
            .finish_non_exhaustive()
    }
}

impl<S, A, K, D> DispenserCore<S, A, K, D>
where
    S: WeightSensor,
    A: Actuator,
    K: Keypad,
    D: CharDisplay,
{
    pub(crate) fn from_parts(
        sensor: S,
        actuator: A,
        keypad: K,
        display: D,
        control: ControlCfg,
        timing: TimingCfg,
        clock: Arc<dyn Clock + Send + Sync>,
    ) -> Self {
        let epoch = clock.now();
        let pulse = PulseDrive::new(control.pulse_off_ms);
        let sample_gate = Every::new(timing.sample_interval_ms);
        let display_gate = Every::new(timing.display_interval_ms);
        Self {
            sensor,
            actuator,
            keypad,
            display,
            control,
            timing,
            clock,
            epoch,
            state: SystemState::Input,
            input: InputBuffer::new(),
            target_g: None,
            current_g: 0.0,
            fine_enabled: false,
            tare: TareHandshake::new(),
            pulse,
            sample_gate,
            display_gate,
            finished_at_ms: None,
            cycles: 0,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────────────

    pub fn state(&self) -> SystemState {
        self.state
    }

    /// Target of the running cycle, if one has been accepted.
    pub fn target_g(&self) -> Option<f32> {
        self.target_g
    }

    /// Latest absolute reading taken while dispensing.
    pub fn current_g(&self) -> f32 {
        self.current_g
    }

    pub fn fine_enabled(&self) -> bool {
        self.fine_enabled
    }

    /// Characters keyed in so far.
    pub fn entry(&self) -> &str {
        self.input.as_str()
    }

    /// Cycles that reached the target since construction.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    pub fn pulse_phase(&self) -> PulsePhase {
        self.pulse.phase()
    }

    pub fn control_cfg(&self) -> &ControlCfg {
        &self.control
    }

    pub fn timing_cfg(&self) -> &TimingCfg {
        &self.timing
    }

    /// Milliseconds on the controller's clock since construction.
    pub fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    pub fn sensor_mut(&mut self) -> &mut S {
        &mut self.sensor
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    pub fn keypad_mut(&mut self) -> &mut K {
        &mut self.keypad
    }

    // ── Lifecycle ────────────────────────────────────────────────────────────

    /// Draw the initial prompt. Call once before the first `tick()`.
    pub fn begin(&mut self) -> Result<()> {
        tracing::info!(state = %self.state, "controller ready");
        screen::prompt(&mut self.display, self.input.as_str())
    }

    /// Poll the handler for the current state once, then flush the display.
    pub fn tick(&mut self) -> Result<Option<CycleEvent>> {
        let now = self.now_ms();
        let event = match self.state {
            SystemState::Input => self.handle_input(),
            SystemState::Zeroing => self.handle_zeroing(now),
            SystemState::Dispensing => self.handle_dispensing(now),
            SystemState::Finished => self.handle_finished(now),
        }?;
        self.display
            .flush()
            .map_err(report)
            .wrap_err("flush display")?;
        Ok(event)
    }

    /// Return to Input with every per-cycle value cleared and the actuator off.
    ///
    /// State is cleared before any gateway call so a failing actuator or
    /// display still leaves the controller in Input.
    pub fn full_reset(&mut self) -> Result<()> {
        self.state = SystemState::Input;
        self.target_g = None;
        self.current_g = 0.0;
        self.input.clear();
        self.fine_enabled = false;
        self.tare.reset();
        self.pulse.reset();
        self.sample_gate.reset();
        self.display_gate.reset();
        self.finished_at_ms = None;

        let stopped = self.disable_actuator();
        let drawn = screen::prompt(&mut self.display, "");
        tracing::info!("reset to input");
        stopped.and(drawn)
    }

    /// Switch the actuator off.
    pub fn disable_actuator(&mut self) -> Result<()> {
        self.actuator
            .disable()
            .map_err(report)
            .wrap_err("disable actuator")
    }

    // ── State handlers ───────────────────────────────────────────────────────

    fn handle_input(&mut self) -> Result<Option<CycleEvent>> {
        let Some(c) = self
            .keypad
            .poll_key()
            .map_err(report)
            .wrap_err("poll keypad")?
        else {
            return Ok(None);
        };

        match Key::from(c) {
            Key::Enter if self.input.is_empty() => Ok(None),
            Key::Enter => {
                let Some(target_g) = self.input.parse_target() else {
                    tracing::warn!(entry = self.input.as_str(), "target rejected");
                    self.input.clear();
                    screen::prompt(&mut self.display, "")?;
                    return Ok(Some(CycleEvent::InputRejected));
                };
                self.input.clear();
                self.target_g = Some(target_g);
                self.state = SystemState::Zeroing;
                tracing::info!(target_g, "target accepted");
                screen::calibrating(&mut self.display)?;
                Ok(Some(CycleEvent::TargetAccepted { target_g }))
            }
            Key::Cancel => {
                self.input.clear();
                screen::prompt(&mut self.display, "")?;
                tracing::debug!("entry cancelled");
                Ok(Some(CycleEvent::InputCancelled))
            }
            key => {
                if self.input.push(key) {
                    screen::entry_field(&mut self.display, self.input.as_str())?;
                }
                Ok(None)
            }
        }
    }

    fn handle_zeroing(&mut self, now: u64) -> Result<Option<CycleEvent>> {
        match self
            .tare
            .poll(&mut self.sensor, now, self.timing.tare_timeout_ms)?
        {
            TareStatus::Started => {
                tracing::info!("tare requested");
                Ok(Some(CycleEvent::TareStarted))
            }
            TareStatus::Pending => Ok(None),
            TareStatus::Complete => {
                self.state = SystemState::Dispensing;
                self.sample_gate.reset();
                self.display_gate.reset();
                self.pulse.reset();
                if !self.fine_enabled {
                    self.actuator
                        .enable(self.control.direction)
                        .map_err(report)
                        .wrap_err("enable actuator")?;
                }
                tracing::info!(now_ms = now, "tare complete, dispensing");
                screen::dispensing(&mut self.display)?;
                Ok(Some(CycleEvent::TareComplete))
            }
            TareStatus::TimedOut {
                tare_timed_out,
                signal_timed_out,
            } => {
                let err = DispenserError::TareFailed {
                    tare_timed_out,
                    signal_timed_out,
                };
                tracing::warn!(tare_timed_out, signal_timed_out, error = %err, "tare handshake timed out");
                self.full_reset()?;
                Ok(Some(CycleEvent::TareFailed {
                    tare_timed_out,
                    signal_timed_out,
                }))
            }
        }
    }

    fn handle_dispensing(&mut self, now: u64) -> Result<Option<CycleEvent>> {
        let target = self.target_g.ok_or_else(|| {
            eyre::Report::new(DispenserError::State("dispensing without a target".into()))
        })?;

        if self.sample_gate.ready(now)
            && self
                .sensor
                .poll_new_reading()
                .map_err(report)
                .wrap_err("poll sensor")?
        {
            self.current_g = self.sensor.current_reading().abs();
        }

        if self.display_gate.ready(now) {
            screen::progress(&mut self.display, self.current_g, target)?;
        }

        if target <= self.control.fine_force_max_g && !self.fine_enabled {
            self.fine_enabled = true;
            tracing::debug!(target_g = target, "small target, pulsed drive forced");
        }

        if self.fine_enabled {
            let on_ms = if self.current_g >= target - self.control.near_target_g {
                self.control.near_pulse_on_ms
            } else {
                self.control.far_pulse_on_ms
            };
            if let Some(edge) = self.pulse.update(now, on_ms) {
                self.apply_edge(edge)?;
            }
        }

        if self.current_g >= target {
            self.disable_actuator()?;
            self.state = SystemState::Finished;
            self.finished_at_ms = Some(now);
            self.cycles += 1;
            let final_g = self.current_g;
            tracing::info!(final_g, target_g = target, "target reached");
            screen::completed(&mut self.display, final_g)?;
            return Ok(Some(CycleEvent::Completed { final_g }));
        }

        if !self.fine_enabled && self.current_g > target - self.control.fine_band_g {
            self.fine_enabled = true;
            tracing::debug!(current_g = self.current_g, "pulsed drive engaged");
            return Ok(Some(CycleEvent::FineEngaged {
                current_g: self.current_g,
            }));
        }

        Ok(None)
    }

    fn handle_finished(&mut self, now: u64) -> Result<Option<CycleEvent>> {
        let since = self.finished_at_ms.unwrap_or(now);
        if now.saturating_sub(since) < self.timing.finished_dwell_ms {
            return Ok(None);
        }
        self.full_reset()?;
        Ok(Some(CycleEvent::ResetToInput))
    }

    fn apply_edge(&mut self, edge: PulseEdge) -> Result<()> {
        tracing::trace!(?edge, "pulse edge");
        match edge {
            PulseEdge::SwitchOn => self
                .actuator
                .enable(self.control.direction)
                .map_err(report)
                .wrap_err("pulse on"),
            PulseEdge::SwitchOff => self
                .actuator
                .disable()
                .map_err(report)
                .wrap_err("pulse off"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mocks::ScriptedKeypad;
    use dispenser_traits::{Direction, GatewayError, ManualClock};
    use std::cell::RefCell;
    use std::rc::Rc;

    /// Sensor whose reading and tare outcome the test sets directly.
    #[derive(Clone, Default)]
    struct Knobs(Rc<RefCell<KnobState>>);

    #[derive(Default)]
    struct KnobState {
        reading: f32,
        tare_done: bool,
        tare_requests: u32,
        enabled: Option<Direction>,
        enables: u32,
        disables: u32,
        fail_disable: bool,
    }

    struct KnobSensor(Knobs);
    struct KnobActuator(Knobs);

    impl WeightSensor for KnobSensor {
        fn begin_acquisition(&mut self) -> std::result::Result<(), GatewayError> {
            Ok(())
        }
        fn poll_new_reading(&mut self) -> std::result::Result<bool, GatewayError> {
            Ok(true)
        }
        fn current_reading(&self) -> f32 {
            self.0.0.borrow().reading
        }
        fn request_tare(&mut self) -> std::result::Result<(), GatewayError> {
            self.0.0.borrow_mut().tare_requests += 1;
            Ok(())
        }
        fn tare_complete(&mut self) -> bool {
            self.0.0.borrow().tare_done
        }
        fn tare_timed_out(&self) -> bool {
            true
        }
        fn signal_timed_out(&self) -> bool {
            false
        }
    }

    impl Actuator for KnobActuator {
        fn enable(&mut self, direction: Direction) -> std::result::Result<(), GatewayError> {
            let mut s = self.0.0.borrow_mut();
            s.enabled = Some(direction);
            s.enables += 1;
            Ok(())
        }
        fn disable(&mut self) -> std::result::Result<(), GatewayError> {
            let mut s = self.0.0.borrow_mut();
            if s.fail_disable {
                return Err("h-bridge fault".into());
            }
            s.enabled = None;
            s.disables += 1;
            Ok(())
        }
    }

    struct NullDisplay;
    impl CharDisplay for NullDisplay {
        fn clear_and_show(&mut self, _: &str) -> std::result::Result<(), GatewayError> {
            Ok(())
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

    type Rig = DispenserCore<KnobSensor, KnobActuator, ScriptedKeypad, NullDisplay>;

    fn rig(keys: &str) -> (Rig, Knobs, ManualClock) {
        let knobs = Knobs::default();
        let clock = ManualClock::new();
        let core = DispenserCore::from_parts(
            KnobSensor(knobs.clone()),
            KnobActuator(knobs.clone()),
            ScriptedKeypad::from(keys),
            NullDisplay,
            ControlCfg::default(),
            TimingCfg::default(),
            Arc::new(clock.clone()),
        );
        (core, knobs, clock)
    }

    fn drain_keys(core: &mut Rig) {
        while core.state() == SystemState::Input && core.keypad.remaining() > 0 {
            core.tick().unwrap();
        }
    }

    #[test]
    fn hash_with_valid_entry_moves_to_zeroing() {
        let (mut core, _, _) = rig("750#");
        drain_keys(&mut core);
        assert_eq!(core.state(), SystemState::Zeroing);
        assert_eq!(core.target_g(), Some(750.0));
        assert_eq!(core.entry(), "");
    }

    #[test]
    fn zero_entry_is_rejected_and_stays_in_input() {
        let (mut core, _, _) = rig("0#");
        core.tick().unwrap();
        assert_eq!(core.tick().unwrap(), Some(CycleEvent::InputRejected));
        assert_eq!(core.state(), SystemState::Input);
        assert_eq!(core.target_g(), None);
    }

    #[test]
    fn empty_hash_is_a_no_op() {
        let (mut core, _, _) = rig("#");
        assert_eq!(core.tick().unwrap(), None);
        assert_eq!(core.state(), SystemState::Input);
    }

    #[test]
    fn fine_mode_is_sticky_until_reset() {
        let (mut core, knobs, clock) = rig("2000#");
        drain_keys(&mut core);
        knobs.0.borrow_mut().tare_done = true;
        core.tick().unwrap();
        core.tick().unwrap();
        assert_eq!(core.state(), SystemState::Dispensing);
        assert!(!core.fine_enabled());

        knobs.0.borrow_mut().reading = 1_600.0;
        clock.advance_ms(200);
        assert!(matches!(
            core.tick().unwrap(),
            Some(CycleEvent::FineEngaged { .. })
        ));

        // A lower reading (e.g. a bump) must not return to coarse.
        knobs.0.borrow_mut().reading = 100.0;
        clock.advance_ms(200);
        core.tick().unwrap();
        assert!(core.fine_enabled());
    }

    #[test]
    fn completion_disables_and_dwell_resets() {
        let (mut core, knobs, clock) = rig("800#");
        drain_keys(&mut core);
        knobs.0.borrow_mut().tare_done = true;
        core.tick().unwrap();
        core.tick().unwrap();
        knobs.0.borrow_mut().reading = -800.5;
        clock.advance_ms(200);
        assert_eq!(
            core.tick().unwrap(),
            Some(CycleEvent::Completed { final_g: 800.5 })
        );
        assert_eq!(core.state(), SystemState::Finished);
        assert!(knobs.0.borrow().enabled.is_none());

        clock.advance_ms(4_999);
        assert_eq!(core.tick().unwrap(), None);
        clock.advance_ms(1);
        assert_eq!(core.tick().unwrap(), Some(CycleEvent::ResetToInput));
        assert_eq!(core.state(), SystemState::Input);
        assert_eq!(core.current_g(), 0.0);
        assert!(!core.fine_enabled());
    }

    #[test]
    fn reset_clears_state_even_if_actuator_fails() {
        let (mut core, knobs, _) = rig("900#");
        drain_keys(&mut core);
        knobs.0.borrow_mut().fail_disable = true;
        assert!(core.full_reset().is_err());
        assert_eq!(core.state(), SystemState::Input);
        assert_eq!(core.target_g(), None);
    }

    #[test]
    fn tare_timeout_resets_and_reports_flags() {
        let (mut core, knobs, clock) = rig("900#");
        drain_keys(&mut core);
        assert_eq!(core.tick().unwrap(), Some(CycleEvent::TareStarted));
        clock.advance_ms(10_001);
        assert_eq!(
            core.tick().unwrap(),
            Some(CycleEvent::TareFailed {
                tare_timed_out: true,
                signal_timed_out: false
            })
        );
        assert_eq!(core.state(), SystemState::Input);
        assert_eq!(core.target_g(), None);
        assert_eq!(knobs.0.borrow().tare_requests, 1);
    }
}
