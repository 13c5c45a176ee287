//! Simulated hopper and scale.
//!
//! `SimulatedPlant` models material flowing onto a load cell at a fixed rate
//! while the motor is enabled. The scale and actuator handles share one plant,
//! so whatever the controller does to the actuator shows up on the scale.
//! Time comes from the injected `Clock`; with a `ManualClock` a whole cycle
//! runs deterministically.

use std::cell::RefCell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Instant;

use dispenser_traits::{Actuator, Clock, Direction, GatewayError, WeightSensor};

/// Plant parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct SimConfig {
    /// Grams per second delivered while the motor is on.
    pub flow_rate_gps: f32,
    /// Time from tare request to tare completion (ms).
    pub tare_latency_ms: u64,
    /// Conversions per second; readings are latched at this rate.
    pub sample_rate_hz: u32,
    /// Tare never completes; the scale reports a tare timeout instead.
    pub fail_tare: bool,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            flow_rate_gps: 50.0,
            tare_latency_ms: 1_200,
            sample_rate_hz: 10,
            fail_tare: false,
        }
    }
}

#[derive(Debug, Default)]
struct PlantState {
    mass_g: f32,
    tare_offset_g: f32,
    direction: Option<Direction>,
    last_integrated_ms: u64,
    on_time_ms: u64,
    enables: u32,
    acquiring: bool,
    tare_requested_at: Option<u64>,
    tare_done: bool,
    last_latch_ms: Option<u64>,
    latched_g: f32,
}

/// Shared simulation state. Cheap to clone; clones observe the same plant.
#[derive(Clone)]
pub struct SimulatedPlant {
    state: Rc<RefCell<PlantState>>,
    cfg: SimConfig,
    clock: Arc<dyn Clock + Send + Sync>,
    epoch: Instant,
}

impl core::fmt::Debug for SimulatedPlant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let st = self.state.borrow();
        f.debug_struct("SimulatedPlant")
            .field("cfg", &self.cfg)
            .field("mass_g", &st.mass_g)
            .field("running", &st.direction.is_some())
            .finish_non_exhaustive()
    }
}

impl SimulatedPlant {
    pub fn new(cfg: SimConfig, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        let epoch = clock.now();
        Self {
            state: Rc::new(RefCell::new(PlantState::default())),
            cfg,
            clock,
            epoch,
        }
    }

    pub fn config(&self) -> &SimConfig {
        &self.cfg
    }

    /// A sensor handle reading this plant.
    pub fn scale(&self) -> SimulatedScale {
        SimulatedScale {
            plant: self.clone(),
        }
    }

    /// An actuator handle driving this plant.
    pub fn actuator(&self) -> SimulatedActuator {
        SimulatedActuator {
            plant: self.clone(),
        }
    }

    /// Put material on the scale, e.g. a container the tare should remove.
    pub fn preload_g(&self, grams: f32) {
        self.state.borrow_mut().mass_g += grams;
    }

    /// Total material on the scale, tare ignored.
    pub fn mass_g(&self) -> f32 {
        let mut st = self.state.borrow_mut();
        self.integrate(&mut st);
        st.mass_g
    }

    /// Material delivered since the last completed tare.
    pub fn dispensed_g(&self) -> f32 {
        let mut st = self.state.borrow_mut();
        self.integrate(&mut st);
        st.mass_g - st.tare_offset_g
    }

    /// Accumulated motor on-time (ms).
    pub fn on_time_ms(&self) -> u64 {
        let mut st = self.state.borrow_mut();
        self.integrate(&mut st);
        st.on_time_ms
    }

    /// Number of off→on transitions.
    pub fn enable_count(&self) -> u32 {
        self.state.borrow().enables
    }

    pub fn is_running(&self) -> bool {
        self.state.borrow().direction.is_some()
    }

    fn now_ms(&self) -> u64 {
        self.clock.ms_since(self.epoch)
    }

    fn integrate(&self, st: &mut PlantState) {
        let now = self.now_ms();
        let dt = now.saturating_sub(st.last_integrated_ms);
        if st.direction.is_some() && dt > 0 {
            st.mass_g += self.cfg.flow_rate_gps * (dt as f32) / 1_000.0;
            st.on_time_ms += dt;
        }
        st.last_integrated_ms = now;
    }

    fn sample_period_ms(&self) -> u64 {
        (1_000 / u64::from(self.cfg.sample_rate_hz.max(1))).max(1)
    }
}

/// Load cell on a `SimulatedPlant`.
#[derive(Debug, Clone)]
pub struct SimulatedScale {
    plant: SimulatedPlant,
}

impl WeightSensor for SimulatedScale {
    fn begin_acquisition(&mut self) -> Result<(), GatewayError> {
        self.plant.state.borrow_mut().acquiring = true;
        tracing::info!(
            sample_rate_hz = self.plant.cfg.sample_rate_hz,
            "simulated scale acquiring"
        );
        Ok(())
    }

    fn poll_new_reading(&mut self) -> Result<bool, GatewayError> {
        let plant = &self.plant;
        let now = plant.now_ms();
        let mut st = plant.state.borrow_mut();
        if !st.acquiring {
            return Ok(false);
        }
        plant.integrate(&mut st);

        if let Some(since) = st.last_latch_ms
            && now.saturating_sub(since) < plant.sample_period_ms()
        {
            return Ok(false);
        }

        if let Some(requested) = st.tare_requested_at
            && !st.tare_done
            && !plant.cfg.fail_tare
            && now.saturating_sub(requested) >= plant.cfg.tare_latency_ms
        {
            st.tare_offset_g = st.mass_g;
            st.tare_done = true;
            st.tare_requested_at = None;
            tracing::debug!(offset_g = st.tare_offset_g, "simulated tare done");
        }

        st.latched_g = st.mass_g - st.tare_offset_g;
        st.last_latch_ms = Some(now);
        Ok(true)
    }

    fn current_reading(&self) -> f32 {
        self.plant.state.borrow().latched_g
    }

    fn request_tare(&mut self) -> Result<(), GatewayError> {
        let now = self.plant.now_ms();
        let mut st = self.plant.state.borrow_mut();
        st.tare_requested_at = Some(now);
        st.tare_done = false;
        Ok(())
    }

    fn tare_complete(&mut self) -> bool {
        self.plant.state.borrow().tare_done
    }

    fn tare_timed_out(&self) -> bool {
        let now = self.plant.now_ms();
        let st = self.plant.state.borrow();
        st.tare_requested_at
            .is_some_and(|t| now.saturating_sub(t) > self.plant.cfg.tare_latency_ms)
    }

    fn signal_timed_out(&self) -> bool {
        !self.plant.state.borrow().acquiring
    }
}

/// Motor on a `SimulatedPlant`. Either direction delivers material.
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    plant: SimulatedPlant,
}

impl Actuator for SimulatedActuator {
    fn enable(&mut self, direction: Direction) -> Result<(), GatewayError> {
        let mut st = self.plant.state.borrow_mut();
        self.plant.integrate(&mut st);
        if st.direction.is_none() {
            st.enables += 1;
            tracing::trace!(?direction, "simulated motor on");
        }
        st.direction = Some(direction);
        Ok(())
    }

    fn disable(&mut self) -> Result<(), GatewayError> {
        let mut st = self.plant.state.borrow_mut();
        self.plant.integrate(&mut st);
        if st.direction.take().is_some() {
            tracing::trace!("simulated motor off");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dispenser_traits::ManualClock;

    fn plant(cfg: SimConfig) -> (SimulatedPlant, ManualClock) {
        let clock = ManualClock::new();
        (SimulatedPlant::new(cfg, Arc::new(clock.clone())), clock)
    }

    #[test]
    fn flow_accumulates_only_while_enabled() {
        let (p, clock) = plant(SimConfig::default());
        let mut a = p.actuator();
        a.enable(Direction::Forward).unwrap();
        clock.advance_ms(1_000);
        a.disable().unwrap();
        clock.advance_ms(1_000);
        assert!((p.mass_g() - 50.0).abs() < 1e-3);
        assert_eq!(p.on_time_ms(), 1_000);
        assert_eq!(p.enable_count(), 1);
    }

    #[test]
    fn readings_are_latched_at_the_sample_rate() {
        let (p, clock) = plant(SimConfig::default());
        let mut s = p.scale();
        assert!(!s.poll_new_reading().unwrap());
        s.begin_acquisition().unwrap();
        assert!(s.poll_new_reading().unwrap());
        clock.advance_ms(99);
        assert!(!s.poll_new_reading().unwrap());
        clock.advance_ms(1);
        assert!(s.poll_new_reading().unwrap());
    }

    #[test]
    fn tare_zeroes_preloaded_mass_after_latency() {
        let (p, clock) = plant(SimConfig::default());
        p.preload_g(120.0);
        let mut s = p.scale();
        s.begin_acquisition().unwrap();
        s.request_tare().unwrap();
        clock.advance_ms(1_100);
        assert!(s.poll_new_reading().unwrap());
        assert!(!s.tare_complete());
        clock.advance_ms(100);
        assert!(s.poll_new_reading().unwrap());
        assert!(s.tare_complete());
        assert_eq!(s.current_reading(), 0.0);
        assert_eq!(p.dispensed_g(), 0.0);
    }

    #[test]
    fn failing_tare_reports_timeout_flag() {
        let (p, clock) = plant(SimConfig {
            fail_tare: true,
            ..SimConfig::default()
        });
        let mut s = p.scale();
        s.begin_acquisition().unwrap();
        s.request_tare().unwrap();
        clock.advance_ms(5_000);
        assert!(s.poll_new_reading().unwrap());
        assert!(!s.tare_complete());
        assert!(s.tare_timed_out());
        assert!(!s.signal_timed_out());
    }
}
