#![allow(dead_code)]
//! Shared rig: controller on a simulated plant, scripted keys, an LCD buffer
//! and a manual clock advanced a fixed step per tick.

use std::sync::Arc;

use dispenser_core::mocks::ScriptedKeypad;
use dispenser_core::{ControlCfg, CycleEvent, DispenserG, TimingCfg, build_dispenser};
use dispenser_hardware::{SimConfig, SimulatedActuator, SimulatedPlant, SimulatedScale};
use dispenser_traits::{Clock, ManualClock, WeightSensor};
use dispenser_ui::LcdBuffer;

pub const STEP_MS: u64 = 5;

pub type Controller = DispenserG<SimulatedScale, SimulatedActuator, ScriptedKeypad, LcdBuffer>;

pub struct Rig {
    pub core: Controller,
    pub plant: SimulatedPlant,
    pub clock: ManualClock,
}

pub fn rig(keys: &str, sim: SimConfig) -> Rig {
    rig_with(keys, sim, ControlCfg::default(), TimingCfg::default())
}

pub fn rig_with(keys: &str, sim: SimConfig, control: ControlCfg, timing: TimingCfg) -> Rig {
    let clock = ManualClock::new();
    let shared: Arc<dyn Clock + Send + Sync> = Arc::new(clock.clone());
    let plant = SimulatedPlant::new(sim, shared.clone());
    let mut scale = plant.scale();
    scale.begin_acquisition().unwrap();
    let mut core = build_dispenser(
        scale,
        plant.actuator(),
        ScriptedKeypad::from(keys),
        LcdBuffer::default(),
        control,
        timing,
        Some(shared),
    )
    .unwrap();
    core.begin().unwrap();
    Rig { core, plant, clock }
}

impl Rig {
    /// One tick, then advance the clock by `STEP_MS`.
    pub fn step(&mut self) -> Option<CycleEvent> {
        let ev = self.core.tick().unwrap();
        self.clock.advance_ms(STEP_MS);
        ev
    }

    /// Step until `stop` accepts an event or `limit_ms` of simulated time
    /// passes. Returns every event with the controller time it occurred at.
    pub fn run_until(
        &mut self,
        limit_ms: u64,
        mut stop: impl FnMut(&CycleEvent) -> bool,
    ) -> Vec<(u64, CycleEvent)> {
        let deadline = self.core.now_ms() + limit_ms;
        let mut events = Vec::new();
        while self.core.now_ms() < deadline {
            let at = self.core.now_ms();
            if let Some(ev) = self.step() {
                events.push((at, ev));
                if stop(&ev) {
                    break;
                }
            }
        }
        events
    }

    pub fn lcd_row(&self, row: usize) -> String {
        self.core.display().row_text(row)
    }
}

pub fn find(events: &[(u64, CycleEvent)], pred: impl Fn(&CycleEvent) -> bool) -> Option<(u64, CycleEvent)> {
    events.iter().copied().find(|(_, e)| pred(e))
}
