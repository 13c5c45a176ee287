//! Command bodies: config mapping, controller assembly and the run loop.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use dispenser_config::Config;
use dispenser_core::hw_error::map_hw_error;
use dispenser_core::mocks::ScriptedKeypad;
use dispenser_core::runner::{self, RunParams, RunSummary};
use dispenser_core::{Dispenser, InputBuffer, Key};
use dispenser_traits::{CharDisplay, Clock, Keypad, MonotonicClock};
use dispenser_ui::{ConsoleDisplay, ConsoleKeypad, LcdBuffer};
use eyre::{Result, WrapErr};

use crate::backend::{self, Backend};

/// Replay `keys` the way the controller reads them and return the first
/// target that would be accepted.
pub fn scripted_target(keys: &str) -> Option<f32> {
    let mut buf = InputBuffer::new();
    for c in keys.chars() {
        match Key::from(c) {
            Key::Enter if buf.is_empty() => {}
            Key::Enter => match buf.parse_target() {
                Some(g) => return Some(g),
                None => buf.clear(),
            },
            Key::Cancel => buf.clear(),
            key => {
                buf.push(key);
            }
        }
    }
    None
}

/// Key sequence for `--grams`/`--keys`, rejected up front when the controller
/// would never leave Input with it.
pub fn keys_for(grams: Option<f32>, keys: Option<&str>) -> Result<String> {
    let keys = match (grams, keys) {
        (_, Some(k)) => k.to_string(),
        (Some(g), None) => {
            let keys = format!("{g}#");
            if scripted_target(&keys) != Some(g) {
                eyre::bail!(
                    "invalid target: {g} g cannot be typed on the keypad (max {} characters, > 0)",
                    dispenser_core::MAX_INPUT_LEN
                );
            }
            keys
        }
        (None, None) => eyre::bail!("invalid target: pass --grams or --keys"),
    };
    if scripted_target(&keys).is_none() {
        eyre::bail!("invalid target: key sequence {keys:?} never finalizes a target");
    }
    Ok(keys)
}

fn clock() -> Arc<dyn Clock + Send + Sync> {
    Arc::new(MonotonicClock::new())
}

fn assemble(
    cfg: &Config,
    mut hw: Backend,
    keypad: Box<dyn Keypad>,
    display: Box<dyn CharDisplay>,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<Dispenser> {
    hw.sensor
        .begin_acquisition()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("start sensor acquisition")?;
    Dispenser::builder()
        .with_sensor(hw.sensor)
        .with_actuator(hw.actuator)
        .with_keypad(keypad)
        .with_display(display)
        .with_control((&cfg.control).into())
        .with_timing((&cfg.timing).into())
        .with_clock(clock)
        .try_build()
}

/// One scripted cycle. Tare failures end the run with an error.
pub fn run_dispense(cfg: &Config, keys: &str, shutdown: &AtomicBool) -> Result<RunSummary> {
    let clock = clock();
    let hw = backend::open(cfg, clock.clone())?;
    tracing::info!(backend = hw.name, keys, "dispense start");
    let mut dispenser = assemble(
        cfg,
        hw,
        Box::new(ScriptedKeypad::from(keys)),
        Box::new(LcdBuffer::default()),
        clock.clone(),
    )?;
    let params = RunParams {
        stop_after_cycles: Some(1),
        abort_on_tare_failure: true,
        ..RunParams::from(cfg)
    };
    let summary = runner::run(&mut dispenser, &*clock, &params, shutdown)?;
    if summary.cycles == 0 {
        eyre::bail!("dispense interrupted before the target was reached");
    }
    Ok(summary)
}

/// Interactive loop on the device keypad (or stdin) and the console display.
pub fn run_interactive(cfg: &Config, shutdown: &AtomicBool) -> Result<RunSummary> {
    let clock = clock();
    let mut hw = backend::open(cfg, clock.clone())?;
    let keypad: Box<dyn Keypad> = match hw.keypad.take() {
        Some(k) => k,
        None => Box::new(ConsoleKeypad::stdin()),
    };
    tracing::info!(backend = hw.name, "interactive run start");
    let mut dispenser = assemble(
        cfg,
        hw,
        keypad,
        Box::new(ConsoleDisplay::stdout()),
        clock.clone(),
    )?;
    runner::run(&mut dispenser, &*clock, &RunParams::from(cfg), shutdown)
}

/// Open the gateways and start acquisition; any failure is a startup fault.
pub fn self_check(cfg: &Config) -> Result<&'static str> {
    let mut hw = backend::open(cfg, clock())?;
    hw.sensor
        .begin_acquisition()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("start sensor acquisition")?;
    hw.actuator
        .disable()
        .map_err(|e| eyre::Report::new(map_hw_error(&*e)))
        .wrap_err("disable actuator")?;
    Ok(hw.name)
}
