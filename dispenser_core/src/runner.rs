use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use dispenser_traits::clock::Clock;
use dispenser_traits::{Actuator, CharDisplay, Keypad, WeightSensor};

use crate::core::DispenserCore;
use crate::error::{DispenserError, Result as CoreResult};
use crate::status::CycleEvent;

/// How the polling loop is paced and when it gives up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunParams {
    /// Sleep between ticks (ms). Zero spins.
    pub loop_period_ms: u64,
    /// Consecutive failing ticks tolerated before the error is returned.
    pub max_consecutive_errors: u32,
    /// Return once this many cycles have reached their target.
    pub stop_after_cycles: Option<u64>,
    /// Return `DispenserError::TareFailed` instead of going back to Input.
    pub abort_on_tare_failure: bool,
}

impl Default for RunParams {
    fn default() -> Self {
        Self {
            loop_period_ms: 5,
            max_consecutive_errors: 5,
            stop_after_cycles: None,
            abort_on_tare_failure: false,
        }
    }
}

impl From<&dispenser_config::Config> for RunParams {
    fn from(c: &dispenser_config::Config) -> Self {
        Self {
            loop_period_ms: c.timing.loop_period_ms,
            max_consecutive_errors: c.runner.max_consecutive_errors,
            ..Self::default()
        }
    }
}

/// Tally of what happened while the loop ran.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunSummary {
    pub cycles: u64,
    pub tare_failures: u64,
    pub rejected_inputs: u64,
    pub last_final_g: Option<f32>,
}

impl RunSummary {
    fn record(&mut self, event: CycleEvent) {
        match event {
            CycleEvent::Completed { final_g } => {
                self.cycles += 1;
                self.last_final_g = Some(final_g);
            }
            CycleEvent::TareFailed { .. } => self.tare_failures += 1,
            CycleEvent::InputRejected => self.rejected_inputs += 1,
            _ => {}
        }
    }
}

/// Drive the controller until `shutdown` is raised or `stop_after_cycles` is met.
///
/// A failing tick is logged, the actuator is switched off and the controller
/// is reset to Input; `max_consecutive_errors` failures in a row end the run
/// with the last error. The actuator is always off when this returns.
pub fn run<S, A, K, D>(
    controller: &mut DispenserCore<S, A, K, D>,
    clock: &dyn Clock,
    params: &RunParams,
    shutdown: &AtomicBool,
) -> CoreResult<RunSummary>
where
    S: WeightSensor,
    A: Actuator,
    K: Keypad,
    D: CharDisplay,
{
    let period = Duration::from_millis(params.loop_period_ms);
    let mut summary = RunSummary::default();
    let mut consecutive_errors: u32 = 0;

    controller.begin()?;
    tracing::info!(
        loop_period_ms = params.loop_period_ms,
        stop_after_cycles = ?params.stop_after_cycles,
        "run start"
    );

    while !shutdown.load(Ordering::Relaxed) {
        match controller.tick() {
            Ok(event) => {
                consecutive_errors = 0;
                if let Some(event) = event {
                    tracing::debug!(?event, state = %controller.state(), "cycle event");
                    summary.record(event);
                    if params.abort_on_tare_failure
                        && let CycleEvent::TareFailed {
                            tare_timed_out,
                            signal_timed_out,
                        } = event
                    {
                        return Err(crate::error::Report::new(DispenserError::TareFailed {
                            tare_timed_out,
                            signal_timed_out,
                        }));
                    }
                }
            }
            Err(e) => {
                consecutive_errors = consecutive_errors.saturating_add(1);
                tracing::error!(error = %e, consecutive_errors, "tick failed");
                if consecutive_errors >= params.max_consecutive_errors {
                    if let Err(stop_err) = controller.disable_actuator() {
                        tracing::warn!(error = %stop_err, "disable actuator after error budget failed");
                    }
                    return Err(e);
                }
                if let Err(reset_err) = controller.full_reset() {
                    tracing::warn!(error = %reset_err, "reset after failed tick also failed");
                }
            }
        }

        if let Some(n) = params.stop_after_cycles
            && summary.cycles >= n
        {
            break;
        }
        clock.sleep(period);
    }

    if let Err(e) = controller.disable_actuator() {
        tracing::warn!(error = %e, "disable actuator on exit failed");
    }
    tracing::info!(
        cycles = summary.cycles,
        tare_failures = summary.tare_failures,
        rejected_inputs = summary.rejected_inputs,
        "run finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_counts_the_events_it_cares_about() {
        let mut s = RunSummary::default();
        s.record(CycleEvent::InputRejected);
        s.record(CycleEvent::TareFailed {
            tare_timed_out: true,
            signal_timed_out: false,
        });
        s.record(CycleEvent::FineEngaged { current_g: 10.0 });
        s.record(CycleEvent::Completed { final_g: 501.2 });
        assert_eq!(
            s,
            RunSummary {
                cycles: 1,
                tare_failures: 1,
                rejected_inputs: 1,
                last_final_g: Some(501.2),
            }
        );
    }

    #[test]
    fn params_follow_config() {
        let cfg = dispenser_config::load_toml(
            "[pins]\nhx711_dt = 5\nhx711_sck = 6\nmotor_fwd = 20\nmotor_rev = 21\n\
             [timing]\nloop_period_ms = 2\n[runner]\nmax_consecutive_errors = 9\n",
        )
        .unwrap();
        let p = RunParams::from(&cfg);
        assert_eq!(p.loop_period_ms, 2);
        assert_eq!(p.max_consecutive_errors, 9);
        assert_eq!(p.stop_after_cycles, None);
    }
}
