//! Non-blocking pulse-width drive for fine mode.
//!
//! The motor alternates between an on phase of a caller-chosen width and a
//! fixed off phase. Phase changes are derived from the clock on every update
//! so the control loop never sleeps inside a pulse.

/// Which half of the duty cycle the motor is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PulsePhase {
    Active,
    #[default]
    Idle,
}

/// The motor command implied by a phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PulseEdge {
    SwitchOn,
    SwitchOff,
}

#[derive(Debug, Clone)]
pub struct PulseDrive {
    phase: PulsePhase,
    since_ms: Option<u64>,
    off_ms: u64,
}

impl PulseDrive {
    pub fn new(off_ms: u64) -> Self {
        Self {
            phase: PulsePhase::Idle,
            since_ms: None,
            off_ms,
        }
    }

    pub fn phase(&self) -> PulsePhase {
        self.phase
    }

    /// Forget the current phase; the next update starts a fresh on phase.
    pub fn reset(&mut self) {
        self.phase = PulsePhase::Idle;
        self.since_ms = None;
    }

    /// Advance the duty cycle to `now_ms`. `on_ms` is the on-width in force for
    /// the current pulse. Returns the edge to apply to the motor, if any.
    pub fn update(&mut self, now_ms: u64, on_ms: u64) -> Option<PulseEdge> {
        let Some(since) = self.since_ms else {
            self.phase = PulsePhase::Active;
            self.since_ms = Some(now_ms);
            return Some(PulseEdge::SwitchOn);
        };
        let elapsed = now_ms.saturating_sub(since);
        match self.phase {
            PulsePhase::Active if elapsed >= on_ms => {
                self.phase = PulsePhase::Idle;
                self.since_ms = Some(now_ms);
                Some(PulseEdge::SwitchOff)
            }
            PulsePhase::Idle if elapsed >= self.off_ms => {
                self.phase = PulsePhase::Active;
                self.since_ms = Some(now_ms);
                Some(PulseEdge::SwitchOn)
            }
            _ => None,
        }
    }
}
