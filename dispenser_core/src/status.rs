//! Controller state and the events a single tick can report.

/// The controller is in exactly one of these at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SystemState {
    /// Collecting a target from the keypad.
    #[default]
    Input,
    /// Tare handshake in progress.
    Zeroing,
    /// Actuator running, coarse or fine.
    Dispensing,
    /// Target reached; completion screen is up until the dwell expires.
    Finished,
}

impl SystemState {
    pub const fn as_str(self) -> &'static str {
        match self {
            SystemState::Input => "input",
            SystemState::Zeroing => "zeroing",
            SystemState::Dispensing => "dispensing",
            SystemState::Finished => "finished",
        }
    }
}

impl core::fmt::Display for SystemState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notable outcome of one `tick()`. Most ticks report nothing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CycleEvent {
    /// `#` finalized a valid entry; state is now Zeroing.
    TargetAccepted { target_g: f32 },
    /// `#` finalized an entry that did not parse to a positive mass.
    InputRejected,
    /// `*` discarded the entry.
    InputCancelled,
    /// Tare command issued to the sensor.
    TareStarted,
    /// Tare confirmed; state is now Dispensing.
    TareComplete,
    /// Tare handshake timed out; controller has been reset to Input.
    TareFailed {
        tare_timed_out: bool,
        signal_timed_out: bool,
    },
    /// Pulsed drive engaged partway through a cycle.
    FineEngaged { current_g: f32 },
    /// Measured mass reached the target; state is now Finished.
    Completed { final_g: f32 },
    /// Completion dwell expired; controller is back in Input.
    ResetToInput,
}
