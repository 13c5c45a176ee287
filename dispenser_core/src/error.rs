use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum DispenserError {
    #[error("hardware error: {0}")]
    Hardware(String),
    #[error("hardware fault: {0}")]
    HardwareFault(String),
    #[error("timeout waiting for sensor")]
    Timeout,
    #[error("tare failed (tare timeout: {tare_timed_out}, signal timeout: {signal_timed_out})")]
    TareFailed {
        tare_timed_out: bool,
        signal_timed_out: bool,
    },
    #[error("invalid state: {0}")]
    State(String),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BuildError {
    #[error("missing weight sensor")]
    MissingSensor,
    #[error("missing actuator")]
    MissingActuator,
    #[error("missing keypad")]
    MissingKeypad,
    #[error("missing display")]
    MissingDisplay,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
