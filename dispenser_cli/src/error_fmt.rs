//! Human-readable error descriptions and structured JSON error formatting.

use dispenser_core::error::{BuildError, DispenserError};
use dispenser_hardware::error::HwError;
use serde_json::json;

/// Process exit code when a tare handshake timed out.
pub const EXIT_TARE_FAILED: i32 = 3;
/// Process exit code for sensor/actuator/GPIO faults.
pub const EXIT_HARDWARE: i32 = 4;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingSensor => {
                "What happened: No weight sensor was provided to the controller.\nLikely causes: The backend failed to open the scale or it was not passed to the builder.\nHow to fix: Ensure the sensor is created successfully and passed via with_sensor(...).".to_string()
            }
            BuildError::MissingActuator => {
                "What happened: No actuator was provided to the controller.\nLikely causes: The motor driver failed to initialize or was not passed to the builder.\nHow to fix: Ensure the motor is created successfully and passed via with_actuator(...).".to_string()
            }
            BuildError::MissingKeypad | BuildError::MissingDisplay => format!(
                "What happened: {be}.\nLikely causes: The front end was not wired into the builder.\nHow to fix: Pass both a keypad and a display to the builder."
            ),
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun. See etc/dispenser.toml for a sample."
            ),
        };
    }

    if let Some(de) = err.downcast_ref::<DispenserError>() {
        return match de {
            DispenserError::TareFailed {
                tare_timed_out,
                signal_timed_out,
            } => {
                let cause = if *signal_timed_out {
                    "the HX711 stopped producing conversions (check DT/SCK wiring and power)"
                } else if *tare_timed_out {
                    "the scale never settled on a new zero (vibration, or material still moving)"
                } else {
                    "the tare did not finish within timing.tare_timeout_ms"
                };
                format!(
                    "What happened: Taring the scale timed out.\nLikely causes: {cause}.\nHow to fix: Clear the scale, check the load cell, or raise timing.tare_timeout_ms."
                )
            }
            DispenserError::Timeout => {
                "What happened: Scale read timed out.\nLikely causes: HX711 not wired correctly, no power/ground, or sensor.signal_timeout_ms too low.\nHow to fix: Verify DT/SCK pins and power, and consider increasing sensor.signal_timeout_ms in the config.".to_string()
            }
            DispenserError::Hardware(_) | DispenserError::HardwareFault(_) => format!(
                "What happened: A device gateway failed ({de}).\nLikely causes: Wiring, power, or GPIO permissions.\nHow to fix: Check [pins] in the config and run `dispenser self-check`."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    if err.downcast_ref::<HwError>().is_some() {
        return format!(
            "What happened: Failed to initialize hardware ({err:#}).\nLikely causes: Incorrect pin numbers or insufficient GPIO permissions.\nHow to fix: Fix the [pins] values in the config; ensure the process has permission to access GPIO."
        );
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.starts_with("read config") {
        return format!(
            "What happened: The config file could not be read ({msg}).\nLikely causes: Wrong --config path or missing permissions.\nHow to fix: Pass --config with the path to a readable TOML file."
        );
    }

    if lower.starts_with("parse config") || lower.starts_with("invalid config") {
        return format!(
            "What happened: Configuration is invalid or incomplete ({err:#}).\nLikely causes: Missing [pins] (hx711_dt, hx711_sck, motor_fwd, motor_rev), or out-of-range values.\nHow to fix: Edit the TOML config and try again."
        );
    }

    if lower.starts_with("invalid target") {
        return format!(
            "What happened: {msg}.\nLikely causes: The target has more than six characters, is zero, or the keys never press '#'.\nHow to fix: Use a positive value such as --grams 250 or --keys \"12.5#\"."
        );
    }

    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: 3 for tare failures, 4 for hardware faults, 1 otherwise.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<DispenserError>() {
        Some(DispenserError::TareFailed { .. }) => return EXIT_TARE_FAILED,
        Some(
            DispenserError::Hardware(_) | DispenserError::HardwareFault(_) | DispenserError::Timeout,
        ) => return EXIT_HARDWARE,
        _ => {}
    }
    if err.downcast_ref::<HwError>().is_some() {
        return EXIT_HARDWARE;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if err.downcast_ref::<BuildError>().is_some() {
        return "Build";
    }
    match err.downcast_ref::<DispenserError>() {
        Some(DispenserError::TareFailed { .. }) => "TareFailed",
        Some(DispenserError::Timeout) => "Timeout",
        Some(DispenserError::Hardware(_) | DispenserError::HardwareFault(_)) => "Hardware",
        Some(DispenserError::State(_)) => "State",
        None if err.downcast_ref::<HwError>().is_some() => "Hardware",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    let msg = humanize(err);
    let reason = reason_name(err);
    let code = exit_code_for_error(err);
    if let Some(DispenserError::TareFailed {
        tare_timed_out,
        signal_timed_out,
    }) = err.downcast_ref::<DispenserError>()
    {
        return json!({
            "reason": reason,
            "exit_code": code,
            "details": { "tare_timed_out": tare_timed_out, "signal_timed_out": signal_timed_out },
            "message": msg,
        })
        .to_string();
    }
    json!({ "reason": reason, "exit_code": code, "message": msg }).to_string()
}
