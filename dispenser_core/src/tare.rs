//! Resumable tare handshake.
//!
//! The first poll issues the tare and records when it started; every later
//! poll either observes completion, observes the timeout, or returns
//! `Pending` so the loop keeps running. Nothing here waits.

use dispenser_traits::WeightSensor;
use eyre::WrapErr;

use crate::error::Result;
use crate::hw_error::report;

/// Outcome of one handshake poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TareStatus {
    /// Tare was issued on this poll.
    Started,
    /// Still waiting on the sensor.
    Pending,
    /// Sensor reported tare completion.
    Complete,
    /// Pending longer than the timeout; flags are what the sensor reported.
    TimedOut {
        tare_timed_out: bool,
        signal_timed_out: bool,
    },
}

#[derive(Debug, Clone, Default)]
pub struct TareHandshake {
    started_at_ms: Option<u64>,
}

impl TareHandshake {
    pub fn new() -> Self {
        Self::default()
    }

    /// True between the poll that issued the tare and the poll that resolved it.
    pub fn in_progress(&self) -> bool {
        self.started_at_ms.is_some()
    }

    /// Drop any in-flight handshake.
    pub fn reset(&mut self) {
        self.started_at_ms = None;
    }

    /// Advance the handshake by one poll.
    pub fn poll<S: WeightSensor + ?Sized>(
        &mut self,
        sensor: &mut S,
        now_ms: u64,
        timeout_ms: u64,
    ) -> Result<TareStatus> {
        let Some(started) = self.started_at_ms else {
            sensor.request_tare().map_err(report).wrap_err("request tare")?;
            self.started_at_ms = Some(now_ms);
            return Ok(TareStatus::Started);
        };

        if now_ms.saturating_sub(started) > timeout_ms {
            self.started_at_ms = None;
            return Ok(TareStatus::TimedOut {
                tare_timed_out: sensor.tare_timed_out(),
                signal_timed_out: sensor.signal_timed_out(),
            });
        }

        let fresh = sensor
            .poll_new_reading()
            .map_err(report)
            .wrap_err("poll sensor during tare")?;
        if fresh && sensor.tare_complete() {
            self.started_at_ms = None;
            return Ok(TareStatus::Complete);
        }
        Ok(TareStatus::Pending)
    }
}
