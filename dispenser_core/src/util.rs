//! Time helpers for dispenser_core.

/// Rate gate: fires at most once per `period_ms`.
///
/// An unfired gate fires on the first check, so a freshly reset cycle samples
/// and redraws immediately.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Every {
    period_ms: u64,
    last_ms: Option<u64>,
}

impl Every {
    pub const fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_ms: None,
        }
    }

    /// Returns true (and records `now_ms`) when the period has elapsed.
    #[inline]
    pub fn ready(&mut self, now_ms: u64) -> bool {
        let due = self
            .last_ms
            .is_none_or(|last| now_ms.saturating_sub(last) >= self.period_ms);
        if due {
            self.last_ms = Some(now_ms);
        }
        due
    }

    pub fn reset(&mut self) {
        self.last_ms = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn gate_fires_once_per_period() {
        let mut g = Every::new(200);
        assert!(g.ready(0));
        assert!(!g.ready(199));
        assert!(g.ready(200));
        assert!(!g.ready(300));
        assert!(g.ready(450));
    }

    #[test]
    fn reset_rearms_immediately() {
        let mut g = Every::new(500);
        assert!(g.ready(10));
        g.reset();
        assert!(g.ready(11));
    }
}
