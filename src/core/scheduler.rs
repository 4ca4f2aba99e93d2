// Adaptive polling cadence for the reconciliation loop

use std::time::Duration;

use crate::config::PollingConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollMode {
    /// Shortly after a fill; counter of fast cycles left
    Fast(u32),
    Normal,
}

/// Chooses the sleep before each reconciliation pass.
///
/// A fill switches to the fast interval for `fast_check_cycles` passes, after
/// which the scheduler falls back to the normal interval.
#[derive(Debug, Clone)]
pub struct PollingScheduler {
    normal_interval: Duration,
    fast_interval: Duration,
    fast_check_cycles: u32,
    remaining_fast: u32,
}

impl PollingScheduler {
    pub fn new(config: &PollingConfig) -> Self {
        Self {
            normal_interval: Duration::from_secs(config.normal_interval_secs),
            fast_interval: Duration::from_secs(config.fast_interval_secs),
            fast_check_cycles: config.fast_check_cycles,
            remaining_fast: 0,
        }
    }

    pub fn mode(&self) -> PollMode {
        if self.remaining_fast > 0 {
            PollMode::Fast(self.remaining_fast)
        } else {
            PollMode::Normal
        }
    }

    pub fn remaining_fast_cycles(&self) -> u32 {
        self.remaining_fast
    }

    /// Interval to sleep before the next pass; consumes one fast cycle if any remain
    pub fn next_interval(&mut self) -> Duration {
        if self.remaining_fast > 0 {
            self.remaining_fast -= 1;
            self.fast_interval
        } else {
            self.normal_interval
        }
    }

    pub fn record_fill(&mut self) {
        self.remaining_fast = self.fast_check_cycles;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_in_normal_mode() {
        let mut scheduler = PollingScheduler::new(&PollingConfig::default());
        assert_eq!(scheduler.mode(), PollMode::Normal);
        assert_eq!(scheduler.next_interval(), Duration::from_secs(60));
    }

    #[test]
    fn test_fill_resets_fast_counter() {
        let mut scheduler = PollingScheduler::new(&PollingConfig::default());
        scheduler.record_fill();
        scheduler.next_interval();
        scheduler.next_interval();
        assert_eq!(scheduler.remaining_fast_cycles(), 6);

        scheduler.record_fill();
        assert_eq!(scheduler.mode(), PollMode::Fast(8));
    }
}
