//! Exponential backoff for dropped event streams.
//!
//! [`ReconnectConfig`] describes the schedule; [`Backoff`] walks it. A
//! stream that connects successfully calls [`Backoff::reset`] so the next
//! outage starts again from the shortest delay.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Wait before the first retry.
    pub initial_delay: Duration,
    /// Ceiling for any single wait.
    pub max_delay: Duration,
    /// Growth factor applied after every failed attempt.
    pub factor: u32,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            factor: 2,
        }
    }
}

impl ReconnectConfig {
    /// Default schedule with a different ceiling. The initial delay never
    /// exceeds the ceiling.
    pub fn with_max_delay(max_delay: Duration) -> Self {
        let defaults = Self::default();
        Self {
            initial_delay: defaults.initial_delay.min(max_delay),
            max_delay,
            ..defaults
        }
    }
}

/// Position within a [`ReconnectConfig`] schedule.
#[derive(Debug, Clone)]
pub struct Backoff {
    config: ReconnectConfig,
    current: Duration,
}

impl Backoff {
    pub fn new(config: ReconnectConfig) -> Self {
        let current = config.initial_delay;
        Self { config, current }
    }

    /// Delay to wait now; advances the schedule for the next failure.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.current;
        self.current = self
            .current
            .saturating_mul(self.config.factor)
            .min(self.config.max_delay);
        delay
    }

    /// Return to the start of the schedule.
    pub fn reset(&mut self) {
        self.current = self.config.initial_delay;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(backoff: &mut Backoff, n: usize) -> Vec<u64> {
        (0..n).map(|_| backoff.next_delay().as_secs()).collect()
    }

    #[test]
    fn doubles_from_one_second_up_to_thirty() {
        let mut backoff = Backoff::new(ReconnectConfig::default());
        assert_eq!(secs(&mut backoff, 8), vec![1, 2, 4, 8, 16, 30, 30, 30]);
    }

    #[test]
    fn reset_restarts_schedule() {
        let mut backoff = Backoff::new(ReconnectConfig::default());
        secs(&mut backoff, 4);
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn custom_ceiling_is_respected() {
        let mut backoff = Backoff::new(ReconnectConfig::with_max_delay(Duration::from_secs(5)));
        assert_eq!(secs(&mut backoff, 5), vec![1, 2, 4, 5, 5]);
    }

    #[test]
    fn ceiling_below_one_second_caps_initial_delay() {
        let config = ReconnectConfig::with_max_delay(Duration::from_millis(200));
        assert_eq!(config.initial_delay, Duration::from_millis(200));
        let mut backoff = Backoff::new(config);
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
        assert_eq!(backoff.next_delay(), Duration::from_millis(200));
    }
}
