//! # Fibonacci Backoff
//!
//! Requeue delays for AutomotiveDevConfig objects whose reconciliation failed.
//! The orchestrator never retries on its own; this is the retry policy of the
//! control loop that calls it.
//!
//! Sequence in minutes: 1m, 1m, 2m, 3m, 5m, 8m, 10m (max), returned in seconds.

/// Fibonacci backoff calculator
///
/// Each backoff is the sum of the previous two, capped at `max_minutes`.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Previous backoff value in minutes
    prev_minutes: u64,
    /// Current backoff value in minutes
    current_minutes: u64,
    /// Maximum backoff value in minutes
    max_minutes: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff between `min_minutes` and `max_minutes`
    ///
    /// # Arguments
    ///
    /// * `min_minutes` - First two delays in minutes (typically 1)
    /// * `max_minutes` - Cap in minutes (typically 10)
    #[must_use]
    pub fn new(min_minutes: u64, max_minutes: u64) -> Self {
        Self {
            prev_minutes: 0,
            current_minutes: min_minutes,
            max_minutes,
        }
    }

    /// Get the next backoff duration in seconds and advance the sequence
    pub fn next_backoff_seconds(&mut self) -> u64 {
        let result_seconds = self.current_minutes * 60;

        let next_minutes = self.prev_minutes + self.current_minutes;
        self.prev_minutes = self.current_minutes;
        self.current_minutes = std::cmp::min(next_minutes, self.max_minutes);

        result_seconds
    }
}
