//! # Fibonacci Backoff
//!
//! Provides a Fibonacci-based backoff mechanism for retries.
//! This grows more slowly than exponential backoff, which suits the
//! conflict-retry loop in the apply path: write races resolve within a few
//! milliseconds, so the sequence is calculated in milliseconds and capped low.
//!
//! Default conflict sequence: 10ms, 10ms, 20ms, 30ms, 50ms, then capped.

use std::time::Duration;

/// Fibonacci backoff calculator
///
/// Generates backoff durations following the Fibonacci sequence.
/// Each backoff is the sum of the previous two, capped at a maximum.
#[derive(Debug, Clone)]
pub struct FibonacciBackoff {
    /// Minimum backoff value in milliseconds (for reset)
    min_ms: u64,
    /// Previous backoff value in milliseconds
    prev_ms: u64,
    /// Current backoff value in milliseconds
    current_ms: u64,
    /// Maximum backoff value in milliseconds
    max_ms: u64,
}

impl FibonacciBackoff {
    /// Create a new Fibonacci backoff with specified minimum and maximum
    /// values in milliseconds.
    ///
    /// # Arguments
    ///
    /// * `min_ms` - Minimum backoff duration (used for the first two values)
    /// * `max_ms` - Maximum backoff duration (caps the sequence)
    #[must_use]
    pub fn new(min_ms: u64, max_ms: u64) -> Self {
        Self {
            min_ms,
            prev_ms: 0,
            current_ms: min_ms,
            max_ms,
        }
    }

    /// Get the next backoff duration in milliseconds and advance the sequence.
    pub fn next_backoff_ms(&mut self) -> u64 {
        let result_ms = self.current_ms;

        let next_ms = self.prev_ms + self.current_ms;

        self.prev_ms = self.current_ms;
        self.current_ms = std::cmp::min(next_ms, self.max_ms);

        result_ms
    }

    /// Get the next backoff duration as a `Duration` and advance the sequence.
    pub fn next_backoff(&mut self) -> Duration {
        Duration::from_millis(self.next_backoff_ms())
    }

    /// Reset the backoff to the initial state.
    #[allow(dead_code)] // Utility method, used after a successful apply cycle
    pub fn reset(&mut self) {
        self.prev_ms = 0;
        self.current_ms = self.min_ms;
    }
}
