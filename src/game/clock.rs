//! Pausable round clock driving forced turn advance.
//!
//! A per-session logical timer: pausing preserves elapsed progress, resuming
//! continues from where it stopped, and resetting restarts a full interval.
//! The session loop polls `deadline()` and re-arms after each expiry, so the
//! clock behaves like an interval timer that specific events may stretch.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug)]
pub struct RoundClock {
    interval: Duration,
    /// Time left on the current round when paused, or when `resumed_at` was set
    remaining: Duration,
    /// None while paused
    resumed_at: Option<Instant>,
}

impl RoundClock {
    /// A fresh clock starts paused with a full interval on it
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            remaining: interval,
            resumed_at: None,
        }
    }

    pub fn is_paused(&self) -> bool {
        self.resumed_at.is_none()
    }

    /// Stop the clock, keeping the elapsed progress
    pub fn pause(&mut self) {
        if let Some(resumed_at) = self.resumed_at.take() {
            self.remaining = self.remaining.saturating_sub(resumed_at.elapsed());
        }
    }

    /// Continue from the preserved remaining time
    pub fn resume(&mut self) {
        if self.resumed_at.is_none() {
            if self.remaining.is_zero() {
                self.remaining = self.interval;
            }
            self.resumed_at = Some(Instant::now());
        }
    }

    /// Restart the current round from a full interval, keeping the
    /// paused/running state
    pub fn reset(&mut self) {
        self.remaining = self.interval;
        if self.resumed_at.is_some() {
            self.resumed_at = Some(Instant::now());
        }
    }

    /// Start the next round; called by the session loop after an expiry fired
    pub fn rearm(&mut self) {
        self.remaining = self.interval;
        self.resumed_at = Some(Instant::now());
    }

    /// Time left on the current round
    pub fn remaining(&self) -> Duration {
        match self.resumed_at {
            Some(resumed_at) => self.remaining.saturating_sub(resumed_at.elapsed()),
            None => self.remaining,
        }
    }

    /// The instant the current round expires; None while paused
    pub fn deadline(&self) -> Option<Instant> {
        self.resumed_at.map(|resumed_at| resumed_at + self.remaining)
    }
}
