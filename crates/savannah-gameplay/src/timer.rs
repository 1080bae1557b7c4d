//! Tick-driven countdown timers.
//!
//! Every wait in the combat core (charge wind-up, stun, knockback cooldown,
//! despawn, respawn delay) is a [`Countdown`] stored on its owner and advanced
//! from the owner's update. Cancelling one is just clearing it.

use serde::{Deserialize, Serialize};

/// Slack absorbed when comparing accumulated `dt` against a duration, so a
/// window of 0.5s driven by ten 0.05s ticks elapses on the tenth tick.
const ELAPSE_EPSILON: f32 = 1e-4;

/// A one-shot countdown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    /// Time remaining (in seconds). `None` when idle.
    time_remaining: Option<f32>,
}

impl Countdown {
    /// Creates an idle countdown.
    #[must_use]
    pub const fn idle() -> Self {
        Self {
            time_remaining: None,
        }
    }

    /// Creates a countdown already running for `duration` seconds.
    #[must_use]
    pub fn running(duration: f32) -> Self {
        let mut countdown = Self::idle();
        countdown.start(duration);
        countdown
    }

    /// (Re)starts the countdown.
    pub fn start(&mut self, duration: f32) {
        self.time_remaining = Some(duration.max(0.0));
    }

    /// Stops the countdown without firing.
    pub fn cancel(&mut self) {
        self.time_remaining = None;
    }

    /// Returns true while the countdown has not yet elapsed.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.time_remaining.is_some()
    }

    /// Time left, or zero when idle.
    #[must_use]
    pub fn remaining(&self) -> f32 {
        self.time_remaining.unwrap_or(0.0)
    }

    /// Advances the countdown. Returns true exactly once, on the tick it
    /// elapses; the countdown is idle afterwards.
    pub fn tick(&mut self, dt: f32) -> bool {
        let Some(remaining) = self.time_remaining.as_mut() else {
            return false;
        };
        *remaining -= dt;
        if *remaining <= ELAPSE_EPSILON {
            self.time_remaining = None;
            true
        } else {
            false
        }
    }
}

/// A repeating interval that fires every `period` seconds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Interval {
    period: f32,
    elapsed: f32,
}

impl Interval {
    /// Creates an interval that fires on its first tick.
    #[must_use]
    pub fn new(period: f32) -> Self {
        Self {
            period: period.max(ELAPSE_EPSILON),
            elapsed: period,
        }
    }

    /// Makes the next tick fire immediately.
    pub fn fire_next_tick(&mut self) {
        self.elapsed = self.period;
    }

    /// Advances the interval. Returns true when a period has passed.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.elapsed + ELAPSE_EPSILON >= self.period {
            self.elapsed = 0.0;
            self.elapsed += dt;
            return true;
        }
        self.elapsed += dt;
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_countdown_slack_is_far_below_a_tick() {
        let mut early = Countdown::running(1.0);
        assert!(!early.tick(0.9998));
        assert!(early.is_running());

        let mut within_slack = Countdown::running(1.0);
        assert!(within_slack.tick(0.99995));
    }

    #[test]
    fn test_countdown_fires_once() {
        let mut timer = Countdown::running(0.5);
        let fired: Vec<bool> = (0..12).map(|_| timer.tick(0.05)).collect();
        assert_eq!(fired.iter().filter(|f| **f).count(), 1);
        assert!(fired[9], "should elapse on the tenth tick");
        assert!(!timer.is_running());
    }

    #[test]
    fn test_cancel_suppresses_fire() {
        let mut timer = Countdown::running(1.0);
        timer.tick(0.5);
        timer.cancel();
        assert!(!timer.tick(1.0));
    }

    #[test]
    fn test_idle_never_fires() {
        let mut timer = Countdown::idle();
        assert!(!timer.tick(100.0));
        assert_eq!(timer.remaining(), 0.0);
    }

    #[test]
    fn test_interval_fires_immediately_then_periodically() {
        let mut interval = Interval::new(2.0);
        assert!(interval.tick(0.5));
        assert!(!interval.tick(0.5));
        assert!(!interval.tick(0.5));
        assert!(!interval.tick(0.5));
        assert!(interval.tick(0.5));
    }
}
