use serde::{Deserialize, Serialize};

/// Countdown scalar used for invincibility, knockback, drip and power-up
/// windows. Zero means inactive; the value never drops below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    remaining: f32,
}

impl Countdown {
    pub fn new(duration: f32) -> Self {
        let mut timer = Self::default();
        timer.start(duration);
        timer
    }

    /// Restart the countdown. Negative or NaN durations leave it inactive.
    pub fn start(&mut self, duration: f32) {
        self.remaining = if duration.is_nan() { 0.0 } else { duration.max(0.0) };
    }

    pub fn clear(&mut self) {
        self.remaining = 0.0;
    }

    /// Advance by `dt`. Returns `true` on the tick that expires the timer.
    pub fn tick(&mut self, dt: f32) -> bool {
        if self.remaining <= 0.0 {
            return false;
        }
        self.remaining = (self.remaining - dt.max(0.0)).max(0.0);
        self.remaining <= 0.0
    }

    pub fn remaining(&self) -> f32 {
        self.remaining
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0.0
    }
}
