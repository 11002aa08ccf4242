use serde::{Deserialize, Serialize};

/// Default physics rate in Hz.
pub const DEFAULT_FIXED_RATE_HZ: f32 = 50.0;
/// Upper bound on physics steps run for a single frame.
const MAX_STEPS_PER_FRAME: u32 = 8;

/// Scaled simulation clock. A time scale of zero stalls every steppable actor
/// while unscaled (real) time keeps advancing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimClock {
    time_scale: f32,
    sim_time: f32,
    real_time: f32,
}

impl Default for SimClock {
    fn default() -> Self {
        Self {
            time_scale: 1.0,
            sim_time: 0.0,
            real_time: 0.0,
        }
    }
}

impl SimClock {
    pub fn paused() -> Self {
        Self {
            time_scale: 0.0,
            ..Self::default()
        }
    }

    pub fn time_scale(&self) -> f32 {
        self.time_scale
    }

    pub fn set_time_scale(&mut self, scale: f32) {
        self.time_scale = scale.max(0.0);
    }

    pub fn is_paused(&self) -> bool {
        self.time_scale == 0.0
    }

    /// Advance by a real-time delta, returning the scaled delta.
    pub fn advance(&mut self, real_dt: f32) -> f32 {
        let real_dt = real_dt.max(0.0);
        let scaled = real_dt * self.time_scale;
        self.real_time += real_dt;
        self.sim_time += scaled;
        scaled
    }

    pub fn sim_time(&self) -> f32 {
        self.sim_time
    }

    pub fn real_time(&self) -> f32 {
        self.real_time
    }
}

/// Accumulator turning variable frame deltas into fixed physics steps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixedStep {
    step: f32,
    accumulator: f32,
}

impl FixedStep {
    pub fn new(rate_hz: f32) -> Self {
        let rate = if rate_hz.is_finite() && rate_hz > 0.0 {
            rate_hz
        } else {
            tracing::warn!("invalid fixed rate {rate_hz}, using {DEFAULT_FIXED_RATE_HZ} Hz");
            DEFAULT_FIXED_RATE_HZ
        };
        Self {
            step: 1.0 / rate,
            accumulator: 0.0,
        }
    }

    pub fn step(&self) -> f32 {
        self.step
    }

    /// Add scaled time and return how many whole steps are due.
    pub fn accumulate(&mut self, scaled_dt: f32) -> u32 {
        self.accumulator += scaled_dt.max(0.0);
        let mut steps = 0;
        while self.accumulator >= self.step && steps < MAX_STEPS_PER_FRAME {
            self.accumulator -= self.step;
            steps += 1;
        }
        if steps == MAX_STEPS_PER_FRAME {
            // Drop the backlog instead of spiralling.
            self.accumulator = self.accumulator.min(self.step);
        }
        steps
    }
}

impl Default for FixedStep {
    fn default() -> Self {
        Self::new(DEFAULT_FIXED_RATE_HZ)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paused_clock_stalls_sim_time() {
        let mut clock = SimClock::paused();
        assert_eq!(clock.advance(1.0), 0.0);
        assert_eq!(clock.sim_time(), 0.0);
        assert_eq!(clock.real_time(), 1.0);
        clock.set_time_scale(1.0);
        assert_eq!(clock.advance(0.5), 0.5);
    }

    #[test]
    fn fixed_step_accumulates_fractions() {
        let mut fixed = FixedStep::new(10.0);
        assert_eq!(fixed.accumulate(0.05), 0);
        assert_eq!(fixed.accumulate(0.06), 1);
        assert_eq!(fixed.accumulate(0.25), 2);
    }

    #[test]
    fn fixed_step_caps_backlog() {
        let mut fixed = FixedStep::new(100.0);
        assert_eq!(fixed.accumulate(10.0), MAX_STEPS_PER_FRAME);
        assert!(fixed.accumulate(0.0) <= 1);
    }

    #[test]
    fn invalid_rate_falls_back() {
        let fixed = FixedStep::new(0.0);
        assert!((fixed.step() - 1.0 / DEFAULT_FIXED_RATE_HZ).abs() < 1e-6);
    }
}
