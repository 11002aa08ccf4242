//! Positions, velocities and input directions use `glam::Vec2`.

pub use glam::Vec2;

/// Input hygiene for vectors arriving from outside the simulation.
pub trait Vec2Ext {
    /// Replace NaN/Inf components with zero.
    fn sanitized(self) -> Self;
}

impl Vec2Ext for Vec2 {
    fn sanitized(self) -> Self {
        let fix = |v: f32| if v.is_finite() { v } else { 0.0 };
        Vec2::new(fix(self.x), fix(self.y))
    }
}
