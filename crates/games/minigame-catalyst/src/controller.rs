use glam::Vec2;
use serde::{Deserialize, Serialize};

use minigame_core::math::Vec2Ext;

use crate::collision::{Aabb, CollisionMask, CollisionResolver, RayConfig, StaticWorld, TouchState};
use crate::error::ConfigError;

/// Owns one body and moves it through the world with collision clipping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorController {
    body: Aabb,
    resolver: CollisionResolver,
    mask: CollisionMask,
    touch: TouchState,
}

impl ActorController {
    /// Fails when the body is degenerate or too thin for the skin width.
    pub fn new(body: Aabb, rays: &RayConfig, mask: CollisionMask) -> Result<Self, ConfigError> {
        let body = Aabb::new(body.center, body.half_extents)?;
        let resolver = CollisionResolver::new(rays)?;
        if !resolver.fits(&body) {
            return Err(ConfigError::InvalidSkinWidth {
                skin: resolver.skin_width(),
            });
        }
        Ok(Self {
            body,
            resolver,
            mask,
            touch: TouchState::default(),
        })
    }

    /// Move by `displacement`, clipped against the world. Returns the
    /// displacement actually applied. The touch snapshot is rebuilt from
    /// scratch on every call.
    pub fn move_by(&mut self, displacement: Vec2, world: &StaticWorld) -> Vec2 {
        self.touch.reset();
        let displacement = displacement.sanitized();
        if displacement == Vec2::ZERO {
            return Vec2::ZERO;
        }
        let res = self.resolver.resolve(&self.body, displacement, world, self.mask);
        self.body.center += res.displacement;
        self.touch = res.touch;
        res.displacement
    }

    pub fn position(&self) -> Vec2 {
        self.body.center
    }

    /// Teleport without collision.
    pub fn set_position(&mut self, position: Vec2) {
        self.body.center = position;
    }

    pub fn bounds(&self) -> &Aabb {
        &self.body
    }

    pub fn touch(&self) -> TouchState {
        self.touch
    }

    pub fn grounded(&self) -> bool {
        self.touch.below
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn controller_on_floor() -> (ActorController, StaticWorld) {
        let mut world = StaticWorld::new();
        world.add(
            Aabb::from_min_max(Vec2::new(-10.0, -1.0), Vec2::new(10.0, 0.0)).unwrap(),
            CollisionMask::GROUND,
        );
        let body = Aabb::new(Vec2::new(0.0, 0.5), Vec2::new(0.5, 0.5)).unwrap();
        let ctrl = ActorController::new(
            body,
            &RayConfig {
                skin_width: 0.1,
                ..Default::default()
            },
            CollisionMask::GROUND,
        )
        .unwrap();
        (ctrl, world)
    }

    #[test]
    fn skin_wider_than_body_rejected() {
        let body = Aabb::new(Vec2::ZERO, Vec2::new(0.2, 1.0)).unwrap();
        let err = ActorController::new(body, &RayConfig::default(), CollisionMask::GROUND);
        assert!(matches!(err, Err(ConfigError::InvalidSkinWidth { .. })));
    }

    #[test]
    fn touch_snapshot_reset_every_move() {
        let (mut ctrl, world) = controller_on_floor();
        ctrl.move_by(Vec2::new(0.0, -0.1), &world);
        assert!(ctrl.grounded());

        ctrl.move_by(Vec2::new(0.0, 1.0), &world);
        assert!(!ctrl.grounded(), "moving up clears the below flag");

        ctrl.move_by(Vec2::ZERO, &world);
        assert_eq!(ctrl.touch(), TouchState::default());
    }

    #[test]
    fn translates_body_by_clipped_amount() {
        let (mut ctrl, world) = controller_on_floor();
        ctrl.set_position(Vec2::new(0.0, 1.5));
        let applied = ctrl.move_by(Vec2::new(1.0, -5.0), &world);
        assert!((applied.x - 1.0).abs() < 1e-5);
        assert!((applied.y + 1.0).abs() < 1e-5);
        assert!((ctrl.position().y - 0.5).abs() < 1e-5);
        assert!((ctrl.bounds().min().y).abs() < 1e-5);
    }

    #[test]
    fn non_finite_displacement_is_ignored() {
        let (mut ctrl, world) = controller_on_floor();
        let before = ctrl.position();
        ctrl.move_by(Vec2::new(f32::NAN, f32::INFINITY), &world);
        assert_eq!(ctrl.position(), before);
    }
}
