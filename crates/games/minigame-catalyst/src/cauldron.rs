use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::collision::{Aabb, CollisionMask, ObstacleId, StaticWorld};
use crate::error::ConfigError;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CauldronConfig {
    pub start: Vec2,
    /// End point relative to `start`.
    pub local_end: Vec2,
    pub move_speed: f32,
    pub half_extents: Vec2,
}

impl Default for CauldronConfig {
    fn default() -> Self {
        Self {
            start: Vec2::new(-6.0, -2.1),
            local_end: Vec2::new(12.0, 0.0),
            move_speed: 1.5,
            half_extents: Vec2::new(1.0, 0.4),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
enum Heading {
    ToStart,
    ToEnd,
}

/// Deposit target that ping-pongs between two points, dragging its
/// obstacle along.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cauldron {
    start: Vec2,
    end: Vec2,
    position: Vec2,
    move_speed: f32,
    heading: Heading,
    obstacle: ObstacleId,
}

impl Cauldron {
    pub fn spawn(config: &CauldronConfig, world: &mut StaticWorld) -> Result<Self, ConfigError> {
        let bounds = Aabb::new(config.start, config.half_extents)?;
        let obstacle = world.add(bounds, CollisionMask::DEPOSIT_TARGET);
        Ok(Self {
            start: config.start,
            end: config.start + config.local_end,
            position: config.start,
            move_speed: config.move_speed.max(0.0),
            heading: Heading::ToEnd,
            obstacle,
        })
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn obstacle(&self) -> ObstacleId {
        self.obstacle
    }

    pub fn step(&mut self, dt: f32, world: &mut StaticWorld) {
        let target = match self.heading {
            Heading::ToStart => self.start,
            Heading::ToEnd => self.end,
        };
        self.position = self.position.move_towards(target, self.move_speed * dt);
        if self.position == target {
            self.heading = match self.heading {
                Heading::ToStart => Heading::ToEnd,
                Heading::ToEnd => Heading::ToStart,
            };
        }
        world.set_center(self.obstacle, self.position);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cauldron() -> (Cauldron, StaticWorld) {
        let mut world = StaticWorld::new();
        let config = CauldronConfig {
            start: Vec2::ZERO,
            local_end: Vec2::new(2.0, 0.0),
            move_speed: 1.0,
            ..Default::default()
        };
        (Cauldron::spawn(&config, &mut world).unwrap(), world)
    }

    #[test]
    fn obstacle_follows_cauldron() {
        let (mut c, mut world) = cauldron();
        c.step(0.5, &mut world);
        let obstacle = world.obstacle(c.obstacle()).unwrap();
        assert_eq!(obstacle.bounds.center, Vec2::new(0.5, 0.0));
        assert_eq!(obstacle.layers, CollisionMask::DEPOSIT_TARGET);
    }

    #[test]
    fn ping_pongs_between_endpoints() {
        let (mut c, mut world) = cauldron();
        for _ in 0..4 {
            c.step(0.5, &mut world);
        }
        assert_eq!(c.position(), Vec2::new(2.0, 0.0));
        c.step(0.5, &mut world);
        assert_eq!(c.position(), Vec2::new(1.5, 0.0), "turned around");
        for _ in 0..3 {
            c.step(0.5, &mut world);
        }
        assert_eq!(c.position(), Vec2::ZERO);
        c.step(0.5, &mut world);
        assert_eq!(c.position(), Vec2::new(0.5, 0.0));
    }
}
