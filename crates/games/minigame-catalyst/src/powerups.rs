use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::player::PlayerStateMachine;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PowerupConfig {
    pub pounce_charges: u32,
    pub duration: f32,
    pub pickup_radius: f32,
    pub float_speed: f32,
    pub float_height: f32,
    /// Degrees per second.
    pub rotation_speed: f32,
    pub spawn_points: Vec<Vec2>,
}

impl Default for PowerupConfig {
    fn default() -> Self {
        Self {
            pounce_charges: 3,
            duration: 10.0,
            pickup_radius: 1.0,
            float_speed: 2.0,
            float_height: 0.3,
            rotation_speed: 30.0,
            spawn_points: vec![Vec2::new(8.0, -1.8)],
        }
    }
}

/// Floating pounce pickup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PowerupPickup {
    origin: Vec2,
    pub position: Vec2,
    pub rotation_deg: f32,
    pub collected: bool,
}

impl PowerupPickup {
    pub fn new(origin: Vec2) -> Self {
        Self {
            origin,
            position: origin,
            rotation_deg: 0.0,
            collected: false,
        }
    }

    /// Bob and spin. Presentation only; pickup range uses the bobbed position.
    pub fn animate(&mut self, time: f32, dt: f32, config: &PowerupConfig) {
        self.position.y = self.origin.y + (time * config.float_speed).sin() * config.float_height;
        self.rotation_deg = (self.rotation_deg + config.rotation_speed * dt).rem_euclid(360.0);
    }

    /// Grant the power-up if the player is in range. Returns whether it was
    /// collected this call.
    pub fn try_collect(&mut self, player: &mut PlayerStateMachine, config: &PowerupConfig) -> bool {
        if self.collected || player.is_dead() {
            return false;
        }
        if self.position.distance(player.position()) >= config.pickup_radius {
            return false;
        }
        player.collect_powerup(config.pounce_charges, config.duration);
        self.collected = true;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::player::PlayerConfig;

    #[test]
    fn collected_once_within_radius() {
        let config = PowerupConfig::default();
        let mut pickup = PowerupPickup::new(Vec2::new(5.0, 0.0));
        let mut player = PlayerStateMachine::new(PlayerConfig::default(), Vec2::ZERO).unwrap();
        assert!(!pickup.try_collect(&mut player, &config));

        player.set_position(Vec2::new(4.5, 0.0));
        assert!(pickup.try_collect(&mut player, &config));
        assert_eq!(player.pounce_charges(), 3);
        assert!(player.is_powered_up());

        assert!(!pickup.try_collect(&mut player, &config));
        assert_eq!(player.pounce_charges(), 3);
    }

    #[test]
    fn animation_bobs_around_origin() {
        let config = PowerupConfig::default();
        let mut pickup = PowerupPickup::new(Vec2::ZERO);
        for i in 0..100 {
            pickup.animate(i as f32 * 0.05, 0.05, &config);
            assert!(pickup.position.y.abs() <= config.float_height + 1e-6);
            assert_eq!(pickup.position.x, 0.0);
        }
        assert!((pickup.rotation_deg - 150.0).abs() < 1e-3);
    }
}
