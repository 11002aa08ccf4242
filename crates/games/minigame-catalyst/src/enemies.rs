use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use minigame_core::session::Session;

use crate::collision::Aabb;
use crate::flask::FlaskDisplay;
use crate::player::PlayerStateMachine;

/// Per-enemy tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemyConfig {
    pub move_speed: f32,
    pub left_boundary: f32,
    pub right_boundary: f32,
    pub health: i32,
    pub contact_damage: i32,
    pub knockback_force: f32,
    pub half_extents: Vec2,
    /// Enemies enter from `-spawn_x` (walking right) or `+spawn_x` (walking left).
    pub spawn_x: f32,
    pub spawn_y: f32,
}

impl Default for EnemyConfig {
    fn default() -> Self {
        Self {
            move_speed: 2.0,
            left_boundary: -16.0,
            right_boundary: 11.0,
            health: 3,
            contact_damage: 1,
            knockback_force: 20.0,
            half_extents: Vec2::new(0.5, 0.5),
            spawn_x: 12.0,
            spawn_y: -1.8,
        }
    }
}

/// Spawn schedule.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnemySpawnerConfig {
    pub spawn_interval_min: f32,
    pub spawn_interval_max: f32,
    pub auto_start: bool,
    pub max_enemies: u32,
    /// Ignore `max_enemies` and keep spawning.
    pub continuous_spawning: bool,
}

impl Default for EnemySpawnerConfig {
    fn default() -> Self {
        Self {
            spawn_interval_min: 3.0,
            spawn_interval_max: 4.5,
            auto_start: true,
            max_enemies: 2,
            continuous_spawning: false,
        }
    }
}

/// A walker that hurts the player on contact.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enemy {
    pub id: u32,
    pub position: Vec2,
    pub moving_right: bool,
    pub health: i32,
    /// Overlapping the player last step; contact damage fires on entry only.
    touching_player: bool,
}

impl Enemy {
    pub fn bounds(&self, half_extents: Vec2) -> Aabb {
        Aabb {
            center: self.position,
            half_extents,
        }
    }

    fn walk_direction(&self) -> Vec2 {
        if self.moving_right { Vec2::X } else { Vec2::NEG_X }
    }

    fn past_boundary(&self, config: &EnemyConfig) -> bool {
        (self.moving_right && self.position.x >= config.right_boundary)
            || (!self.moving_right && self.position.x <= config.left_boundary)
    }

    /// Returns `true` when this hit kills the enemy.
    pub fn take_damage(&mut self, amount: i32) -> bool {
        self.health = (self.health - amount.max(0)).max(0);
        self.health == 0
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnemySpawner {
    enemy: EnemyConfig,
    schedule: EnemySpawnerConfig,
    spawning: bool,
    spawned: u32,
    next_spawn: f32,
    next_id: u32,
    enemies: Vec<Enemy>,
}

impl EnemySpawner {
    pub fn new(enemy: EnemyConfig, schedule: EnemySpawnerConfig) -> Self {
        let spawning = schedule.auto_start;
        Self {
            enemy,
            schedule,
            spawning,
            spawned: 0,
            next_spawn: 0.0,
            next_id: 0,
            enemies: Vec::new(),
        }
    }

    pub fn enemies(&self) -> &[Enemy] {
        &self.enemies
    }

    pub fn is_spawning(&self) -> bool {
        self.spawning
    }

    /// Spawn one enemy at a random edge.
    pub fn spawn(&mut self, rng: &mut StdRng) {
        let moving_right = rng.random_bool(0.5);
        let x = if moving_right {
            -self.enemy.spawn_x
        } else {
            self.enemy.spawn_x
        };
        let id = self.next_id;
        self.next_id += 1;
        tracing::debug!(id, moving_right, "enemy spawned");
        self.enemies.push(Enemy {
            id,
            position: Vec2::new(x, self.enemy.spawn_y),
            moving_right,
            health: self.enemy.health,
            touching_player: false,
        });
    }

    pub fn step(&mut self, dt: f32, rng: &mut StdRng) {
        if self.spawning {
            self.next_spawn -= dt;
            if self.next_spawn <= 0.0 {
                if self.schedule.continuous_spawning || self.spawned < self.schedule.max_enemies {
                    self.spawn(rng);
                    self.spawned += 1;
                    let (lo, hi) = ordered(
                        self.schedule.spawn_interval_min,
                        self.schedule.spawn_interval_max,
                    );
                    self.next_spawn = rng.random_range(lo..=hi);
                } else {
                    self.spawning = false;
                }
            }
        }

        let stride = self.enemy.move_speed * dt;
        for enemy in &mut self.enemies {
            enemy.position.x += if enemy.moving_right { stride } else { -stride };
        }
        let config = &self.enemy;
        self.enemies.retain(|e| !e.past_boundary(config));
    }

    /// Damage the player when an enemy starts overlapping it. Returns how
    /// many hits landed.
    pub fn contact(
        &mut self,
        player: &mut PlayerStateMachine,
        session: &mut Session,
        display: &mut dyn FlaskDisplay,
    ) -> u32 {
        let mut landed = 0;
        for enemy in &mut self.enemies {
            let touching = enemy.bounds(self.enemy.half_extents).overlaps(player.bounds());
            if touching
                && !enemy.touching_player
                && player.take_damage(
                    self.enemy.contact_damage,
                    self.enemy.knockback_force,
                    enemy.walk_direction(),
                    session,
                    display,
                )
            {
                landed += 1;
            }
            enemy.touching_player = touching;
        }
        landed
    }

    /// Damage every enemy within `radius` of `center`. Returns the ids killed.
    pub fn apply_impact(&mut self, center: Vec2, radius: f32, damage: i32) -> Vec<u32> {
        let mut killed = Vec::new();
        self.enemies.retain_mut(|e| {
            if e.position.distance(center) <= radius && e.take_damage(damage) {
                killed.push(e.id);
                false
            } else {
                true
            }
        });
        if !killed.is_empty() {
            tracing::info!(count = killed.len(), "enemies destroyed by plunge");
        }
        killed
    }
}

fn ordered(a: f32, b: f32) -> (f32, f32) {
    if a <= b { (a, b) } else { (b, a) }
}
