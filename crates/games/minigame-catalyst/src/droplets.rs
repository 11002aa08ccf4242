use glam::Vec2;
use rand::Rng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use minigame_core::timer::Countdown;

use crate::collision::Aabb;
use crate::flask::{DropletType, FlaskDisplay};
use crate::player::PlayerStateMachine;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DropletConfig {
    pub spawn_min_x: f32,
    pub spawn_max_x: f32,
    pub spawn_y: f32,
    pub move_speed: f32,
    pub spawn_interval: f32,
    pub lifetime: f32,
    pub half_extents: Vec2,
}

impl Default for DropletConfig {
    fn default() -> Self {
        Self {
            spawn_min_x: -8.0,
            spawn_max_x: 8.0,
            spawn_y: 1.0,
            move_speed: 1.0,
            spawn_interval: 1.0,
            lifetime: 3.0,
            half_extents: Vec2::new(0.25, 0.25),
        }
    }
}

/// A falling droplet waiting to be caught.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Droplet {
    pub kind: DropletType,
    pub position: Vec2,
    lifetime: Countdown,
}

impl Droplet {
    pub fn bounds(&self, half_extents: Vec2) -> Aabb {
        Aabb {
            center: self.position,
            half_extents,
        }
    }
}

/// Spawns droplets from a shuffle bag so every color appears once per
/// round of four.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DropletSpawner {
    config: DropletConfig,
    bag: Vec<DropletType>,
    spawn_timer: f32,
    droplets: Vec<Droplet>,
}

impl DropletSpawner {
    pub fn new(config: DropletConfig) -> Self {
        Self {
            config,
            bag: DropletType::ALL.to_vec(),
            spawn_timer: 0.0,
            droplets: Vec::new(),
        }
    }

    pub fn droplets(&self) -> &[Droplet] {
        &self.droplets
    }

    /// Pick a type uniformly from the bag, refilling it once empty.
    pub fn draw(&mut self, rng: &mut StdRng) -> DropletType {
        if self.bag.is_empty() {
            self.bag.extend(DropletType::ALL);
        }
        let index = rng.random_range(0..self.bag.len());
        let kind = self.bag.remove(index);
        if self.bag.is_empty() {
            self.bag.extend(DropletType::ALL);
        }
        kind
    }

    /// Spawn on schedule, move, and expire droplets. Returns what spawned.
    pub fn step(&mut self, dt: f32, rng: &mut StdRng) -> Option<DropletType> {
        let fall = self.config.move_speed * dt;
        for droplet in &mut self.droplets {
            droplet.position.y -= fall;
            droplet.lifetime.tick(dt);
        }
        self.droplets.retain(|d| d.lifetime.is_active());

        self.spawn_timer -= dt;
        if self.spawn_timer > 0.0 {
            return None;
        }
        self.spawn_timer = self.config.spawn_interval;
        let kind = self.draw(rng);
        let (lo, hi) = if self.config.spawn_min_x <= self.config.spawn_max_x {
            (self.config.spawn_min_x, self.config.spawn_max_x)
        } else {
            (self.config.spawn_max_x, self.config.spawn_min_x)
        };
        let x = rng.random_range(lo..=hi);
        self.droplets.push(Droplet {
            kind,
            position: Vec2::new(x, self.config.spawn_y),
            lifetime: Countdown::new(self.config.lifetime),
        });
        Some(kind)
    }

    /// Hand overlapping droplets to the player. Droplets the player cannot
    /// hold stay in the world.
    pub fn deliver(
        &mut self,
        player: &mut PlayerStateMachine,
        display: &mut dyn FlaskDisplay,
    ) -> Vec<DropletType> {
        let half = self.config.half_extents;
        let mut caught = Vec::new();
        self.droplets.retain(|d| {
            if d.bounds(half).overlaps(player.bounds()) && player.add_to_flask(d.kind, display) {
                caught.push(d.kind);
                false
            } else {
                true
            }
        });
        caught
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;

    use super::*;
    use crate::flask::NoDisplay;
    use crate::player::PlayerConfig;

    fn spawner() -> DropletSpawner {
        DropletSpawner::new(DropletConfig::default())
    }

    #[test]
    fn spawns_immediately_then_on_interval() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut s = spawner();
        assert!(s.step(0.02, &mut rng).is_some());
        let mut spawned = 1;
        for _ in 0..120 {
            if s.step(0.02, &mut rng).is_some() {
                spawned += 1;
            }
        }
        assert_eq!(spawned, 3, "one at t=0, then every second");
    }

    #[test]
    fn droplets_fall_and_expire() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut s = spawner();
        s.step(0.0, &mut rng);
        let y0 = s.droplets()[0].position.y;
        s.step(0.5, &mut rng);
        assert!((s.droplets()[0].position.y - (y0 - 0.5)).abs() < 1e-5);
        for _ in 0..6 {
            s.step(0.5, &mut rng);
        }
        assert!(s.droplets().iter().all(|d| d.position.y > y0 - 3.0 - 1e-3));
    }

    #[test]
    fn spawn_x_within_platform() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut s = spawner();
        for _ in 0..50 {
            s.step(1.0, &mut rng);
        }
        assert!(s.droplets().iter().all(|d| (-8.0..=8.0).contains(&d.position.x)));
    }

    #[test]
    fn full_flask_leaves_droplet_in_world() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut s = spawner();
        s.step(0.0, &mut rng);
        let at = s.droplets()[0].position;
        let config = PlayerConfig {
            flask_capacity: 1,
            ..Default::default()
        };
        let mut player = PlayerStateMachine::new(config, at).unwrap();
        assert_eq!(s.deliver(&mut player, &mut NoDisplay).len(), 1);
        assert!(s.droplets().is_empty());

        s.step(1.0, &mut rng);
        player.set_position(s.droplets()[0].position);
        assert!(s.deliver(&mut player, &mut NoDisplay).is_empty());
        assert_eq!(s.droplets().len(), 1);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn every_round_of_four_covers_all_colors(seed in any::<u64>(), rounds in 1usize..10) {
                let mut rng = StdRng::seed_from_u64(seed);
                let mut s = spawner();
                for _ in 0..rounds {
                    let mut seen: Vec<_> = (0..4).map(|_| s.draw(&mut rng).index()).collect();
                    seen.sort_unstable();
                    prop_assert_eq!(seen, vec![0, 1, 2, 3]);
                }
            }
        }
    }
}
