//! Raycast collision against a set of static axis-aligned obstacles.
//!
//! Each move is resolved one axis at a time, horizontal first, then vertical
//! with the ray fan shifted by the already-clipped horizontal displacement.
//! This is an approximation: some diagonal approaches onto a ledge corner
//! catch on the corner ("ledge snagging") rather than sliding past it.

use bitflags::bitflags;
use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default inset used to keep rays from starting on the body's own edge.
pub const SKIN_WIDTH: f32 = 0.3;
/// Default rays per face.
pub const RAY_COUNT: usize = 4;
/// A face needs at least two rays to span it.
pub const MIN_RAY_COUNT: usize = 2;

bitflags! {
    /// Layers an obstacle belongs to / a query collides with.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct CollisionMask: u32 {
        const GROUND = 1 << 0;
        const DEPOSIT_TARGET = 1 << 1;
    }
}

/// Axis-aligned rectangle given by its center and half-extents.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub center: Vec2,
    pub half_extents: Vec2,
}

impl Aabb {
    /// Build a body. Half-extents must be strictly positive.
    pub fn new(center: Vec2, half_extents: Vec2) -> Result<Self, ConfigError> {
        if !(half_extents.x > 0.0 && half_extents.y > 0.0) {
            return Err(ConfigError::NonPositiveExtents {
                x: half_extents.x,
                y: half_extents.y,
            });
        }
        Ok(Self {
            center,
            half_extents,
        })
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Result<Self, ConfigError> {
        Self::new((min + max) * 0.5, (max - min) * 0.5)
    }

    pub fn min(&self) -> Vec2 {
        self.center - self.half_extents
    }

    pub fn max(&self) -> Vec2 {
        self.center + self.half_extents
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        (self.center.x - other.center.x).abs() < self.half_extents.x + other.half_extents.x
            && (self.center.y - other.center.y).abs() < self.half_extents.y + other.half_extents.y
    }

    /// Shrink every side by `amount`.
    fn inset(&self, amount: f32) -> Aabb {
        Aabb {
            center: self.center,
            half_extents: self.half_extents - Vec2::new(amount, amount),
        }
    }

    /// Entry distance of an axis-aligned or general ray, if within `max_dist`.
    /// A ray starting inside the box hits at distance zero.
    fn ray_entry(&self, origin: Vec2, dir: Vec2, max_dist: f32) -> Option<f32> {
        let (min, max) = (self.min(), self.max());
        let mut t_near = 0.0f32;
        let mut t_far = max_dist;
        for (o, d, lo, hi) in [(origin.x, dir.x, min.x, max.x), (origin.y, dir.y, min.y, max.y)] {
            if d.abs() < f32::EPSILON {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let (t0, t1) = {
                let a = (lo - o) * inv;
                let b = (hi - o) * inv;
                if a <= b { (a, b) } else { (b, a) }
            };
            t_near = t_near.max(t0);
            t_far = t_far.min(t1);
            if t_near > t_far {
                return None;
            }
        }
        Some(t_near)
    }
}

/// Handle to an obstacle registered in a [`StaticWorld`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObstacleId(pub usize);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Obstacle {
    pub bounds: Aabb,
    pub layers: CollisionMask,
}

/// Nearest obstacle hit by a ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub distance: f32,
    pub obstacle: ObstacleId,
}

/// Obstacle set the resolver casts against. Obstacles are static for the
/// duration of one physics step; scripted movers reposition theirs between
/// steps.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StaticWorld {
    obstacles: Vec<Obstacle>,
}

impl StaticWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, bounds: Aabb, layers: CollisionMask) -> ObstacleId {
        self.obstacles.push(Obstacle { bounds, layers });
        ObstacleId(self.obstacles.len() - 1)
    }

    pub fn obstacle(&self, id: ObstacleId) -> Option<&Obstacle> {
        self.obstacles.get(id.0)
    }

    /// Move an obstacle's center. Unknown ids are ignored.
    pub fn set_center(&mut self, id: ObstacleId, center: Vec2) {
        if let Some(obstacle) = self.obstacles.get_mut(id.0) {
            obstacle.bounds.center = center;
        }
    }

    /// Cast a ray and return the nearest hit among obstacles on `mask`.
    pub fn raycast(&self, origin: Vec2, dir: Vec2, max_dist: f32, mask: CollisionMask) -> Option<RayHit> {
        let dir = dir.normalize_or_zero();
        if dir == Vec2::ZERO || max_dist.is_nan() || max_dist < 0.0 {
            return None;
        }
        self.obstacles
            .iter()
            .enumerate()
            .filter(|(_, o)| o.layers.intersects(mask))
            .filter_map(|(i, o)| {
                o.bounds.ray_entry(origin, dir, max_dist).map(|distance| RayHit {
                    distance,
                    obstacle: ObstacleId(i),
                })
            })
            .min_by(|a, b| a.distance.total_cmp(&b.distance))
    }
}

/// Which sides touched an obstacle during the last move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TouchState {
    pub left: bool,
    pub right: bool,
    pub above: bool,
    pub below: bool,
}

impl TouchState {
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Clipped displacement plus the contacts found while clipping it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub displacement: Vec2,
    pub touch: TouchState,
}

/// Ray tuning, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RayConfig {
    pub skin_width: f32,
    pub horizontal_ray_count: usize,
    pub vertical_ray_count: usize,
}

impl Default for RayConfig {
    fn default() -> Self {
        Self {
            skin_width: SKIN_WIDTH,
            horizontal_ray_count: RAY_COUNT,
            vertical_ray_count: RAY_COUNT,
        }
    }
}

/// Resolves an intended displacement into an allowed one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CollisionResolver {
    skin_width: f32,
    horizontal_ray_count: usize,
    vertical_ray_count: usize,
}

impl CollisionResolver {
    /// Ray counts below two are clamped; a bad skin width is rejected.
    pub fn new(config: &RayConfig) -> Result<Self, ConfigError> {
        if !(config.skin_width.is_finite() && config.skin_width > 0.0) {
            return Err(ConfigError::InvalidSkinWidth {
                skin: config.skin_width,
            });
        }
        Ok(Self {
            skin_width: config.skin_width,
            horizontal_ray_count: clamp_ray_count(config.horizontal_ray_count, "horizontal"),
            vertical_ray_count: clamp_ray_count(config.vertical_ray_count, "vertical"),
        })
    }

    pub fn skin_width(&self) -> f32 {
        self.skin_width
    }

    pub fn ray_counts(&self) -> (usize, usize) {
        (self.horizontal_ray_count, self.vertical_ray_count)
    }

    /// Whether `body` is large enough for this resolver's skin.
    pub fn fits(&self, body: &Aabb) -> bool {
        body.half_extents.x > self.skin_width && body.half_extents.y > self.skin_width
    }

    /// Clip `displacement` for `body` against obstacles on `mask`.
    ///
    /// Each axis is only ever shortened toward zero, never lengthened or
    /// reversed. Axes without a hit pass through unchanged.
    pub fn resolve(
        &self,
        body: &Aabb,
        displacement: Vec2,
        world: &StaticWorld,
        mask: CollisionMask,
    ) -> Resolution {
        let mut out = displacement;
        let mut touch = TouchState::default();
        let inset = body.inset(self.skin_width);
        let (min, max) = (inset.min(), inset.max());

        if out.x != 0.0 {
            let dir_x = out.x.signum();
            let mut ray_len = out.x.abs() + self.skin_width;
            let origin_x = if dir_x < 0.0 { min.x } else { max.x };
            let spacing = (max.y - min.y) / (self.horizontal_ray_count - 1) as f32;
            for i in 0..self.horizontal_ray_count {
                let origin = Vec2::new(origin_x, min.y + spacing * i as f32);
                if let Some(hit) = world.raycast(origin, Vec2::new(dir_x, 0.0), ray_len, mask) {
                    out.x = (hit.distance - self.skin_width).max(0.0) * dir_x;
                    ray_len = hit.distance;
                    touch.left = dir_x < 0.0;
                    touch.right = dir_x > 0.0;
                }
            }
        }

        if out.y != 0.0 {
            let dir_y = out.y.signum();
            let mut ray_len = out.y.abs() + self.skin_width;
            let origin_y = if dir_y < 0.0 { min.y } else { max.y };
            let spacing = (max.x - min.x) / (self.vertical_ray_count - 1) as f32;
            for i in 0..self.vertical_ray_count {
                let origin = Vec2::new(min.x + spacing * i as f32 + out.x, origin_y);
                if let Some(hit) = world.raycast(origin, Vec2::new(0.0, dir_y), ray_len, mask) {
                    out.y = (hit.distance - self.skin_width).max(0.0) * dir_y;
                    ray_len = hit.distance;
                    touch.below = dir_y < 0.0;
                    touch.above = dir_y > 0.0;
                }
            }
        }

        Resolution {
            displacement: out,
            touch,
        }
    }
}

fn clamp_ray_count(count: usize, face: &str) -> usize {
    if count < MIN_RAY_COUNT {
        tracing::warn!("{face} ray count {count} is below {MIN_RAY_COUNT}, clamping");
        MIN_RAY_COUNT
    } else {
        count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SKIN: f32 = 0.1;

    fn resolver() -> CollisionResolver {
        CollisionResolver::new(&RayConfig {
            skin_width: SKIN,
            ..Default::default()
        })
        .unwrap()
    }

    fn block(min: (f32, f32), max: (f32, f32)) -> Aabb {
        Aabb::from_min_max(Vec2::new(min.0, min.1), Vec2::new(max.0, max.1)).unwrap()
    }

    /// Floor whose top surface is at y = 0.
    fn floor_world() -> StaticWorld {
        let mut world = StaticWorld::new();
        world.add(block((-20.0, -2.0), (20.0, 0.0)), CollisionMask::GROUND);
        world
    }

    fn body_at(x: f32, bottom: f32) -> Aabb {
        Aabb::new(Vec2::new(x, bottom + 0.5), Vec2::new(0.5, 0.5)).unwrap()
    }

    #[test]
    fn rejects_non_positive_extents() {
        assert!(Aabb::new(Vec2::ZERO, Vec2::new(0.0, 1.0)).is_err());
        assert!(Aabb::new(Vec2::ZERO, Vec2::new(1.0, -1.0)).is_err());
    }

    #[test]
    fn ray_count_below_two_is_clamped() {
        let r = CollisionResolver::new(&RayConfig {
            skin_width: SKIN,
            horizontal_ray_count: 1,
            vertical_ray_count: 0,
        })
        .unwrap();
        assert_eq!(r.ray_counts(), (2, 2));
    }

    #[test]
    fn invalid_skin_rejected() {
        let err = CollisionResolver::new(&RayConfig {
            skin_width: 0.0,
            ..Default::default()
        });
        assert!(matches!(err, Err(ConfigError::InvalidSkinWidth { .. })));
    }

    #[test]
    fn no_obstacles_leaves_displacement_untouched() {
        let world = StaticWorld::new();
        let res = resolver().resolve(&body_at(0.0, 5.0), Vec2::new(0.3, -0.4), &world, CollisionMask::GROUND);
        assert_eq!(res.displacement, Vec2::new(0.3, -0.4));
        assert_eq!(res.touch, TouchState::default());
    }

    #[test]
    fn resting_body_reports_below_with_zero_drop() {
        let world = floor_world();
        let res = resolver().resolve(&body_at(0.0, 0.0), Vec2::new(0.0, -0.02), &world, CollisionMask::GROUND);
        assert!(res.touch.below);
        assert!(res.displacement.y.abs() < 1e-5, "dy = {}", res.displacement.y);
    }

    #[test]
    fn falling_body_lands_on_floor_top() {
        let world = floor_world();
        let body = body_at(0.0, 0.3);
        let res = resolver().resolve(&body, Vec2::new(0.0, -1.0), &world, CollisionMask::GROUND);
        assert!(res.touch.below);
        assert!((res.displacement.y + 0.3).abs() < 1e-5);
    }

    #[test]
    fn wall_clips_horizontal_and_sets_side() {
        let mut world = floor_world();
        world.add(block((2.0, 0.0), (3.0, 4.0)), CollisionMask::GROUND);
        let body = body_at(1.0, 0.0);
        let res = resolver().resolve(&body, Vec2::new(2.0, 0.0), &world, CollisionMask::GROUND);
        assert!(res.touch.right);
        assert!(!res.touch.left);
        assert!((res.displacement.x - 0.5).abs() < 1e-5);

        let res = resolver().resolve(&body_at(4.0, 0.0), Vec2::new(-2.0, 0.0), &world, CollisionMask::GROUND);
        assert!(res.touch.left);
        assert!((res.displacement.x + 0.5).abs() < 1e-5);
    }

    #[test]
    fn ceiling_sets_above() {
        let mut world = StaticWorld::new();
        world.add(block((-5.0, 2.0), (5.0, 3.0)), CollisionMask::GROUND);
        let res = resolver().resolve(&body_at(0.0, 0.0), Vec2::new(0.0, 3.0), &world, CollisionMask::GROUND);
        assert!(res.touch.above);
        assert!((res.displacement.y - 1.0).abs() < 1e-5);
    }

    #[test]
    fn mask_filters_layers() {
        let mut world = StaticWorld::new();
        world.add(block((-5.0, -1.0), (5.0, 0.0)), CollisionMask::DEPOSIT_TARGET);
        let res = resolver().resolve(&body_at(0.0, 0.0), Vec2::new(0.0, -0.5), &world, CollisionMask::GROUND);
        assert!(!res.touch.below);
        assert_eq!(res.displacement.y, -0.5);
    }

    #[test]
    fn vertical_rays_follow_clipped_horizontal_motion() {
        // Ledge starts at x = 1.0; the body only reaches it after its
        // horizontal move is applied.
        let mut world = StaticWorld::new();
        world.add(block((1.0, -1.0), (5.0, 0.0)), CollisionMask::GROUND);
        let body = body_at(0.4, 0.05);
        let res = resolver().resolve(&body, Vec2::new(0.5, -0.1), &world, CollisionMask::GROUND);
        assert!(res.touch.below, "shifted ray fan should find the ledge");
        assert!((res.displacement.y + 0.05).abs() < 1e-5);

        let still = resolver().resolve(&body, Vec2::new(0.0, -0.1), &world, CollisionMask::GROUND);
        assert!(!still.touch.below);
    }

    #[test]
    fn raycast_from_inside_hits_at_zero() {
        let world = floor_world();
        let hit = world
            .raycast(Vec2::new(0.0, -1.0), Vec2::NEG_Y, 1.0, CollisionMask::GROUND)
            .unwrap();
        assert_eq!(hit.distance, 0.0);
        assert_eq!(hit.obstacle, ObstacleId(0));
    }

    #[test]
    fn raycast_picks_nearest() {
        let mut world = StaticWorld::new();
        world.add(block((4.0, -1.0), (5.0, 1.0)), CollisionMask::GROUND);
        world.add(block((2.0, -1.0), (3.0, 1.0)), CollisionMask::GROUND);
        let hit = world
            .raycast(Vec2::ZERO, Vec2::X, 10.0, CollisionMask::GROUND)
            .unwrap();
        assert_eq!(hit.obstacle, ObstacleId(1));
        assert!((hit.distance - 2.0).abs() < 1e-6);
        assert!(world.raycast(Vec2::ZERO, Vec2::X, 1.5, CollisionMask::GROUND).is_none());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn arb_block() -> impl Strategy<Value = Aabb> {
            (-6.0f32..6.0, -6.0f32..6.0, 0.1f32..3.0, 0.1f32..3.0).prop_map(|(x, y, w, h)| {
                Aabb::new(Vec2::new(x, y), Vec2::new(w, h)).unwrap()
            })
        }

        proptest! {
            #[test]
            fn resolve_never_amplifies(
                blocks in proptest::collection::vec(arb_block(), 0..8),
                rays in 2usize..8,
                dx in -3.0f32..3.0,
                dy in -3.0f32..3.0,
            ) {
                let mut world = StaticWorld::new();
                for b in blocks {
                    world.add(b, CollisionMask::GROUND);
                }
                let r = CollisionResolver::new(&RayConfig {
                    skin_width: SKIN,
                    horizontal_ray_count: rays,
                    vertical_ray_count: rays,
                })
                .unwrap();
                let body = Aabb::new(Vec2::ZERO, Vec2::new(0.5, 0.8)).unwrap();
                let res = r.resolve(&body, Vec2::new(dx, dy), &world, CollisionMask::GROUND);
                prop_assert!(res.displacement.x.abs() <= dx.abs() + 1e-6);
                prop_assert!(res.displacement.y.abs() <= dy.abs() + 1e-6);
                prop_assert!(res.displacement.x * dx >= 0.0, "never reverses x");
                prop_assert!(res.displacement.y * dy >= 0.0, "never reverses y");
            }
        }
    }
}
