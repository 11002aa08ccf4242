use serde::{Deserialize, Serialize};

use crate::math::{Vec2, Vec2Ext};

/// Press/release edges seen for one button since the last physics step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonEdges {
    pub pressed: bool,
    pub released: bool,
}

impl ButtonEdges {
    pub const PRESS: Self = Self {
        pressed: true,
        released: false,
    };
    pub const RELEASE: Self = Self {
        pressed: false,
        released: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.pressed && !self.released
    }
}

/// Decoded input for one frame: a 2D move vector plus discrete action edges.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct InputFrame {
    pub move_dir: Vec2,
    /// Primary action (jump / interact).
    pub interact: ButtonEdges,
    /// Secondary action (ground slam).
    pub ground_slam: ButtonEdges,
}

impl InputFrame {
    pub fn moving(move_dir: Vec2) -> Self {
        Self {
            move_dir,
            ..Default::default()
        }
    }

    /// Fold a newer frame into this pending one.
    ///
    /// The move vector is always replaced by the latest value; edges
    /// accumulate so a press is not lost when a later frame without it
    /// arrives before the next physics step.
    pub fn merge(&mut self, newer: InputFrame) {
        self.move_dir = newer.move_dir.sanitized();
        self.interact.pressed |= newer.interact.pressed;
        self.interact.released |= newer.interact.released;
        self.ground_slam.pressed |= newer.ground_slam.pressed;
        self.ground_slam.released |= newer.ground_slam.released;
    }

    /// Drop consumed edges, keeping the held move vector.
    pub fn clear_edges(&mut self) {
        self.interact = ButtonEdges::default();
        self.ground_slam = ButtonEdges::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn press_survives_later_frame_without_it() {
        let mut pending = InputFrame {
            move_dir: Vec2::X,
            interact: ButtonEdges::PRESS,
            ..Default::default()
        };
        pending.merge(InputFrame::moving(Vec2::NEG_X));
        assert!(pending.interact.pressed);
        assert_eq!(pending.move_dir, Vec2::NEG_X);
    }

    #[test]
    fn clear_edges_keeps_move() {
        let mut pending = InputFrame {
            move_dir: Vec2::NEG_Y,
            ground_slam: ButtonEdges::PRESS,
            ..Default::default()
        };
        pending.clear_edges();
        assert!(pending.ground_slam.is_empty());
        assert_eq!(pending.move_dir, Vec2::NEG_Y);
    }

    #[test]
    fn merge_sanitizes_move() {
        let mut pending = InputFrame::default();
        pending.merge(InputFrame::moving(Vec2::new(f32::NAN, 1.0)));
        assert_eq!(pending.move_dir, Vec2::new(0.0, 1.0));
    }
}
