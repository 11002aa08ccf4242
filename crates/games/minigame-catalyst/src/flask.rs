use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Default number of flask layers.
pub const FLASK_CAPACITY: usize = 10;

/// Linear RGBA color in `0.0..=1.0`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Rgba {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Rgba {
    pub const TRANSPARENT: Self = Self::new(0.0, 0.0, 0.0, 0.0);
    pub const WHITE: Self = Self::new(1.0, 1.0, 1.0, 1.0);
    pub const CYAN: Self = Self::new(0.0, 1.0, 1.0, 1.0);
    pub const YELLOW: Self = Self::new(1.0, 0.92, 0.016, 1.0);

    pub const fn new(r: f32, g: f32, b: f32, a: f32) -> Self {
        Self { r, g, b, a }
    }

    pub fn with_alpha(self, a: f32) -> Self {
        Self { a, ..self }
    }
}

/// Droplet colors the player can collect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DropletType {
    Blue,
    Green,
    Red,
    Cyan,
}

impl DropletType {
    pub const COUNT: usize = 4;
    pub const ALL: [DropletType; Self::COUNT] = [
        DropletType::Blue,
        DropletType::Green,
        DropletType::Red,
        DropletType::Cyan,
    ];

    pub fn index(self) -> usize {
        match self {
            DropletType::Blue => 0,
            DropletType::Green => 1,
            DropletType::Red => 2,
            DropletType::Cyan => 3,
        }
    }

    pub fn color(self) -> Rgba {
        match self {
            DropletType::Blue => Rgba::new(0.3, 0.6, 0.8, 1.0),
            DropletType::Green => Rgba::new(0.3, 0.9, 0.3, 1.0),
            DropletType::Red => Rgba::new(0.9, 0.1, 0.1, 1.0),
            DropletType::Cyan => Rgba::new(0.153, 0.92, 0.67, 1.0),
        }
    }
}

/// Receives the full layer color array whenever flask occupancy changes.
pub trait FlaskDisplay {
    fn set_layer_colors(&mut self, colors: &[Rgba]);
}

/// Display that drops every update; used when nothing renders the flask.
#[derive(Debug, Default)]
pub struct NoDisplay;

impl FlaskDisplay for NoDisplay {
    fn set_layer_colors(&mut self, _colors: &[Rgba]) {}
}

/// How the flask is carried; switches to `Pouring` during a deposit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CarryPose {
    #[default]
    Held,
    Pouring,
}

/// Bounded ordered inventory. Occupied slots always form a prefix: fills go
/// to the lowest empty slot and drains come from the highest occupied one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Flask {
    slots: Vec<Option<DropletType>>,
}

impl Flask {
    pub fn new(capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::EmptyFlask);
        }
        Ok(Self {
            slots: vec![None; capacity],
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn len(&self) -> usize {
        self.slots.iter().take_while(|s| s.is_some()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.slots[0].is_none()
    }

    pub fn is_full(&self) -> bool {
        self.len() == self.capacity()
    }

    pub fn slots(&self) -> &[Option<DropletType>] {
        &self.slots
    }

    /// Store a droplet in the first empty slot. Returns `false` when full.
    pub fn add(&mut self, kind: DropletType, display: &mut dyn FlaskDisplay) -> bool {
        match self.slots.iter_mut().find(|s| s.is_none()) {
            Some(slot) => {
                *slot = Some(kind);
                display.set_layer_colors(&self.colors());
                true
            },
            None => false,
        }
    }

    /// Remove the topmost droplet so it can be scored.
    pub fn score_top(&mut self, display: &mut dyn FlaskDisplay) -> Option<DropletType> {
        let top = self.slots.iter_mut().rev().find(|s| s.is_some())?;
        let kind = top.take();
        display.set_layer_colors(&self.colors());
        kind
    }

    /// Empty every slot, returning what was held bottom-first.
    pub fn drain_all(&mut self, display: &mut dyn FlaskDisplay) -> Vec<DropletType> {
        let drained: Vec<_> = self.slots.iter_mut().filter_map(Option::take).collect();
        if !drained.is_empty() {
            display.set_layer_colors(&self.colors());
        }
        drained
    }

    /// Per-slot colors, transparent for empty slots.
    pub fn colors(&self) -> Vec<Rgba> {
        self.slots
            .iter()
            .map(|s| s.map_or(Rgba::TRANSPARENT, DropletType::color))
            .collect()
    }
}
