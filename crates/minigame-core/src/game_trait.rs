use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::input::InputFrame;
use crate::session::{EndReport, Session, SessionConfig, SessionEvent};
use crate::time::DEFAULT_FIXED_RATE_HZ;

/// Core trait that every minigame in the collection implements.
///
/// The host owns the frame loop and input decoding; the minigame owns its
/// [`Session`] and all simulation state.
pub trait Minigame: Send {
    /// Metadata for the minigame picker.
    fn metadata(&self) -> GameMetadata;

    /// Called once before the first frame. Creates a fresh session.
    fn init(&mut self, config: &GameConfig);

    /// Advance one presentation frame by `real_dt` unscaled seconds. Runs the
    /// countdown, any due fixed physics steps, and visual-only timers.
    fn update(&mut self, real_dt: f32) -> Vec<GameEvent>;

    /// Queue decoded input for the next physics step.
    fn apply_input(&mut self, input: InputFrame);

    /// MessagePack snapshot of the simulation state for the presentation layer.
    fn serialize_state(&self) -> Vec<u8>;

    /// Physics rate in Hz.
    fn fixed_rate(&self) -> f32 {
        DEFAULT_FIXED_RATE_HZ
    }

    /// Host-requested pause (e.g. focus lost). Independent of the countdown.
    fn pause(&mut self);

    fn resume(&mut self);

    /// The session gating this minigame.
    fn session(&self) -> &Session;

    /// Whether the session has reached its terminal transition.
    fn is_round_complete(&self) -> bool {
        self.session().is_ended()
    }
}

/// Metadata for the minigame picker.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameMetadata {
    pub name: String,
    pub description: String,
    pub estimated_round_duration: Duration,
}

/// Per-run configuration handed to [`Minigame::init`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub session: SessionConfig,
    /// Free-form overrides (seed, difficulty) interpreted by each minigame.
    pub custom: HashMap<String, serde_json::Value>,
}

impl GameConfig {
    pub fn with_length(minigame_length: f32) -> Self {
        Self {
            session: SessionConfig {
                minigame_length,
                ..Default::default()
            },
            custom: HashMap::new(),
        }
    }

    /// Read an unsigned override from `custom`.
    pub fn custom_u64(&self, key: &str) -> Option<u64> {
        self.custom.get(key).and_then(|v| v.as_u64())
    }
}

/// Events emitted during update for the presentation layer and host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum GameEvent {
    Countdown { remaining: u8 },
    MinigameStarted,
    TimerExpired,
    ScoreUpdate { slot: usize, score: u32, goal: u32 },
    HealthChanged { health: i32, max: i32 },
    ScreenShake { intensity: f32, duration: f32 },
    SessionEnded(EndReport),
}

impl From<SessionEvent> for GameEvent {
    fn from(event: SessionEvent) -> Self {
        match event {
            SessionEvent::Countdown { remaining } => GameEvent::Countdown { remaining },
            SessionEvent::Started => GameEvent::MinigameStarted,
            SessionEvent::TimerExpired => GameEvent::TimerExpired,
        }
    }
}

/// Generates the boilerplate `Minigame` methods shared by every minigame:
/// `serialize_state`, `pause`, `resume`, `session`.
///
/// Requires the implementing struct to have `state: $StateType`,
/// `paused: bool` and `session: Session` fields.
#[macro_export]
macro_rules! minigame_boilerplate {
    (state_type: $StateType:ty) => {
        fn serialize_state(&self) -> Vec<u8> {
            match rmp_serde::to_vec::<$StateType>(&self.state) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::error!("state snapshot failed: {e}");
                    Vec::new()
                },
            }
        }

        fn pause(&mut self) {
            self.paused = true;
        }

        fn resume(&mut self) {
            self.paused = false;
        }

        fn session(&self) -> &$crate::session::Session {
            &self.session
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_events_map_to_game_events() {
        assert_eq!(
            GameEvent::from(SessionEvent::Countdown { remaining: 2 }),
            GameEvent::Countdown { remaining: 2 }
        );
        assert_eq!(
            GameEvent::from(SessionEvent::Started),
            GameEvent::MinigameStarted
        );
    }

    #[test]
    fn custom_override_parsed() {
        let mut config = GameConfig::with_length(10.0);
        config
            .custom
            .insert("seed".to_string(), serde_json::Value::from(7u64));
        assert_eq!(config.custom_u64("seed"), Some(7));
        assert_eq!(config.custom_u64("missing"), None);
        assert_eq!(config.session.minigame_length, 10.0);
    }
}
