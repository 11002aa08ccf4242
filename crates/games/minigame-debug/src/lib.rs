use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

use minigame_core::game_trait::{GameConfig, GameEvent, GameMetadata, Minigame};
use minigame_core::input::InputFrame;
use minigame_core::minigame_boilerplate;
use minigame_core::session::{
    LogExit, MinigameSubscriber, Session, SessionControl, SessionState, SubscriberToken,
};
use minigame_core::time::{DEFAULT_FIXED_RATE_HZ, FixedStep};

/// Units per second at full stick deflection.
pub const MOVE_SPEED: f32 = 5.0;

const TIMEOUT: SubscriberToken = SubscriberToken(1);

/// Ends the session as a failure when the timer runs out.
struct FailOnTimeout;

impl MinigameSubscriber for FailOnTimeout {
    fn on_minigame_start(&mut self, _control: &mut SessionControl) {}

    fn on_timer_end(&mut self, control: &mut SessionControl) {
        if control.is_ended() {
            return;
        }
        if let Err(e) = control.set_failure() {
            tracing::warn!("could not mark failure: {e}");
        }
        if let Err(e) = control.end_game() {
            tracing::warn!("could not end game: {e}");
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DebugState {
    pub position: Vec2,
    pub session_state: SessionState,
    pub timer_remaining: f32,
}

/// Move around; press interact to win before the timer runs out.
pub struct DebugMinigame {
    state: DebugState,
    session: Session,
    paused: bool,
    pending: InputFrame,
    fixed: FixedStep,
}

impl DebugMinigame {
    pub fn new() -> Self {
        Self {
            state: DebugState::default(),
            session: Session::new(&Default::default()),
            paused: false,
            pending: InputFrame::default(),
            fixed: FixedStep::new(DEFAULT_FIXED_RATE_HZ),
        }
    }

    pub fn state(&self) -> &DebugState {
        &self.state
    }

    fn physics_step(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        let input = self.pending;
        self.pending.clear_edges();

        self.state.position += input.move_dir * (MOVE_SPEED * dt);
        if input.interact.pressed {
            if let Err(e) = self.session.set_success() {
                tracing::warn!("could not mark success: {e}");
            }
            if let Err(e) = self.session.end_game() {
                tracing::warn!("could not end game: {e}");
            }
            return;
        }
        events.extend(self.session.step(dt).into_iter().map(GameEvent::from));
    }
}

impl Default for DebugMinigame {
    fn default() -> Self {
        Self::new()
    }
}

impl Minigame for DebugMinigame {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Debug".to_string(),
            description: "Press interact before time runs out.".to_string(),
            estimated_round_duration: Duration::from_secs(5),
        }
    }

    fn init(&mut self, config: &GameConfig) {
        let judge: Box<dyn MinigameSubscriber> = Box::new(FailOnTimeout);
        self.session =
            match Session::with_subscribers(&config.session, Box::new(LogExit), vec![(TIMEOUT, judge)]) {
                Ok(session) => session,
                Err(e) => {
                    tracing::error!("failed to register timeout handler: {e}");
                    Session::new(&config.session)
                },
            };
        self.state = DebugState {
            session_state: self.session.state(),
            timer_remaining: self.session.timer_value(),
            ..Default::default()
        };
        self.paused = false;
        self.pending = InputFrame::default();
        self.fixed = FixedStep::new(DEFAULT_FIXED_RATE_HZ);
    }

    fn update(&mut self, real_dt: f32) -> Vec<GameEvent> {
        if self.paused || self.session.is_ended() {
            return Vec::new();
        }
        let (scaled, session_events) = self.session.update_unscaled(real_dt);
        let mut events: Vec<GameEvent> = session_events.into_iter().map(GameEvent::from).collect();
        if self.session.state() == SessionState::Ready {
            return events;
        }

        let steps = self.fixed.accumulate(scaled);
        let dt = self.fixed.step();
        for _ in 0..steps {
            if self.session.is_ended() {
                break;
            }
            self.physics_step(dt, &mut events);
        }
        self.state.session_state = self.session.state();
        self.state.timer_remaining = self.session.timer_value();

        if let Some(report) = self.session.end_report() {
            events.push(GameEvent::SessionEnded(report));
        }
        events
    }

    fn apply_input(&mut self, input: InputFrame) {
        if self.session.state() == SessionState::Ready {
            return;
        }
        self.pending.merge(input);
    }

    minigame_boilerplate!(state_type: DebugState);
}

#[cfg(test)]
mod tests {
    use minigame_core::input::ButtonEdges;
    use minigame_core::test_helpers::{self, default_config, finish_countdown, run_frames};

    use super::*;

    fn started(length: f32) -> DebugMinigame {
        let mut g = DebugMinigame::new();
        g.init(&default_config(length));
        finish_countdown(&mut g);
        g
    }

    /// One physics step of travel at full speed; frame deltas do not divide
    /// evenly into fixed steps.
    const STEP_SLACK: f32 = MOVE_SPEED * 0.03;

    fn press() -> InputFrame {
        InputFrame {
            interact: ButtonEdges::PRESS,
            ..Default::default()
        }
    }

    #[test]
    fn contract_init_starts_in_ready() {
        test_helpers::contract_init_starts_in_ready(&mut DebugMinigame::new());
    }

    #[test]
    fn contract_countdown_gates_input() {
        test_helpers::contract_countdown_gates_input(&mut DebugMinigame::new());
    }

    #[test]
    fn contract_countdown_starts_session() {
        test_helpers::contract_countdown_starts_session(&mut DebugMinigame::new());
    }

    #[test]
    fn contract_update_advances_time() {
        test_helpers::contract_update_advances_time(&mut DebugMinigame::new());
    }

    #[test]
    fn contract_pause_stops_updates() {
        test_helpers::contract_pause_stops_updates(&mut DebugMinigame::new());
    }

    #[test]
    fn contract_ended_session_stays_ended() {
        test_helpers::contract_ended_session_stays_ended(&mut DebugMinigame::new());
    }

    #[test]
    fn contract_round_eventually_completes() {
        test_helpers::contract_round_eventually_completes(&mut DebugMinigame::new(), 100);
    }

    #[test]
    fn moves_five_units_per_second() {
        let mut g = started(30.0);
        g.apply_input(InputFrame::moving(Vec2::X));
        run_frames(&mut g, 10, 0.1);
        assert!((g.state().position.x - 5.0).abs() < STEP_SLACK);
        assert_eq!(g.state().position.y, 0.0);
    }

    #[test]
    fn interact_wins_and_ends() {
        let mut g = started(30.0);
        g.apply_input(press());
        let events = g.update(0.1);
        let report = g.session().end_report().expect("interact ends the session");
        assert_eq!(report.state, SessionState::Success);
        assert!(!report.ambiguous);
        assert!(events.contains(&GameEvent::SessionEnded(report)));
        assert!(g.update(0.1).is_empty(), "ended sessions emit nothing further");
    }

    #[test]
    fn timeout_fails_and_ends() {
        let mut g = started(1.0);
        let events = run_frames(&mut g, 15, 0.1);
        assert!(events.contains(&GameEvent::TimerExpired));
        let report = g.session().end_report().expect("timeout ends the session");
        assert_eq!(report.state, SessionState::Failure);
    }

    #[test]
    fn input_ignored_during_countdown() {
        let mut g = DebugMinigame::new();
        g.init(&default_config(30.0));
        g.apply_input(press());
        g.apply_input(InputFrame::moving(Vec2::Y));
        finish_countdown(&mut g);
        g.update(0.5);
        assert_eq!(g.session().state(), SessionState::Playing);
        assert_eq!(g.state().position, Vec2::ZERO);
    }

    #[test]
    fn zero_countdown_still_times_out() {
        let mut g = DebugMinigame::new();
        let mut config = default_config(0.5);
        config.session.countdown_steps = 0;
        g.init(&config);
        assert_eq!(g.session().state(), SessionState::Playing);
        let events = run_frames(&mut g, 10, 0.1);
        assert_eq!(
            events.iter().filter(|e| **e == GameEvent::MinigameStarted).count(),
            1,
            "hosts still hear about the start"
        );
        assert_eq!(
            g.session().end_report().map(|r| r.state),
            Some(SessionState::Failure)
        );
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn displacement_tracks_held_direction(x in -1.0f32..1.0, y in -1.0f32..1.0, frames in 1usize..20) {
                let mut g = started(60.0);
                g.apply_input(InputFrame::moving(Vec2::new(x, y)));
                run_frames(&mut g, frames, 0.1);
                let expected = Vec2::new(x, y) * (MOVE_SPEED * 0.1 * frames as f32);
                prop_assert!(g.state().position.distance(expected) < STEP_SLACK * 1.5);
            }
        }
    }
}
