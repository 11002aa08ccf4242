pub mod game_trait;
pub mod input;
pub mod math;
pub mod session;
pub mod time;
pub mod timer;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers {
    use crate::game_trait::{GameConfig, GameEvent, Minigame};
    use crate::input::InputFrame;
    use crate::math::Vec2;
    use crate::session::{COUNTDOWN_STEP_SECS, COUNTDOWN_STEPS, SessionState};

    /// Create a default GameConfig with the given session length in seconds.
    pub fn default_config(minigame_length: f32) -> GameConfig {
        GameConfig::with_length(minigame_length)
    }

    /// Run N frames of `dt` real seconds, returning all accumulated events.
    pub fn run_frames(game: &mut dyn Minigame, n: usize, dt: f32) -> Vec<GameEvent> {
        let mut all_events = Vec::new();
        for _ in 0..n {
            all_events.extend(game.update(dt));
        }
        all_events
    }

    /// Run the countdown to completion in whole-second frames.
    pub fn finish_countdown(game: &mut dyn Minigame) -> Vec<GameEvent> {
        run_frames(game, COUNTDOWN_STEPS as usize, COUNTDOWN_STEP_SECS)
    }

    /// Assert that the game's serialized state differs from `before`.
    pub fn assert_game_state_changed(game: &dyn Minigame, before: &[u8]) {
        let after = game.serialize_state();
        assert_ne!(
            before,
            &after[..],
            "Game state should have changed after operation"
        );
    }

    // ================================================================
    // Minigame Trait Contract Tests
    // ================================================================
    // Every Minigame implementation must pass these. Game crates call them
    // from their own #[cfg(test)] modules with a concrete instance.

    /// After init() the snapshot must be non-empty and the session Ready.
    pub fn contract_init_starts_in_ready(game: &mut dyn Minigame) {
        game.init(&default_config(30.0));
        assert!(
            !game.serialize_state().is_empty(),
            "serialize_state() must return non-empty bytes after init"
        );
        assert_eq!(game.session().state(), SessionState::Ready);
        assert!(!game.is_round_complete());
    }

    /// Input during the countdown must not move the simulation.
    pub fn contract_countdown_gates_input(game: &mut dyn Minigame) {
        game.init(&default_config(30.0));
        let before = game.serialize_state();
        game.apply_input(InputFrame::moving(Vec2::X));
        game.update(0.5);
        assert_eq!(game.session().state(), SessionState::Ready);
        assert_eq!(
            before,
            game.serialize_state(),
            "State must not change while the countdown runs"
        );
    }

    /// The countdown must announce 3, 2, 1, start the session and emit
    /// MinigameStarted once.
    pub fn contract_countdown_starts_session(game: &mut dyn Minigame) {
        game.init(&default_config(30.0));
        let events = finish_countdown(game);
        assert_ne!(game.session().state(), SessionState::Ready);
        let announced: Vec<u8> = events
            .iter()
            .filter_map(|e| match e {
                GameEvent::Countdown { remaining } => Some(*remaining),
                _ => None,
            })
            .collect();
        assert_eq!(announced, vec![3, 2, 1], "every countdown second is announced");
        let started = events
            .iter()
            .filter(|e| matches!(e, GameEvent::MinigameStarted))
            .count();
        assert_eq!(started, 1, "MinigameStarted must fire exactly once");
    }

    /// Once playing, update(dt>0) must advance the snapshot (timer at least).
    pub fn contract_update_advances_time(game: &mut dyn Minigame) {
        game.init(&default_config(30.0));
        finish_countdown(game);
        let before = game.serialize_state();
        game.update(0.5);
        assert_game_state_changed(game, &before);
    }

    /// pause() must freeze the simulation, resume() must unfreeze it.
    pub fn contract_pause_stops_updates(game: &mut dyn Minigame) {
        game.init(&default_config(30.0));
        finish_countdown(game);
        game.pause();
        let before = game.serialize_state();
        game.update(0.5);
        assert_eq!(
            before,
            game.serialize_state(),
            "State must not change while paused"
        );
        game.resume();
        game.update(0.5);
        assert_game_state_changed(game, &before);
    }

    /// Once ended, update() must report nothing and leave the snapshot alone.
    pub fn contract_ended_session_stays_ended(game: &mut dyn Minigame) {
        game.init(&default_config(1.0));
        finish_countdown(game);
        run_frames(game, 30, 0.1);
        assert!(game.is_round_complete());
        let report = game.session().end_report();
        let before = game.serialize_state();
        assert!(run_frames(game, 10, 1.0).is_empty());
        assert_eq!(before, game.serialize_state());
        assert_eq!(game.session().end_report(), report);
    }

    /// Running long enough past the timer must reach a terminal outcome.
    pub fn contract_round_eventually_completes(game: &mut dyn Minigame, max_frames: usize) {
        game.init(&default_config(2.0));
        finish_countdown(game);
        for _ in 0..max_frames {
            game.update(0.1);
            if game.is_round_complete() {
                break;
            }
        }
        assert!(
            game.is_round_complete(),
            "Minigame must end within {max_frames} frames after its timer"
        );
        let report = game.session().end_report().expect("ended session has a report");
        assert!(
            !report.ambiguous,
            "Minigames must end with an explicit Success or Failure"
        );
    }
}
