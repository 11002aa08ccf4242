pub mod cauldron;
pub mod collision;
pub mod config;
pub mod controller;
pub mod droplets;
pub mod enemies;
pub mod error;
pub mod flask;
pub mod player;
pub mod powerups;
pub mod scoring;

use std::time::Duration;

use glam::Vec2;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use minigame_core::game_trait::{GameConfig, GameEvent, GameMetadata, Minigame};
use minigame_core::input::InputFrame;
use minigame_core::minigame_boilerplate;
use minigame_core::session::{
    LogExit, MinigameSubscriber, Session, SessionControl, SessionState, SubscriberToken,
};
use minigame_core::time::FixedStep;

use cauldron::Cauldron;
use collision::{Aabb, CollisionMask, StaticWorld};
pub use config::CatalystConfig;
use droplets::DropletSpawner;
use enemies::EnemySpawner;
use error::ConfigError;
use flask::{FlaskDisplay, NoDisplay};
use player::{PlayerEvent, PlayerStateMachine, StepContext};
use powerups::PowerupPickup;
use scoring::ScoreCounter;

const TIMEOUT_JUDGE: SubscriberToken = SubscriberToken(1);

/// Finishes the round when the timer runs out: Success if every goal was
/// already met, Failure otherwise.
struct TimeoutJudge;

impl MinigameSubscriber for TimeoutJudge {
    fn on_minigame_start(&mut self, _control: &mut SessionControl) {
        tracing::debug!("catalyst round started");
    }

    fn on_timer_end(&mut self, control: &mut SessionControl) {
        if control.is_ended() {
            return;
        }
        if control.state() != SessionState::Success {
            if let Err(e) = control.set_failure() {
                tracing::warn!("could not mark failure on timeout: {e}");
            }
        }
        if let Err(e) = control.end_game() {
            tracing::warn!("could not end game on timeout: {e}");
        }
    }
}

/// Serializable world snapshot for the presentation layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalystState {
    pub player: PlayerStateMachine,
    pub world: StaticWorld,
    pub cauldron: Cauldron,
    pub droplets: DropletSpawner,
    pub enemies: EnemySpawner,
    pub powerups: Vec<PowerupPickup>,
    pub score: ScoreCounter,
    pub session_state: SessionState,
    pub timer_remaining: f32,
}

impl CatalystState {
    /// Build the arena and every actor from `config`.
    pub fn build(config: &CatalystConfig) -> Result<Self, ConfigError> {
        let arena = &config.arena;
        let mut world = StaticWorld::new();
        world.add(
            Aabb::from_min_max(arena.floor_min, arena.floor_max)?,
            CollisionMask::GROUND,
        );
        let wall_top = arena.floor_max.y + arena.wall_height;
        world.add(
            Aabb::from_min_max(
                Vec2::new(arena.floor_min.x - 1.0, arena.floor_min.y),
                Vec2::new(arena.floor_min.x, wall_top),
            )?,
            CollisionMask::GROUND,
        );
        world.add(
            Aabb::from_min_max(
                Vec2::new(arena.floor_max.x, arena.floor_min.y),
                Vec2::new(arena.floor_max.x + 1.0, wall_top),
            )?,
            CollisionMask::GROUND,
        );
        let cauldron = Cauldron::spawn(&config.cauldron, &mut world)?;
        let player = PlayerStateMachine::new(config.player.clone(), arena.player_spawn)?;

        Ok(Self {
            player,
            world,
            cauldron,
            droplets: DropletSpawner::new(config.droplets.clone()),
            enemies: EnemySpawner::new(config.enemy.clone(), config.enemy_spawner.clone()),
            powerups: config
                .powerups
                .spawn_points
                .iter()
                .map(|p| PowerupPickup::new(*p))
                .collect(),
            score: ScoreCounter::new(config.required_drops),
            session_state: SessionState::Ready,
            timer_remaining: 0.0,
        })
    }
}

/// Catalyst: catch falling droplets in a flask and pour them into the
/// wandering cauldron while dodging walkers.
pub struct CatalystMinigame {
    config: CatalystConfig,
    template: CatalystState,
    state: CatalystState,
    session: Session,
    paused: bool,
    pending: InputFrame,
    fixed: FixedStep,
    rng: StdRng,
    display: Box<dyn FlaskDisplay + Send>,
    presentation_time: f32,
}

impl CatalystMinigame {
    pub fn new(config: CatalystConfig) -> Result<Self, ConfigError> {
        let template = CatalystState::build(&config)?;
        Ok(Self {
            state: template.clone(),
            template,
            session: Session::new(&Default::default()),
            paused: false,
            pending: InputFrame::default(),
            fixed: FixedStep::new(config.fixed_rate_hz),
            rng: StdRng::seed_from_u64(config.seed),
            display: Box::new(NoDisplay),
            presentation_time: 0.0,
            config,
        })
    }

    /// Build from `config/catalyst.toml` or `$MINIGAME_CATALYST_CONFIG`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(CatalystConfig::load())
    }

    /// Route flask color updates to a renderer.
    pub fn with_display(mut self, display: Box<dyn FlaskDisplay + Send>) -> Self {
        self.display = display;
        self
    }

    pub fn state(&self) -> &CatalystState {
        &self.state
    }

    pub fn config(&self) -> &CatalystConfig {
        &self.config
    }

    /// Seconds of scaled time shown so far; drives flashing and bobbing.
    pub fn presentation_time(&self) -> f32 {
        self.presentation_time
    }

    fn physics_step(&mut self, dt: f32, events: &mut Vec<GameEvent>) {
        let input = self.pending;
        self.pending.clear_edges();

        let state = &mut self.state;
        {
            let mut ctx = StepContext {
                session: &mut self.session,
                world: &state.world,
                scorer: &mut state.score,
                display: self.display.as_mut(),
            };
            state.player.handle_input(&input, &mut ctx);
            state.player.step(dt, &mut ctx);
        }

        state.cauldron.step(dt, &mut state.world);
        state.droplets.step(dt, &mut self.rng);
        state.droplets.deliver(&mut state.player, self.display.as_mut());
        state.enemies.step(dt, &mut self.rng);
        state
            .enemies
            .contact(&mut state.player, &mut self.session, self.display.as_mut());
        for pickup in &mut state.powerups {
            pickup.try_collect(&mut state.player, &self.config.powerups);
        }

        for event in state.player.drain_events() {
            match event {
                PlayerEvent::PlungeImpact {
                    center,
                    radius,
                    damage,
                } => {
                    state.enemies.apply_impact(center, radius, damage);
                },
                PlayerEvent::ScreenShake {
                    intensity,
                    duration,
                } => events.push(GameEvent::ScreenShake {
                    intensity,
                    duration,
                }),
                PlayerEvent::Damaged { health, max } => {
                    events.push(GameEvent::HealthChanged { health, max })
                },
                PlayerEvent::DropletScored(kind) => events.push(GameEvent::ScoreUpdate {
                    slot: kind.index(),
                    score: state.score.score_of(kind),
                    goal: state.score.required_drops(),
                }),
                _ => {},
            }
        }

        events.extend(self.session.step(dt).into_iter().map(GameEvent::from));
    }
}

impl Minigame for CatalystMinigame {
    fn metadata(&self) -> GameMetadata {
        GameMetadata {
            name: "Catalyst".to_string(),
            description: "Catch droplets, pour them into the cauldron, dodge the walkers.".to_string(),
            estimated_round_duration: Duration::from_secs(60),
        }
    }

    fn fixed_rate(&self) -> f32 {
        self.config.fixed_rate_hz
    }

    fn init(&mut self, config: &GameConfig) {
        let seed = config.custom_u64("seed").unwrap_or(self.config.seed);
        self.rng = StdRng::seed_from_u64(seed);
        self.state = self.template.clone();
        self.display
            .set_layer_colors(&self.state.player.flask().colors());

        let judge: Box<dyn MinigameSubscriber> = Box::new(TimeoutJudge);
        self.session = match Session::with_subscribers(
            &config.session,
            Box::new(LogExit),
            vec![(TIMEOUT_JUDGE, judge)],
        ) {
            Ok(session) => session,
            Err(e) => {
                tracing::error!("failed to register timeout judge: {e}");
                Session::new(&config.session)
            },
        };

        self.paused = false;
        self.pending = InputFrame::default();
        self.fixed = FixedStep::new(self.config.fixed_rate_hz);
        self.presentation_time = 0.0;
        self.state.session_state = self.session.state();
        self.state.timer_remaining = self.session.timer_value();
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

        self.presentation_time += scaled;
        for pickup in &mut self.state.powerups {
            pickup.animate(self.presentation_time, scaled, &self.config.powerups);
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

    minigame_boilerplate!(state_type: CatalystState);
}
