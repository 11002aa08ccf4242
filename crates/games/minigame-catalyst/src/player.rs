//! Player movement, combat and inventory state machine.
//!
//! The player is stepped at the fixed physics rate. Input edges are applied
//! first via [`PlayerStateMachine::handle_input`], then
//! [`PlayerStateMachine::step`] integrates gravity, moves the body through
//! the [`ActorController`], and advances every timer and scripted sequence
//! (deposit drain, plunge attack) by deadline checks.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use minigame_core::input::InputFrame;
use minigame_core::math::Vec2Ext;
use minigame_core::session::{Session, SessionState};
use minigame_core::timer::Countdown;

use crate::collision::{Aabb, CollisionMask, RayConfig, StaticWorld};
use crate::controller::ActorController;
use crate::error::ConfigError;
use crate::flask::{CarryPose, DropletType, FLASK_CAPACITY, Flask, FlaskDisplay, Rgba};
use crate::scoring::ScoreSink;

/// Vertical move input below this counts as "down" for deposit edges.
const DOWN_INPUT_THRESHOLD: f32 = -0.5;
/// Flash frequency of the invincibility blink.
const FLASH_RATE: f32 = 20.0;
/// Impact shake is this much stronger than the launch shake.
const IMPACT_SHAKE_MULTIPLIER: f32 = 1.5;

/// Tunable player parameters, loadable from TOML.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub half_extents: Vec2,
    pub rays: RayConfig,

    pub jump_height: f32,
    pub time_to_jump_apex: f32,
    pub move_speed_ground: f32,
    pub move_speed_air: f32,

    pub allow_double_jump: bool,
    pub double_jump_height: f32,
    pub max_forward_force: f32,
    pub forward_force_per_second: f32,

    pub max_health: i32,
    pub invincibility_duration: f32,
    pub knockback_duration: f32,
    /// Below this much remaining invincibility a damaged player regains control.
    pub control_return_threshold: f32,
    pub damage_decay_divisor: f32,

    pub flask_capacity: usize,
    pub flask_anchor_offset: Vec2,
    pub deposit_probe_distance: f32,
    pub deposit_drip_interval: f32,
    pub deposit_duration: f32,

    pub min_plunge_height: f32,
    pub max_plunge_height: f32,
    pub charge_rate: f32,
    pub plunge_radius: f32,
    pub plunge_damage: i32,
    pub screen_shake_intensity: f32,
    pub screen_shake_duration: f32,
    pub glow_duration: f32,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            half_extents: Vec2::new(0.45, 0.7),
            rays: RayConfig::default(),
            jump_height: 4.0,
            time_to_jump_apex: 0.4,
            move_speed_ground: 6.0,
            move_speed_air: 0.0,
            allow_double_jump: true,
            double_jump_height: 3.0,
            max_forward_force: 8.0,
            forward_force_per_second: 8.0,
            max_health: 9,
            invincibility_duration: 1.5,
            knockback_duration: 0.3,
            control_return_threshold: 1.0,
            damage_decay_divisor: 1.3,
            flask_capacity: FLASK_CAPACITY,
            flask_anchor_offset: Vec2::new(0.0, 0.5),
            deposit_probe_distance: 2.0,
            deposit_drip_interval: 0.05,
            deposit_duration: 1.0,
            min_plunge_height: 1.0,
            max_plunge_height: 5.0,
            charge_rate: 2.0,
            plunge_radius: 4.0,
            plunge_damage: 3,
            screen_shake_intensity: 0.5,
            screen_shake_duration: 0.3,
            glow_duration: 0.2,
        }
    }
}

/// Velocities derived once from the jump parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Kinematics {
    pub gravity: f32,
    pub jump_velocity: f32,
    pub double_jump_velocity: f32,
}

impl Kinematics {
    pub fn from_config(config: &PlayerConfig) -> Result<Self, ConfigError> {
        let apex = config.time_to_jump_apex;
        if !(apex.is_finite() && apex > 0.0) {
            return Err(ConfigError::InvalidApexTime(apex));
        }
        let gravity = -(2.0 * config.jump_height) / (apex * apex);
        Ok(Self {
            gravity,
            jump_velocity: gravity.abs() * apex,
            double_jump_velocity: (2.0 * config.double_jump_height * gravity.abs()).sqrt(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlayerState {
    Idle,
    Walk,
    Jump,
    Damaged,
    Deposit,
}

/// Stages of the plunge continuation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlungePhase {
    #[default]
    Inactive,
    /// Launched; waiting for the apex.
    Rising,
    /// Past the apex; waiting to land.
    Falling,
}

/// Effects the owner of the player reacts to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PlayerEvent {
    Jumped,
    DoubleJumped,
    Damaged { health: i32, max: i32 },
    DropletsSpilled(Vec<DropletType>),
    DepositStarted,
    DropletScored(DropletType),
    DepositFinished { scored: u32, discarded: u32 },
    Died,
    PowerupCollected { charges: u32 },
    PlungeLaunched { height: f32 },
    PlungeImpact { center: Vec2, radius: f32, damage: i32 },
    ScreenShake { intensity: f32, duration: f32 },
}

/// Collaborators a step needs beyond the player's own state.
pub struct StepContext<'a> {
    pub session: &'a mut Session,
    pub world: &'a StaticWorld,
    pub scorer: &'a mut dyn ScoreSink,
    pub display: &'a mut dyn FlaskDisplay,
}

/// What a renderer needs to draw the player this frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerPresentation {
    pub tint: Rgba,
    pub facing_right: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerStateMachine {
    #[serde(skip)]
    config: PlayerConfig,
    kinematics: Kinematics,
    spawn: Vec2,
    controller: ActorController,
    velocity: Vec2,
    move_dir: Vec2,
    move_down_held: bool,
    facing_right: bool,
    state: PlayerState,
    dead: bool,
    health: i32,

    has_double_jumped: bool,
    holding_double_jump: bool,

    invincibility: Countdown,
    knockback: Countdown,

    flask: Flask,
    carry_pose: CarryPose,
    deposit_drip: Countdown,
    deposit_total: Countdown,
    deposit_scored: u32,

    pounce_charges: u32,
    powerup: Countdown,
    holding_slam: bool,
    plunge_charge: f32,
    plunge: PlungePhase,
    glow: Countdown,

    #[serde(skip)]
    events: Vec<PlayerEvent>,
}

impl PlayerStateMachine {
    pub fn new(mut config: PlayerConfig, spawn: Vec2) -> Result<Self, ConfigError> {
        if config.max_health < 1 {
            tracing::warn!(max_health = config.max_health, "max health below 1, clamping");
            config.max_health = 1;
        }
        let kinematics = Kinematics::from_config(&config)?;
        let body = Aabb::new(spawn, config.half_extents)?;
        let controller = ActorController::new(body, &config.rays, CollisionMask::GROUND)?;
        let flask = Flask::new(config.flask_capacity)?;
        Ok(Self {
            health: config.max_health,
            kinematics,
            spawn,
            controller,
            velocity: Vec2::ZERO,
            move_dir: Vec2::ZERO,
            move_down_held: false,
            facing_right: true,
            state: PlayerState::Idle,
            dead: false,
            has_double_jumped: false,
            holding_double_jump: false,
            invincibility: Countdown::default(),
            knockback: Countdown::default(),
            flask,
            carry_pose: CarryPose::Held,
            deposit_drip: Countdown::default(),
            deposit_total: Countdown::default(),
            deposit_scored: 0,
            pounce_charges: 0,
            powerup: Countdown::default(),
            holding_slam: false,
            plunge_charge: 0.0,
            plunge: PlungePhase::Inactive,
            glow: Countdown::default(),
            events: Vec::new(),
            config,
        })
    }

    /// Put the player back at spawn with full health and an empty flask.
    pub fn reset(&mut self, display: &mut dyn FlaskDisplay) {
        self.controller.set_position(self.spawn);
        self.velocity = Vec2::ZERO;
        self.move_dir = Vec2::ZERO;
        self.move_down_held = false;
        self.state = PlayerState::Idle;
        self.dead = false;
        self.health = self.config.max_health;
        self.has_double_jumped = false;
        self.holding_double_jump = false;
        self.invincibility.clear();
        self.knockback.clear();
        self.flask.drain_all(display);
        self.carry_pose = CarryPose::Held;
        self.deposit_drip.clear();
        self.deposit_total.clear();
        self.deposit_scored = 0;
        self.pounce_charges = 0;
        self.powerup.clear();
        self.holding_slam = false;
        self.plunge_charge = 0.0;
        self.plunge = PlungePhase::Inactive;
        self.glow.clear();
        self.events.clear();
    }

    // ================================================================
    // Read-outs
    // ================================================================

    pub fn config(&self) -> &PlayerConfig {
        &self.config
    }

    pub fn kinematics(&self) -> Kinematics {
        self.kinematics
    }

    pub fn state(&self) -> PlayerState {
        self.state
    }

    pub fn health(&self) -> i32 {
        self.health
    }

    pub fn max_health(&self) -> i32 {
        self.config.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn position(&self) -> Vec2 {
        self.controller.position()
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.controller.set_position(position);
    }

    pub fn bounds(&self) -> &Aabb {
        self.controller.bounds()
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    pub fn grounded(&self) -> bool {
        self.controller.grounded()
    }

    pub fn flask(&self) -> &Flask {
        &self.flask
    }

    pub fn carry_pose(&self) -> CarryPose {
        self.carry_pose
    }

    pub fn is_invincible(&self) -> bool {
        self.invincibility.is_active()
    }

    pub fn is_knocked_back(&self) -> bool {
        self.knockback.is_active()
    }

    pub fn is_powered_up(&self) -> bool {
        self.powerup.is_active()
    }

    pub fn pounce_charges(&self) -> u32 {
        self.pounce_charges
    }

    pub fn plunge_charge(&self) -> f32 {
        self.plunge_charge
    }

    pub fn plunge_phase(&self) -> PlungePhase {
        self.plunge
    }

    /// Jump, move, deposit and ground slam are locked while damaged or depositing.
    pub fn can_act(&self) -> bool {
        !matches!(self.state, PlayerState::Damaged | PlayerState::Deposit)
    }

    /// Take every event raised since the last call.
    pub fn drain_events(&mut self) -> Vec<PlayerEvent> {
        std::mem::take(&mut self.events)
    }

    /// Visual state at presentation time `time` (seconds).
    pub fn presentation(&self, time: f32) -> PlayerPresentation {
        let tint = if self.glow.is_active() {
            Rgba::YELLOW
        } else if self.is_powered_up() {
            Rgba::CYAN
        } else {
            Rgba::WHITE
        };
        let alpha = if self.is_invincible() && (time * FLASH_RATE).sin() <= 0.0 {
            0.5
        } else {
            1.0
        };
        PlayerPresentation {
            tint: tint.with_alpha(alpha),
            facing_right: self.facing_right,
        }
    }

    // ================================================================
    // Input
    // ================================================================

    /// Apply one physics step's worth of input. Ignored until the session
    /// leaves Ready.
    pub fn handle_input(&mut self, input: &InputFrame, ctx: &mut StepContext<'_>) {
        if ctx.session.state() == SessionState::Ready || self.dead {
            return;
        }

        self.move_dir = input.move_dir.sanitized();
        if self.move_dir.x != 0.0 {
            self.facing_right = self.move_dir.x > 0.0;
        }
        let down = self.move_dir.y < DOWN_INPUT_THRESHOLD;
        if down && !self.move_down_held {
            self.try_begin_deposit(ctx.world);
        }
        self.move_down_held = down;

        if input.interact.pressed && self.can_act() {
            self.press_jump();
        }
        if input.interact.released {
            self.holding_double_jump = false;
        }

        if input.ground_slam.pressed && self.can_act() {
            self.press_ground_slam();
        }
    }

    fn press_jump(&mut self) {
        if self.grounded() {
            self.velocity.y = self.kinematics.jump_velocity;
            self.has_double_jumped = false;
            self.state = PlayerState::Jump;
            self.events.push(PlayerEvent::Jumped);
        } else if self.config.allow_double_jump && !self.has_double_jumped && self.velocity.y < 0.0 {
            self.velocity.y = self.kinematics.double_jump_velocity;
            self.has_double_jumped = true;
            self.holding_double_jump = true;
            self.events.push(PlayerEvent::DoubleJumped);
        }
    }

    fn press_ground_slam(&mut self) {
        if !(self.is_powered_up() && self.pounce_charges > 0 && self.grounded()) {
            return;
        }
        if self.holding_slam {
            self.holding_slam = false;
            self.launch_plunge();
        } else {
            self.holding_slam = true;
            self.plunge_charge = 0.0;
        }
    }

    fn launch_plunge(&mut self) {
        self.pounce_charges = self.pounce_charges.saturating_sub(1);
        let t = self.plunge_charge.clamp(0.0, 1.0);
        let height =
            self.config.min_plunge_height + (self.config.max_plunge_height - self.config.min_plunge_height) * t;
        self.velocity.y = (2.0 * height * self.kinematics.gravity.abs()).sqrt();
        self.state = PlayerState::Jump;
        self.plunge = PlungePhase::Rising;
        self.glow.start(self.config.glow_duration);
        self.events.push(PlayerEvent::ScreenShake {
            intensity: self.config.screen_shake_intensity,
            duration: self.config.screen_shake_duration,
        });
        self.events.push(PlayerEvent::PlungeLaunched { height });
    }

    fn try_begin_deposit(&mut self, world: &StaticWorld) {
        if !matches!(self.state, PlayerState::Idle | PlayerState::Walk)
            || !self.grounded()
            || self.flask.is_empty()
        {
            return;
        }
        let anchor = self.position() + self.config.flask_anchor_offset;
        let target = world.raycast(
            anchor,
            Vec2::NEG_Y,
            self.config.deposit_probe_distance,
            CollisionMask::DEPOSIT_TARGET,
        );
        if target.is_none() {
            return;
        }
        self.velocity.x = 0.0;
        self.state = PlayerState::Deposit;
        self.carry_pose = CarryPose::Pouring;
        self.deposit_total.start(self.config.deposit_duration);
        self.deposit_drip.start(self.config.deposit_drip_interval);
        self.deposit_scored = 0;
        self.events.push(PlayerEvent::DepositStarted);
    }

    // ================================================================
    // Effects requested by the world
    // ================================================================

    /// Store a droplet. Returns `false` when the flask is full or the player
    /// is dead; the caller keeps the droplet.
    pub fn add_to_flask(&mut self, kind: DropletType, display: &mut dyn FlaskDisplay) -> bool {
        !self.dead && self.flask.add(kind, display)
    }

    pub fn collect_powerup(&mut self, charges: u32, duration: f32) {
        self.pounce_charges = self.pounce_charges.saturating_add(charges);
        self.powerup.start(duration);
        tracing::info!(charges = self.pounce_charges, "powerup collected");
        self.events.push(PlayerEvent::PowerupCollected {
            charges: self.pounce_charges,
        });
    }

    /// Apply a hit with knockback. Returns whether it landed.
    pub fn take_damage(
        &mut self,
        amount: i32,
        force: f32,
        direction: Vec2,
        session: &mut Session,
        display: &mut dyn FlaskDisplay,
    ) -> bool {
        if self.dead
            || self.is_invincible()
            || self.is_powered_up()
            || self.state == PlayerState::Deposit
        {
            return false;
        }

        self.health = (self.health - amount.max(0)).max(0);
        self.state = PlayerState::Damaged;
        self.holding_double_jump = false;
        tracing::info!(
            damage = amount,
            health = self.health,
            max = self.config.max_health,
            "player took damage"
        );

        let spilled = self.flask.drain_all(display);
        if !spilled.is_empty() {
            self.events.push(PlayerEvent::DropletsSpilled(spilled));
        }

        self.invincibility.start(self.config.invincibility_duration);
        self.knockback.start(self.config.knockback_duration);
        self.velocity = direction.normalize_or_zero() * force;
        self.events.push(PlayerEvent::Damaged {
            health: self.health,
            max: self.config.max_health,
        });

        if self.health <= 0 {
            self.die(session);
        }
        true
    }

    fn die(&mut self, session: &mut Session) {
        self.dead = true;
        self.holding_slam = false;
        self.plunge = PlungePhase::Inactive;
        tracing::info!("player died");
        if let Err(e) = session.set_failure() {
            tracing::warn!("could not mark failure on death: {e}");
        }
        if let Err(e) = session.end_game() {
            tracing::warn!("could not end game on death: {e}");
        }
        self.events.push(PlayerEvent::Died);
    }

    // ================================================================
    // Physics step
    // ================================================================

    pub fn step(&mut self, dt: f32, ctx: &mut StepContext<'_>) {
        if ctx.session.state() == SessionState::Ready || self.dead || dt.is_nan() || dt <= 0.0 {
            return;
        }

        self.step_timers(dt);

        let grounded = self.grounded();
        let air_control = self.config.move_speed_air > 0.0 && self.state == PlayerState::Jump;
        if self.state == PlayerState::Walk || air_control {
            let speed = if grounded {
                self.config.move_speed_ground
            } else {
                self.config.move_speed_air
            };
            self.velocity.x = self.move_dir.x * speed;
        }

        self.velocity.y += self.kinematics.gravity * dt;
        self.controller.move_by(self.velocity * dt, ctx.world);

        let touch = self.controller.touch();
        if touch.above || touch.below {
            self.velocity.y = 0.0;
        }
        if touch.below {
            if self.state == PlayerState::Jump {
                self.state = PlayerState::Idle;
                self.velocity.x = 0.0;
                self.has_double_jumped = false;
                self.holding_double_jump = false;
            }
            if self.can_act() {
                self.state = if self.move_dir.x != 0.0 {
                    PlayerState::Walk
                } else {
                    PlayerState::Idle
                };
            }
        }

        self.step_deposit(dt, ctx);
        self.step_plunge();
        self.step_damage(dt);
    }

    fn step_timers(&mut self, dt: f32) {
        if self.holding_double_jump && self.move_dir.x != 0.0 {
            let direction = self.move_dir.x.signum();
            if self.velocity.x.abs() < self.config.max_forward_force {
                self.velocity.x += self.config.forward_force_per_second * dt * direction;
            }
        }

        if self.holding_slam {
            self.plunge_charge += self.config.charge_rate * dt;
        }

        if self.powerup.tick(dt) {
            self.pounce_charges = 0;
            self.holding_slam = false;
            tracing::debug!("powerup expired");
        }
        self.glow.tick(dt);
    }

    fn step_deposit(&mut self, dt: f32, ctx: &mut StepContext<'_>) {
        if self.state != PlayerState::Deposit {
            return;
        }
        self.deposit_total.tick(dt);
        if self.deposit_drip.tick(dt) {
            if let Some(kind) = self.flask.score_top(ctx.display) {
                ctx.scorer.score(kind, ctx.session);
                self.deposit_scored += 1;
                self.events.push(PlayerEvent::DropletScored(kind));
            }
            self.deposit_drip.start(self.config.deposit_drip_interval);
        }
        if self.flask.is_empty() || !self.deposit_total.is_active() {
            let discarded = self.flask.drain_all(ctx.display).len() as u32;
            self.carry_pose = CarryPose::Held;
            self.deposit_drip.clear();
            self.deposit_total.clear();
            self.state = PlayerState::Idle;
            self.events.push(PlayerEvent::DepositFinished {
                scored: self.deposit_scored,
                discarded,
            });
        }
    }

    fn step_plunge(&mut self) {
        match self.plunge {
            PlungePhase::Inactive => {},
            PlungePhase::Rising => {
                if self.velocity.y <= 0.0 {
                    self.plunge = PlungePhase::Falling;
                }
            },
            PlungePhase::Falling => {
                if self.grounded() {
                    self.plunge = PlungePhase::Inactive;
                    self.events.push(PlayerEvent::PlungeImpact {
                        center: self.position(),
                        radius: self.config.plunge_radius,
                        damage: self.config.plunge_damage,
                    });
                    self.events.push(PlayerEvent::ScreenShake {
                        intensity: self.config.screen_shake_intensity * IMPACT_SHAKE_MULTIPLIER,
                        duration: self.config.screen_shake_duration,
                    });
                }
            },
        }
    }

    fn step_damage(&mut self, dt: f32) {
        if self.invincibility.is_active() {
            self.invincibility.tick(dt);
            if self.invincibility.remaining() < self.config.control_return_threshold {
                if self.state == PlayerState::Damaged {
                    self.state = PlayerState::Idle;
                    self.velocity.x = 0.0;
                }
            } else if self.config.damage_decay_divisor > 0.0 {
                self.velocity.x /= self.config.damage_decay_divisor;
            }
        }
        self.knockback.tick(dt);
    }
}
