//! Minigame session lifecycle.
//!
//! A [`Session`] is owned by exactly one minigame and handed by reference to
//! every actor that needs to gate on it or finish it. It runs a short
//! countdown on the unscaled clock while the simulation clock is paused, then
//! flips to [`SessionState::Playing`], notifies subscribers, and runs the
//! shared session timer.

use serde::{Deserialize, Serialize};

use crate::time::SimClock;
use crate::timer::Countdown;

/// Countdown steps shown before play starts.
pub const COUNTDOWN_STEPS: u8 = 3;
/// Real seconds per countdown step.
pub const COUNTDOWN_STEP_SECS: f32 = 1.0;
/// Default session length in seconds.
pub const DEFAULT_MINIGAME_LENGTH: f32 = 5.0;

/// Lifecycle phase of a session.
///
/// Advances Ready -> Playing -> {Success | Failure}. Success and Failure may
/// be re-marked until [`Session::end_game`]; nothing returns to Ready or
/// Playing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionState {
    #[default]
    Ready,
    Playing,
    Success,
    Failure,
}

impl SessionState {
    /// Whether an explicit outcome has been marked.
    pub fn is_outcome(self) -> bool {
        matches!(self, SessionState::Success | SessionState::Failure)
    }
}

/// Session timing configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Length of the session timer, in seconds.
    pub minigame_length: f32,
    /// Number of countdown steps before play starts.
    pub countdown_steps: u8,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            minigame_length: DEFAULT_MINIGAME_LENGTH,
            countdown_steps: COUNTDOWN_STEPS,
        }
    }
}

/// Errors reported by session operations. None of them are fatal; the
/// session state is left untouched when one is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session already ended")]
    AlreadyEnded,
    #[error("Subscriptions are frozen once the session is playing")]
    SubscriptionsFrozen,
    #[error("Subscriber token {0:?} already registered")]
    DuplicateSubscriber(SubscriberToken),
    #[error("Session has not started yet")]
    NotStarted,
}

/// Stable identity supplied by a subscriber when it registers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriberToken(pub u64);

/// Summary produced by the terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndReport {
    pub state: SessionState,
    /// The session ended without an explicit Success/Failure mark.
    pub ambiguous: bool,
}

/// Events published by the session for its owner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionEvent {
    /// A countdown step elapsed; `remaining` whole seconds are left.
    Countdown { remaining: u8 },
    Started,
    TimerExpired,
}

/// Gameplay object notified of session start and timeout.
pub trait MinigameSubscriber: Send {
    /// Called once, after the countdown, when play begins.
    fn on_minigame_start(&mut self, control: &mut SessionControl);

    /// Called once when the session timer runs out. The session does not end
    /// by itself; the subscriber decides.
    fn on_timer_end(&mut self, control: &mut SessionControl);
}

/// Host-level action performed when a session ends.
pub trait HostExit: Send {
    fn exit(&mut self, report: &EndReport);
}

/// Default exit hook: just logs.
pub struct LogExit;

impl HostExit for LogExit {
    fn exit(&mut self, report: &EndReport) {
        tracing::info!(state = ?report.state, "minigame exited");
    }
}

/// Outcome marks and the terminal transition. Subscribers receive this during
/// fan-out so they can finish the session from a callback.
pub struct SessionControl {
    state: SessionState,
    ended: Option<EndReport>,
    exit: Box<dyn HostExit>,
}

impl std::fmt::Debug for SessionControl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionControl")
            .field("state", &self.state)
            .field("ended", &self.ended)
            .finish_non_exhaustive()
    }
}

impl SessionControl {
    fn new(exit: Box<dyn HostExit>) -> Self {
        Self {
            state: SessionState::Ready,
            ended: None,
            exit,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_ended(&self) -> bool {
        self.ended.is_some()
    }

    pub fn end_report(&self) -> Option<EndReport> {
        self.ended
    }

    pub fn set_success(&mut self) -> Result<(), SessionError> {
        self.mark(SessionState::Success)
    }

    pub fn set_failure(&mut self) -> Result<(), SessionError> {
        self.mark(SessionState::Failure)
    }

    fn mark(&mut self, outcome: SessionState) -> Result<(), SessionError> {
        if self.ended.is_some() {
            return Err(SessionError::AlreadyEnded);
        }
        if self.state == SessionState::Ready {
            tracing::warn!(?outcome, "outcome marked before the countdown finished; ignored");
            return Err(SessionError::NotStarted);
        }
        self.state = outcome;
        Ok(())
    }

    /// The single terminal transition.
    pub fn end_game(&mut self) -> Result<EndReport, SessionError> {
        if self.ended.is_some() {
            return Err(SessionError::AlreadyEnded);
        }
        tracing::info!(state = ?self.state, "finished minigame");
        let ambiguous = !self.state.is_outcome();
        if ambiguous {
            tracing::error!(
                state = ?self.state,
                "finished minigame in ambiguous state; mark Success or Failure before ending"
            );
        }
        let report = EndReport {
            state: self.state,
            ambiguous,
        };
        self.exit.exit(&report);
        self.ended = Some(report);
        Ok(report)
    }
}

/// One minigame session: countdown, shared timer, subscribers.
pub struct Session {
    control: SessionControl,
    clock: SimClock,
    countdown_remaining: u8,
    countdown_elapsed: f32,
    timer: Countdown,
    timer_max: f32,
    timeout_fired: bool,
    subscribers: Vec<(SubscriberToken, Box<dyn MinigameSubscriber>)>,
    /// Events raised before the owner's first `update_unscaled`.
    announced: Vec<SessionEvent>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("control", &self.control)
            .field("countdown_remaining", &self.countdown_remaining)
            .field("timer", &self.timer)
            .field("subscribers", &self.subscribers.len())
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn new(config: &SessionConfig) -> Self {
        Self::with_exit(config, Box::new(LogExit))
    }

    /// Create a session in the Ready state with the simulation clock paused.
    /// A zero-step countdown starts play immediately.
    pub fn with_exit(config: &SessionConfig, exit: Box<dyn HostExit>) -> Self {
        let mut session = Self::unstarted(config, exit);
        session.open();
        session
    }

    /// Like [`Session::with_exit`], registering `subscribers` before play can
    /// begin so they see the start even with a zero-step countdown.
    pub fn with_subscribers(
        config: &SessionConfig,
        exit: Box<dyn HostExit>,
        subscribers: Vec<(SubscriberToken, Box<dyn MinigameSubscriber>)>,
    ) -> Result<Self, SessionError> {
        let mut session = Self::unstarted(config, exit);
        for (token, subscriber) in subscribers {
            session.subscribe(token, subscriber)?;
        }
        session.open();
        Ok(session)
    }

    /// Announce the first countdown value, or start play at once when there
    /// is no countdown. The announcement is delivered by the first
    /// `update_unscaled`.
    fn open(&mut self) {
        if self.countdown_remaining == 0 {
            self.begin_play();
            self.announced.push(SessionEvent::Started);
        } else {
            self.announced.push(SessionEvent::Countdown {
                remaining: self.countdown_remaining,
            });
        }
    }

    fn unstarted(config: &SessionConfig, exit: Box<dyn HostExit>) -> Self {
        let length = if config.minigame_length.is_finite() && config.minigame_length > 0.0 {
            config.minigame_length
        } else {
            tracing::warn!(
                length = config.minigame_length,
                "invalid minigame length, using default"
            );
            DEFAULT_MINIGAME_LENGTH
        };
        Self {
            control: SessionControl::new(exit),
            clock: SimClock::paused(),
            countdown_remaining: config.countdown_steps,
            countdown_elapsed: 0.0,
            timer: Countdown::new(length),
            timer_max: length,
            timeout_fired: false,
            subscribers: Vec::new(),
            announced: Vec::new(),
        }
    }

    /// Register a subscriber. Only allowed before play begins.
    pub fn subscribe(
        &mut self,
        token: SubscriberToken,
        subscriber: Box<dyn MinigameSubscriber>,
    ) -> Result<(), SessionError> {
        if self.control.state != SessionState::Ready {
            return Err(SessionError::SubscriptionsFrozen);
        }
        if self.subscribers.iter().any(|(t, _)| *t == token) {
            return Err(SessionError::DuplicateSubscriber(token));
        }
        self.subscribers.push((token, subscriber));
        Ok(())
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    pub fn state(&self) -> SessionState {
        self.control.state
    }

    pub fn control(&self) -> &SessionControl {
        &self.control
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn is_ended(&self) -> bool {
        self.control.is_ended()
    }

    pub fn end_report(&self) -> Option<EndReport> {
        self.control.end_report()
    }

    /// Remaining countdown seconds while Ready, for the countdown label.
    pub fn countdown_remaining(&self) -> Option<u8> {
        (self.control.state == SessionState::Ready).then_some(self.countdown_remaining)
    }

    /// Current value of the session timer (for a UI slider).
    pub fn timer_value(&self) -> f32 {
        self.timer.remaining()
    }

    pub fn timer_max(&self) -> f32 {
        self.timer_max
    }

    pub fn timed_out(&self) -> bool {
        self.timeout_fired
    }

    pub fn set_success(&mut self) -> Result<(), SessionError> {
        self.control.set_success()
    }

    pub fn set_failure(&mut self) -> Result<(), SessionError> {
        self.control.set_failure()
    }

    pub fn end_game(&mut self) -> Result<EndReport, SessionError> {
        self.control.end_game()
    }

    /// Advance the unscaled clock by one frame. Runs countdown steps as whole
    /// real seconds elapse and returns the scaled delta for simulation use.
    /// An ended session no longer advances.
    pub fn update_unscaled(&mut self, real_dt: f32) -> (f32, Vec<SessionEvent>) {
        if self.control.is_ended() {
            self.announced.clear();
            return (0.0, Vec::new());
        }
        let scaled = self.clock.advance(real_dt);
        let mut events = std::mem::take(&mut self.announced);
        if self.control.state == SessionState::Ready {
            self.countdown_elapsed += real_dt.max(0.0);
            while self.countdown_elapsed >= COUNTDOWN_STEP_SECS
                && self.control.state == SessionState::Ready
            {
                self.countdown_elapsed -= COUNTDOWN_STEP_SECS;
                events.extend(self.advance_countdown());
            }
        }
        (scaled, events)
    }

    /// Run one countdown step. The last step starts play.
    pub fn advance_countdown(&mut self) -> Vec<SessionEvent> {
        if self.control.state != SessionState::Ready || self.control.is_ended() {
            return Vec::new();
        }
        self.countdown_remaining = self.countdown_remaining.saturating_sub(1);
        if self.countdown_remaining == 0 {
            self.begin_play();
            vec![SessionEvent::Started]
        } else {
            vec![SessionEvent::Countdown {
                remaining: self.countdown_remaining,
            }]
        }
    }

    fn begin_play(&mut self) {
        self.clock.set_time_scale(1.0);
        self.control.state = SessionState::Playing;
        tracing::debug!(subscribers = self.subscribers.len(), "minigame started");
        for (_, subscriber) in &mut self.subscribers {
            subscriber.on_minigame_start(&mut self.control);
        }
    }

    /// Advance the session timer by one simulation step.
    pub fn step(&mut self, dt: f32) -> Vec<SessionEvent> {
        if self.control.state == SessionState::Ready || self.control.is_ended() {
            return Vec::new();
        }
        self.timer.tick(dt);
        if self.timer.is_active() || self.timeout_fired {
            return Vec::new();
        }
        self.timeout_fired = true;
        tracing::debug!("session timer expired");
        for (_, subscriber) in &mut self.subscribers {
            subscriber.on_timer_end(&mut self.control);
        }
        vec![SessionEvent::TimerExpired]
    }
}
