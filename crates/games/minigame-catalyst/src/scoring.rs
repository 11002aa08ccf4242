use serde::{Deserialize, Serialize};

use minigame_core::session::{Session, SessionState};

use crate::flask::DropletType;

/// Droplets of each color needed to win.
pub const REQUIRED_DROPS: u32 = 20;

/// Receives droplets poured out of the flask.
pub trait ScoreSink {
    fn score(&mut self, kind: DropletType, session: &mut Session);
}

/// Per-color totals against a shared goal. Marks the session Success once
/// every color reaches the goal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreCounter {
    required_drops: u32,
    scores: [u32; DropletType::COUNT],
}

impl Default for ScoreCounter {
    fn default() -> Self {
        Self::new(REQUIRED_DROPS)
    }
}

impl ScoreCounter {
    pub fn new(required_drops: u32) -> Self {
        Self {
            required_drops,
            scores: [0; DropletType::COUNT],
        }
    }

    pub fn required_drops(&self) -> u32 {
        self.required_drops
    }

    pub fn score_of(&self, kind: DropletType) -> u32 {
        self.scores[kind.index()]
    }

    /// Board text for one color, e.g. `"3/20"`.
    pub fn board_text(&self, kind: DropletType) -> String {
        format!("{}/{}", self.score_of(kind), self.required_drops)
    }

    pub fn all_goals_met(&self) -> bool {
        self.scores.iter().all(|s| *s >= self.required_drops)
    }

    pub fn add(&mut self, kind: DropletType) -> u32 {
        let slot = &mut self.scores[kind.index()];
        *slot = slot.saturating_add(1);
        *slot
    }
}

impl ScoreSink for ScoreCounter {
    fn score(&mut self, kind: DropletType, session: &mut Session) {
        let total = self.add(kind);
        tracing::debug!(?kind, total, "droplet scored");
        if self.all_goals_met() && session.state() == SessionState::Playing {
            if let Err(e) = session.set_success() {
                tracing::warn!("could not mark success: {e}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use minigame_core::session::SessionConfig;

    use super::*;

    fn playing_session() -> Session {
        Session::new(&SessionConfig {
            countdown_steps: 0,
            ..Default::default()
        })
    }

    #[test]
    fn board_text_starts_at_zero() {
        let counter = ScoreCounter::default();
        assert_eq!(counter.board_text(DropletType::Green), "0/20");
    }

    #[test]
    fn scores_count_per_color() {
        let mut session = playing_session();
        let mut counter = ScoreCounter::new(3);
        counter.score(DropletType::Red, &mut session);
        counter.score(DropletType::Red, &mut session);
        assert_eq!(counter.score_of(DropletType::Red), 2);
        assert_eq!(counter.score_of(DropletType::Blue), 0);
        assert_eq!(counter.board_text(DropletType::Red), "2/3");
    }

    #[test]
    fn success_only_when_every_color_meets_goal() {
        let mut session = playing_session();
        let mut counter = ScoreCounter::new(2);
        for kind in [DropletType::Blue, DropletType::Green, DropletType::Red] {
            counter.score(kind, &mut session);
            counter.score(kind, &mut session);
        }
        assert_eq!(session.state(), SessionState::Playing);
        counter.score(DropletType::Cyan, &mut session);
        assert_eq!(session.state(), SessionState::Playing);
        counter.score(DropletType::Cyan, &mut session);
        assert_eq!(session.state(), SessionState::Success);
        assert!(!session.is_ended(), "winning marks but does not end");
    }
}
