use crate::round::RoundResult;

/// Score and streak across the rounds of one game.
///
/// Owned by the [`crate::app::App`] and handed out by reference; starting a
/// new game calls [`SessionState::reset`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionState {
    pub score: u32,
    pub streak: u32,
    pub best_streak: u32,
    pub hints_used_total: u32,
    pub rounds_played: u32,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_result(&mut self, points: u32, was_correct: bool) {
        self.score = self.score.saturating_add(points);
        if was_correct {
            self.streak += 1;
            self.best_streak = self.best_streak.max(self.streak);
        } else {
            self.streak = 0;
        }
    }

    /// Records a finished round, including its hints and the round counter.
    pub fn record_round(&mut self, result: &RoundResult) {
        self.record_result(result.points, result.was_correct);
        self.hints_used_total = self.hints_used_total.saturating_add(result.hints_used);
        self.rounds_played += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
