//! Answer entry for a single animal.
//!
//! A [`Round`] owns the typed answer, the hint reveal and the scoring for one
//! animal. It is a small state machine: `Idle -> Active` on [`Round::start`],
//! `Active -> Complete` on a correct [`Round::submit`] or a [`Round::skip`].
//! Wrong answers leave the round active so the player can keep editing.

use itertools::Itertools;
use thiserror::Error;
use tracing::debug;
use unicode_normalization::{char::is_combining_mark, UnicodeNormalization};

/// Points for a correct answer without any hints.
pub const BASE_POINTS: u32 = 10;
/// Points lost per hint.
pub const HINT_PENALTY: u32 = 2;
/// A correct answer never scores less than this.
pub const MIN_POINTS: u32 = 1;

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Outcome {
    Correct,
    Incorrect,
}

#[derive(Clone, Debug, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Active,
    Complete,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoundError {
    #[error("answer {0:?} has no letters left after normalization")]
    EmptyTarget(String),
}

/// How a finished round went. Fed to [`crate::session::SessionState`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RoundResult {
    pub points: u32,
    pub was_correct: bool,
    pub hints_used: u32,
}

/// `max(1, 10 - 2 * hints_used)`, without overflow for any hint count.
pub fn points_for_hints(hints_used: u32) -> u32 {
    BASE_POINTS
        .saturating_sub(hints_used.saturating_mul(HINT_PENALTY))
        .max(MIN_POINTS)
}

/// Characters the player is allowed to type.
pub fn is_permitted(c: char) -> bool {
    c == ' ' || c.is_alphabetic()
}

/// Turns a catalog name into the text the player has to type.
///
/// Accents are folded to plain letters (NFKD with combining marks removed),
/// hyphens become spaces, anything else that is not a letter is dropped and
/// whitespace runs collapse to one space. Case is preserved for display.
pub fn normalize_target(raw: &str) -> String {
    raw.nfkd()
        .filter(|c| !is_combining_mark(*c))
        .map(|c| if c == '-' { ' ' } else { c })
        .filter(|c| c.is_alphabetic() || c.is_whitespace())
        .collect::<String>()
        .split_whitespace()
        .join(" ")
}

/// Comparison form of an answer: lowercase, trimmed, single spaces.
pub fn normalize_answer(text: &str) -> String {
    text.split_whitespace().map(str::to_lowercase).join(" ")
}

pub fn answers_match(typed: &str, target: &str) -> bool {
    normalize_answer(typed) == normalize_answer(target)
}

#[derive(Debug, Clone)]
pub struct Round {
    target: Vec<char>,
    typed: Vec<char>,
    revealed_count: usize,
    hints_used: u32,
    failed_attempts: u32,
    phase: Phase,
    result: Option<RoundResult>,
}

impl Default for Round {
    fn default() -> Self {
        Self::new()
    }
}

impl Round {
    /// An idle round with no target yet.
    pub fn new() -> Self {
        Self {
            target: Vec::new(),
            typed: Vec::new(),
            revealed_count: 0,
            hints_used: 0,
            failed_attempts: 0,
            phase: Phase::Idle,
            result: None,
        }
    }

    /// Shorthand for `Round::new()` followed by [`Round::start`].
    pub fn started(target_text: &str) -> Result<Self, RoundError> {
        let mut round = Self::new();
        round.start(target_text)?;
        Ok(round)
    }

    pub fn start(&mut self, target_text: &str) -> Result<(), RoundError> {
        let target = normalize_target(target_text);
        if target.is_empty() {
            return Err(RoundError::EmptyTarget(target_text.to_string()));
        }

        debug!(target = %target, "round started");
        *self = Self {
            target: target.chars().collect(),
            phase: Phase::Active,
            ..Self::new()
        };
        Ok(())
    }

    pub fn handle_character(&mut self, c: char) {
        if self.phase != Phase::Active || !is_permitted(c) {
            return;
        }
        if self.typed.len() < self.target.len() {
            self.typed.push(c);
        }
    }

    pub fn handle_backspace(&mut self) {
        if self.phase == Phase::Active {
            self.typed.pop();
        }
    }

    pub fn request_hint(&mut self) {
        if self.phase != Phase::Active || self.revealed_count >= self.target.len() {
            return;
        }
        self.revealed_count += 1;
        self.hints_used += 1;
        debug!(revealed = self.revealed_count, "hint requested");
    }

    /// Checks the typed answer. `None` when the round is not active.
    pub fn submit(&mut self) -> Option<Outcome> {
        if self.phase != Phase::Active {
            return None;
        }

        if answers_match(&self.typed_text(), &self.target_text()) {
            let points = points_for_hints(self.hints_used);
            self.finish(RoundResult {
                points,
                was_correct: true,
                hints_used: self.hints_used,
            });
            Some(Outcome::Correct)
        } else {
            self.failed_attempts += 1;
            debug!(attempts = self.failed_attempts, "incorrect answer");
            Some(Outcome::Incorrect)
        }
    }

    /// Gives up on the animal. Scores nothing and breaks the streak.
    pub fn skip(&mut self) -> Option<RoundResult> {
        if self.phase != Phase::Active {
            return None;
        }
        let result = RoundResult {
            points: 0,
            was_correct: false,
            hints_used: self.hints_used,
        };
        self.finish(result);
        Some(result)
    }

    fn finish(&mut self, result: RoundResult) {
        debug!(points = result.points, correct = result.was_correct, "round complete");
        self.phase = Phase::Complete;
        self.result = Some(result);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.phase == Phase::Active
    }

    pub fn is_complete(&self) -> bool {
        self.phase == Phase::Complete
    }

    pub fn result(&self) -> Option<RoundResult> {
        self.result
    }

    pub fn target_text(&self) -> String {
        self.target.iter().collect()
    }

    pub fn target_len(&self) -> usize {
        self.target.len()
    }

    pub fn typed_text(&self) -> String {
        self.typed.iter().collect()
    }

    pub fn typed_len(&self) -> usize {
        self.typed.len()
    }

    pub fn revealed_count(&self) -> usize {
        self.revealed_count
    }

    /// The part of the answer uncovered by hints so far.
    pub fn revealed_text(&self) -> String {
        self.target[..self.revealed_count].iter().collect()
    }

    pub fn hints_used(&self) -> u32 {
        self.hints_used
    }

    pub fn failed_attempts(&self) -> u32 {
        self.failed_attempts
    }

    /// Points a correct answer would score right now.
    pub fn points_available(&self) -> u32 {
        points_for_hints(self.hints_used)
    }

    /// Each typed character paired with whether it matches the answer at
    /// that position, ignoring case.
    pub fn typed_outcomes(&self) -> impl Iterator<Item = (char, Outcome)> + '_ {
        self.typed.iter().zip(&self.target).map(|(&typed, &expected)| {
            let outcome = if typed.to_lowercase().eq(expected.to_lowercase()) {
                Outcome::Correct
            } else {
                Outcome::Incorrect
            };
            (typed, outcome)
        })
    }
}
