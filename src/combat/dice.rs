//! Die rolls with advantage/disadvantage
//!
//! Faces come from a FIFO of scripted (`determined`) values first and from
//! the thread RNG once the queue is empty, so every roll can be made
//! deterministic in content and tests.

use std::collections::VecDeque;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::calculation::Calculation;

/// Roll one die: next scripted value, or a random face in `1..=faces`
pub fn roll_die(faces: i64, determined: &mut VecDeque<i64>) -> i64 {
    determined
        .pop_front()
        .unwrap_or_else(|| rand::rng().random_range(1..=faces.max(1)))
}

/// Check if a natural roll is the die's highest face
pub fn is_critical(natural: i64, faces: i64) -> bool {
    natural == faces
}

/// Check if a natural roll is a 1
pub fn is_fumble(natural: i64) -> bool {
    natural == 1
}

/// Effective roll mode after advantage and disadvantage cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RollMode {
    Normal,
    Advantage,
    Disadvantage,
}

impl RollMode {
    fn from_flags(advantage: bool, disadvantage: bool) -> Self {
        match (advantage, disadvantage) {
            (true, false) => RollMode::Advantage,
            (false, true) => RollMode::Disadvantage,
            _ => RollMode::Normal,
        }
    }

    /// Pick the kept value out of two candidates
    fn keep(self, first: i64, second: i64) -> i64 {
        match self {
            RollMode::Normal => first,
            RollMode::Advantage => first.max(second),
            RollMode::Disadvantage => first.min(second),
        }
    }
}

/// Which value an external reroll step should keep
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RerollMode {
    UseNew,
    UseHighest,
    UseLowest,
}

/// A recorded request for a reroll; the reroll itself happens elsewhere
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RerollRequest {
    pub mode: RerollMode,
}

/// A single d20-style roll feeding a calculation's base.
///
/// A normal roll consumes one scripted value; an advantage or disadvantage
/// roll consumes two and keeps the max or min.
#[derive(Debug, Clone, Default)]
pub struct Roll {
    faces: i64,
    advantage: bool,
    disadvantage: bool,
    determined: VecDeque<i64>,
    natural: Option<i64>,
    calculation: Calculation,
    reroll: Option<RerollRequest>,
}

impl Roll {
    pub fn new(faces: i64) -> Self {
        Self {
            faces,
            ..Self::default()
        }
    }

    /// Script the faces this roll will consume, in order
    pub fn with_determined(mut self, values: impl IntoIterator<Item = i64>) -> Self {
        self.determined = values.into_iter().collect();
        self
    }

    pub fn grant_advantage(&mut self) {
        self.advantage = true;
    }

    pub fn grant_disadvantage(&mut self) {
        self.disadvantage = true;
    }

    pub fn mode(&self) -> RollMode {
        RollMode::from_flags(self.advantage, self.disadvantage)
    }

    pub fn faces(&self) -> i64 {
        self.faces
    }

    /// Change the die size before rolling
    pub fn set_faces(&mut self, faces: i64) {
        self.faces = faces;
    }

    /// Resolve the die and store the kept face as the calculation base
    pub fn roll(&mut self) -> i64 {
        let mode = self.mode();
        let first = roll_die(self.faces, &mut self.determined);
        let natural = match mode {
            RollMode::Normal => first,
            _ => mode.keep(first, roll_die(self.faces, &mut self.determined)),
        };
        debug!(?mode, natural, "rolled d{}", self.faces);
        self.natural = Some(natural);
        self.calculation.set_base(natural);
        natural
    }

    /// The kept face, once rolled
    pub fn natural(&self) -> Option<i64> {
        self.natural
    }

    pub fn calculation(&self) -> &Calculation {
        &self.calculation
    }

    pub fn calculation_mut(&mut self) -> &mut Calculation {
        &mut self.calculation
    }

    pub fn request_reroll(&mut self, mode: RerollMode) {
        self.reroll = Some(RerollRequest { mode });
    }

    pub fn reroll_request(&self) -> Option<RerollRequest> {
        self.reroll
    }

    pub fn get(&self) -> i64 {
        self.calculation.get()
    }
}

/// A roll made from two explicitly named candidates.
///
/// Contests pre-roll both candidates for every party before any result is
/// kept, so all of them are visible at once.
#[derive(Debug, Clone, Default)]
pub struct ContestRoll {
    faces: i64,
    advantage: bool,
    disadvantage: bool,
    first: Option<i64>,
    second: Option<i64>,
    natural: Option<i64>,
    calculation: Calculation,
    reroll: Option<RerollRequest>,
}

impl ContestRoll {
    pub fn new(faces: i64) -> Self {
        Self {
            faces,
            ..Self::default()
        }
    }

    /// Pre-set the first and second candidates
    pub fn with_candidates(mut self, first: Option<i64>, second: Option<i64>) -> Self {
        self.first = first;
        self.second = second;
        self
    }

    pub fn grant_advantage(&mut self) {
        self.advantage = true;
    }

    pub fn grant_disadvantage(&mut self) {
        self.disadvantage = true;
    }

    pub fn mode(&self) -> RollMode {
        RollMode::from_flags(self.advantage, self.disadvantage)
    }

    /// Change the die size before candidates are rolled
    pub fn set_faces(&mut self, faces: i64) {
        self.faces = faces;
    }

    /// Fill in any candidate not yet rolled and return both
    pub fn prepare_candidates(&mut self) -> (i64, i64) {
        let mut empty = VecDeque::new();
        let faces = self.faces;
        let first = *self.first.get_or_insert_with(|| roll_die(faces, &mut empty));
        let second = *self.second.get_or_insert_with(|| roll_die(faces, &mut empty));
        (first, second)
    }

    pub fn first(&self) -> Option<i64> {
        self.first
    }

    pub fn second(&self) -> Option<i64> {
        self.second
    }

    /// Keep one candidate according to the mode
    pub fn roll(&mut self) -> i64 {
        let (first, second) = self.prepare_candidates();
        let mode = self.mode();
        let natural = mode.keep(first, second);
        debug!(?mode, first, second, natural, "contest roll");
        self.natural = Some(natural);
        self.calculation.set_base(natural);
        natural
    }

    pub fn natural(&self) -> Option<i64> {
        self.natural
    }

    pub fn calculation(&self) -> &Calculation {
        &self.calculation
    }

    pub fn calculation_mut(&mut self) -> &mut Calculation {
        &mut self.calculation
    }

    pub fn request_reroll(&mut self, mode: RerollMode) {
        self.reroll = Some(RerollRequest { mode });
    }

    pub fn reroll_request(&self) -> Option<RerollRequest> {
        self.reroll
    }

    pub fn get(&self) -> i64 {
        self.calculation.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_roll_die_prefers_scripted_values() {
        let mut queue = VecDeque::from(vec![4, 2]);
        assert_eq!(roll_die(6, &mut queue), 4);
        assert_eq!(roll_die(6, &mut queue), 2);
        for _ in 0..100 {
            let value = roll_die(6, &mut queue);
            assert!((1..=6).contains(&value), "roll {} out of bounds", value);
        }
    }

    #[test]
    fn test_normal_roll_consumes_one_value() {
        let mut roll = Roll::new(20).with_determined([7, 15]);
        assert_eq!(roll.roll(), 7);
        assert_eq!(roll.roll(), 15);
    }

    #[test]
    fn test_advantage_keeps_highest() {
        let mut roll = Roll::new(20).with_determined([7, 15]);
        roll.grant_advantage();
        assert_eq!(roll.roll(), 15);
        assert_eq!(roll.natural(), Some(15));
    }

    #[test]
    fn test_disadvantage_keeps_lowest() {
        let mut roll = Roll::new(20).with_determined([7, 15]);
        roll.grant_disadvantage();
        assert_eq!(roll.roll(), 7);
    }

    #[test]
    fn test_advantage_and_disadvantage_cancel() {
        let script = [3, 18, 11, 9];

        let mut neither = Roll::new(20).with_determined(script);
        let mut both = Roll::new(20).with_determined(script);
        both.grant_advantage();
        both.grant_disadvantage();
        both.grant_advantage();

        for _ in 0..script.len() {
            assert_eq!(neither.roll(), both.roll());
        }
        assert_eq!(both.mode(), RollMode::Normal);
    }

    #[test]
    fn test_roll_feeds_calculation_base() {
        let mut roll = Roll::new(20).with_determined([12]);
        roll.calculation_mut().add_bonus(3);
        roll.roll();
        assert_eq!(roll.get(), 15);
    }

    #[test]
    fn test_contest_roll_candidates() {
        let mut roll = ContestRoll::new(20).with_candidates(Some(4), Some(17));
        assert_eq!(roll.prepare_candidates(), (4, 17));
        assert_eq!(roll.roll(), 4);

        let mut advantaged = ContestRoll::new(20).with_candidates(Some(4), Some(17));
        advantaged.grant_advantage();
        assert_eq!(advantaged.roll(), 17);

        let mut random = ContestRoll::new(20);
        let (a, b) = random.prepare_candidates();
        assert_eq!(random.first(), Some(a));
        assert_eq!(random.second(), Some(b));
    }

    #[test]
    fn test_reroll_request_is_recorded_only() {
        let mut roll = Roll::new(20).with_determined([2, 19]);
        roll.request_reroll(RerollMode::UseHighest);
        assert_eq!(roll.roll(), 2);
        assert_eq!(
            roll.reroll_request(),
            Some(RerollRequest {
                mode: RerollMode::UseHighest
            })
        );
    }

    #[test]
    fn test_critical_fumble() {
        assert!(is_critical(20, 20));
        assert!(!is_critical(19, 20));
        assert!(is_fumble(1));
        assert!(!is_fumble(2));
    }
}
