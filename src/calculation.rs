//! Base + bonus + set numeric composition
//!
//! Shared by checks, attack rolls, armor class, and difficulty classes.
//! `get()` returns the set value when one is present, otherwise the base
//! (defaulting to 0) plus the accumulated bonus.

use serde::{Deserialize, Serialize};

/// How repeated `set` calls combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SetPolicy {
    /// The most recent set wins
    #[default]
    LastWrite,
    /// The highest value ever set wins
    KeepHighest,
}

/// A composable numeric calculation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Calculation {
    base: Option<i64>,
    bonus: i64,
    set: Option<i64>,
    policy: SetPolicy,
}

impl Calculation {
    /// Create a last-write-wins calculation
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a calculation with an explicit set policy
    pub fn with_policy(policy: SetPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    pub fn policy(&self) -> SetPolicy {
        self.policy
    }

    pub fn set_base(&mut self, value: i64) {
        self.base = Some(value);
    }

    /// Base value, 0 when never assigned
    pub fn base(&self) -> i64 {
        self.base.unwrap_or(0)
    }

    /// Add to the bonus (may be negative)
    pub fn add_bonus(&mut self, value: i64) {
        self.bonus += value;
    }

    pub fn bonus(&self) -> i64 {
        self.bonus
    }

    /// Assign the set value according to this calculation's policy
    pub fn set(&mut self, value: i64) {
        match self.policy {
            SetPolicy::LastWrite => self.set = Some(value),
            SetPolicy::KeepHighest => self.set_max(value),
        }
    }

    /// Assign the set value only if it is higher than the current one
    pub fn set_max(&mut self, value: i64) {
        self.set = Some(self.set.map_or(value, |current| current.max(value)));
    }

    pub fn set_value(&self) -> Option<i64> {
        self.set
    }

    pub fn get(&self) -> i64 {
        self.set.unwrap_or_else(|| self.base() + self.bonus)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bonus_only() {
        let mut calc = Calculation::new();
        calc.add_bonus(-5);
        calc.add_bonus(10);
        assert_eq!(calc.get(), 5);
    }

    #[test]
    fn test_set_overrides_base_and_bonus() {
        let mut calc = Calculation::new();
        calc.set_base(10);
        calc.add_bonus(4);
        assert_eq!(calc.get(), 14);
        calc.set(12);
        assert_eq!(calc.get(), 12);
        calc.add_bonus(100);
        assert_eq!(calc.get(), 12);
    }

    #[test]
    fn test_last_write_wins() {
        let mut calc = Calculation::new();
        calc.set(15);
        calc.set(11);
        assert_eq!(calc.get(), 11);
    }

    #[test]
    fn test_keep_highest() {
        let mut calc = Calculation::with_policy(SetPolicy::KeepHighest);
        calc.set_base(10);
        calc.set(16);
        calc.set(13);
        assert_eq!(calc.get(), 16);
        assert_eq!(calc.set_value(), Some(16));
    }

    #[test]
    fn test_set_max_on_last_write_calculation() {
        let mut calc = Calculation::new();
        calc.set_max(8);
        calc.set_max(3);
        assert_eq!(calc.get(), 8);
    }
}
