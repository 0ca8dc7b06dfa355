//! Damage affinities
//!
//! A target classifies each damage type as:
//! - Immune (no damage)
//! - Resistant (scaled down, 1/2 by default)
//! - Vulnerable (scaled up, 2x by default)
//! - Normal
//!
//! Immunity, resistance, and vulnerability are granted and revoked
//! independently; resistance and vulnerability together cancel out.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::damage::Scale;

/// Classification of a damage type for one target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
    Immune,
    Resistant,
    Normal,
    Vulnerable,
}

impl Affinity {
    /// Apply this affinity to an amount under the ruleset's policy
    pub fn apply(&self, amount: i64, policy: &AffinityPolicy) -> i64 {
        match self {
            Affinity::Immune => 0,
            Affinity::Resistant => policy.resistance.apply(amount),
            Affinity::Normal => amount,
            Affinity::Vulnerable => policy.vulnerability.apply(amount),
        }
    }
}

impl std::fmt::Display for Affinity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Affinity::Immune => "immune",
            Affinity::Resistant => "resistant",
            Affinity::Normal => "normal",
            Affinity::Vulnerable => "vulnerable",
        };
        write!(f, "{}", s)
    }
}

/// Scale factors the ruleset applies per affinity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityPolicy {
    pub resistance: Scale,
    pub vulnerability: Scale,
}

impl Default for AffinityPolicy {
    fn default() -> Self {
        Self {
            resistance: Scale::half(false),
            vulnerability: Scale::new(2, 1, false),
        }
    }
}

/// Independently granted affinity flags for one damage type
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AffinityFlags {
    #[serde(default)]
    pub immunity: bool,
    #[serde(default)]
    pub resistance: bool,
    #[serde(default)]
    pub vulnerability: bool,
}

impl AffinityFlags {
    pub fn grant_immunity(&mut self) {
        self.immunity = true;
    }

    pub fn revoke_immunity(&mut self) {
        self.immunity = false;
    }

    pub fn grant_resistance(&mut self) {
        self.resistance = true;
    }

    pub fn revoke_resistance(&mut self) {
        self.resistance = false;
    }

    pub fn grant_vulnerability(&mut self) {
        self.vulnerability = true;
    }

    pub fn revoke_vulnerability(&mut self) {
        self.vulnerability = false;
    }

    /// Immunity wins; resistance and vulnerability cancel
    pub fn classify(&self) -> Affinity {
        if self.immunity {
            return Affinity::Immune;
        }
        match (self.resistance, self.vulnerability) {
            (true, false) => Affinity::Resistant,
            (false, true) => Affinity::Vulnerable,
            _ => Affinity::Normal,
        }
    }

    fn is_empty(&self) -> bool {
        !(self.immunity || self.resistance || self.vulnerability)
    }
}

/// Standing affinities of an object, keyed by damage type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AffinityProfile {
    types: BTreeMap<String, AffinityFlags>,
}

impl AffinityProfile {
    pub fn new() -> Self {
        Self::default()
    }

    /// Flags for a type (all clear when never set)
    pub fn flags(&self, damage_type: &str) -> AffinityFlags {
        self.types.get(damage_type).copied().unwrap_or_default()
    }

    pub fn classify(&self, damage_type: &str) -> Affinity {
        self.flags(damage_type).classify()
    }

    fn update(&mut self, damage_type: &str, change: impl FnOnce(&mut AffinityFlags)) {
        let flags = self.types.entry(damage_type.to_string()).or_default();
        change(flags);
        if flags.is_empty() {
            self.types.remove(damage_type);
        }
    }

    pub fn grant_immunity(&mut self, damage_type: &str) {
        self.update(damage_type, AffinityFlags::grant_immunity);
    }

    pub fn revoke_immunity(&mut self, damage_type: &str) {
        self.update(damage_type, AffinityFlags::revoke_immunity);
    }

    pub fn grant_resistance(&mut self, damage_type: &str) {
        self.update(damage_type, AffinityFlags::grant_resistance);
    }

    pub fn revoke_resistance(&mut self, damage_type: &str) {
        self.update(damage_type, AffinityFlags::revoke_resistance);
    }

    pub fn grant_vulnerability(&mut self, damage_type: &str) {
        self.update(damage_type, AffinityFlags::grant_vulnerability);
    }

    pub fn revoke_vulnerability(&mut self, damage_type: &str) {
        self.update(damage_type, AffinityFlags::revoke_vulnerability);
    }

    fn with(&self, affinity: Affinity) -> Vec<String> {
        self.types
            .iter()
            .filter(|(_, flags)| flags.classify() == affinity)
            .map(|(t, _)| t.clone())
            .collect()
    }

    pub fn immunities(&self) -> Vec<String> {
        self.with(Affinity::Immune)
    }

    pub fn resistances(&self) -> Vec<String> {
        self.with(Affinity::Resistant)
    }

    pub fn vulnerabilities(&self) -> Vec<String> {
        self.with(Affinity::Vulnerable)
    }
}
