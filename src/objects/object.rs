//! Actor objects: the narrow slice of a game object the pipelines read and write

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use super::resource::Resource;
use crate::combat::AffinityProfile;
use crate::document::Document;

/// Score used for abilities an object does not define
pub const DEFAULT_ABILITY_SCORE: i64 = 10;

fn default_proficiency_bonus() -> i64 {
    2
}

fn default_armor_class() -> i64 {
    10
}

/// Health fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Health {
    pub current: i64,
    pub maximum: i64,
    #[serde(default)]
    pub temporary: i64,
}

impl Health {
    pub fn new(maximum: i64) -> Self {
        Self {
            current: maximum,
            maximum,
            temporary: 0,
        }
    }
}

/// An object taking part in rules resolution
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpgObject {
    /// Assigned by the registry
    #[serde(default)]
    pub uuid: Uuid,
    /// Author-facing id (e.g. "goblin_archer")
    pub id: String,
    #[serde(default)]
    pub name: String,
    /// Ability scores by name ("str", "dex", ...)
    #[serde(default)]
    pub abilities: BTreeMap<String, i64>,
    #[serde(default = "default_proficiency_bonus")]
    pub proficiency_bonus: i64,
    /// Skills and saves ("athletics", "dex_save") the object is proficient in
    #[serde(default)]
    pub proficiencies: BTreeSet<String>,
    pub health: Health,
    #[serde(default = "default_armor_class")]
    pub base_armor_class: i64,
    /// Object that created this one (summoner, caster of a conjured weapon)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<Uuid>,
    #[serde(default)]
    pub resources: Vec<Resource>,
    /// Effects attached to this object
    #[serde(default)]
    pub effects: Vec<Uuid>,
    #[serde(default)]
    pub affinities: AffinityProfile,
}

impl RpgObject {
    /// Create an object with full health and no abilities set
    pub fn new(id: &str, maximum_health: i64) -> Self {
        Self {
            uuid: Uuid::nil(),
            id: id.to_string(),
            name: id.to_string(),
            abilities: BTreeMap::new(),
            proficiency_bonus: default_proficiency_bonus(),
            proficiencies: BTreeSet::new(),
            health: Health::new(maximum_health),
            base_armor_class: default_armor_class(),
            origin: None,
            resources: Vec::new(),
            effects: Vec::new(),
            affinities: AffinityProfile::new(),
        }
    }

    pub fn with_ability(mut self, ability: &str, score: i64) -> Self {
        self.abilities.insert(ability.to_string(), score);
        self
    }

    pub fn with_proficiency(mut self, key: &str) -> Self {
        self.proficiencies.insert(key.to_string());
        self
    }

    pub fn with_armor_class(mut self, base: i64) -> Self {
        self.base_armor_class = base;
        self
    }

    pub fn with_resource(mut self, resource: Resource) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn ability_score(&self, ability: &str) -> i64 {
        match self.abilities.get(ability) {
            Some(score) => *score,
            None => {
                warn!(object = %self.id, ability, "unknown ability, using default score");
                DEFAULT_ABILITY_SCORE
            }
        }
    }

    /// `floor((score - 10) / 2)`
    pub fn ability_modifier(&self, ability: &str) -> i64 {
        (self.ability_score(ability) - 10).div_euclid(2)
    }

    pub fn is_proficient(&self, key: &str) -> bool {
        self.proficiencies.contains(key)
    }

    /// Proficiency bonus if proficient in `key`, otherwise 0
    pub fn proficiency_for(&self, key: Option<&str>) -> i64 {
        match key {
            Some(k) if self.is_proficient(k) => self.proficiency_bonus,
            _ => 0,
        }
    }

    /// Take damage: temporary health absorbs first. Returns damage taken.
    pub fn receive_damage(&mut self, amount: i64) -> i64 {
        if amount <= 0 {
            return 0;
        }
        let absorbed = amount.min(self.health.temporary);
        self.health.temporary -= absorbed;
        self.health.current -= amount - absorbed;
        amount
    }

    /// Heal up to maximum health. Returns the amount actually restored.
    pub fn receive_healing(&mut self, amount: i64) -> i64 {
        let actual = amount.clamp(0, (self.health.maximum - self.health.current).max(0));
        self.health.current += actual;
        actual
    }

    pub fn is_down(&self) -> bool {
        self.health.current <= 0
    }

    /// Snapshot as a document
    pub fn to_document(&self) -> Result<Document, serde_json::Error> {
        serde_json::to_value(self)
    }
}
