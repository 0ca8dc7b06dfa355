//! Effects that modify subevents
//!
//! An effect is attached to an object and carries triggers. A trigger fires
//! when its filter document is a subset of a subevent's document view and
//! the effect's owner plays the required role (source, target, or either).
//! Firing applies the trigger's modifications to that subevent.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::damage::DiceEntry;
use super::dice::RerollMode;
use super::vampirism::Vampirism;
use crate::document::{Document, DocumentExt};

/// Tag that switches dedup identity from effect id to effect instance
pub const ALLOW_DUPLICATES_TAG: &str = "allow_duplicates";

/// Which role the effect's owner must play in the subevent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Source,
    Target,
    #[default]
    Any,
}

/// A change an effect makes to a subevent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "modification", rename_all = "snake_case")]
pub enum Modification {
    AddBonus {
        amount: i64,
    },
    SetValue {
        amount: i64,
    },
    GrantAdvantage,
    GrantDisadvantage,
    RequestReroll {
        mode: RerollMode,
    },
    AddDamage {
        entry: DiceEntry,
    },
    AddHealing {
        entry: DiceEntry,
    },
    MaximizeDamage {
        #[serde(default)]
        damage_type: Option<String>,
    },
    MaximizeHealing,
    RerollDice {
        threshold: i64,
        #[serde(default)]
        damage_type: Option<String>,
    },
    ClampDice {
        threshold: i64,
        set_to: i64,
        #[serde(default)]
        damage_type: Option<String>,
    },
    GrantImmunity,
    GrantResistance,
    GrantVulnerability,
    RevokeImmunity,
    RevokeResistance,
    RevokeVulnerability,
    Vampirism(Vampirism),
    /// Resolve another subevent with the same source and target
    InvokeSubevent {
        subevent: Document,
    },
}

/// A filter plus the modifications applied when it matches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EffectTrigger {
    pub filter: Document,
    #[serde(default)]
    pub actor: ActorRole,
    #[serde(default)]
    pub modifications: Vec<Modification>,
}

impl EffectTrigger {
    pub fn new(filter: Document) -> Self {
        Self {
            filter,
            actor: ActorRole::Any,
            modifications: Vec::new(),
        }
    }

    pub fn for_actor(mut self, actor: ActorRole) -> Self {
        self.actor = actor;
        self
    }

    pub fn with(mut self, modification: Modification) -> Self {
        self.modifications.push(modification);
        self
    }

    /// Whether this trigger fires for a subevent view and participant roles
    pub fn matches(
        &self,
        view: &Document,
        owner: Uuid,
        source: Option<Uuid>,
        target: Option<Uuid>,
    ) -> bool {
        let role_ok = match self.actor {
            ActorRole::Source => source == Some(owner),
            ActorRole::Target => target == Some(owner),
            ActorRole::Any => true,
        };
        role_ok && self.filter.subset_of(view)
    }
}

/// Dedup identity of an applied effect
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EffectIdentity {
    /// Every instance of the effect type counts as the same effect
    Id(String),
    /// Only this live instance counts
    Instance(Uuid),
}

/// An effect instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    /// Assigned by the registry
    #[serde(default)]
    pub uuid: Uuid,
    /// Effect type id, e.g. "bless" or "vampiric_touch"
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default)]
    pub triggers: Vec<EffectTrigger>,
}

impl Effect {
    pub fn new(id: &str) -> Self {
        Self {
            uuid: Uuid::nil(),
            id: id.to_string(),
            name: id.to_string(),
            tags: BTreeSet::new(),
            triggers: Vec::new(),
        }
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    pub fn with_trigger(mut self, trigger: EffectTrigger) -> Self {
        self.triggers.push(trigger);
        self
    }

    pub fn allows_duplicates(&self) -> bool {
        self.tags.contains(ALLOW_DUPLICATES_TAG)
    }

    pub fn identity(&self) -> EffectIdentity {
        if self.allows_duplicates() {
            EffectIdentity::Instance(self.uuid)
        } else {
            EffectIdentity::Id(self.id.clone())
        }
    }

    /// Modifications of every trigger that matches
    pub fn matching_modifications(
        &self,
        view: &Document,
        owner: Uuid,
        source: Option<Uuid>,
        target: Option<Uuid>,
    ) -> Vec<Modification> {
        self.triggers
            .iter()
            .filter(|t| t.matches(view, owner, source, target))
            .flat_map(|t| t.modifications.iter().cloned())
            .collect()
    }

    /// Whether any trigger matches
    pub fn triggers_on(
        &self,
        view: &Document,
        owner: Uuid,
        source: Option<Uuid>,
        target: Option<Uuid>,
    ) -> bool {
        self.triggers
            .iter()
            .any(|t| t.matches(view, owner, source, target))
    }
}
