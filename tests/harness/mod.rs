//! Integration test harness
//!
//! - `Table` - an encounter plus engine config, with helpers to attach
//!   effects and resolve subevent documents
//! - Stock objects with known ability modifiers and armor classes
//!
//! Every die in these tests is scripted through `determined` values.

#![allow(dead_code)]

use rulebook::combat::{ActorRole, Effect, EffectTrigger, Modification};
use rulebook::objects::Resource;
use rulebook::subevent::SubeventError;
use rulebook::{Encounter, EngineConfig, RpgObject, Subevent};
use serde_json::Value;
use uuid::Uuid;

/// An encounter with every registered object in context
pub struct Table {
    pub encounter: Encounter,
    pub config: EngineConfig,
}

impl Table {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            encounter: Encounter::new(),
            config,
        }
    }

    pub fn add(&mut self, object: RpgObject) -> Uuid {
        self.encounter.add_object(object)
    }

    /// Register an effect owned by `owner`
    pub fn attach(&mut self, owner: Uuid, effect: Effect) -> Uuid {
        self.encounter
            .registry
            .register_effect(effect, owner)
            .expect("owner is registered")
    }

    pub fn try_resolve(
        &mut self,
        document: Value,
        source: Uuid,
        target: Uuid,
    ) -> Result<Subevent, SubeventError> {
        self.encounter
            .resolve(&self.config, document, Some(source), Some(target))
    }

    pub fn resolve(&mut self, document: Value, source: Uuid, target: Uuid) -> Subevent {
        self.try_resolve(document, source, target)
            .expect("subevent resolves")
    }

    pub fn object(&self, uuid: Uuid) -> &RpgObject {
        self.encounter
            .registry
            .object(uuid)
            .expect("object is registered")
    }

    pub fn object_mut(&mut self, uuid: Uuid) -> &mut RpgObject {
        self.encounter
            .registry
            .object_mut(uuid)
            .expect("object is registered")
    }

    pub fn health(&self, uuid: Uuid) -> i64 {
        self.object(uuid).health.current
    }
}

/// Str +3, dex +2, proficiency +2 in athletics and str saves, 30 hp, AC 16
pub fn fighter() -> RpgObject {
    RpgObject::new("fighter", 30)
        .with_ability("str", 16)
        .with_ability("dex", 14)
        .with_ability("con", 14)
        .with_proficiency("athletics")
        .with_proficiency("str_save")
        .with_armor_class(14)
}

/// Int +4, dex +1, proficiency +2, 20 hp
pub fn wizard() -> RpgObject {
    RpgObject::new("wizard", 20)
        .with_ability("int", 18)
        .with_ability("dex", 12)
}

/// Str -1, dex +2, 12 hp, AC 15
pub fn goblin() -> RpgObject {
    RpgObject::new("goblin", 12)
        .with_ability("str", 8)
        .with_ability("dex", 14)
        .with_armor_class(13)
}

/// All abilities 10, 40 hp
pub fn dummy(id: &str) -> RpgObject {
    RpgObject::new(id, 40)
}

/// Spell slots of potency 1 through 9
pub fn spell_slots() -> Vec<Resource> {
    (1..=9)
        .map(|potency| Resource::new("spell_slot", potency).with_tag("spell_slot"))
        .collect()
}

/// An effect with a single trigger
pub fn effect(id: &str, filter: Value, actor: ActorRole, modifications: Vec<Modification>) -> Effect {
    let mut trigger = EffectTrigger::new(filter).for_actor(actor);
    for modification in modifications {
        trigger = trigger.with(modification);
    }
    Effect::new(id).with_trigger(trigger)
}
