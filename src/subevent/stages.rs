//! Collection and roll stages shared by the damage and healing chains

use serde_json::json;
use tracing::debug;

use super::core::{SubeventCore, SubeventKind};
use super::error::Result;
use super::resolver::{Pipeline, Resolver};
use crate::combat::{DamageCollection, DiceEntry, Modification, RolledDamage};
use crate::document::Document;

/// Which chain a stage belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flavor {
    Damage,
    Healing,
}

impl Flavor {
    fn collection_kind(self) -> SubeventKind {
        match self {
            Flavor::Damage => SubeventKind::DamageCollection,
            Flavor::Healing => SubeventKind::HealingCollection,
        }
    }

    fn roll_kind(self) -> SubeventKind {
        match self {
            Flavor::Damage => SubeventKind::DamageRoll,
            Flavor::Healing => SubeventKind::HealingRoll,
        }
    }
}

/// Stage document: kind, the parent's tags, and the types present
pub(crate) fn stage_document(kind: SubeventKind, parent: &SubeventCore, entries: &[DiceEntry]) -> Document {
    json!({
        "subevent": kind.as_str(),
        "tags": parent.tags(),
        "damage_types": type_keys(entries),
    })
}

fn type_keys(entries: &[DiceEntry]) -> Vec<&str> {
    entries.iter().map(DiceEntry::type_key).collect()
}

/// `damage_collection` / `healing_collection`: effects add typed entries
#[derive(Debug, Clone)]
pub struct CollectionStage {
    core: SubeventCore,
    flavor: Flavor,
    collection: DamageCollection,
    dice_multiplier: Option<i64>,
}

impl CollectionStage {
    pub(crate) fn nested(
        parent: &SubeventCore,
        flavor: Flavor,
        entries: Vec<DiceEntry>,
        dice_multiplier: Option<i64>,
    ) -> Result<Self> {
        let kind = flavor.collection_kind();
        let collection = DamageCollection::new(entries);
        let document = stage_document(kind, parent, collection.entries());
        Ok(Self {
            core: SubeventCore::child(kind, document, parent)?,
            flavor,
            collection,
            dice_multiplier,
        })
    }

    pub fn collection(&self) -> &DamageCollection {
        &self.collection
    }

    pub(crate) fn into_collection(self) -> DamageCollection {
        self.collection
    }
}

impl Pipeline for CollectionStage {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn view(&self) -> Document {
        let mut view = self.core.document().clone();
        if let Some(map) = view.as_object_mut() {
            map.insert(
                "damage_types".to_string(),
                json!(type_keys(self.collection.entries())),
            );
            map.insert("critical".to_string(), json!(self.dice_multiplier.is_some()));
        }
        view
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match (self.flavor, modification) {
            (Flavor::Damage, Modification::AddDamage { entry })
            | (Flavor::Healing, Modification::AddHealing { entry }) => {
                self.collection.add(entry.clone());
                true
            }
            _ => false,
        }
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        Ok(())
    }

    fn invoke(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        if let Some(factor) = self.dice_multiplier {
            self.collection.multiply_dice(factor);
        }
        debug!(
            subevent = %self.core.kind(),
            types = ?type_keys(self.collection.entries()),
            "collected"
        );
        Ok(())
    }
}

/// `damage_roll` / `healing_roll`: every die rolled, then effects adjust faces
#[derive(Debug, Clone)]
pub struct RollStage {
    core: SubeventCore,
    flavor: Flavor,
    pending: Option<DamageCollection>,
    rolled: RolledDamage,
}

impl RollStage {
    pub(crate) fn nested(parent: &SubeventCore, flavor: Flavor, collection: DamageCollection) -> Result<Self> {
        let kind = flavor.roll_kind();
        let document = stage_document(kind, parent, collection.entries());
        Ok(Self {
            core: SubeventCore::child(kind, document, parent)?,
            flavor,
            pending: Some(collection),
            rolled: RolledDamage::default(),
        })
    }

    pub fn rolled(&self) -> &RolledDamage {
        &self.rolled
    }

    pub(crate) fn into_rolled(self) -> RolledDamage {
        self.rolled
    }
}

impl Pipeline for RollStage {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match (self.flavor, modification) {
            (Flavor::Damage, Modification::MaximizeDamage { damage_type }) => {
                self.rolled.maximize(damage_type.as_deref())
            }
            (Flavor::Healing, Modification::MaximizeHealing) => self.rolled.maximize(None),
            (_, Modification::RerollDice { threshold, damage_type }) => {
                self.rolled.reroll_at_or_below(*threshold, damage_type.as_deref())
            }
            (_, Modification::ClampDice { threshold, set_to, damage_type }) => {
                self.rolled
                    .clamp_at_or_below(*threshold, *set_to, damage_type.as_deref())
            }
            _ => return false,
        }
        true
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        if let Some(collection) = self.pending.take() {
            self.rolled = RolledDamage::roll(collection);
        }
        Ok(())
    }

    fn invoke(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        debug!(subevent = %self.core.kind(), totals = ?self.rolled.totals(), "rolled");
        Ok(())
    }
}
