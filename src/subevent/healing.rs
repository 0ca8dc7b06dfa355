//! Healing delivery: collection, roll, and delivery, capped at maximum health

use serde::Deserialize;
use tracing::info;

use super::core::{parse_payload, SubeventCore, SubeventKind};
use super::error::Result;
use super::resolver::{Pipeline, Resolver};
use super::stages::{stage_document, CollectionStage, Flavor, RollStage};
use crate::combat::{DiceEntry, Modification, RolledDamage};
use crate::document::Document;

/// What a healing chain did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HealingOutcome {
    /// Rolled healing before the maximum-health cap
    pub rolled: i64,
    /// Health actually restored
    pub restored: i64,
}

/// `healing_delivery`: add the rolled total to the target
#[derive(Debug, Clone)]
pub struct HealingDelivery {
    core: SubeventCore,
    rolled: RolledDamage,
    amount: i64,
    restored: i64,
}

impl HealingDelivery {
    fn nested(parent: &SubeventCore, rolled: RolledDamage) -> Result<Self> {
        let document = stage_document(SubeventKind::HealingDelivery, parent, rolled.entries());
        Ok(Self {
            core: SubeventCore::child(SubeventKind::HealingDelivery, document, parent)?,
            rolled,
            amount: 0,
            restored: 0,
        })
    }
}

impl Pipeline for HealingDelivery {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, _modification: &Modification) -> bool {
        false
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        self.amount = self.rolled.total();
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let target = self.core.require_target()?;
        let object = resolver.object_mut(target)?;
        self.restored = object.receive_healing(self.amount);
        info!(
            object = %object.id,
            healing = self.amount,
            restored = self.restored,
            current = object.health.current,
            "healing delivered"
        );
        Ok(())
    }
}

/// Run the healing chain from `parent`'s source to its target
pub(crate) fn deliver_healing(
    resolver: &mut Resolver<'_>,
    parent: &SubeventCore,
    entries: Vec<DiceEntry>,
) -> Result<HealingOutcome> {
    let (source, target) = (parent.source(), parent.target());

    let mut collection = CollectionStage::nested(parent, Flavor::Healing, entries, None)?;
    resolver.run(&mut collection, source, target)?;

    let mut roll = RollStage::nested(parent, Flavor::Healing, collection.into_collection())?;
    resolver.run(&mut roll, source, target)?;

    let mut delivery = HealingDelivery::nested(parent, roll.into_rolled())?;
    resolver.run(&mut delivery, source, target)?;

    Ok(HealingOutcome {
        rolled: delivery.amount,
        restored: delivery.restored,
    })
}

#[derive(Debug, Deserialize)]
struct HealPayload {
    #[serde(default)]
    healing: Vec<DiceEntry>,
}

/// `heal`
#[derive(Debug, Clone)]
pub struct Heal {
    core: SubeventCore,
    healing: Vec<DiceEntry>,
    outcome: Option<HealingOutcome>,
}

impl Heal {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::Heal, document)?;
        let payload: HealPayload = parse_payload(SubeventKind::Heal, core.document())?;
        Ok(Self {
            core,
            healing: payload.healing,
            outcome: None,
        })
    }

    pub fn healing(&self) -> &[DiceEntry] {
        &self.healing
    }

    pub fn outcome(&self) -> Option<HealingOutcome> {
        self.outcome
    }
}

impl Pipeline for Heal {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match modification {
            Modification::AddHealing { entry } => {
                self.healing.push(entry.clone());
                true
            }
            _ => false,
        }
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let outcome = deliver_healing(resolver, &self.core, self.healing.clone())?;
        self.outcome = Some(outcome);
        Ok(())
    }
}
