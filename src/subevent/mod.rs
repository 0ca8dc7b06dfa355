//! Subevents: the units of rules resolution
//!
//! A subevent is built from a document whose `subevent` field names its
//! kind. Resolution binds a source and target, applies matching effects,
//! and then runs the kind's own logic, which may resolve nested subevents
//! (stages, calculations, branches, riders) through the same pipeline.
//!
//! Kinds the engine builds internally (calculations and damage/healing
//! stages) are not exposed through [`Subevent`].

mod attack;
mod calculations;
mod check;
mod contest;
mod core;
mod damage;
mod error;
mod healing;
mod resolver;
mod resources;
mod save;
mod stages;

pub use attack::AttackRoll;
pub use calculations::{ArmorClass, DifficultyClass};
pub use check::{AbilityCheck, CheckSpec, CONTEST_TAG, SAVING_THROW_TAG};
pub use contest::{compare, AbilityContest, Contest, ContestOutcome, ContestTarget, DifficultyClassSpec};
pub use self::core::{check_discriminator, parse_payload, SubeventCore, SubeventKind};
pub use damage::{DamageAffinity, DamageDelivery, DamageOutcome, DealDamage};
pub use error::{Result, SubeventError};
pub use healing::{Heal, HealingDelivery, HealingOutcome};
pub use resolver::{Pipeline, Resolver};
pub use resources::{
    GiveResource, ResourceSelector, ResourceStateChange, Selection, SelectionMode, TakeResource,
};
pub use save::{save_proficiency_key, AbilitySave, DamageOnPass, SavingThrow};
pub use stages::{CollectionStage, Flavor, RollStage};

use crate::document::Document;

/// A resolvable subevent of any authorable kind
#[derive(Debug, Clone)]
pub enum Subevent {
    AbilityCheck(AbilityCheck),
    AbilityContest(AbilityContest),
    Contest(Contest),
    AbilitySave(AbilitySave),
    SavingThrow(SavingThrow),
    AttackRoll(AttackRoll),
    DealDamage(DealDamage),
    Heal(Heal),
    GiveResource(GiveResource),
    TakeResource(TakeResource),
    ExhaustResource(ResourceStateChange),
    RefreshResource(ResourceStateChange),
}

impl Subevent {
    /// Build the subevent named by the document's `subevent` field
    pub fn from_document(document: Document) -> Result<Self> {
        let name = document
            .get("subevent")
            .and_then(Document::as_str)
            .ok_or(SubeventError::MissingDiscriminator)?;
        let kind =
            SubeventKind::from_name(name).ok_or_else(|| SubeventError::UnknownSubevent(name.to_string()))?;

        let subevent = match kind {
            SubeventKind::AbilityCheck => Subevent::AbilityCheck(AbilityCheck::from_document(document)?),
            SubeventKind::AbilityContest => {
                Subevent::AbilityContest(AbilityContest::from_document(document)?)
            }
            SubeventKind::Contest => Subevent::Contest(Contest::from_document(document)?),
            SubeventKind::AbilitySave => Subevent::AbilitySave(AbilitySave::from_document(document)?),
            SubeventKind::SavingThrow => Subevent::SavingThrow(SavingThrow::from_document(document)?),
            SubeventKind::AttackRoll => Subevent::AttackRoll(AttackRoll::from_document(document)?),
            SubeventKind::DealDamage => Subevent::DealDamage(DealDamage::from_document(document)?),
            SubeventKind::Heal => Subevent::Heal(Heal::from_document(document)?),
            SubeventKind::GiveResource => Subevent::GiveResource(GiveResource::from_document(document)?),
            SubeventKind::TakeResource => Subevent::TakeResource(TakeResource::from_document(document)?),
            SubeventKind::ExhaustResource => {
                Subevent::ExhaustResource(ResourceStateChange::exhaust_from_document(document)?)
            }
            SubeventKind::RefreshResource => {
                Subevent::RefreshResource(ResourceStateChange::refresh_from_document(document)?)
            }
            internal => return Err(SubeventError::InternalSubevent(internal.as_str())),
        };
        Ok(subevent)
    }

    pub fn kind(&self) -> SubeventKind {
        self.core().kind()
    }

    pub fn core(&self) -> &SubeventCore {
        self.pipeline().core()
    }

    pub fn core_mut(&mut self) -> &mut SubeventCore {
        self.pipeline_mut().core_mut()
    }

    pub fn pipeline(&self) -> &dyn Pipeline {
        match self {
            Subevent::AbilityCheck(s) => s,
            Subevent::AbilityContest(s) => s,
            Subevent::Contest(s) => s,
            Subevent::AbilitySave(s) => s,
            Subevent::SavingThrow(s) => s,
            Subevent::AttackRoll(s) => s,
            Subevent::DealDamage(s) => s,
            Subevent::Heal(s) => s,
            Subevent::GiveResource(s) => s,
            Subevent::TakeResource(s) => s,
            Subevent::ExhaustResource(s) | Subevent::RefreshResource(s) => s,
        }
    }

    pub fn pipeline_mut(&mut self) -> &mut dyn Pipeline {
        match self {
            Subevent::AbilityCheck(s) => s,
            Subevent::AbilityContest(s) => s,
            Subevent::Contest(s) => s,
            Subevent::AbilitySave(s) => s,
            Subevent::SavingThrow(s) => s,
            Subevent::AttackRoll(s) => s,
            Subevent::DealDamage(s) => s,
            Subevent::Heal(s) => s,
            Subevent::GiveResource(s) => s,
            Subevent::TakeResource(s) => s,
            Subevent::ExhaustResource(s) | Subevent::RefreshResource(s) => s,
        }
    }

    /// Every subevent resolved beneath this one, depth first
    pub fn descendants(&self) -> Vec<&Subevent> {
        let mut out = Vec::new();
        for nested in self.core().nested() {
            out.push(nested);
            out.extend(nested.descendants());
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_document_dispatch() {
        let subevent = Subevent::from_document(json!({
            "subevent": "exhaust_resource",
            "resource": "spell_slot"
        }))
        .unwrap();
        assert!(matches!(subevent, Subevent::ExhaustResource(_)));
        assert_eq!(subevent.kind(), SubeventKind::ExhaustResource);

        let subevent = Subevent::from_document(json!({"subevent": "heal"})).unwrap();
        assert_eq!(subevent.kind(), SubeventKind::Heal);
    }

    #[test]
    fn test_from_document_errors() {
        assert!(matches!(
            Subevent::from_document(json!({"ability": "str"})),
            Err(SubeventError::MissingDiscriminator)
        ));
        assert!(matches!(
            Subevent::from_document(json!({"subevent": "teleport"})),
            Err(SubeventError::UnknownSubevent(ref name)) if name == "teleport"
        ));
        assert!(matches!(
            Subevent::from_document(json!({"subevent": "damage_delivery"})),
            Err(SubeventError::InternalSubevent("damage_delivery"))
        ));
        assert!(matches!(
            Subevent::from_document(json!({"subevent": "attack_roll"})),
            Err(SubeventError::Malformed { subevent: "attack_roll", .. })
        ));
    }
}
