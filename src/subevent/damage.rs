//! Damage delivery
//!
//! The chain runs collection, roll, and delivery stages as nested subevents
//! so effects can hook each of them. Delivery resolves one
//! `damage_affinity` subevent per damage type, subtracts the result from the
//! target, and then pays any vampirism rider out of the pre-affinity totals.

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::core::{parse_payload, SubeventCore, SubeventKind};
use super::error::Result;
use super::resolver::{Pipeline, Resolver};
use super::stages::{stage_document, CollectionStage, Flavor, RollStage};
use crate::combat::{
    Affinity, AffinityFlags, DamageTotals, DiceEntry, HasVampirism, Modification, RolledDamage,
    Scale, Vampirism,
};
use crate::document::Document;

/// What a damage chain did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DamageOutcome {
    /// Totals per type after scaling, before affinity
    pub rolled: DamageTotals,
    /// Totals per type after affinity
    pub delivered: DamageTotals,
    /// Damage subtracted from the target
    pub total: i64,
    /// Health the source regained through vampirism
    pub vampiric_healing: i64,
}

/// Options a damage-dealing subevent passes to the chain
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct DamageOptions {
    /// Damage dice count multiplier (critical hits)
    pub dice_multiplier: Option<i64>,
    /// Extra scale on every entry (half damage on a save)
    pub scale: Option<Scale>,
}

/// Run the damage chain from `parent`'s source to its target
pub(crate) fn deliver_damage(
    resolver: &mut Resolver<'_>,
    parent: &SubeventCore,
    entries: Vec<DiceEntry>,
    options: DamageOptions,
    vampirism: Option<&Vampirism>,
) -> Result<DamageOutcome> {
    let (source, target) = (parent.source(), parent.target());

    let mut collection = CollectionStage::nested(parent, Flavor::Damage, entries, options.dice_multiplier)?;
    resolver.run(&mut collection, source, target)?;

    let mut roll = RollStage::nested(parent, Flavor::Damage, collection.into_collection())?;
    resolver.run(&mut roll, source, target)?;

    let mut rolled = roll.into_rolled();
    if let Some(scale) = options.scale {
        rolled.scale_all(scale);
    }

    let mut delivery = DamageDelivery::nested(parent, rolled)?;
    resolver.run(&mut delivery, source, target)?;

    let mut outcome = DamageOutcome {
        rolled: delivery.pre_affinity.clone(),
        delivered: delivery.delivered.clone(),
        total: delivery.total,
        vampiric_healing: 0,
    };

    if let Some(vampirism) = vampirism {
        let healing = vampirism.healing(&outcome.rolled);
        let source = parent.require_source()?;
        let object = resolver.object_mut(source)?;
        outcome.vampiric_healing = object.receive_healing(healing);
        info!(
            object = %object.id,
            owed = healing,
            restored = outcome.vampiric_healing,
            "vampiric healing"
        );
    }
    Ok(outcome)
}

/// `damage_affinity`: classification of one damage type for the target
#[derive(Debug, Clone)]
pub struct DamageAffinity {
    core: SubeventCore,
    damage_type: String,
    amount: i64,
    flags: AffinityFlags,
    affinity: Affinity,
    result: i64,
}

impl DamageAffinity {
    fn nested(parent: &SubeventCore, damage_type: &str, amount: i64, flags: AffinityFlags) -> Result<Self> {
        let document = json!({
            "subevent": SubeventKind::DamageAffinity.as_str(),
            "tags": parent.tags(),
            "damage_type": damage_type,
        });
        Ok(Self {
            core: SubeventCore::child(SubeventKind::DamageAffinity, document, parent)?,
            damage_type: damage_type.to_string(),
            amount,
            flags,
            affinity: Affinity::Normal,
            result: amount,
        })
    }

    pub fn damage_type(&self) -> &str {
        &self.damage_type
    }

    pub fn flags(&self) -> AffinityFlags {
        self.flags
    }

    pub fn affinity(&self) -> Affinity {
        self.affinity
    }

    pub fn result(&self) -> i64 {
        self.result
    }
}

impl Pipeline for DamageAffinity {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match modification {
            Modification::GrantImmunity => self.flags.grant_immunity(),
            Modification::GrantResistance => self.flags.grant_resistance(),
            Modification::GrantVulnerability => self.flags.grant_vulnerability(),
            Modification::RevokeImmunity => self.flags.revoke_immunity(),
            Modification::RevokeResistance => self.flags.revoke_resistance(),
            Modification::RevokeVulnerability => self.flags.revoke_vulnerability(),
            _ => return false,
        }
        true
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        self.affinity = self.flags.classify();
        self.result = self.affinity.apply(self.amount, &resolver.config().affinity);
        debug!(
            damage_type = %self.damage_type,
            affinity = %self.affinity,
            amount = self.amount,
            result = self.result,
            "damage affinity"
        );
        Ok(())
    }
}

/// `damage_delivery`: reduce rolled entries to totals and apply them
#[derive(Debug, Clone)]
pub struct DamageDelivery {
    core: SubeventCore,
    rolled: RolledDamage,
    pre_affinity: DamageTotals,
    delivered: DamageTotals,
    total: i64,
}

impl DamageDelivery {
    fn nested(parent: &SubeventCore, rolled: RolledDamage) -> Result<Self> {
        let document = stage_document(SubeventKind::DamageDelivery, parent, rolled.entries());
        Ok(Self {
            core: SubeventCore::child(SubeventKind::DamageDelivery, document, parent)?,
            rolled,
            pre_affinity: DamageTotals::new(),
            delivered: DamageTotals::new(),
            total: 0,
        })
    }
}

impl Pipeline for DamageDelivery {
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
        self.pre_affinity = self.rolled.totals();
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let target = self.core.require_target()?;
        let profile = resolver.object(target)?.affinities.clone();

        for (damage_type, amount) in self.pre_affinity.clone() {
            let flags = profile.flags(&damage_type);
            let mut affinity = DamageAffinity::nested(&self.core, &damage_type, amount, flags)?;
            resolver.run(&mut affinity, self.core.source(), Some(target))?;
            self.delivered.insert(damage_type, affinity.result());
        }

        let total: i64 = self.delivered.values().sum();
        let object = resolver.object_mut(target)?;
        self.total = object.receive_damage(total);
        info!(
            object = %object.id,
            damage = self.total,
            by_type = ?self.delivered,
            current = object.health.current,
            temporary = object.health.temporary,
            "damage delivered"
        );
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct DealDamagePayload {
    #[serde(default)]
    damage: Vec<DiceEntry>,
    #[serde(default)]
    vampirism: Option<Vampirism>,
}

/// `deal_damage`: run the damage chain against the target
#[derive(Debug, Clone)]
pub struct DealDamage {
    core: SubeventCore,
    damage: Vec<DiceEntry>,
    vampirism: Option<Vampirism>,
    outcome: Option<DamageOutcome>,
}

impl DealDamage {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::DealDamage, document)?;
        let payload: DealDamagePayload = parse_payload(SubeventKind::DealDamage, core.document())?;
        Ok(Self {
            core,
            damage: payload.damage,
            vampirism: payload.vampirism,
            outcome: None,
        })
    }

    pub fn damage(&self) -> &[DiceEntry] {
        &self.damage
    }

    pub fn outcome(&self) -> Option<&DamageOutcome> {
        self.outcome.as_ref()
    }
}

impl HasVampirism for DealDamage {
    fn vampirism(&self) -> Option<&Vampirism> {
        self.vampirism.as_ref()
    }

    fn set_vampirism(&mut self, vampirism: Vampirism) {
        self.vampirism = Some(vampirism);
    }
}

impl Pipeline for DealDamage {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match modification {
            Modification::AddDamage { entry } => self.damage.push(entry.clone()),
            Modification::Vampirism(vampirism) => self.set_vampirism(vampirism.clone()),
            _ => return false,
        }
        true
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let outcome = deliver_damage(
            resolver,
            &self.core,
            self.damage.clone(),
            DamageOptions::default(),
            self.vampirism.as_ref(),
        )?;
        self.outcome = Some(outcome);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_affinity_modifications() {
        let parent = SubeventCore::from_document(
            SubeventKind::DealDamage,
            json!({"subevent": "deal_damage"}),
        )
        .unwrap();
        let mut affinity =
            DamageAffinity::nested(&parent, "fire", 10, AffinityFlags::default()).unwrap();
        assert_eq!(affinity.view()["damage_type"], json!("fire"));

        assert!(affinity.apply_modification(&Modification::GrantResistance));
        assert!(affinity.apply_modification(&Modification::GrantVulnerability));
        assert_eq!(affinity.flags().classify(), Affinity::Normal);

        assert!(affinity.apply_modification(&Modification::RevokeVulnerability));
        assert_eq!(affinity.flags().classify(), Affinity::Resistant);
        assert!(!affinity.apply_modification(&Modification::MaximizeHealing));
    }

    #[test]
    fn test_payload_accepts_type_alias() {
        let deal = DealDamage::from_document(json!({
            "subevent": "deal_damage",
            "damage": [{"type": "fire", "dice": [{"size": 6, "count": 2}], "bonus": 1}],
            "vampirism": {"numerator": 1, "denominator": 2}
        }))
        .unwrap();
        assert_eq!(deal.damage()[0].type_key(), "fire");
        assert_eq!(deal.vampirism(), Some(&Vampirism::new(1, 2, false)));
    }
}
