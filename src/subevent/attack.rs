//! Attack rolls
//!
//! The check die plus ability modifier (and proficiency bonus when
//! proficient) against the target's armor class. A natural maximum face
//! always hits and multiplies damage dice; a natural 1 always misses.

use serde::Deserialize;
use tracing::debug;

use super::calculations::ArmorClass;
use super::check::CheckRoll;
use super::core::{parse_payload, SubeventCore, SubeventKind};
use super::damage::{deliver_damage, DamageOptions, DamageOutcome};
use super::error::Result;
use super::resolver::{Pipeline, Resolver};
use crate::combat::{is_critical, is_fumble, DiceEntry, HasVampirism, Modification, Roll, Vampirism};
use crate::document::Document;

#[derive(Debug, Deserialize)]
struct AttackRollPayload {
    attack_ability: String,
    #[serde(default)]
    proficient: bool,
    #[serde(default)]
    damage: Vec<DiceEntry>,
    #[serde(default)]
    vampirism: Option<Vampirism>,
    #[serde(default)]
    determined: Vec<i64>,
}

/// `attack_roll`
#[derive(Debug, Clone)]
pub struct AttackRoll {
    core: SubeventCore,
    attack_ability: String,
    proficient: bool,
    damage: Vec<DiceEntry>,
    vampirism: Option<Vampirism>,
    roll: CheckRoll,
    ability_modifier: i64,
    armor_class: Option<i64>,
    hit: Option<bool>,
    critical: bool,
    outcome: Option<DamageOutcome>,
}

impl AttackRoll {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::AttackRoll, document)?;
        let payload: AttackRollPayload = parse_payload(SubeventKind::AttackRoll, core.document())?;
        Ok(Self {
            core,
            attack_ability: payload.attack_ability,
            proficient: payload.proficient,
            damage: payload.damage,
            vampirism: payload.vampirism,
            roll: CheckRoll::Queue(Roll::new(0).with_determined(payload.determined)),
            ability_modifier: 0,
            armor_class: None,
            hit: None,
            critical: false,
            outcome: None,
        })
    }

    pub fn attack_ability(&self) -> &str {
        &self.attack_ability
    }

    pub fn natural(&self) -> Option<i64> {
        self.roll.natural()
    }

    /// Attack total
    pub fn total(&self) -> i64 {
        self.roll.calculation().get()
    }

    pub fn armor_class(&self) -> Option<i64> {
        self.armor_class
    }

    pub fn hit(&self) -> Option<bool> {
        self.hit
    }

    pub fn critical(&self) -> bool {
        self.critical
    }

    pub fn outcome(&self) -> Option<&DamageOutcome> {
        self.outcome.as_ref()
    }

    /// Damage entries with the attack ability modifier folded into the first
    fn damage_entries(&self) -> Vec<DiceEntry> {
        let mut entries = self.damage.clone();
        if let Some(first) = entries.first_mut() {
            first.bonus += self.ability_modifier;
        }
        entries
    }
}

impl HasVampirism for AttackRoll {
    fn vampirism(&self) -> Option<&Vampirism> {
        self.vampirism.as_ref()
    }

    fn set_vampirism(&mut self, vampirism: Vampirism) {
        self.vampirism = Some(vampirism);
    }
}

impl Pipeline for AttackRoll {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match modification {
            Modification::AddDamage { entry } => {
                self.damage.push(entry.clone());
                true
            }
            Modification::Vampirism(vampirism) => {
                self.set_vampirism(vampirism.clone());
                true
            }
            other => self.roll.apply(other),
        }
    }

    fn prepare(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let attacker = resolver.object(self.core.require_source()?)?;
        self.ability_modifier = attacker.ability_modifier(&self.attack_ability);
        let proficiency = if self.proficient {
            attacker.proficiency_bonus
        } else {
            0
        };

        let faces = resolver.config().die_faces_check;
        if let CheckRoll::Queue(roll) = &mut self.roll {
            roll.set_faces(faces);
        }
        self.roll
            .calculation_mut()
            .add_bonus(self.ability_modifier + proficiency);
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let source = self.core.source();
        let defender = self.core.require_target()?;

        let mut armor_class = ArmorClass::nested(&self.core)?;
        resolver.run(&mut armor_class, Some(defender), source)?;
        let armor_class = armor_class.value();

        let faces = resolver.config().die_faces_check;
        let natural = self.roll.roll();
        self.critical = is_critical(natural, faces);
        let hit = if self.critical {
            true
        } else if is_fumble(natural) {
            false
        } else {
            self.total() >= armor_class
        };
        debug!(
            natural,
            total = self.total(),
            armor_class,
            hit,
            critical = self.critical,
            "attack roll"
        );
        self.armor_class = Some(armor_class);
        self.hit = Some(hit);

        if !hit {
            resolver.resolve_branch(&mut self.core, "miss")?;
            return Ok(());
        }

        if !self.damage.is_empty() {
            let options = DamageOptions {
                dice_multiplier: self
                    .critical
                    .then_some(resolver.config().critical_hit_dice_multiplier),
                scale: None,
            };
            let outcome = deliver_damage(
                resolver,
                &self.core,
                self.damage_entries(),
                options,
                self.vampirism.as_ref(),
            )?;
            self.outcome = Some(outcome);
        }
        resolver.resolve_branch(&mut self.core, "hit")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::Die;
    use serde_json::json;

    #[test]
    fn test_modifier_folds_into_first_entry() {
        let mut attack = AttackRoll::from_document(json!({
            "subevent": "attack_roll",
            "attack_ability": "str",
            "damage": [
                {"damage_type": "slashing", "dice": [{"size": 8}], "bonus": 1},
                {"damage_type": "fire", "dice": [{"size": 6}]}
            ]
        }))
        .unwrap();
        attack.ability_modifier = 3;
        let entries = attack.damage_entries();
        assert_eq!(entries[0].bonus, 4);
        assert_eq!(entries[1].bonus, 0);
    }

    #[test]
    fn test_added_damage_and_roll_modifications() {
        let mut attack = AttackRoll::from_document(json!({
            "subevent": "attack_roll",
            "attack_ability": "dex",
            "determined": [7, 15]
        }))
        .unwrap();
        let entry = DiceEntry::new(Some("piercing")).with_die(Die::new(6));
        assert!(attack.apply_modification(&Modification::AddDamage { entry }));
        assert!(attack.apply_modification(&Modification::GrantAdvantage));
        assert!(!attack.apply_modification(&Modification::GrantImmunity));
        assert_eq!(attack.damage.len(), 1);
    }
}
