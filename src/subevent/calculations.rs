//! Calculated values: armor class and difficulty class
//!
//! Both are owned by their subject, which is bound as the source.

use serde_json::json;
use tracing::debug;
use uuid::Uuid;

use super::core::{SubeventCore, SubeventKind};
use super::error::Result;
use super::resolver::{Pipeline, Resolver};
use crate::calculation::{Calculation, SetPolicy};
use crate::combat::Modification;

fn apply_to_calculation(calculation: &mut Calculation, modification: &Modification) -> bool {
    match modification {
        Modification::AddBonus { amount } => calculation.add_bonus(*amount),
        Modification::SetValue { amount } => calculation.set(*amount),
        _ => return false,
    }
    true
}

/// `armor_class`: base armor class + dex modifier; sets keep the highest
#[derive(Debug, Clone)]
pub struct ArmorClass {
    core: SubeventCore,
    calculation: Calculation,
}

impl ArmorClass {
    pub(crate) fn nested(parent: &SubeventCore) -> Result<Self> {
        let document = json!({
            "subevent": SubeventKind::ArmorClass.as_str(),
            "tags": parent.tags(),
        });
        Ok(Self {
            core: SubeventCore::child(SubeventKind::ArmorClass, document, parent)?,
            calculation: Calculation::with_policy(SetPolicy::KeepHighest),
        })
    }

    pub fn calculation(&self) -> &Calculation {
        &self.calculation
    }

    pub fn value(&self) -> i64 {
        self.calculation.get()
    }
}

impl Pipeline for ArmorClass {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        apply_to_calculation(&mut self.calculation, modification)
    }

    fn prepare(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let subject = resolver.object(self.core.require_source()?)?;
        self.calculation.set_base(subject.base_armor_class);
        self.calculation.add_bonus(subject.ability_modifier("dex"));
        Ok(())
    }

    fn invoke(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        debug!(armor_class = self.value(), "armor class");
        Ok(())
    }
}

/// `difficulty_class`: 8 + proficiency bonus + ability modifier
#[derive(Debug, Clone)]
pub struct DifficultyClass {
    core: SubeventCore,
    ability: String,
    /// Object whose ability score is used instead of the subject's
    ability_owner: Option<Uuid>,
    calculation: Calculation,
}

impl DifficultyClass {
    pub(crate) fn nested(parent: &SubeventCore, ability: &str, fixed: Option<i64>) -> Result<Self> {
        let document = json!({
            "subevent": SubeventKind::DifficultyClass.as_str(),
            "ability": ability,
            "tags": parent.tags(),
        });
        let mut calculation = Calculation::with_policy(SetPolicy::LastWrite);
        if let Some(value) = fixed {
            calculation.set(value);
        }
        Ok(Self {
            core: SubeventCore::child(SubeventKind::DifficultyClass, document, parent)?,
            ability: ability.to_string(),
            ability_owner: None,
            calculation,
        })
    }

    /// Read the ability modifier from `owner`; the subject still supplies
    /// the proficiency bonus
    pub(crate) fn with_ability_owner(mut self, owner: Uuid) -> Self {
        self.ability_owner = Some(owner);
        self
    }

    pub fn ability(&self) -> &str {
        &self.ability
    }

    pub fn calculation(&self) -> &Calculation {
        &self.calculation
    }

    pub fn value(&self) -> i64 {
        self.calculation.get()
    }
}

impl Pipeline for DifficultyClass {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        apply_to_calculation(&mut self.calculation, modification)
    }

    fn prepare(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let subject = resolver.object(self.core.require_source()?)?;
        let proficiency = subject.proficiency_bonus;
        let modifier = match self.ability_owner {
            Some(owner) => resolver.object(owner)?.ability_modifier(&self.ability),
            None => subject.ability_modifier(&self.ability),
        };
        self.calculation.set_base(8);
        self.calculation.add_bonus(proficiency + modifier);
        Ok(())
    }

    fn invoke(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        debug!(ability = %self.ability, difficulty_class = self.value(), "difficulty class");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EngineConfig;
    use crate::objects::{Context, Registry, RpgObject};

    fn parent() -> SubeventCore {
        SubeventCore::from_document(
            SubeventKind::AttackRoll,
            json!({"subevent": "attack_roll", "attack_ability": "str"}),
        )
        .unwrap()
    }

    #[test]
    fn test_armor_class_keeps_highest_set() {
        let mut registry = Registry::new();
        let knight = registry.register_object(
            RpgObject::new("knight", 20)
                .with_armor_class(16)
                .with_ability("dex", 12),
        );
        let context = Context::new();
        let config = EngineConfig::default();
        let mut resolver = Resolver::new(&mut registry, &context, &config);

        let mut ac = ArmorClass::nested(&parent()).unwrap();
        resolver.run(&mut ac, Some(knight), None).unwrap();
        assert_eq!(ac.value(), 17);

        ac.apply_modification(&Modification::SetValue { amount: 19 });
        ac.apply_modification(&Modification::SetValue { amount: 15 });
        assert_eq!(ac.value(), 19);
    }

    #[test]
    fn test_difficulty_class() {
        let mut registry = Registry::new();
        let mage = registry.register_object(RpgObject::new("mage", 12).with_ability("int", 18));
        let context = Context::new();
        let config = EngineConfig::default();
        let mut resolver = Resolver::new(&mut registry, &context, &config);

        let mut dc = DifficultyClass::nested(&parent(), "int", None).unwrap();
        resolver.run(&mut dc, Some(mage), None).unwrap();
        assert_eq!(dc.value(), 8 + 2 + 4);

        dc.apply_modification(&Modification::SetValue { amount: 20 });
        dc.apply_modification(&Modification::SetValue { amount: 11 });
        assert_eq!(dc.value(), 11);

        let mut fixed = DifficultyClass::nested(&parent(), "int", Some(13)).unwrap();
        resolver.run(&mut fixed, Some(mage), None).unwrap();
        assert_eq!(fixed.value(), 13);
    }

    #[test]
    fn test_difficulty_class_with_borrowed_ability() {
        let mut registry = Registry::new();
        let mut archmage = RpgObject::new("archmage", 30).with_ability("int", 18);
        archmage.proficiency_bonus = 6;
        let archmage = registry.register_object(archmage);
        let imp = registry.register_object(RpgObject::new("imp", 6).with_ability("int", 6));
        let context = Context::new();
        let config = EngineConfig::default();
        let mut resolver = Resolver::new(&mut registry, &context, &config);

        // imp proficiency 2, archmage int +4
        let mut dc = DifficultyClass::nested(&parent(), "int", None)
            .unwrap()
            .with_ability_owner(archmage);
        resolver.run(&mut dc, Some(imp), None).unwrap();
        assert_eq!(dc.value(), 8 + 2 + 4);
    }
}
