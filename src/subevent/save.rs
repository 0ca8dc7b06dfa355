//! Saves
//!
//! The target rolls a check tagged `saving_throw` against a difficulty
//! class and passes on meeting it. `saving_throw` computes its difficulty
//! class from the source's (or the source's origin's) ability and carries
//! damage that is halved or dropped on a pass.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::calculations::DifficultyClass;
use super::check::{AbilityCheck, CheckSpec, SAVING_THROW_TAG};
use super::core::{parse_payload, SubeventCore, SubeventKind};
use super::damage::{deliver_damage, DamageOptions, DamageOutcome};
use super::error::{Result, SubeventError};
use super::resolver::{Pipeline, Resolver};
use crate::combat::{DiceEntry, HasVampirism, Modification, Scale, Vampirism};
use crate::document::Document;

/// Proficiency key for saves with an ability
pub fn save_proficiency_key(ability: &str) -> String {
    format!("{}_save", ability)
}

fn resolve_pass_fail(resolver: &mut Resolver<'_>, core: &mut SubeventCore, passed: bool) -> Result<()> {
    let tag = if passed { "pass" } else { "fail" };
    resolver.resolve_branch(core, tag)?;
    Ok(())
}

#[derive(Debug, Deserialize)]
struct AbilitySavePayload {
    #[serde(flatten)]
    check: CheckSpec,
    difficulty_class: i64,
}

/// `ability_save`: the target saves against a fixed difficulty class
#[derive(Debug, Clone)]
pub struct AbilitySave {
    core: SubeventCore,
    spec: CheckSpec,
    difficulty_class: i64,
    save: Option<AbilityCheck>,
    passed: Option<bool>,
}

impl AbilitySave {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::AbilitySave, document)?;
        let payload: AbilitySavePayload = parse_payload(SubeventKind::AbilitySave, core.document())?;
        Ok(Self {
            core,
            spec: payload.check,
            difficulty_class: payload.difficulty_class,
            save: None,
            passed: None,
        })
    }

    pub fn difficulty_class(&self) -> i64 {
        self.difficulty_class
    }

    pub fn save(&self) -> Option<&AbilityCheck> {
        self.save.as_ref()
    }

    pub fn passed(&self) -> Option<bool> {
        self.passed
    }
}

impl Pipeline for AbilitySave {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    /// Roll modifications adjust the target's save
    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match self.save.as_mut() {
            Some(save) => save.apply_modification(modification),
            None => false,
        }
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        let key = self
            .spec
            .skill
            .clone()
            .unwrap_or_else(|| save_proficiency_key(&self.spec.ability));
        self.save = Some(AbilityCheck::nested(&self.core, &self.spec, SAVING_THROW_TAG, Some(key), false)?);
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let saver = Some(self.core.require_target()?);
        let source = self.core.source();
        let save = self
            .save
            .as_mut()
            .ok_or(SubeventError::MissingTarget(SubeventKind::AbilitySave.as_str()))?;
        resolver.run(save, saver, source)?;

        let passed = save.total() >= self.difficulty_class;
        debug!(total = save.total(), difficulty_class = self.difficulty_class, passed, "ability save");
        self.passed = Some(passed);
        resolve_pass_fail(resolver, &mut self.core, passed)
    }
}

/// Damage applied when the target passes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DamageOnPass {
    Half,
}

#[derive(Debug, Deserialize)]
struct SavingThrowPayload {
    save_ability: String,
    #[serde(default)]
    difficulty_class_ability: Option<String>,
    #[serde(default)]
    difficulty_class: Option<i64>,
    #[serde(default)]
    use_origin_difficulty_class_ability: bool,
    #[serde(default)]
    damage: Vec<DiceEntry>,
    #[serde(default)]
    damage_on_pass: Option<DamageOnPass>,
    /// Round half damage up instead of down
    #[serde(default)]
    round_up: bool,
    #[serde(default)]
    vampirism: Option<Vampirism>,
    #[serde(default)]
    determined: Vec<i64>,
}

/// `saving_throw`: difficulty class from an ability, damage on fail or pass
#[derive(Debug, Clone)]
pub struct SavingThrow {
    core: SubeventCore,
    payload_spec: CheckSpec,
    difficulty_class_ability: Option<String>,
    fixed_difficulty_class: Option<i64>,
    use_origin: bool,
    damage: Vec<DiceEntry>,
    damage_on_pass: Option<DamageOnPass>,
    round_up: bool,
    vampirism: Option<Vampirism>,
    save: Option<AbilityCheck>,
    difficulty_class: Option<i64>,
    passed: Option<bool>,
    outcome: Option<DamageOutcome>,
}

impl SavingThrow {
    pub fn from_document(document: Document) -> Result<Self> {
        let kind = SubeventKind::SavingThrow;
        let core = SubeventCore::from_document(kind, document)?;
        let payload: SavingThrowPayload = parse_payload(kind, core.document())?;
        if payload.difficulty_class.is_none() && payload.difficulty_class_ability.is_none() {
            return Err(SubeventError::MissingField {
                subevent: kind.as_str(),
                field: "difficulty_class or difficulty_class_ability",
            });
        }
        Ok(Self {
            core,
            payload_spec: CheckSpec {
                ability: payload.save_ability,
                skill: None,
                determined: payload.determined,
            },
            difficulty_class_ability: payload.difficulty_class_ability,
            fixed_difficulty_class: payload.difficulty_class,
            use_origin: payload.use_origin_difficulty_class_ability,
            damage: payload.damage,
            damage_on_pass: payload.damage_on_pass,
            round_up: payload.round_up,
            vampirism: payload.vampirism,
            save: None,
            difficulty_class: None,
            passed: None,
            outcome: None,
        })
    }

    pub fn save_ability(&self) -> &str {
        &self.payload_spec.ability
    }

    pub fn save(&self) -> Option<&AbilityCheck> {
        self.save.as_ref()
    }

    pub fn difficulty_class(&self) -> Option<i64> {
        self.difficulty_class
    }

    pub fn passed(&self) -> Option<bool> {
        self.passed
    }

    /// Damage dealt, when the save carried any and it applied
    pub fn outcome(&self) -> Option<&DamageOutcome> {
        self.outcome.as_ref()
    }

    fn compute_difficulty_class(&mut self, resolver: &mut Resolver<'_>) -> Result<i64> {
        let ability = match (&self.difficulty_class_ability, self.fixed_difficulty_class) {
            (Some(ability), _) => ability.clone(),
            (None, Some(fixed)) => return Ok(fixed),
            (None, None) => {
                return Err(SubeventError::MissingField {
                    subevent: SubeventKind::SavingThrow.as_str(),
                    field: "difficulty_class or difficulty_class_ability",
                })
            }
        };

        let source = self.core.require_source()?;
        let mut dc = DifficultyClass::nested(&self.core, &ability, self.fixed_difficulty_class)?;
        if self.use_origin {
            match resolver.object(source)?.origin {
                Some(origin) => dc = dc.with_ability_owner(origin),
                None => warn!(%source, "source has no origin, using its own ability"),
            }
        }
        resolver.run(&mut dc, Some(source), self.core.target())?;
        Ok(dc.value())
    }
}

impl HasVampirism for SavingThrow {
    fn vampirism(&self) -> Option<&Vampirism> {
        self.vampirism.as_ref()
    }

    fn set_vampirism(&mut self, vampirism: Vampirism) {
        self.vampirism = Some(vampirism);
    }
}

impl Pipeline for SavingThrow {
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
            other => match self.save.as_mut() {
                Some(save) => save.apply_modification(other),
                None => false,
            },
        }
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        let key = save_proficiency_key(&self.payload_spec.ability);
        self.save = Some(AbilityCheck::nested(
            &self.core,
            &self.payload_spec,
            SAVING_THROW_TAG,
            Some(key),
            false,
        )?);
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let saver = self.core.require_target()?;
        let difficulty_class = self.compute_difficulty_class(resolver)?;

        let source = self.core.source();
        let save = self
            .save
            .as_mut()
            .ok_or(SubeventError::MissingTarget(SubeventKind::SavingThrow.as_str()))?;
        resolver.run(save, Some(saver), source)?;
        let total = save.total();
        let passed = total >= difficulty_class;
        debug!(total, difficulty_class, passed, "saving throw");
        self.difficulty_class = Some(difficulty_class);
        self.passed = Some(passed);

        let scale = match (passed, self.damage_on_pass) {
            (false, _) => Some(None),
            (true, Some(DamageOnPass::Half)) => Some(Some(Scale::half(self.round_up))),
            (true, None) => None,
        };
        if let (Some(scale), false) = (scale, self.damage.is_empty()) {
            let options = DamageOptions {
                dice_multiplier: None,
                scale,
            };
            let outcome = deliver_damage(
                resolver,
                &self.core,
                self.damage.clone(),
                options,
                self.vampirism.as_ref(),
            )?;
            self.outcome = Some(outcome);
        }

        resolve_pass_fail(resolver, &mut self.core, passed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_saving_throw_requires_a_difficulty_class() {
        let err = SavingThrow::from_document(json!({
            "subevent": "saving_throw",
            "save_ability": "dex"
        }))
        .unwrap_err();
        assert!(matches!(err, SubeventError::MissingField { subevent: "saving_throw", .. }));
    }

    #[test]
    fn test_saving_throw_payload() {
        let save = SavingThrow::from_document(json!({
            "subevent": "saving_throw",
            "save_ability": "dex",
            "difficulty_class_ability": "int",
            "damage_on_pass": "half",
            "damage": [{"damage_type": "fire", "dice": [{"size": 6, "count": 8}]}]
        }))
        .unwrap();
        assert_eq!(save.save_ability(), "dex");
        assert_eq!(save.damage_on_pass, Some(DamageOnPass::Half));
        assert!(!save.round_up);
    }

    #[test]
    fn test_ability_save_payload() {
        let save = AbilitySave::from_document(json!({
            "subevent": "ability_save",
            "ability": "wis",
            "difficulty_class": 14,
            "determined": [9]
        }))
        .unwrap();
        assert_eq!(save.difficulty_class(), 14);
        assert_eq!(save_proficiency_key("wis"), "wis_save");
    }
}
