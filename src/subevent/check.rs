//! Ability checks
//!
//! A check rolls the check die for its source and adds the source's ability
//! modifier plus its proficiency bonus when proficient in the skill (or in
//! `<ability>_save` for saving throws). Checks are resolved standalone or
//! nested inside contests and saves, where the roller is bound as source.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use super::core::{parse_payload, SubeventCore, SubeventKind};
use super::error::Result;
use super::resolver::{Pipeline, Resolver};
use crate::calculation::Calculation;
use crate::combat::{ContestRoll, Modification, RerollRequest, Roll};
use crate::document::Document;

/// Tag carried by checks made as saving throws
pub const SAVING_THROW_TAG: &str = "saving_throw";

/// Tag carried by checks made as one side of a contest
pub const CONTEST_TAG: &str = "contest";

/// The check-shaped part of a document (`ability`, `skill`, `determined`)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckSpec {
    pub ability: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skill: Option<String>,
    /// Scripted die faces, consumed in order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub determined: Vec<i64>,
}

impl CheckSpec {
    pub fn new(ability: &str) -> Self {
        Self {
            ability: ability.to_string(),
            skill: None,
            determined: Vec::new(),
        }
    }
}

/// Either a queue-driven roll or a two-candidate contest roll
#[derive(Debug, Clone)]
pub(crate) enum CheckRoll {
    Queue(Roll),
    Candidates(ContestRoll),
}

impl CheckRoll {
    pub(crate) fn roll(&mut self) -> i64 {
        match self {
            CheckRoll::Queue(roll) => roll.roll(),
            CheckRoll::Candidates(roll) => roll.roll(),
        }
    }

    pub(crate) fn natural(&self) -> Option<i64> {
        match self {
            CheckRoll::Queue(roll) => roll.natural(),
            CheckRoll::Candidates(roll) => roll.natural(),
        }
    }

    pub(crate) fn calculation(&self) -> &Calculation {
        match self {
            CheckRoll::Queue(roll) => roll.calculation(),
            CheckRoll::Candidates(roll) => roll.calculation(),
        }
    }

    pub(crate) fn calculation_mut(&mut self) -> &mut Calculation {
        match self {
            CheckRoll::Queue(roll) => roll.calculation_mut(),
            CheckRoll::Candidates(roll) => roll.calculation_mut(),
        }
    }

    pub(crate) fn reroll_request(&self) -> Option<RerollRequest> {
        match self {
            CheckRoll::Queue(roll) => roll.reroll_request(),
            CheckRoll::Candidates(roll) => roll.reroll_request(),
        }
    }

    /// Apply the roll-shaped modifications; false for anything else
    pub(crate) fn apply(&mut self, modification: &Modification) -> bool {
        match modification {
            Modification::AddBonus { amount } => self.calculation_mut().add_bonus(*amount),
            Modification::SetValue { amount } => self.calculation_mut().set(*amount),
            Modification::GrantAdvantage => match self {
                CheckRoll::Queue(roll) => roll.grant_advantage(),
                CheckRoll::Candidates(roll) => roll.grant_advantage(),
            },
            Modification::GrantDisadvantage => match self {
                CheckRoll::Queue(roll) => roll.grant_disadvantage(),
                CheckRoll::Candidates(roll) => roll.grant_disadvantage(),
            },
            Modification::RequestReroll { mode } => match self {
                CheckRoll::Queue(roll) => roll.request_reroll(*mode),
                CheckRoll::Candidates(roll) => roll.request_reroll(*mode),
            },
            _ => return false,
        }
        true
    }
}

/// `ability_check`
#[derive(Debug, Clone)]
pub struct AbilityCheck {
    core: SubeventCore,
    spec: CheckSpec,
    proficiency_key: Option<String>,
    roll: CheckRoll,
}

impl AbilityCheck {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::AbilityCheck, document)?;
        let spec: CheckSpec = parse_payload(SubeventKind::AbilityCheck, core.document())?;
        Ok(Self::build(core, spec, None, false))
    }

    /// A check nested inside `parent` (contest side, save)
    pub(crate) fn nested(
        parent: &SubeventCore,
        spec: &CheckSpec,
        extra_tag: &str,
        proficiency_key: Option<String>,
        contest: bool,
    ) -> Result<Self> {
        let tags: Vec<&str> = parent
            .tags()
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(extra_tag))
            .collect();
        let mut document = json!({
            "subevent": SubeventKind::AbilityCheck.as_str(),
            "ability": spec.ability,
            "tags": tags,
        });
        if let (Some(skill), Some(map)) = (&spec.skill, document.as_object_mut()) {
            map.insert("skill".to_string(), json!(skill));
        }
        let core = SubeventCore::child(SubeventKind::AbilityCheck, document, parent)?;
        Ok(Self::build(core, spec.clone(), proficiency_key, contest))
    }

    fn build(
        core: SubeventCore,
        spec: CheckSpec,
        proficiency_key: Option<String>,
        contest: bool,
    ) -> Self {
        let proficiency_key = proficiency_key.or_else(|| spec.skill.clone());
        // Faces are filled in from the configured die in prepare
        let roll = if contest {
            let mut determined = spec.determined.iter().copied();
            CheckRoll::Candidates(ContestRoll::new(0).with_candidates(determined.next(), determined.next()))
        } else {
            CheckRoll::Queue(Roll::new(0).with_determined(spec.determined.iter().copied()))
        };
        Self {
            core,
            spec,
            proficiency_key,
            roll,
        }
    }

    pub fn ability(&self) -> &str {
        &self.spec.ability
    }

    pub fn skill(&self) -> Option<&str> {
        self.spec.skill.as_deref()
    }

    pub fn proficiency_key(&self) -> Option<&str> {
        self.proficiency_key.as_deref()
    }

    /// Pre-roll both candidates of a contest roll so they are visible up front
    pub(crate) fn prepare_candidates(&mut self, faces: i64) -> Option<(i64, i64)> {
        match &mut self.roll {
            CheckRoll::Candidates(roll) => {
                roll.set_faces(faces);
                Some(roll.prepare_candidates())
            }
            CheckRoll::Queue(_) => None,
        }
    }

    /// Kept die face, once rolled
    pub fn natural(&self) -> Option<i64> {
        self.roll.natural()
    }

    pub fn calculation(&self) -> &Calculation {
        self.roll.calculation()
    }

    pub fn reroll_request(&self) -> Option<RerollRequest> {
        self.roll.reroll_request()
    }

    /// Check total
    pub fn total(&self) -> i64 {
        self.roll.calculation().get()
    }
}

impl Pipeline for AbilityCheck {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        self.roll.apply(modification)
    }

    fn prepare(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let roller = self.core.require_source()?;
        let faces = resolver.config().die_faces_check;
        match &mut self.roll {
            CheckRoll::Queue(roll) => roll.set_faces(faces),
            CheckRoll::Candidates(roll) => roll.set_faces(faces),
        }

        let object = resolver.object(roller)?;
        let modifier = object.ability_modifier(&self.spec.ability);
        let proficiency = object.proficiency_for(self.proficiency_key.as_deref());
        self.roll.calculation_mut().add_bonus(modifier + proficiency);
        Ok(())
    }

    fn invoke(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        let natural = self.roll.roll();
        debug!(
            ability = %self.spec.ability,
            skill = ?self.spec.skill,
            natural,
            total = self.total(),
            "ability check"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::RerollMode;

    #[test]
    fn test_check_roll_modifications() {
        let mut roll = CheckRoll::Queue(Roll::new(20).with_determined([8, 15]));
        assert!(roll.apply(&Modification::AddBonus { amount: 2 }));
        assert!(roll.apply(&Modification::GrantAdvantage));
        assert!(roll.apply(&Modification::RequestReroll { mode: RerollMode::UseHighest }));
        assert!(!roll.apply(&Modification::MaximizeHealing));

        assert_eq!(roll.roll(), 15);
        assert_eq!(roll.calculation().get(), 17);
        assert_eq!(roll.reroll_request().map(|r| r.mode), Some(RerollMode::UseHighest));
    }

    #[test]
    fn test_set_value_overrides_roll() {
        let mut roll = CheckRoll::Candidates(ContestRoll::new(20).with_candidates(Some(3), Some(4)));
        roll.apply(&Modification::SetValue { amount: 12 });
        roll.roll();
        assert_eq!(roll.natural(), Some(3));
        assert_eq!(roll.calculation().get(), 12);
    }

    #[test]
    fn test_from_document() {
        let check = AbilityCheck::from_document(serde_json::json!({
            "subevent": "ability_check",
            "ability": "dex",
            "skill": "stealth",
            "determined": [12]
        }))
        .unwrap();
        assert_eq!(check.ability(), "dex");
        assert_eq!(check.proficiency_key(), Some("stealth"));
        assert_eq!(check.natural(), None);
    }

    #[test]
    fn test_from_document_rejects_other_kinds() {
        let err = AbilityCheck::from_document(serde_json::json!({
            "subevent": "attack_roll",
            "attack_ability": "str"
        }))
        .unwrap_err();
        assert!(matches!(err, super::super::SubeventError::Mismatch { .. }));
    }
}
