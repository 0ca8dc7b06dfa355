//! Contests
//!
//! Tie-break depends on what the source is compared against:
//! - another ability check: the source must strictly exceed it, and a tie
//!   resolves neither branch
//! - a difficulty class or a static value: meeting it is enough

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::calculations::DifficultyClass;
use super::check::{AbilityCheck, CheckSpec, CONTEST_TAG};
use super::core::{parse_payload, SubeventCore, SubeventKind};
use super::error::{Result, SubeventError};
use super::resolver::{Pipeline, Resolver};
use crate::combat::Modification;
use crate::document::Document;

/// Result of comparing two contest totals
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestOutcome {
    SourceWins,
    TargetWins,
    Tie,
}

/// Compare totals; with `must_exceed_target` an equal total is a tie
pub fn compare(source: i64, target: i64, must_exceed_target: bool) -> ContestOutcome {
    if source > target || (!must_exceed_target && source == target) {
        ContestOutcome::SourceWins
    } else if source < target {
        ContestOutcome::TargetWins
    } else {
        ContestOutcome::Tie
    }
}

/// A difficulty class given directly or computed from the target's ability
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DifficultyClassSpec {
    Ability {
        difficulty_class_ability: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        determined_difficulty_class: Option<i64>,
    },
    Fixed {
        difficulty_class: i64,
    },
}

/// What the source's check is compared against
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ContestTarget {
    Static(i64),
    Check(CheckSpec),
    DifficultyClass(DifficultyClassSpec),
}

impl ContestTarget {
    pub fn must_exceed_target(&self) -> bool {
        matches!(self, ContestTarget::Check(_))
    }
}

#[derive(Debug, Deserialize)]
struct ContestPayload {
    source_check: CheckSpec,
    target: ContestTarget,
}

/// `contest`: source check against a check, a difficulty class, or a value
#[derive(Debug, Clone)]
pub struct Contest {
    core: SubeventCore,
    source_spec: CheckSpec,
    target: ContestTarget,
    source_check: Option<AbilityCheck>,
    target_check: Option<AbilityCheck>,
    source_total: Option<i64>,
    target_total: Option<i64>,
    outcome: Option<ContestOutcome>,
}

impl Contest {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::Contest, document)?;
        let payload: ContestPayload = parse_payload(SubeventKind::Contest, core.document())?;
        Ok(Self {
            core,
            source_spec: payload.source_check,
            target: payload.target,
            source_check: None,
            target_check: None,
            source_total: None,
            target_total: None,
            outcome: None,
        })
    }

    pub fn target_spec(&self) -> &ContestTarget {
        &self.target
    }

    pub fn source_check(&self) -> Option<&AbilityCheck> {
        self.source_check.as_ref()
    }

    pub fn target_check(&self) -> Option<&AbilityCheck> {
        self.target_check.as_ref()
    }

    pub fn source_total(&self) -> Option<i64> {
        self.source_total
    }

    pub fn target_total(&self) -> Option<i64> {
        self.target_total
    }

    pub fn outcome(&self) -> Option<ContestOutcome> {
        self.outcome
    }

    fn resolve_target(&mut self, resolver: &mut Resolver<'_>) -> Result<i64> {
        let (source, target) = (self.core.source(), self.core.target());
        match &self.target {
            ContestTarget::Static(value) => Ok(*value),
            ContestTarget::DifficultyClass(DifficultyClassSpec::Fixed { difficulty_class }) => {
                Ok(*difficulty_class)
            }
            ContestTarget::DifficultyClass(DifficultyClassSpec::Ability {
                difficulty_class_ability,
                determined_difficulty_class,
            }) => {
                let owner = self.core.require_target()?;
                let mut dc = DifficultyClass::nested(
                    &self.core,
                    difficulty_class_ability,
                    *determined_difficulty_class,
                )?;
                resolver.run(&mut dc, Some(owner), source)?;
                Ok(dc.value())
            }
            ContestTarget::Check(_) => {
                let check = self
                    .target_check
                    .as_mut()
                    .ok_or(SubeventError::MissingTarget(SubeventKind::Contest.as_str()))?;
                resolver.run(check, target, source)?;
                Ok(check.total())
            }
        }
    }
}

impl Pipeline for Contest {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    /// Roll modifications on the contest adjust the source's check
    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match self.source_check.as_mut() {
            Some(check) => check.apply_modification(modification),
            None => false,
        }
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        let versus_check = self.target.must_exceed_target();
        self.source_check = Some(AbilityCheck::nested(
            &self.core,
            &self.source_spec,
            CONTEST_TAG,
            None,
            versus_check,
        )?);
        if let ContestTarget::Check(spec) = &self.target {
            self.target_check = Some(AbilityCheck::nested(&self.core, spec, CONTEST_TAG, None, true)?);
        }
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let (source, target) = (self.core.source(), self.core.target());
        if self.target.must_exceed_target() {
            self.core.require_target()?;
        }

        let faces = resolver.config().die_faces_check;
        for check in [self.source_check.as_mut(), self.target_check.as_mut()]
            .into_iter()
            .flatten()
        {
            if let Some((first, second)) = check.prepare_candidates(faces) {
                debug!(ability = %check.ability(), first, second, "contest candidates");
            }
        }

        let source_check = self
            .source_check
            .as_mut()
            .ok_or(SubeventError::MissingSource(SubeventKind::Contest.as_str()))?;
        resolver.run(source_check, source, target)?;
        let source_total = source_check.total();
        let target_total = self.resolve_target(resolver)?;

        let outcome = compare(source_total, target_total, self.target.must_exceed_target());
        debug!(source_total, target_total, ?outcome, "contest");
        self.source_total = Some(source_total);
        self.target_total = Some(target_total);
        self.outcome = Some(outcome);

        match outcome {
            ContestOutcome::SourceWins => {
                resolver.resolve_branch(&mut self.core, "source_wins")?;
            }
            ContestOutcome::TargetWins => {
                resolver.resolve_branch(&mut self.core, "target_wins")?;
            }
            ContestOutcome::Tie => {}
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct AbilityContestPayload {
    source_check: CheckSpec,
    target_check: CheckSpec,
}

/// `ability_contest`: both sides roll checks; the strictly higher total wins
#[derive(Debug, Clone)]
pub struct AbilityContest {
    core: SubeventCore,
    source_spec: CheckSpec,
    target_spec: CheckSpec,
    source_check: Option<AbilityCheck>,
    target_check: Option<AbilityCheck>,
    outcome: Option<ContestOutcome>,
}

impl AbilityContest {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::AbilityContest, document)?;
        let payload: AbilityContestPayload =
            parse_payload(SubeventKind::AbilityContest, core.document())?;
        Ok(Self {
            core,
            source_spec: payload.source_check,
            target_spec: payload.target_check,
            source_check: None,
            target_check: None,
            outcome: None,
        })
    }

    pub fn source_check(&self) -> Option<&AbilityCheck> {
        self.source_check.as_ref()
    }

    pub fn target_check(&self) -> Option<&AbilityCheck> {
        self.target_check.as_ref()
    }

    pub fn outcome(&self) -> Option<ContestOutcome> {
        self.outcome
    }
}

impl Pipeline for AbilityContest {
    fn core(&self) -> &SubeventCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SubeventCore {
        &mut self.core
    }

    fn apply_modification(&mut self, modification: &Modification) -> bool {
        match self.source_check.as_mut() {
            Some(check) => check.apply_modification(modification),
            None => false,
        }
    }

    fn prepare(&mut self, _resolver: &mut Resolver<'_>) -> Result<()> {
        self.source_check = Some(AbilityCheck::nested(&self.core, &self.source_spec, CONTEST_TAG, None, true)?);
        self.target_check = Some(AbilityCheck::nested(&self.core, &self.target_spec, CONTEST_TAG, None, true)?);
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let kind = SubeventKind::AbilityContest.as_str();
        let source = Some(self.core.require_source()?);
        let target = Some(self.core.require_target()?);
        let faces = resolver.config().die_faces_check;

        let source_check = self.source_check.as_mut().ok_or(SubeventError::MissingSource(kind))?;
        let target_check = self.target_check.as_mut().ok_or(SubeventError::MissingTarget(kind))?;
        source_check.prepare_candidates(faces);
        target_check.prepare_candidates(faces);

        resolver.run(source_check, source, target)?;
        resolver.run(target_check, target, source)?;

        let outcome = compare(source_check.total(), target_check.total(), true);
        debug!(
            source_total = source_check.total(),
            target_total = target_check.total(),
            ?outcome,
            "ability contest"
        );
        self.outcome = Some(outcome);

        match outcome {
            ContestOutcome::SourceWins => {
                resolver.resolve_branch(&mut self.core, "pass")?;
            }
            ContestOutcome::TargetWins => {
                resolver.resolve_branch(&mut self.core, "fail")?;
            }
            ContestOutcome::Tie => {}
        }
        Ok(())
    }
}
