//! State shared by every subevent kind
//!
//! - Discriminator check and typed payload parsing
//! - Source/target binding
//! - Applied-effect dedup
//! - Branch lookup and the record of nested subevents resolved under it

use std::collections::{BTreeSet, HashSet};
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use uuid::Uuid;

use super::error::{Result, SubeventError};
use super::Subevent;
use crate::combat::{Effect, EffectIdentity};
use crate::document::{Document, DocumentExt, DocumentPath, PathError};

/// Every subevent kind the engine knows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubeventKind {
    AbilityCheck,
    AbilityContest,
    Contest,
    AbilitySave,
    SavingThrow,
    AttackRoll,
    ArmorClass,
    DifficultyClass,
    DealDamage,
    DamageCollection,
    DamageRoll,
    DamageDelivery,
    DamageAffinity,
    Heal,
    HealingCollection,
    HealingRoll,
    HealingDelivery,
    GiveResource,
    TakeResource,
    ExhaustResource,
    RefreshResource,
}

impl SubeventKind {
    pub const ALL: [SubeventKind; 21] = [
        SubeventKind::AbilityCheck,
        SubeventKind::AbilityContest,
        SubeventKind::Contest,
        SubeventKind::AbilitySave,
        SubeventKind::SavingThrow,
        SubeventKind::AttackRoll,
        SubeventKind::ArmorClass,
        SubeventKind::DifficultyClass,
        SubeventKind::DealDamage,
        SubeventKind::DamageCollection,
        SubeventKind::DamageRoll,
        SubeventKind::DamageDelivery,
        SubeventKind::DamageAffinity,
        SubeventKind::Heal,
        SubeventKind::HealingCollection,
        SubeventKind::HealingRoll,
        SubeventKind::HealingDelivery,
        SubeventKind::GiveResource,
        SubeventKind::TakeResource,
        SubeventKind::ExhaustResource,
        SubeventKind::RefreshResource,
    ];

    /// The `subevent` discriminator string
    pub fn as_str(&self) -> &'static str {
        match self {
            SubeventKind::AbilityCheck => "ability_check",
            SubeventKind::AbilityContest => "ability_contest",
            SubeventKind::Contest => "contest",
            SubeventKind::AbilitySave => "ability_save",
            SubeventKind::SavingThrow => "saving_throw",
            SubeventKind::AttackRoll => "attack_roll",
            SubeventKind::ArmorClass => "armor_class",
            SubeventKind::DifficultyClass => "difficulty_class",
            SubeventKind::DealDamage => "deal_damage",
            SubeventKind::DamageCollection => "damage_collection",
            SubeventKind::DamageRoll => "damage_roll",
            SubeventKind::DamageDelivery => "damage_delivery",
            SubeventKind::DamageAffinity => "damage_affinity",
            SubeventKind::Heal => "heal",
            SubeventKind::HealingCollection => "healing_collection",
            SubeventKind::HealingRoll => "healing_roll",
            SubeventKind::HealingDelivery => "healing_delivery",
            SubeventKind::GiveResource => "give_resource",
            SubeventKind::TakeResource => "take_resource",
            SubeventKind::ExhaustResource => "exhaust_resource",
            SubeventKind::RefreshResource => "refresh_resource",
        }
    }

    pub fn from_name(name: &str) -> Option<SubeventKind> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// Kinds the engine builds itself; content cannot author them directly
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SubeventKind::ArmorClass
                | SubeventKind::DifficultyClass
                | SubeventKind::DamageCollection
                | SubeventKind::DamageRoll
                | SubeventKind::DamageDelivery
                | SubeventKind::DamageAffinity
                | SubeventKind::HealingCollection
                | SubeventKind::HealingRoll
                | SubeventKind::HealingDelivery
        )
    }
}

impl fmt::Display for SubeventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Fail unless the document's `subevent` field names `kind`
pub fn check_discriminator(kind: SubeventKind, document: &Document) -> Result<()> {
    match document.get("subevent").and_then(Document::as_str) {
        None => Err(SubeventError::MissingDiscriminator),
        Some(found) if found == kind.as_str() => Ok(()),
        Some(found) => Err(SubeventError::Mismatch {
            expected: kind.as_str(),
            found: found.to_string(),
        }),
    }
}

/// Deserialize a kind's typed payload from its document
pub fn parse_payload<P: DeserializeOwned>(kind: SubeventKind, document: &Document) -> Result<P> {
    serde_json::from_value(document.clone()).map_err(|source| SubeventError::Malformed {
        subevent: kind.as_str(),
        source,
    })
}

#[derive(Deserialize)]
struct Header {
    #[serde(default)]
    tags: BTreeSet<String>,
}

/// Identity, participants, and dedup state of one subevent
#[derive(Debug, Clone)]
pub struct SubeventCore {
    kind: SubeventKind,
    document: Document,
    tags: BTreeSet<String>,
    source: Option<Uuid>,
    target: Option<Uuid>,
    /// Identities applied to this subevent; never pruned
    applied: HashSet<EffectIdentity>,
    /// Identities applied further up a rider chain
    inherited: HashSet<EffectIdentity>,
    applied_effects: Vec<(String, Uuid)>,
    fired: Vec<String>,
    nested: Vec<Subevent>,
}

impl SubeventCore {
    /// Validate the discriminator and read the shared header fields
    pub fn from_document(kind: SubeventKind, document: Document) -> Result<Self> {
        check_discriminator(kind, &document)?;
        let header: Header = parse_payload(kind, &document)?;
        Ok(Self {
            kind,
            document,
            tags: header.tags,
            source: None,
            target: None,
            applied: HashSet::new(),
            inherited: HashSet::new(),
            applied_effects: Vec::new(),
            fired: Vec::new(),
            nested: Vec::new(),
        })
    }

    /// Core for a subevent the engine builds on behalf of `parent`
    pub(crate) fn child(kind: SubeventKind, document: Document, parent: &SubeventCore) -> Result<Self> {
        let mut core = Self::from_document(kind, document)?;
        core.inherit_chain(parent);
        Ok(core)
    }

    pub fn kind(&self) -> SubeventKind {
        self.kind
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn tags(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn source(&self) -> Option<Uuid> {
        self.source
    }

    pub fn target(&self) -> Option<Uuid> {
        self.target
    }

    pub(crate) fn bind_source(&mut self, source: Option<Uuid>) {
        self.source = source;
    }

    pub(crate) fn bind_target(&mut self, target: Option<Uuid>) {
        self.target = target;
    }

    pub fn require_source(&self) -> Result<Uuid> {
        self.source
            .ok_or(SubeventError::MissingSource(self.kind.as_str()))
    }

    pub fn require_target(&self) -> Result<Uuid> {
        self.target
            .ok_or(SubeventError::MissingTarget(self.kind.as_str()))
    }

    /// Whether an effect with the same identity was already applied here
    pub fn effect_already_applied(&self, effect: &Effect) -> bool {
        let identity = effect.identity();
        self.applied.contains(&identity) || self.inherited.contains(&identity)
    }

    /// Record an effect as applied
    pub fn record_effect(&mut self, effect: &Effect) {
        self.applied.insert(effect.identity());
        self.applied_effects.push((effect.id.clone(), effect.uuid));
    }

    /// Carry rider-chain dedup state into a branch or stage of `parent`
    pub(crate) fn inherit_chain(&mut self, parent: &SubeventCore) {
        self.inherited.extend(parent.inherited.iter().cloned());
    }

    /// Seed dedup state for a rider resolved from `parent`
    pub(crate) fn inherit_applied(&mut self, parent: &SubeventCore) {
        self.inherited.extend(parent.inherited.iter().cloned());
        self.inherited.extend(parent.applied.iter().cloned());
    }

    /// `(effect id, effect uuid)` of every effect applied here, in order
    pub fn applied_effects(&self) -> &[(String, Uuid)] {
        &self.applied_effects
    }

    /// Documents listed under `branches.<tag>`; `None` when absent
    pub fn branch(&self, tag: &str) -> Result<Option<Vec<Document>>> {
        let path = DocumentPath::new(Vec::new()).key("branches").key(tag);
        match self.document.seek_path(&path) {
            Ok(list) => serde_json::from_value(list.clone())
                .map(Some)
                .map_err(|source| SubeventError::Malformed {
                    subevent: self.kind.as_str(),
                    source,
                }),
            Err(PathError::MissingKey(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    pub(crate) fn mark_fired(&mut self, tag: &str) {
        self.fired.push(tag.to_string());
    }

    /// Branch tags resolved so far, in order
    pub fn fired_branches(&self) -> &[String] {
        &self.fired
    }

    pub fn fired(&self, tag: &str) -> bool {
        self.fired.iter().any(|t| t == tag)
    }

    pub(crate) fn push_nested(&mut self, subevent: Subevent) {
        self.nested.push(subevent);
    }

    /// Branch subevents and riders resolved under this one
    pub fn nested(&self) -> &[Subevent] {
        &self.nested
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::ALLOW_DUPLICATES_TAG;
    use serde_json::json;

    #[test]
    fn test_kind_names_round_trip() {
        for kind in SubeventKind::ALL {
            assert_eq!(SubeventKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(SubeventKind::from_name("teleport"), None);
    }

    #[test]
    fn test_discriminator() {
        let doc = json!({"subevent": "ability_check", "ability": "dex"});
        assert!(check_discriminator(SubeventKind::AbilityCheck, &doc).is_ok());

        let err = check_discriminator(SubeventKind::AttackRoll, &doc).unwrap_err();
        assert!(matches!(
            err,
            SubeventError::Mismatch { expected: "attack_roll", ref found } if found == "ability_check"
        ));

        let err = check_discriminator(SubeventKind::AttackRoll, &json!({"ability": "dex"})).unwrap_err();
        assert!(matches!(err, SubeventError::MissingDiscriminator));
    }

    #[test]
    fn test_branches() {
        let doc = json!({
            "subevent": "ability_save",
            "tags": ["fear"],
            "branches": {"fail": [{"subevent": "deal_damage", "damage": []}]}
        });
        let core = SubeventCore::from_document(SubeventKind::AbilitySave, doc).unwrap();
        assert!(core.has_tag("fear"));
        assert_eq!(core.branch("fail").unwrap().map(|b| b.len()), Some(1));
        assert_eq!(core.branch("pass").unwrap(), None);

        let no_branches = SubeventCore::from_document(
            SubeventKind::AbilitySave,
            json!({"subevent": "ability_save"}),
        )
        .unwrap();
        assert_eq!(no_branches.branch("pass").unwrap(), None);
    }

    #[test]
    fn test_malformed_branch_list() {
        let doc = json!({"subevent": "contest", "branches": {"source_wins": 3}});
        let core = SubeventCore::from_document(SubeventKind::Contest, doc).unwrap();
        assert!(matches!(
            core.branch("source_wins"),
            Err(SubeventError::Malformed { subevent: "contest", .. })
        ));
    }

    #[test]
    fn test_dedup_by_id_survives_new_instance() {
        let doc = json!({"subevent": "ability_check", "ability": "str"});
        let mut core = SubeventCore::from_document(SubeventKind::AbilityCheck, doc).unwrap();

        let mut first = Effect::new("rage");
        first.uuid = Uuid::new_v4();
        let mut second = Effect::new("rage");
        second.uuid = Uuid::new_v4();

        assert!(!core.effect_already_applied(&first));
        core.record_effect(&first);
        assert!(core.effect_already_applied(&second));
    }

    #[test]
    fn test_dedup_by_instance_with_allow_duplicates() {
        let doc = json!({"subevent": "ability_check", "ability": "str"});
        let mut core = SubeventCore::from_document(SubeventKind::AbilityCheck, doc).unwrap();

        let mut first = Effect::new("hex").with_tag(ALLOW_DUPLICATES_TAG);
        first.uuid = Uuid::new_v4();
        let mut second = Effect::new("hex").with_tag(ALLOW_DUPLICATES_TAG);
        second.uuid = Uuid::new_v4();

        core.record_effect(&first);
        assert!(core.effect_already_applied(&first));
        assert!(!core.effect_already_applied(&second));
        assert_eq!(core.applied_effects().len(), 1);
    }

    #[test]
    fn test_rider_inherits_applied() {
        let mut parent = SubeventCore::from_document(
            SubeventKind::DealDamage,
            json!({"subevent": "deal_damage"}),
        )
        .unwrap();
        let mut effect = Effect::new("thorns");
        effect.uuid = Uuid::new_v4();
        parent.record_effect(&effect);

        let mut rider = SubeventCore::from_document(
            SubeventKind::DealDamage,
            json!({"subevent": "deal_damage"}),
        )
        .unwrap();
        rider.inherit_applied(&parent);
        assert!(rider.effect_already_applied(&effect));
        assert!(rider.applied_effects().is_empty());
    }
}
