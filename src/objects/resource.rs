//! Consumable resources (spell slots, ki points, reactions, ...)

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Tag carried by resources granted at runtime; only these can be taken away
pub const TEMPORARY_TAG: &str = "temporary";

fn default_potency() -> i64 {
    1
}

/// A potency-ranked resource that is either available or exhausted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    /// Assigned by the registry
    #[serde(default)]
    pub uuid: Uuid,
    pub id: String,
    #[serde(default = "default_potency")]
    pub potency: i64,
    #[serde(default)]
    pub exhausted: bool,
    #[serde(default)]
    pub tags: BTreeSet<String>,
}

impl Resource {
    pub fn new(id: &str, potency: i64) -> Self {
        Self {
            uuid: Uuid::nil(),
            id: id.to_string(),
            potency,
            exhausted: false,
            tags: BTreeSet::new(),
        }
    }

    /// A resource granted at runtime
    pub fn temporary(id: &str, potency: i64) -> Self {
        Self::new(id, potency).with_tag(TEMPORARY_TAG)
    }

    pub fn with_tag(mut self, tag: &str) -> Self {
        self.tags.insert(tag.to_string());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    pub fn is_temporary(&self) -> bool {
        self.has_tag(TEMPORARY_TAG)
    }

    pub fn exhaust(&mut self) {
        self.exhausted = true;
    }

    pub fn refresh(&mut self) {
        self.exhausted = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_temporary_resource() {
        let mut slot = Resource::temporary("spell_slot", 3).with_tag("spell_slot");
        assert!(slot.is_temporary());
        assert!(slot.has_tag("spell_slot"));
        assert!(!slot.exhausted);

        slot.exhaust();
        assert!(slot.exhausted);
        slot.refresh();
        assert!(!slot.exhausted);
    }

    #[test]
    fn test_defaults_from_document() {
        let r: Resource = serde_json::from_value(serde_json::json!({"id": "reaction"})).unwrap();
        assert_eq!(r.potency, 1);
        assert!(!r.exhausted);
        assert!(!r.is_temporary());
    }
}
