//! Resource lifecycle: give, take, exhaust, refresh
//!
//! All four act on the target's resources. Finding fewer eligible
//! resources than requested is a normal partial result, not an error.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::core::{parse_payload, SubeventCore, SubeventKind};
use super::error::{Result, SubeventError};
use super::resolver::{Pipeline, Resolver};
use crate::combat::Modification;
use crate::document::Document;
use crate::objects::Resource;

fn one() -> usize {
    1
}

fn one_potency() -> i64 {
    1
}

/// Order in which eligible resources are flipped
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionMode {
    #[default]
    LowFirst,
    HighFirst,
}

/// Which resources an operation may touch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceSelector {
    /// Match by resource id
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<String>,
    /// Match by tag
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_tag: Option<String>,
}

impl ResourceSelector {
    pub fn matches(&self, resource: &Resource) -> bool {
        self.resource.as_ref().map_or(true, |id| resource.id == *id)
            && self
                .resource_tag
                .as_ref()
                .map_or(true, |tag| resource.has_tag(tag))
    }

    fn is_empty(&self) -> bool {
        self.resource.is_none() && self.resource_tag.is_none()
    }
}

/// Criteria for an exhaust or refresh
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Selection {
    #[serde(flatten)]
    pub selector: ResourceSelector,
    /// Flip at most this many; all eligible when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default)]
    pub selection_mode: SelectionMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub minimum_potency: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maximum_potency: Option<i64>,
}

impl Selection {
    /// Indices of the resources to flip to `exhausted`, in flip order
    pub fn select(&self, resources: &[Resource], exhausted: bool) -> Vec<usize> {
        let minimum = self.minimum_potency.unwrap_or(i64::MIN);
        let maximum = self.maximum_potency.unwrap_or(i64::MAX);
        let mut eligible: Vec<usize> = resources
            .iter()
            .enumerate()
            .filter(|(_, r)| self.selector.matches(r))
            .filter(|(_, r)| r.exhausted != exhausted)
            .filter(|(_, r)| (minimum..=maximum).contains(&r.potency))
            .map(|(i, _)| i)
            .collect();

        match self.selection_mode {
            SelectionMode::LowFirst => eligible.sort_by_key(|&i| resources[i].potency),
            SelectionMode::HighFirst => {
                eligible.sort_by_key(|&i| std::cmp::Reverse(resources[i].potency))
            }
        }
        if let Some(count) = self.count {
            eligible.truncate(count);
        }
        eligible
    }
}

#[derive(Debug, Deserialize)]
struct GiveResourcePayload {
    resource: String,
    #[serde(default = "one")]
    count: usize,
    #[serde(default = "one_potency")]
    potency: i64,
    /// Tags added alongside `temporary`
    #[serde(default)]
    tags: Vec<String>,
}

/// `give_resource`: grant temporary resources to the target
#[derive(Debug, Clone)]
pub struct GiveResource {
    core: SubeventCore,
    resource: String,
    count: usize,
    potency: i64,
    tags: Vec<String>,
    given: usize,
}

impl GiveResource {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::GiveResource, document)?;
        let payload: GiveResourcePayload = parse_payload(SubeventKind::GiveResource, core.document())?;
        Ok(Self {
            core,
            resource: payload.resource,
            count: payload.count,
            potency: payload.potency,
            tags: payload.tags,
            given: 0,
        })
    }

    pub fn given(&self) -> usize {
        self.given
    }
}

impl Pipeline for GiveResource {
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
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let target = self.core.require_target()?;
        resolver.object(target)?;

        let mut granted = Vec::with_capacity(self.count);
        for _ in 0..self.count {
            let mut resource = Resource::temporary(&self.resource, self.potency);
            for tag in &self.tags {
                resource.tags.insert(tag.clone());
            }
            resource.uuid = resolver.registry_mut().fresh_uuid();
            granted.push(resource);
        }

        let object = resolver.object_mut(target)?;
        object.resources.extend(granted);
        self.given = self.count;
        info!(object = %object.id, resource = %self.resource, count = self.count, potency = self.potency, "resources given");
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct TakeResourcePayload {
    resource_tag: String,
    #[serde(default)]
    count: Option<usize>,
}

/// `take_resource`: remove temporary resources carrying a tag
#[derive(Debug, Clone)]
pub struct TakeResource {
    core: SubeventCore,
    resource_tag: String,
    count: Option<usize>,
    taken: usize,
}

impl TakeResource {
    pub fn from_document(document: Document) -> Result<Self> {
        let core = SubeventCore::from_document(SubeventKind::TakeResource, document)?;
        let payload: TakeResourcePayload = parse_payload(SubeventKind::TakeResource, core.document())?;
        Ok(Self {
            core,
            resource_tag: payload.resource_tag,
            count: payload.count,
            taken: 0,
        })
    }

    pub fn taken(&self) -> usize {
        self.taken
    }
}

impl Pipeline for TakeResource {
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
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let target = self.core.require_target()?;
        let object = resolver.object_mut(target)?;
        let mut remaining = self.count.unwrap_or(usize::MAX);
        let tag = &self.resource_tag;

        // Non-temporary resources are never removed
        object.resources.retain(|r| {
            let take = remaining > 0 && r.is_temporary() && r.has_tag(tag);
            if take {
                remaining -= 1;
            }
            !take
        });
        self.taken = self.count.unwrap_or(usize::MAX) - remaining;
        info!(object = %object.id, tag = %self.resource_tag, taken = self.taken, "resources taken");
        Ok(())
    }
}

/// `exhaust_resource` / `refresh_resource`
#[derive(Debug, Clone)]
pub struct ResourceStateChange {
    core: SubeventCore,
    selection: Selection,
    exhaust: bool,
    flipped: Vec<uuid::Uuid>,
}

impl ResourceStateChange {
    pub fn exhaust_from_document(document: Document) -> Result<Self> {
        Self::from_document(SubeventKind::ExhaustResource, document, true)
    }

    pub fn refresh_from_document(document: Document) -> Result<Self> {
        Self::from_document(SubeventKind::RefreshResource, document, false)
    }

    fn from_document(kind: SubeventKind, document: Document, exhaust: bool) -> Result<Self> {
        let core = SubeventCore::from_document(kind, document)?;
        let selection: Selection = parse_payload(kind, core.document())?;
        if selection.selector.is_empty() {
            return Err(SubeventError::MissingField {
                subevent: kind.as_str(),
                field: "resource or resource_tag",
            });
        }
        Ok(Self {
            core,
            selection,
            exhaust,
            flipped: Vec::new(),
        })
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    /// Uuids of the resources flipped, in flip order
    pub fn flipped(&self) -> &[uuid::Uuid] {
        &self.flipped
    }
}

impl Pipeline for ResourceStateChange {
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
        Ok(())
    }

    fn invoke(&mut self, resolver: &mut Resolver<'_>) -> Result<()> {
        let target = self.core.require_target()?;
        let object = resolver.object_mut(target)?;

        let chosen = self.selection.select(&object.resources, self.exhaust);
        for index in chosen {
            let resource = &mut object.resources[index];
            if self.exhaust {
                resource.exhaust();
            } else {
                resource.refresh();
            }
            self.flipped.push(resource.uuid);
        }
        info!(
            object = %object.id,
            subevent = %self.core.kind(),
            requested = ?self.selection.count,
            flipped = self.flipped.len(),
            "resources flipped"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn slots() -> Vec<Resource> {
        (1..=9)
            .map(|p| Resource::new("spell_slot", p).with_tag("spell_slot"))
            .collect()
    }

    fn potencies(resources: &[Resource], indices: &[usize]) -> Vec<i64> {
        indices.iter().map(|&i| resources[i].potency).collect()
    }

    #[test]
    fn test_low_first_with_minimum() {
        let resources = slots();
        let selection = Selection {
            selector: ResourceSelector {
                resource: Some("spell_slot".to_string()),
                resource_tag: None,
            },
            count: Some(5),
            minimum_potency: Some(3),
            ..Selection::default()
        };
        let chosen = selection.select(&resources, true);
        assert_eq!(potencies(&resources, &chosen), vec![3, 4, 5, 6, 7]);
    }

    #[test]
    fn test_high_first_with_maximum() {
        let resources = slots();
        let selection = Selection {
            selector: ResourceSelector {
                resource: None,
                resource_tag: Some("spell_slot".to_string()),
            },
            count: Some(2),
            selection_mode: SelectionMode::HighFirst,
            maximum_potency: Some(6),
            ..Selection::default()
        };
        let chosen = selection.select(&resources, true);
        assert_eq!(potencies(&resources, &chosen), vec![6, 5]);
    }

    #[test]
    fn test_skips_resources_already_in_desired_state() {
        let mut resources = slots();
        resources[0].exhaust();
        resources[1].exhaust();
        let selection = Selection {
            selector: ResourceSelector {
                resource: Some("spell_slot".to_string()),
                resource_tag: None,
            },
            count: Some(5),
            ..Selection::default()
        };
        assert_eq!(potencies(&resources, &selection.select(&resources, false)), vec![1, 2]);
        assert_eq!(
            potencies(&resources, &selection.select(&resources, true)),
            vec![3, 4, 5, 6, 7]
        );
    }

    #[test]
    fn test_selection_document() {
        let selection: Selection = serde_json::from_value(json!({
            "subevent": "exhaust_resource",
            "resource_tag": "ki",
            "selection_mode": "high_first",
            "minimum_potency": 2
        }))
        .unwrap();
        assert_eq!(selection.selector.resource_tag.as_deref(), Some("ki"));
        assert_eq!(selection.selection_mode, SelectionMode::HighFirst);
        assert_eq!(selection.count, None);
    }

    #[test]
    fn test_state_change_requires_selector() {
        let err = ResourceStateChange::exhaust_from_document(json!({
            "subevent": "exhaust_resource",
            "count": 1
        }))
        .unwrap_err();
        assert!(matches!(err, SubeventError::MissingField { .. }));
    }
}
