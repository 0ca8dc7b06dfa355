//! The set of objects in scope for a resolution

use uuid::Uuid;

use super::registry::Registry;

/// Objects whose effects take part in resolving subevents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Context {
    objects: Vec<Uuid>,
}

impl Context {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an object; duplicates are ignored
    pub fn add(&mut self, uuid: Uuid) {
        if !self.objects.contains(&uuid) {
            self.objects.push(uuid);
        }
    }

    pub fn remove(&mut self, uuid: Uuid) {
        self.objects.retain(|o| *o != uuid);
    }

    pub fn contains(&self, uuid: Uuid) -> bool {
        self.objects.contains(&uuid)
    }

    pub fn objects(&self) -> &[Uuid] {
        &self.objects
    }

    /// Resolve an author-facing reference among the objects in scope.
    ///
    /// `source` and `target` name the current participants; anything else
    /// is matched against object ids.
    pub fn resolve(
        &self,
        name: &str,
        registry: &Registry,
        source: Option<Uuid>,
        target: Option<Uuid>,
    ) -> Option<Uuid> {
        match name {
            "source" => source,
            "target" => target,
            id => self
                .objects
                .iter()
                .copied()
                .find(|uuid| registry.object(*uuid).is_some_and(|o| o.id == id)),
        }
    }
}
