//! In-memory identity registry for objects and effects

use std::collections::{HashMap, HashSet};

use thiserror::Error;
use tracing::{debug, warn};
use uuid::Uuid;

use super::object::RpgObject;
use crate::combat::Effect;

/// Registry errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("no object registered under {0}")]
    UnknownObject(Uuid),

    #[error("no effect registered under {0}")]
    UnknownEffect(Uuid),
}

/// Owns every live object and effect, keyed by uuid.
///
/// Registration always hands out a uuid that was never used before, even
/// after the previous holder was unregistered.
#[derive(Debug, Default)]
pub struct Registry {
    objects: HashMap<Uuid, RpgObject>,
    effects: HashMap<Uuid, Effect>,
    owners: HashMap<Uuid, Uuid>,
    issued: HashSet<Uuid>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issue a uuid that has never been handed out by this registry
    pub(crate) fn fresh_uuid(&mut self) -> Uuid {
        loop {
            let uuid = Uuid::new_v4();
            if self.issued.insert(uuid) {
                return uuid;
            }
        }
    }

    /// Register an object (and its resources) under fresh uuids
    pub fn register_object(&mut self, mut object: RpgObject) -> Uuid {
        let uuid = self.fresh_uuid();
        object.uuid = uuid;
        for i in 0..object.resources.len() {
            let resource_uuid = self.fresh_uuid();
            object.resources[i].uuid = resource_uuid;
        }
        // Effect links are rebuilt through register_effect
        object.effects.clear();
        debug!(object = %object.id, %uuid, "registered object");
        self.objects.insert(uuid, object);
        uuid
    }

    pub fn object(&self, uuid: Uuid) -> Option<&RpgObject> {
        self.objects.get(&uuid)
    }

    pub fn object_mut(&mut self, uuid: Uuid) -> Option<&mut RpgObject> {
        self.objects.get_mut(&uuid)
    }

    /// Look up an object, failing when absent
    pub fn get_object(&self, uuid: Uuid) -> Result<&RpgObject, RegistryError> {
        self.object(uuid).ok_or(RegistryError::UnknownObject(uuid))
    }

    pub fn get_object_mut(&mut self, uuid: Uuid) -> Result<&mut RpgObject, RegistryError> {
        self.object_mut(uuid).ok_or(RegistryError::UnknownObject(uuid))
    }

    /// First object with the given author-facing id
    pub fn find_by_id(&self, id: &str) -> Option<Uuid> {
        let mut matches: Vec<&RpgObject> = self.objects.values().filter(|o| o.id == id).collect();
        matches.sort_by_key(|o| o.uuid);
        matches.first().map(|o| o.uuid)
    }

    /// Remove an object and every effect it owns
    pub fn unregister_object(&mut self, uuid: Uuid) -> Option<RpgObject> {
        let object = self.objects.remove(&uuid)?;
        for effect in &object.effects {
            self.effects.remove(effect);
            self.owners.remove(effect);
        }
        debug!(object = %object.id, %uuid, "unregistered object");
        Some(object)
    }

    /// Register an effect and attach it to its owner
    pub fn register_effect(&mut self, mut effect: Effect, owner: Uuid) -> Result<Uuid, RegistryError> {
        if !self.objects.contains_key(&owner) {
            return Err(RegistryError::UnknownObject(owner));
        }
        let uuid = self.fresh_uuid();
        effect.uuid = uuid;
        debug!(effect = %effect.id, %uuid, %owner, "registered effect");
        self.effects.insert(uuid, effect);
        self.owners.insert(uuid, owner);
        if let Some(object) = self.objects.get_mut(&owner) {
            object.effects.push(uuid);
        }
        Ok(uuid)
    }

    pub fn effect(&self, uuid: Uuid) -> Option<&Effect> {
        self.effects.get(&uuid)
    }

    /// Object an effect is attached to
    pub fn owner_of(&self, effect: Uuid) -> Option<Uuid> {
        self.owners.get(&effect).copied()
    }

    /// Sever an effect from the registry and from its owner.
    ///
    /// Subevents that already applied it keep it in their applied set.
    pub fn unregister_effect(&mut self, uuid: Uuid) -> Result<Effect, RegistryError> {
        let effect = self
            .effects
            .remove(&uuid)
            .ok_or(RegistryError::UnknownEffect(uuid))?;
        match self.owners.remove(&uuid).and_then(|o| self.objects.get_mut(&o)) {
            Some(owner) => owner.effects.retain(|e| *e != uuid),
            None => warn!(effect = %effect.id, %uuid, "unregistered effect had no owner"),
        }
        debug!(effect = %effect.id, %uuid, "unregistered effect");
        Ok(effect)
    }

    /// Live effects attached to an object, in attachment order
    pub fn effects_of(&self, owner: Uuid) -> Vec<&Effect> {
        self.objects
            .get(&owner)
            .map(|o| o.effects.iter().filter_map(|e| self.effects.get(e)).collect())
            .unwrap_or_default()
    }

    /// Registered objects sorted by id then uuid
    pub fn objects(&self) -> Vec<&RpgObject> {
        let mut objects: Vec<&RpgObject> = self.objects.values().collect();
        objects.sort_by(|a, b| a.id.cmp(&b.id).then(a.uuid.cmp(&b.uuid)));
        objects
    }

    pub fn object_count(&self) -> usize {
        self.objects.len()
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }
}
