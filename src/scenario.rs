//! Scenario documents
//!
//! A scenario lists objects, the effects attached to them, and subevents to
//! resolve in order. Objects and steps refer to each other by object id;
//! uuids are assigned when the scenario is loaded.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::combat::Effect;
use crate::config::EngineConfig;
use crate::document::Document;
use crate::objects::{Context, Registry, RegistryError, RpgObject};
use crate::subevent::{Resolver, Subevent, SubeventError};

/// Scenario errors
#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid scenario: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("object id {0} is declared twice")]
    DuplicateObject(String),

    #[error("no object with id {0}")]
    UnknownObject(String),

    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error("step {step} ({subevent}) failed: {source}")]
    Step {
        step: usize,
        subevent: String,
        #[source]
        source: SubeventError,
    },
}

pub type Result<T> = std::result::Result<T, ScenarioError>;

/// An object entry; `origin_id` names the object that created it
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioObject {
    #[serde(flatten)]
    pub object: RpgObject,
    #[serde(default)]
    pub origin_id: Option<String>,
}

/// An effect entry attached to `owner`
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioEffect {
    pub owner: String,
    #[serde(flatten)]
    pub effect: Effect,
}

/// One subevent to resolve, with participants named by object id
#[derive(Debug, Clone, Deserialize)]
pub struct ScenarioStep {
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub target: Option<String>,
    pub subevent: Document,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub objects: Vec<ScenarioObject>,
    #[serde(default)]
    pub effects: Vec<ScenarioEffect>,
    #[serde(default)]
    pub subevents: Vec<ScenarioStep>,
}

impl Scenario {
    pub fn from_json(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| ScenarioError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Register every object and effect; all objects are in context
    pub fn load(&self) -> Result<Encounter> {
        let mut encounter = Encounter::new();
        for entry in &self.objects {
            if encounter.registry.find_by_id(&entry.object.id).is_some() {
                return Err(ScenarioError::DuplicateObject(entry.object.id.clone()));
            }
            encounter.add_object(entry.object.clone());
        }

        for entry in &self.objects {
            if let Some(origin_id) = &entry.origin_id {
                let origin = encounter.lookup(origin_id)?;
                let uuid = encounter.lookup(&entry.object.id)?;
                encounter.registry.get_object_mut(uuid)?.origin = Some(origin);
            }
        }

        for entry in &self.effects {
            let owner = encounter.lookup(&entry.owner)?;
            encounter.registry.register_effect(entry.effect.clone(), owner)?;
        }
        debug!(
            objects = encounter.registry.object_count(),
            effects = encounter.registry.effect_count(),
            "scenario loaded"
        );
        Ok(encounter)
    }
}

/// A registry and the context its subevents resolve in
#[derive(Debug, Default)]
pub struct Encounter {
    pub registry: Registry,
    pub context: Context,
}

impl Encounter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an object and bring it into context
    pub fn add_object(&mut self, object: RpgObject) -> Uuid {
        let uuid = self.registry.register_object(object);
        self.context.add(uuid);
        uuid
    }

    /// Uuid of the object with `id`
    pub fn lookup(&self, id: &str) -> Result<Uuid> {
        self.registry
            .find_by_id(id)
            .ok_or_else(|| ScenarioError::UnknownObject(id.to_string()))
    }

    pub fn object(&self, id: &str) -> Result<&RpgObject> {
        let uuid = self.lookup(id)?;
        Ok(self.registry.get_object(uuid)?)
    }

    /// Resolve one subevent document
    pub fn resolve(
        &mut self,
        config: &EngineConfig,
        document: Document,
        source: Option<Uuid>,
        target: Option<Uuid>,
    ) -> std::result::Result<Subevent, SubeventError> {
        let mut resolver = Resolver::new(&mut self.registry, &self.context, config);
        resolver.resolve(document, source, target)
    }

    /// Resolve every step in order, stopping at the first failure
    pub fn run(&mut self, config: &EngineConfig, steps: &[ScenarioStep]) -> Result<Vec<Subevent>> {
        let mut resolved = Vec::with_capacity(steps.len());
        for (step, entry) in steps.iter().enumerate() {
            let source = entry.source.as_deref().map(|id| self.lookup(id)).transpose()?;
            let target = entry.target.as_deref().map(|id| self.lookup(id)).transpose()?;
            let name = entry
                .subevent
                .get("subevent")
                .and_then(Document::as_str)
                .unwrap_or("?")
                .to_string();

            info!(step, subevent = %name, source = ?entry.source, target = ?entry.target, "resolving step");
            let subevent = self
                .resolve(config, entry.subevent.clone(), source, target)
                .map_err(|source| ScenarioError::Step {
                    step,
                    subevent: name,
                    source,
                })?;
            resolved.push(subevent);
        }
        Ok(resolved)
    }

    /// Every object as a document, ordered by id
    pub fn state(&self) -> Result<Document> {
        let mut objects: Vec<&RpgObject> = self.registry.objects();
        objects.sort_by(|a, b| a.id.cmp(&b.id));
        let documents = objects
            .into_iter()
            .map(RpgObject::to_document)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(json!({ "objects": documents }))
    }
}
