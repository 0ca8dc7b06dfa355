//! rulebook - data-driven rules resolution for tabletop RPG subevents
//!
//! Content is authored as documents. Each subevent document is resolved
//! against a registry of objects and effects: effects modify it, nested
//! subevents (stages, calculations, branches) resolve through the same
//! pipeline, and the outcome is written back to the objects.

pub mod calculation;
pub mod combat;
pub mod config;
pub mod document;
pub mod objects;
pub mod scenario;
pub mod subevent;

pub use calculation::{Calculation, SetPolicy};
pub use config::{ConfigError, EngineConfig};
pub use document::{Document, DocumentExt};
pub use objects::{Context, Registry, RpgObject};
pub use scenario::{Encounter, Scenario, ScenarioError};
pub use subevent::{Resolver, Subevent, SubeventError, SubeventKind};
