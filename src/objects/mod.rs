//! Objects taking part in rules resolution
//!
//! - `RpgObject`: abilities, proficiencies, health, resources, affinities
//! - `Resource`: potency-ranked consumables
//! - `Registry`: uuid identity registry for objects and effects
//! - `Context`: objects in scope for one resolution

mod context;
mod object;
mod registry;
mod resource;

pub use context::Context;
pub use object::{Health, RpgObject, DEFAULT_ABILITY_SCORE};
pub use registry::{Registry, RegistryError};
pub use resource::{Resource, TEMPORARY_TAG};
