//! Combat mechanics
//!
//! Building blocks the subevent pipelines are assembled from:
//! - Die rolls with advantage/disadvantage and scripted faces
//! - Typed damage/healing dice entries and rational scaling
//! - Immunity, resistance, and vulnerability
//! - Vampiric healing riders
//! - Effects that modify subevents

mod affinity;
mod damage;
mod dice;
mod effects;
mod vampirism;

pub use affinity::{Affinity, AffinityFlags, AffinityPolicy, AffinityProfile};
pub use damage::{DamageCollection, DamageTotals, DiceEntry, Die, RolledDamage, Scale, UNTYPED};
pub use dice::{
    is_critical, is_fumble, roll_die, ContestRoll, RerollMode, RerollRequest, Roll, RollMode,
};
pub use effects::{
    ActorRole, Effect, EffectIdentity, EffectTrigger, Modification, ALLOW_DUPLICATES_TAG,
};
pub use vampirism::{HasVampirism, Vampirism};
