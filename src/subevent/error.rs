//! Subevent errors

use thiserror::Error;
use uuid::Uuid;

use crate::document::PathError;
use crate::objects::RegistryError;

/// Errors surfaced while building or resolving subevents
#[derive(Debug, Error)]
pub enum SubeventError {
    #[error("subevent mismatch: expected {expected}, found {found}")]
    Mismatch { expected: &'static str, found: String },

    #[error("document has no subevent discriminator")]
    MissingDiscriminator,

    #[error("unknown subevent: {0}")]
    UnknownSubevent(String),

    #[error("{0} is computed internally and cannot be authored")]
    InternalSubevent(&'static str),

    #[error("malformed {subevent} document: {source}")]
    Malformed {
        subevent: &'static str,
        source: serde_json::Error,
    },

    #[error("{subevent} requires {field}")]
    MissingField {
        subevent: &'static str,
        field: &'static str,
    },

    #[error(transparent)]
    Path(#[from] PathError),

    #[error("unknown object {0}")]
    UnknownObject(Uuid),

    #[error("{0} requires a source")]
    MissingSource(&'static str),

    #[error("{0} requires a target")]
    MissingTarget(&'static str),

    #[error("subevents nested deeper than {limit}")]
    NestingTooDeep { limit: usize },
}

impl From<RegistryError> for SubeventError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownObject(uuid) | RegistryError::UnknownEffect(uuid) => {
                SubeventError::UnknownObject(uuid)
            }
        }
    }
}

pub type Result<T> = std::result::Result<T, SubeventError>;
