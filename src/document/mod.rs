//! Document model
//!
//! All authored content and subevent state is expressed as JSON-like documents:
//! - Path queries (`seek`) with key, index, and content-filter segments
//! - Structural subset comparison (`subset_of`)
//! - Deep, right-biased merge (`join`)
//! - Canonical serialization (compact, insertion-ordered)
//!
//! Mappings preserve insertion order (`serde_json` is built with
//! `preserve_order`), so two documents built the same way always serialize
//! to the same bytes.

mod ops;
mod path;

pub use ops::DocumentExt;
pub use path::{DocumentPath, PathError, Segment};

/// A recursive document value: null, bool, integer, float, string, array, or mapping
pub type Document = serde_json::Value;

/// An insertion-ordered mapping of string keys to documents
pub type Mapping = serde_json::Map<String, Document>;
