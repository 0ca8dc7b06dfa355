//! Document operations: seek, subset, join, canonical serialization

use super::path::{parse_path, DocumentPath, PathError};
use super::Document;

/// Query and merge operations over documents
pub trait DocumentExt {
    /// Resolve a textual path like `branches.pass[0]`
    fn seek(&self, path: &str) -> Result<&Document, PathError>;

    /// Resolve an already-parsed path
    fn seek_path(&self, path: &DocumentPath) -> Result<&Document, PathError>;

    /// Resolve a textual path to a mutable value
    fn seek_mut(&mut self, path: &str) -> Result<&mut Document, PathError>;

    /// Structural containment: every key/element of `self` is present in `other`
    fn subset_of(&self, other: &Document) -> bool;

    /// Deep, right-biased merge of `other` into `self`
    fn join(&mut self, other: &Document);

    /// Compact, insertion-ordered JSON text
    fn to_canonical_string(&self) -> String;
}

impl DocumentExt for Document {
    fn seek(&self, path: &str) -> Result<&Document, PathError> {
        let path = parse_path(path)?;
        self.seek_path(&path)
    }

    fn seek_path(&self, path: &DocumentPath) -> Result<&Document, PathError> {
        path.segments()
            .iter()
            .try_fold(self, |current, segment| segment.resolve(current))
    }

    fn seek_mut(&mut self, path: &str) -> Result<&mut Document, PathError> {
        let path = parse_path(path)?;
        path.segments()
            .iter()
            .try_fold(self, |current, segment| segment.resolve_mut(current))
    }

    fn subset_of(&self, other: &Document) -> bool {
        match (self, other) {
            (Document::Object(mine), Document::Object(theirs)) => mine
                .iter()
                .all(|(key, value)| theirs.get(key).is_some_and(|v| value.subset_of(v))),
            // Multiset containment, not positional
            (Document::Array(mine), Document::Array(theirs)) => mine
                .iter()
                .all(|element| theirs.iter().any(|candidate| element.subset_of(candidate))),
            _ => self == other,
        }
    }

    fn join(&mut self, other: &Document) {
        match (self, other) {
            (Document::Object(mine), Document::Object(theirs)) => {
                for (key, value) in theirs {
                    match mine.get_mut(key) {
                        Some(existing) if existing.is_object() && value.is_object() => {
                            existing.join(value)
                        }
                        _ => {
                            mine.insert(key.clone(), value.clone());
                        }
                    }
                }
            }
            (this, other) => *this = other.clone(),
        }
    }

    fn to_canonical_string(&self) -> String {
        // Display for Value writes compact JSON into a fresh buffer each call
        self.to_string()
    }
}
