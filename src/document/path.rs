//! Document path parsing and resolution
//!
//! Paths address values inside nested documents:
//! - Segments separated by `.` select mapping keys (`branches.pass`)
//! - `[n]` selects the n-th array element (`dice[0]`)
//! - `[{...}]` selects the first array element the filter is a subset of
//!   (`resources[{"id":"ki"}].potency`)
//!
//! Bracket segments may follow a key directly or start the path.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use super::{Document, DocumentExt};

/// Parse and resolution errors for document paths
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PathError {
    #[error("document path cannot be empty")]
    Empty,

    #[error("document path '{0}' contains an empty segment")]
    EmptySegment(String),

    #[error("document path '{0}' has an unterminated '['")]
    UnterminatedBracket(String),

    #[error("document path '{0}' has an unexpected ']'")]
    UnexpectedBracket(String),

    #[error("document path '{0}' is missing a '.' after ']'")]
    MissingSeparator(String),

    #[error("invalid array index '{0}'")]
    InvalidIndex(String),

    #[error("invalid content filter '{0}': {1}")]
    InvalidFilter(String, String),

    #[error("key '{0}' not found")]
    MissingKey(String),

    #[error("cannot look up key '{0}' on a non-object")]
    NotAnObject(String),

    #[error("cannot apply {0} to a non-array")]
    NotAnArray(String),

    #[error("index {index} out of range for array of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("no array element matches filter {0}")]
    NoFilterMatch(String),
}

/// One step of a document path
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    /// Mapping key
    Key(String),
    /// Array position
    Index(usize),
    /// First array element that the filter document is a subset of
    Filter(Document),
}

impl Segment {
    /// Resolve this segment against a document
    pub fn resolve<'a>(&self, document: &'a Document) -> Result<&'a Document, PathError> {
        match self {
            Segment::Key(key) => document
                .as_object()
                .ok_or_else(|| PathError::NotAnObject(key.clone()))?
                .get(key)
                .ok_or_else(|| PathError::MissingKey(key.clone())),
            Segment::Index(index) => {
                let array = document
                    .as_array()
                    .ok_or_else(|| PathError::NotAnArray(self.to_string()))?;
                array.get(*index).ok_or(PathError::IndexOutOfRange {
                    index: *index,
                    len: array.len(),
                })
            }
            Segment::Filter(filter) => document
                .as_array()
                .ok_or_else(|| PathError::NotAnArray(self.to_string()))?
                .iter()
                .find(|element| filter.subset_of(element))
                .ok_or_else(|| PathError::NoFilterMatch(filter.to_string())),
        }
    }

    /// Resolve this segment against a mutable document
    pub fn resolve_mut<'a>(&self, document: &'a mut Document) -> Result<&'a mut Document, PathError> {
        match self {
            Segment::Key(key) => document
                .as_object_mut()
                .ok_or_else(|| PathError::NotAnObject(key.clone()))?
                .get_mut(key)
                .ok_or_else(|| PathError::MissingKey(key.clone())),
            Segment::Index(index) => {
                let description = self.to_string();
                let array = document
                    .as_array_mut()
                    .ok_or(PathError::NotAnArray(description))?;
                let len = array.len();
                array
                    .get_mut(*index)
                    .ok_or(PathError::IndexOutOfRange { index: *index, len })
            }
            Segment::Filter(filter) => {
                let description = self.to_string();
                document
                    .as_array_mut()
                    .ok_or(PathError::NotAnArray(description))?
                    .iter_mut()
                    .find(|element| filter.subset_of(element))
                    .ok_or_else(|| PathError::NoFilterMatch(filter.to_string()))
            }
        }
    }
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Segment::Key(key) => write!(f, "{}", key),
            Segment::Index(index) => write!(f, "[{}]", index),
            Segment::Filter(filter) => write!(f, "[{}]", filter),
        }
    }
}

/// A parsed document path
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentPath {
    segments: Vec<Segment>,
}

impl DocumentPath {
    /// Create a path from already-parsed segments
    pub fn new(segments: Vec<Segment>) -> Self {
        Self { segments }
    }

    /// Append a key segment
    pub fn key(mut self, key: impl Into<String>) -> Self {
        self.segments.push(Segment::Key(key.into()));
        self
    }

    /// Append an index segment
    pub fn index(mut self, index: usize) -> Self {
        self.segments.push(Segment::Index(index));
        self
    }

    /// Append a content-filter segment
    pub fn filter(mut self, filter: Document) -> Self {
        self.segments.push(Segment::Filter(filter));
        self
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for DocumentPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 && matches!(segment, Segment::Key(_)) {
                write!(f, ".")?;
            }
            write!(f, "{}", segment)?;
        }
        Ok(())
    }
}

impl FromStr for DocumentPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_path(s)
    }
}

/// Parse a document path like `branches.pass[0]` or `resources[{"id":"ki"}].potency`
pub fn parse_path(path: &str) -> Result<DocumentPath, PathError> {
    if path.is_empty() {
        return Err(PathError::Empty);
    }

    let bytes = path.as_bytes();
    let mut segments = Vec::new();
    let mut start = 0;
    let mut pos = 0;
    let mut after_bracket = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'.' => {
                if pos == start && !after_bracket {
                    return Err(PathError::EmptySegment(path.to_string()));
                }
                if pos > start {
                    segments.push(Segment::Key(path[start..pos].to_string()));
                }
                pos += 1;
                start = pos;
                after_bracket = false;
            }
            b'[' => {
                if pos > start {
                    segments.push(Segment::Key(path[start..pos].to_string()));
                }
                let close = closing_bracket(path, pos)?;
                segments.push(parse_bracket(&path[pos + 1..close])?);
                pos = close + 1;
                start = pos;
                after_bracket = true;
            }
            b']' => return Err(PathError::UnexpectedBracket(path.to_string())),
            _ => {
                if after_bracket && pos == start {
                    return Err(PathError::MissingSeparator(path.to_string()));
                }
                pos += 1;
            }
        }
    }

    if pos > start {
        segments.push(Segment::Key(path[start..pos].to_string()));
    } else if !after_bracket {
        // Trailing '.'
        return Err(PathError::EmptySegment(path.to_string()));
    }

    Ok(DocumentPath { segments })
}

/// Find the `]` closing the bracket opened at `open`, skipping nested
/// brackets, braces, and quoted strings inside content filters.
fn closing_bracket(path: &str, open: usize) -> Result<usize, PathError> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (offset, byte) in path.as_bytes()[open + 1..].iter().enumerate() {
        if in_string {
            match byte {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match byte {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' => depth = depth.saturating_sub(1),
            b']' if depth == 0 => return Ok(open + 1 + offset),
            b']' => depth -= 1,
            _ => {}
        }
    }

    Err(PathError::UnterminatedBracket(path.to_string()))
}

fn parse_bracket(inner: &str) -> Result<Segment, PathError> {
    let trimmed = inner.trim();
    if trimmed.starts_with('{') {
        let filter: Document = serde_json::from_str(trimmed)
            .map_err(|e| PathError::InvalidFilter(trimmed.to_string(), e.to_string()))?;
        return Ok(Segment::Filter(filter));
    }
    trimmed
        .parse::<usize>()
        .map(Segment::Index)
        .map_err(|_| PathError::InvalidIndex(trimmed.to_string()))
}
