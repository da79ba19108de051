//! Field paths: dot-separated locators into a step's nested document
//!
//! A `FieldPath` is matched verbatim as a string for equality and conflict
//! tests — unlike a general JSON-pointer path, two `FieldPath`s never
//! "overlap" by ancestry; they are either the same path or unrelated. The
//! segment vector still matters for [`crate::FieldValue`] traversal in the
//! document applier.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A dot-separated path into a nested document, e.g. `patient_info.first_name`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldPath {
    raw: String,
}

/// Errors constructing a [`FieldPath`]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PathError {
    /// The path string was empty
    #[error("field path is empty")]
    Empty,
    /// A segment between dots was empty (e.g. `"a..b"`, `".a"`, `"a."`)
    #[error("field path {0:?} contains an empty segment")]
    EmptySegment(String),
}

impl FieldPath {
    /// Parse and validate a dot-separated path
    ///
    /// Rejects the empty path and any path with an empty segment.
    pub fn parse(raw: impl Into<String>) -> Result<Self, PathError> {
        let raw = raw.into();
        if raw.is_empty() {
            return Err(PathError::Empty);
        }
        if raw.split('.').any(|segment| segment.is_empty()) {
            return Err(PathError::EmptySegment(raw));
        }
        Ok(Self { raw })
    }

    /// The path segments, in traversal order
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.raw.split('.')
    }

    /// The path's segment count
    pub fn depth(&self) -> usize {
        self.raw.split('.').count()
    }

    /// Borrow the path as its canonical dotted string
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl FromStr for FieldPath {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for FieldPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}
