//! Domain identifiers (strongly-typed IDs).
//!
//! Store-level ids (reports, comments, projects, environments) are opaque
//! strings owned by the document store, so `Id<T>` wraps a `String` and uses a
//! phantom marker to keep the kinds apart: a `ReportId` cannot be passed where
//! a `CommentId` is expected.
//!
//! Batches are created by the queue itself and get a ULID, which sorts by
//! creation time and reads well in logs.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use ulid::Ulid;

/// Marker trait for each id kind.
pub trait IdMarker: Send + Sync + 'static {
    /// Human readable kind, used in error messages ("report", "comment").
    fn kind() -> &'static str;
}

/// Generic string id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    #[serde(skip)]
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn kind(&self) -> &'static str {
        T::kind()
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.value.fmt(f)
    }
}

// ========================================
// Markers
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Report {}

impl IdMarker for Report {
    fn kind() -> &'static str {
        "report"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Comment {}

impl IdMarker for Comment {
    fn kind() -> &'static str {
        "comment"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Project {}

impl IdMarker for Project {
    fn kind() -> &'static str {
        "project"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Environment {}

impl IdMarker for Environment {
    fn kind() -> &'static str {
        "environment"
    }
}

pub type ReportId = Id<Report>;
pub type CommentId = Id<Comment>;
pub type ProjectId = Id<Project>;
pub type EnvironmentId = Id<Environment>;

/// Identifies one execution round of a `TaskQueue`.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BatchId(Ulid);

impl BatchId {
    pub fn generate() -> Self {
        Self(Ulid::new())
    }
}

impl fmt::Display for BatchId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "batch-{}", self.0)
    }
}
