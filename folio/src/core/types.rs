//! Shared deterministic types for the guided walk.
//!
//! These types define the contract between the engine and its persistence
//! collaborator. They carry no I/O and serialize to the same JSON layout the
//! site stored in browser-local storage.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Field collected as a subject's summary by free-text matching.
pub const SUMMARY_FIELD: &str = "summary";

/// An item (project) to be walked and documented. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: i64,
    pub title: String,
}

impl Subject {
    pub fn new(id: i64, title: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
        }
    }
}

/// Ordered list of field names collected per subject.
///
/// Order defines the prompt sequence. Construction does not validate; config
/// loading rejects empty or duplicate names before a schema reaches the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldSchema(Vec<String>);

impl FieldSchema {
    pub fn new<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(fields.into_iter().map(Into::into).collect())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.0.get(index).map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.iter().any(|name| name == field)
    }

    pub fn last_index(&self) -> usize {
        self.0.len().saturating_sub(1)
    }

    pub fn names(&self) -> &[String] {
        &self.0
    }
}

impl Default for FieldSchema {
    fn default() -> Self {
        Self::new(["role", "tech", SUMMARY_FIELD, "link"])
    }
}

/// Answers collected for one visited subject.
///
/// A field missing from `fields` is absent: skipped or never reached. The
/// engine never stores an empty string for a skipped field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectedRecord {
    pub subject_id: i64,
    pub title: String,
    #[serde(flatten)]
    pub fields: BTreeMap<String, String>,
}

impl CollectedRecord {
    pub fn for_subject(subject: &Subject) -> Self {
        Self {
            subject_id: subject.id,
            title: subject.title.clone(),
            fields: BTreeMap::new(),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields.get(name).map(String::as_str)
    }
}

/// Position of the walk.
///
/// `Inactive` carries no subject index, so "inactive with a current subject"
/// cannot be represented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WalkState {
    #[default]
    Inactive,
    Active { subject: usize, field: usize },
}

impl WalkState {
    pub fn is_active(&self) -> bool {
        matches!(self, WalkState::Active { .. })
    }

    pub fn subject_index(&self) -> Option<usize> {
        match self {
            WalkState::Inactive => None,
            WalkState::Active { subject, .. } => Some(*subject),
        }
    }

    /// Current field index; `0` while inactive.
    pub fn field_index(&self) -> usize {
        match self {
            WalkState::Inactive => 0,
            WalkState::Active { field, .. } => *field,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Sender {
    System,
    User,
}

/// One transcript entry. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub sender: Sender,
    pub text: String,
}

/// Read-only copy of the transcript and collected records.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    pub messages: Vec<Message>,
    pub records: Vec<CollectedRecord>,
}
