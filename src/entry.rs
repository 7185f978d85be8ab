//! Entry record and reader-side value interpretation.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{EntryId, EntryKind, TimestampMs, UNASSIGNED_ID};

/// One user-recorded data point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Store-assigned id, [`UNASSIGNED_ID`] before insert.
    pub id: EntryId,
    /// Category label, e.g. `"Weight"`. Not unique.
    pub name: String,
    /// Declared value kind.
    pub kind: EntryKind,
    /// Value text, stored verbatim whatever the kind.
    pub value: String,
    /// Creation time in milliseconds since epoch.
    pub timestamp: TimestampMs,
}

impl Entry {
    /// Builds an entry that has not been inserted yet.
    pub fn new(
        name: impl Into<String>,
        kind: EntryKind,
        value: impl Into<String>,
        timestamp: TimestampMs,
    ) -> Self {
        Self {
            id: UNASSIGNED_ID,
            name: name.into(),
            kind,
            value: value.into(),
            timestamp,
        }
    }

    /// Returns a copy carrying `id`.
    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = id;
        self
    }

    /// Interprets `value` under `kind`.
    ///
    /// Writes are never validated, so readers must be ready for
    /// [`ValueError`] on any stored row.
    pub fn typed_value(&self) -> Result<TypedValue, ValueError> {
        let malformed = || ValueError {
            kind: self.kind,
            value: self.value.clone(),
        };
        match self.kind {
            EntryKind::Boolean => match self.value.as_str() {
                "true" => Ok(TypedValue::Boolean(true)),
                "false" => Ok(TypedValue::Boolean(false)),
                _ => Err(malformed()),
            },
            EntryKind::Integer => self
                .value
                .trim()
                .parse::<i64>()
                .map(TypedValue::Integer)
                .map_err(|_| malformed()),
            EntryKind::Float => self
                .value
                .trim()
                .parse::<f64>()
                .map(TypedValue::Float)
                .map_err(|_| malformed()),
            EntryKind::String => Ok(TypedValue::Text(self.value.clone())),
            EntryKind::None => Ok(TypedValue::Unset),
        }
    }
}

/// An entry value parsed according to its kind.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    /// Parsed boolean.
    Boolean(bool),
    /// Parsed integer.
    Integer(i64),
    /// Parsed float.
    Float(f64),
    /// Text value.
    Text(String),
    /// Kind was never chosen.
    Unset,
}

/// Stored value text that cannot be read under its declared kind.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value `{value}` is not a valid {kind}")]
pub struct ValueError {
    /// Declared kind.
    pub kind: EntryKind,
    /// Offending text.
    pub value: String,
}
