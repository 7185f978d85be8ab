//! Shared primitive IDs and the entry value-kind enum.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Store-assigned entry identifier. `0` means "not yet assigned".
pub type EntryId = i64;
/// Milliseconds since the Unix epoch.
pub type TimestampMs = i64;

/// Sentinel id carried by entries that have not been inserted yet.
pub const UNASSIGNED_ID: EntryId = 0;

/// Declared value kind of an entry.
///
/// Variant order is the sort order used by kind-ascending queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntryKind {
    /// `true` / `false`.
    #[serde(rename = "BOOLEAN")]
    Boolean,
    /// Signed integer.
    #[serde(rename = "INT")]
    Integer,
    /// Floating point number.
    #[serde(rename = "FLOAT")]
    Float,
    /// Free text.
    #[serde(rename = "STRING")]
    String,
    /// Not yet chosen.
    #[serde(rename = "NONE")]
    None,
}

impl EntryKind {
    /// Every kind in declared order.
    pub const ALL: [EntryKind; 5] = [
        EntryKind::Boolean,
        EntryKind::Integer,
        EntryKind::Float,
        EntryKind::String,
        EntryKind::None,
    ];

    /// Text tag stored in the `kind` column.
    pub fn as_tag(self) -> &'static str {
        match self {
            EntryKind::Boolean => "BOOLEAN",
            EntryKind::Integer => "INT",
            EntryKind::Float => "FLOAT",
            EntryKind::String => "STRING",
            EntryKind::None => "NONE",
        }
    }

    /// Parses a stored tag, returning `None` for unknown text.
    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_tag() == tag)
    }

    /// True for the "not yet chosen" placeholder.
    pub fn is_unset(self) -> bool {
        self == EntryKind::None
    }
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_tag())
    }
}
