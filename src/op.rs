//! Mutation operation model shared by the store and persistence sinks.

use crate::{entry::Entry, types::EntryId};

/// A committed change to the entries table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    /// A row was created.
    Insert {
        /// Inserted row, id assigned.
        entry: Entry,
    },
    /// A row's mutable columns were replaced.
    Update {
        /// Row after the update.
        entry: Entry,
        /// Row before the update.
        prev: Entry,
    },
    /// A row was removed.
    Delete {
        /// Removed row.
        entry: Entry,
    },
}

impl Op {
    /// Id of the affected row.
    pub fn id(&self) -> EntryId {
        match self {
            Op::Insert { entry } | Op::Update { entry, .. } | Op::Delete { entry } => entry.id,
        }
    }

    /// Row written by this op, if it writes one.
    pub fn written(&self) -> Option<&Entry> {
        match self {
            Op::Insert { entry } | Op::Update { entry, .. } => Some(entry),
            Op::Delete { .. } => None,
        }
    }
}
