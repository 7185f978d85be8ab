//! Runtime change-event payloads.

use crate::types::EntryId;

/// Events emitted from the single-writer runtime loop after a committed change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEvent {
    /// A new entry was inserted.
    Inserted {
        /// Inserted entry id.
        id: EntryId,
    },
    /// An existing entry was updated.
    Updated {
        /// Updated entry id.
        id: EntryId,
    },
    /// An entry was deleted.
    Deleted {
        /// Deleted entry id.
        id: EntryId,
    },
}
