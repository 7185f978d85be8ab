//! SQLite-backed `entries` table sink.

use std::path::Path;

use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::{
    core::store::EntryStore,
    entry::Entry,
    op::Op,
    types::{EntryId, EntryKind},
};

use super::{EntrySink, PersistError, PersistResult, WriteOutcome};

/// Only schema version this crate reads or writes.
pub const SCHEMA_VERSION: i64 = 1;

/// SQLite implementation of [`crate::persist::EntrySink`].
pub struct SqliteEntrySink {
    conn: Connection,
}

impl SqliteEntrySink {
    /// Opens or creates a database at `path`.
    ///
    /// Enables WAL mode and sets `synchronous=NORMAL`.
    pub fn open(path: impl AsRef<Path>) -> PersistResult<Self> {
        let path = path.as_ref();
        info!(path = %path.display(), "opening entries database");
        let conn = Connection::open(path)?;
        Self::init_connection(conn)
    }

    /// Opens a private in-memory database.
    pub fn open_in_memory() -> PersistResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(conn)
    }

    fn init_connection(conn: Connection) -> PersistResult<Self> {
        let version: i64 = conn.pragma_query_value(None, "user_version", |row| row.get(0))?;
        if version > SCHEMA_VERSION {
            return Err(PersistError::UnsupportedSchema {
                found: version,
                expected: SCHEMA_VERSION,
            });
        }

        conn.execute_batch(include_str!("schema.sql"))?;
        if version < SCHEMA_VERSION {
            conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
        }
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |_| Ok(()))?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;
        Ok(Self { conn })
    }

    /// Builds the in-memory store from the table.
    pub fn load_store(&self) -> PersistResult<EntryStore> {
        let rows = self.load_rows()?;
        let high_water = self.high_water_id()?;
        let count = rows.len();
        let store = EntryStore::from_rows(rows, high_water)?;
        info!(rows = count, next_id = store.next_id(), "loaded entries");
        Ok(store)
    }

    /// Reads every row in id order.
    pub fn load_rows(&self) -> PersistResult<Vec<Entry>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, kind, value, timestamp FROM entries ORDER BY id ASC")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, EntryId>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, i64>(4)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (id, name, tag, value, timestamp) = row?;
            let kind = EntryKind::from_tag(&tag).ok_or(PersistError::UnknownKind(tag))?;
            out.push(Entry {
                id,
                name,
                kind,
                value,
                timestamp,
            });
        }
        Ok(out)
    }

    /// Largest id ever assigned, including deleted rows.
    pub fn high_water_id(&self) -> PersistResult<EntryId> {
        let seq: Option<i64> = self
            .conn
            .query_row(
                "SELECT seq FROM sqlite_sequence WHERE name = 'entries'",
                [],
                |row| row.get(0),
            )
            .optional()?;
        Ok(seq.unwrap_or(0))
    }
}

impl EntrySink for SqliteEntrySink {
    fn apply(&mut self, op: &Op) -> PersistResult<WriteOutcome> {
        let changed = match op {
            Op::Insert { entry } => self.conn.execute(
                "INSERT OR IGNORE INTO entries(id, name, kind, value, timestamp)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    entry.id,
                    entry.name,
                    entry.kind.as_tag(),
                    entry.value,
                    entry.timestamp
                ],
            )?,
            Op::Update { entry, .. } => self.conn.execute(
                "UPDATE entries SET name = ?2, kind = ?3, value = ?4 WHERE id = ?1",
                params![entry.id, entry.name, entry.kind.as_tag(), entry.value],
            )?,
            Op::Delete { entry } => self
                .conn
                .execute("DELETE FROM entries WHERE id = ?1", params![entry.id])?,
        };

        debug!(id = op.id(), changed, "applied op to entries table");
        Ok(if changed == 0 {
            WriteOutcome::Ignored
        } else {
            WriteOutcome::Applied
        })
    }

    fn flush(&mut self) -> PersistResult<()> {
        self.conn
            .query_row("PRAGMA wal_checkpoint(PASSIVE)", [], |_| Ok(()))?;
        Ok(())
    }
}
