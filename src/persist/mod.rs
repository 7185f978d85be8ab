pub mod sqlite;

use thiserror::Error;

use crate::{core::store::StoreError, op::Op};

#[derive(Debug, Error)]
pub enum PersistError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("unknown kind tag `{0}` in entries table")]
    UnknownKind(String),
    #[error("unsupported schema version {found}, expected {expected}")]
    UnsupportedSchema { found: i64, expected: i64 },
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("{0}")]
    Message(String),
}

pub type PersistResult<T> = Result<T, PersistError>;

/// What the backing table did with an op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOutcome {
    /// The row changed.
    Applied,
    /// No row changed, e.g. an insert dropped by the ignore-on-conflict policy.
    Ignored,
}

pub trait EntrySink: Send {
    fn apply(&mut self, op: &Op) -> PersistResult<WriteOutcome>;
    fn flush(&mut self) -> PersistResult<()> {
        Ok(())
    }
}
