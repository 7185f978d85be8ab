//! Repository facade: the only surface a UI layer calls.
//!
//! Translates calendar days into time ranges and forwards everything else to
//! the journal runtime unchanged. Names and values are not validated.

pub mod clock;
pub mod day;

use std::{path::Path, sync::Arc};

use tokio::sync::broadcast;

use crate::{
    core::store::EntryStore,
    entry::Entry,
    persist::{PersistError, sqlite::SqliteEntrySink},
    query::{EntryQuery, SortOrder},
    runtime::{
        events::JournalEvent,
        handle::{JournalConfig, JournalHandle, RuntimeError, spawn_journal},
        subscription::Subscription,
    },
    types::{EntryId, EntryKind, TimestampMs},
};

use self::{
    clock::{Clock, SystemClock},
    day::DayRange,
};

/// Opens the SQLite database at `path`, loads it, and starts the runtime.
///
/// Must be called from within a tokio runtime.
pub fn open_journal(
    path: impl AsRef<Path>,
    config: JournalConfig,
) -> Result<JournalRepository, PersistError> {
    let sink = SqliteEntrySink::open(path)?;
    start(sink, config)
}

/// Same as [`open_journal`] on a fresh in-memory database.
pub fn open_in_memory(config: JournalConfig) -> Result<JournalRepository, PersistError> {
    let sink = SqliteEntrySink::open_in_memory()?;
    start(sink, config)
}

fn start(sink: SqliteEntrySink, config: JournalConfig) -> Result<JournalRepository, PersistError> {
    let store = sink.load_store()?;
    let handle = spawn_journal(store, Some(Box::new(sink)), config);
    Ok(JournalRepository::new(handle))
}

/// Journal without persistence, for previews and tests.
pub fn open_ephemeral(config: JournalConfig) -> JournalRepository {
    JournalRepository::new(spawn_journal(EntryStore::new(), None, config))
}

#[derive(Clone)]
pub struct JournalRepository {
    handle: JournalHandle,
    clock: Arc<dyn Clock>,
}

impl JournalRepository {
    pub fn new(handle: JournalHandle) -> Self {
        Self::with_clock(handle, Arc::new(SystemClock))
    }

    pub fn with_clock(handle: JournalHandle, clock: Arc<dyn Clock>) -> Self {
        Self { handle, clock }
    }

    pub fn handle(&self) -> &JournalHandle {
        &self.handle
    }

    pub async fn insert(&self, entry: Entry) -> Result<Option<EntryId>, RuntimeError> {
        self.handle.insert(entry).await
    }

    pub async fn update(&self, entry: Entry) -> Result<bool, RuntimeError> {
        self.handle.update(entry).await
    }

    /// Deletes the row with `entry.id`; other fields are not compared.
    pub async fn delete(&self, entry: &Entry) -> Result<bool, RuntimeError> {
        self.handle.delete_by_id(entry.id).await
    }

    pub async fn delete_by_id(&self, id: EntryId) -> Result<bool, RuntimeError> {
        self.handle.delete_by_id(id).await
    }

    pub async fn subscribe_all(&self) -> Result<Subscription<Vec<Entry>>, RuntimeError> {
        self.subscribe_all_sorted_by(SortOrder::Natural).await
    }

    pub async fn subscribe_all_sorted_by(
        &self,
        sort: SortOrder,
    ) -> Result<Subscription<Vec<Entry>>, RuntimeError> {
        self.handle.subscribe(EntryQuery::all().sorted(sort)).await
    }

    /// Rows with `start <= timestamp < end`.
    pub async fn subscribe_by_date_range(
        &self,
        start: TimestampMs,
        end: TimestampMs,
    ) -> Result<Subscription<Vec<Entry>>, RuntimeError> {
        self.handle.subscribe(EntryQuery::date_range(start, end)).await
    }

    /// Rows on the local calendar day containing `instant`.
    pub async fn subscribe_by_day(
        &self,
        instant: TimestampMs,
    ) -> Result<Subscription<Vec<Entry>>, RuntimeError> {
        let day = DayRange::containing(instant);
        self.subscribe_by_date_range(day.start, day.end).await
    }

    pub async fn subscribe_by_name(
        &self,
        name: impl Into<String>,
    ) -> Result<Subscription<Vec<Entry>>, RuntimeError> {
        self.handle.subscribe(EntryQuery::name(name)).await
    }

    /// See [`JournalHandle::subscribe_row`] for the behaviour after deletion.
    pub async fn subscribe_by_id(&self, id: EntryId) -> Result<Subscription<Entry>, RuntimeError> {
        self.handle.subscribe_row(id).await
    }

    pub async fn subscribe_today(&self) -> Result<Subscription<Vec<Entry>>, RuntimeError> {
        self.subscribe_today_sorted_by(SortOrder::Natural).await
    }

    /// Today's rows in the requested order. "Today" is taken from the
    /// repository clock at call time.
    pub async fn subscribe_today_sorted_by(
        &self,
        sort: SortOrder,
    ) -> Result<Subscription<Vec<Entry>>, RuntimeError> {
        let day = self.today();
        self.handle
            .subscribe(EntryQuery::date_range(day.start, day.end).sorted(sort))
            .await
    }

    /// Number of rows whose name matches the SQL `LIKE` pattern.
    ///
    /// This is a point-in-time count answered by the writer task, so it must
    /// be awaited; it does not update when rows change. Use a subscription
    /// for a live view.
    pub async fn count_by_name_like(
        &self,
        pattern: impl Into<String>,
    ) -> Result<usize, RuntimeError> {
        self.handle.count_by_name_like(pattern).await
    }

    /// Distinct entry names, oldest category first.
    pub async fn categories(&self) -> Result<Vec<String>, RuntimeError> {
        self.handle.distinct_names().await
    }

    /// Kind already used by the category `name`, if any.
    pub async fn kind_for_name(
        &self,
        name: impl Into<String>,
    ) -> Result<Option<EntryKind>, RuntimeError> {
        self.handle.kind_for_name(name).await
    }

    pub fn events(&self) -> broadcast::Receiver<JournalEvent> {
        self.handle.events()
    }

    pub async fn flush(&self) -> Result<(), RuntimeError> {
        self.handle.flush().await
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.handle.shutdown().await
    }

    /// Local day containing the clock's current instant.
    pub fn today(&self) -> DayRange {
        DayRange::containing(self.clock.now_ms())
    }
}
