//! Typed journal entries in SQLite with reactive, full-snapshot queries.
//!
//! # Examples
//!
//! In-memory usage with [`core::store::EntryStore`]:
//! ```
//! use pocketjournal::{
//!     core::store::EntryStore,
//!     entry::Entry,
//!     types::EntryKind,
//! };
//!
//! let mut store = EntryStore::new();
//! let (id, _op) = store.insert(Entry::new("Weight", EntryKind::Float, "72.5", 1_000));
//! assert_eq!(id, 1);
//! assert_eq!(store.by_name("Weight").len(), 1);
//! assert_eq!(store.count_by_name_like("we%").unwrap(), 1);
//! ```
//!
//! Runtime usage through the repository facade:
//! ```no_run
//! use pocketjournal::{
//!     entry::Entry,
//!     query::SortOrder,
//!     repository::open_journal,
//!     runtime::handle::JournalConfig,
//!     types::EntryKind,
//! };
//!
//! # #[tokio::main]
//! # async fn main() {
//! let journal = open_journal("journal.db", JournalConfig::default()).expect("open");
//! let mut today = journal
//!     .subscribe_today_sorted_by(SortOrder::NameAsc)
//!     .await
//!     .expect("subscribe");
//! let now = chrono::Utc::now().timestamp_millis();
//! journal
//!     .insert(Entry::new("Weight", EntryKind::Float, "72.5", now))
//!     .await
//!     .expect("insert");
//! let rows = today.next().await.expect("snapshot");
//! println!("{} entries today", rows.len());
//! journal.shutdown().await.expect("shutdown");
//! # }
//! ```

/// Core in-memory store and index helpers.
pub mod core;
/// Entry record and value interpretation.
pub mod entry;
/// Logging bootstrap.
pub mod logging;
/// Mutation op model.
pub mod op;
/// Persistence abstraction and SQLite implementation.
pub mod persist;
/// Query filters and sort orders.
pub mod query;
/// Repository facade, day ranges and clocks.
pub mod repository;
/// Single-writer runtime, events and subscriptions.
pub mod runtime;
/// Shared primitive types and enums.
pub mod types;

pub use entry::{Entry, TypedValue, ValueError};
pub use query::{EntryFilter, EntryQuery, SortOrder};
pub use repository::{JournalRepository, open_ephemeral, open_in_memory, open_journal};
pub use runtime::handle::{JournalConfig, JournalHandle, RuntimeError};
pub use types::{EntryId, EntryKind, TimestampMs};
