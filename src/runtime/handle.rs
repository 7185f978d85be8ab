use std::sync::Arc;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::{Mutex, broadcast, mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::{
    core::store::{EntryStore, StoreError},
    entry::Entry,
    op::Op,
    persist::{EntrySink, PersistError, WriteOutcome},
    query::EntryQuery,
    types::{EntryId, EntryKind},
};

use super::{
    events::JournalEvent,
    subscription::{Subscription, SubscriptionRegistry},
};

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Persist(#[from] PersistError),
    #[error("journal runtime is not running")]
    ChannelClosed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub command_queue_bound: usize,
    pub event_buffer: usize,
    /// Log a warning whenever a row with kind `None` is written.
    pub warn_on_unset_kind: bool,
    pub checkpoint_on_shutdown: bool,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            command_queue_bound: 256,
            event_buffer: 1024,
            warn_on_unset_kind: true,
            checkpoint_on_shutdown: true,
        }
    }
}

#[derive(Clone)]
pub struct JournalHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<JournalEvent>,
}

enum Command {
    Insert {
        entry: Entry,
        resp: oneshot::Sender<Result<Option<EntryId>, RuntimeError>>,
    },
    Update {
        entry: Entry,
        resp: oneshot::Sender<Result<bool, RuntimeError>>,
    },
    Delete {
        id: EntryId,
        resp: oneshot::Sender<Result<bool, RuntimeError>>,
    },
    Query {
        query: EntryQuery,
        resp: oneshot::Sender<Vec<Entry>>,
    },
    Get {
        id: EntryId,
        resp: oneshot::Sender<Option<Entry>>,
    },
    CountByNameLike {
        pattern: String,
        resp: oneshot::Sender<Result<usize, RuntimeError>>,
    },
    DistinctNames {
        resp: oneshot::Sender<Vec<String>>,
    },
    KindForName {
        name: String,
        resp: oneshot::Sender<Option<EntryKind>>,
    },
    Subscribe {
        query: EntryQuery,
        resp: oneshot::Sender<Subscription<Vec<Entry>>>,
    },
    SubscribeRow {
        id: EntryId,
        resp: oneshot::Sender<Subscription<Entry>>,
    },
    LiveSubscriptions {
        resp: oneshot::Sender<usize>,
    },
    Flush {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

type SharedSink = Arc<Mutex<Box<dyn EntrySink>>>;

struct Writer {
    store: EntryStore,
    sink: Option<SharedSink>,
    registry: SubscriptionRegistry,
    events_tx: broadcast::Sender<JournalEvent>,
    config: JournalConfig,
}

/// Spawns the writer task that owns `store` and `sink`.
///
/// Must be called from within a tokio runtime.
pub fn spawn_journal(
    store: EntryStore,
    sink: Option<Box<dyn EntrySink>>,
    config: JournalConfig,
) -> JournalHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(config.command_queue_bound.max(1));
    let (events_tx, _) = broadcast::channel::<JournalEvent>(config.event_buffer.max(1));

    let mut writer = Writer {
        store,
        sink: sink.map(|s| Arc::new(Mutex::new(s))),
        registry: SubscriptionRegistry::default(),
        events_tx: events_tx.clone(),
        config,
    };

    tokio::spawn(async move {
        info!(rows = writer.store.len(), "journal runtime started");
        while let Some(cmd) = cmd_rx.recv().await {
            if writer.handle_command(cmd).await {
                break;
            }
        }
        info!("journal runtime stopped");
    });

    JournalHandle { cmd_tx, events_tx }
}

impl JournalHandle {
    /// Change events for every committed mutation.
    pub fn events(&self) -> broadcast::Receiver<JournalEvent> {
        self.events_tx.subscribe()
    }

    /// Inserts `entry` under a fresh id.
    ///
    /// Returns `None` when the table dropped the row under its
    /// ignore-on-conflict policy.
    pub async fn insert(&self, entry: Entry) -> Result<Option<EntryId>, RuntimeError> {
        self.request(|resp| Command::Insert { entry, resp }).await?
    }

    /// Replaces name, kind and value of row `entry.id`, keeping its
    /// timestamp. Returns `false` when no such row exists.
    pub async fn update(&self, entry: Entry) -> Result<bool, RuntimeError> {
        self.request(|resp| Command::Update { entry, resp }).await?
    }

    /// Deletes row `id`. Returns `false` when it was already absent.
    pub async fn delete_by_id(&self, id: EntryId) -> Result<bool, RuntimeError> {
        self.request(|resp| Command::Delete { id, resp }).await?
    }

    pub async fn query(&self, query: EntryQuery) -> Result<Vec<Entry>, RuntimeError> {
        self.request(|resp| Command::Query { query, resp }).await
    }

    pub async fn get(&self, id: EntryId) -> Result<Option<Entry>, RuntimeError> {
        self.request(|resp| Command::Get { id, resp }).await
    }

    pub async fn count_by_name_like(
        &self,
        pattern: impl Into<String>,
    ) -> Result<usize, RuntimeError> {
        let pattern = pattern.into();
        self.request(|resp| Command::CountByNameLike { pattern, resp }).await?
    }

    pub async fn distinct_names(&self) -> Result<Vec<String>, RuntimeError> {
        self.request(|resp| Command::DistinctNames { resp }).await
    }

    pub async fn kind_for_name(
        &self,
        name: impl Into<String>,
    ) -> Result<Option<EntryKind>, RuntimeError> {
        let name = name.into();
        self.request(|resp| Command::KindForName { name, resp }).await
    }

    pub async fn subscribe(
        &self,
        query: EntryQuery,
    ) -> Result<Subscription<Vec<Entry>>, RuntimeError> {
        self.request(|resp| Command::Subscribe { query, resp }).await
    }

    /// Subscribes to a single row.
    ///
    /// Once the row is deleted the subscription stops emitting; it does not
    /// close and does not yield an "absent" value.
    pub async fn subscribe_row(&self, id: EntryId) -> Result<Subscription<Entry>, RuntimeError> {
        self.request(|resp| Command::SubscribeRow { id, resp }).await
    }

    /// Number of query shapes and rows with at least one live subscriber.
    pub async fn live_subscriptions(&self) -> Result<usize, RuntimeError> {
        self.request(|resp| Command::LiveSubscriptions { resp }).await
    }

    pub async fn flush(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Flush { resp }).await?
    }

    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        self.request(|resp| Command::Shutdown { resp }).await?
    }

    async fn request<T>(
        &self,
        make: impl FnOnce(oneshot::Sender<T>) -> Command,
    ) -> Result<T, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(make(tx))
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }
}

impl Writer {
    async fn handle_command(&mut self, cmd: Command) -> bool {
        match cmd {
            Command::Insert { entry, resp } => {
                let (id, op) = self.store.insert(entry);
                let res = self.commit(op).await.map(|outcome| match outcome {
                    WriteOutcome::Applied => Some(id),
                    WriteOutcome::Ignored => None,
                });
                let _ = resp.send(res);
            }
            Command::Update { entry, resp } => {
                let res = match self.store.update(entry) {
                    Some(op) => self.commit(op).await.map(|_| true),
                    None => Ok(false),
                };
                let _ = resp.send(res);
            }
            Command::Delete { id, resp } => {
                let res = match self.store.delete_by_id(id) {
                    Some(op) => self.commit(op).await.map(|_| true),
                    None => Ok(false),
                };
                let _ = resp.send(res);
            }
            Command::Query { query, resp } => {
                let _ = resp.send(self.store.query(&query));
            }
            Command::Get { id, resp } => {
                let _ = resp.send(self.store.get_cloned(id));
            }
            Command::CountByNameLike { pattern, resp } => {
                let _ = resp.send(
                    self.store
                        .count_by_name_like(&pattern)
                        .map_err(RuntimeError::from),
                );
            }
            Command::DistinctNames { resp } => {
                let _ = resp.send(self.store.distinct_names());
            }
            Command::KindForName { name, resp } => {
                let _ = resp.send(self.store.kind_for_name(&name));
            }
            Command::Subscribe { query, resp } => {
                let _ = resp.send(self.registry.subscribe(query, &self.store));
            }
            Command::SubscribeRow { id, resp } => {
                let _ = resp.send(self.registry.subscribe_row(id, &self.store));
            }
            Command::LiveSubscriptions { resp } => {
                let _ = resp.send(self.registry.live_count());
            }
            Command::Flush { resp } => {
                let _ = resp.send(self.flush_sink().await);
            }
            Command::Shutdown { resp } => {
                let out = if self.config.checkpoint_on_shutdown {
                    self.flush_sink().await
                } else {
                    Ok(())
                };
                let _ = resp.send(out);
                return true;
            }
        }

        false
    }

    /// Writes `op` through to the sink, then notifies events and subscribers.
    ///
    /// `op` is already applied to the store. A sink error rolls it back; an
    /// insert the table ignored is discarded with its id left spent.
    async fn commit(&mut self, op: Op) -> Result<WriteOutcome, RuntimeError> {
        let outcome = match &self.sink {
            Some(sink) => match persist_op(sink, op.clone()).await {
                Ok(outcome) => outcome,
                Err(err) => {
                    warn!(id = op.id(), error = %err, "write failed, rolling back");
                    self.store.rollback(&op);
                    return Err(err.into());
                }
            },
            None => WriteOutcome::Applied,
        };

        if outcome == WriteOutcome::Ignored {
            if let Op::Insert { entry } = &op {
                debug!(id = entry.id, "insert ignored on conflict");
                self.store.discard_insert(entry.id);
                return Ok(outcome);
            }
            warn!(id = op.id(), "table had no row for an in-memory change");
        }

        if self.config.warn_on_unset_kind {
            if let Some(entry) = op.written().filter(|e| e.kind.is_unset()) {
                warn!(id = entry.id, name = %entry.name, "stored entry with unset kind");
            }
        }

        let event = match &op {
            Op::Insert { entry } => JournalEvent::Inserted { id: entry.id },
            Op::Update { entry, .. } => JournalEvent::Updated { id: entry.id },
            Op::Delete { entry } => JournalEvent::Deleted { id: entry.id },
        };
        debug!(?event, "committed");
        let _ = self.events_tx.send(event);

        self.registry.publish(&self.store);
        Ok(outcome)
    }

    async fn flush_sink(&self) -> Result<(), RuntimeError> {
        let Some(sink) = &self.sink else {
            return Ok(());
        };
        let sink_ref = Arc::clone(sink);
        tokio::task::spawn_blocking(move || {
            let mut sink = sink_ref.blocking_lock();
            sink.flush()
        })
        .await
        .map_err(|e| PersistError::Message(format!("join error: {e}")))??;
        Ok(())
    }
}

async fn persist_op(sink: &SharedSink, op: Op) -> Result<WriteOutcome, PersistError> {
    let sink_ref = Arc::clone(sink);
    tokio::task::spawn_blocking(move || {
        let mut sink = sink_ref.blocking_lock();
        sink.apply(&op)
    })
    .await
    .map_err(|e| PersistError::Message(format!("join error: {e}")))?
}
