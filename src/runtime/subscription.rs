use hashbrown::HashMap;
use tokio::sync::watch;
use tracing::debug;

use crate::{
    core::store::EntryStore,
    entry::Entry,
    query::EntryQuery,
    types::EntryId,
};

/// Live view of a query's full result set.
///
/// The first [`Subscription::next`] yields the current result; each later
/// call waits for the next committed mutation and yields the complete new
/// result. Only the latest snapshot is kept, so a slow reader skips straight
/// to the newest state. Dropping the subscription unsubscribes.
#[derive(Debug)]
pub struct Subscription<T> {
    rx: watch::Receiver<Option<T>>,
    primed: bool,
}

impl<T: Clone> Subscription<T> {
    fn new(rx: watch::Receiver<Option<T>>) -> Self {
        Self { rx, primed: false }
    }

    /// Waits for the next snapshot. Returns `None` once the runtime stops.
    pub async fn next(&mut self) -> Option<T> {
        loop {
            if self.primed {
                self.rx.changed().await.ok()?;
            }
            self.primed = true;
            if let Some(value) = self.rx.borrow_and_update().clone() {
                return Some(value);
            }
        }
    }

    /// Most recent snapshot without waiting.
    pub fn latest(&self) -> Option<T> {
        self.rx.borrow().clone()
    }
}

/// Live channels keyed by query shape.
///
/// Every publish re-runs each live query in full; there is no dependency
/// tracking between mutations and predicates.
#[derive(Debug, Default)]
pub(crate) struct SubscriptionRegistry {
    queries: HashMap<EntryQuery, watch::Sender<Option<Vec<Entry>>>>,
    rows: HashMap<EntryId, watch::Sender<Option<Entry>>>,
}

impl SubscriptionRegistry {
    pub(crate) fn subscribe(
        &mut self,
        query: EntryQuery,
        store: &EntryStore,
    ) -> Subscription<Vec<Entry>> {
        if let Some(tx) = self.queries.get(&query) {
            if !tx.is_closed() {
                return Subscription::new(tx.subscribe());
            }
        }

        let (tx, rx) = watch::channel(Some(store.query(&query)));
        debug!(?query, "registered query subscription");
        self.queries.insert(query, tx);
        Subscription::new(rx)
    }

    /// Subscribes to one row. Emits nothing while the row is absent.
    pub(crate) fn subscribe_row(&mut self, id: EntryId, store: &EntryStore) -> Subscription<Entry> {
        if let Some(tx) = self.rows.get(&id) {
            if !tx.is_closed() {
                return Subscription::new(tx.subscribe());
            }
        }

        let (tx, rx) = watch::channel(store.get_cloned(id));
        debug!(id, "registered row subscription");
        self.rows.insert(id, tx);
        Subscription::new(rx)
    }

    pub(crate) fn publish(&mut self, store: &EntryStore) {
        self.prune();

        for (query, tx) in &self.queries {
            tx.send_replace(Some(store.query(query)));
        }

        // A vanished row leaves its subscribers on the last value they saw.
        for (id, tx) in &self.rows {
            if let Some(entry) = store.get_cloned(*id) {
                tx.send_replace(Some(entry));
            }
        }

        debug!(
            queries = self.queries.len(),
            rows = self.rows.len(),
            "published snapshots"
        );
    }

    pub(crate) fn live_count(&mut self) -> usize {
        self.prune();
        self.queries.len() + self.rows.len()
    }

    fn prune(&mut self) {
        self.queries.retain(|_, tx| !tx.is_closed());
        self.rows.retain(|_, tx| !tx.is_closed());
    }
}
