use hashbrown::{HashMap, HashSet};
use thiserror::Error;

use crate::{
    core::{
        indices::{self, VecIndex},
        like::LikePattern,
    },
    entry::Entry,
    op::Op,
    query::{EntryFilter, EntryQuery, SortOrder},
    types::{EntryId, EntryKind, TimestampMs},
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("duplicate entry id {0}")]
    DuplicateId(EntryId),
    #[error("invalid LIKE pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// The entries table held in memory.
///
/// Natural row order is ascending id, which is also insertion order since
/// ids only grow.
#[derive(Debug, Default)]
pub struct EntryStore {
    records: HashMap<EntryId, Entry>,
    order: Vec<EntryId>,
    by_name: VecIndex<String>,
    next_id: EntryId,
}

impl EntryStore {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Rebuilds a store from persisted rows.
    ///
    /// `high_water` is the largest id ever handed out; the next id is above
    /// both it and every loaded row.
    pub fn from_rows(rows: Vec<Entry>, high_water: EntryId) -> Result<Self, StoreError> {
        let mut store = Self::new();
        let mut max_id = high_water;

        for row in rows {
            if store.records.contains_key(&row.id) {
                return Err(StoreError::DuplicateId(row.id));
            }
            max_id = max_id.max(row.id);
            store.attach(row);
        }

        store.next_id = max_id.saturating_add(1);
        Ok(store)
    }

    /// Inserts `entry` under a fresh id, ignoring `entry.id`.
    pub fn insert(&mut self, entry: Entry) -> (EntryId, Op) {
        let id = self.next_id;
        self.next_id += 1;

        let entry = entry.with_id(id);
        self.attach(entry.clone());
        (id, Op::Insert { entry })
    }

    /// Replaces name, kind and value of the row with `entry.id`.
    ///
    /// The stored timestamp is kept. Returns `None` when no such row exists.
    pub fn update(&mut self, entry: Entry) -> Option<Op> {
        let rec = self.records.get_mut(&entry.id)?;
        let prev = rec.clone();

        rec.name = entry.name;
        rec.kind = entry.kind;
        rec.value = entry.value;
        let next = rec.clone();

        if next.name != prev.name {
            self.unindex_name(&prev.name, prev.id);
            indices::insert_sorted(self.by_name.entry(next.name.clone()).or_default(), next.id);
        }

        Some(Op::Update { entry: next, prev })
    }

    /// Deletes the row with `entry.id`.
    pub fn delete(&mut self, entry: &Entry) -> Option<Op> {
        self.delete_by_id(entry.id)
    }

    /// Deletes the row with `id`. Returns `None` when it was absent.
    pub fn delete_by_id(&mut self, id: EntryId) -> Option<Op> {
        let entry = self.detach(id)?;
        Some(Op::Delete { entry })
    }

    /// Reverts an op previously returned by this store.
    pub fn rollback(&mut self, op: &Op) {
        match op {
            Op::Insert { entry } => {
                self.detach(entry.id);
                if self.next_id == entry.id.saturating_add(1) {
                    self.next_id = entry.id;
                }
            }
            Op::Update { prev, .. } => {
                self.detach(prev.id);
                self.attach(prev.clone());
            }
            Op::Delete { entry } => {
                self.attach(entry.clone());
            }
        }
    }

    /// Drops a row whose insert the table refused.
    ///
    /// Unlike [`EntryStore::rollback`], `next_id` is left alone: the refused
    /// id is taken on disk and must not be handed out again.
    pub fn discard_insert(&mut self, id: EntryId) -> Option<Entry> {
        self.detach(id)
    }

    pub fn get(&self, id: EntryId) -> Option<&Entry> {
        self.records.get(&id)
    }

    pub fn get_cloned(&self, id: EntryId) -> Option<Entry> {
        self.get(id).cloned()
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn ordered_ids(&self) -> &[EntryId] {
        &self.order
    }

    /// Next id [`EntryStore::insert`] will hand out.
    pub fn next_id(&self) -> EntryId {
        self.next_id
    }

    /// Runs `query` and returns an owned result set.
    pub fn query(&self, query: &EntryQuery) -> Vec<Entry> {
        let mut rows: Vec<Entry> = self.filtered(&query.filter).into_iter().cloned().collect();
        match query.sort {
            SortOrder::Natural => {}
            SortOrder::NameAsc => rows.sort_by(|a, b| a.name.cmp(&b.name)),
            SortOrder::NameDesc => {
                rows.sort_by(|a, b| a.name.cmp(&b.name));
                rows.reverse();
            }
            SortOrder::KindAsc => rows.sort_by_key(|e| e.kind),
        }
        rows
    }

    pub fn all(&self) -> Vec<Entry> {
        self.query(&EntryQuery::all())
    }

    pub fn by_date_range(&self, start: TimestampMs, end: TimestampMs) -> Vec<Entry> {
        self.query(&EntryQuery::date_range(start, end))
    }

    pub fn by_name(&self, name: &str) -> Vec<Entry> {
        self.query(&EntryQuery::name(name))
    }

    pub fn all_by_name_asc(&self) -> Vec<Entry> {
        self.query(&EntryQuery::all().sorted(SortOrder::NameAsc))
    }

    pub fn all_by_name_desc(&self) -> Vec<Entry> {
        self.query(&EntryQuery::all().sorted(SortOrder::NameDesc))
    }

    pub fn all_by_kind_asc(&self) -> Vec<Entry> {
        self.query(&EntryQuery::all().sorted(SortOrder::KindAsc))
    }

    pub fn by_date_range_by_name_asc(&self, start: TimestampMs, end: TimestampMs) -> Vec<Entry> {
        self.query(&EntryQuery::date_range(start, end).sorted(SortOrder::NameAsc))
    }

    pub fn by_date_range_by_name_desc(&self, start: TimestampMs, end: TimestampMs) -> Vec<Entry> {
        self.query(&EntryQuery::date_range(start, end).sorted(SortOrder::NameDesc))
    }

    pub fn by_date_range_by_kind_asc(&self, start: TimestampMs, end: TimestampMs) -> Vec<Entry> {
        self.query(&EntryQuery::date_range(start, end).sorted(SortOrder::KindAsc))
    }

    /// Counts rows whose name matches the SQL `LIKE` pattern.
    pub fn count_by_name_like(&self, pattern: &str) -> Result<usize, StoreError> {
        let pattern = LikePattern::new(pattern)?;
        Ok(self
            .by_name
            .iter()
            .filter(|(name, _)| pattern.matches(name))
            .map(|(_, ids)| ids.len())
            .sum())
    }

    /// Distinct names in order of their first row.
    pub fn distinct_names(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for e in self.iter() {
            if seen.insert(e.name.as_str()) {
                out.push(e.name.clone());
            }
        }
        out
    }

    /// Kind of the first row named `name`.
    pub fn kind_for_name(&self, name: &str) -> Option<EntryKind> {
        self.by_name
            .get(name)
            .and_then(|ids| ids.first())
            .and_then(|id| self.records.get(id))
            .map(|e| e.kind)
    }

    fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.order.iter().filter_map(|id| self.records.get(id))
    }

    fn filtered(&self, filter: &EntryFilter) -> Vec<&Entry> {
        match filter {
            EntryFilter::All => self.iter().collect(),
            EntryFilter::DateRange { start, end } => self
                .iter()
                .filter(|e| e.timestamp >= *start && e.timestamp < *end)
                .collect(),
            EntryFilter::Name(name) => self
                .by_name
                .get(name)
                .into_iter()
                .flat_map(|ids| ids.iter())
                .filter_map(|id| self.records.get(id))
                .collect(),
        }
    }

    fn attach(&mut self, entry: Entry) {
        let id = entry.id;
        indices::insert_sorted(&mut self.order, id);
        indices::insert_sorted(self.by_name.entry(entry.name.clone()).or_default(), id);
        self.records.insert(id, entry);
    }

    fn detach(&mut self, id: EntryId) -> Option<Entry> {
        let entry = self.records.remove(&id)?;
        indices::remove_sorted(&mut self.order, id);
        self.unindex_name(&entry.name, id);
        Some(entry)
    }

    fn unindex_name(&mut self, name: &str, id: EntryId) {
        if let Some(ids) = self.by_name.get_mut(name) {
            indices::remove_sorted(ids, id);
            if ids.is_empty() {
                self.by_name.remove(name);
            }
        }
    }
}
