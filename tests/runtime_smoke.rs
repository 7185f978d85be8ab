use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use pocketjournal::{
    core::store::EntryStore,
    entry::Entry,
    op::Op,
    persist::{EntrySink, PersistError, PersistResult, WriteOutcome},
    query::{EntryQuery, SortOrder},
    runtime::{
        events::JournalEvent,
        handle::{JournalConfig, RuntimeError, spawn_journal},
        subscription::Subscription,
    },
    types::EntryKind,
};

fn entry(name: &str, kind: EntryKind, value: &str, ts: i64) -> Entry {
    Entry::new(name, kind, value, ts)
}

async fn next_snapshot<T: Clone>(sub: &mut Subscription<T>) -> T {
    tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .expect("snapshot timeout")
        .expect("runtime alive")
}

/// Sink whose writes fail while `failing` is set.
struct FlakySink {
    failing: Arc<AtomicBool>,
}

impl EntrySink for FlakySink {
    fn apply(&mut self, _op: &Op) -> PersistResult<WriteOutcome> {
        if self.failing.load(Ordering::SeqCst) {
            Err(PersistError::Message("disk full".to_string()))
        } else {
            Ok(WriteOutcome::Applied)
        }
    }
}

/// Sink that drops every insert as a conflict.
struct ConflictSink;

/// Sink that treats only the first insert as a conflict, as if another writer
/// already owned that id on disk.
#[derive(Default)]
struct FirstInsertTakenSink {
    seen_insert: bool,
}

impl EntrySink for FirstInsertTakenSink {
    fn apply(&mut self, op: &Op) -> PersistResult<WriteOutcome> {
        if matches!(op, Op::Insert { .. }) && !self.seen_insert {
            self.seen_insert = true;
            return Ok(WriteOutcome::Ignored);
        }
        Ok(WriteOutcome::Applied)
    }
}

impl EntrySink for ConflictSink {
    fn apply(&mut self, op: &Op) -> PersistResult<WriteOutcome> {
        Ok(match op {
            Op::Insert { .. } => WriteOutcome::Ignored,
            _ => WriteOutcome::Applied,
        })
    }
}

#[tokio::test]
async fn name_subscription_re_emits_on_every_mutation() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());
    let mut sub = handle.subscribe(EntryQuery::name("Weight")).await.expect("subscribe");

    assert!(next_snapshot(&mut sub).await.is_empty());

    let id = handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect("insert")
        .expect("id");
    let rows = next_snapshot(&mut sub).await;
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, id);

    handle
        .insert(entry("Sleep", EntryKind::Integer, "7", 2))
        .await
        .expect("insert");
    let again = next_snapshot(&mut sub).await;
    assert_eq!(again, rows);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn insert_update_delete_scenario_over_a_date_range() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());
    let t = 1_710_084_600_000;
    let mut day = handle
        .subscribe(EntryQuery::date_range(t - 1_000, t + 1_000))
        .await
        .expect("subscribe");
    assert!(next_snapshot(&mut day).await.is_empty());

    let id = handle
        .insert(entry("Weight", EntryKind::Float, "72.5", t))
        .await
        .expect("insert")
        .expect("id");
    let rows = next_snapshot(&mut day).await;
    assert_eq!(rows, vec![entry("Weight", EntryKind::Float, "72.5", t).with_id(id)]);

    let updated = handle
        .update(entry("Weight", EntryKind::Float, "73.0", t).with_id(id))
        .await
        .expect("update");
    assert!(updated);
    let rows = next_snapshot(&mut day).await;
    assert_eq!(rows[0].value, "73.0");
    assert_eq!(rows[0].timestamp, t);

    assert!(handle.delete_by_id(id).await.expect("delete"));
    assert!(next_snapshot(&mut day).await.is_empty());

    assert!(!handle.delete_by_id(id).await.expect("idempotent delete"));
    assert!(!handle
        .update(entry("Weight", EntryKind::Float, "1", t).with_id(id))
        .await
        .expect("update missing"));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn sorted_subscriptions_deliver_ordered_snapshots() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());
    for (name, kind) in [
        ("b", EntryKind::String),
        ("a", EntryKind::Integer),
        ("c", EntryKind::Boolean),
    ] {
        handle.insert(entry(name, kind, "", 1)).await.expect("insert");
    }

    let mut asc = handle
        .subscribe(EntryQuery::all().sorted(SortOrder::NameAsc))
        .await
        .expect("asc");
    let mut desc = handle
        .subscribe(EntryQuery::all().sorted(SortOrder::NameDesc))
        .await
        .expect("desc");
    let mut by_kind = handle
        .subscribe(EntryQuery::all().sorted(SortOrder::KindAsc))
        .await
        .expect("kind");

    let names = |rows: Vec<Entry>| rows.into_iter().map(|e| e.name).collect::<Vec<_>>();
    assert_eq!(names(next_snapshot(&mut asc).await), vec!["a", "b", "c"]);
    assert_eq!(names(next_snapshot(&mut desc).await), vec!["c", "b", "a"]);
    assert_eq!(names(next_snapshot(&mut by_kind).await), vec!["c", "a", "b"]);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn row_subscription_stalls_after_delete() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());
    let id = handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect("insert")
        .expect("id");

    let mut row = handle.subscribe_row(id).await.expect("subscribe");
    assert_eq!(next_snapshot(&mut row).await.value, "72.5");

    handle
        .update(entry("Weight", EntryKind::Float, "80", 1).with_id(id))
        .await
        .expect("update");
    assert_eq!(next_snapshot(&mut row).await.value, "80");

    handle.delete_by_id(id).await.expect("delete");
    handle
        .insert(entry("Other", EntryKind::String, "", 2))
        .await
        .expect("insert other");

    // Assumed contract: no "absent" emission and no close after delete.
    let stalled = tokio::time::timeout(Duration::from_millis(100), row.next()).await;
    assert!(stalled.is_err(), "row subscription should stall after delete");
    assert_eq!(row.latest().map(|e| e.value), Some("80".to_string()));

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn row_subscription_to_absent_id_waits() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());
    let mut row = handle.subscribe_row(1).await.expect("subscribe");

    let pending = tokio::time::timeout(Duration::from_millis(50), row.next()).await;
    assert!(pending.is_err());

    handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect("insert");
    assert_eq!(next_snapshot(&mut row).await.id, 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn dropped_subscriptions_are_pruned_and_shared_shapes_reuse_a_channel() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());

    let a = handle.subscribe(EntryQuery::name("Weight")).await.expect("a");
    let mut b = handle.subscribe(EntryQuery::name("Weight")).await.expect("b");
    let c = handle.subscribe(EntryQuery::all()).await.expect("c");
    assert_eq!(handle.live_subscriptions().await.expect("count"), 2);

    drop(a);
    drop(c);
    assert_eq!(handle.live_subscriptions().await.expect("count"), 1);

    handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect("insert");
    assert_eq!(next_snapshot(&mut b).await.len(), 1);

    drop(b);
    assert_eq!(handle.live_subscriptions().await.expect("count"), 0);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn events_follow_commit_order() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());
    let mut events = handle.events();

    let id = handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect("insert")
        .expect("id");
    handle
        .update(entry("Weight", EntryKind::Float, "73", 1).with_id(id))
        .await
        .expect("update");
    handle.delete_by_id(id).await.expect("delete");
    handle.delete_by_id(id).await.expect("no-op delete");

    let mut seen = Vec::new();
    for _ in 0..3 {
        let evt = tokio::time::timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("event")
            .expect("recv");
        seen.push(evt);
    }
    assert_eq!(
        seen,
        vec![
            JournalEvent::Inserted { id },
            JournalEvent::Updated { id },
            JournalEvent::Deleted { id },
        ]
    );
    assert!(events.try_recv().is_err());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn storage_failure_surfaces_and_leaves_state_unchanged() {
    let failing = Arc::new(AtomicBool::new(false));
    let sink = FlakySink {
        failing: Arc::clone(&failing),
    };
    let handle = spawn_journal(EntryStore::new(), Some(Box::new(sink)), JournalConfig::default());

    let id = handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect("insert")
        .expect("id");
    let mut all = handle.subscribe(EntryQuery::all()).await.expect("subscribe");
    let before = next_snapshot(&mut all).await;

    failing.store(true, Ordering::SeqCst);

    let err = handle
        .insert(entry("Sleep", EntryKind::Integer, "7", 2))
        .await
        .expect_err("insert must fail");
    assert!(matches!(err, RuntimeError::Persist(_)));
    assert!(handle
        .update(entry("Weight", EntryKind::Float, "99", 1).with_id(id))
        .await
        .is_err());
    assert!(handle.delete_by_id(id).await.is_err());

    assert_eq!(handle.query(EntryQuery::all()).await.expect("query"), before);
    let quiet = tokio::time::timeout(Duration::from_millis(50), all.next()).await;
    assert!(quiet.is_err(), "failed writes must not publish");

    failing.store(false, Ordering::SeqCst);
    let next = handle
        .insert(entry("Sleep", EntryKind::Integer, "7", 2))
        .await
        .expect("insert")
        .expect("id");
    assert_eq!(next, id + 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn conflicting_insert_is_dropped_silently() {
    let handle = spawn_journal(
        EntryStore::new(),
        Some(Box::new(ConflictSink)),
        JournalConfig::default(),
    );
    let mut events = handle.events();

    let res = handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect("insert call");
    assert_eq!(res, None);
    assert!(handle.query(EntryQuery::all()).await.expect("query").is_empty());
    assert!(events.try_recv().is_err());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn insert_after_conflict_moves_past_the_taken_id() {
    let handle = spawn_journal(
        EntryStore::new(),
        Some(Box::new(FirstInsertTakenSink::default())),
        JournalConfig::default(),
    );

    let first = handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect("insert call");
    assert_eq!(first, None);

    let mut ids = Vec::new();
    for value in ["73", "74", "75"] {
        let id = handle
            .insert(entry("Weight", EntryKind::Float, value, 1))
            .await
            .expect("insert call");
        ids.push(id);
    }
    assert_eq!(ids, vec![Some(2), Some(3), Some(4)]);

    let rows = handle.query(EntryQuery::all()).await.expect("query");
    let stored: Vec<_> = rows.iter().map(|e| (e.id, e.value.as_str())).collect();
    assert_eq!(stored, vec![(2, "73"), (3, "74"), (4, "75")]);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn count_and_category_helpers() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());
    for name in ["Weight", "weight", "Sleep"] {
        handle.insert(entry(name, EntryKind::Float, "1", 1)).await.expect("insert");
    }

    assert_eq!(handle.count_by_name_like("WEIGHT").await.expect("count"), 2);
    assert_eq!(
        handle.distinct_names().await.expect("names"),
        vec!["Weight", "weight", "Sleep"]
    );
    assert_eq!(
        handle.kind_for_name("Sleep").await.expect("kind"),
        Some(EntryKind::Float)
    );

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn shutdown_ends_subscriptions_and_rejects_commands() {
    let handle = spawn_journal(EntryStore::new(), None, JournalConfig::default());
    let mut sub = handle.subscribe(EntryQuery::all()).await.expect("subscribe");
    assert!(next_snapshot(&mut sub).await.is_empty());

    handle.shutdown().await.expect("shutdown");

    let end = tokio::time::timeout(Duration::from_secs(1), sub.next())
        .await
        .expect("stream end");
    assert!(end.is_none());

    let err = handle
        .insert(entry("Weight", EntryKind::Float, "72.5", 1))
        .await
        .expect_err("closed");
    assert!(matches!(err, RuntimeError::ChannelClosed));
}
