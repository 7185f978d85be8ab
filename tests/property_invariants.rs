use std::collections::BTreeSet;

use proptest::prelude::*;

use pocketjournal::{
    core::store::EntryStore,
    entry::Entry,
    types::{EntryId, EntryKind},
};

#[derive(Debug, Clone)]
enum Action {
    Insert { name_idx: u8, kind_idx: u8, ts: u16 },
    Rename { target: u8, name_idx: u8 },
    Delete { target: u8 },
    DeleteMissing { id: u16 },
}

fn action_strategy() -> impl Strategy<Value = Action> {
    prop_oneof![
        (0u8..12, 0u8..5, 0u16..5000)
            .prop_map(|(name_idx, kind_idx, ts)| Action::Insert { name_idx, kind_idx, ts }),
        (0u8..24, 0u8..12).prop_map(|(target, name_idx)| Action::Rename { target, name_idx }),
        (0u8..24).prop_map(|target| Action::Delete { target }),
        (10_000u16..20_000).prop_map(|id| Action::DeleteMissing { id }),
    ]
}

fn name_for(idx: u8) -> String {
    // Mixed case so byte order and case-insensitive LIKE disagree.
    if idx % 2 == 0 {
        format!("n{idx}")
    } else {
        format!("N{idx}")
    }
}

fn full_scan_by_name(store: &EntryStore, name: &str) -> Vec<EntryId> {
    store
        .ordered_ids()
        .iter()
        .copied()
        .filter(|id| store.get(*id).is_some_and(|r| r.name == name))
        .collect()
}

fn pick(store: &EntryStore, target: u8) -> Option<EntryId> {
    let ids = store.ordered_ids();
    if ids.is_empty() {
        None
    } else {
        Some(ids[usize::from(target) % ids.len()])
    }
}

proptest! {
    #[test]
    fn random_sequences_preserve_indices_and_orderings(
        actions in prop::collection::vec(action_strategy(), 1..200),
    ) {
        let mut store = EntryStore::new();
        let mut names = BTreeSet::<String>::new();
        let mut last_id: EntryId = 0;

        for action in actions {
            match action {
                Action::Insert { name_idx, kind_idx, ts } => {
                    let name = name_for(name_idx);
                    names.insert(name.clone());
                    let kind = EntryKind::ALL[usize::from(kind_idx)];
                    let (id, _) = store.insert(Entry::new(name, kind, "v", i64::from(ts)));
                    prop_assert!(id > last_id);
                    last_id = id;
                }
                Action::Rename { target, name_idx } => {
                    let Some(id) = pick(&store, target) else { continue; };
                    let mut rec = store.get_cloned(id).expect("picked id exists");
                    let ts = rec.timestamp;
                    rec.name = name_for(name_idx);
                    rec.timestamp = ts + 1;
                    names.insert(rec.name.clone());
                    prop_assert!(store.update(rec).is_some());
                    prop_assert_eq!(store.get(id).map(|r| r.timestamp), Some(ts));
                }
                Action::Delete { target } => {
                    let Some(id) = pick(&store, target) else { continue; };
                    prop_assert!(store.delete_by_id(id).is_some());
                }
                Action::DeleteMissing { id } => {
                    let before = store.all();
                    prop_assert!(store.delete_by_id(i64::from(id)).is_none());
                    prop_assert_eq!(store.all(), before);
                }
            }

            for name in &names {
                let indexed: Vec<EntryId> = store.by_name(name).into_iter().map(|r| r.id).collect();
                prop_assert_eq!(indexed, full_scan_by_name(&store, name));
            }

            let asc = store.all_by_name_asc();
            prop_assert!(asc.windows(2).all(|w| w[0].name <= w[1].name));
            let mut desc = store.all_by_name_desc();
            desc.reverse();
            prop_assert_eq!(&desc, &asc);

            let by_kind = store.all_by_kind_asc();
            prop_assert!(by_kind.windows(2).all(|w| w[0].kind <= w[1].kind));

            let like_total: usize = names
                .iter()
                .map(|n| n.to_ascii_lowercase())
                .collect::<BTreeSet<_>>()
                .iter()
                .map(|n| store.count_by_name_like(n).expect("pattern"))
                .sum();
            prop_assert_eq!(like_total, store.len());
        }
    }

    #[test]
    fn date_range_matches_linear_filter(
        stamps in prop::collection::vec(0i64..1_000, 0..100),
        start in 0i64..1_000,
        width in 0i64..500,
    ) {
        let mut store = EntryStore::new();
        for ts in &stamps {
            store.insert(Entry::new("x", EntryKind::Integer, ts.to_string(), *ts));
        }
        let end = start + width;

        let got: Vec<i64> = store
            .by_date_range(start, end)
            .into_iter()
            .map(|e| e.timestamp)
            .collect();
        let expected: Vec<i64> = stamps
            .iter()
            .copied()
            .filter(|t| *t >= start && *t < end)
            .collect();
        prop_assert_eq!(got, expected);
    }
}
