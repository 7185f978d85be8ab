use hashbrown::HashMap;

use crate::types::EntryId;

/// Secondary index from a key to ids in ascending (natural) order.
pub type VecIndex<K> = HashMap<K, Vec<EntryId>>;

/// Inserts `id` keeping `ids` sorted; no-op if already present.
pub fn insert_sorted(ids: &mut Vec<EntryId>, id: EntryId) {
    if let Err(pos) = ids.binary_search(&id) {
        ids.insert(pos, id);
    }
}

/// Removes `id` from a sorted id list.
pub fn remove_sorted(ids: &mut Vec<EntryId>, id: EntryId) {
    if let Ok(pos) = ids.binary_search(&id) {
        ids.remove(pos);
    }
}
