//! # Attested-History Ring Buffer
//!
//! Fixed-capacity circular queue of attested challenges, persisted as three
//! values: capacity, cursor and one slot per index.
//!
//! ```text
//! capacity = 4, cursor = 1
//!
//!   slot:   0     1     2     3
//!         [ e4 ][ e5 ][ e2 ][ e3 ]
//!                 ^cursor (newest)
//!
//! retrieve_all() -> e2, e3, e4, e5
//! ```
//!
//! The cursor starts at -1 so the first enqueue lands in slot 0. Resize reads
//! the logical contents, clears the old slots and replays them into the new
//! arena inside the same overlay, so readers see either the old ring or the
//! new one.

use super::keys;
use super::store::ChallengeStore;
use crate::domain::AttestedChallenge;
use crate::error::{ChallengeError, ChallengeResult};
use shared_types::KeyValueStore;

const EMPTY_CURSOR: i64 = -1;

pub struct AttestedRing;

impl AttestedRing {
    pub fn capacity<KV: KeyValueStore + ?Sized>(
        store: &ChallengeStore<'_, KV>,
    ) -> ChallengeResult<u64> {
        match store.get(keys::ATTESTED_CAPACITY_KEY)? {
            Some(bytes) => keys::decode_u64(&bytes),
            None => Ok(0),
        }
    }

    fn cursor<KV: KeyValueStore + ?Sized>(
        store: &ChallengeStore<'_, KV>,
        capacity: u64,
    ) -> ChallengeResult<i64> {
        let cursor = match store.get(keys::ATTESTED_CURSOR_KEY)? {
            Some(bytes) => keys::decode_i64(&bytes)?,
            None => EMPTY_CURSOR,
        };
        if cursor < EMPTY_CURSOR || (cursor >= 0 && cursor as u64 >= capacity) {
            return Err(ChallengeError::corruption(format!(
                "ring cursor {} outside capacity {}",
                cursor, capacity
            )));
        }
        Ok(cursor)
    }

    /// Append an item, overwriting the oldest one when full. No-op at
    /// capacity zero.
    pub fn enqueue<KV: KeyValueStore + ?Sized>(
        store: &mut ChallengeStore<'_, KV>,
        item: &AttestedChallenge,
    ) -> ChallengeResult<()> {
        let capacity = Self::capacity(store)?;
        if capacity == 0 {
            return Ok(());
        }
        let cursor = Self::cursor(store, capacity)?;
        let next = ((cursor + 1) as u64) % capacity;

        store.put(keys::attested_slot_key(next), bincode::serialize(item)?);
        store.put(
            keys::ATTESTED_CURSOR_KEY.to_vec(),
            (next as i64).to_be_bytes().to_vec(),
        );
        Ok(())
    }

    /// Items oldest to newest, starting just after the cursor.
    pub fn retrieve_all<KV: KeyValueStore + ?Sized>(
        store: &ChallengeStore<'_, KV>,
    ) -> ChallengeResult<Vec<AttestedChallenge>> {
        let capacity = Self::capacity(store)?;
        if capacity == 0 {
            return Ok(Vec::new());
        }
        let cursor = Self::cursor(store, capacity)?;
        let start = ((cursor + 1) as u64) % capacity;

        let mut items = Vec::new();
        for step in 0..capacity {
            let slot = (start + step) % capacity;
            if let Some(bytes) = store.get(&keys::attested_slot_key(slot))? {
                items.push(bincode::deserialize(&bytes)?);
            }
        }
        Ok(items)
    }

    /// Rebuild the ring at a new capacity, keeping the newest
    /// `min(len, new_capacity)` items in order.
    pub fn resize<KV: KeyValueStore + ?Sized>(
        store: &mut ChallengeStore<'_, KV>,
        new_capacity: u64,
    ) -> ChallengeResult<()> {
        let old_capacity = Self::capacity(store)?;
        let items = Self::retrieve_all(store)?;

        for slot in 0..old_capacity {
            store.delete(keys::attested_slot_key(slot));
        }
        store.put(
            keys::ATTESTED_CAPACITY_KEY.to_vec(),
            new_capacity.to_be_bytes().to_vec(),
        );
        store.put(
            keys::ATTESTED_CURSOR_KEY.to_vec(),
            EMPTY_CURSOR.to_be_bytes().to_vec(),
        );

        for item in &items {
            Self::enqueue(store, item)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{RedundancyIndex, VoteResult};
    use shared_types::{InMemoryKVStore, ObjectId};

    fn item(id: u64) -> AttestedChallenge {
        AttestedChallenge {
            id,
            result: VoteResult::Succeed,
            object_id: ObjectId::from(id),
            operator_id: 1,
            segment_index: 0,
            redundancy_index: RedundancyIndex::PRIMARY,
            challenger: None,
        }
    }

    fn ids<KV: KeyValueStore + ?Sized>(store: &ChallengeStore<'_, KV>) -> Vec<u64> {
        AttestedRing::retrieve_all(store)
            .unwrap()
            .into_iter()
            .map(|item| item.id)
            .collect()
    }

    #[test]
    fn test_zero_capacity_is_empty() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);

        AttestedRing::enqueue(&mut store, &item(1)).unwrap();
        assert!(ids(&store).is_empty());
        assert!(!store.is_dirty());
    }

    #[test]
    fn test_partial_fill_keeps_order() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        AttestedRing::resize(&mut store, 5).unwrap();

        for id in 1..=3 {
            AttestedRing::enqueue(&mut store, &item(id)).unwrap();
        }
        assert_eq!(ids(&store), vec![1, 2, 3]);
    }

    #[test]
    fn test_overwrites_oldest_when_full() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        AttestedRing::resize(&mut store, 3).unwrap();

        for id in 1..=8 {
            AttestedRing::enqueue(&mut store, &item(id)).unwrap();
            assert!(ids(&store).len() <= 3);
        }
        assert_eq!(ids(&store), vec![6, 7, 8]);
    }

    #[test]
    fn test_shrink_keeps_newest() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        AttestedRing::resize(&mut store, 5).unwrap();
        for id in 1..=7 {
            AttestedRing::enqueue(&mut store, &item(id)).unwrap();
        }

        AttestedRing::resize(&mut store, 2).unwrap();
        assert_eq!(AttestedRing::capacity(&store).unwrap(), 2);
        assert_eq!(ids(&store), vec![6, 7]);

        AttestedRing::enqueue(&mut store, &item(8)).unwrap();
        assert_eq!(ids(&store), vec![7, 8]);
    }

    #[test]
    fn test_grow_keeps_everything() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        AttestedRing::resize(&mut store, 2).unwrap();
        for id in 1..=4 {
            AttestedRing::enqueue(&mut store, &item(id)).unwrap();
        }

        AttestedRing::resize(&mut store, 4).unwrap();
        AttestedRing::enqueue(&mut store, &item(5)).unwrap();
        assert_eq!(ids(&store), vec![3, 4, 5]);
    }

    #[test]
    fn test_shrink_to_zero_clears() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        AttestedRing::resize(&mut store, 3).unwrap();
        AttestedRing::enqueue(&mut store, &item(1)).unwrap();

        AttestedRing::resize(&mut store, 0).unwrap();
        assert!(ids(&store).is_empty());
        assert!(store.scan(keys::ATTESTED_SLOT_PREFIX).unwrap().is_empty());
    }

    #[test]
    fn test_cursor_outside_capacity_is_corruption() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        AttestedRing::resize(&mut store, 2).unwrap();
        store.put(keys::ATTESTED_CURSOR_KEY.to_vec(), 7i64.to_be_bytes().to_vec());

        let err = AttestedRing::retrieve_all(&store).unwrap_err();
        assert!(err.is_fatal());
    }
}
