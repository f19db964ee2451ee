//! Transactional overlay over the key-value store
//!
//! One `ChallengeStore` spans one message or one end-of-block pass. Reads see
//! the overlay's own writes; nothing reaches the base store until the owner
//! turns the overlay into a batch and commits it with `atomic_batch_write`.
//! Dropping the overlay discards every write.

use crate::error::ChallengeResult;
use shared_types::{BatchOperation, KeyValueStore};
use std::collections::BTreeMap;

pub struct ChallengeStore<'a, KV: KeyValueStore + ?Sized> {
    base: &'a KV,
    /// key -> Some(value) for puts, None for deletes
    pending: BTreeMap<Vec<u8>, Option<Vec<u8>>>,
}

impl<'a, KV: KeyValueStore + ?Sized> ChallengeStore<'a, KV> {
    pub fn new(base: &'a KV) -> Self {
        Self {
            base,
            pending: BTreeMap::new(),
        }
    }

    pub fn get(&self, key: &[u8]) -> ChallengeResult<Option<Vec<u8>>> {
        match self.pending.get(key) {
            Some(value) => Ok(value.clone()),
            None => Ok(self.base.get(key)?),
        }
    }

    pub fn put(&mut self, key: Vec<u8>, value: Vec<u8>) {
        self.pending.insert(key, Some(value));
    }

    pub fn delete(&mut self, key: Vec<u8>) {
        self.pending.insert(key, None);
    }

    /// Prefix scan over base plus overlay, ascending key order.
    pub fn scan(&self, prefix: &[u8]) -> ChallengeResult<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> =
            self.base.prefix_scan(prefix)?.into_iter().collect();

        let overlay = self
            .pending
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix));
        for (key, value) in overlay {
            match value {
                Some(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                None => {
                    merged.remove(key);
                }
            }
        }
        Ok(merged.into_iter().collect())
    }

    pub fn is_dirty(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Consume the overlay into an ordered batch for `atomic_batch_write`.
    pub fn into_batch(self) -> Vec<BatchOperation> {
        self.pending
            .into_iter()
            .map(|(key, value)| match value {
                Some(value) => BatchOperation::Put { key, value },
                None => BatchOperation::Delete { key },
            })
            .collect()
    }
}
