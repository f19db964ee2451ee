//! Monotonic sequences
//!
//! A sequence is one persisted counter under its own key. The encoding is
//! fixed when the sequence is constructed: `U64Sequence` stores 8 big-endian
//! bytes, `U256Sequence` stores 32. An unset sequence reads as zero, so the
//! first `next()` returns one.

use super::store::ChallengeStore;
use crate::error::{ChallengeError, ChallengeResult};
use shared_types::{KeyValueStore, U256};

/// A persisted counter value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SequenceValue {
    Fixed(u64),
    Big(U256),
}

impl SequenceValue {
    pub fn encode(&self) -> Vec<u8> {
        match self {
            SequenceValue::Fixed(value) => value.to_be_bytes().to_vec(),
            SequenceValue::Big(value) => {
                let mut out = [0u8; 32];
                value.to_big_endian(&mut out);
                out.to_vec()
            }
        }
    }

    pub fn decode_fixed(bytes: &[u8]) -> ChallengeResult<Self> {
        let array: [u8; 8] = bytes.try_into().map_err(|_| ChallengeError::Codec {
            reason: format!("fixed sequence value has {} bytes", bytes.len()),
        })?;
        Ok(SequenceValue::Fixed(u64::from_be_bytes(array)))
    }

    pub fn decode_big(bytes: &[u8]) -> ChallengeResult<Self> {
        if bytes.len() != 32 {
            return Err(ChallengeError::Codec {
                reason: format!("big sequence value has {} bytes", bytes.len()),
            });
        }
        Ok(SequenceValue::Big(U256::from_big_endian(bytes)))
    }
}

/// Counter interface shared by both encodings.
pub trait Sequence {
    type Value: Copy;

    fn key(&self) -> &[u8];

    /// Last value handed out, zero if none.
    fn current<KV: KeyValueStore + ?Sized>(
        &self,
        store: &ChallengeStore<'_, KV>,
    ) -> ChallengeResult<Self::Value>;

    /// Value the next call to `next` will return, without consuming it.
    fn peek_next<KV: KeyValueStore + ?Sized>(
        &self,
        store: &ChallengeStore<'_, KV>,
    ) -> ChallengeResult<Self::Value>;

    /// Advance the counter and return the new value.
    fn next<KV: KeyValueStore + ?Sized>(
        &self,
        store: &mut ChallengeStore<'_, KV>,
    ) -> ChallengeResult<Self::Value>;

    /// Seed the counter once, e.g. from genesis. Fails if already set.
    fn init_once<KV: KeyValueStore + ?Sized>(
        &self,
        store: &mut ChallengeStore<'_, KV>,
        initial: Self::Value,
    ) -> ChallengeResult<()>;
}

fn ensure_unset<KV: KeyValueStore + ?Sized>(
    store: &ChallengeStore<'_, KV>,
    key: &[u8],
) -> ChallengeResult<()> {
    if store.get(key)?.is_some() {
        return Err(ChallengeError::SequenceAlreadyInitialised { key: key.to_vec() });
    }
    Ok(())
}

/// 64-bit counter, used for challenge ids.
#[derive(Clone, Debug)]
pub struct U64Sequence {
    key: Vec<u8>,
}

impl U64Sequence {
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }
}

impl Sequence for U64Sequence {
    type Value = u64;

    fn key(&self) -> &[u8] {
        &self.key
    }

    fn current<KV: KeyValueStore + ?Sized>(
        &self,
        store: &ChallengeStore<'_, KV>,
    ) -> ChallengeResult<u64> {
        match store.get(&self.key)? {
            None => Ok(0),
            Some(bytes) => match SequenceValue::decode_fixed(&bytes)? {
                SequenceValue::Fixed(value) => Ok(value),
                SequenceValue::Big(_) => Err(ChallengeError::corruption("u64 sequence")),
            },
        }
    }

    fn peek_next<KV: KeyValueStore + ?Sized>(
        &self,
        store: &ChallengeStore<'_, KV>,
    ) -> ChallengeResult<u64> {
        self.current(store)?
            .checked_add(1)
            .ok_or_else(|| ChallengeError::SequenceOverflow {
                key: self.key.clone(),
            })
    }

    fn next<KV: KeyValueStore + ?Sized>(
        &self,
        store: &mut ChallengeStore<'_, KV>,
    ) -> ChallengeResult<u64> {
        let value = self.peek_next(store)?;
        store.put(self.key.clone(), SequenceValue::Fixed(value).encode());
        Ok(value)
    }

    fn init_once<KV: KeyValueStore + ?Sized>(
        &self,
        store: &mut ChallengeStore<'_, KV>,
        initial: u64,
    ) -> ChallengeResult<()> {
        ensure_unset(store, &self.key)?;
        store.put(self.key.clone(), SequenceValue::Fixed(initial).encode());
        Ok(())
    }
}

/// 256-bit counter, used for catalog object ids.
#[derive(Clone, Debug)]
pub struct U256Sequence {
    key: Vec<u8>,
}

impl U256Sequence {
    pub fn new(key: &[u8]) -> Self {
        Self { key: key.to_vec() }
    }
}

impl Sequence for U256Sequence {
    type Value = U256;

    fn key(&self) -> &[u8] {
        &self.key
    }

    fn current<KV: KeyValueStore + ?Sized>(
        &self,
        store: &ChallengeStore<'_, KV>,
    ) -> ChallengeResult<U256> {
        match store.get(&self.key)? {
            None => Ok(U256::zero()),
            Some(bytes) => match SequenceValue::decode_big(&bytes)? {
                SequenceValue::Big(value) => Ok(value),
                SequenceValue::Fixed(_) => Err(ChallengeError::corruption("u256 sequence")),
            },
        }
    }

    fn peek_next<KV: KeyValueStore + ?Sized>(
        &self,
        store: &ChallengeStore<'_, KV>,
    ) -> ChallengeResult<U256> {
        self.current(store)?
            .checked_add(U256::one())
            .ok_or_else(|| ChallengeError::SequenceOverflow {
                key: self.key.clone(),
            })
    }

    fn next<KV: KeyValueStore + ?Sized>(
        &self,
        store: &mut ChallengeStore<'_, KV>,
    ) -> ChallengeResult<U256> {
        let value = self.peek_next(store)?;
        store.put(self.key.clone(), SequenceValue::Big(value).encode());
        Ok(value)
    }

    fn init_once<KV: KeyValueStore + ?Sized>(
        &self,
        store: &mut ChallengeStore<'_, KV>,
        initial: U256,
    ) -> ChallengeResult<()> {
        ensure_unset(store, &self.key)?;
        store.put(self.key.clone(), SequenceValue::Big(initial).encode());
        Ok(())
    }
}
