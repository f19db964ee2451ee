//! Challenge ledger
//!
//! Typed access to every record the subsystem owns. All reads and writes go
//! through the overlay, so a caller that aborts simply drops it.

use super::keys;
use super::sequence::{Sequence, U64Sequence};
use super::store::ChallengeStore;
use crate::domain::{
    Challenge, ChallengeId, ChallengeTarget, OpenChallenge, Params, RecentSlash,
};
use crate::error::{ChallengeError, ChallengeResult};
use shared_types::{BlockHeight, KeyValueStore, ObjectId, OperatorId};

/// The challenge-id counter.
pub fn challenge_ids() -> U64Sequence {
    U64Sequence::new(keys::CHALLENGE_ID_SEQUENCE_KEY)
}

impl<'a, KV: KeyValueStore + ?Sized> ChallengeStore<'a, KV> {
    // =========================================================================
    // Params
    // =========================================================================

    pub fn params(&self) -> ChallengeResult<Params> {
        match self.get(keys::PARAMS_KEY)? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Err(ChallengeError::corruption("params not initialised")),
        }
    }

    pub fn set_params(&mut self, params: &Params) -> ChallengeResult<()> {
        self.put(keys::PARAMS_KEY.to_vec(), bincode::serialize(params)?);
        Ok(())
    }

    // =========================================================================
    // Open challenges
    // =========================================================================

    pub fn challenge(&self, id: ChallengeId) -> ChallengeResult<Option<Challenge>> {
        match self.get(&keys::challenge_key(id))? {
            Some(bytes) => Ok(Some(Challenge::new(id, keys::decode_u64(&bytes)?))),
            None => Ok(None),
        }
    }

    /// Challenge plus target. A challenge without a target is corruption.
    pub fn open_challenge(&self, id: ChallengeId) -> ChallengeResult<Option<OpenChallenge>> {
        let Some(challenge) = self.challenge(id)? else {
            return Ok(None);
        };
        let target = self.challenge_target(id)?;
        Ok(Some(OpenChallenge { challenge, target }))
    }

    fn challenge_target(&self, id: ChallengeId) -> ChallengeResult<ChallengeTarget> {
        match self.get(&keys::challenge_target_key(id))? {
            Some(bytes) => Ok(bincode::deserialize(&bytes)?),
            None => Err(ChallengeError::corruption(format!(
                "challenge {} has no target record",
                id
            ))),
        }
    }

    pub fn insert_challenge(
        &mut self,
        challenge: Challenge,
        target: &ChallengeTarget,
    ) -> ChallengeResult<()> {
        self.put(
            keys::challenge_key(challenge.id),
            challenge.expired_height.to_be_bytes().to_vec(),
        );
        self.put(
            keys::challenge_target_key(challenge.id),
            bincode::serialize(target)?,
        );
        self.put(
            keys::expiry_index_key(challenge.expired_height, challenge.id),
            Vec::new(),
        );
        Ok(())
    }

    pub fn remove_challenge(&mut self, challenge: &Challenge) {
        self.delete(keys::challenge_key(challenge.id));
        self.delete(keys::challenge_target_key(challenge.id));
        self.delete(keys::expiry_index_key(challenge.expired_height, challenge.id));
    }

    /// All open challenges in id order.
    pub fn open_challenges(&self) -> ChallengeResult<Vec<OpenChallenge>> {
        self.scan(keys::CHALLENGE_PREFIX)?
            .into_iter()
            .map(|(key, value)| {
                let id = keys::decode_challenge_key(&key)?;
                let challenge = Challenge::new(id, keys::decode_u64(&value)?);
                let target = self.challenge_target(id)?;
                Ok(OpenChallenge { challenge, target })
            })
            .collect()
    }

    /// Challenges with `expired_height <= height`, earliest first.
    ///
    /// An index entry pointing at a missing or disagreeing challenge record is
    /// corruption.
    pub fn expired_challenges(&self, height: BlockHeight) -> ChallengeResult<Vec<Challenge>> {
        let mut expired = Vec::new();
        for (key, _) in self.scan(keys::EXPIRY_INDEX_PREFIX)? {
            let (expired_height, id) = keys::decode_expiry_index_key(&key)?;
            if expired_height > height {
                break;
            }
            match self.challenge(id)? {
                Some(challenge) if challenge.expired_height == expired_height => {
                    expired.push(challenge)
                }
                _ => {
                    return Err(ChallengeError::corruption(format!(
                        "expiry index entry ({}, {}) has no matching challenge",
                        expired_height, id
                    )))
                }
            }
        }
        Ok(expired)
    }

    // =========================================================================
    // Recent slashes
    // =========================================================================

    pub fn recent_slash(
        &self,
        operator_id: OperatorId,
        object_id: &ObjectId,
    ) -> ChallengeResult<Option<RecentSlash>> {
        match self.get(&keys::recent_slash_key(operator_id, object_id))? {
            Some(bytes) => Ok(Some(RecentSlash {
                operator_id,
                object_id: *object_id,
                height: keys::decode_u64(&bytes)?,
            })),
            None => Ok(None),
        }
    }

    pub fn set_recent_slash(&mut self, slash: &RecentSlash) {
        self.put(
            keys::recent_slash_key(slash.operator_id, &slash.object_id),
            slash.height.to_be_bytes().to_vec(),
        );
    }

    pub fn remove_recent_slash(&mut self, slash: &RecentSlash) {
        self.delete(keys::recent_slash_key(slash.operator_id, &slash.object_id));
    }

    pub fn recent_slashes(&self) -> ChallengeResult<Vec<RecentSlash>> {
        self.scan(keys::RECENT_SLASH_PREFIX)?
            .into_iter()
            .map(|(key, value)| {
                let (operator_id, object_id) = keys::decode_recent_slash_key(&key)?;
                Ok(RecentSlash {
                    operator_id,
                    object_id,
                    height: keys::decode_u64(&value)?,
                })
            })
            .collect()
    }

    // =========================================================================
    // Per-operator slash accumulator
    // =========================================================================

    pub fn sp_slash_amount(&self, operator_id: OperatorId) -> ChallengeResult<u128> {
        match self.get(&keys::sp_slash_amount_key(operator_id))? {
            Some(bytes) => keys::decode_u128(&bytes),
            None => Ok(0),
        }
    }

    pub fn set_sp_slash_amount(&mut self, operator_id: OperatorId, amount: u128) {
        self.put(
            keys::sp_slash_amount_key(operator_id),
            amount.to_be_bytes().to_vec(),
        );
    }

    /// Drop every accumulator; returns how many were cleared.
    pub fn clear_sp_slash_amounts(&mut self) -> ChallengeResult<usize> {
        let entries = self.scan(keys::SP_SLASH_AMOUNT_PREFIX)?;
        let cleared = entries.len();
        for (key, _) in entries {
            keys::decode_sp_slash_amount_key(&key)?;
            self.delete(key);
        }
        Ok(cleared)
    }

    // =========================================================================
    // Counters
    // =========================================================================

    pub fn latest_attested_id(&self) -> ChallengeResult<u64> {
        match self.get(keys::LATEST_ATTESTED_ID_KEY)? {
            Some(bytes) => keys::decode_u64(&bytes),
            None => Ok(0),
        }
    }

    pub fn set_latest_attested_id(&mut self, id: ChallengeId) {
        self.put(
            keys::LATEST_ATTESTED_ID_KEY.to_vec(),
            id.to_be_bytes().to_vec(),
        );
    }

    pub fn opened_this_block(&self) -> ChallengeResult<u64> {
        match self.get(keys::OPENED_THIS_BLOCK_KEY)? {
            Some(bytes) => keys::decode_u64(&bytes),
            None => Ok(0),
        }
    }

    pub fn set_opened_this_block(&mut self, count: u64) {
        if count == 0 {
            self.delete(keys::OPENED_THIS_BLOCK_KEY.to_vec());
        } else {
            self.put(
                keys::OPENED_THIS_BLOCK_KEY.to_vec(),
                count.to_be_bytes().to_vec(),
            );
        }
    }

    pub fn current_challenge_id(&self) -> ChallengeResult<ChallengeId> {
        challenge_ids().current(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ObjectTarget, RedundancyIndex};
    use shared_types::InMemoryKVStore;

    fn target(object: u64) -> ChallengeTarget {
        ChallengeTarget::Object(ObjectTarget {
            object_id: ObjectId::from(object),
            operator_id: 3,
            segment_index: 0,
            redundancy_index: RedundancyIndex::PRIMARY,
            challenger: None,
        })
    }

    #[test]
    fn test_missing_params_is_fatal() {
        let kv = InMemoryKVStore::new();
        let store = ChallengeStore::new(&kv);
        assert!(store.params().unwrap_err().is_fatal());
    }

    #[test]
    fn test_insert_and_remove_challenge() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        let challenge = Challenge::new(1, 50);
        store.insert_challenge(challenge, &target(9)).unwrap();

        let open = store.open_challenge(1).unwrap().unwrap();
        assert_eq!(open.challenge, challenge);
        assert_eq!(open.target, target(9));

        store.remove_challenge(&challenge);
        assert!(store.open_challenge(1).unwrap().is_none());
        assert!(store.expired_challenges(u64::MAX).unwrap().is_empty());
    }

    #[test]
    fn test_expired_challenges_ordered_by_height() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        store.insert_challenge(Challenge::new(1, 30), &target(1)).unwrap();
        store.insert_challenge(Challenge::new(2, 10), &ChallengeTarget::Heartbeat).unwrap();
        store.insert_challenge(Challenge::new(3, 20), &target(3)).unwrap();

        let ids: Vec<u64> = store
            .expired_challenges(20)
            .unwrap()
            .iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(store.expired_challenges(9).unwrap().is_empty());
    }

    #[test]
    fn test_dangling_expiry_index_is_corruption() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        store.put(keys::expiry_index_key(5, 7), Vec::new());

        let err = store.expired_challenges(5).unwrap_err();
        assert!(matches!(err, ChallengeError::StoreCorruption { .. }));
    }

    #[test]
    fn test_recent_slash_roundtrip_and_scan() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        let slash = RecentSlash {
            operator_id: 2,
            object_id: ObjectId::from(5),
            height: 100,
        };
        store.set_recent_slash(&slash);

        assert_eq!(store.recent_slash(2, &ObjectId::from(5)).unwrap(), Some(slash));
        assert_eq!(store.recent_slash(2, &ObjectId::from(6)).unwrap(), None);
        assert_eq!(store.recent_slashes().unwrap(), vec![slash]);

        store.remove_recent_slash(&slash);
        assert!(store.recent_slashes().unwrap().is_empty());
    }

    #[test]
    fn test_sp_slash_amounts_clear() {
        let kv = InMemoryKVStore::new();
        let mut store = ChallengeStore::new(&kv);
        store.set_sp_slash_amount(1, 500);
        store.set_sp_slash_amount(2, 700);

        assert_eq!(store.sp_slash_amount(1).unwrap(), 500);
        assert_eq!(store.clear_sp_slash_amounts().unwrap(), 2);
        assert_eq!(store.sp_slash_amount(2).unwrap(), 0);
    }
}
