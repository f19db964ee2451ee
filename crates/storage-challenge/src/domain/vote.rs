//! Vote bitsets and canonical signed messages
//!
//! Every validator signs the same 32-byte digest; the bitset says which
//! snapshot members took part.
//!
//! ## Signed layout
//!
//! ```text
//! attest    = Keccak256(ATTEST_DOMAIN    ‖ len(chain_id):u32 ‖ chain_id ‖ id:u64
//!                       ‖ object_id:u256 ‖ operator_id:u32 ‖ result:u8 ‖ challenger?)
//! heartbeat = Keccak256(HEARTBEAT_DOMAIN ‖ len(chain_id):u32 ‖ chain_id ‖ id:u64)
//! ```
//!
//! All integers big-endian. `challenger?` is `0x00` when absent, otherwise
//! `0x01 ‖ address`.

use super::challenge::{ChallengeId, VoteResult};
use bitvec::prelude::*;
use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};
use shared_types::{Address, Hash, ObjectId, OperatorId};

const ATTEST_DOMAIN: &[u8] = b"storage-challenge/attest/v1";
const HEARTBEAT_DOMAIN: &[u8] = b"storage-challenge/heartbeat/v1";

/// Participation bitset over a validator snapshot.
///
/// Stored as 64-bit words, bit `i` of the set is bit `i % 64` of word `i / 64`.
#[derive(Clone, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct VoteBitset {
    words: Vec<u64>,
}

impl VoteBitset {
    /// Build a bitset with exactly the given validator indices set.
    pub fn from_indices(indices: &[usize]) -> Self {
        let len = indices.iter().max().map(|max| max + 1).unwrap_or(0);
        let mut bits: BitVec<u64, Lsb0> = bitvec![u64, Lsb0; 0; len];
        for &index in indices {
            bits.set(index, true);
        }
        Self {
            words: bits.into_vec(),
        }
    }

    fn bits(&self) -> &BitSlice<u64, Lsb0> {
        self.words.view_bits::<Lsb0>()
    }

    /// Indices of participating validators, ascending.
    pub fn indices(&self) -> Vec<usize> {
        self.bits().iter_ones().collect()
    }

    pub fn count(&self) -> usize {
        self.bits().count_ones()
    }

    pub fn highest(&self) -> Option<usize> {
        self.bits().last_one()
    }

    pub fn words(&self) -> &[u64] {
        &self.words
    }

    /// Native byte representation (little-endian words).
    pub fn to_bytes(&self) -> Vec<u8> {
        self.words.iter().flat_map(|w| w.to_le_bytes()).collect()
    }
}

fn prefix(hasher: &mut Keccak256, domain: &[u8], chain_id: &str) {
    hasher.update(domain);
    hasher.update((chain_id.len() as u32).to_be_bytes());
    hasher.update(chain_id.as_bytes());
}

/// Digest validators sign to attest an object challenge.
pub fn attestation_digest(
    chain_id: &str,
    challenge_id: ChallengeId,
    object_id: &ObjectId,
    operator_id: OperatorId,
    result: VoteResult,
    challenger: Option<&Address>,
) -> Hash {
    let mut hasher = Keccak256::new();
    prefix(&mut hasher, ATTEST_DOMAIN, chain_id);
    hasher.update(challenge_id.to_be_bytes());
    hasher.update(object_id.to_be_bytes());
    hasher.update(operator_id.to_be_bytes());
    hasher.update([result.as_byte()]);
    match challenger {
        Some(address) => {
            hasher.update([1u8]);
            hasher.update(address.as_bytes());
        }
        None => hasher.update([0u8]),
    }
    hasher.finalize().into()
}

/// Digest validators sign to attest a heartbeat challenge.
pub fn heartbeat_digest(chain_id: &str, challenge_id: ChallengeId) -> Hash {
    let mut hasher = Keccak256::new();
    prefix(&mut hasher, HEARTBEAT_DOMAIN, chain_id);
    hasher.update(challenge_id.to_be_bytes());
    hasher.finalize().into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bitset_indices() {
        let bitset = VoteBitset::from_indices(&[0, 3, 64, 70]);
        assert_eq!(bitset.indices(), vec![0, 3, 64, 70]);
        assert_eq!(bitset.count(), 4);
        assert_eq!(bitset.highest(), Some(70));
        assert_eq!(bitset.words().len(), 2);
        assert_eq!(bitset.words()[0], 0b1001);
    }

    #[test]
    fn test_empty_bitset() {
        let bitset = VoteBitset::default();
        assert_eq!(bitset.count(), 0);
        assert_eq!(bitset.highest(), None);
        assert!(bitset.to_bytes().is_empty());
    }

    #[test]
    fn test_digest_binds_every_field() {
        let object = ObjectId::from(5);
        let challenger = Address([7; 20]);
        let base = attestation_digest("chain-1", 1, &object, 2, VoteResult::Failed, Some(&challenger));

        assert_ne!(base, attestation_digest("chain-2", 1, &object, 2, VoteResult::Failed, Some(&challenger)));
        assert_ne!(base, attestation_digest("chain-1", 2, &object, 2, VoteResult::Failed, Some(&challenger)));
        assert_ne!(base, attestation_digest("chain-1", 1, &ObjectId::from(6), 2, VoteResult::Failed, Some(&challenger)));
        assert_ne!(base, attestation_digest("chain-1", 1, &object, 3, VoteResult::Failed, Some(&challenger)));
        assert_ne!(base, attestation_digest("chain-1", 1, &object, 2, VoteResult::Succeed, Some(&challenger)));
        assert_ne!(base, attestation_digest("chain-1", 1, &object, 2, VoteResult::Failed, None));
    }

    #[test]
    fn test_heartbeat_digest_is_domain_separated() {
        let object = ObjectId::from(0);
        assert_ne!(
            heartbeat_digest("chain-1", 1_000),
            attestation_digest("chain-1", 1_000, &object, 0, VoteResult::Succeed, None)
        );
    }
}
