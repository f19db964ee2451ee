//! # Target Selector
//!
//! Pure mapping from a seed and cardinalities to challenge coordinates.
//!
//! ```text
//! digest          = Keccak512(seed)
//! segment_index   = U256(digest[0..32])  mod S
//! replica_slot    = U256(digest[32..64]) mod R      (0 = primary)
//! ```
//!
//! Deterministic for a given seed. The seed must come from block entropy,
//! never from user input: a caller choosing the seed chooses the target.

use super::challenge::{RedundancyIndex, SegmentIndex};
use super::context::Seed;
use crate::error::{ChallengeError, ChallengeResult};
use sha3::{Digest, Keccak512};
use shared_types::{ObjectId, U256};

fn seed_digest(seed: &Seed) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(&Keccak512::digest(seed.as_bytes()));
    out
}

fn reduce(bytes: &[u8], modulus: u64) -> u64 {
    (U256::from_big_endian(bytes) % U256::from(modulus)).low_u64()
}

/// Number of segments for a payload: `ceil(payload_size / segment_size)`.
pub fn segment_count(payload_size: u64, segment_size: u64) -> ChallengeResult<u64> {
    if segment_size == 0 {
        return Err(ChallengeError::ZeroCardinality {
            what: "segment size",
        });
    }
    Ok(payload_size.div_ceil(segment_size))
}

/// Segment index in `[0, segments)`.
pub fn random_segment_index(seed: &Seed, segments: u64) -> ChallengeResult<SegmentIndex> {
    if segments == 0 {
        return Err(ChallengeError::ZeroCardinality { what: "segments" });
    }
    let digest = seed_digest(seed);
    let index = reduce(&digest[..32], segments);
    SegmentIndex::try_from(index).map_err(|_| ChallengeError::InvalidSegmentIndex {
        index: SegmentIndex::MAX,
        segments,
    })
}

/// 0-based replica slot in `[0, replicas)`; slot 0 is the primary.
pub fn random_replica_slot(seed: &Seed, replicas: u64) -> ChallengeResult<u32> {
    if replicas == 0 {
        return Err(ChallengeError::ZeroCardinality { what: "replicas" });
    }
    let digest = seed_digest(seed);
    // replicas is a list length, the residue always fits
    Ok(reduce(&digest[32..], replicas) as u32)
}

/// Redundancy index for a random draw over `replicas` (primary + secondaries).
pub fn random_redundancy_index(seed: &Seed, replicas: u64) -> ChallengeResult<RedundancyIndex> {
    random_replica_slot(seed, replicas).map(RedundancyIndex::from_slot)
}

/// Starting point for a random walk over catalog ids `1..=total`.
pub fn random_object_id(seed: &Seed, total: U256) -> ChallengeResult<ObjectId> {
    if total.is_zero() {
        return Err(ChallengeError::ZeroCardinality { what: "objects" });
    }
    let digest = seed_digest(seed);
    let offset = U256::from_big_endian(&digest[..32]) % total;
    Ok(ObjectId(offset + U256::one()))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seed(n: u8) -> Seed {
        Seed::from_parts(&[&[n]])
    }

    #[test]
    fn test_segment_count_rounds_up() {
        assert_eq!(segment_count(500, 10_000).unwrap(), 1);
        assert_eq!(segment_count(20_000, 10_000).unwrap(), 2);
        assert_eq!(segment_count(20_001, 10_000).unwrap(), 3);
        assert_eq!(segment_count(0, 10_000).unwrap(), 0);
    }

    #[test]
    fn test_single_segment_always_zero() {
        let segments = segment_count(500, 10_000).unwrap();
        for n in 0..32 {
            assert_eq!(random_segment_index(&seed(n), segments).unwrap(), 0);
        }
    }

    #[test]
    fn test_indices_stay_in_range_and_are_deterministic() {
        for n in 0..64 {
            let s = seed(n);
            let index = random_segment_index(&s, 7).unwrap();
            assert!(index < 7);
            assert_eq!(index, random_segment_index(&s, 7).unwrap());

            let slot = random_replica_slot(&s, 4).unwrap();
            assert!(slot < 4);
            let redundancy = random_redundancy_index(&s, 4).unwrap();
            assert!((-1..3).contains(&redundancy.0));
        }
    }

    #[test]
    fn test_zero_cardinality_fails_fast() {
        assert!(matches!(
            random_segment_index(&seed(1), 0),
            Err(ChallengeError::ZeroCardinality { .. })
        ));
        assert!(matches!(
            random_replica_slot(&seed(1), 0),
            Err(ChallengeError::ZeroCardinality { .. })
        ));
        assert!(random_object_id(&seed(1), U256::zero()).is_err());
        assert!(segment_count(10, 0).is_err());
    }

    #[test]
    fn test_random_object_id_within_catalog() {
        let total = U256::from(5u64);
        for n in 0..32 {
            let id = random_object_id(&seed(n), total).unwrap();
            assert!(id.0 >= U256::one() && id.0 <= total);
        }
    }
}
