//! # BLS Attestation Verifier (BLS12-381)
//!
//! Checks that a supermajority of a validator snapshot signed one digest.
//!
//! ## Implementation Details
//!
//! - Public keys are on G1 (48 bytes compressed)
//! - Signatures are on G2 (96 bytes compressed)
//!
//! This uses blst's `min_pk` variant, matching the keys the staking registry
//! records for validators.
//!
//! ## Algorithm
//!
//! 1. Reject a bitset whose highest bit lies outside the snapshot
//! 2. Decode the public key of every participant
//! 3. Require `participants > floor(2/3 * N)`
//! 4. Fast-aggregate-verify the digest against the aggregate signature

use super::validator::ValidatorSnapshot;
use super::vote::VoteBitset;
use crate::error::{ChallengeError, ChallengeResult};
use blst::min_pk::{AggregateSignature, PublicKey, Signature};
use blst::BLST_ERROR;
use shared_types::{Address, Hash};
use tracing::debug;

/// Domain Separation Tag for BLS signatures (proof-of-possession scheme)
pub const DST: &[u8] = b"BLS_SIG_BLS12381G2_XMD:SHA-256_SSWU_RO_POP_";

/// Smallest participant count that is strictly more than two thirds of `total`.
pub fn required_votes(total: usize) -> usize {
    total * 2 / 3 + 1
}

/// Verify a vote and return the challenger addresses of the participants,
/// in snapshot order.
///
/// Pure: reads nothing but its arguments.
pub fn verify_vote(
    snapshot: &ValidatorSnapshot,
    bitset: &VoteBitset,
    digest: &Hash,
    aggregate_signature: &[u8],
) -> ChallengeResult<Vec<Address>> {
    if snapshot.is_empty() {
        return Err(ChallengeError::EmptyValidatorSet {
            height: snapshot.height,
        });
    }

    if let Some(highest) = bitset.highest() {
        if highest >= snapshot.len() {
            return Err(ChallengeError::BitsetOutOfRange {
                highest,
                size: snapshot.len(),
            });
        }
    }

    let mut public_keys = Vec::with_capacity(bitset.count());
    let mut participants = Vec::with_capacity(bitset.count());
    for index in bitset.indices() {
        let validator = snapshot
            .get(index)
            .ok_or(ChallengeError::BitsetOutOfRange {
                highest: index,
                size: snapshot.len(),
            })?;
        let public_key = PublicKey::key_validate(&validator.bls_public_key)
            .map_err(|_| ChallengeError::InvalidBlsPublicKey { index })?;
        public_keys.push(public_key);
        participants.push(validator.challenger_address);
    }

    let need = required_votes(snapshot.len());
    if public_keys.len() < need {
        return Err(ChallengeError::NotEnoughVotes {
            have: public_keys.len(),
            need,
        });
    }

    let signature =
        Signature::from_bytes(aggregate_signature).map_err(|_| ChallengeError::InvalidBlsSignature)?;

    let key_refs: Vec<&PublicKey> = public_keys.iter().collect();
    let result = signature.fast_aggregate_verify(true, digest, DST, &key_refs);
    if result != BLST_ERROR::BLST_SUCCESS {
        return Err(ChallengeError::AggregateVerificationFailed);
    }

    debug!(
        participants = participants.len(),
        validators = snapshot.len(),
        "vote verified"
    );
    Ok(participants)
}

/// Aggregate individual signatures into one, as a relayer does before
/// submitting a vote.
pub fn aggregate_signatures(signatures: &[Vec<u8>]) -> ChallengeResult<Vec<u8>> {
    if signatures.is_empty() {
        return Err(ChallengeError::InvalidBlsSignature);
    }

    let parsed: Vec<Signature> = signatures
        .iter()
        .map(|bytes| Signature::from_bytes(bytes).map_err(|_| ChallengeError::InvalidBlsSignature))
        .collect::<ChallengeResult<_>>()?;
    let refs: Vec<&Signature> = parsed.iter().collect();

    let aggregate = AggregateSignature::aggregate(&refs, true)
        .map_err(|_| ChallengeError::InvalidBlsSignature)?;
    Ok(aggregate.to_signature().to_bytes().to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::validator::ValidatorInfo;
    use blst::min_pk::SecretKey;

    fn generate_keypair() -> (SecretKey, Vec<u8>) {
        let mut ikm = [0u8; 32];
        rand::RngCore::fill_bytes(&mut rand::thread_rng(), &mut ikm);
        let sk = SecretKey::key_gen(&ikm, &[]).unwrap();
        let pk = sk.sk_to_pk().to_bytes().to_vec();
        (sk, pk)
    }

    fn snapshot_of(size: usize) -> (Vec<SecretKey>, ValidatorSnapshot) {
        let mut secrets = Vec::new();
        let mut validators = Vec::new();
        for i in 0..size {
            let (sk, pk) = generate_keypair();
            secrets.push(sk);
            validators.push(ValidatorInfo {
                bls_public_key: pk,
                challenger_address: Address([i as u8 + 1; 20]),
            });
        }
        (secrets, ValidatorSnapshot::new(10, validators))
    }

    fn sign_with(secrets: &[SecretKey], indices: &[usize], digest: &Hash) -> Vec<u8> {
        let signatures: Vec<Vec<u8>> = indices
            .iter()
            .map(|&i| secrets[i].sign(digest, DST, &[]).to_bytes().to_vec())
            .collect();
        aggregate_signatures(&signatures).unwrap()
    }

    #[test]
    fn test_required_votes() {
        assert_eq!(required_votes(1), 1);
        assert_eq!(required_votes(3), 3);
        assert_eq!(required_votes(4), 3);
        assert_eq!(required_votes(6), 5);
    }

    #[test]
    fn test_single_validator_vote() {
        let (secrets, snapshot) = snapshot_of(1);
        let digest = [9u8; 32];
        let signature = sign_with(&secrets, &[0], &digest);

        let participants =
            verify_vote(&snapshot, &VoteBitset::from_indices(&[0]), &digest, &signature).unwrap();
        assert_eq!(participants, vec![Address([1; 20])]);
    }

    #[test]
    fn test_exact_two_thirds_is_not_enough() {
        let (secrets, snapshot) = snapshot_of(6);
        let digest = [1u8; 32];

        // floor(2/3 * 6) = 4 must fail
        let four = [0, 1, 2, 3];
        let result = verify_vote(
            &snapshot,
            &VoteBitset::from_indices(&four),
            &digest,
            &sign_with(&secrets, &four, &digest),
        );
        assert!(matches!(result, Err(ChallengeError::NotEnoughVotes { have: 4, need: 5 })));

        // floor(2/3 * 6) + 1 = 5 succeeds
        let five = [0, 1, 2, 3, 5];
        let participants = verify_vote(
            &snapshot,
            &VoteBitset::from_indices(&five),
            &digest,
            &sign_with(&secrets, &five, &digest),
        )
        .unwrap();
        assert_eq!(participants.len(), 5);
    }

    #[test]
    fn test_wrong_digest_fails_verification() {
        let (secrets, snapshot) = snapshot_of(3);
        let all = [0, 1, 2];
        let signature = sign_with(&secrets, &all, &[1u8; 32]);

        let result = verify_vote(&snapshot, &VoteBitset::from_indices(&all), &[2u8; 32], &signature);
        assert!(matches!(result, Err(ChallengeError::AggregateVerificationFailed)));
    }

    #[test]
    fn test_signature_from_non_participant_fails() {
        let (secrets, snapshot) = snapshot_of(3);
        let digest = [3u8; 32];
        // Claims 0,1,2 but validator 2 never signed; 1 signed twice instead
        let signature = sign_with(&secrets, &[0, 1, 1], &digest);

        let result = verify_vote(&snapshot, &VoteBitset::from_indices(&[0, 1, 2]), &digest, &signature);
        assert!(matches!(result, Err(ChallengeError::AggregateVerificationFailed)));
    }

    #[test]
    fn test_bitset_beyond_snapshot() {
        let (_, snapshot) = snapshot_of(2);
        let result = verify_vote(&snapshot, &VoteBitset::from_indices(&[0, 5]), &[0u8; 32], &[0u8; 96]);
        assert!(matches!(
            result,
            Err(ChallengeError::BitsetOutOfRange { highest: 5, size: 2 })
        ));
    }

    #[test]
    fn test_undecodable_public_key_is_fatal() {
        let (_, mut snapshot) = snapshot_of(1);
        snapshot.validators[0].bls_public_key = vec![0xFF; 48];

        let err = verify_vote(&snapshot, &VoteBitset::from_indices(&[0]), &[0u8; 32], &[0u8; 96])
            .unwrap_err();
        assert!(matches!(err, ChallengeError::InvalidBlsPublicKey { index: 0 }));
        assert!(err.is_fatal());
    }

    #[test]
    fn test_garbage_signature_is_rejected() {
        let (_, snapshot) = snapshot_of(1);
        let result = verify_vote(&snapshot, &VoteBitset::from_indices(&[0]), &[0u8; 32], &[1, 2, 3]);
        assert!(matches!(result, Err(ChallengeError::InvalidBlsSignature)));
    }

    #[test]
    fn test_aggregate_empty_fails() {
        assert!(aggregate_signatures(&[]).is_err());
    }
}
