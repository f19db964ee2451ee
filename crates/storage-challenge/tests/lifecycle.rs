//! Multi-block lifecycle and property tests against the public API.

use blst::min_pk::SecretKey;
use proptest::prelude::*;
use shared_types::{Address, InMemoryKVStore, ObjectId, OperatorId};
use std::collections::BTreeSet;
use std::sync::Arc;
use storage_challenge::adapters::{
    MemoryObjectCatalog, MemoryOperatorRegistry, MemoryRewardPool, MemoryValidatorRegistry,
};
use storage_challenge::domain::selector::random_segment_index;
use storage_challenge::domain::{
    aggregate_signatures, attestation_digest, heartbeat_digest, in_turn_window, Seed,
    ValidatorInfo, DST,
};
use storage_challenge::ports::{MsgAttest, MsgHeartbeat, PageRequest};
use storage_challenge::state::{AttestedRing, ChallengeStore};
use storage_challenge::{
    AttestedChallenge, BlockContext, ChallengeConfig, ChallengeEvent, ChallengeMsgServer,
    ChallengeQueries, ChallengeService, ChallengeTarget, GenesisState, Params, RedundancyIndex,
    VoteBitset, VoteResult,
};

const BUCKET: &str = "archive";
const VALIDATOR: Address = Address([0xB0; 20]);

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn ctx(height: u64) -> BlockContext {
    BlockContext::new(height, 5_000 + height * 6, [height as u8; 32])
}

// =============================================================================
// Simulation
// =============================================================================

#[test]
fn simulated_blocks_keep_ledger_invariants() {
    init_tracing();

    let params = Params {
        challenge_count_per_block: 2,
        challenge_keep_alive_period: 3,
        slash_cooling_off_period: 5,
        slash_amount_per_byte: 1,
        slash_amount_min: 10,
        slash_amount_max: 1_000,
        sp_slash_max_amount: 2_500,
        sp_slash_counting_window: 10,
        heartbeat_interval: 7,
        attestation_kept_count: 5,
        ..Params::default()
    };
    let config = ChallengeConfig::default();

    let operators = Arc::new(MemoryOperatorRegistry::new());
    for id in 1..=3 as OperatorId {
        operators.register(id, Address([0x50 + id as u8; 20]));
    }
    let catalog = Arc::new(MemoryObjectCatalog::new(256));
    catalog.create_bucket(BUCKET, 1);
    for i in 0..6u64 {
        catalog
            .create_sealed_object(BUCKET, &format!("obj-{}", i), 100 + i * 300, vec![2, 3])
            .unwrap();
    }

    let secret = SecretKey::key_gen(&[7u8; 32], &[]).unwrap();
    let validators = Arc::new(MemoryValidatorRegistry::new());
    validators.record(
        0,
        vec![ValidatorInfo {
            bls_public_key: secret.sk_to_pk().to_bytes().to_vec(),
            challenger_address: VALIDATOR,
        }],
    );
    let rewards = Arc::new(MemoryRewardPool::new(config.reward_pool, 10_000_000));

    let mut service = ChallengeService::new(
        config,
        InMemoryKVStore::new(),
        operators.clone(),
        catalog,
        validators,
        rewards.clone(),
    );
    service
        .init_genesis(&GenesisState {
            params: params.clone(),
            ..Default::default()
        })
        .unwrap();

    let chain_id = service.config().chain_id.clone();
    let sign = |digest: &[u8; 32]| {
        aggregate_signatures(&[secret.sign(digest, DST, &[]).to_bytes().to_vec()]).unwrap()
    };

    let mut last_started = 0;
    let mut heartbeats = 0;
    for height in 1..=40 {
        let block = ctx(height);

        if height % 2 == 0 {
            let open = service.challenges(&PageRequest::default()).unwrap().items;
            for challenge in open {
                if challenge.challenge.is_expired_at(height) {
                    continue;
                }
                let id = challenge.challenge.id;
                match challenge.target {
                    ChallengeTarget::Heartbeat => {
                        let msg = MsgHeartbeat {
                            submitter: VALIDATOR,
                            challenge_id: id,
                            vote_validator_set: VoteBitset::from_indices(&[0]),
                            vote_agg_signature: sign(&heartbeat_digest(&chain_id, id)),
                        };
                        service.heartbeat(&block, msg).unwrap();
                        heartbeats += 1;
                    }
                    ChallengeTarget::Object(target) => {
                        let result = if id % 3 == 0 {
                            VoteResult::Failed
                        } else {
                            VoteResult::Succeed
                        };
                        let digest = attestation_digest(
                            &chain_id,
                            id,
                            &target.object_id,
                            target.operator_id,
                            result,
                            target.challenger.as_ref(),
                        );
                        let msg = MsgAttest {
                            submitter: VALIDATOR,
                            challenge_id: id,
                            object_id: target.object_id,
                            operator_id: target.operator_id,
                            vote_result: result,
                            challenger_address: target.challenger,
                            vote_validator_set: VoteBitset::from_indices(&[0]),
                            vote_agg_signature: sign(&digest),
                        };
                        service.attest(&block, msg).unwrap();
                    }
                }
            }
        }

        service.end_block(&block).unwrap();

        for open in service.challenges(&PageRequest::default()).unwrap().items {
            assert!(open.challenge.expired_height > height);
        }
        for event in service.drain_events() {
            match event {
                ChallengeEvent::Started {
                    challenge_id,
                    object_id,
                    operator_id,
                    ..
                } => {
                    assert!(challenge_id > last_started);
                    last_started = challenge_id;
                    assert_ne!(challenge_id % params.heartbeat_interval, 0);
                    if let Some(marker) = service.recent_slash(operator_id, &object_id).unwrap() {
                        assert!(!marker.is_active(height, params.slash_cooling_off_period));
                    }
                }
                ChallengeEvent::HeartbeatScheduled { challenge_id, .. } => {
                    assert_eq!(challenge_id % params.heartbeat_interval, 0);
                }
                _ => {}
            }
        }
        for operator_id in 1..=3 {
            assert!(service.sp_slash_amount(operator_id).unwrap() <= params.sp_slash_max_amount);
        }
        let kept = service.latest_attested_challenges().unwrap().len() as u64;
        assert!(kept <= params.attestation_kept_count);
    }

    assert!(last_started > 0);
    assert!(heartbeats > 0);
    assert!(!operators.slashes().is_empty());
    assert!(rewards.balance(&VALIDATOR) > 0);
}

// =============================================================================
// Properties
// =============================================================================

fn attested(id: u64) -> AttestedChallenge {
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

fn ids(items: &[AttestedChallenge]) -> Vec<u64> {
    items.iter().map(|item| item.id).collect()
}

proptest! {
    #[test]
    fn ring_keeps_newest_items_in_order(capacity in 0u64..8, count in 0u64..30, resized in 0u64..8) {
        let store = InMemoryKVStore::new();
        let mut overlay = ChallengeStore::new(&store);
        AttestedRing::resize(&mut overlay, capacity).unwrap();
        for id in 1..=count {
            AttestedRing::enqueue(&mut overlay, &attested(id)).unwrap();
        }

        let kept = count.min(capacity);
        let expected: Vec<u64> = (count - kept + 1..=count).collect();
        prop_assert_eq!(ids(&AttestedRing::retrieve_all(&overlay).unwrap()), expected.clone());

        AttestedRing::resize(&mut overlay, resized).unwrap();
        let kept_after = kept.min(resized);
        let expected_after: Vec<u64> = expected[(kept - kept_after) as usize..].to_vec();
        prop_assert_eq!(ids(&AttestedRing::retrieve_all(&overlay).unwrap()), expected_after);
    }

    #[test]
    fn segment_index_stays_in_range(bytes in proptest::collection::vec(any::<u8>(), 1..64), segments in 1u64..10_000) {
        let seed = Seed::from_parts(&[bytes.as_slice()]);
        let index = random_segment_index(&seed, segments).unwrap();
        prop_assert!(u64::from(index) < segments);
    }

    #[test]
    fn in_turn_window_contains_now(now in 0u64..10_000_000, interval in 1u64..1_000, validators in 1usize..200) {
        let window = in_turn_window(now, interval, validators).unwrap();
        prop_assert!(window.contains(now));
        prop_assert!(window.index < validators);
        prop_assert_eq!(window.end - window.start, interval);
    }
}

#[test]
fn distinct_seeds_spread_over_segments() {
    let hits: BTreeSet<u32> = (0u64..200)
        .map(|i| random_segment_index(&Seed::from_parts(&[i.to_be_bytes().as_slice()]), 8).unwrap())
        .collect();
    assert_eq!(hits.len(), 8);
}
