//! Domain module for the storage challenge subsystem
//!
//! Pure logic only: nothing here touches the store.
//!
//! ## Modules
//! - challenge: challenge, target, attested record, slash marker
//! - context: block context and sampling seeds
//! - params: governance parameters
//! - selector: seed -> segment / replica / object coordinates
//! - scheduler: in-turn heartbeat submitter
//! - vote: participation bitset and signed digests
//! - bls: supermajority aggregate verification
//! - slashing: slash sizing and reward split
//! - validator: validator snapshot

pub mod bls;
pub mod challenge;
pub mod context;
pub mod params;
pub mod scheduler;
pub mod selector;
pub mod slashing;
pub mod validator;
pub mod vote;

pub use bls::{aggregate_signatures, required_votes, verify_vote, DST};
pub use challenge::{
    AttestedChallenge, Challenge, ChallengeId, ChallengeOrigin, ChallengeTarget, ObjectTarget,
    OpenChallenge, RecentSlash, RedundancyIndex, SegmentIndex, VoteResult,
};
pub use context::{BlockContext, Seed};
pub use params::{Params, BPS_DENOMINATOR};
pub use scheduler::{in_turn_window, InTurnWindow};
pub use slashing::{RewardShare, SlashOrder};
pub use validator::{ValidatorInfo, ValidatorSnapshot};
pub use vote::{attestation_digest, heartbeat_digest, VoteBitset};
