//! Driving Ports (API - Inbound)
//!
//! Command and query surfaces of the challenge subsystem. Every command runs
//! against one `BlockContext` and either commits completely or leaves the
//! store untouched.

use crate::domain::{
    AttestedChallenge, BlockContext, ChallengeId, InTurnWindow, OpenChallenge, Params,
    RecentSlash, SegmentIndex, SlashOrder, VoteBitset, VoteResult,
};
use crate::error::ChallengeResult;
use serde::{Deserialize, Serialize};
use shared_types::{Address, ObjectId, OperatorId};

/// Default page size when a request leaves `limit` at zero.
pub const DEFAULT_PAGE_LIMIT: u64 = 100;

/// How a `Submit` names the operator being challenged.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorRef {
    Id(OperatorId),
    Address(Address),
}

/// Open a challenge against one operator's copy of one object.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgSubmit {
    pub challenger: Address,
    pub operator: OperatorRef,
    pub bucket_name: String,
    pub object_name: String,
    /// Draw the segment from block entropy instead of `segment_index`
    pub random_index: bool,
    pub segment_index: SegmentIndex,
}

/// Close an object challenge with a validator-set verdict.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgAttest {
    pub submitter: Address,
    pub challenge_id: ChallengeId,
    pub object_id: ObjectId,
    pub operator_id: OperatorId,
    pub vote_result: VoteResult,
    /// Challenger recorded on the challenge, rewarded on a failed vote
    pub challenger_address: Option<Address>,
    pub vote_validator_set: VoteBitset,
    pub vote_agg_signature: Vec<u8>,
}

/// Close a heartbeat challenge. Only the in-turn validator may submit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgHeartbeat {
    pub submitter: Address,
    pub challenge_id: ChallengeId,
    pub vote_validator_set: VoteBitset,
    pub vote_agg_signature: Vec<u8>,
}

/// Replace the governance parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsgUpdateParams {
    pub authority: Address,
    pub params: Params,
}

/// Outcome of a committed `Attest`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AttestReceipt {
    pub challenge_id: ChallengeId,
    pub result: VoteResult,
    /// Set when the vote failed and the operator was slashed
    pub slash: Option<SlashOrder>,
}

/// Command surface.
pub trait ChallengeMsgServer {
    fn submit(&mut self, ctx: &BlockContext, msg: MsgSubmit) -> ChallengeResult<ChallengeId>;

    fn attest(&mut self, ctx: &BlockContext, msg: MsgAttest) -> ChallengeResult<AttestReceipt>;

    /// Returns the reward paid to the submitter.
    fn heartbeat(&mut self, ctx: &BlockContext, msg: MsgHeartbeat) -> ChallengeResult<u128>;

    fn update_params(&mut self, msg: MsgUpdateParams) -> ChallengeResult<()>;
}

// =============================================================================
// Queries
// =============================================================================

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub offset: u64,
    /// Zero selects `DEFAULT_PAGE_LIMIT`
    pub limit: u64,
    pub count_total: bool,
}

impl PageRequest {
    pub fn new(offset: u64, limit: u64) -> Self {
        Self {
            offset,
            limit,
            count_total: false,
        }
    }

    pub fn with_total(mut self) -> Self {
        self.count_total = true;
        self
    }

    /// Cut one page out of an ordered result set.
    pub fn paginate<T>(&self, items: Vec<T>) -> Page<T> {
        let limit = if self.limit == 0 {
            DEFAULT_PAGE_LIMIT
        } else {
            self.limit
        };
        let total = items.len() as u64;
        let page: Vec<T> = items
            .into_iter()
            .skip(usize::try_from(self.offset).unwrap_or(usize::MAX))
            .take(usize::try_from(limit).unwrap_or(usize::MAX))
            .collect();
        let next_offset = self.offset.saturating_add(page.len() as u64);

        Page {
            items: page,
            next_offset: (next_offset < total).then_some(next_offset),
            total: self.count_total.then_some(total),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// Offset of the following page, `None` on the last page
    pub next_offset: Option<u64>,
    pub total: Option<u64>,
}

/// Validator allowed to submit the next heartbeat, and until when.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InTurnSubmitter {
    pub bls_public_key: Vec<u8>,
    pub challenger_address: Address,
    pub window: InTurnWindow,
}

/// Read-only query surface.
pub trait ChallengeQueries {
    fn params(&self) -> ChallengeResult<Params>;

    fn challenge(&self, id: ChallengeId) -> ChallengeResult<OpenChallenge>;

    fn challenges(&self, page: &PageRequest) -> ChallengeResult<Page<OpenChallenge>>;

    fn recent_slash(
        &self,
        operator_id: OperatorId,
        object_id: &ObjectId,
    ) -> ChallengeResult<Option<RecentSlash>>;

    fn recent_slashes(&self, page: &PageRequest) -> ChallengeResult<Page<RecentSlash>>;

    fn sp_slash_amount(&self, operator_id: OperatorId) -> ChallengeResult<u128>;

    fn latest_attested_challenge_id(&self) -> ChallengeResult<ChallengeId>;

    /// Oldest to newest, at most `attestation_kept_count` entries.
    fn latest_attested_challenges(&self) -> ChallengeResult<Vec<AttestedChallenge>>;

    fn inturn_attestation_submitter(&self, ctx: &BlockContext) -> ChallengeResult<InTurnSubmitter>;
}
