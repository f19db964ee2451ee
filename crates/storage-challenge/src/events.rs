//! Outgoing events for the storage challenge subsystem
//!
//! Consumed by off-chain relayers and indexers. The service buffers events
//! of committed operations only; the host drains them after each message
//! and after end of block.

use crate::domain::{
    ChallengeId, ChallengeOrigin, RedundancyIndex, SegmentIndex, VoteResult,
};
use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeight, ObjectId, OperatorId};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeEvent {
    /// An object challenge was opened; validators should start probing.
    Started {
        challenge_id: ChallengeId,
        origin: ChallengeOrigin,
        object_id: ObjectId,
        segment_index: SegmentIndex,
        operator_id: OperatorId,
        redundancy_index: RedundancyIndex,
        challenger: Option<Address>,
        expired_height: BlockHeight,
    },
    /// A heartbeat challenge was opened.
    HeartbeatScheduled {
        challenge_id: ChallengeId,
        expired_height: BlockHeight,
    },
    Attested {
        challenge_id: ChallengeId,
        result: VoteResult,
        operator_id: OperatorId,
        object_id: ObjectId,
        submitter: Address,
        /// Zero unless the vote failed
        slash_amount: u128,
    },
    HeartbeatAttested {
        challenge_id: ChallengeId,
        submitter: Address,
        reward: u128,
    },
    Expired {
        challenge_id: ChallengeId,
        expired_height: BlockHeight,
    },
}

impl ChallengeEvent {
    pub fn challenge_id(&self) -> ChallengeId {
        match self {
            ChallengeEvent::Started { challenge_id, .. }
            | ChallengeEvent::HeartbeatScheduled { challenge_id, .. }
            | ChallengeEvent::Attested { challenge_id, .. }
            | ChallengeEvent::HeartbeatAttested { challenge_id, .. }
            | ChallengeEvent::Expired { challenge_id, .. } => *challenge_id,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ChallengeEvent::Started { .. } => "challenge_started",
            ChallengeEvent::HeartbeatScheduled { .. } => "challenge_heartbeat",
            ChallengeEvent::Attested { .. } => "challenge_attested",
            ChallengeEvent::HeartbeatAttested { .. } => "heartbeat_attested",
            ChallengeEvent::Expired { .. } => "challenge_expired",
        }
    }
}
