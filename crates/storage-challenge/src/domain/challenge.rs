//! Challenge entities
//!
//! A challenge asks whether a storage operator still holds one segment of one
//! replica of an object. Heartbeat challenges carry no object and only keep
//! the attestation pipeline alive.

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeight, ObjectId, OperatorId};
use std::fmt;

/// Challenge identifier, allocated by the challenge-id sequence.
pub type ChallengeId = u64;

/// Segment offset within an object's payload.
pub type SegmentIndex = u32;

/// An open challenge as persisted in the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub id: ChallengeId,
    pub expired_height: BlockHeight,
}

impl Challenge {
    pub fn new(id: ChallengeId, expired_height: BlockHeight) -> Self {
        Self { id, expired_height }
    }

    /// A challenge is dead from its expiry height onwards.
    pub fn is_expired_at(&self, height: BlockHeight) -> bool {
        self.expired_height <= height
    }
}

/// Replica slot being audited.
///
/// `-1` is the primary operator; `n >= 0` is the n-th secondary operator.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RedundancyIndex(pub i32);

impl RedundancyIndex {
    pub const PRIMARY: Self = Self(-1);

    /// Map a 0-based replica slot (0 = primary) to a redundancy index.
    pub fn from_slot(slot: u32) -> Self {
        Self(slot as i32 - 1)
    }

    pub fn secondary(position: usize) -> Self {
        Self(position as i32)
    }

    pub fn is_primary(&self) -> bool {
        self.0 < 0
    }

    /// Position in the secondary-operator list, `None` for the primary.
    pub fn secondary_position(&self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for RedundancyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The coordinates an object challenge audits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectTarget {
    pub object_id: ObjectId,
    pub operator_id: OperatorId,
    pub segment_index: SegmentIndex,
    pub redundancy_index: RedundancyIndex,
    /// `None` for challenges raised by the end-of-block draw.
    pub challenger: Option<Address>,
}

/// What an open challenge points at.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeTarget {
    Object(ObjectTarget),
    Heartbeat,
}

impl ChallengeTarget {
    pub fn is_heartbeat(&self) -> bool {
        matches!(self, ChallengeTarget::Heartbeat)
    }
}

/// An open challenge together with its target, as returned by queries.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenChallenge {
    pub challenge: Challenge,
    pub target: ChallengeTarget,
}

/// How a challenge came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChallengeOrigin {
    /// Raised by the end-of-block random draw.
    Random,
    /// Opened by a `Submit` message.
    Submitted,
}

impl ChallengeOrigin {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChallengeOrigin::Random => "random",
            ChallengeOrigin::Submitted => "submitted",
        }
    }
}

/// Verdict of the validator set.
///
/// `Failed` means the operator could not prove possession and is slashed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VoteResult {
    Succeed,
    Failed,
}

impl VoteResult {
    /// Byte used in signed digests.
    pub fn as_byte(&self) -> u8 {
        match self {
            VoteResult::Succeed => 0,
            VoteResult::Failed => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            VoteResult::Succeed => "succeed",
            VoteResult::Failed => "failed",
        }
    }
}

/// Outcome of an attested object challenge, kept in the ring buffer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttestedChallenge {
    pub id: ChallengeId,
    pub result: VoteResult,
    pub object_id: ObjectId,
    pub operator_id: OperatorId,
    pub segment_index: SegmentIndex,
    pub redundancy_index: RedundancyIndex,
    pub challenger: Option<Address>,
}

impl AttestedChallenge {
    pub fn from_target(id: ChallengeId, result: VoteResult, target: &ObjectTarget) -> Self {
        Self {
            id,
            result,
            object_id: target.object_id,
            operator_id: target.operator_id,
            segment_index: target.segment_index,
            redundancy_index: target.redundancy_index,
            challenger: target.challenger,
        }
    }
}

/// Marker left after a failed attestation; blocks new challenges on the same
/// (operator, object) pair while cooling off.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentSlash {
    pub operator_id: OperatorId,
    pub object_id: ObjectId,
    pub height: BlockHeight,
}

impl RecentSlash {
    /// First height at which the pair may be challenged again.
    pub fn cooling_off_until(&self, cooling_off_period: u64) -> BlockHeight {
        self.height.saturating_add(cooling_off_period)
    }

    pub fn is_active(&self, current_height: BlockHeight, cooling_off_period: u64) -> bool {
        self.cooling_off_until(cooling_off_period) > current_height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redundancy_slot_mapping() {
        assert_eq!(RedundancyIndex::from_slot(0), RedundancyIndex::PRIMARY);
        assert!(RedundancyIndex::from_slot(0).is_primary());
        assert_eq!(RedundancyIndex::from_slot(3).secondary_position(), Some(2));
        assert_eq!(RedundancyIndex::PRIMARY.secondary_position(), None);
    }

    #[test]
    fn test_challenge_expiry_boundary() {
        let challenge = Challenge::new(7, 100);
        assert!(!challenge.is_expired_at(99));
        assert!(challenge.is_expired_at(100));
        assert!(challenge.is_expired_at(101));
    }

    #[test]
    fn test_recent_slash_cooling_window() {
        let marker = RecentSlash {
            operator_id: 1,
            object_id: ObjectId::from(9),
            height: 50,
        };
        assert!(marker.is_active(50, 10));
        assert!(marker.is_active(59, 10));
        assert!(!marker.is_active(60, 10));
    }
}
