//! Driven Ports (SPI - Outbound Dependencies)
//!
//! Everything the challenge subsystem consumes from the rest of the chain.
//! All calls are synchronous reads against the current block's state; the
//! two mutating capabilities (`slash`, `transfer`) are invoked only after
//! every other check of a message has passed.

use crate::domain::{BlockContext, Seed, SlashOrder, ValidatorSnapshot};
use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeight, ObjectId, OperatorId, U256};
use thiserror::Error;

/// Failure reported by a collaborator's mutating capability.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("{reason}")]
pub struct CollaboratorError {
    pub reason: String,
}

impl CollaboratorError {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Operator registry
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatorStatus {
    InService,
    InJail,
    GracefulExiting,
    InMaintenance,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperatorInfo {
    pub id: OperatorId,
    pub operator_address: Address,
    pub funding_address: Address,
    pub status: OperatorStatus,
}

impl OperatorInfo {
    pub fn is_in_service(&self) -> bool {
        self.status == OperatorStatus::InService
    }
}

/// Storage-operator registry with its slashing capability.
pub trait OperatorRegistry: Send + Sync {
    fn operator(&self, id: OperatorId) -> Option<OperatorInfo>;

    fn operator_by_address(&self, address: &Address) -> Option<OperatorInfo>;

    /// Burn `order.amount` from the operator and pay out `order.rewards`.
    fn slash(&self, order: &SlashOrder) -> Result<(), CollaboratorError>;
}

// =============================================================================
// Object catalog
// =============================================================================

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectStatus {
    Created,
    Sealed,
    Discontinued,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub bucket_name: String,
    pub object_name: String,
    pub status: ObjectStatus,
    pub payload_size: u64,
    /// Secondary operators in redundancy order
    pub secondary_operators: Vec<OperatorId>,
}

impl ObjectInfo {
    pub fn is_sealed(&self) -> bool {
        self.status == ObjectStatus::Sealed
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BucketInfo {
    pub name: String,
    pub primary_operator_id: OperatorId,
}

/// Object and bucket metadata.
pub trait ObjectCatalog: Send + Sync {
    fn object_info(&self, bucket: &str, object: &str) -> Option<ObjectInfo>;

    fn object_info_by_id(&self, id: &ObjectId) -> Option<ObjectInfo>;

    fn bucket_info(&self, bucket: &str) -> Option<BucketInfo>;

    /// Segment size used to split payloads, in bytes.
    fn max_segment_size(&self) -> u64;

    /// Highest object id ever allocated; ids run from 1 to this value.
    fn total_object_count(&self) -> U256;
}

// =============================================================================
// Validator registry
// =============================================================================

/// Historical validator sets recorded by the staking module.
pub trait ValidatorRegistry: Send + Sync {
    fn historical_validator_set(&self, height: BlockHeight) -> Option<ValidatorSnapshot>;
}

// =============================================================================
// Reward pool
// =============================================================================

/// Validator-reward distribution account.
pub trait RewardPool: Send + Sync {
    fn available_validator_rewards(&self) -> u128;

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), CollaboratorError>;
}

// =============================================================================
// Randomness
// =============================================================================

/// Per-block unpredictable seed.
pub trait RandomnessSource: Send + Sync {
    fn seed(&self, ctx: &BlockContext) -> Seed;
}
