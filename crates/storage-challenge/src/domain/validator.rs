//! Validator snapshot entities
//!
//! Snapshots are recorded by the staking registry per height and are
//! read-only here.

use serde::{Deserialize, Serialize};
use shared_types::{Address, BlockHeight};

/// One validator as seen by the challenge subsystem.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInfo {
    /// Compressed BLS12-381 G1 public key (48 bytes)
    pub bls_public_key: Vec<u8>,
    /// Address the validator uses to submit attestations and receive rewards
    pub challenger_address: Address,
}

/// Ordered validator set at a height. Bitset indices refer to this order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorSnapshot {
    pub height: BlockHeight,
    pub validators: Vec<ValidatorInfo>,
}

impl ValidatorSnapshot {
    pub fn new(height: BlockHeight, validators: Vec<ValidatorInfo>) -> Self {
        Self { height, validators }
    }

    pub fn len(&self) -> usize {
        self.validators.len()
    }

    pub fn is_empty(&self) -> bool {
        self.validators.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ValidatorInfo> {
        self.validators.get(index)
    }
}
