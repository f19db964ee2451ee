//! Error types for the storage challenge subsystem
//!
//! Every variant belongs to one `ErrorClass`. Only `Fatal` errors are meant to
//! reach the host's block-failure path; all others abort the current message
//! with the store untouched.

use shared_types::{Address, BlockHeight, KVStoreError, ObjectId, OperatorId};
use thiserror::Error;

/// Coarse classification of a `ChallengeError`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorClass {
    /// Unknown ids, bad indices, malformed input.
    Validation,
    /// Caller is not allowed to perform the operation.
    Authorization,
    /// Signature, key or quorum problems.
    Cryptographic,
    /// Guards against repeated punishment or over-capacity.
    Consistency,
    /// Store corruption or programming errors. Halts the block.
    Fatal,
}

/// Storage challenge subsystem errors
#[derive(Debug, Error)]
pub enum ChallengeError {
    // ---------------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------------
    #[error("Unknown storage operator: {operator_id}")]
    UnknownOperator { operator_id: OperatorId },

    #[error("Unknown storage operator address: {address}")]
    UnknownOperatorAddress { address: Address },

    #[error("Storage operator {operator_id} is not in service")]
    OperatorNotInService { operator_id: OperatorId },

    #[error("Unknown bucket: {bucket}")]
    UnknownBucket { bucket: String },

    #[error("Unknown object: {bucket}/{object}")]
    UnknownObject { bucket: String, object: String },

    #[error("Unknown object id: {object_id}")]
    UnknownObjectId { object_id: ObjectId },

    #[error("Object {object_id} is not sealed")]
    ObjectNotSealed { object_id: ObjectId },

    #[error("Object {object_id} has no payload to challenge")]
    EmptyObject { object_id: ObjectId },

    #[error("Invalid segment index {index}: object has {segments} segments")]
    InvalidSegmentIndex { index: u32, segments: u64 },

    #[error("Unknown challenge: {challenge_id}")]
    UnknownChallenge { challenge_id: u64 },

    #[error("Challenge {challenge_id} expired at height {expired_height}")]
    ChallengeExpired {
        challenge_id: u64,
        expired_height: BlockHeight,
    },

    #[error("Challenge {challenge_id} targets a different object or operator")]
    TargetMismatch { challenge_id: u64 },

    #[error("Challenge {challenge_id} is a heartbeat and must be attested via Heartbeat")]
    HeartbeatChallenge { challenge_id: u64 },

    #[error("Challenge {challenge_id} is not a heartbeat challenge")]
    NotHeartbeatChallenge { challenge_id: u64 },

    #[error("No validator set recorded at height {height}")]
    ValidatorSetNotFound { height: BlockHeight },

    #[error("Validator set at height {height} is empty")]
    EmptyValidatorSet { height: BlockHeight },

    #[error("Vote bitset references validator {highest} but the set has {size} members")]
    BitsetOutOfRange { highest: usize, size: usize },

    #[error("Invalid params: {reason}")]
    InvalidParams { reason: String },

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    // ---------------------------------------------------------------------
    // Authorization
    // ---------------------------------------------------------------------
    #[error("Operator {operator_id} does not store object {object_id}")]
    NotStoredByOperator {
        operator_id: OperatorId,
        object_id: ObjectId,
    },

    #[error("Submitter {submitter} is not the in-turn attester (expected {expected})")]
    NotInTurn { submitter: Address, expected: Address },

    #[error("Submitter {submitter} is not among the voting validators")]
    SubmitterNotVoter { submitter: Address },

    #[error("Unauthorized authority: {signer}")]
    Unauthorized { signer: Address },

    // ---------------------------------------------------------------------
    // Cryptographic
    // ---------------------------------------------------------------------
    #[error("Invalid BLS public key for validator {index}")]
    InvalidBlsPublicKey { index: usize },

    #[error("Invalid aggregate BLS signature encoding")]
    InvalidBlsSignature,

    #[error("Not enough votes: have {have}, need {need}")]
    NotEnoughVotes { have: usize, need: usize },

    #[error("Aggregate BLS signature verification failed")]
    AggregateVerificationFailed,

    // ---------------------------------------------------------------------
    // Consistency
    // ---------------------------------------------------------------------
    #[error("Operator {operator_id} was slashed for object {object_id} recently; cooling off until height {until_height}")]
    RecentlySlashed {
        operator_id: OperatorId,
        object_id: ObjectId,
        until_height: BlockHeight,
    },

    #[error("Challenge capacity for this block reached ({count})")]
    ChallengeCapReached { count: u64 },

    #[error("Slashing operator {operator_id} failed: {reason}")]
    SlashFailed {
        operator_id: OperatorId,
        reason: String,
    },

    #[error("Reward transfer to {recipient} failed: {reason}")]
    RewardTransferFailed { recipient: Address, reason: String },

    // ---------------------------------------------------------------------
    // Fatal
    // ---------------------------------------------------------------------
    #[error("Store corruption: {reason}")]
    StoreCorruption { reason: String },

    #[error("Codec error: {reason}")]
    Codec { reason: String },

    #[error("Sequence overflow at key {key:?}")]
    SequenceOverflow { key: Vec<u8> },

    #[error("Sequence at key {key:?} already initialised")]
    SequenceAlreadyInitialised { key: Vec<u8> },

    #[error("Zero cardinality for {what}")]
    ZeroCardinality { what: &'static str },

    #[error(transparent)]
    Storage(#[from] KVStoreError),
}

impl ChallengeError {
    /// Error class used by callers to decide between rejecting a message and
    /// halting the block.
    pub fn class(&self) -> ErrorClass {
        use ChallengeError::*;
        match self {
            UnknownOperator { .. }
            | UnknownOperatorAddress { .. }
            | OperatorNotInService { .. }
            | UnknownBucket { .. }
            | UnknownObject { .. }
            | UnknownObjectId { .. }
            | ObjectNotSealed { .. }
            | EmptyObject { .. }
            | InvalidSegmentIndex { .. }
            | UnknownChallenge { .. }
            | ChallengeExpired { .. }
            | TargetMismatch { .. }
            | HeartbeatChallenge { .. }
            | NotHeartbeatChallenge { .. }
            | ValidatorSetNotFound { .. }
            | EmptyValidatorSet { .. }
            | BitsetOutOfRange { .. }
            | InvalidParams { .. }
            | InvalidConfig { .. } => ErrorClass::Validation,

            NotStoredByOperator { .. }
            | NotInTurn { .. }
            | SubmitterNotVoter { .. }
            | Unauthorized { .. } => ErrorClass::Authorization,

            InvalidBlsSignature | NotEnoughVotes { .. } | AggregateVerificationFailed => {
                ErrorClass::Cryptographic
            }

            RecentlySlashed { .. }
            | ChallengeCapReached { .. }
            | SlashFailed { .. }
            | RewardTransferFailed { .. } => ErrorClass::Consistency,

            // Snapshot keys are written by the host chain; an undecodable one
            // means the snapshot itself is corrupt.
            InvalidBlsPublicKey { .. }
            | StoreCorruption { .. }
            | Codec { .. }
            | SequenceOverflow { .. }
            | SequenceAlreadyInitialised { .. }
            | ZeroCardinality { .. }
            | Storage(_) => ErrorClass::Fatal,
        }
    }

    /// Whether the error must propagate to the host's block-failure path.
    pub fn is_fatal(&self) -> bool {
        self.class() == ErrorClass::Fatal
    }

    pub(crate) fn corruption(reason: impl Into<String>) -> Self {
        ChallengeError::StoreCorruption {
            reason: reason.into(),
        }
    }
}

impl From<bincode::Error> for ChallengeError {
    fn from(err: bincode::Error) -> Self {
        ChallengeError::Codec {
            reason: err.to_string(),
        }
    }
}

/// Result type for challenge operations
pub type ChallengeResult<T> = Result<T, ChallengeError>;
