//! Ports module for the storage challenge subsystem

pub mod inbound;
pub mod outbound;

pub use inbound::{
    AttestReceipt, ChallengeMsgServer, ChallengeQueries, InTurnSubmitter, MsgAttest,
    MsgHeartbeat, MsgSubmit, MsgUpdateParams, OperatorRef, Page, PageRequest,
};
pub use outbound::{
    BucketInfo, CollaboratorError, ObjectCatalog, ObjectInfo, ObjectStatus, OperatorInfo,
    OperatorRegistry, OperatorStatus, RandomnessSource, RewardPool, ValidatorRegistry,
};
