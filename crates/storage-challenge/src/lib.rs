//! # storage-challenge
//!
//! Storage-audit subsystem: challenges ask whether a storage operator still
//! holds one segment of one replica of an object, and a supermajority of the
//! validator set answers with a BLS-aggregated vote.
//!
//! ## Lifecycle
//!
//! ```text
//!   Submit ──────┐
//!                ├──→ [open challenge] ──Attest(Succeed)──→ attested history
//!   EndBlock ────┘          │          ──Attest(Failed)───→ slash + cooling-off marker
//!   (random draw)           │
//!                           └──keep-alive elapsed──→ expired at end of block
//!
//!   every heartbeat_interval-th id ──→ [heartbeat] ──Heartbeat (in-turn)──→ reward
//! ```
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - Pure logic: selection, scheduling, vote verification, slash sizing
//! - `state/` - Overlay store, ledger records, sequences, attested ring buffer
//! - `ports/` - Message server and query API (inbound), collaborators (outbound)
//! - `service/` - `ChallengeService`, the only writer of challenge state
//! - `adapters/` - In-memory collaborators, header randomness, RocksDB store
//!
//! ## Atomicity
//!
//! Every message and every end-of-block pass runs against a fresh overlay and
//! commits with one `atomic_batch_write`. A rejected message leaves the store
//! and the event buffer untouched.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use storage_challenge::{ChallengeConfig, ChallengeService, GenesisState};
//! use storage_challenge::ports::{ChallengeMsgServer, MsgSubmit};
//!
//! let mut service = ChallengeService::new(config, store, operators, catalog, validators, rewards);
//! service.init_genesis(&GenesisState::default())?;
//!
//! let id = service.submit(&ctx, msg)?;
//! let summary = service.end_block(&ctx)?;
//! for event in service.drain_events() { /* relay */ }
//! ```

pub mod adapters;
pub mod config;
pub mod domain;
pub mod error;
pub mod events;
pub mod metrics;
pub mod ports;
pub mod service;
pub mod state;

pub use config::ChallengeConfig;
pub use domain::{
    AttestedChallenge, BlockContext, Challenge, ChallengeId, ChallengeTarget, ObjectTarget,
    OpenChallenge, Params, RecentSlash, RedundancyIndex, VoteBitset, VoteResult,
};
pub use error::{ChallengeError, ChallengeResult, ErrorClass};
pub use events::ChallengeEvent;
pub use ports::{ChallengeMsgServer, ChallengeQueries};
pub use service::{ChallengeService, EndBlockSummary, GenesisState};
