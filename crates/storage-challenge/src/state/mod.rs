//! Persisted state of the challenge subsystem
//!
//! - store: transactional overlay over the `KeyValueStore` port
//! - keys: prefix layout and fixed-width codecs
//! - sequence: monotonic counters
//! - ledger: typed records (challenges, markers, accumulators, params)
//! - ring_buffer: attested-history ring

pub mod keys;
pub mod ledger;
pub mod ring_buffer;
pub mod sequence;
pub mod store;

pub use ledger::challenge_ids;
pub use ring_buffer::AttestedRing;
pub use sequence::{Sequence, SequenceValue, U256Sequence, U64Sequence};
pub use store::ChallengeStore;
