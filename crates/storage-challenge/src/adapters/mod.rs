//! Adapters for the storage challenge subsystem
//!
//! - memory: in-memory collaborators
//! - randomness: header-backed seed
//! - rocksdb_store: durable key-value store (`rocksdb` feature)

pub mod memory;
pub mod randomness;
#[cfg(feature = "rocksdb")]
pub mod rocksdb_store;

pub use memory::{
    MemoryObjectCatalog, MemoryOperatorRegistry, MemoryRewardPool, MemoryValidatorRegistry,
};
pub use randomness::HeaderRandomness;
#[cfg(feature = "rocksdb")]
pub use rocksdb_store::{RocksDbConfig, RocksDbStore};
