//! # Shared Types Crate
//!
//! Primitive identifiers and the persistence port shared by the ledger's
//! subsystems.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-subsystem ids (`Address`, `ObjectId`,
//!   `OperatorId`) are defined here once.
//! - **Ports, not engines**: subsystems persist through `KeyValueStore` and never
//!   name a concrete database.

pub mod entities;
pub mod errors;
pub mod store;

pub use entities::*;
pub use errors::*;
pub use store::{BatchOperation, InMemoryKVStore, KeyValueStore};
