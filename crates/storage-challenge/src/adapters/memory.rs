//! In-memory collaborators
//!
//! Stand-ins for the operator registry, object catalog, staking registry and
//! reward pool. Used by tests and local tooling; each one can be told to fail
//! its mutating capability.

use crate::domain::{SlashOrder, ValidatorInfo, ValidatorSnapshot};
use crate::error::{ChallengeError, ChallengeResult};
use crate::ports::{
    BucketInfo, CollaboratorError, ObjectCatalog, ObjectInfo, ObjectStatus, OperatorInfo,
    OperatorRegistry, OperatorStatus, RewardPool, ValidatorRegistry,
};
use crate::state::{ChallengeStore, Sequence, U256Sequence};
use parking_lot::RwLock;
use shared_types::{Address, BlockHeight, InMemoryKVStore, KeyValueStore, ObjectId, OperatorId, U256};
use std::collections::{BTreeMap, HashMap};
use tracing::debug;

// =============================================================================
// Operator registry
// =============================================================================

#[derive(Default)]
pub struct MemoryOperatorRegistry {
    operators: RwLock<BTreeMap<OperatorId, OperatorInfo>>,
    slashes: RwLock<Vec<SlashOrder>>,
    slash_failure: RwLock<Option<String>>,
}

impl MemoryOperatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, info: OperatorInfo) {
        self.operators.write().insert(info.id, info);
    }

    /// Register an in-service operator whose funding address equals its
    /// operator address.
    pub fn register(&self, id: OperatorId, address: Address) {
        self.insert(OperatorInfo {
            id,
            operator_address: address,
            funding_address: address,
            status: OperatorStatus::InService,
        });
    }

    pub fn set_status(&self, id: OperatorId, status: OperatorStatus) {
        if let Some(info) = self.operators.write().get_mut(&id) {
            info.status = status;
        }
    }

    /// Make every following `slash` fail with `reason`, or succeed again
    /// with `None`.
    pub fn fail_slashes(&self, reason: Option<&str>) {
        *self.slash_failure.write() = reason.map(str::to_string);
    }

    /// Slash orders executed so far.
    pub fn slashes(&self) -> Vec<SlashOrder> {
        self.slashes.read().clone()
    }
}

impl OperatorRegistry for MemoryOperatorRegistry {
    fn operator(&self, id: OperatorId) -> Option<OperatorInfo> {
        self.operators.read().get(&id).cloned()
    }

    fn operator_by_address(&self, address: &Address) -> Option<OperatorInfo> {
        self.operators
            .read()
            .values()
            .find(|info| info.operator_address == *address)
            .cloned()
    }

    fn slash(&self, order: &SlashOrder) -> Result<(), CollaboratorError> {
        if let Some(reason) = self.slash_failure.read().as_ref() {
            return Err(CollaboratorError::new(reason.clone()));
        }
        if !self.operators.read().contains_key(&order.operator_id) {
            return Err(CollaboratorError::new(format!(
                "operator {} not registered",
                order.operator_id
            )));
        }
        self.slashes.write().push(order.clone());
        Ok(())
    }
}

// =============================================================================
// Object catalog
// =============================================================================

const OBJECT_ID_SEQUENCE_KEY: &[u8] = b"object-id";

/// Catalog with sequential 256-bit object ids.
pub struct MemoryObjectCatalog {
    segment_size: u64,
    buckets: RwLock<HashMap<String, BucketInfo>>,
    objects: RwLock<BTreeMap<ObjectId, ObjectInfo>>,
    id_store: RwLock<InMemoryKVStore>,
    object_ids: U256Sequence,
}

impl MemoryObjectCatalog {
    pub fn new(segment_size: u64) -> Self {
        Self {
            segment_size,
            buckets: RwLock::new(HashMap::new()),
            objects: RwLock::new(BTreeMap::new()),
            id_store: RwLock::new(InMemoryKVStore::new()),
            object_ids: U256Sequence::new(OBJECT_ID_SEQUENCE_KEY),
        }
    }

    pub fn create_bucket(&self, name: &str, primary_operator_id: OperatorId) {
        self.buckets.write().insert(
            name.to_string(),
            BucketInfo {
                name: name.to_string(),
                primary_operator_id,
            },
        );
    }

    /// Create an object in `Created` status and return its id.
    pub fn create_object(
        &self,
        bucket: &str,
        name: &str,
        payload_size: u64,
        secondary_operators: Vec<OperatorId>,
    ) -> ChallengeResult<ObjectId> {
        if !self.buckets.read().contains_key(bucket) {
            return Err(ChallengeError::UnknownBucket {
                bucket: bucket.to_string(),
            });
        }

        let mut id_store = self.id_store.write();
        let mut overlay = ChallengeStore::new(&*id_store);
        let id = ObjectId(self.object_ids.next(&mut overlay)?);
        let batch = overlay.into_batch();
        id_store.atomic_batch_write(batch)?;

        self.objects.write().insert(
            id,
            ObjectInfo {
                id,
                bucket_name: bucket.to_string(),
                object_name: name.to_string(),
                status: ObjectStatus::Created,
                payload_size,
                secondary_operators,
            },
        );
        debug!(object_id = %id, bucket, name, "catalog object created");
        Ok(id)
    }

    /// Create and seal in one step.
    pub fn create_sealed_object(
        &self,
        bucket: &str,
        name: &str,
        payload_size: u64,
        secondary_operators: Vec<OperatorId>,
    ) -> ChallengeResult<ObjectId> {
        let id = self.create_object(bucket, name, payload_size, secondary_operators)?;
        self.set_status(&id, ObjectStatus::Sealed);
        Ok(id)
    }

    pub fn set_status(&self, id: &ObjectId, status: ObjectStatus) {
        if let Some(info) = self.objects.write().get_mut(id) {
            info.status = status;
        }
    }

    /// Drop an object; its id stays allocated.
    pub fn remove_object(&self, id: &ObjectId) {
        self.objects.write().remove(id);
    }
}

impl ObjectCatalog for MemoryObjectCatalog {
    fn object_info(&self, bucket: &str, object: &str) -> Option<ObjectInfo> {
        self.objects
            .read()
            .values()
            .find(|info| info.bucket_name == bucket && info.object_name == object)
            .cloned()
    }

    fn object_info_by_id(&self, id: &ObjectId) -> Option<ObjectInfo> {
        self.objects.read().get(id).cloned()
    }

    fn bucket_info(&self, bucket: &str) -> Option<BucketInfo> {
        self.buckets.read().get(bucket).cloned()
    }

    fn max_segment_size(&self) -> u64 {
        self.segment_size
    }

    fn total_object_count(&self) -> U256 {
        let id_store = self.id_store.read();
        let overlay = ChallengeStore::new(&*id_store);
        self.object_ids.current(&overlay).unwrap_or_default()
    }
}

// =============================================================================
// Validator registry
// =============================================================================

/// Snapshots recorded at heights; a lookup returns the latest snapshot
/// recorded at or below the requested height.
#[derive(Default)]
pub struct MemoryValidatorRegistry {
    snapshots: RwLock<BTreeMap<BlockHeight, Vec<ValidatorInfo>>>,
}

impl MemoryValidatorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, from_height: BlockHeight, validators: Vec<ValidatorInfo>) {
        self.snapshots.write().insert(from_height, validators);
    }
}

impl ValidatorRegistry for MemoryValidatorRegistry {
    fn historical_validator_set(&self, height: BlockHeight) -> Option<ValidatorSnapshot> {
        self.snapshots
            .read()
            .range(..=height)
            .next_back()
            .map(|(_, validators)| ValidatorSnapshot::new(height, validators.clone()))
    }
}

// =============================================================================
// Reward pool
// =============================================================================

/// Account balances with one designated validator-reward account.
pub struct MemoryRewardPool {
    pool: Address,
    balances: RwLock<HashMap<Address, u128>>,
    transfer_failure: RwLock<Option<String>>,
}

impl MemoryRewardPool {
    pub fn new(pool: Address, available: u128) -> Self {
        let mut balances = HashMap::new();
        balances.insert(pool, available);
        Self {
            pool,
            balances: RwLock::new(balances),
            transfer_failure: RwLock::new(None),
        }
    }

    pub fn balance(&self, address: &Address) -> u128 {
        self.balances.read().get(address).copied().unwrap_or(0)
    }

    pub fn fail_transfers(&self, reason: Option<&str>) {
        *self.transfer_failure.write() = reason.map(str::to_string);
    }
}

impl RewardPool for MemoryRewardPool {
    fn available_validator_rewards(&self) -> u128 {
        self.balance(&self.pool)
    }

    fn transfer(&self, from: &Address, to: &Address, amount: u128) -> Result<(), CollaboratorError> {
        if let Some(reason) = self.transfer_failure.read().as_ref() {
            return Err(CollaboratorError::new(reason.clone()));
        }
        let mut balances = self.balances.write();
        let available = balances.get(from).copied().unwrap_or(0);
        if available < amount {
            return Err(CollaboratorError::new(format!(
                "insufficient funds in {}: have {}, need {}",
                from, available, amount
            )));
        }
        balances.insert(*from, available - amount);
        *balances.entry(*to).or_insert(0) += amount;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_ids_are_sequential() {
        let catalog = MemoryObjectCatalog::new(16 * 1024 * 1024);
        catalog.create_bucket("bucket", 1);

        let a = catalog.create_object("bucket", "a", 10, vec![]).unwrap();
        let b = catalog.create_sealed_object("bucket", "b", 10, vec![2]).unwrap();

        assert_eq!(a, ObjectId::from(1));
        assert_eq!(b, ObjectId::from(2));
        assert_eq!(catalog.total_object_count(), U256::from(2));
        assert!(catalog.object_info("bucket", "b").unwrap().is_sealed());
        assert!(!catalog.object_info_by_id(&a).unwrap().is_sealed());
    }

    #[test]
    fn test_catalog_rejects_unknown_bucket() {
        let catalog = MemoryObjectCatalog::new(1024);
        assert!(matches!(
            catalog.create_object("missing", "a", 10, vec![]),
            Err(ChallengeError::UnknownBucket { .. })
        ));
    }

    #[test]
    fn test_removed_object_keeps_count() {
        let catalog = MemoryObjectCatalog::new(1024);
        catalog.create_bucket("bucket", 1);
        let id = catalog.create_object("bucket", "a", 10, vec![]).unwrap();
        catalog.remove_object(&id);

        assert!(catalog.object_info_by_id(&id).is_none());
        assert_eq!(catalog.total_object_count(), U256::one());
    }

    #[test]
    fn test_validator_snapshot_lookup() {
        let registry = MemoryValidatorRegistry::new();
        let info = |b: u8| ValidatorInfo {
            bls_public_key: vec![b; 48],
            challenger_address: Address([b; 20]),
        };
        registry.record(10, vec![info(1)]);
        registry.record(20, vec![info(1), info(2)]);

        assert!(registry.historical_validator_set(9).is_none());
        assert_eq!(registry.historical_validator_set(15).unwrap().len(), 1);
        let at_25 = registry.historical_validator_set(25).unwrap();
        assert_eq!(at_25.len(), 2);
        assert_eq!(at_25.height, 25);
    }

    #[test]
    fn test_reward_pool_transfer() {
        let pool_addr = Address([0xEE; 20]);
        let to = Address([1; 20]);
        let pool = MemoryRewardPool::new(pool_addr, 100);

        pool.transfer(&pool_addr, &to, 40).unwrap();
        assert_eq!(pool.available_validator_rewards(), 60);
        assert_eq!(pool.balance(&to), 40);
        assert!(pool.transfer(&pool_addr, &to, 61).is_err());

        pool.fail_transfers(Some("frozen"));
        assert_eq!(
            pool.transfer(&pool_addr, &to, 1).unwrap_err().reason,
            "frozen"
        );
    }

    #[test]
    fn test_slash_failure_injection() {
        let registry = MemoryOperatorRegistry::new();
        registry.register(1, Address([1; 20]));
        let order = SlashOrder {
            challenge_id: 1,
            operator_id: 1,
            object_id: ObjectId::from(1),
            amount: 10,
            rewards: vec![],
        };

        registry.fail_slashes(Some("bank offline"));
        assert!(registry.slash(&order).is_err());
        registry.fail_slashes(None);
        registry.slash(&order).unwrap();
        assert_eq!(registry.slashes(), vec![order]);
    }
}
