//! Challenge Service - lifecycle orchestration
//!
//! Owns the store and every write to it. Each message and each end-of-block
//! pass runs against a fresh `ChallengeStore` overlay:
//!
//! ```text
//! transact(|tx| handler(tx, ..))  ->  Ok((batch, out))  ->  commit(batch)  ->  events
//!                                 ->  Err(e)            ->  overlay dropped, store untouched
//! ```
//!
//! The collaborators' mutating capabilities (`slash`, `transfer`) are called
//! last inside a handler, after every check has passed.

mod end_block;
mod genesis;
mod msg_server;
mod queries;

pub use end_block::EndBlockSummary;
pub use genesis::GenesisState;

use crate::adapters::HeaderRandomness;
use crate::config::ChallengeConfig;
use crate::domain::{
    BlockContext, Challenge, ChallengeId, ChallengeOrigin, ChallengeTarget, ObjectTarget, Params,
};
use crate::error::{ChallengeError, ChallengeResult};
use crate::events::ChallengeEvent;
use crate::metrics;
use crate::ports::{
    ObjectCatalog, OperatorRegistry, RandomnessSource, RewardPool, ValidatorRegistry,
};
use crate::state::{challenge_ids, ChallengeStore, Sequence};
use shared_types::{BatchOperation, KeyValueStore, ObjectId, OperatorId};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Storage challenge service.
pub struct ChallengeService<KV, OR, OC, VR, RP>
where
    KV: KeyValueStore,
    OR: OperatorRegistry,
    OC: ObjectCatalog,
    VR: ValidatorRegistry,
    RP: RewardPool,
{
    config: ChallengeConfig,
    store: KV,
    operators: Arc<OR>,
    catalog: Arc<OC>,
    validators: Arc<VR>,
    rewards: Arc<RP>,
    randomness: Box<dyn RandomnessSource>,
    /// Events of committed operations, drained by the host
    events: Vec<ChallengeEvent>,
}

impl<KV, OR, OC, VR, RP> ChallengeService<KV, OR, OC, VR, RP>
where
    KV: KeyValueStore,
    OR: OperatorRegistry,
    OC: ObjectCatalog,
    VR: ValidatorRegistry,
    RP: RewardPool,
{
    pub fn new(
        config: ChallengeConfig,
        store: KV,
        operators: Arc<OR>,
        catalog: Arc<OC>,
        validators: Arc<VR>,
        rewards: Arc<RP>,
    ) -> Self {
        Self {
            config,
            store,
            operators,
            catalog,
            validators,
            rewards,
            randomness: Box::new(HeaderRandomness),
            events: Vec::new(),
        }
    }

    /// Replace the header-backed randomness source.
    pub fn with_randomness(mut self, randomness: Box<dyn RandomnessSource>) -> Self {
        self.randomness = randomness;
        self
    }

    pub fn config(&self) -> &ChallengeConfig {
        &self.config
    }

    pub fn store(&self) -> &KV {
        &self.store
    }

    /// Take every event buffered since the last drain.
    pub fn drain_events(&mut self) -> Vec<ChallengeEvent> {
        std::mem::take(&mut self.events)
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// Read-only view of committed state.
    fn view(&self) -> ChallengeStore<'_, KV> {
        ChallengeStore::new(&self.store)
    }

    /// Run `f` against a fresh overlay and hand back its pending writes.
    fn transact<R>(
        &self,
        f: impl FnOnce(&mut ChallengeStore<'_, KV>) -> ChallengeResult<R>,
    ) -> ChallengeResult<(Vec<BatchOperation>, R)> {
        let mut tx = ChallengeStore::new(&self.store);
        let out = f(&mut tx)?;
        Ok((tx.into_batch(), out))
    }

    /// Write the batch, then publish the events it carries.
    fn commit(
        &mut self,
        batch: Vec<BatchOperation>,
        events: Vec<ChallengeEvent>,
    ) -> ChallengeResult<()> {
        if !batch.is_empty() {
            let writes = batch.len();
            self.store.atomic_batch_write(batch).map_err(|e| {
                error!(error = %e, "[challenge] commit failed");
                ChallengeError::from(e)
            })?;
            debug!(writes, "[challenge] committed");
        }
        for event in &events {
            record_event(event);
        }
        self.events.extend(events);
        Ok(())
    }

    // =========================================================================
    // Shared handler steps
    // =========================================================================

    fn expiry_height(ctx: &BlockContext, params: &Params) -> u64 {
        ctx.height.saturating_add(params.challenge_keep_alive_period)
    }

    /// Allocate the next object-challenge id. Heartbeat ids met on the way
    /// are opened as heartbeat challenges.
    fn allocate_id(
        tx: &mut ChallengeStore<'_, KV>,
        ctx: &BlockContext,
        params: &Params,
        events: &mut Vec<ChallengeEvent>,
    ) -> ChallengeResult<ChallengeId> {
        let ids = challenge_ids();
        loop {
            let id = ids.next(tx)?;
            if !params.is_heartbeat_id(id) {
                return Ok(id);
            }

            let challenge = Challenge::new(id, Self::expiry_height(ctx, params));
            tx.insert_challenge(challenge, &ChallengeTarget::Heartbeat)?;
            events.push(ChallengeEvent::HeartbeatScheduled {
                challenge_id: id,
                expired_height: challenge.expired_height,
            });
        }
    }

    /// Persist an object challenge and queue its `Started` event.
    fn record_challenge(
        tx: &mut ChallengeStore<'_, KV>,
        challenge: Challenge,
        target: ObjectTarget,
        origin: ChallengeOrigin,
        events: &mut Vec<ChallengeEvent>,
    ) -> ChallengeResult<()> {
        events.push(ChallengeEvent::Started {
            challenge_id: challenge.id,
            origin,
            object_id: target.object_id,
            segment_index: target.segment_index,
            operator_id: target.operator_id,
            redundancy_index: target.redundancy_index,
            challenger: target.challenger,
            expired_height: challenge.expired_height,
        });
        tx.insert_challenge(challenge, &ChallengeTarget::Object(target))
    }

    /// Active cooling-off marker for the pair, if any.
    fn cooling_off_until(
        tx: &ChallengeStore<'_, KV>,
        ctx: &BlockContext,
        params: &Params,
        operator_id: OperatorId,
        object_id: &ObjectId,
    ) -> ChallengeResult<Option<u64>> {
        Ok(tx
            .recent_slash(operator_id, object_id)?
            .filter(|slash| slash.is_active(ctx.height, params.slash_cooling_off_period))
            .map(|slash| slash.cooling_off_until(params.slash_cooling_off_period)))
    }
}

/// Log a rejected message at a level matching its class.
fn log_rejection(operation: &str, err: &ChallengeError) {
    if err.is_fatal() {
        error!(operation, error = %err, "[challenge] fatal error");
    } else {
        warn!(operation, class = ?err.class(), error = %err, "[challenge] message rejected");
    }
}

/// Log and count one committed event.
fn record_event(event: &ChallengeEvent) {
    match event {
        ChallengeEvent::Started {
            challenge_id,
            origin,
            object_id,
            segment_index,
            operator_id,
            redundancy_index,
            expired_height,
            ..
        } => {
            info!(
                challenge_id,
                origin = origin.as_str(),
                object_id = %object_id,
                operator_id,
                segment_index,
                redundancy_index = redundancy_index.0,
                expired_height,
                "[challenge] challenge opened"
            );
            metrics::record_challenge_opened(origin.as_str());
        }
        ChallengeEvent::HeartbeatScheduled {
            challenge_id,
            expired_height,
        } => {
            info!(challenge_id, expired_height, "[challenge] heartbeat scheduled");
            metrics::record_challenge_opened("heartbeat");
        }
        ChallengeEvent::Attested {
            challenge_id,
            result,
            operator_id,
            object_id,
            slash_amount,
            ..
        } => {
            info!(
                challenge_id,
                result = result.as_str(),
                operator_id,
                object_id = %object_id,
                slash_amount = %slash_amount,
                "[challenge] challenge attested"
            );
            metrics::record_challenge_attested(result.as_str());
            if *slash_amount > 0 {
                metrics::record_slash_amount(*slash_amount);
            }
        }
        ChallengeEvent::HeartbeatAttested {
            challenge_id,
            submitter,
            reward,
        } => {
            info!(
                challenge_id,
                submitter = %submitter,
                reward = %reward,
                "[challenge] heartbeat attested"
            );
            metrics::record_heartbeat_attested();
        }
        ChallengeEvent::Expired {
            challenge_id,
            expired_height,
        } => {
            debug!(challenge_id, expired_height, "[challenge] challenge expired");
            metrics::record_challenges_expired(1);
        }
    }
}
