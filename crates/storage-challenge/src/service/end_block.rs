//! End-of-block pass
//!
//! ```text
//! 1. drop challenges whose expiry height has been reached
//! 2. clear per-operator slash accumulators at a counting-window boundary
//! 3. raise random challenges up to the per-block count
//! 4. garbage-collect cooling-off markers inactive from the next block on
//! 5. reset the opened-this-block counter
//! ```
//!
//! All five steps share one overlay; a fatal error leaves the store as it
//! was before the block ended.

use super::ChallengeService;
use crate::domain::selector::{
    random_object_id, random_redundancy_index, random_segment_index, segment_count,
};
use crate::domain::{
    BlockContext, Challenge, ChallengeId, ChallengeOrigin, ObjectTarget, Params, Seed,
};
use crate::error::ChallengeResult;
use crate::events::ChallengeEvent;
use crate::ports::{
    ObjectCatalog, ObjectInfo, OperatorRegistry, RewardPool, ValidatorRegistry,
};
use crate::state::ChallengeStore;
use shared_types::{KeyValueStore, ObjectId, U256};
use tracing::{debug, error, info};

/// What one end-of-block pass did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EndBlockSummary {
    pub expired: Vec<ChallengeId>,
    pub raised: Vec<ChallengeId>,
    /// Heartbeat ids allocated while raising
    pub heartbeats: Vec<ChallengeId>,
    pub markers_pruned: usize,
    pub window_reset: bool,
}

impl<KV, OR, OC, VR, RP> ChallengeService<KV, OR, OC, VR, RP>
where
    KV: KeyValueStore,
    OR: OperatorRegistry,
    OC: ObjectCatalog,
    VR: ValidatorRegistry,
    RP: RewardPool,
{
    /// Run the end-of-block pass for `ctx.height`.
    pub fn end_block(&mut self, ctx: &BlockContext) -> ChallengeResult<EndBlockSummary> {
        let (batch, (summary, events)) = self
            .transact(|tx| self.run_end_block(tx, ctx))
            .inspect_err(|e| error!(height = ctx.height, error = %e, "[challenge] end block failed"))?;
        self.commit(batch, events)?;

        if !summary.raised.is_empty() || !summary.expired.is_empty() {
            info!(
                height = ctx.height,
                raised = summary.raised.len(),
                expired = summary.expired.len(),
                heartbeats = summary.heartbeats.len(),
                "[challenge] end block"
            );
        }
        Ok(summary)
    }

    fn run_end_block(
        &self,
        tx: &mut ChallengeStore<'_, KV>,
        ctx: &BlockContext,
    ) -> ChallengeResult<(EndBlockSummary, Vec<ChallengeEvent>)> {
        let params = tx.params()?;
        let mut summary = EndBlockSummary::default();
        let mut events = Vec::new();

        for challenge in tx.expired_challenges(ctx.height)? {
            tx.remove_challenge(&challenge);
            summary.expired.push(challenge.id);
            events.push(ChallengeEvent::Expired {
                challenge_id: challenge.id,
                expired_height: challenge.expired_height,
            });
        }

        if ctx.height % params.sp_slash_counting_window == 0 {
            let cleared = tx.clear_sp_slash_amounts()?;
            summary.window_reset = true;
            debug!(height = ctx.height, cleared, "[challenge] slash window reset");
        }

        let opened = tx.opened_this_block()?;
        let wanted = params.challenge_count_per_block.saturating_sub(opened);
        if wanted > 0 {
            let seed = self.randomness.seed(ctx);
            for draw in 0..wanted {
                let draw_seed = seed.derive(&draw.to_be_bytes());
                let Some(target) = self.sample_target(tx, ctx, &params, &draw_seed)? else {
                    continue;
                };

                let before = events.len();
                let id = Self::allocate_id(tx, ctx, &params, &mut events)?;
                summary.heartbeats.extend(events[before..].iter().map(|e| e.challenge_id()));

                let challenge = Challenge::new(id, Self::expiry_height(ctx, &params));
                Self::record_challenge(tx, challenge, target, ChallengeOrigin::Random, &mut events)?;
                summary.raised.push(id);
            }
        }

        // Raise above still honours markers active at this height. Anything
        // inactive from the next block on goes now.
        let next_height = ctx.height.saturating_add(1);
        for marker in tx.recent_slashes()? {
            if !marker.is_active(next_height, params.slash_cooling_off_period) {
                tx.remove_recent_slash(&marker);
                summary.markers_pruned += 1;
            }
        }
        tx.set_opened_this_block(0);

        Ok((summary, events))
    }

    /// Draw one object challenge target, or `None` if this draw finds nothing
    /// challengeable.
    ///
    /// Walks catalog ids from a random start, wrapping at the total, until a
    /// sealed non-empty object turns up or the probe budget runs out. Deleted
    /// ids leave holes, hence the walk.
    fn sample_target(
        &self,
        tx: &ChallengeStore<'_, KV>,
        ctx: &BlockContext,
        params: &Params,
        seed: &Seed,
    ) -> ChallengeResult<Option<ObjectTarget>> {
        let total = self.catalog.total_object_count();
        if total.is_zero() {
            return Ok(None);
        }

        let Some(object) = self.probe_object(seed, total)? else {
            debug!(height = ctx.height, "[challenge] no challengeable object found");
            return Ok(None);
        };

        let Some(bucket) = self.catalog.bucket_info(&object.bucket_name) else {
            return Ok(None);
        };
        let replicas = 1 + object.secondary_operators.len() as u64;
        let redundancy_index = random_redundancy_index(seed, replicas)?;
        let operator_id = match redundancy_index.secondary_position() {
            None => bucket.primary_operator_id,
            Some(position) => match object.secondary_operators.get(position) {
                Some(id) => *id,
                None => return Ok(None),
            },
        };

        match self.operators.operator(operator_id) {
            Some(operator) if operator.is_in_service() => {}
            _ => {
                debug!(operator_id, object_id = %object.id, "[challenge] operator unavailable, skipping draw");
                return Ok(None);
            }
        }
        if Self::cooling_off_until(tx, ctx, params, operator_id, &object.id)?.is_some() {
            debug!(operator_id, object_id = %object.id, "[challenge] pair cooling off, skipping draw");
            return Ok(None);
        }

        let segments = segment_count(object.payload_size, self.catalog.max_segment_size())?;
        let segment_index = random_segment_index(seed, segments)?;

        Ok(Some(ObjectTarget {
            object_id: object.id,
            operator_id,
            segment_index,
            redundancy_index,
            challenger: None,
        }))
    }

    fn probe_object(&self, seed: &Seed, total: U256) -> ChallengeResult<Option<ObjectInfo>> {
        // 0-based offset of the first probe; ids are 1-based
        let start = random_object_id(seed, total)?.0 - U256::one();
        let until_wrap = total - start;
        let probes = total.min(U256::from(self.config.max_object_probes)).low_u64();

        for step in (0..probes).map(U256::from) {
            let offset = if step < until_wrap {
                start + step
            } else {
                step - until_wrap
            };
            let id = ObjectId(offset + U256::one());
            if let Some(object) = self.catalog.object_info_by_id(&id) {
                if object.is_sealed() && object.payload_size > 0 {
                    return Ok(Some(object));
                }
            }
        }
        Ok(None)
    }
}
