//! Message handlers: Submit, Attest, Heartbeat, UpdateParams

use super::{log_rejection, ChallengeService};
use crate::domain::selector::{random_segment_index, segment_count};
use crate::domain::slashing::{heartbeat_reward, slash_amount, split_slash};
use crate::domain::{
    attestation_digest, heartbeat_digest, in_turn_window, verify_vote, AttestedChallenge,
    BlockContext, Challenge, ChallengeId, ChallengeOrigin, ChallengeTarget, ObjectTarget,
    OpenChallenge, Params, RecentSlash, RedundancyIndex, SlashOrder, ValidatorSnapshot,
    VoteResult,
};
use crate::error::{ChallengeError, ChallengeResult};
use crate::events::ChallengeEvent;
use crate::ports::{
    AttestReceipt, BucketInfo, ChallengeMsgServer, MsgAttest, MsgHeartbeat, MsgSubmit,
    MsgUpdateParams, ObjectCatalog, ObjectInfo, OperatorInfo, OperatorRef, OperatorRegistry,
    RewardPool, ValidatorRegistry,
};
use crate::state::{AttestedRing, ChallengeStore};
use shared_types::{Address, KeyValueStore, OperatorId};
use tracing::info;

/// Redundancy slot `operator_id` holds for `object`, if any.
fn redundancy_of(
    operator_id: OperatorId,
    bucket: &BucketInfo,
    object: &ObjectInfo,
) -> Option<RedundancyIndex> {
    if bucket.primary_operator_id == operator_id {
        return Some(RedundancyIndex::PRIMARY);
    }
    object
        .secondary_operators
        .iter()
        .position(|id| *id == operator_id)
        .map(RedundancyIndex::secondary)
}

impl<KV, OR, OC, VR, RP> ChallengeService<KV, OR, OC, VR, RP>
where
    KV: KeyValueStore,
    OR: OperatorRegistry,
    OC: ObjectCatalog,
    VR: ValidatorRegistry,
    RP: RewardPool,
{
    fn resolve_operator(&self, operator: &OperatorRef) -> ChallengeResult<OperatorInfo> {
        match operator {
            OperatorRef::Id(id) => self
                .operators
                .operator(*id)
                .ok_or(ChallengeError::UnknownOperator { operator_id: *id }),
            OperatorRef::Address(address) => self
                .operators
                .operator_by_address(address)
                .ok_or(ChallengeError::UnknownOperatorAddress { address: *address }),
        }
    }

    pub(super) fn snapshot_at(&self, ctx: &BlockContext) -> ChallengeResult<ValidatorSnapshot> {
        let snapshot = self
            .validators
            .historical_validator_set(ctx.height)
            .ok_or(ChallengeError::ValidatorSetNotFound { height: ctx.height })?;
        if snapshot.is_empty() {
            return Err(ChallengeError::EmptyValidatorSet { height: ctx.height });
        }
        Ok(snapshot)
    }

    /// Load an open, unexpired challenge.
    fn live_challenge(
        tx: &ChallengeStore<'_, KV>,
        ctx: &BlockContext,
        challenge_id: ChallengeId,
    ) -> ChallengeResult<OpenChallenge> {
        let open = tx
            .open_challenge(challenge_id)?
            .ok_or(ChallengeError::UnknownChallenge { challenge_id })?;
        if open.challenge.is_expired_at(ctx.height) {
            return Err(ChallengeError::ChallengeExpired {
                challenge_id,
                expired_height: open.challenge.expired_height,
            });
        }
        Ok(open)
    }

    // =========================================================================
    // Submit
    // =========================================================================

    fn handle_submit(
        &self,
        tx: &mut ChallengeStore<'_, KV>,
        ctx: &BlockContext,
        msg: &MsgSubmit,
    ) -> ChallengeResult<(ChallengeId, Vec<ChallengeEvent>)> {
        let params = tx.params()?;

        let operator = self.resolve_operator(&msg.operator)?;
        if !operator.is_in_service() {
            return Err(ChallengeError::OperatorNotInService {
                operator_id: operator.id,
            });
        }

        let bucket = self
            .catalog
            .bucket_info(&msg.bucket_name)
            .ok_or_else(|| ChallengeError::UnknownBucket {
                bucket: msg.bucket_name.clone(),
            })?;
        let object = self
            .catalog
            .object_info(&msg.bucket_name, &msg.object_name)
            .ok_or_else(|| ChallengeError::UnknownObject {
                bucket: msg.bucket_name.clone(),
                object: msg.object_name.clone(),
            })?;
        if !object.is_sealed() {
            return Err(ChallengeError::ObjectNotSealed {
                object_id: object.id,
            });
        }
        if object.payload_size == 0 {
            return Err(ChallengeError::EmptyObject {
                object_id: object.id,
            });
        }

        let redundancy_index = redundancy_of(operator.id, &bucket, &object).ok_or(
            ChallengeError::NotStoredByOperator {
                operator_id: operator.id,
                object_id: object.id,
            },
        )?;

        if let Some(until_height) =
            Self::cooling_off_until(tx, ctx, &params, operator.id, &object.id)?
        {
            return Err(ChallengeError::RecentlySlashed {
                operator_id: operator.id,
                object_id: object.id,
                until_height,
            });
        }

        let opened = tx.opened_this_block()?;
        if opened >= params.challenge_count_per_block {
            return Err(ChallengeError::ChallengeCapReached { count: opened });
        }

        let segments = segment_count(object.payload_size, self.catalog.max_segment_size())?;
        if !msg.random_index && u64::from(msg.segment_index) >= segments {
            return Err(ChallengeError::InvalidSegmentIndex {
                index: msg.segment_index,
                segments,
            });
        }

        let mut events = Vec::new();
        let id = Self::allocate_id(tx, ctx, &params, &mut events)?;
        let segment_index = if msg.random_index {
            let seed = self.randomness.seed(ctx).derive(&id.to_be_bytes());
            random_segment_index(&seed, segments)?
        } else {
            msg.segment_index
        };

        let target = ObjectTarget {
            object_id: object.id,
            operator_id: operator.id,
            segment_index,
            redundancy_index,
            challenger: Some(msg.challenger),
        };
        let challenge = Challenge::new(id, Self::expiry_height(ctx, &params));
        Self::record_challenge(tx, challenge, target, ChallengeOrigin::Submitted, &mut events)?;
        tx.set_opened_this_block(opened + 1);

        Ok((id, events))
    }

    // =========================================================================
    // Attest
    // =========================================================================

    fn handle_attest(
        &self,
        tx: &mut ChallengeStore<'_, KV>,
        ctx: &BlockContext,
        msg: &MsgAttest,
    ) -> ChallengeResult<(AttestReceipt, Vec<ChallengeEvent>)> {
        let params = tx.params()?;
        let open = Self::live_challenge(tx, ctx, msg.challenge_id)?;
        let target = match open.target {
            ChallengeTarget::Object(target) => target,
            ChallengeTarget::Heartbeat => {
                return Err(ChallengeError::HeartbeatChallenge {
                    challenge_id: msg.challenge_id,
                })
            }
        };
        if target.object_id != msg.object_id
            || target.operator_id != msg.operator_id
            || target.challenger != msg.challenger_address
        {
            return Err(ChallengeError::TargetMismatch {
                challenge_id: msg.challenge_id,
            });
        }

        let snapshot = self.snapshot_at(ctx)?;
        let digest = attestation_digest(
            &self.config.chain_id,
            msg.challenge_id,
            &target.object_id,
            target.operator_id,
            msg.vote_result,
            target.challenger.as_ref(),
        );
        let participants = verify_vote(
            &snapshot,
            &msg.vote_validator_set,
            &digest,
            &msg.vote_agg_signature,
        )?;
        if !participants.contains(&msg.submitter) {
            return Err(ChallengeError::SubmitterNotVoter {
                submitter: msg.submitter,
            });
        }

        AttestedRing::enqueue(
            tx,
            &AttestedChallenge::from_target(msg.challenge_id, msg.vote_result, &target),
        )?;
        tx.set_latest_attested_id(msg.challenge_id);
        tx.remove_challenge(&open.challenge);

        let slash = match msg.vote_result {
            VoteResult::Succeed => None,
            VoteResult::Failed => Some(self.slash_operator(
                tx,
                ctx,
                &params,
                &open.challenge,
                &target,
                msg.submitter,
            )?),
        };

        let event = ChallengeEvent::Attested {
            challenge_id: msg.challenge_id,
            result: msg.vote_result,
            operator_id: target.operator_id,
            object_id: target.object_id,
            submitter: msg.submitter,
            slash_amount: slash.as_ref().map(|order| order.amount).unwrap_or(0),
        };
        let receipt = AttestReceipt {
            challenge_id: msg.challenge_id,
            result: msg.vote_result,
            slash,
        };
        Ok((receipt, vec![event]))
    }

    /// Stage the cooling-off marker and window accumulator, then slash.
    ///
    /// The marker is written to the overlay before the registry is called, so
    /// a failing slash discards both together.
    fn slash_operator(
        &self,
        tx: &mut ChallengeStore<'_, KV>,
        ctx: &BlockContext,
        params: &Params,
        challenge: &Challenge,
        target: &ObjectTarget,
        submitter: Address,
    ) -> ChallengeResult<SlashOrder> {
        let object = self
            .catalog
            .object_info_by_id(&target.object_id)
            .ok_or(ChallengeError::UnknownObjectId {
                object_id: target.object_id,
            })?;

        let slashed_this_window = tx.sp_slash_amount(target.operator_id)?;
        let amount = slash_amount(params, object.payload_size, slashed_this_window);
        let rewards = split_slash(
            params,
            amount,
            self.config.reward_pool,
            submitter,
            target.challenger,
        );
        let order = SlashOrder {
            challenge_id: challenge.id,
            operator_id: target.operator_id,
            object_id: target.object_id,
            amount,
            rewards,
        };

        tx.set_recent_slash(&RecentSlash {
            operator_id: target.operator_id,
            object_id: target.object_id,
            height: ctx.height,
        });
        tx.set_sp_slash_amount(
            target.operator_id,
            slashed_this_window.saturating_add(amount),
        );

        self.operators
            .slash(&order)
            .map_err(|e| ChallengeError::SlashFailed {
                operator_id: target.operator_id,
                reason: e.reason,
            })?;
        Ok(order)
    }

    // =========================================================================
    // Heartbeat
    // =========================================================================

    fn handle_heartbeat(
        &self,
        tx: &mut ChallengeStore<'_, KV>,
        ctx: &BlockContext,
        msg: &MsgHeartbeat,
    ) -> ChallengeResult<(u128, Vec<ChallengeEvent>)> {
        let params = tx.params()?;
        let open = Self::live_challenge(tx, ctx, msg.challenge_id)?;
        if !open.target.is_heartbeat() {
            return Err(ChallengeError::NotHeartbeatChallenge {
                challenge_id: msg.challenge_id,
            });
        }

        let snapshot = self.snapshot_at(ctx)?;
        let window = in_turn_window(ctx.time, params.attestation_inturn_interval, snapshot.len())?;
        let expected = snapshot
            .get(window.index)
            .map(|validator| validator.challenger_address)
            .ok_or_else(|| ChallengeError::corruption("in-turn index outside snapshot"))?;
        if msg.submitter != expected {
            return Err(ChallengeError::NotInTurn {
                submitter: msg.submitter,
                expected,
            });
        }

        let digest = heartbeat_digest(&self.config.chain_id, msg.challenge_id);
        verify_vote(
            &snapshot,
            &msg.vote_validator_set,
            &digest,
            &msg.vote_agg_signature,
        )?;

        tx.set_latest_attested_id(msg.challenge_id);
        tx.remove_challenge(&open.challenge);

        let reward = heartbeat_reward(&params, self.rewards.available_validator_rewards());
        if reward > 0 {
            self.rewards
                .transfer(&self.config.reward_pool, &msg.submitter, reward)
                .map_err(|e| ChallengeError::RewardTransferFailed {
                    recipient: msg.submitter,
                    reason: e.reason,
                })?;
        }

        let event = ChallengeEvent::HeartbeatAttested {
            challenge_id: msg.challenge_id,
            submitter: msg.submitter,
            reward,
        };
        Ok((reward, vec![event]))
    }

    // =========================================================================
    // UpdateParams
    // =========================================================================

    fn handle_update_params(
        tx: &mut ChallengeStore<'_, KV>,
        params: &Params,
    ) -> ChallengeResult<()> {
        let current = tx.params()?;
        tx.set_params(params)?;
        if current.attestation_kept_count != params.attestation_kept_count {
            AttestedRing::resize(tx, params.attestation_kept_count)?;
        }
        Ok(())
    }
}

impl<KV, OR, OC, VR, RP> ChallengeMsgServer for ChallengeService<KV, OR, OC, VR, RP>
where
    KV: KeyValueStore,
    OR: OperatorRegistry,
    OC: ObjectCatalog,
    VR: ValidatorRegistry,
    RP: RewardPool,
{
    fn submit(&mut self, ctx: &BlockContext, msg: MsgSubmit) -> ChallengeResult<ChallengeId> {
        let (batch, (id, events)) = self
            .transact(|tx| self.handle_submit(tx, ctx, &msg))
            .inspect_err(|e| log_rejection("submit", e))?;
        self.commit(batch, events)?;
        Ok(id)
    }

    fn attest(&mut self, ctx: &BlockContext, msg: MsgAttest) -> ChallengeResult<AttestReceipt> {
        let (batch, (receipt, events)) = self
            .transact(|tx| self.handle_attest(tx, ctx, &msg))
            .inspect_err(|e| log_rejection("attest", e))?;
        self.commit(batch, events)?;
        Ok(receipt)
    }

    fn heartbeat(&mut self, ctx: &BlockContext, msg: MsgHeartbeat) -> ChallengeResult<u128> {
        let (batch, (reward, events)) = self
            .transact(|tx| self.handle_heartbeat(tx, ctx, &msg))
            .inspect_err(|e| log_rejection("heartbeat", e))?;
        self.commit(batch, events)?;
        Ok(reward)
    }

    fn update_params(&mut self, msg: MsgUpdateParams) -> ChallengeResult<()> {
        if msg.authority != self.config.authority {
            let err = ChallengeError::Unauthorized {
                signer: msg.authority,
            };
            log_rejection("update_params", &err);
            return Err(err);
        }
        msg.params
            .validate()
            .inspect_err(|e| log_rejection("update_params", e))?;

        let (batch, ()) = self
            .transact(|tx| Self::handle_update_params(tx, &msg.params))
            .inspect_err(|e| log_rejection("update_params", e))?;
        self.commit(batch, Vec::new())?;
        info!(
            kept_count = msg.params.attestation_kept_count,
            per_block = msg.params.challenge_count_per_block,
            "[challenge] params updated"
        );
        Ok(())
    }
}
