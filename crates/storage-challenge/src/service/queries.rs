//! Read-only queries over committed state

use super::ChallengeService;
use crate::domain::{
    in_turn_window, AttestedChallenge, BlockContext, ChallengeId, OpenChallenge, Params,
    RecentSlash,
};
use crate::error::{ChallengeError, ChallengeResult};
use crate::ports::{
    ChallengeQueries, InTurnSubmitter, ObjectCatalog, OperatorRegistry, Page, PageRequest,
    RewardPool, ValidatorRegistry,
};
use crate::state::AttestedRing;
use shared_types::{KeyValueStore, ObjectId, OperatorId};

impl<KV, OR, OC, VR, RP> ChallengeQueries for ChallengeService<KV, OR, OC, VR, RP>
where
    KV: KeyValueStore,
    OR: OperatorRegistry,
    OC: ObjectCatalog,
    VR: ValidatorRegistry,
    RP: RewardPool,
{
    fn params(&self) -> ChallengeResult<Params> {
        self.view().params()
    }

    fn challenge(&self, id: ChallengeId) -> ChallengeResult<OpenChallenge> {
        self.view()
            .open_challenge(id)?
            .ok_or(ChallengeError::UnknownChallenge { challenge_id: id })
    }

    fn challenges(&self, page: &PageRequest) -> ChallengeResult<Page<OpenChallenge>> {
        Ok(page.paginate(self.view().open_challenges()?))
    }

    fn recent_slash(
        &self,
        operator_id: OperatorId,
        object_id: &ObjectId,
    ) -> ChallengeResult<Option<RecentSlash>> {
        self.view().recent_slash(operator_id, object_id)
    }

    fn recent_slashes(&self, page: &PageRequest) -> ChallengeResult<Page<RecentSlash>> {
        Ok(page.paginate(self.view().recent_slashes()?))
    }

    fn sp_slash_amount(&self, operator_id: OperatorId) -> ChallengeResult<u128> {
        self.view().sp_slash_amount(operator_id)
    }

    fn latest_attested_challenge_id(&self) -> ChallengeResult<ChallengeId> {
        self.view().latest_attested_id()
    }

    fn latest_attested_challenges(&self) -> ChallengeResult<Vec<AttestedChallenge>> {
        AttestedRing::retrieve_all(&self.view())
    }

    fn inturn_attestation_submitter(&self, ctx: &BlockContext) -> ChallengeResult<InTurnSubmitter> {
        let params = self.view().params()?;
        let snapshot = self.snapshot_at(ctx)?;
        let window = in_turn_window(ctx.time, params.attestation_inturn_interval, snapshot.len())?;
        let validator = snapshot
            .get(window.index)
            .ok_or_else(|| ChallengeError::corruption("in-turn index outside snapshot"))?;

        Ok(InTurnSubmitter {
            bls_public_key: validator.bls_public_key.clone(),
            challenger_address: validator.challenger_address,
            window,
        })
    }
}
