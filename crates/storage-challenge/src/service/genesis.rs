//! Genesis import and export

use super::ChallengeService;
use crate::domain::{AttestedChallenge, ChallengeId, Params};
use crate::error::{ChallengeError, ChallengeResult};
use crate::ports::{ObjectCatalog, OperatorRegistry, RewardPool, ValidatorRegistry};
use crate::state::{challenge_ids, AttestedRing, Sequence};
use serde::{Deserialize, Serialize};
use shared_types::KeyValueStore;
use tracing::info;

/// Portable snapshot of the subsystem's persistent state.
///
/// Open challenges, cooling-off markers and slash accumulators are not
/// carried over.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenesisState {
    pub params: Params,
    /// Last challenge id handed out; the next one is this plus one
    pub current_challenge_id: ChallengeId,
    pub latest_attested_challenge_id: ChallengeId,
    /// Oldest first
    pub attested_challenges: Vec<AttestedChallenge>,
}

impl GenesisState {
    pub fn validate(&self) -> ChallengeResult<()> {
        self.params.validate()?;
        if self.latest_attested_challenge_id > self.current_challenge_id {
            return Err(ChallengeError::InvalidParams {
                reason: format!(
                    "latest attested challenge {} is ahead of current challenge {}",
                    self.latest_attested_challenge_id, self.current_challenge_id
                ),
            });
        }
        Ok(())
    }

    pub fn to_json(&self) -> ChallengeResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| ChallengeError::Codec {
            reason: e.to_string(),
        })
    }

    pub fn from_json(json: &str) -> ChallengeResult<Self> {
        serde_json::from_str(json).map_err(|e| ChallengeError::Codec {
            reason: e.to_string(),
        })
    }
}

impl<KV, OR, OC, VR, RP> ChallengeService<KV, OR, OC, VR, RP>
where
    KV: KeyValueStore,
    OR: OperatorRegistry,
    OC: ObjectCatalog,
    VR: ValidatorRegistry,
    RP: RewardPool,
{
    /// Load genesis into an empty store.
    pub fn init_genesis(&mut self, genesis: &GenesisState) -> ChallengeResult<()> {
        genesis.validate()?;

        let (batch, ()) = self.transact(|tx| {
            tx.set_params(&genesis.params)?;
            challenge_ids().init_once(tx, genesis.current_challenge_id)?;
            AttestedRing::resize(tx, genesis.params.attestation_kept_count)?;
            for item in &genesis.attested_challenges {
                AttestedRing::enqueue(tx, item)?;
            }
            if genesis.latest_attested_challenge_id > 0 {
                tx.set_latest_attested_id(genesis.latest_attested_challenge_id);
            }
            Ok(())
        })?;
        self.commit(batch, Vec::new())?;

        info!(
            current_challenge_id = genesis.current_challenge_id,
            attested = genesis.attested_challenges.len(),
            "[challenge] genesis initialised"
        );
        Ok(())
    }

    pub fn export_genesis(&self) -> ChallengeResult<GenesisState> {
        let view = self.view();
        Ok(GenesisState {
            params: view.params()?,
            current_challenge_id: view.current_challenge_id()?,
            latest_attested_challenge_id: view.latest_attested_id()?,
            attested_challenges: AttestedRing::retrieve_all(&view)?,
        })
    }
}
