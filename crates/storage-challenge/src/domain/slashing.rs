//! # Slash Sizing and Reward Split
//!
//! ## Slash amount
//!
//! ```text
//! raw    = payload_size * slash_amount_per_byte
//! amount = min(clamp(raw, min, max), sp_slash_max_amount - slashed_this_window)
//! ```
//!
//! ## Split
//!
//! - validators: `amount * reward_validator_ratio_bps`, paid to the reward pool
//! - submitter:  `min(amount * reward_submitter_ratio_bps, threshold)`
//! - challenger: the remainder; without a challenger it goes to validators

use super::challenge::ChallengeId;
use super::params::{apply_bps, Params};
use serde::{Deserialize, Serialize};
use shared_types::{Address, ObjectId, OperatorId};

/// One payout carved out of a slash or heartbeat.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardShare {
    pub recipient: Address,
    pub amount: u128,
}

/// Instruction handed to the operator registry's slashing capability.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlashOrder {
    pub challenge_id: ChallengeId,
    pub operator_id: OperatorId,
    pub object_id: ObjectId,
    pub amount: u128,
    pub rewards: Vec<RewardShare>,
}

impl SlashOrder {
    pub fn distributed(&self) -> u128 {
        self.rewards.iter().map(|share| share.amount).sum()
    }
}

/// Slash for one failed object, capped by the operator's remaining allowance.
pub fn slash_amount(params: &Params, payload_size: u64, slashed_this_window: u128) -> u128 {
    let raw = u128::from(payload_size).saturating_mul(params.slash_amount_per_byte);
    let clamped = raw.clamp(params.slash_amount_min, params.slash_amount_max);
    let allowance = params.sp_slash_max_amount.saturating_sub(slashed_this_window);
    clamped.min(allowance)
}

/// Split a slash between validators, submitter and challenger.
pub fn split_slash(
    params: &Params,
    amount: u128,
    reward_pool: Address,
    submitter: Address,
    challenger: Option<Address>,
) -> Vec<RewardShare> {
    let mut validators = apply_bps(amount, params.reward_validator_ratio_bps);
    let submitter_reward =
        apply_bps(amount, params.reward_submitter_ratio_bps).min(params.reward_submitter_threshold);
    let remainder = amount
        .saturating_sub(validators)
        .saturating_sub(submitter_reward);

    let mut shares = Vec::with_capacity(3);
    match challenger {
        Some(challenger) if remainder > 0 => shares.push(RewardShare {
            recipient: challenger,
            amount: remainder,
        }),
        _ => validators += remainder,
    }
    if submitter_reward > 0 {
        shares.push(RewardShare {
            recipient: submitter,
            amount: submitter_reward,
        });
    }
    if validators > 0 {
        shares.push(RewardShare {
            recipient: reward_pool,
            amount: validators,
        });
    }
    shares
}

/// Heartbeat submitter reward drawn from the validator reward pool.
pub fn heartbeat_reward(params: &Params, available_validator_rewards: u128) -> u128 {
    apply_bps(available_validator_rewards, params.reward_submitter_ratio_bps)
        .min(params.reward_submitter_threshold)
}

#[cfg(test)]
mod tests {
    use super::*;

    const POOL: Address = Address([0xEE; 20]);
    const SUBMITTER: Address = Address([0x01; 20]);
    const CHALLENGER: Address = Address([0x02; 20]);

    fn params() -> Params {
        Params {
            slash_amount_per_byte: 10,
            slash_amount_min: 100,
            slash_amount_max: 10_000,
            reward_validator_ratio_bps: 6_000,
            reward_submitter_ratio_bps: 1_000,
            reward_submitter_threshold: 500,
            sp_slash_max_amount: 15_000,
            ..Params::default()
        }
    }

    #[test]
    fn test_slash_amount_is_clamped() {
        let params = params();
        assert_eq!(slash_amount(&params, 1, 0), 100);
        assert_eq!(slash_amount(&params, 500, 0), 5_000);
        assert_eq!(slash_amount(&params, 5_000_000, 0), 10_000);
    }

    #[test]
    fn test_slash_amount_respects_window_allowance() {
        let params = params();
        assert_eq!(slash_amount(&params, 5_000_000, 10_000), 5_000);
        assert_eq!(slash_amount(&params, 5_000_000, 15_000), 0);
        assert_eq!(slash_amount(&params, 5_000_000, 20_000), 0);
    }

    #[test]
    fn test_split_with_challenger() {
        let shares = split_slash(&params(), 1_000, POOL, SUBMITTER, Some(CHALLENGER));
        assert_eq!(
            shares,
            vec![
                RewardShare { recipient: CHALLENGER, amount: 300 },
                RewardShare { recipient: SUBMITTER, amount: 100 },
                RewardShare { recipient: POOL, amount: 600 },
            ]
        );
    }

    #[test]
    fn test_split_without_challenger_goes_to_validators() {
        let shares = split_slash(&params(), 1_000, POOL, SUBMITTER, None);
        assert_eq!(
            shares,
            vec![
                RewardShare { recipient: SUBMITTER, amount: 100 },
                RewardShare { recipient: POOL, amount: 900 },
            ]
        );
    }

    #[test]
    fn test_submitter_share_is_capped() {
        let shares = split_slash(&params(), 10_000, POOL, SUBMITTER, Some(CHALLENGER));
        let total: u128 = shares.iter().map(|s| s.amount).sum();
        assert_eq!(total, 10_000);
        assert!(shares.contains(&RewardShare { recipient: SUBMITTER, amount: 500 }));
    }

    #[test]
    fn test_heartbeat_reward() {
        assert_eq!(heartbeat_reward(&params(), 2_000), 200);
        assert_eq!(heartbeat_reward(&params(), 1_000_000), 500);
        assert_eq!(heartbeat_reward(&params(), 0), 0);
    }
}
