//! Governance parameters
//!
//! Persisted under the params key and only changed through `UpdateParams`.

use crate::error::{ChallengeError, ChallengeResult};
use serde::{Deserialize, Serialize};

/// Denominator for all `*_bps` ratios.
pub const BPS_DENOMINATOR: u128 = 10_000;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Params {
    /// Challenges opened per block (random draws top up to this number)
    pub challenge_count_per_block: u64,
    /// Blocks an open challenge stays attestable
    pub challenge_keep_alive_period: u64,
    /// Blocks during which a slashed (operator, object) pair cannot be challenged
    pub slash_cooling_off_period: u64,
    /// Slash amount per payload byte before clamping
    pub slash_amount_per_byte: u128,
    pub slash_amount_min: u128,
    pub slash_amount_max: u128,
    /// Validators' share of a slash (basis points)
    pub reward_validator_ratio_bps: u32,
    /// Attestation submitter's share of a slash or heartbeat reward (basis points)
    pub reward_submitter_ratio_bps: u32,
    /// Upper bound on any single submitter reward
    pub reward_submitter_threshold: u128,
    /// Every challenge id divisible by this is a heartbeat
    pub heartbeat_interval: u64,
    /// Seconds each validator holds the heartbeat submission turn
    pub attestation_inturn_interval: u64,
    /// Capacity of the attested-challenge ring buffer
    pub attestation_kept_count: u64,
    /// Maximum total slash per operator within one counting window
    pub sp_slash_max_amount: u128,
    /// Blocks per slash counting window
    pub sp_slash_counting_window: u64,
}

impl Default for Params {
    fn default() -> Self {
        Self {
            challenge_count_per_block: 1,
            challenge_keep_alive_period: 300,
            slash_cooling_off_period: 300,
            slash_amount_per_byte: 85,
            slash_amount_min: 1_000_000,
            slash_amount_max: 100_000_000_000,
            reward_validator_ratio_bps: 9_000,
            reward_submitter_ratio_bps: 100,
            reward_submitter_threshold: 1_000_000_000,
            heartbeat_interval: 1_000,
            attestation_inturn_interval: 120,
            attestation_kept_count: 300,
            sp_slash_max_amount: 1_000_000_000_000,
            sp_slash_counting_window: 43_200,
        }
    }
}

impl Params {
    pub fn validate(&self) -> ChallengeResult<()> {
        fn invalid(reason: &str) -> ChallengeResult<()> {
            Err(ChallengeError::InvalidParams {
                reason: reason.to_string(),
            })
        }

        if self.challenge_keep_alive_period == 0 {
            return invalid("challenge_keep_alive_period must be positive");
        }
        // interval 1 would turn every id into a heartbeat
        if self.heartbeat_interval < 2 {
            return invalid("heartbeat_interval must be at least 2");
        }
        if self.attestation_inturn_interval == 0 {
            return invalid("attestation_inturn_interval must be positive");
        }
        if self.sp_slash_counting_window == 0 {
            return invalid("sp_slash_counting_window must be positive");
        }
        if self.slash_amount_min > self.slash_amount_max {
            return invalid("slash_amount_min exceeds slash_amount_max");
        }
        let ratio_sum =
            u128::from(self.reward_validator_ratio_bps) + u128::from(self.reward_submitter_ratio_bps);
        if ratio_sum > BPS_DENOMINATOR {
            return invalid("reward ratios exceed 10000 bps");
        }
        Ok(())
    }

    pub fn is_heartbeat_id(&self, challenge_id: u64) -> bool {
        self.heartbeat_interval != 0 && challenge_id % self.heartbeat_interval == 0
    }
}

/// `amount * bps / 10000` without overflow for any realistic amount.
pub fn apply_bps(amount: u128, bps: u32) -> u128 {
    let bps = u128::from(bps);
    (amount / BPS_DENOMINATOR) * bps + (amount % BPS_DENOMINATOR) * bps / BPS_DENOMINATOR
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params_are_valid() {
        assert!(Params::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_degenerate_heartbeat_interval() {
        for interval in [0, 1] {
            let params = Params {
                heartbeat_interval: interval,
                ..Params::default()
            };
            assert!(matches!(
                params.validate(),
                Err(ChallengeError::InvalidParams { .. })
            ));
        }
    }

    #[test]
    fn test_rejects_ratio_overflow() {
        let params = Params {
            reward_validator_ratio_bps: 9_950,
            reward_submitter_ratio_bps: 100,
            ..Params::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_apply_bps() {
        assert_eq!(apply_bps(10_000, 100), 100);
        assert_eq!(apply_bps(12_345, 5_000), 6_172);
        assert_eq!(apply_bps(u128::MAX, 10_000), u128::MAX);
    }

    #[test]
    fn test_heartbeat_ids() {
        let params = Params {
            heartbeat_interval: 4,
            ..Params::default()
        };
        assert!(params.is_heartbeat_id(8));
        assert!(!params.is_heartbeat_id(9));
    }
}
