//! Node-level configuration from environment variables.
//!
//! Governance-controlled values live in `Params`; this holds what a node
//! operator sets once at startup.

use crate::error::{ChallengeError, ChallengeResult};
use shared_types::Address;
use std::env;

/// Static configuration of the challenge subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChallengeConfig {
    /// Chain identifier mixed into every signed digest
    pub chain_id: String,

    /// Only signer allowed to update params
    pub authority: Address,

    /// Validator-reward distribution account
    pub reward_pool: Address,

    /// Catalog ids a random draw inspects before giving up
    pub max_object_probes: u64,
}

impl Default for ChallengeConfig {
    fn default() -> Self {
        Self {
            chain_id: "storage-devnet-1".to_string(),
            authority: Address([0xAA; 20]),
            reward_pool: Address([0xEE; 20]),
            max_object_probes: 16,
        }
    }
}

impl ChallengeConfig {
    /// Create configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `CHALLENGE_CHAIN_ID`: Chain id (default: storage-devnet-1)
    /// - `CHALLENGE_AUTHORITY`: Governance address, 0x-prefixed hex
    /// - `CHALLENGE_REWARD_POOL`: Reward pool address, 0x-prefixed hex
    /// - `CHALLENGE_MAX_OBJECT_PROBES`: Probe budget per random draw (default: 16)
    ///
    /// Unset variables keep their defaults; malformed ones are an error.
    pub fn from_env() -> ChallengeResult<Self> {
        let defaults = Self::default();

        let chain_id = env::var("CHALLENGE_CHAIN_ID").unwrap_or(defaults.chain_id);
        let authority = address_var("CHALLENGE_AUTHORITY")?.unwrap_or(defaults.authority);
        let reward_pool = address_var("CHALLENGE_REWARD_POOL")?.unwrap_or(defaults.reward_pool);
        let max_object_probes = match env::var("CHALLENGE_MAX_OBJECT_PROBES") {
            Ok(raw) => raw.parse().map_err(|_| ChallengeError::InvalidConfig {
                reason: format!("CHALLENGE_MAX_OBJECT_PROBES is not a number: {}", raw),
            })?,
            Err(_) => defaults.max_object_probes,
        };

        let config = Self {
            chain_id,
            authority,
            reward_pool,
            max_object_probes,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ChallengeResult<()> {
        if self.chain_id.is_empty() {
            return Err(ChallengeError::InvalidConfig {
                reason: "chain_id must not be empty".to_string(),
            });
        }
        if self.max_object_probes == 0 {
            return Err(ChallengeError::InvalidConfig {
                reason: "max_object_probes must be positive".to_string(),
            });
        }
        Ok(())
    }
}

fn address_var(name: &str) -> ChallengeResult<Option<Address>> {
    match env::var(name) {
        Ok(raw) => raw
            .parse::<Address>()
            .map(Some)
            .map_err(|e| ChallengeError::InvalidConfig {
                reason: format!("{}: {}", name, e),
            }),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(ChallengeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_probes_rejected() {
        let config = ChallengeConfig {
            max_object_probes: 0,
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ChallengeError::InvalidConfig { .. })
        ));
    }

    // Single test touches the environment to avoid races between tests.
    #[test]
    fn test_from_env() {
        env::set_var("CHALLENGE_CHAIN_ID", "storage-test-7");
        env::set_var(
            "CHALLENGE_AUTHORITY",
            "0x0101010101010101010101010101010101010101",
        );
        env::set_var("CHALLENGE_MAX_OBJECT_PROBES", "4");
        let config = ChallengeConfig::from_env().unwrap();
        assert_eq!(config.chain_id, "storage-test-7");
        assert_eq!(config.authority, Address([1; 20]));
        assert_eq!(config.reward_pool, ChallengeConfig::default().reward_pool);
        assert_eq!(config.max_object_probes, 4);

        env::set_var("CHALLENGE_MAX_OBJECT_PROBES", "many");
        assert!(ChallengeConfig::from_env().is_err());

        env::remove_var("CHALLENGE_CHAIN_ID");
        env::remove_var("CHALLENGE_AUTHORITY");
        env::remove_var("CHALLENGE_MAX_OBJECT_PROBES");
    }
}
