//! Genesis configuration for the market module.
//!
//! This module defines the initial state and configuration for the market
//! system when the chain starts.

use market_types::{constants, Address};
use serde::{Deserialize, Serialize};

/// Genesis configuration for the market module.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketGenesisConfig {
    /// Module owner, allowed to pause and rotate the gateway key
    pub owner: Address,

    /// Ed25519 public key of the decryption gateway. Callbacks must carry
    /// an attestation by this key to be accepted.
    pub gateway_key: [u8; 32],

    /// Whether the module starts paused
    pub paused: bool,

    /// Stake band and timeout parameters
    pub params: MarketParams,
}

/// Tunable parameters for markets.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketParams {
    /// Minimum stake per bet
    pub min_bet: u64,
    /// Maximum stake per bet
    pub max_bet: u64,
    /// Gateway silence tolerated before refunds can be enabled (seconds)
    pub decryption_timeout_secs: u64,
    /// Delay past market end before the creator may sweep (seconds)
    pub emergency_timeout_secs: u64,
}

impl Default for MarketParams {
    fn default() -> Self {
        Self {
            min_bet: constants::MIN_BET,
            max_bet: constants::MAX_BET,
            decryption_timeout_secs: constants::DECRYPTION_TIMEOUT_SECS,
            emergency_timeout_secs: constants::EMERGENCY_TIMEOUT_SECS,
        }
    }
}

impl Default for MarketGenesisConfig {
    fn default() -> Self {
        Self {
            owner: [0u8; 32],
            gateway_key: [0u8; 32],
            paused: false,
            params: MarketParams::default(),
        }
    }
}

impl MarketGenesisConfig {
    /// Create a genesis config with an owner and a registered gateway key.
    pub fn with_gateway(owner: Address, gateway_key: [u8; 32]) -> Self {
        Self {
            owner,
            gateway_key,
            ..Default::default()
        }
    }

    /// Validate the genesis configuration.
    pub fn validate(&self) -> Result<(), GenesisValidationError> {
        if self.params.min_bet == 0 {
            return Err(GenesisValidationError::InvalidStakeBand(
                "Minimum bet cannot be zero".into(),
            ));
        }
        if self.params.min_bet > self.params.max_bet {
            return Err(GenesisValidationError::InvalidStakeBand(
                "Minimum bet cannot exceed maximum bet".into(),
            ));
        }

        if self.params.decryption_timeout_secs == 0 {
            return Err(GenesisValidationError::InvalidTimeouts(
                "Decryption timeout cannot be zero".into(),
            ));
        }
        if self.params.emergency_timeout_secs == 0 {
            return Err(GenesisValidationError::InvalidTimeouts(
                "Emergency timeout cannot be zero".into(),
            ));
        }
        // Refunds must become possible before the creator can sweep.
        if self.params.emergency_timeout_secs < self.params.decryption_timeout_secs {
            return Err(GenesisValidationError::InvalidTimeouts(
                "Emergency timeout cannot be shorter than the decryption timeout".into(),
            ));
        }

        Ok(())
    }
}

/// Errors that can occur during genesis validation.
#[derive(Debug, Clone, thiserror::Error)]
pub enum GenesisValidationError {
    #[error("Invalid stake band: {0}")]
    InvalidStakeBand(String),

    #[error("Invalid timeout configuration: {0}")]
    InvalidTimeouts(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = MarketGenesisConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_min_bet() {
        let mut config = MarketGenesisConfig::default();
        config.params.min_bet = 0;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidStakeBand(_))
        ));
    }

    #[test]
    fn test_inverted_stake_band() {
        let mut config = MarketGenesisConfig::default();
        config.params.min_bet = 100;
        config.params.max_bet = 50;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidStakeBand(_))
        ));
    }

    #[test]
    fn test_zero_timeout() {
        let mut config = MarketGenesisConfig::default();
        config.params.decryption_timeout_secs = 0;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidTimeouts(_))
        ));
    }

    #[test]
    fn test_emergency_shorter_than_decryption() {
        let mut config = MarketGenesisConfig::default();
        config.params.decryption_timeout_secs = 100;
        config.params.emergency_timeout_secs = 99;
        assert!(matches!(
            config.validate(),
            Err(GenesisValidationError::InvalidTimeouts(_))
        ));
    }

    #[test]
    fn test_with_gateway() {
        let config = MarketGenesisConfig::with_gateway([1u8; 32], [2u8; 32]);
        assert_eq!(config.owner, [1u8; 32]);
        assert_eq!(config.gateway_key, [2u8; 32]);
        assert!(!config.paused);
        assert!(config.validate().is_ok());
    }
}
