//! Call message types for the market module.

use borsh::{BorshDeserialize, BorshSerialize};
use market_types::{Address, GatewayAttestation};

/// Call messages for the market module.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize)]
pub enum MarketCall {
    // === Market Lifecycle ===
    /// Open a new binary market.
    CreateMarket { question: String, duration_secs: u64 },

    /// Stake the attached call value on an outcome.
    PlaceBet { market_id: u64, prediction: bool },

    // === Resolution ===
    /// Ask the gateway to open the market's encrypted pools (creator only).
    RequestResolution { market_id: u64 },

    /// Deliver gateway cleartexts with an attestation (any sender).
    ResolveMarketCallback {
        request_id: u64,
        cleartexts: Vec<u64>,
        attestation: GatewayAttestation,
    },

    /// Switch a market whose gateway went silent into refund mode.
    EnableRefundForTimeout { market_id: u64 },

    /// Sweep the vault long after an abandoned market ended (creator only).
    EmergencyWithdraw { market_id: u64 },

    // === Claims ===
    /// Claim winnings from a resolved market.
    ClaimWinnings { market_id: u64 },

    /// Reclaim the original stake from a refund-enabled market.
    ClaimRefund { market_id: u64 },

    // === Admin ===
    /// Pause or resume market creation and bet intake (owner only).
    SetPaused { paused: bool },

    /// Hand module ownership to a new address (owner only).
    TransferOwnership { new_owner: Address },

    /// Rotate the trusted gateway public key (owner only).
    UpdateGatewayKey { gateway_key: [u8; 32] },
}
