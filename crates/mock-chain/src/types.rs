//! RPC-compatible types for the mock chain.
//!
//! These types are JSON-serializable versions of the core market types.
//! Addresses and ciphertext handles travel as hex strings; the u128 vault
//! counters travel as decimal strings.

use market_module::queries::{MarketSummary, PublicTotalsView};
use market_types::{BetCiphertexts, DecryptionStatus, Market, MarketStatus, PendingDecryption};
use serde::{Deserialize, Serialize};

/// Genesis configuration for RPC.
///
/// Fields left out fall back to defaults; a missing `gateway_key` keeps
/// the in-process gateway's key registered.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfigRpc {
    /// Hex-encoded owner address (32 bytes)
    pub owner: Option<String>,
    /// Hex-encoded Ed25519 verification key (32 bytes)
    pub gateway_key: Option<String>,
    pub paused: Option<bool>,
    pub initial_timestamp: Option<u64>,
}

/// Block info response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockInfo {
    pub height: u64,
    pub timestamp: u64,
}

/// Parameters for creating a market.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateMarketParams {
    pub sender: String,
    pub question: String,
    pub duration_secs: u64,
}

/// Parameters for placing a bet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceBetParams {
    pub sender: String,
    pub market_id: u64,
    pub prediction: bool,
    /// Stake attached to the call as value
    pub stake: u64,
}

/// Market details for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketRpc {
    pub market_id: u64,
    pub creator: String,
    pub question: String,
    pub status: String,
    pub created_at: u64,
    pub end_time: u64,
    /// Hex-encoded handle of the encrypted YES pool
    pub yes_cipher_total: String,
    /// Hex-encoded handle of the encrypted NO pool
    pub no_cipher_total: String,
    pub public_yes_total: u64,
    pub public_no_total: u64,
    pub decryption_request_id: Option<u64>,
    pub outcome: Option<bool>,
    pub settled_yes_pool: Option<u64>,
    pub settled_no_pool: Option<u64>,
    pub emergency_withdrawn: bool,
}

pub fn status_str(status: MarketStatus) -> &'static str {
    match status {
        MarketStatus::Active => "active",
        MarketStatus::DecryptionPending => "decryption_pending",
        MarketStatus::Resolved => "resolved",
        MarketStatus::RefundEnabled => "refund_enabled",
    }
}

impl From<&Market> for MarketRpc {
    fn from(m: &Market) -> Self {
        Self {
            market_id: m.id,
            creator: hex::encode(m.creator),
            question: m.question.clone(),
            status: status_str(m.status).to_string(),
            created_at: m.created_at,
            end_time: m.end_time,
            yes_cipher_total: m.yes_cipher_total.to_hex(),
            no_cipher_total: m.no_cipher_total.to_hex(),
            public_yes_total: m.public_yes_total,
            public_no_total: m.public_no_total,
            decryption_request_id: m.decryption_request_id,
            outcome: m.outcome,
            settled_yes_pool: m.settled_yes_pool,
            settled_no_pool: m.settled_no_pool,
            emergency_withdrawn: m.emergency_withdrawn,
        }
    }
}

/// Market summary for RPC listings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSummaryRpc {
    pub market_id: u64,
    pub creator: String,
    pub question: String,
    pub status: String,
    pub end_time: u64,
    pub public_yes_total: u64,
    pub public_no_total: u64,
    pub num_bettors: usize,
    pub outcome: Option<bool>,
}

impl From<&MarketSummary> for MarketSummaryRpc {
    fn from(s: &MarketSummary) -> Self {
        Self {
            market_id: s.market_id,
            creator: hex::encode(s.creator),
            question: s.question.clone(),
            status: status_str(s.status).to_string(),
            end_time: s.end_time,
            public_yes_total: s.public_yes_total,
            public_no_total: s.public_no_total,
            num_bettors: s.num_bettors,
            outcome: s.outcome,
        }
    }
}

/// Obfuscated public totals for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublicTotalsRpc {
    pub market_id: u64,
    pub yes_total: u64,
    pub no_total: u64,
}

impl From<PublicTotalsView> for PublicTotalsRpc {
    fn from(v: PublicTotalsView) -> Self {
        Self {
            market_id: v.market_id,
            yes_total: v.yes_total,
            no_total: v.no_total,
        }
    }
}

/// Bet ciphertext handles for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BetCiphertextsRpc {
    /// Hex-encoded handle (32 bytes)
    pub encrypted_amount: String,
    /// Hex-encoded handle (32 bytes)
    pub encrypted_prediction: String,
    /// Hex-encoded handle (32 bytes)
    pub obfuscated_value: String,
}

impl From<BetCiphertexts> for BetCiphertextsRpc {
    fn from(b: BetCiphertexts) -> Self {
        Self {
            encrypted_amount: b.encrypted_amount.to_hex(),
            encrypted_prediction: b.encrypted_prediction.to_hex(),
            obfuscated_value: b.obfuscated_value.to_hex(),
        }
    }
}

/// Outstanding decryption request for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingDecryptionRpc {
    pub request_id: u64,
    pub market_id: u64,
    /// Hex-encoded handles in callback order
    pub handles: Vec<String>,
    pub requested_at: u64,
    pub requested_height: u64,
}

impl From<&PendingDecryption> for PendingDecryptionRpc {
    fn from(p: &PendingDecryption) -> Self {
        Self {
            request_id: p.request_id,
            market_id: p.market_id,
            handles: p.handles.iter().map(|h| h.to_hex()).collect(),
            requested_at: p.requested_at,
            requested_height: p.requested_height,
        }
    }
}

/// Decryption progress for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecryptionStatusRpc {
    /// "not_requested", "pending", "completed", or "timed_out"
    pub state: String,
    pub request_id: Option<u64>,
    pub requested_at: Option<u64>,
    pub timed_out: Option<bool>,
}

impl From<DecryptionStatus> for DecryptionStatusRpc {
    fn from(status: DecryptionStatus) -> Self {
        match status {
            DecryptionStatus::NotRequested => Self {
                state: "not_requested".to_string(),
                request_id: None,
                requested_at: None,
                timed_out: None,
            },
            DecryptionStatus::Pending {
                request_id,
                requested_at,
                timed_out,
            } => Self {
                state: "pending".to_string(),
                request_id: Some(request_id),
                requested_at: Some(requested_at),
                timed_out: Some(timed_out),
            },
            DecryptionStatus::Completed => Self {
                state: "completed".to_string(),
                request_id: None,
                requested_at: None,
                timed_out: None,
            },
            DecryptionStatus::TimedOut => Self {
                state: "timed_out".to_string(),
                request_id: None,
                requested_at: None,
                timed_out: None,
            },
        }
    }
}

/// Vault totals for RPC responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultRpc {
    pub balance: u64,
    /// Decimal string, the counter is u128
    pub total_deposited: String,
    /// Decimal string, the counter is u128
    pub total_paid: String,
}

/// Parse a hex address, zero-padded on the right.
pub fn parse_address(s: &str) -> [u8; 32] {
    let mut addr = [0u8; 32];
    if let Ok(bytes) = hex::decode(s.trim_start_matches("0x")) {
        let len = bytes.len().min(32);
        addr[..len].copy_from_slice(&bytes[..len]);
    }
    addr
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("01"), {
            let mut a = [0u8; 32];
            a[0] = 1;
            a
        });
        assert_eq!(parse_address("0x02"), {
            let mut a = [0u8; 32];
            a[0] = 2;
            a
        });
        assert_eq!(parse_address("zz"), [0u8; 32]);
    }

    #[test]
    fn test_status_str() {
        assert_eq!(status_str(MarketStatus::Active), "active");
        assert_eq!(status_str(MarketStatus::RefundEnabled), "refund_enabled");
    }
}
