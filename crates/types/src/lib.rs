//! Core type definitions for confidential prediction markets.
//!
//! This crate provides the shared data structures used across the market
//! system, including ciphertext handles, market lifecycle types, and the
//! gateway callback attestation format.

use borsh::{BorshDeserialize, BorshSerialize};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

pub mod constants;

// =========================
// CIPHERTEXT HANDLES
// =========================

/// Opaque reference to an encrypted 64-bit value.
///
/// The module never holds plaintexts behind a handle. Every handle is the
/// result of an operation recorded in the module's append-only cipher log,
/// and the decryption gateway replays that log off-chain to materialize
/// cleartexts once a resolution is requested. Handle bytes are derived from
/// a domain tag and a monotonic operation sequence, so they carry no
/// information about the underlying value.
#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    BorshSerialize,
    BorshDeserialize,
    Serialize,
    Deserialize,
)]
pub struct CiphertextHandle(pub [u8; 32]);

impl CiphertextHandle {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// One entry in the module's symbolic cipher log.
///
/// Handles always appear as a result before they appear as an operand, so
/// the gateway can evaluate the log in a single forward pass.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum CipherOp {
    /// Encryption of a plaintext known to the module at call time.
    TrivialEncrypt {
        handle: CiphertextHandle,
        value: u64,
    },

    /// Homomorphic addition of two ciphertexts.
    Add {
        handle: CiphertextHandle,
        lhs: CiphertextHandle,
        rhs: CiphertextHandle,
    },

    /// Homomorphic addition of a plaintext constant to a ciphertext.
    AddPlain {
        handle: CiphertextHandle,
        lhs: CiphertextHandle,
        value: u64,
    },
}

impl CipherOp {
    /// The handle this operation produced.
    pub fn handle(&self) -> &CiphertextHandle {
        match self {
            CipherOp::TrivialEncrypt { handle, .. } => handle,
            CipherOp::Add { handle, .. } => handle,
            CipherOp::AddPlain { handle, .. } => handle,
        }
    }
}

// =========================
// MARKET TYPES
// =========================

/// Generic address type (32 bytes)
pub type Address = [u8; 32];

/// Market lifecycle state
///
/// `Active` covers both the betting window and the post-deadline stretch
/// before anyone requests resolution; the deadline itself is judged against
/// `Market::end_time`. `Resolved` and `RefundEnabled` are terminal and
/// mutually exclusive.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize,
)]
pub enum MarketStatus {
    /// Accepting bets until `end_time`, resolution not yet requested
    Active,
    /// A decryption request is in flight at the gateway
    DecryptionPending,
    /// Gateway callback settled the market, winners may claim
    Resolved,
    /// Gateway timed out, participants may reclaim their stakes
    RefundEnabled,
}

impl MarketStatus {
    /// Whether the market reached a settlement phase in which participant
    /// funds can leave the vault.
    pub fn is_terminal(&self) -> bool {
        matches!(self, MarketStatus::Resolved | MarketStatus::RefundEnabled)
    }
}

/// A binary prediction market.
///
/// The encrypted aggregates are the authoritative pools. The public totals
/// are deliberately distorted decoys and never feed payout arithmetic.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Market {
    pub id: u64,
    pub creator: Address,
    pub question: String,
    pub status: MarketStatus,

    // Timing
    pub created_at: u64,
    pub end_time: u64,

    // Encrypted aggregates
    pub yes_cipher_total: CiphertextHandle,
    pub no_cipher_total: CiphertextHandle,

    // Distorted public aggregates (display only)
    pub public_yes_total: u64,
    pub public_no_total: u64,

    /// Seed for the decoy arithmetic, derived at creation from public inputs
    pub obfuscation_seed: u64,

    // Resolution
    /// Identifier of the in-flight (or most recent) decryption request
    pub decryption_request_id: Option<u64>,
    /// Timestamp at which the in-flight request was issued
    pub resolution_request_time: Option<u64>,
    /// Settled outcome: `Some(true)` means YES won
    pub outcome: Option<bool>,
    /// Decrypted YES pool, recorded by the settlement callback
    pub settled_yes_pool: Option<u64>,
    /// Decrypted NO pool, recorded by the settlement callback
    pub settled_no_pool: Option<u64>,
    /// Set when the creator swept the vault after the emergency timeout;
    /// retained alongside the terminal status
    pub emergency_withdrawn: bool,
}

/// A single participant's position in a market.
///
/// `stake` and `prediction` are module-private settlement inputs. They are
/// never emitted in events and are only reachable through the access-gated
/// ciphertext query.
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct Bet {
    pub market_id: u64,
    pub bettor: Address,
    pub encrypted_amount: CiphertextHandle,
    pub encrypted_prediction: CiphertextHandle,
    /// Stake plus the participant's obfuscation factor, encrypted
    pub obfuscated_value: CiphertextHandle,
    pub stake: u64,
    pub prediction: bool,
    pub placed_at: u64,
    pub claimed: bool,
    /// Addresses allowed to read this bet's ciphertext handles
    pub access: Vec<Address>,
}

impl Bet {
    /// The bet's ciphertext handles, without the settlement inputs.
    pub fn ciphertexts(&self) -> BetCiphertexts {
        BetCiphertexts {
            encrypted_amount: self.encrypted_amount,
            encrypted_prediction: self.encrypted_prediction,
            obfuscated_value: self.obfuscated_value,
        }
    }
}

/// Ciphertext handles of a bet, returned by the access-gated query
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BetCiphertexts {
    pub encrypted_amount: CiphertextHandle,
    pub encrypted_prediction: CiphertextHandle,
    pub obfuscated_value: CiphertextHandle,
}

// =========================
// DECRYPTION REQUESTS
// =========================

/// A resolution request awaiting a gateway callback
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct PendingDecryption {
    pub request_id: u64,
    pub market_id: u64,
    /// Handles the gateway must decrypt, in callback order:
    /// YES pool first, NO pool second
    pub handles: Vec<CiphertextHandle>,
    pub requested_at: u64,
    pub requested_height: u64,
}

/// Gateway signature over a settlement callback (Ed25519, 64 bytes)
#[serde_as]
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct GatewayAttestation(#[serde_as(as = "[_; 64]")] pub [u8; 64]);

impl Default for GatewayAttestation {
    fn default() -> Self {
        Self([0u8; 64])
    }
}

impl GatewayAttestation {
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

/// Externally visible progress of a market's decryption
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecryptionStatus {
    /// Resolution has never been requested
    NotRequested,
    /// A request is in flight; `timed_out` flips once the refund timeout
    /// has elapsed without a callback
    Pending {
        request_id: u64,
        requested_at: u64,
        timed_out: bool,
    },
    /// The callback landed and the market is resolved
    Completed,
    /// The request was abandoned and refunds are enabled
    TimedOut,
}

// =========================
// EVENTS
// =========================

/// Public notifications emitted by the module.
///
/// Deliberately omits stakes and predictions. Amounts appear only where
/// they are already public (the emergency sweep).
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub enum MarketEvent {
    MarketCreated {
        market_id: u64,
        creator: Address,
        end_time: u64,
    },
    BetPlaced {
        market_id: u64,
        bettor: Address,
    },
    DecryptionRequested {
        market_id: u64,
        request_id: u64,
    },
    MarketResolved {
        market_id: u64,
        outcome: bool,
    },
    WinningsClaimed {
        market_id: u64,
        bettor: Address,
    },
    DecryptionTimedOut {
        market_id: u64,
        request_id: u64,
    },
    RefundProcessed {
        market_id: u64,
        bettor: Address,
    },
    EmergencyWithdrawal {
        market_id: u64,
        creator: Address,
        amount: u64,
    },
    PauseChanged {
        paused: bool,
    },
    OwnershipTransferred {
        previous_owner: Address,
        new_owner: Address,
    },
    GatewayKeyUpdated,
}

/// An event with its position in chain history
#[derive(Clone, Debug, PartialEq, Eq, BorshSerialize, BorshDeserialize, Serialize, Deserialize)]
pub struct EventRecord {
    pub block_height: u64,
    pub timestamp: u64,
    pub event: MarketEvent,
}

// =========================
// HELPER FUNCTIONS
// =========================

/// Derive the handle for a freshly encrypted value
pub fn fresh_cipher_handle(op_seq: u64) -> CiphertextHandle {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"MARKET_CIPHER_FRESH_V1:");
    hasher.update(op_seq.to_le_bytes());
    CiphertextHandle(hasher.finalize().into())
}

/// Derive the handle for the sum of two ciphertexts
pub fn combined_cipher_handle(
    op_seq: u64,
    lhs: &CiphertextHandle,
    rhs: &CiphertextHandle,
) -> CiphertextHandle {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"MARKET_CIPHER_ADD_V1:");
    hasher.update(op_seq.to_le_bytes());
    hasher.update(lhs.0);
    hasher.update(rhs.0);
    CiphertextHandle(hasher.finalize().into())
}

/// Derive the handle for a ciphertext offset by a plaintext constant
pub fn offset_cipher_handle(op_seq: u64, lhs: &CiphertextHandle) -> CiphertextHandle {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"MARKET_CIPHER_ADDP_V1:");
    hasher.update(op_seq.to_le_bytes());
    hasher.update(lhs.0);
    CiphertextHandle(hasher.finalize().into())
}

/// Derive a market's obfuscation seed from its creation facts.
///
/// The seed feeds the decoy arithmetic on the public totals and the inert
/// payout multiplier. It is reproducible from public inputs and is not a
/// secret.
pub fn derive_obfuscation_seed(created_at: u64, creator: &Address, market_id: u64) -> u64 {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"MARKET_OBFUSCATION_SEED_V1:");
    hasher.update(created_at.to_le_bytes());
    hasher.update(creator);
    hasher.update(market_id.to_le_bytes());
    let digest: [u8; 32] = hasher.finalize().into();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes)
}

/// Derive a participant's obfuscation factor in `0..OBFUSCATION_FACTOR_RANGE`
pub fn derive_bettor_factor(obfuscation_seed: u64, bettor: &Address) -> u64 {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(b"MARKET_BETTOR_FACTOR_V1:");
    hasher.update(obfuscation_seed.to_le_bytes());
    hasher.update(bettor);
    let digest: [u8; 32] = hasher.finalize().into();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest[..8]);
    u64::from_le_bytes(bytes) % constants::OBFUSCATION_FACTOR_RANGE
}

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    use sha2::{Digest, Sha256};
    Sha256::digest(data).into()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_obfuscation_seed_deterministic() {
        let creator = [7u8; 32];
        let a = derive_obfuscation_seed(1_700_000_000, &creator, 1);
        let b = derive_obfuscation_seed(1_700_000_000, &creator, 1);
        assert_eq!(a, b);
    }

    #[test]
    fn test_obfuscation_seed_distinct_inputs() {
        let creator = [7u8; 32];
        let a = derive_obfuscation_seed(1_700_000_000, &creator, 1);
        let b = derive_obfuscation_seed(1_700_000_000, &creator, 2);
        let c = derive_obfuscation_seed(1_700_000_001, &creator, 1);

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_ne!(b, c);
    }

    #[test]
    fn test_bettor_factor_in_range() {
        let seed = derive_obfuscation_seed(1_700_000_000, &[1u8; 32], 42);
        for i in 0..64u8 {
            let factor = derive_bettor_factor(seed, &[i; 32]);
            assert!(factor < constants::OBFUSCATION_FACTOR_RANGE);
        }
    }

    #[test]
    fn test_cipher_handles_distinct() {
        let a = fresh_cipher_handle(0);
        let b = fresh_cipher_handle(1);
        assert_ne!(a, b);

        let sum = combined_cipher_handle(2, &a, &b);
        let offset = offset_cipher_handle(2, &a);
        assert_ne!(sum, a);
        assert_ne!(sum, b);
        assert_ne!(sum, offset);
    }

    #[test]
    fn test_fresh_handle_independent_of_value() {
        // Handle bytes depend only on the sequence number, so two equal
        // sequences collide regardless of what was encrypted. The module
        // guarantees sequence uniqueness; the handle leaks nothing.
        assert_eq!(fresh_cipher_handle(9), fresh_cipher_handle(9));
    }

    #[test]
    fn test_cipher_op_serialization() {
        let op = CipherOp::AddPlain {
            handle: fresh_cipher_handle(3),
            lhs: fresh_cipher_handle(1),
            value: 77,
        };
        let encoded = borsh::to_vec(&op).unwrap();
        let decoded: CipherOp = borsh::from_slice(&encoded).unwrap();
        assert_eq!(op, decoded);
        assert_eq!(op.handle(), decoded.handle());
    }

    #[test]
    fn test_attestation_serialization() {
        let att = GatewayAttestation([0xAB; 64]);
        let encoded = borsh::to_vec(&att).unwrap();
        let decoded: GatewayAttestation = borsh::from_slice(&encoded).unwrap();
        assert_eq!(att, decoded);
    }

    #[test]
    fn test_market_serialization() {
        let market = Market {
            id: 5,
            creator: [2u8; 32],
            question: "Will the launch window hold?".to_string(),
            status: MarketStatus::DecryptionPending,
            created_at: 1_700_000_000,
            end_time: 1_700_086_400,
            yes_cipher_total: fresh_cipher_handle(0),
            no_cipher_total: fresh_cipher_handle(1),
            public_yes_total: 123,
            public_no_total: 456,
            obfuscation_seed: 0xDEAD_BEEF,
            decryption_request_id: Some(1),
            resolution_request_time: Some(1_700_086_500),
            outcome: None,
            settled_yes_pool: None,
            settled_no_pool: None,
            emergency_withdrawn: false,
        };
        let encoded = borsh::to_vec(&market).unwrap();
        let decoded: Market = borsh::from_slice(&encoded).unwrap();
        assert_eq!(market, decoded);
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!MarketStatus::Active.is_terminal());
        assert!(!MarketStatus::DecryptionPending.is_terminal());
        assert!(MarketStatus::Resolved.is_terminal());
        assert!(MarketStatus::RefundEnabled.is_terminal());
    }
}
