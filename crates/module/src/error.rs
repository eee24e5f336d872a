//! Market module error types.

use thiserror::Error;

use market_types::MarketStatus;

/// Errors that can occur in the market module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MarketError {
    #[error("Market not found: {0}")]
    MarketNotFound(u64),

    #[error("Invalid status. Expected: {expected:?}, Got: {got:?}")]
    InvalidStatus {
        expected: MarketStatus,
        got: MarketStatus,
    },

    #[error("Question cannot be empty")]
    EmptyQuestion,

    #[error("Question too long: {got} bytes, maximum {max}")]
    QuestionTooLong { got: usize, max: usize },

    #[error("Invalid duration: {0} seconds")]
    InvalidDuration(u64),

    #[error("Timestamp overflow")]
    TimestampOverflow,

    #[error("Betting period ended")]
    BettingClosed,

    #[error("Betting period not ended")]
    BettingNotEnded,

    #[error("Bet below minimum: need {min}, got {got}")]
    BetBelowMinimum { min: u64, got: u64 },

    #[error("Bet above maximum: allowed {max}, got {got}")]
    BetAboveMaximum { max: u64, got: u64 },

    #[error("Already placed a bet")]
    AlreadyBet,

    #[error("No bet recorded for sender")]
    NoBet,

    #[error("Decryption request already outstanding")]
    RequestOutstanding,

    #[error("No decryption request outstanding")]
    NoRequestOutstanding,

    #[error("Unknown decryption request: {0}")]
    UnknownRequest(u64),

    #[error("Request id mismatch: market expects {expected:?}, callback carries {got}")]
    RequestIdMismatch { expected: Option<u64>, got: u64 },

    #[error("Invalid gateway attestation")]
    InvalidAttestation,

    #[error("Malformed cleartexts: expected {expected}, got {got}")]
    MalformedCleartexts { expected: usize, got: usize },

    #[error("Market already resolved")]
    AlreadyResolved,

    #[error("Decryption timeout not reached")]
    TimeoutNotReached,

    #[error("Emergency timeout not reached")]
    EmergencyTimeoutNotReached,

    #[error("Market must reach a terminal state first")]
    NotTerminal,

    #[error("Winnings already claimed")]
    AlreadyClaimed,

    #[error("No winnings to claim")]
    NoWinnings,

    #[error("Winning pool is empty")]
    EmptyPool,

    #[error("Payout computation overflow")]
    PayoutOverflow,

    #[error("Market funds were swept by emergency withdrawal")]
    EmergencyWithdrawn,

    #[error("Vault already swept for this market")]
    AlreadySwept,

    #[error("Module is paused")]
    Paused,

    #[error("Not authorized")]
    NotAuthorized,

    #[error("Transfer failed: requested {requested}, available {available}")]
    TransferFailed { requested: u64, available: u64 },
}
