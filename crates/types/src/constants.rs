//! Protocol constants shared by the module, gateway, and test harness.

/// Maximum market question length in bytes
pub const MAX_QUESTION_LEN: usize = 500;

/// Maximum market duration: 365 days in seconds
pub const MAX_MARKET_DURATION_SECS: u64 = 365 * 86_400;

/// Minimum accepted stake per bet, in base units
pub const MIN_BET: u64 = 1_000_000;

/// Maximum accepted stake per bet, in base units
pub const MAX_BET: u64 = 100_000_000_000;

/// Gateway silence tolerated before refunds can be enabled: 7 days
pub const DECRYPTION_TIMEOUT_SECS: u64 = 7 * 86_400;

/// Delay past market end before the creator may sweep the vault: 30 days
pub const EMERGENCY_TIMEOUT_SECS: u64 = 30 * 86_400;

/// Base of the payout multiplier. The multiplier appears in both the
/// numerator and denominator of the winnings formula and cancels out of
/// the result up to integer truncation.
pub const PAYOUT_MULTIPLIER_BASE: u64 = 1_000;

/// Spread added to the multiplier base from the obfuscation seed
pub const PAYOUT_MULTIPLIER_SPREAD: u64 = 1_000;

/// Per-participant obfuscation factors fall in `0..OBFUSCATION_FACTOR_RANGE`
pub const OBFUSCATION_FACTOR_RANGE: u64 = 100;

/// Divisor applied when folding a stake into the distorted public totals
pub const PUBLIC_TOTAL_DIVISOR: u64 = 100;
