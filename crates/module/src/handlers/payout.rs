//! Winnings and refund claims.
//!
//! Payouts are computed through a seed-derived multiplier that scales both
//! the numerator and the denominator of the pro-rata share. The multiplier
//! cancels out of the quotient, so the paid amount equals the plain
//! stake-proportional split while the intermediate values never equal the
//! raw pool arithmetic an observer might fingerprint.

use market_types::constants::{PAYOUT_MULTIPLIER_BASE, PAYOUT_MULTIPLIER_SPREAD};
use market_types::{MarketEvent, MarketStatus};

use crate::error::MarketError;
use crate::state::MarketState;

use super::{CallContext, HandlerResult};

/// Per-market payout multiplier, derived from the obfuscation seed.
///
/// Always in `[PAYOUT_MULTIPLIER_BASE, PAYOUT_MULTIPLIER_BASE +
/// PAYOUT_MULTIPLIER_SPREAD)`, never zero.
pub fn payout_multiplier(obfuscation_seed: u64) -> u64 {
    PAYOUT_MULTIPLIER_BASE + obfuscation_seed % PAYOUT_MULTIPLIER_SPREAD
}

/// Winner payout: stake plus the stake-weighted share of the losing pool.
///
/// `winning_pool` must be nonzero. All intermediates run in u128; `None`
/// means the result cannot be represented, not that the caller lost.
pub fn compute_winnings(
    stake: u64,
    multiplier: u64,
    winning_pool: u64,
    losing_pool: u64,
) -> Option<u64> {
    let scaled_stake = (stake as u128)
        .checked_mul(multiplier as u128)?
        .checked_mul(losing_pool as u128)?;
    let scaled_pool = (winning_pool as u128).checked_mul(multiplier as u128)?;
    if scaled_pool == 0 {
        return None;
    }
    let share = scaled_stake / scaled_pool;
    let total = (stake as u128).checked_add(share)?;
    u64::try_from(total).ok()
}

/// Handle ClaimWinnings call.
pub fn handle_claim_winnings(
    state: &mut MarketState,
    ctx: &CallContext,
    market_id: u64,
) -> HandlerResult<u64> {
    let market = state
        .get_market(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;

    if market.status != MarketStatus::Resolved {
        return Err(MarketError::InvalidStatus {
            expected: MarketStatus::Resolved,
            got: market.status,
        });
    }
    if market.emergency_withdrawn {
        return Err(MarketError::EmergencyWithdrawn);
    }

    let outcome = market.outcome.ok_or(MarketError::InvalidStatus {
        expected: MarketStatus::Resolved,
        got: market.status,
    })?;
    let (winning_pool, losing_pool) = if outcome {
        (
            market.settled_yes_pool.unwrap_or(0),
            market.settled_no_pool.unwrap_or(0),
        )
    } else {
        (
            market.settled_no_pool.unwrap_or(0),
            market.settled_yes_pool.unwrap_or(0),
        )
    };
    let multiplier = payout_multiplier(market.obfuscation_seed);

    let bet = state
        .bets
        .get(&(market_id, ctx.sender))
        .ok_or(MarketError::NoBet)?;
    if bet.claimed {
        return Err(MarketError::AlreadyClaimed);
    }
    if bet.prediction != outcome {
        return Err(MarketError::NoWinnings);
    }
    if winning_pool == 0 {
        return Err(MarketError::EmptyPool);
    }

    let winnings = compute_winnings(bet.stake, multiplier, winning_pool, losing_pool)
        .ok_or(MarketError::PayoutOverflow)?;

    if !state.vault.can_cover(winnings) {
        return Err(MarketError::TransferFailed {
            requested: winnings,
            available: state.vault.balance(),
        });
    }

    // Mark claimed before any funds move.
    let bet = state
        .bets
        .get_mut(&(market_id, ctx.sender))
        .ok_or(MarketError::NoBet)?;
    bet.claimed = true;
    state.vault.transfer_out(ctx.sender, winnings);

    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::WinningsClaimed {
            market_id,
            bettor: ctx.sender,
        },
    );

    Ok(winnings)
}

/// Handle ClaimRefund call. Only the exact original stake comes back.
pub fn handle_claim_refund(
    state: &mut MarketState,
    ctx: &CallContext,
    market_id: u64,
) -> HandlerResult<u64> {
    let market = state
        .get_market(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;

    if market.status != MarketStatus::RefundEnabled {
        return Err(MarketError::InvalidStatus {
            expected: MarketStatus::RefundEnabled,
            got: market.status,
        });
    }
    if market.emergency_withdrawn {
        return Err(MarketError::EmergencyWithdrawn);
    }

    let bet = state
        .bets
        .get(&(market_id, ctx.sender))
        .ok_or(MarketError::NoBet)?;
    if bet.claimed {
        return Err(MarketError::AlreadyClaimed);
    }
    let amount = bet.stake;

    if !state.vault.can_cover(amount) {
        return Err(MarketError::TransferFailed {
            requested: amount,
            available: state.vault.balance(),
        });
    }

    let bet = state
        .bets
        .get_mut(&(market_id, ctx.sender))
        .ok_or(MarketError::NoBet)?;
    bet.claimed = true;
    state.vault.transfer_out(ctx.sender, amount);

    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::RefundProcessed {
            market_id,
            bettor: ctx.sender,
        },
    );

    Ok(amount)
}
