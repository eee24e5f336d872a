//! Resolution protocol: gateway requests, settlement callbacks, and the
//! timeout escalation ladder.

use market_gateway::verify_callback;
use market_types::{GatewayAttestation, MarketEvent, MarketStatus, PendingDecryption};

use crate::error::MarketError;
use crate::state::MarketState;

use super::{CallContext, HandlerResult};

/// Handle RequestResolution call (creator only, after the betting deadline).
///
/// Registers a pending decryption naming the two pool aggregates and
/// freezes the market until the callback lands or the timeout path fires.
pub fn handle_request_resolution(
    state: &mut MarketState,
    ctx: &CallContext,
    market_id: u64,
) -> HandlerResult<u64> {
    let market = state
        .get_market(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;

    if market.creator != ctx.sender {
        return Err(MarketError::NotAuthorized);
    }

    match market.status {
        MarketStatus::Active => {}
        MarketStatus::DecryptionPending => return Err(MarketError::RequestOutstanding),
        MarketStatus::Resolved => return Err(MarketError::AlreadyResolved),
        MarketStatus::RefundEnabled => {
            return Err(MarketError::InvalidStatus {
                expected: MarketStatus::Active,
                got: market.status,
            })
        }
    }

    if ctx.timestamp < market.end_time {
        return Err(MarketError::BettingNotEnded);
    }

    // Callback order: YES pool first, NO pool second.
    let handles = vec![market.yes_cipher_total, market.no_cipher_total];

    let request_id = state.allocate_request_id();
    state.pending_decryptions.insert(
        request_id,
        PendingDecryption {
            request_id,
            market_id,
            handles,
            requested_at: ctx.timestamp,
            requested_height: ctx.block_height,
        },
    );

    let market = state
        .get_market_mut(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;
    market.status = MarketStatus::DecryptionPending;
    market.decryption_request_id = Some(request_id);
    market.resolution_request_time = Some(ctx.timestamp);

    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::DecryptionRequested {
            market_id,
            request_id,
        },
    );

    Ok(request_id)
}

/// Handle ResolveMarketCallback call.
///
/// The callback may arrive from any sender; authenticity comes entirely
/// from the attestation over `(request_id, cleartexts)`. YES wins only
/// when its pool strictly exceeds the NO pool.
pub fn handle_resolve_market_callback(
    state: &mut MarketState,
    ctx: &CallContext,
    request_id: u64,
    cleartexts: Vec<u64>,
    attestation: &GatewayAttestation,
) -> HandlerResult<()> {
    if !verify_callback(
        &state.config.gateway_key,
        request_id,
        &cleartexts,
        attestation,
    ) {
        return Err(MarketError::InvalidAttestation);
    }

    let pending = state
        .pending_decryptions
        .get(&request_id)
        .ok_or(MarketError::UnknownRequest(request_id))?;
    let market_id = pending.market_id;

    if cleartexts.len() != 2 {
        return Err(MarketError::MalformedCleartexts {
            expected: 2,
            got: cleartexts.len(),
        });
    }

    let market = state
        .get_market(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;

    if market.status != MarketStatus::DecryptionPending {
        return Err(MarketError::InvalidStatus {
            expected: MarketStatus::DecryptionPending,
            got: market.status,
        });
    }
    // A callback for a superseded request must not move the market.
    if market.decryption_request_id != Some(request_id) {
        return Err(MarketError::RequestIdMismatch {
            expected: market.decryption_request_id,
            got: request_id,
        });
    }

    let yes_pool = cleartexts[0];
    let no_pool = cleartexts[1];
    let outcome = yes_pool > no_pool;

    let market = state
        .get_market_mut(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;
    market.status = MarketStatus::Resolved;
    market.outcome = Some(outcome);
    market.settled_yes_pool = Some(yes_pool);
    market.settled_no_pool = Some(no_pool);

    state.pending_decryptions.remove(&request_id);
    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::MarketResolved { market_id, outcome },
    );

    Ok(())
}

/// Handle EnableRefundForTimeout call (any sender).
///
/// Once the gateway has been silent for the full decryption timeout, the
/// market flips one-way into refund mode and the abandoned request is
/// dropped so a late callback can no longer land.
pub fn handle_enable_refund_for_timeout(
    state: &mut MarketState,
    ctx: &CallContext,
    market_id: u64,
) -> HandlerResult<()> {
    let market = state
        .get_market(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;

    match market.status {
        MarketStatus::DecryptionPending => {}
        MarketStatus::Active => return Err(MarketError::NoRequestOutstanding),
        MarketStatus::Resolved => return Err(MarketError::AlreadyResolved),
        MarketStatus::RefundEnabled => {
            return Err(MarketError::InvalidStatus {
                expected: MarketStatus::DecryptionPending,
                got: market.status,
            })
        }
    }

    let requested_at = market
        .resolution_request_time
        .ok_or(MarketError::NoRequestOutstanding)?;
    let deadline = requested_at.saturating_add(state.params.decryption_timeout_secs);
    if ctx.timestamp < deadline {
        return Err(MarketError::TimeoutNotReached);
    }

    let request_id = market
        .decryption_request_id
        .ok_or(MarketError::NoRequestOutstanding)?;

    let market = state
        .get_market_mut(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;
    market.status = MarketStatus::RefundEnabled;

    state.pending_decryptions.remove(&request_id);
    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::DecryptionTimedOut {
            market_id,
            request_id,
        },
    );

    Ok(())
}

/// Handle EmergencyWithdraw call (creator only).
///
/// Last-resort escape hatch: strictly after the emergency timeout past the
/// market's end, and only once the market already sits in a terminal
/// state, the creator sweeps the entire vault balance. The terminal status
/// stays as it is; the sweep marker makes later claims fail fast.
pub fn handle_emergency_withdraw(
    state: &mut MarketState,
    ctx: &CallContext,
    market_id: u64,
) -> HandlerResult<u64> {
    let market = state
        .get_market(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;

    if market.creator != ctx.sender {
        return Err(MarketError::NotAuthorized);
    }
    if market.emergency_withdrawn {
        return Err(MarketError::AlreadySwept);
    }
    if !market.status.is_terminal() {
        return Err(MarketError::NotTerminal);
    }

    let deadline = market
        .end_time
        .saturating_add(state.params.emergency_timeout_secs);
    if ctx.timestamp <= deadline {
        return Err(MarketError::EmergencyTimeoutNotReached);
    }

    let amount = state.vault.balance();
    state.vault.transfer_out(ctx.sender, amount);

    let market = state
        .get_market_mut(market_id)
        .ok_or(MarketError::MarketNotFound(market_id))?;
    market.emergency_withdrawn = true;

    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::EmergencyWithdrawal {
            market_id,
            creator: ctx.sender,
            amount,
        },
    );

    Ok(amount)
}
