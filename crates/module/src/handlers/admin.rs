//! Owner-only administration: pause switch, ownership handover, gateway
//! key rotation.
//!
//! Pausing gates intake only. Markets that already hold funds keep their
//! full exit paths (resolution, callbacks, claims, timeouts) while paused.

use market_types::MarketEvent;

use crate::error::MarketError;
use crate::state::MarketState;

use super::{CallContext, HandlerResult};

fn require_owner(state: &MarketState, ctx: &CallContext) -> HandlerResult<()> {
    if state.config.owner != ctx.sender {
        return Err(MarketError::NotAuthorized);
    }
    Ok(())
}

/// Handle SetPaused call.
pub fn handle_set_paused(
    state: &mut MarketState,
    ctx: &CallContext,
    paused: bool,
) -> HandlerResult<()> {
    require_owner(state, ctx)?;

    state.config.paused = paused;
    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::PauseChanged { paused },
    );

    Ok(())
}

/// Handle TransferOwnership call.
pub fn handle_transfer_ownership(
    state: &mut MarketState,
    ctx: &CallContext,
    new_owner: [u8; 32],
) -> HandlerResult<()> {
    require_owner(state, ctx)?;

    let previous_owner = state.config.owner;
    state.config.owner = new_owner;
    state.record_event(
        ctx.block_height,
        ctx.timestamp,
        MarketEvent::OwnershipTransferred {
            previous_owner,
            new_owner,
        },
    );

    Ok(())
}

/// Handle UpdateGatewayKey call.
///
/// Rotation takes effect for every later callback, including callbacks for
/// requests that were opened under the old key. The event deliberately
/// carries no key material.
pub fn handle_update_gateway_key(
    state: &mut MarketState,
    ctx: &CallContext,
    gateway_key: [u8; 32],
) -> HandlerResult<()> {
    require_owner(state, ctx)?;

    state.config.gateway_key = gateway_key;
    state.record_event(ctx.block_height, ctx.timestamp, MarketEvent::GatewayKeyUpdated);

    Ok(())
}
