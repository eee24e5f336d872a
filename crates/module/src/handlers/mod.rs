//! Call handlers for the market module.
//!
//! These functions implement the business logic for each call type. Every
//! handler validates completely before touching state, so a returned error
//! always leaves the module unchanged.

mod admin;
mod ledger;
mod payout;
mod registry;
mod resolution;

pub use admin::{handle_set_paused, handle_transfer_ownership, handle_update_gateway_key};
pub use ledger::handle_place_bet;
pub use payout::{handle_claim_refund, handle_claim_winnings};
pub use registry::handle_create_market;
pub use resolution::{
    handle_emergency_withdraw, handle_enable_refund_for_timeout, handle_request_resolution,
    handle_resolve_market_callback,
};

use crate::call::MarketCall;
use crate::error::MarketError;
use crate::state::MarketState;
use market_types::Address;

/// Context provided by the runtime for each call.
pub struct CallContext {
    /// Sender of the transaction
    pub sender: Address,
    /// Current block height
    pub block_height: u64,
    /// Current timestamp
    pub timestamp: u64,
    /// Value attached to the call (stakes ride along as value)
    pub value: u64,
}

/// Result type for handlers.
pub type HandlerResult<T> = Result<T, MarketError>;

/// Outcome of a dispatched call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CallOutcome {
    MarketCreated(u64),
    BetPlaced,
    ResolutionRequested(u64),
    CallbackAccepted,
    RefundEnabled,
    WinningsClaimed(u64),
    RefundClaimed(u64),
    EmergencySwept(u64),
    AdminUpdated,
}

/// Dispatch a decoded call to its handler.
pub fn apply_call(
    state: &mut MarketState,
    ctx: &CallContext,
    call: MarketCall,
) -> HandlerResult<CallOutcome> {
    match call {
        MarketCall::CreateMarket {
            question,
            duration_secs,
        } => handle_create_market(state, ctx, question, duration_secs)
            .map(CallOutcome::MarketCreated),

        MarketCall::PlaceBet {
            market_id,
            prediction,
        } => handle_place_bet(state, ctx, market_id, prediction).map(|_| CallOutcome::BetPlaced),

        MarketCall::RequestResolution { market_id } => {
            handle_request_resolution(state, ctx, market_id).map(CallOutcome::ResolutionRequested)
        }

        MarketCall::ResolveMarketCallback {
            request_id,
            cleartexts,
            attestation,
        } => handle_resolve_market_callback(state, ctx, request_id, cleartexts, &attestation)
            .map(|_| CallOutcome::CallbackAccepted),

        MarketCall::EnableRefundForTimeout { market_id } => {
            handle_enable_refund_for_timeout(state, ctx, market_id)
                .map(|_| CallOutcome::RefundEnabled)
        }

        MarketCall::EmergencyWithdraw { market_id } => {
            handle_emergency_withdraw(state, ctx, market_id).map(CallOutcome::EmergencySwept)
        }

        MarketCall::ClaimWinnings { market_id } => {
            handle_claim_winnings(state, ctx, market_id).map(CallOutcome::WinningsClaimed)
        }

        MarketCall::ClaimRefund { market_id } => {
            handle_claim_refund(state, ctx, market_id).map(CallOutcome::RefundClaimed)
        }

        MarketCall::SetPaused { paused } => {
            handle_set_paused(state, ctx, paused).map(|_| CallOutcome::AdminUpdated)
        }

        MarketCall::TransferOwnership { new_owner } => {
            handle_transfer_ownership(state, ctx, new_owner).map(|_| CallOutcome::AdminUpdated)
        }

        MarketCall::UpdateGatewayKey { gateway_key } => {
            handle_update_gateway_key(state, ctx, gateway_key).map(|_| CallOutcome::AdminUpdated)
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::CallContext;
    use crate::genesis::MarketGenesisConfig;
    use crate::state::MarketState;
    use market_types::Address;

    pub fn test_context(sender: Address) -> CallContext {
        CallContext {
            sender,
            block_height: 100,
            timestamp: 1_700_000_000,
            value: 0,
        }
    }

    pub fn context_at(sender: Address, timestamp: u64) -> CallContext {
        CallContext {
            sender,
            block_height: 100,
            timestamp,
            value: 0,
        }
    }

    pub fn funded_context(sender: Address, timestamp: u64, value: u64) -> CallContext {
        CallContext {
            sender,
            block_height: 100,
            timestamp,
            value,
        }
    }

    pub fn test_state(owner: Address) -> MarketState {
        let mut genesis = MarketGenesisConfig::default();
        genesis.owner = owner;
        MarketState::new(&genesis)
    }
}
