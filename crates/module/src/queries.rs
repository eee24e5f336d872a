//! Query handlers for the market module.
//!
//! These functions provide read-only access to market state. Nothing here
//! returns a stake or a prediction in the clear; per-bet material is
//! limited to ciphertext handles, and only for callers on the bet's
//! access list.

use crate::state::MarketState as ModuleState;
use market_types::{
    Address, Bet, BetCiphertexts, DecryptionStatus, EventRecord, Market, MarketStatus,
    PendingDecryption,
};
use serde::{Deserialize, Serialize};

/// Query request types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MarketQuery {
    /// Get market details by ID.
    GetMarket { market_id: u64 },

    /// Get all markets (paginated).
    ListMarkets { offset: u64, limit: u64 },

    /// Get the obfuscated public pool totals for a market.
    GetPublicTotals { market_id: u64 },

    /// Check whether an address has bet on a market.
    GetBetExists { market_id: u64, bettor: Address },

    /// Get the addresses that have bet on a market.
    GetMarketBettors { market_id: u64 },

    /// Get the number of markets ever created.
    GetTotalMarkets,

    /// Get a bet's ciphertext handles. Gated on the bet's access list.
    GetBetCiphertexts {
        market_id: u64,
        bettor: Address,
        caller: Address,
    },

    /// Get resolution progress for a market, judged at `now`.
    GetDecryptionStatus { market_id: u64, now: u64 },

    /// Get the resolved outcome, if any.
    GetOutcome { market_id: u64 },

    /// Get vault totals.
    GetVault,

    /// Get cumulative payouts to an address.
    GetPaidOut { address: Address },

    /// Check whether intake is paused.
    IsPaused,

    /// Get the module owner.
    GetOwner,

    /// Get the registered gateway verification key.
    GetGatewayKey,

    /// Get emitted events (paginated).
    GetEvents { offset: u64, limit: u64 },
}

/// Query response types.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum MarketQueryResponse {
    /// Market details.
    Market(Option<Market>),

    /// List of markets.
    MarketList(Vec<MarketSummary>),

    /// Obfuscated public totals.
    PublicTotals(Option<PublicTotalsView>),

    /// Whether the bet exists.
    BetExists(bool),

    /// Bettor addresses.
    MarketBettors(Vec<Address>),

    /// Market count.
    TotalMarkets(u64),

    /// Bet ciphertext handles, or None when unknown or not authorized.
    BetCiphertexts(Option<BetCiphertexts>),

    /// Resolution progress, or None when the market is unknown.
    Status(Option<DecryptionStatus>),

    /// Resolved outcome.
    Outcome(Option<bool>),

    /// Vault totals.
    Vault(VaultView),

    /// Cumulative payouts.
    PaidOut(u64),

    /// Pause flag.
    Paused(bool),

    /// Module owner.
    Owner(Address),

    /// Gateway verification key.
    GatewayKey([u8; 32]),

    /// Event records.
    Events(Vec<EventRecord>),
}

/// Handle a query.
pub fn handle_query(state: &ModuleState, query: MarketQuery) -> MarketQueryResponse {
    match query {
        MarketQuery::GetMarket { market_id } => {
            MarketQueryResponse::Market(state.get_market(market_id).cloned())
        }

        MarketQuery::ListMarkets { offset, limit } => MarketQueryResponse::MarketList(
            get_market_summaries(state, offset as usize, limit as usize),
        ),

        MarketQuery::GetPublicTotals { market_id } => MarketQueryResponse::PublicTotals(
            state.get_market(market_id).map(PublicTotalsView::from_market),
        ),

        MarketQuery::GetBetExists { market_id, bettor } => {
            MarketQueryResponse::BetExists(state.bets.contains_key(&(market_id, bettor)))
        }

        MarketQuery::GetMarketBettors { market_id } => MarketQueryResponse::MarketBettors(
            state.market_bettors.get(&market_id).cloned().unwrap_or_default(),
        ),

        MarketQuery::GetTotalMarkets => {
            MarketQueryResponse::TotalMarkets(state.markets.len() as u64)
        }

        MarketQuery::GetBetCiphertexts {
            market_id,
            bettor,
            caller,
        } => {
            let handles = state
                .bets
                .get(&(market_id, bettor))
                .filter(|bet| bet.access.contains(&caller))
                .map(Bet::ciphertexts);
            MarketQueryResponse::BetCiphertexts(handles)
        }

        MarketQuery::GetDecryptionStatus { market_id, now } => {
            MarketQueryResponse::Status(decryption_status(state, market_id, now))
        }

        MarketQuery::GetOutcome { market_id } => {
            MarketQueryResponse::Outcome(state.get_market(market_id).and_then(|m| m.outcome))
        }

        MarketQuery::GetVault => MarketQueryResponse::Vault(VaultView {
            balance: state.vault.balance(),
            total_deposited: state.vault.total_deposited(),
            total_paid: state.vault.total_paid(),
        }),

        MarketQuery::GetPaidOut { address } => {
            MarketQueryResponse::PaidOut(state.vault.paid_out(&address))
        }

        MarketQuery::IsPaused => MarketQueryResponse::Paused(state.config.paused),

        MarketQuery::GetOwner => MarketQueryResponse::Owner(state.config.owner),

        MarketQuery::GetGatewayKey => MarketQueryResponse::GatewayKey(state.config.gateway_key),

        MarketQuery::GetEvents { offset, limit } => {
            let events = state
                .events
                .iter()
                .skip(offset as usize)
                .take(limit as usize)
                .cloned()
                .collect();
            MarketQueryResponse::Events(events)
        }
    }
}

/// Obfuscated public pool totals. Display values only; settlement never
/// reads them.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PublicTotalsView {
    pub market_id: u64,
    pub yes_total: u64,
    pub no_total: u64,
}

impl PublicTotalsView {
    pub fn from_market(market: &Market) -> Self {
        Self {
            market_id: market.id,
            yes_total: market.public_yes_total,
            no_total: market.public_no_total,
        }
    }
}

/// Vault totals for monitoring conservation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VaultView {
    pub balance: u64,
    pub total_deposited: u128,
    pub total_paid: u128,
}

/// Summary of a market for listing.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MarketSummary {
    pub market_id: u64,
    pub creator: Address,
    pub question: String,
    pub status: MarketStatus,
    pub created_at: u64,
    pub end_time: u64,
    pub public_yes_total: u64,
    pub public_no_total: u64,
    pub num_bettors: usize,
    pub outcome: Option<bool>,
}

impl MarketSummary {
    /// Create summary from a market and its bettor count.
    pub fn from_market(market: &Market, num_bettors: usize) -> Self {
        Self {
            market_id: market.id,
            creator: market.creator,
            question: market.question.clone(),
            status: market.status,
            created_at: market.created_at,
            end_time: market.end_time,
            public_yes_total: market.public_yes_total,
            public_no_total: market.public_no_total,
            num_bettors,
            outcome: market.outcome,
        }
    }
}

/// Get market summaries for listing, ordered by ID.
pub fn get_market_summaries(state: &ModuleState, offset: usize, limit: usize) -> Vec<MarketSummary> {
    let mut ids: Vec<u64> = state.markets.keys().copied().collect();
    ids.sort_unstable();
    ids.into_iter()
        .skip(offset)
        .take(limit)
        .filter_map(|id| {
            state
                .get_market(id)
                .map(|market| MarketSummary::from_market(market, state.num_bettors(id)))
        })
        .collect()
}

/// Get markets currently accepting bets, ordered by ID.
pub fn get_open_markets(state: &ModuleState, current_time: u64) -> Vec<MarketSummary> {
    let mut open: Vec<MarketSummary> = state
        .markets
        .values()
        .filter(|market| market.status == MarketStatus::Active && current_time < market.end_time)
        .map(|market| MarketSummary::from_market(market, state.num_bettors(market.id)))
        .collect();
    open.sort_unstable_by_key(|summary| summary.market_id);
    open
}

/// Get outstanding decryption requests, ordered by request ID.
pub fn get_pending_requests(state: &ModuleState) -> Vec<PendingDecryption> {
    let mut pending: Vec<PendingDecryption> = state.pending_decryptions.values().cloned().collect();
    pending.sort_unstable_by_key(|request| request.request_id);
    pending
}

/// Get markets whose decryption request has aged past the refund timeout.
pub fn get_timed_out_markets(state: &ModuleState, current_time: u64) -> Vec<u64> {
    let mut timed_out: Vec<u64> = state
        .markets
        .values()
        .filter(|market| {
            market.status == MarketStatus::DecryptionPending
                && market.resolution_request_time.is_some_and(|requested_at| {
                    current_time
                        >= requested_at.saturating_add(state.params.decryption_timeout_secs)
                })
        })
        .map(|market| market.id)
        .collect();
    timed_out.sort_unstable();
    timed_out
}

/// Resolution progress for one market, or None when the market is unknown.
pub fn decryption_status(
    state: &ModuleState,
    market_id: u64,
    current_time: u64,
) -> Option<DecryptionStatus> {
    let market = state.get_market(market_id)?;
    let status = match market.status {
        MarketStatus::Active => DecryptionStatus::NotRequested,
        MarketStatus::DecryptionPending => {
            let request_id = market.decryption_request_id.unwrap_or(0);
            let requested_at = market.resolution_request_time.unwrap_or(0);
            DecryptionStatus::Pending {
                request_id,
                requested_at,
                timed_out: current_time
                    >= requested_at.saturating_add(state.params.decryption_timeout_secs),
            }
        }
        MarketStatus::Resolved => DecryptionStatus::Completed,
        MarketStatus::RefundEnabled => DecryptionStatus::TimedOut,
    };
    Some(status)
}
