//! Mock chain server for local testing of the confidential market system.
//!
//! This provides a JSON-RPC server that simulates on-chain state management
//! for the market module without requiring a real blockchain. A background
//! task plays the decryption gateway: it polls for outstanding resolution
//! requests, replays the cipher log, and feeds attested settlement
//! callbacks back into the module.

use anyhow::Result;
use jsonrpsee::core::async_trait;
use jsonrpsee::proc_macros::rpc;
use jsonrpsee::server::Server;
use jsonrpsee::types::ErrorObjectOwned;
use parking_lot::RwLock;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use market_gateway::{DecryptionGateway, DecryptionOutcome, GatewayConfig};
use market_module::{
    handlers, queries, CallContext, MarketGenesisConfig, MarketState as ModuleState,
};

mod types;
use types::*;

/// Shared chain state.
struct ChainState {
    /// Module state
    module: ModuleState,
    /// Current block height (simulated)
    block_height: u64,
    /// Current timestamp (simulated, can be advanced)
    timestamp: u64,
    /// While false, the gateway worker ignores pending requests
    gateway_enabled: bool,
}

impl ChainState {
    fn new(genesis: &MarketGenesisConfig) -> Self {
        Self {
            module: ModuleState::new(genesis),
            block_height: 0,
            timestamp: 0,
            gateway_enabled: true,
        }
    }

    fn advance_block(&mut self) {
        self.block_height += 1;
        self.timestamp += 12; // ~12 second blocks
    }

    fn set_timestamp(&mut self, ts: u64) {
        self.timestamp = ts;
    }
}

fn call_ctx(chain: &ChainState, sender: [u8; 32], value: u64) -> CallContext {
    CallContext {
        sender,
        block_height: chain.block_height,
        timestamp: chain.timestamp,
        value,
    }
}

/// RPC API definition for the mock chain.
#[rpc(server)]
pub trait MockChainApi {
    // ============ Admin Methods ============

    /// Reset the chain with a genesis config.
    #[method(name = "admin_init")]
    async fn admin_init(&self, config: GenesisConfigRpc) -> Result<bool, ErrorObjectOwned>;

    /// Advance the chain by one block.
    #[method(name = "admin_advanceBlock")]
    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Set the current timestamp (for testing time-dependent logic).
    #[method(name = "admin_setTimestamp")]
    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned>;

    /// Enable or disable the in-process gateway (for testing timeouts).
    #[method(name = "admin_setGatewayEnabled")]
    async fn admin_set_gateway_enabled(&self, enabled: bool) -> Result<bool, ErrorObjectOwned>;

    // ============ Market Methods ============

    /// Create a new market.
    #[method(name = "market_create")]
    async fn market_create(&self, params: CreateMarketParams) -> Result<u64, ErrorObjectOwned>;

    /// Place an encrypted bet.
    #[method(name = "market_placeBet")]
    async fn market_place_bet(&self, params: PlaceBetParams) -> Result<bool, ErrorObjectOwned>;

    /// Request resolution of a market past its deadline.
    #[method(name = "market_requestResolution")]
    async fn market_request_resolution(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<u64, ErrorObjectOwned>;

    /// Flip a market into refund mode after the decryption timeout.
    #[method(name = "market_enableRefund")]
    async fn market_enable_refund(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Sweep the vault after the emergency timeout.
    #[method(name = "market_emergencyWithdraw")]
    async fn market_emergency_withdraw(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<u64, ErrorObjectOwned>;

    /// Claim winnings from a resolved market.
    #[method(name = "market_claimWinnings")]
    async fn market_claim_winnings(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<u64, ErrorObjectOwned>;

    /// Claim a refund from a refund-enabled market.
    #[method(name = "market_claimRefund")]
    async fn market_claim_refund(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<u64, ErrorObjectOwned>;

    /// Pause or resume market and bet intake (owner only).
    #[method(name = "market_setPaused")]
    async fn market_set_paused(
        &self,
        sender: String,
        paused: bool,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Hand the module over to a new owner (owner only).
    #[method(name = "market_transferOwnership")]
    async fn market_transfer_ownership(
        &self,
        sender: String,
        new_owner: String,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Register a new gateway verification key (owner only).
    #[method(name = "market_updateGatewayKey")]
    async fn market_update_gateway_key(
        &self,
        sender: String,
        gateway_key: String,
    ) -> Result<bool, ErrorObjectOwned>;

    // ============ Query Methods ============

    /// Get current block info.
    #[method(name = "chain_getBlockInfo")]
    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned>;

    /// Get market by ID.
    #[method(name = "query_getMarket")]
    async fn query_get_market(
        &self,
        market_id: u64,
    ) -> Result<Option<MarketRpc>, ErrorObjectOwned>;

    /// List all markets.
    #[method(name = "query_listMarkets")]
    async fn query_list_markets(&self) -> Result<Vec<MarketSummaryRpc>, ErrorObjectOwned>;

    /// List markets currently accepting bets.
    #[method(name = "query_getOpenMarkets")]
    async fn query_get_open_markets(&self) -> Result<Vec<MarketSummaryRpc>, ErrorObjectOwned>;

    /// Get the obfuscated public totals for a market.
    #[method(name = "query_getPublicTotals")]
    async fn query_get_public_totals(
        &self,
        market_id: u64,
    ) -> Result<Option<PublicTotalsRpc>, ErrorObjectOwned>;

    /// Check whether an address has bet on a market.
    #[method(name = "query_getBetExists")]
    async fn query_get_bet_exists(
        &self,
        market_id: u64,
        bettor: String,
    ) -> Result<bool, ErrorObjectOwned>;

    /// Get the addresses that have bet on a market.
    #[method(name = "query_getMarketBettors")]
    async fn query_get_market_bettors(
        &self,
        market_id: u64,
    ) -> Result<Vec<String>, ErrorObjectOwned>;

    /// Get the number of markets ever created.
    #[method(name = "query_getTotalMarkets")]
    async fn query_get_total_markets(&self) -> Result<u64, ErrorObjectOwned>;

    /// Get a bet's ciphertext handles. Gated on the bet's access list.
    #[method(name = "query_getBetCiphertexts")]
    async fn query_get_bet_ciphertexts(
        &self,
        market_id: u64,
        bettor: String,
        caller: String,
    ) -> Result<Option<BetCiphertextsRpc>, ErrorObjectOwned>;

    /// Get decryption progress for a market.
    #[method(name = "query_getDecryptionStatus")]
    async fn query_get_decryption_status(
        &self,
        market_id: u64,
    ) -> Result<Option<DecryptionStatusRpc>, ErrorObjectOwned>;

    /// Get vault totals.
    #[method(name = "query_getVault")]
    async fn query_get_vault(&self) -> Result<VaultRpc, ErrorObjectOwned>;

    /// Get outstanding decryption requests.
    #[method(name = "query_getPendingRequests")]
    async fn query_get_pending_requests(
        &self,
    ) -> Result<Vec<PendingDecryptionRpc>, ErrorObjectOwned>;

    /// Get markets whose decryption request has timed out.
    #[method(name = "query_getTimedOutMarkets")]
    async fn query_get_timed_out_markets(&self) -> Result<Vec<u64>, ErrorObjectOwned>;

    /// Get the registered gateway verification key.
    #[method(name = "query_getGatewayKey")]
    async fn query_get_gateway_key(&self) -> Result<String, ErrorObjectOwned>;
}

/// Implementation of the mock chain RPC server.
struct MockChainServer {
    state: Arc<RwLock<ChainState>>,
    /// Verification key of the in-process gateway
    gateway_key: [u8; 32],
}

impl MockChainServer {
    fn rpc_error(msg: &str) -> ErrorObjectOwned {
        ErrorObjectOwned::owned(-32000, msg.to_string(), None::<()>)
    }
}

#[async_trait]
impl MockChainApiServer for MockChainServer {
    async fn admin_init(&self, config: GenesisConfigRpc) -> Result<bool, ErrorObjectOwned> {
        let owner = config
            .owner
            .as_deref()
            .map(parse_address)
            .unwrap_or([0u8; 32]);
        let gateway_key: [u8; 32] = match &config.gateway_key {
            Some(s) => hex::decode(s)
                .map_err(|e| Self::rpc_error(&format!("Invalid gateway key hex: {}", e)))?
                .try_into()
                .map_err(|_| Self::rpc_error("Gateway key must be 32 bytes"))?,
            None => self.gateway_key,
        };

        let mut genesis = MarketGenesisConfig::with_gateway(owner, gateway_key);
        genesis.paused = config.paused.unwrap_or(false);
        genesis
            .validate()
            .map_err(|e| Self::rpc_error(&format!("Invalid genesis: {}", e)))?;

        let mut state = self.state.write();
        state.module = ModuleState::new(&genesis);
        state.block_height = 0;
        state.timestamp = config.initial_timestamp.unwrap_or(0);
        state.gateway_enabled = true;

        info!("Chain initialized");
        Ok(true)
    }

    async fn admin_advance_block(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.advance_block();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn admin_set_timestamp(&self, timestamp: u64) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.set_timestamp(timestamp);
        info!("Timestamp set to {}", timestamp);
        Ok(true)
    }

    async fn admin_set_gateway_enabled(&self, enabled: bool) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        state.gateway_enabled = enabled;
        info!(
            "Gateway {}",
            if enabled { "enabled" } else { "disabled" }
        );
        Ok(true)
    }

    async fn market_create(&self, params: CreateMarketParams) -> Result<u64, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&params.sender), 0);

        let market_id = handlers::handle_create_market(
            &mut state.module,
            &ctx,
            params.question,
            params.duration_secs,
        )
        .map_err(|e| Self::rpc_error(&format!("Failed to create market: {}", e)))?;

        info!("Created market {}", market_id);
        Ok(market_id)
    }

    async fn market_place_bet(&self, params: PlaceBetParams) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&params.sender), params.stake);

        handlers::handle_place_bet(&mut state.module, &ctx, params.market_id, params.prediction)
            .map_err(|e| Self::rpc_error(&format!("Failed to place bet: {}", e)))?;

        // Stake and prediction stay out of the log.
        info!(
            "Bet placed on market {} by {}",
            params.market_id, params.sender
        );
        Ok(true)
    }

    async fn market_request_resolution(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<u64, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&sender), 0);

        let request_id = handlers::handle_request_resolution(&mut state.module, &ctx, market_id)
            .map_err(|e| Self::rpc_error(&format!("Failed to request resolution: {}", e)))?;

        info!(
            "Resolution requested for market {} (request {})",
            market_id, request_id
        );
        Ok(request_id)
    }

    async fn market_enable_refund(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&sender), 0);

        handlers::handle_enable_refund_for_timeout(&mut state.module, &ctx, market_id)
            .map_err(|e| Self::rpc_error(&format!("Failed to enable refunds: {}", e)))?;

        info!("Refunds enabled for market {}", market_id);
        Ok(true)
    }

    async fn market_emergency_withdraw(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<u64, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&sender), 0);

        let amount = handlers::handle_emergency_withdraw(&mut state.module, &ctx, market_id)
            .map_err(|e| Self::rpc_error(&format!("Failed to withdraw: {}", e)))?;

        info!("Emergency withdrawal of {} from market {}", amount, market_id);
        Ok(amount)
    }

    async fn market_claim_winnings(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<u64, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&sender), 0);

        let winnings = handlers::handle_claim_winnings(&mut state.module, &ctx, market_id)
            .map_err(|e| Self::rpc_error(&format!("Failed to claim winnings: {}", e)))?;

        info!("Winnings claimed on market {} by {}", market_id, sender);
        Ok(winnings)
    }

    async fn market_claim_refund(
        &self,
        sender: String,
        market_id: u64,
    ) -> Result<u64, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&sender), 0);

        let refund = handlers::handle_claim_refund(&mut state.module, &ctx, market_id)
            .map_err(|e| Self::rpc_error(&format!("Failed to claim refund: {}", e)))?;

        info!("Refund claimed on market {} by {}", market_id, sender);
        Ok(refund)
    }

    async fn market_set_paused(
        &self,
        sender: String,
        paused: bool,
    ) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&sender), 0);

        handlers::handle_set_paused(&mut state.module, &ctx, paused)
            .map_err(|e| Self::rpc_error(&format!("Failed to set pause: {}", e)))?;

        info!("Pause set to {}", paused);
        Ok(true)
    }

    async fn market_transfer_ownership(
        &self,
        sender: String,
        new_owner: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&sender), 0);

        handlers::handle_transfer_ownership(&mut state.module, &ctx, parse_address(&new_owner))
            .map_err(|e| Self::rpc_error(&format!("Failed to transfer ownership: {}", e)))?;

        info!("Ownership transferred to {}", new_owner);
        Ok(true)
    }

    async fn market_update_gateway_key(
        &self,
        sender: String,
        gateway_key: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let key: [u8; 32] = hex::decode(&gateway_key)
            .map_err(|e| Self::rpc_error(&format!("Invalid gateway key hex: {}", e)))?
            .try_into()
            .map_err(|_| Self::rpc_error("Gateway key must be 32 bytes"))?;

        let mut state = self.state.write();
        let ctx = call_ctx(&state, parse_address(&sender), 0);

        handlers::handle_update_gateway_key(&mut state.module, &ctx, key)
            .map_err(|e| Self::rpc_error(&format!("Failed to update gateway key: {}", e)))?;

        info!("Gateway key updated");
        Ok(true)
    }

    async fn chain_get_block_info(&self) -> Result<BlockInfo, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(BlockInfo {
            height: state.block_height,
            timestamp: state.timestamp,
        })
    }

    async fn query_get_market(
        &self,
        market_id: u64,
    ) -> Result<Option<MarketRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.module.get_market(market_id).map(MarketRpc::from))
    }

    async fn query_list_markets(&self) -> Result<Vec<MarketSummaryRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        let count = state.module.markets.len();
        Ok(queries::get_market_summaries(&state.module, 0, count)
            .iter()
            .map(MarketSummaryRpc::from)
            .collect())
    }

    async fn query_get_open_markets(&self) -> Result<Vec<MarketSummaryRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(queries::get_open_markets(&state.module, state.timestamp)
            .iter()
            .map(MarketSummaryRpc::from)
            .collect())
    }

    async fn query_get_public_totals(
        &self,
        market_id: u64,
    ) -> Result<Option<PublicTotalsRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .get_market(market_id)
            .map(|market| PublicTotalsRpc::from(queries::PublicTotalsView::from_market(market))))
    }

    async fn query_get_bet_exists(
        &self,
        market_id: u64,
        bettor: String,
    ) -> Result<bool, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .bets
            .contains_key(&(market_id, parse_address(&bettor))))
    }

    async fn query_get_market_bettors(
        &self,
        market_id: u64,
    ) -> Result<Vec<String>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state
            .module
            .market_bettors
            .get(&market_id)
            .map(|bettors| bettors.iter().map(hex::encode).collect())
            .unwrap_or_default())
    }

    async fn query_get_total_markets(&self) -> Result<u64, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(state.module.markets.len() as u64)
    }

    async fn query_get_bet_ciphertexts(
        &self,
        market_id: u64,
        bettor: String,
        caller: String,
    ) -> Result<Option<BetCiphertextsRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        let caller = parse_address(&caller);
        Ok(state
            .module
            .bets
            .get(&(market_id, parse_address(&bettor)))
            .filter(|bet| bet.access.contains(&caller))
            .map(|bet| BetCiphertextsRpc::from(bet.ciphertexts())))
    }

    async fn query_get_decryption_status(
        &self,
        market_id: u64,
    ) -> Result<Option<DecryptionStatusRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(
            queries::decryption_status(&state.module, market_id, state.timestamp)
                .map(DecryptionStatusRpc::from),
        )
    }

    async fn query_get_vault(&self) -> Result<VaultRpc, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(VaultRpc {
            balance: state.module.vault.balance(),
            total_deposited: state.module.vault.total_deposited().to_string(),
            total_paid: state.module.vault.total_paid().to_string(),
        })
    }

    async fn query_get_pending_requests(
        &self,
    ) -> Result<Vec<PendingDecryptionRpc>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(queries::get_pending_requests(&state.module)
            .iter()
            .map(PendingDecryptionRpc::from)
            .collect())
    }

    async fn query_get_timed_out_markets(&self) -> Result<Vec<u64>, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(queries::get_timed_out_markets(&state.module, state.timestamp))
    }

    async fn query_get_gateway_key(&self) -> Result<String, ErrorObjectOwned> {
        let state = self.state.read();
        Ok(hex::encode(state.module.config.gateway_key))
    }
}

/// Background task playing the decryption gateway.
///
/// Each tick takes a read-lock snapshot of the cipher log and pending
/// requests, materializes cleartexts off the lock, then applies the signed
/// callbacks under a write lock. Locks never live across an await.
async fn run_gateway_worker(
    state: Arc<RwLock<ChainState>>,
    mut gateway: DecryptionGateway,
    config: GatewayConfig,
) {
    let mut poll = tokio::time::interval(Duration::from_millis(config.poll_interval_ms));
    loop {
        poll.tick().await;

        let (log, pending, enabled) = {
            let chain = state.read();
            (
                chain.module.cipher_ops.clone(),
                queries::get_pending_requests(&chain.module),
                chain.gateway_enabled,
            )
        };

        if gateway.is_enabled() != enabled {
            gateway.set_enabled(enabled);
        }
        if pending.is_empty() {
            continue;
        }

        let outcomes = gateway.process_pending(&log, &pending);
        if outcomes.is_empty() {
            continue;
        }

        let mut chain = state.write();
        let ctx = call_ctx(&chain, [0u8; 32], 0);
        for outcome in outcomes {
            let DecryptionOutcome {
                request_id,
                market_id,
                cleartexts,
                attestation,
            } = outcome;
            match handlers::handle_resolve_market_callback(
                &mut chain.module,
                &ctx,
                request_id,
                cleartexts,
                &attestation,
            ) {
                Ok(()) => info!(request_id, market_id, "Settlement callback applied"),
                Err(e) => warn!(request_id, error = %e, "Settlement callback rejected"),
            }
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mock_chain=info".parse()?)
                .add_directive("market_gateway=info".parse()?)
                .add_directive("jsonrpsee=warn".parse()?),
        )
        .init();

    let addr: SocketAddr = "127.0.0.1:9944".parse()?;

    let gateway = DecryptionGateway::generate();
    let gateway_key = gateway.verifying_key_bytes();
    info!("Gateway verification key: {}", hex::encode(gateway_key));

    let genesis = MarketGenesisConfig::with_gateway([0u8; 32], gateway_key);
    let state = Arc::new(RwLock::new(ChainState::new(&genesis)));

    tokio::spawn(run_gateway_worker(
        state.clone(),
        gateway,
        GatewayConfig::default(),
    ));

    info!("Starting mock chain server on {}", addr);

    let server = Server::builder().build(addr).await?;
    let handle = server.start(MockChainServer { state, gateway_key }.into_rpc());

    info!("Mock chain server running. Press Ctrl+C to stop.");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;

    info!("Shutting down...");
    handle.stop()?;
    handle.stopped().await;

    Ok(())
}
