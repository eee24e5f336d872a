//! End-to-end integration tests for the confidential market system.
//!
//! These tests exercise the full market lifecycle:
//! 1. Genesis with a registered gateway key
//! 2. Market creation
//! 3. Encrypted bet placement
//! 4. Off-chain cipher log replay and attested callbacks
//! 5. Settlement, refunds, and the timeout ladder

use market_gateway::{sign_callback, CipherEngine, DecryptionGateway};
use market_module::{
    apply_call, handlers, queries, CallContext, CallOutcome, MarketCall, MarketError,
    MarketGenesisConfig, MarketState,
};
use market_types::constants::{
    DECRYPTION_TIMEOUT_SECS, EMERGENCY_TIMEOUT_SECS, MIN_BET,
};
use market_types::{Address, MarketStatus};

use ed25519_dalek::SigningKey;
use rand::rngs::OsRng;
use rand::Rng;

const T0: u64 = 1_700_000_000;
const DAY: u64 = 86_400;
const OWNER: Address = [0u8; 32];
const CREATOR: Address = [1u8; 32];

/// Test the complete market flow with the in-process gateway.
#[test]
fn test_full_market_flow() {
    // ========================================
    // Phase 1: Setup - Genesis with gateway key
    // ========================================

    let mut gateway = DecryptionGateway::generate();
    let genesis = MarketGenesisConfig::with_gateway(OWNER, gateway.verifying_key_bytes());
    let mut state = MarketState::new(&genesis);

    println!("Setup complete: Gateway key registered");

    // ========================================
    // Phase 2: Create market
    // ========================================

    let market_id = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0, 0),
        "Will the bridge upgrade ship this quarter?".to_string(),
        DAY,
    )
    .expect("Failed to create market");

    println!("Market {} created", market_id);

    // ========================================
    // Phase 3: Bettors place encrypted bets
    // ========================================

    let alice = [2u8; 32];
    let bob = [3u8; 32];
    let carol = [4u8; 32];

    handlers::handle_place_bet(&mut state, &ctx(alice, T0 + 100, 2_000_000), market_id, true)
        .expect("Failed to place Alice's bet");
    handlers::handle_place_bet(&mut state, &ctx(bob, T0 + 200, 3_000_000), market_id, true)
        .expect("Failed to place Bob's bet");
    handlers::handle_place_bet(&mut state, &ctx(carol, T0 + 300, 4_000_000), market_id, false)
        .expect("Failed to place Carol's bet");

    assert_eq!(state.vault.balance(), 9_000_000);
    println!("3 bets placed, vault holds 9000000");

    // The public totals are decoys: strictly below the real pools and
    // useless for settlement.
    let market = state.get_market(market_id).unwrap();
    assert!(market.public_yes_total < 5_000_000);
    assert!(market.public_no_total < 4_000_000);

    // ========================================
    // Phase 4: Resolution through the gateway
    // ========================================

    let end = T0 + DAY;
    let request_id = handlers::handle_request_resolution(&mut state, &ctx(CREATOR, end, 0), market_id)
        .expect("Failed to request resolution");

    // The symbolic cipher log really carries the pools.
    let mut engine = CipherEngine::new();
    engine.ingest(&state.cipher_ops).expect("Replay failed");
    let market = state.get_market(market_id).unwrap();
    assert_eq!(engine.decrypt(&market.yes_cipher_total).unwrap(), 5_000_000);
    assert_eq!(engine.decrypt(&market.no_cipher_total).unwrap(), 4_000_000);

    let pending = queries::get_pending_requests(&state);
    let outcomes = gateway.process_pending(&state.cipher_ops, &pending);
    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].request_id, request_id);
    assert_eq!(outcomes[0].cleartexts, vec![5_000_000, 4_000_000]);

    println!("Gateway decrypted pools: YES=5000000 NO=4000000");

    handlers::handle_resolve_market_callback(
        &mut state,
        &ctx([9u8; 32], end + 60, 0),
        outcomes[0].request_id,
        outcomes[0].cleartexts.clone(),
        &outcomes[0].attestation,
    )
    .expect("Callback rejected");

    let market = state.get_market(market_id).unwrap();
    assert_eq!(market.status, MarketStatus::Resolved);
    assert_eq!(market.outcome, Some(true));

    println!("Market resolved: YES wins");

    // ========================================
    // Phase 5: Winners claim, loser gets nothing
    // ========================================

    let alice_win = handlers::handle_claim_winnings(&mut state, &ctx(alice, end + 100, 0), market_id)
        .expect("Alice's claim failed");
    let bob_win = handlers::handle_claim_winnings(&mut state, &ctx(bob, end + 200, 0), market_id)
        .expect("Bob's claim failed");

    // Pro-rata: stake plus stake-weighted share of the losing pool.
    assert_eq!(alice_win, 3_600_000);
    assert_eq!(bob_win, 5_400_000);

    let carol_result = handlers::handle_claim_winnings(&mut state, &ctx(carol, end + 300, 0), market_id);
    assert!(matches!(carol_result, Err(MarketError::NoWinnings)));

    // Every deposited unit went out to winners.
    assert_eq!(state.vault.balance(), 0);
    assert_eq!(
        state.vault.total_deposited(),
        state.vault.total_paid() + u128::from(state.vault.balance())
    );

    println!("\nMarket settled successfully!");
    println!("  Alice: 3600000, Bob: 5400000, Carol: 0");
}

/// Test the refund path when the gateway never answers.
#[test]
fn test_gateway_down_timeout_refund() {
    let mut gateway = DecryptionGateway::generate();
    let genesis = MarketGenesisConfig::with_gateway(OWNER, gateway.verifying_key_bytes());
    let mut state = MarketState::new(&genesis);

    let market_id = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0, 0),
        "Will the gateway stay up?".to_string(),
        DAY,
    )
    .unwrap();

    let alice = [2u8; 32];
    let bob = [3u8; 32];
    handlers::handle_place_bet(&mut state, &ctx(alice, T0 + 100, 2_000_000), market_id, true).unwrap();
    handlers::handle_place_bet(&mut state, &ctx(bob, T0 + 200, 5_000_000), market_id, false).unwrap();

    let end = T0 + DAY;
    handlers::handle_request_resolution(&mut state, &ctx(CREATOR, end, 0), market_id).unwrap();

    // The gateway is down: no callbacks come back.
    gateway.set_enabled(false);
    let pending = queries::get_pending_requests(&state);
    assert!(gateway.process_pending(&state.cipher_ops, &pending).is_empty());

    // Before the timeout nobody can force refunds.
    let early = handlers::handle_enable_refund_for_timeout(
        &mut state,
        &ctx(alice, end + DECRYPTION_TIMEOUT_SECS - 1, 0),
        market_id,
    );
    assert!(matches!(early, Err(MarketError::TimeoutNotReached)));

    // At the timeout, any participant flips the market.
    handlers::handle_enable_refund_for_timeout(
        &mut state,
        &ctx(alice, end + DECRYPTION_TIMEOUT_SECS, 0),
        market_id,
    )
    .unwrap();
    assert_eq!(
        state.get_market(market_id).unwrap().status,
        MarketStatus::RefundEnabled
    );

    // Everyone gets exactly their stake back, winners and losers alike.
    let at = end + DECRYPTION_TIMEOUT_SECS + 10;
    assert_eq!(
        handlers::handle_claim_refund(&mut state, &ctx(alice, at, 0), market_id).unwrap(),
        2_000_000
    );
    assert_eq!(
        handlers::handle_claim_refund(&mut state, &ctx(bob, at, 0), market_id).unwrap(),
        5_000_000
    );
    assert_eq!(state.vault.balance(), 0);

    // A very late gateway answer finds no request to settle.
    gateway.set_enabled(true);
    let outcomes = gateway.process_pending(&state.cipher_ops, &queries::get_pending_requests(&state));
    assert!(outcomes.is_empty());

    println!("Refund path verified: both stakes returned in full");
}

/// A second resolution request cannot pile onto an outstanding one.
#[test]
fn test_duplicate_request_rejected() {
    let gateway = DecryptionGateway::generate();
    let genesis = MarketGenesisConfig::with_gateway(OWNER, gateway.verifying_key_bytes());
    let mut state = MarketState::new(&genesis);

    let market_id = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0, 0),
        "Will it settle once?".to_string(),
        DAY,
    )
    .unwrap();
    handlers::handle_place_bet(&mut state, &ctx([2u8; 32], T0 + 100, MIN_BET), market_id, true)
        .unwrap();

    let end = T0 + DAY;
    handlers::handle_request_resolution(&mut state, &ctx(CREATOR, end, 0), market_id).unwrap();

    let second = handlers::handle_request_resolution(&mut state, &ctx(CREATOR, end + 60, 0), market_id);
    assert!(matches!(second, Err(MarketError::RequestOutstanding)));
    assert_eq!(queries::get_pending_requests(&state).len(), 1);
}

/// Well-signed callbacks for unknown requests bounce off.
#[test]
fn test_unknown_request_callback_rejected() {
    let signing_key = SigningKey::generate(&mut OsRng);
    let genesis = MarketGenesisConfig::with_gateway(OWNER, signing_key.verifying_key().to_bytes());
    let mut state = MarketState::new(&genesis);

    let market_id = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0, 0),
        "Will phantom requests settle?".to_string(),
        DAY,
    )
    .unwrap();
    handlers::handle_place_bet(&mut state, &ctx([2u8; 32], T0 + 100, MIN_BET), market_id, true)
        .unwrap();

    // The signature itself is valid; the request does not exist.
    let cleartexts = vec![MIN_BET, 0];
    let attestation = sign_callback(&signing_key, 999, &cleartexts);
    let result = handlers::handle_resolve_market_callback(
        &mut state,
        &ctx([9u8; 32], T0 + DAY, 0),
        999,
        cleartexts,
        &attestation,
    );
    assert!(matches!(result, Err(MarketError::UnknownRequest(999))));
    assert_eq!(
        state.get_market(market_id).unwrap().status,
        MarketStatus::Active
    );
}

/// An attestation from an unregistered key never settles a market.
#[test]
fn test_forged_attestation_rejected() {
    let gateway = DecryptionGateway::generate();
    let genesis = MarketGenesisConfig::with_gateway(OWNER, gateway.verifying_key_bytes());
    let mut state = MarketState::new(&genesis);

    let market_id = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0, 0),
        "Will forged callbacks land?".to_string(),
        DAY,
    )
    .unwrap();
    handlers::handle_place_bet(&mut state, &ctx([2u8; 32], T0 + 100, MIN_BET), market_id, true)
        .unwrap();

    let end = T0 + DAY;
    let request_id =
        handlers::handle_request_resolution(&mut state, &ctx(CREATOR, end, 0), market_id).unwrap();

    let rogue = SigningKey::generate(&mut OsRng);
    let cleartexts = vec![0, u64::MAX];
    let attestation = sign_callback(&rogue, request_id, &cleartexts);
    let result = handlers::handle_resolve_market_callback(
        &mut state,
        &ctx([9u8; 32], end + 60, 0),
        request_id,
        cleartexts,
        &attestation,
    );
    assert!(matches!(result, Err(MarketError::InvalidAttestation)));

    // The request is still live and the real gateway can still answer it.
    assert_eq!(queries::get_pending_requests(&state).len(), 1);
}

/// The refund boundary is inclusive, the emergency boundary exclusive.
#[test]
fn test_timeout_boundary_exactness() {
    let gateway = DecryptionGateway::generate();
    let genesis = MarketGenesisConfig::with_gateway(OWNER, gateway.verifying_key_bytes());
    let mut state = MarketState::new(&genesis);

    let market_id = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0, 0),
        "Will the clocks agree?".to_string(),
        DAY,
    )
    .unwrap();
    handlers::handle_place_bet(&mut state, &ctx([2u8; 32], T0 + 100, MIN_BET), market_id, true)
        .unwrap();

    let end = T0 + DAY;
    handlers::handle_request_resolution(&mut state, &ctx(CREATOR, end, 0), market_id).unwrap();

    // Refund enablement: rejected one second before, accepted exactly at
    // requested_at + timeout.
    let refund_deadline = end + DECRYPTION_TIMEOUT_SECS;
    assert!(matches!(
        handlers::handle_enable_refund_for_timeout(
            &mut state,
            &ctx([5u8; 32], refund_deadline - 1, 0),
            market_id
        ),
        Err(MarketError::TimeoutNotReached)
    ));
    handlers::handle_enable_refund_for_timeout(
        &mut state,
        &ctx([5u8; 32], refund_deadline, 0),
        market_id,
    )
    .unwrap();

    // Emergency sweep: rejected exactly at end_time + timeout, accepted one
    // second after.
    let sweep_deadline = end + EMERGENCY_TIMEOUT_SECS;
    assert!(matches!(
        handlers::handle_emergency_withdraw(&mut state, &ctx(CREATOR, sweep_deadline, 0), market_id),
        Err(MarketError::EmergencyTimeoutNotReached)
    ));
    let swept =
        handlers::handle_emergency_withdraw(&mut state, &ctx(CREATOR, sweep_deadline + 1, 0), market_id)
            .unwrap();
    assert_eq!(swept, MIN_BET);
    assert_eq!(state.vault.balance(), 0);
}

/// Vault conservation with a crowd of random bettors.
#[test]
fn test_vault_conservation_many_bettors() {
    let mut rng = rand::thread_rng();
    let mut gateway = DecryptionGateway::generate();
    let genesis = MarketGenesisConfig::with_gateway(OWNER, gateway.verifying_key_bytes());
    let mut state = MarketState::new(&genesis);

    let market_id = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0, 0),
        "Will the vault balance?".to_string(),
        DAY,
    )
    .unwrap();

    let mut bettors: Vec<(Address, u64, bool)> = Vec::new();
    for i in 0..20u8 {
        let mut addr = [0u8; 32];
        addr[0] = i + 10;
        let stake = rng.gen_range(MIN_BET..=10 * MIN_BET);
        let prediction = rng.gen_bool(0.5);
        handlers::handle_place_bet(
            &mut state,
            &ctx(addr, T0 + 100 + u64::from(i), stake),
            market_id,
            prediction,
        )
        .unwrap();
        bettors.push((addr, stake, prediction));
    }

    let total_staked: u64 = bettors.iter().map(|(_, stake, _)| stake).sum();
    assert_eq!(state.vault.balance(), total_staked);

    // Settle through the gateway with the pools the log actually carries.
    let end = T0 + DAY;
    handlers::handle_request_resolution(&mut state, &ctx(CREATOR, end, 0), market_id).unwrap();
    let outcomes = gateway.process_pending(&state.cipher_ops, &queries::get_pending_requests(&state));
    assert_eq!(outcomes.len(), 1);
    handlers::handle_resolve_market_callback(
        &mut state,
        &ctx([9u8; 32], end + 60, 0),
        outcomes[0].request_id,
        outcomes[0].cleartexts.clone(),
        &outcomes[0].attestation,
    )
    .unwrap();

    let outcome = state.get_market(market_id).unwrap().outcome.unwrap();

    // Every winner claims; every loser is rejected.
    let mut total_paid = 0u64;
    for (addr, stake, prediction) in &bettors {
        let result = handlers::handle_claim_winnings(&mut state, &ctx(*addr, end + 100, 0), market_id);
        if *prediction == outcome {
            let winnings = result.expect("Winner claim failed");
            assert!(winnings >= *stake);
            total_paid += winnings;
        } else {
            assert!(matches!(result, Err(MarketError::NoWinnings)));
        }
    }

    // Flooring in the per-winner shares can strand dust, never overdraw.
    assert!(total_paid <= total_staked);
    assert_eq!(
        state.vault.total_deposited(),
        state.vault.total_paid() + u128::from(state.vault.balance())
    );

    println!(
        "Conservation held: staked={} paid={} dust={}",
        total_staked,
        total_paid,
        total_staked - total_paid
    );
}

/// Pausing blocks intake only; in-flight markets keep every exit.
#[test]
fn test_pause_blocks_intake_only() {
    let mut gateway = DecryptionGateway::generate();
    let genesis = MarketGenesisConfig::with_gateway(OWNER, gateway.verifying_key_bytes());
    let mut state = MarketState::new(&genesis);

    let market_id = match apply_call(
        &mut state,
        &ctx(CREATOR, T0, 0),
        MarketCall::CreateMarket {
            question: "Will the pause spare us?".to_string(),
            duration_secs: DAY,
        },
    )
    .unwrap()
    {
        CallOutcome::MarketCreated(id) => id,
        other => panic!("unexpected outcome: {other:?}"),
    };

    let alice = [2u8; 32];
    apply_call(
        &mut state,
        &ctx(alice, T0 + 100, 2_000_000),
        MarketCall::PlaceBet {
            market_id,
            prediction: true,
        },
    )
    .unwrap();

    apply_call(&mut state, &ctx(OWNER, T0 + 200, 0), MarketCall::SetPaused { paused: true }).unwrap();

    // Intake is rejected.
    assert!(matches!(
        apply_call(
            &mut state,
            &ctx(CREATOR, T0 + 300, 0),
            MarketCall::CreateMarket {
                question: "Another?".to_string(),
                duration_secs: DAY,
            },
        ),
        Err(MarketError::Paused)
    ));
    assert!(matches!(
        apply_call(
            &mut state,
            &ctx([3u8; 32], T0 + 300, 2_000_000),
            MarketCall::PlaceBet {
                market_id,
                prediction: false,
            },
        ),
        Err(MarketError::Paused)
    ));

    // Resolution, callback and claims all run under pause.
    let end = T0 + DAY;
    apply_call(
        &mut state,
        &ctx(CREATOR, end, 0),
        MarketCall::RequestResolution { market_id },
    )
    .unwrap();
    let outcomes = gateway.process_pending(&state.cipher_ops, &queries::get_pending_requests(&state));
    apply_call(
        &mut state,
        &ctx([9u8; 32], end + 60, 0),
        MarketCall::ResolveMarketCallback {
            request_id: outcomes[0].request_id,
            cleartexts: outcomes[0].cleartexts.clone(),
            attestation: outcomes[0].attestation.clone(),
        },
    )
    .unwrap();

    let outcome = apply_call(
        &mut state,
        &ctx(alice, end + 100, 0),
        MarketCall::ClaimWinnings { market_id },
    )
    .unwrap();
    assert_eq!(outcome, CallOutcome::WinningsClaimed(2_000_000));
    assert_eq!(state.vault.balance(), 0);
}

/// The gateway engine picks up new log entries incrementally.
#[test]
fn test_cipher_log_incremental_replay() {
    let gateway = DecryptionGateway::generate();
    let genesis = MarketGenesisConfig::with_gateway(OWNER, gateway.verifying_key_bytes());
    let mut state = MarketState::new(&genesis);

    let first = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0, 0),
        "First market?".to_string(),
        DAY,
    )
    .unwrap();
    handlers::handle_place_bet(&mut state, &ctx([2u8; 32], T0 + 100, 2_000_000), first, true)
        .unwrap();

    let mut engine = CipherEngine::new();
    engine.ingest(&state.cipher_ops).unwrap();
    let processed = engine.processed();

    // More activity lands after the first replay.
    let second = handlers::handle_create_market(
        &mut state,
        &ctx(CREATOR, T0 + 200, 0),
        "Second market?".to_string(),
        DAY,
    )
    .unwrap();
    handlers::handle_place_bet(&mut state, &ctx([3u8; 32], T0 + 300, 3_000_000), second, false)
        .unwrap();

    engine.ingest(&state.cipher_ops).unwrap();
    assert!(engine.processed() > processed);

    let m1 = state.get_market(first).unwrap();
    let m2 = state.get_market(second).unwrap();
    assert_eq!(engine.decrypt(&m1.yes_cipher_total).unwrap(), 2_000_000);
    assert_eq!(engine.decrypt(&m1.no_cipher_total).unwrap(), 0);
    assert_eq!(engine.decrypt(&m2.yes_cipher_total).unwrap(), 0);
    assert_eq!(engine.decrypt(&m2.no_cipher_total).unwrap(), 3_000_000);
}

// Helper functions

fn ctx(sender: Address, timestamp: u64, value: u64) -> CallContext {
    CallContext {
        sender,
        block_height: 100,
        timestamp,
        value,
    }
}
