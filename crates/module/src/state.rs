//! On-chain state structures for the market module.

use market_types::{
    combined_cipher_handle, fresh_cipher_handle, offset_cipher_handle, Address, Bet, CipherOp,
    CiphertextHandle, EventRecord, Market, MarketEvent, PendingDecryption,
};
use std::collections::HashMap;

use crate::genesis::{MarketGenesisConfig, MarketParams};

/// Owner-controlled module switches.
#[derive(Debug, Clone)]
pub struct AdminConfig {
    /// Module owner, allowed to pause and rotate the gateway key
    pub owner: Address,
    /// While set, new markets and bets are rejected
    pub paused: bool,
    /// Ed25519 public key trusted for settlement attestations
    pub gateway_key: [u8; 32],
}

/// Custody of all staked funds.
///
/// `balance` is the spendable pot. The lifetime counters are u128 so the
/// conservation identity `total_deposited == balance + total_paid` survives
/// any realistic volume.
#[derive(Debug, Default)]
pub struct Vault {
    balance: u64,
    total_deposited: u128,
    total_paid: u128,
    /// Lifetime payouts per address
    paid_out: HashMap<Address, u64>,
}

impl Vault {
    pub fn balance(&self) -> u64 {
        self.balance
    }

    pub fn total_deposited(&self) -> u128 {
        self.total_deposited
    }

    pub fn total_paid(&self) -> u128 {
        self.total_paid
    }

    /// Lifetime amount paid out to an address.
    pub fn paid_out(&self, address: &Address) -> u64 {
        self.paid_out.get(address).copied().unwrap_or(0)
    }

    /// Take custody of an incoming stake.
    pub fn deposit(&mut self, amount: u64) {
        self.balance += amount;
        self.total_deposited += u128::from(amount);
    }

    /// Whether the vault can pay out `amount` right now.
    pub fn can_cover(&self, amount: u64) -> bool {
        self.balance >= amount
    }

    /// Pay out to an address. Returns false if the balance is short.
    pub fn transfer_out(&mut self, to: Address, amount: u64) -> bool {
        if self.balance < amount {
            return false;
        }
        self.balance -= amount;
        self.total_paid += u128::from(amount);
        *self.paid_out.entry(to).or_insert(0) += amount;
        true
    }
}

/// Market module state.
///
/// In a real Sovereign SDK implementation, these would be StateMap/StateValue
/// types. This is a simplified in-memory representation for development.
#[derive(Debug)]
pub struct MarketState {
    /// Owner switches and the registered gateway key
    pub config: AdminConfig,

    /// Stake band and timeout parameters fixed at genesis
    pub params: MarketParams,

    /// Next market ID to assign
    pub next_market_id: u64,

    /// Next decryption request ID to assign
    pub next_request_id: u64,

    /// Next cipher log sequence number
    next_op_seq: u64,

    /// All markets by ID
    pub markets: HashMap<u64, Market>,

    /// Bets: (market_id, bettor) -> bet
    pub bets: HashMap<(u64, Address), Bet>,

    /// Bettors per market, in placement order
    pub market_bettors: HashMap<u64, Vec<Address>>,

    /// In-flight decryption requests by request ID
    pub pending_decryptions: HashMap<u64, PendingDecryption>,

    /// Append-only symbolic cipher log replayed by the gateway
    pub cipher_ops: Vec<CipherOp>,

    /// Vault holding every staked unit
    pub vault: Vault,

    /// Emitted events in chain order
    pub events: Vec<EventRecord>,
}

impl MarketState {
    /// Create module state from a genesis configuration.
    pub fn new(genesis: &MarketGenesisConfig) -> Self {
        Self {
            config: AdminConfig {
                owner: genesis.owner,
                paused: genesis.paused,
                gateway_key: genesis.gateway_key,
            },
            params: genesis.params.clone(),
            next_market_id: 1,
            next_request_id: 1,
            next_op_seq: 0,
            markets: HashMap::new(),
            bets: HashMap::new(),
            market_bettors: HashMap::new(),
            pending_decryptions: HashMap::new(),
            cipher_ops: Vec::new(),
            vault: Vault::default(),
            events: Vec::new(),
        }
    }

    /// Get the next market ID and increment.
    pub fn allocate_market_id(&mut self) -> u64 {
        let id = self.next_market_id;
        self.next_market_id += 1;
        id
    }

    /// Get the next decryption request ID and increment.
    pub fn allocate_request_id(&mut self) -> u64 {
        let id = self.next_request_id;
        self.next_request_id += 1;
        id
    }

    /// Get market by ID.
    pub fn get_market(&self, market_id: u64) -> Option<&Market> {
        self.markets.get(&market_id)
    }

    /// Get mutable market by ID.
    pub fn get_market_mut(&mut self, market_id: u64) -> Option<&mut Market> {
        self.markets.get_mut(&market_id)
    }

    /// Number of bettors in a market.
    pub fn num_bettors(&self, market_id: u64) -> usize {
        self.market_bettors
            .get(&market_id)
            .map(|bettors| bettors.len())
            .unwrap_or(0)
    }

    /// Encrypt a plaintext the module knows, appending to the cipher log.
    pub fn mint_trivial(&mut self, value: u64) -> CiphertextHandle {
        let handle = fresh_cipher_handle(self.next_op_seq);
        self.next_op_seq += 1;
        self.cipher_ops
            .push(CipherOp::TrivialEncrypt { handle, value });
        handle
    }

    /// Append a homomorphic addition of two ciphertexts.
    pub fn mint_add(&mut self, lhs: CiphertextHandle, rhs: CiphertextHandle) -> CiphertextHandle {
        let handle = combined_cipher_handle(self.next_op_seq, &lhs, &rhs);
        self.next_op_seq += 1;
        self.cipher_ops.push(CipherOp::Add { handle, lhs, rhs });
        handle
    }

    /// Append a homomorphic addition of a plaintext constant.
    pub fn mint_add_plain(&mut self, lhs: CiphertextHandle, value: u64) -> CiphertextHandle {
        let handle = offset_cipher_handle(self.next_op_seq, &lhs);
        self.next_op_seq += 1;
        self.cipher_ops
            .push(CipherOp::AddPlain { handle, lhs, value });
        handle
    }

    /// Record a public notification.
    pub fn record_event(&mut self, block_height: u64, timestamp: u64, event: MarketEvent) {
        self.events.push(EventRecord {
            block_height,
            timestamp,
            event,
        });
    }
}
