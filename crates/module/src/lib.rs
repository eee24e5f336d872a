//! Confidential prediction market module.
//!
//! This module implements on-chain logic for binary markets whose stakes
//! and predictions stay encrypted:
//!
//! - Market creation with a betting deadline
//! - Encrypted bet placement with access-listed ciphertext handles
//! - Obfuscated public pool totals for display
//! - Async resolution through attested gateway callbacks
//! - Timeout escalation into refunds and an emergency sweep
//! - Multiplier-masked pro-rata payouts and exact-stake refunds
//!
//! # Architecture
//!
//! The module follows Sovereign SDK patterns:
//! - `call`: Message types for state-changing operations
//! - `handlers`: Business logic for processing calls
//! - `queries`: Read-only state access
//! - `state`: On-chain state structures
//! - `genesis`: Initial configuration
//! - `error`: Error types
//!
//! # Example
//!
//! ```ignore
//! use market_module::{MarketCall, handlers, state::MarketState};
//!
//! let mut state = MarketState::new(&genesis_config);
//! let ctx = handlers::CallContext { ... };
//!
//! // Create a market
//! let market_id = handlers::handle_create_market(&mut state, &ctx, ...)?;
//!
//! // Place a bet (the stake rides along as call value)
//! handlers::handle_place_bet(&mut state, &ctx, market_id, true)?;
//! ```

pub mod call;
pub mod error;
pub mod genesis;
pub mod handlers;
pub mod queries;
pub mod state;

pub use call::MarketCall;
pub use error::MarketError;
pub use genesis::{MarketGenesisConfig, MarketParams};
pub use handlers::{apply_call, CallContext, CallOutcome, HandlerResult};
pub use queries::{MarketQuery, MarketQueryResponse};
pub use state::MarketState;
