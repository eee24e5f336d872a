//! Off-chain decryption gateway for confidential markets.
//!
//! The market module never sees plaintext pools. It records every encrypted
//! operation in an append-only cipher log and, when a creator requests
//! resolution, registers a pending decryption naming the handles to open.
//! This crate is the off-chain half of that protocol:
//!
//! 1. **Replay**: the [`CipherEngine`] consumes the module's cipher log in
//!    order and materializes the plaintext behind every handle.
//!
//! 2. **Decrypt**: for each pending request, the gateway looks up the
//!    requested handles and produces their cleartexts.
//!
//! 3. **Attest**: the gateway signs `(request_id, cleartexts)` with its
//!    Ed25519 key. The module accepts a settlement callback from any sender,
//!    but only with a valid attestation over exactly those values.
//!
//! The gateway is untrusted with respect to liveness: if it never answers,
//! the module's timeout path enables refunds instead.

pub mod attest;
pub mod engine;
pub mod error;
pub mod service;

pub use attest::{callback_digest, sign_callback, verify_callback};
pub use engine::CipherEngine;
pub use error::GatewayError;
pub use service::{DecryptionGateway, DecryptionOutcome, GatewayConfig};
