//! Gateway service implementation.

use ed25519_dalek::SigningKey;
use market_types::{CipherOp, GatewayAttestation, PendingDecryption};
use rand::rngs::OsRng;
use tracing::{debug, info, warn};

use crate::attest::sign_callback;
use crate::engine::CipherEngine;
use crate::error::GatewayError;

/// Configuration for a gateway polling loop.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Interval between polls of the pending-request set, in milliseconds
    pub poll_interval_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 500,
        }
    }
}

/// A settled decryption request, ready to be delivered as a callback.
#[derive(Debug, Clone)]
pub struct DecryptionOutcome {
    pub request_id: u64,
    pub market_id: u64,
    /// Cleartexts in the order the request named its handles
    pub cleartexts: Vec<u64>,
    pub attestation: GatewayAttestation,
}

/// The off-chain decryption gateway.
///
/// Holds the signing key whose public half the module registers at genesis,
/// plus the replay engine. The `enabled` switch models gateway downtime for
/// exercising the timeout paths.
pub struct DecryptionGateway {
    signing_key: SigningKey,
    engine: CipherEngine,
    enabled: bool,
}

impl DecryptionGateway {
    /// Create a gateway from an existing signing key.
    pub fn new(signing_key: SigningKey) -> Self {
        Self {
            signing_key,
            engine: CipherEngine::new(),
            enabled: true,
        }
    }

    /// Create a gateway with a freshly generated signing key.
    pub fn generate() -> Self {
        Self::new(SigningKey::generate(&mut OsRng))
    }

    /// Public key participants register as the trusted gateway key.
    pub fn verifying_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// Toggle request processing. While disabled the gateway ignores
    /// pending requests entirely, as a crashed gateway would.
    pub fn set_enabled(&mut self, enabled: bool) {
        info!(enabled, "Gateway availability changed");
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Replay new cipher log entries and answer every pending request the
    /// engine can satisfy. Requests whose handles cannot be resolved are
    /// skipped and retried on the next poll.
    pub fn process_pending(
        &mut self,
        log: &[CipherOp],
        pending: &[PendingDecryption],
    ) -> Vec<DecryptionOutcome> {
        if !self.enabled {
            debug!(
                pending = pending.len(),
                "Gateway disabled, ignoring pending requests"
            );
            return Vec::new();
        }

        if let Err(err) = self.engine.ingest(log) {
            warn!(error = %err, "Cipher log replay failed");
            return Vec::new();
        }

        let mut outcomes = Vec::new();
        for request in pending {
            match self.materialize(request) {
                Ok(cleartexts) => {
                    let attestation =
                        sign_callback(&self.signing_key, request.request_id, &cleartexts);
                    info!(
                        request_id = request.request_id,
                        market_id = request.market_id,
                        "Produced settlement attestation"
                    );
                    outcomes.push(DecryptionOutcome {
                        request_id: request.request_id,
                        market_id: request.market_id,
                        cleartexts,
                        attestation,
                    });
                }
                Err(err) => {
                    warn!(
                        request_id = request.request_id,
                        market_id = request.market_id,
                        error = %err,
                        "Could not materialize cleartexts"
                    );
                }
            }
        }

        outcomes
    }

    fn materialize(&self, request: &PendingDecryption) -> Result<Vec<u64>, GatewayError> {
        request
            .handles
            .iter()
            .map(|handle| self.engine.decrypt(handle))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attest::verify_callback;
    use market_types::{combined_cipher_handle, fresh_cipher_handle};

    fn sample_log_and_request() -> (Vec<CipherOp>, PendingDecryption) {
        let yes_a = fresh_cipher_handle(0);
        let yes_b = fresh_cipher_handle(1);
        let yes_total = combined_cipher_handle(2, &yes_a, &yes_b);
        let no_total = fresh_cipher_handle(3);

        let log = vec![
            CipherOp::TrivialEncrypt {
                handle: yes_a,
                value: 2_000_000,
            },
            CipherOp::TrivialEncrypt {
                handle: yes_b,
                value: 3_000_000,
            },
            CipherOp::Add {
                handle: yes_total,
                lhs: yes_a,
                rhs: yes_b,
            },
            CipherOp::TrivialEncrypt {
                handle: no_total,
                value: 4_000_000,
            },
        ];

        let request = PendingDecryption {
            request_id: 1,
            market_id: 9,
            handles: vec![yes_total, no_total],
            requested_at: 1_700_000_000,
            requested_height: 100,
        };

        (log, request)
    }

    #[test]
    fn test_process_pending_produces_valid_attestation() {
        let mut gateway = DecryptionGateway::generate();
        let public_key = gateway.verifying_key_bytes();
        let (log, request) = sample_log_and_request();

        let outcomes = gateway.process_pending(&log, &[request]);
        assert_eq!(outcomes.len(), 1);

        let outcome = &outcomes[0];
        assert_eq!(outcome.request_id, 1);
        assert_eq!(outcome.market_id, 9);
        assert_eq!(outcome.cleartexts, vec![5_000_000, 4_000_000]);
        assert!(verify_callback(
            &public_key,
            outcome.request_id,
            &outcome.cleartexts,
            &outcome.attestation
        ));
    }

    #[test]
    fn test_disabled_gateway_ignores_requests() {
        let mut gateway = DecryptionGateway::generate();
        gateway.set_enabled(false);
        let (log, request) = sample_log_and_request();

        let outcomes = gateway.process_pending(&log, &[request.clone()]);
        assert!(outcomes.is_empty());

        // Re-enabling answers the same request.
        gateway.set_enabled(true);
        let outcomes = gateway.process_pending(&log, &[request]);
        assert_eq!(outcomes.len(), 1);
    }

    #[test]
    fn test_unresolvable_request_skipped() {
        let mut gateway = DecryptionGateway::generate();
        let (log, mut request) = sample_log_and_request();
        request.handles.push(fresh_cipher_handle(99));

        let outcomes = gateway.process_pending(&log, &[request]);
        assert!(outcomes.is_empty());
    }
}
