//! Settlement callback attestations.
//!
//! The module authenticates callbacks by signature alone: any sender may
//! deliver one, but the attested digest binds the request id and the exact
//! cleartexts, so a forged or replayed callback cannot move a market.

use ed25519_dalek::{Signature, Signer, SigningKey, VerifyingKey};
use market_types::GatewayAttestation;
use sha2::{Digest, Sha256};

/// Domain-tagged digest a gateway signs for a settlement callback.
pub fn callback_digest(request_id: u64, cleartexts: &[u64]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(b"MARKET_SETTLEMENT_V1:");
    hasher.update(request_id.to_le_bytes());
    hasher.update((cleartexts.len() as u64).to_le_bytes());
    for value in cleartexts {
        hasher.update(value.to_le_bytes());
    }
    hasher.finalize().into()
}

/// Sign a settlement callback with the gateway key.
pub fn sign_callback(
    signing_key: &SigningKey,
    request_id: u64,
    cleartexts: &[u64],
) -> GatewayAttestation {
    let digest = callback_digest(request_id, cleartexts);
    GatewayAttestation(signing_key.sign(&digest).to_bytes())
}

/// Verify a settlement callback attestation against the registered
/// gateway public key. Returns false on any malformed input.
pub fn verify_callback(
    public_key: &[u8; 32],
    request_id: u64,
    cleartexts: &[u64],
    attestation: &GatewayAttestation,
) -> bool {
    let verifying_key = match VerifyingKey::from_bytes(public_key) {
        Ok(key) => key,
        Err(_) => return false,
    };
    let signature = Signature::from_bytes(&attestation.0);
    let digest = callback_digest(request_id, cleartexts);

    verifying_key.verify_strict(&digest, &signature).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn test_sign_verify_roundtrip() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = signing_key.verifying_key().to_bytes();

        let cleartexts = vec![5_000_000, 3_000_000];
        let attestation = sign_callback(&signing_key, 7, &cleartexts);

        assert!(verify_callback(&public_key, 7, &cleartexts, &attestation));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let other_key = SigningKey::generate(&mut OsRng);

        let cleartexts = vec![5_000_000, 3_000_000];
        let attestation = sign_callback(&signing_key, 7, &cleartexts);

        assert!(!verify_callback(
            &other_key.verifying_key().to_bytes(),
            7,
            &cleartexts,
            &attestation
        ));
    }

    #[test]
    fn test_tampered_cleartexts_rejected() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = signing_key.verifying_key().to_bytes();

        let attestation = sign_callback(&signing_key, 7, &[5_000_000, 3_000_000]);

        assert!(!verify_callback(
            &public_key,
            7,
            &[5_000_001, 3_000_000],
            &attestation
        ));
    }

    #[test]
    fn test_tampered_request_id_rejected() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let public_key = signing_key.verifying_key().to_bytes();

        let cleartexts = vec![5_000_000, 3_000_000];
        let attestation = sign_callback(&signing_key, 7, &cleartexts);

        assert!(!verify_callback(&public_key, 8, &cleartexts, &attestation));
    }

    #[test]
    fn test_digest_binds_cleartext_order() {
        let a = callback_digest(1, &[10, 20]);
        let b = callback_digest(1, &[20, 10]);
        assert_ne!(a, b);
    }

    #[test]
    fn test_invalid_public_key_rejected() {
        let signing_key = SigningKey::generate(&mut OsRng);
        let cleartexts = vec![1];
        let attestation = sign_callback(&signing_key, 1, &cleartexts);

        // Not a valid curve point encoding.
        let bogus_key = [0xFF; 32];
        assert!(!verify_callback(&bogus_key, 1, &cleartexts, &attestation));
    }
}
