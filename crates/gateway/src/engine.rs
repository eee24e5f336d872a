//! Symbolic ciphertext evaluation.
//!
//! The module's cipher log is an ordered list of operations in which every
//! handle appears as a result before it appears as an operand. Replaying
//! the log in a single forward pass therefore resolves every handle to its
//! plaintext. The engine keeps a cursor so repeated syncs against a growing
//! log only evaluate the new suffix.

use std::collections::HashMap;

use market_types::{CipherOp, CiphertextHandle};
use tracing::debug;

use crate::error::GatewayError;

/// Evaluator for the module's symbolic cipher log.
#[derive(Debug, Default)]
pub struct CipherEngine {
    /// Materialized plaintexts (handle -> value)
    values: HashMap<CiphertextHandle, u64>,
    /// Number of log entries already evaluated
    processed: usize,
}

impl CipherEngine {
    /// Create an engine with no evaluated state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluate any log entries beyond the cursor.
    ///
    /// The log is append-only; a shorter log than previously seen means the
    /// caller handed us state from a different chain.
    pub fn ingest(&mut self, log: &[CipherOp]) -> Result<(), GatewayError> {
        if log.len() < self.processed {
            return Err(GatewayError::LogTruncated {
                have: log.len(),
                processed: self.processed,
            });
        }

        for op in &log[self.processed..] {
            self.apply(op)?;
            self.processed += 1;
        }

        Ok(())
    }

    fn apply(&mut self, op: &CipherOp) -> Result<(), GatewayError> {
        let (handle, value) = match op {
            CipherOp::TrivialEncrypt { handle, value } => (*handle, *value),
            CipherOp::Add { handle, lhs, rhs } => {
                let sum = self
                    .lookup(lhs)?
                    .checked_add(self.lookup(rhs)?)
                    .ok_or(GatewayError::ArithmeticOverflow)?;
                (*handle, sum)
            }
            CipherOp::AddPlain { handle, lhs, value } => {
                let sum = self
                    .lookup(lhs)?
                    .checked_add(*value)
                    .ok_or(GatewayError::ArithmeticOverflow)?;
                (*handle, sum)
            }
        };

        // A rejected entry must leave previously materialized values untouched.
        if self.values.contains_key(&handle) {
            return Err(GatewayError::DuplicateHandle(handle.to_hex()));
        }
        self.values.insert(handle, value);

        debug!(
            handle = handle.to_hex(),
            log_position = self.processed,
            "Evaluated cipher op"
        );

        Ok(())
    }

    fn lookup(&self, handle: &CiphertextHandle) -> Result<u64, GatewayError> {
        self.values
            .get(handle)
            .copied()
            .ok_or_else(|| GatewayError::UnknownHandle(handle.to_hex()))
    }

    /// Resolve a handle to its plaintext.
    pub fn decrypt(&self, handle: &CiphertextHandle) -> Result<u64, GatewayError> {
        self.lookup(handle)
    }

    /// Number of log entries evaluated so far.
    pub fn processed(&self) -> usize {
        self.processed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use market_types::{combined_cipher_handle, fresh_cipher_handle, offset_cipher_handle};

    fn trivial(op_seq: u64, value: u64) -> (CiphertextHandle, CipherOp) {
        let handle = fresh_cipher_handle(op_seq);
        (handle, CipherOp::TrivialEncrypt { handle, value })
    }

    #[test]
    fn test_trivial_encrypt_roundtrip() {
        let mut engine = CipherEngine::new();
        let (handle, op) = trivial(0, 42);

        engine.ingest(&[op]).unwrap();
        assert_eq!(engine.decrypt(&handle).unwrap(), 42);
    }

    #[test]
    fn test_homomorphic_add() {
        let mut engine = CipherEngine::new();
        let (a, op_a) = trivial(0, 10);
        let (b, op_b) = trivial(1, 32);
        let sum = combined_cipher_handle(2, &a, &b);

        engine
            .ingest(&[
                op_a,
                op_b,
                CipherOp::Add {
                    handle: sum,
                    lhs: a,
                    rhs: b,
                },
            ])
            .unwrap();

        assert_eq!(engine.decrypt(&sum).unwrap(), 42);
    }

    #[test]
    fn test_add_plain() {
        let mut engine = CipherEngine::new();
        let (a, op_a) = trivial(0, 1_000_000);
        let offset = offset_cipher_handle(1, &a);

        engine
            .ingest(&[
                op_a,
                CipherOp::AddPlain {
                    handle: offset,
                    lhs: a,
                    value: 37,
                },
            ])
            .unwrap();

        assert_eq!(engine.decrypt(&offset).unwrap(), 1_000_037);
    }

    #[test]
    fn test_incremental_ingest() {
        let mut engine = CipherEngine::new();
        let (a, op_a) = trivial(0, 5);
        let (b, op_b) = trivial(1, 7);
        let sum = combined_cipher_handle(2, &a, &b);

        let mut log = vec![op_a];
        engine.ingest(&log).unwrap();
        assert_eq!(engine.processed(), 1);

        log.push(op_b);
        log.push(CipherOp::Add {
            handle: sum,
            lhs: a,
            rhs: b,
        });
        engine.ingest(&log).unwrap();
        assert_eq!(engine.processed(), 3);
        assert_eq!(engine.decrypt(&sum).unwrap(), 12);

        // A second sync with no new entries is a no-op.
        engine.ingest(&log).unwrap();
        assert_eq!(engine.processed(), 3);
    }

    #[test]
    fn test_unknown_operand_rejected() {
        let mut engine = CipherEngine::new();
        let a = fresh_cipher_handle(0);
        let b = fresh_cipher_handle(1);
        let sum = combined_cipher_handle(2, &a, &b);

        let result = engine.ingest(&[CipherOp::Add {
            handle: sum,
            lhs: a,
            rhs: b,
        }]);
        assert!(matches!(result, Err(GatewayError::UnknownHandle(_))));
    }

    #[test]
    fn test_overflow_rejected() {
        let mut engine = CipherEngine::new();
        let (a, op_a) = trivial(0, u64::MAX);
        let (b, op_b) = trivial(1, 1);
        let sum = combined_cipher_handle(2, &a, &b);

        let result = engine.ingest(&[
            op_a,
            op_b,
            CipherOp::Add {
                handle: sum,
                lhs: a,
                rhs: b,
            },
        ]);
        assert!(matches!(result, Err(GatewayError::ArithmeticOverflow)));
    }

    #[test]
    fn test_truncated_log_rejected() {
        let mut engine = CipherEngine::new();
        let (_, op_a) = trivial(0, 5);
        let (_, op_b) = trivial(1, 7);

        engine.ingest(&[op_a.clone(), op_b]).unwrap();
        let result = engine.ingest(&[op_a]);
        assert!(matches!(
            result,
            Err(GatewayError::LogTruncated {
                have: 1,
                processed: 2
            })
        ));
    }

    #[test]
    fn test_duplicate_handle_rejected_without_clobber() {
        let mut engine = CipherEngine::new();
        let (handle, op) = trivial(0, 42);
        // Same op_seq derives the same handle, so this entry collides.
        let (_, clobber) = trivial(0, 99);

        let result = engine.ingest(&[op, clobber]);
        assert!(matches!(result, Err(GatewayError::DuplicateHandle(_))));

        // The rejected entry must leave the original plaintext intact.
        assert_eq!(engine.decrypt(&handle).unwrap(), 42);
    }
}
