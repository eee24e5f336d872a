//! Error types for gateway operations.

use thiserror::Error;

/// Errors that can occur while replaying the cipher log or decrypting.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("Unknown ciphertext handle {0}")]
    UnknownHandle(String),

    #[error("Ciphertext arithmetic overflow")]
    ArithmeticOverflow,

    #[error("Cipher log shrank: have {have} entries, already processed {processed}")]
    LogTruncated { have: usize, processed: usize },

    #[error("Duplicate handle {0} in cipher log")]
    DuplicateHandle(String),
}
