use thiserror::Error;

use crate::constants::KEY_LEN;

#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("cipher key must be exactly {KEY_LEN} bytes, got {0}")]
    InvalidKeyLength(usize),
    #[error("payload cannot be serialized to JSON text: {0}")]
    Json(#[from] serde_json::Error),
}

/// Covers every way a presence-table stream can fail to match the table it
/// is loaded into: wrong shape, truncation, or plain io failure.
#[derive(Error, Debug)]
pub enum SerializationError {
    #[error(
        "`block_count` and/or `block_byte_size` mismatch: \
         expected {expected_block_count}/{expected_block_byte_size}, \
         got {actual_block_count}/{actual_block_byte_size}"
    )]
    ShapeMismatch {
        expected_block_count: u16,
        expected_block_byte_size: u32,
        actual_block_count: u16,
        actual_block_byte_size: u32,
    },
    #[error("stream ended unexpectedly in the header: got {got}/{expected} bytes")]
    TruncatedHeader { expected: usize, got: usize },
    #[error("stream too small: at block {block}, got {got}/{expected} bytes")]
    TruncatedBlock {
        block: usize,
        expected: usize,
        got: usize,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
