//! Error types for Fortune Cookie NFT operations.

use thiserror::Error;

/// Errors that can occur while encoding or decoding NFT messages.
#[derive(Debug, Error)]
pub enum NftError {
    /// Decoded content does not start with the off-chain prefix byte.
    #[error("Unknown content prefix: 0x{0:02x}")]
    UnknownContentPrefix(u8),

    /// Decoded content is empty, so it has no prefix byte at all.
    #[error("Content is empty")]
    EmptyContent,

    /// A snake cell holds a bit count that is not a whole number of bytes.
    #[error("Snake cell holds {bits} bits, not a multiple of 8")]
    MisalignedContent { bits: usize },

    /// Content bytes are not valid UTF-8.
    #[error("Content is not valid UTF-8: {0}")]
    InvalidUtf8(String),

    /// Batch mint received more items than one message can carry.
    #[error("Batch too large: {got} items (max {max})")]
    BatchTooLarge { max: usize, got: usize },

    /// Two batch mint items share an index.
    #[error("Duplicate item index in batch: {0}")]
    DuplicateIndex(u64),

    /// Message body starts with an opcode this crate does not know.
    #[error("Unknown opcode: 0x{0:08x}")]
    UnknownOpcode(u32),

    /// Cell operation error.
    #[error("Cell error: {0}")]
    CellError(#[from] cookie_cell::CellError),

    /// Get method returned unexpected result.
    #[error("Unexpected get method result: {0}")]
    UnexpectedResult(String),

    /// Get method execution failed.
    #[error("Get method failed with exit code: {0}")]
    GetMethodFailed(i32),

    /// Stack is empty or has insufficient entries.
    #[error("Stack underflow: expected {expected} entries, got {actual}")]
    StackUnderflow { expected: usize, actual: usize },

    /// Invalid stack entry type.
    #[error("Invalid stack entry type: expected {expected}, got {actual}")]
    InvalidStackEntry {
        expected: &'static str,
        actual: String,
    },

    /// Stack entry kind that is valid on chain but not handled here.
    #[error("Unsupported stack entry tag: 0x{0:02x}")]
    UnsupportedStackEntry(u8),

    /// Integer does not fit the type it is read into.
    #[error("Integer {value} out of range for {target}")]
    IntegerOutOfRange { value: String, target: &'static str },
}

/// Result type for NFT operations.
pub type NftResult<T> = Result<T, NftError>;
