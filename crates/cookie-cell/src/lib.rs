//! Cells and Bag of Cells for the Fortune Cookie codec layer.
//!
//! This crate provides the bit-level building blocks every message and
//! storage layout is made of:
//!
//! - **Cell**: immutable node holding up to 1023 bits and 4 references
//! - **CellBuilder**: bounded writer that produces a Cell
//! - **CellSlice**: sequential reader over a Cell
//! - **Dictionary**: HashmapE prefix tree keyed by fixed-width integers
//! - **BagOfCells**: byte serialization of a cell tree
//! - **MsgAddress**: account address representation
//!
//! # Example
//!
//! ```
//! use cookie_cell::{BagOfCells, CellBuilder, CellSlice};
//!
//! let mut builder = CellBuilder::new();
//! builder.store_u32(0x12345678).unwrap();
//! builder.store_coins(50_000_000).unwrap();
//! let cell = builder.build().unwrap();
//!
//! let mut slice = CellSlice::new(&cell);
//! assert_eq!(slice.load_u32().unwrap(), 0x12345678);
//! assert_eq!(slice.load_coins().unwrap(), 50_000_000);
//!
//! let b64 = BagOfCells::from_root(cell).serialize_to_base64().unwrap();
//! let root = BagOfCells::deserialize_from_base64(&b64).unwrap();
//! assert_eq!(root.single_root().unwrap().bit_len(), 32 + 4 + 32);
//! ```

use sha2::{Digest, Sha256};
use thiserror::Error;

mod address;
mod boc;
mod builder;
mod cell;
mod dict;
mod slice;

pub use address::MsgAddress;
pub use boc::BagOfCells;
pub use builder::CellBuilder;
pub use cell::{Cell, DEPTH_BYTES, HASH_BYTES};
pub use dict::{DictValue, Dictionary};
pub use slice::CellSlice;

/// Errors that can occur during Cell/BoC operations.
#[derive(Debug, Error)]
pub enum CellError {
    /// A write would push the cell past 1023 bits or 4 references.
    ///
    /// `bits` and `refs` are the totals the rejected write would have produced.
    #[error("Cell capacity exceeded: {bits} bits, {refs} refs (max 1023 bits, 4 refs)")]
    CapacityExceeded { bits: usize, refs: usize },

    /// A read asked for more than the slice still holds.
    #[error("Buffer exhausted: need {need} {unit}, have {have}")]
    BufferExhausted {
        need: usize,
        have: usize,
        unit: &'static str,
    },

    /// Invalid BoC format.
    #[error("Invalid BoC format: {0}")]
    InvalidBoc(String),

    /// Cell not found in BoC.
    #[error("Cell not found: index {0}")]
    CellNotFound(usize),

    /// CRC32 checksum mismatch.
    #[error("CRC32 mismatch: expected 0x{expected:08x}, got 0x{actual:08x}")]
    CrcMismatch { expected: u32, actual: u32 },

    /// Unexpected end of data.
    #[error("Unexpected end of data")]
    UnexpectedEof,

    /// Invalid address format.
    #[error("Invalid address format: {0}")]
    InvalidAddress(String),

    /// Invalid base64 encoding.
    #[error("Invalid base64: {0}")]
    InvalidBase64(String),

    /// Expected single root but found multiple or none.
    #[error("Expected single root, found {0}")]
    NotSingleRoot(usize),

    /// Invalid bit length.
    #[error("Invalid bit length: {0}")]
    InvalidBitLength(usize),

    /// Integer does not fit the requested width.
    #[error("Value {value} does not fit in {bits} bits")]
    ValueOutOfRange { value: i128, bits: usize },

    /// Coins amount needs more than 15 bytes.
    #[error("Coins amount {0} exceeds 120 bits")]
    InvalidCoins(u128),

    /// Dictionary key does not fit the key width.
    #[error("Dictionary key {key} does not fit in {bits} bits")]
    InvalidDictKey { key: u64, bits: usize },

    /// Malformed dictionary structure.
    #[error("Invalid dictionary: {0}")]
    InvalidDict(String),

    /// Exotic cells are not produced or accepted here.
    #[error("Exotic cells are not supported")]
    ExoticCell,
}

/// Result type for Cell/BoC operations.
pub type CellResult<T> = Result<T, CellError>;

/// Maximum number of bits in a cell's data.
pub const MAX_CELL_BITS: usize = 1023;

/// Maximum number of references a cell can have.
pub const MAX_CELL_REFS: usize = 4;

/// Maximum depth of a cell tree.
pub const MAX_CELL_DEPTH: u16 = 1024;

/// BoC magic number for generic BoC.
pub const BOC_GENERIC_MAGIC: u32 = 0xb5ee9c72;

/// BoC magic number for indexed BoC.
pub const BOC_INDEXED_MAGIC: u32 = 0x68ff65f3;

/// BoC magic number for indexed CRC32 BoC.
pub const BOC_INDEXED_CRC32_MAGIC: u32 = 0xacc3a728;

/// Compute SHA256 hash of the input data.
fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    let result = hasher.finalize();
    let mut output = [0u8; 32];
    output.copy_from_slice(&result);
    output
}

/// Compute CRC32-C checksum (Castagnoli polynomial).
fn crc32c(data: &[u8]) -> u32 {
    const CRC32C: crc::Crc<u32> = crc::Crc::<u32>::new(&crc::CRC_32_ISCSI);
    CRC32C.checksum(data)
}

/// CRC16-XMODEM checksum used by user-friendly addresses.
fn crc16(data: &[u8]) -> u16 {
    const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
    CRC16.checksum(data)
}
