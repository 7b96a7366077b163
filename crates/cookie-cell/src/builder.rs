//! CellBuilder for constructing cells.
//!
//! Every write checks the full width it needs before touching the buffer.
//! A write that would overflow the cell fails with
//! [`CellError::CapacityExceeded`] and leaves the builder poisoned: all later
//! writes and [`CellBuilder::build`] fail the same way, so a partial cell can
//! never escape.

use std::sync::Arc;

use crate::{Cell, CellError, CellResult, CellSlice, MsgAddress, MAX_CELL_BITS, MAX_CELL_REFS};

/// Largest byte length a coins amount can declare in its 4-bit prefix.
const MAX_COINS_BYTES: usize = 15;

/// Builder for constructing cells.
///
/// # Example
///
/// ```
/// use cookie_cell::CellBuilder;
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// builder.store_bytes(&[1, 2, 3, 4]).unwrap();
/// let cell = builder.build().unwrap();
/// assert_eq!(cell.bit_len(), 64);
/// ```
#[derive(Debug, Clone)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    references: Vec<Arc<Cell>>,
    /// Set by the first rejected write.
    overflowed: Option<(usize, usize)>,
}

impl CellBuilder {
    /// Create a new empty CellBuilder.
    pub fn new() -> Self {
        CellBuilder {
            data: Vec::with_capacity(128),
            bit_len: 0,
            references: Vec::new(),
            overflowed: None,
        }
    }

    /// Reserve room for `bits` more bits and `refs` more references.
    fn reserve(&mut self, bits: usize, refs: usize) -> CellResult<()> {
        if let Some((bits, refs)) = self.overflowed {
            return Err(CellError::CapacityExceeded { bits, refs });
        }

        let total_bits = self.bit_len + bits;
        let total_refs = self.references.len() + refs;
        if total_bits > MAX_CELL_BITS || total_refs > MAX_CELL_REFS {
            self.overflowed = Some((total_bits, total_refs));
            return Err(CellError::CapacityExceeded {
                bits: total_bits,
                refs: total_refs,
            });
        }
        Ok(())
    }

    /// Append one bit; capacity must already be reserved.
    fn push_bit(&mut self, bit: bool) {
        let byte_index = self.bit_len / 8;
        if byte_index >= self.data.len() {
            self.data.push(0);
        }
        if bit {
            self.data[byte_index] |= 1 << (7 - self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    /// Append the low `bits` bits of `value`, most significant first.
    fn push_uint(&mut self, value: u64, bits: usize) {
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
    }

    /// Append whole bytes; capacity must already be reserved.
    fn push_bytes(&mut self, bytes: &[u8]) {
        if self.bit_len.is_multiple_of(8) {
            self.data.extend_from_slice(bytes);
            self.bit_len += bytes.len() * 8;
        } else {
            for &byte in bytes {
                self.push_uint(byte as u64, 8);
            }
        }
    }

    /// Store a single bit.
    pub fn store_bit(&mut self, bit: bool) -> CellResult<&mut Self> {
        self.reserve(1, 0)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store multiple bits.
    pub fn store_bits(&mut self, bits: &[bool]) -> CellResult<&mut Self> {
        self.reserve(bits.len(), 0)?;
        for &bit in bits {
            self.push_bit(bit);
        }
        Ok(self)
    }

    /// Store an unsigned 8-bit integer.
    pub fn store_u8(&mut self, value: u8) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 8)
    }

    /// Store an unsigned 16-bit integer (big-endian).
    pub fn store_u16(&mut self, value: u16) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 16)
    }

    /// Store an unsigned 32-bit integer (big-endian).
    pub fn store_u32(&mut self, value: u32) -> CellResult<&mut Self> {
        self.store_uint(value as u64, 32)
    }

    /// Store an unsigned 64-bit integer (big-endian).
    pub fn store_u64(&mut self, value: u64) -> CellResult<&mut Self> {
        self.store_uint(value, 64)
    }

    /// Store a signed 8-bit integer.
    pub fn store_i8(&mut self, value: i8) -> CellResult<&mut Self> {
        self.store_int(value as i64, 8)
    }

    /// Store a signed 16-bit integer (big-endian).
    pub fn store_i16(&mut self, value: i16) -> CellResult<&mut Self> {
        self.store_int(value as i64, 16)
    }

    /// Store a signed 32-bit integer (big-endian).
    pub fn store_i32(&mut self, value: i32) -> CellResult<&mut Self> {
        self.store_int(value as i64, 32)
    }

    /// Store a signed 64-bit integer (big-endian).
    pub fn store_i64(&mut self, value: i64) -> CellResult<&mut Self> {
        self.store_int(value, 64)
    }

    /// Store an unsigned integer with a specific bit width, big-endian.
    pub fn store_uint(&mut self, value: u64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        if bits < 64 && value >> bits != 0 {
            return Err(CellError::ValueOutOfRange {
                value: value as i128,
                bits,
            });
        }

        self.reserve(bits, 0)?;
        self.push_uint(value, bits);
        Ok(self)
    }

    /// Store a signed integer with a specific bit width (two's complement).
    pub fn store_int(&mut self, value: i64, bits: usize) -> CellResult<&mut Self> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        let fits = match bits {
            0 => value == 0,
            64 => true,
            _ => {
                let min = -(1i64 << (bits - 1));
                let max = (1i64 << (bits - 1)) - 1;
                (min..=max).contains(&value)
            }
        };
        if !fits {
            return Err(CellError::ValueOutOfRange {
                value: value as i128,
                bits,
            });
        }

        self.reserve(bits, 0)?;
        self.push_uint(value as u64, bits);
        Ok(self)
    }

    /// Store a byte array.
    pub fn store_bytes(&mut self, bytes: &[u8]) -> CellResult<&mut Self> {
        self.reserve(bytes.len() * 8, 0)?;
        self.push_bytes(bytes);
        Ok(self)
    }

    /// Store the remaining bits and references of a CellSlice.
    pub fn store_slice(&mut self, slice: &CellSlice) -> CellResult<&mut Self> {
        self.reserve(slice.bits_left(), slice.refs_left())?;

        for i in 0..slice.bits_left() {
            self.push_bit(slice.get_bit_at(slice.bit_offset + i));
        }
        for i in slice.ref_offset..slice.cell.reference_count() {
            if let Some(reference) = slice.cell.reference(i) {
                self.references.push(reference.clone());
            }
        }

        Ok(self)
    }

    /// Store a reference to another cell.
    pub fn store_ref(&mut self, cell: impl Into<Arc<Cell>>) -> CellResult<&mut Self> {
        self.reserve(0, 1)?;
        self.references.push(cell.into());
        Ok(self)
    }

    /// Store `Maybe ^Cell`: a 0 bit, or a 1 bit followed by a reference.
    pub fn store_maybe_ref(&mut self, cell: Option<impl Into<Arc<Cell>>>) -> CellResult<&mut Self> {
        match cell {
            Some(cell) => {
                self.reserve(1, 1)?;
                self.push_bit(true);
                self.references.push(cell.into());
                Ok(self)
            }
            None => self.store_bit(false),
        }
    }

    /// Store coins (VarUInteger 16).
    ///
    /// Format: 4 bits of byte length, then the value in that many bytes,
    /// big-endian. Zero is stored as a zero length and no bytes.
    pub fn store_coins(&mut self, nanotons: u128) -> CellResult<&mut Self> {
        let byte_len = ((128 - nanotons.leading_zeros()) as usize).div_ceil(8);
        if byte_len > MAX_COINS_BYTES {
            return Err(CellError::InvalidCoins(nanotons));
        }

        self.reserve(4 + byte_len * 8, 0)?;
        self.push_uint(byte_len as u64, 4);
        let be = nanotons.to_be_bytes();
        self.push_bytes(&be[be.len() - byte_len..]);
        Ok(self)
    }

    /// Store a message address.
    ///
    /// ```text
    /// addr_none$00 = MsgAddressExt;
    /// addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256 = MsgAddressInt;
    /// ```
    pub fn store_address(&mut self, addr: &MsgAddress) -> CellResult<&mut Self> {
        match addr {
            MsgAddress::Null => {
                self.reserve(2, 0)?;
                self.push_uint(0b00, 2);
            }
            MsgAddress::Internal { workchain, address } => {
                self.reserve(MsgAddress::STD_BITS, 0)?;
                self.push_uint(0b10, 2);
                // no anycast
                self.push_bit(false);
                self.push_uint(*workchain as u8 as u64, 8);
                self.push_bytes(address);
            }
        }
        Ok(self)
    }

    /// Get the number of bits that can still be stored.
    pub fn bits_left(&self) -> usize {
        MAX_CELL_BITS - self.bit_len
    }

    /// Get the number of references that can still be added.
    pub fn refs_left(&self) -> usize {
        MAX_CELL_REFS - self.references.len()
    }

    /// Get the current number of bits stored.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Get the current number of references.
    pub fn ref_count(&self) -> usize {
        self.references.len()
    }

    /// Build the cell.
    ///
    /// Fails if any earlier write overflowed the builder.
    pub fn build(self) -> CellResult<Cell> {
        if let Some((bits, refs)) = self.overflowed {
            return Err(CellError::CapacityExceeded { bits, refs });
        }
        Ok(Cell::new(self.data, self.bit_len, self.references))
    }
}

impl Default for CellBuilder {
    fn default() -> Self {
        Self::new()
    }
}
