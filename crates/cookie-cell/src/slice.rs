//! CellSlice for reading data from cells.
//!
//! A CellSlice reads a cell front to back, tracking the position within its
//! bits and references. A failed read leaves the position where it was.

use crate::{Cell, CellBuilder, CellError, CellResult, MsgAddress};

/// A slice view into a Cell for reading data.
///
/// # Example
///
/// ```
/// use cookie_cell::{CellBuilder, CellSlice};
///
/// let mut builder = CellBuilder::new();
/// builder.store_u32(0x12345678).unwrap();
/// let cell = builder.build().unwrap();
///
/// let mut slice = CellSlice::new(&cell);
/// assert_eq!(slice.load_u32().unwrap(), 0x12345678);
/// assert!(slice.load_bit().is_err());
/// ```
#[derive(Debug, Clone)]
pub struct CellSlice<'a> {
    pub(crate) cell: &'a Cell,
    /// Current bit offset within the cell data.
    pub(crate) bit_offset: usize,
    /// Number of bits remaining (from bit_offset).
    pub(crate) bit_len: usize,
    pub(crate) ref_offset: usize,
}

impl<'a> CellSlice<'a> {
    /// Create a new slice from a cell.
    pub fn new(cell: &'a Cell) -> Self {
        CellSlice {
            cell,
            bit_offset: 0,
            bit_len: cell.bit_len(),
            ref_offset: 0,
        }
    }

    fn ensure_bits(&self, need: usize) -> CellResult<()> {
        if need > self.bit_len {
            return Err(CellError::BufferExhausted {
                need,
                have: self.bit_len,
                unit: "bits",
            });
        }
        Ok(())
    }

    fn ensure_refs(&self, need: usize) -> CellResult<()> {
        let have = self.refs_left();
        if need > have {
            return Err(CellError::BufferExhausted {
                need,
                have,
                unit: "refs",
            });
        }
        Ok(())
    }

    /// Read `bits` bits without bounds checks; caller has checked.
    fn take_uint(&mut self, bits: usize) -> u64 {
        let mut result: u64 = 0;
        for _ in 0..bits {
            result = (result << 1) | self.get_bit_at(self.bit_offset) as u64;
            self.bit_offset += 1;
            self.bit_len -= 1;
        }
        result
    }

    /// Load a single bit.
    pub fn load_bit(&mut self) -> CellResult<bool> {
        self.ensure_bits(1)?;
        Ok(self.take_uint(1) == 1)
    }

    /// Load multiple bits.
    pub fn load_bits(&mut self, count: usize) -> CellResult<Vec<bool>> {
        self.ensure_bits(count)?;
        Ok((0..count).map(|_| self.take_uint(1) == 1).collect())
    }

    /// Load an unsigned 8-bit integer.
    pub fn load_u8(&mut self) -> CellResult<u8> {
        self.load_uint(8).map(|v| v as u8)
    }

    /// Load an unsigned 16-bit integer (big-endian).
    pub fn load_u16(&mut self) -> CellResult<u16> {
        self.load_uint(16).map(|v| v as u16)
    }

    /// Load an unsigned 32-bit integer (big-endian).
    pub fn load_u32(&mut self) -> CellResult<u32> {
        self.load_uint(32).map(|v| v as u32)
    }

    /// Load an unsigned 64-bit integer (big-endian).
    pub fn load_u64(&mut self) -> CellResult<u64> {
        self.load_uint(64)
    }

    /// Load a signed 8-bit integer.
    pub fn load_i8(&mut self) -> CellResult<i8> {
        self.load_int(8).map(|v| v as i8)
    }

    /// Load a signed 16-bit integer (big-endian).
    pub fn load_i16(&mut self) -> CellResult<i16> {
        self.load_int(16).map(|v| v as i16)
    }

    /// Load a signed 32-bit integer (big-endian).
    pub fn load_i32(&mut self) -> CellResult<i32> {
        self.load_int(32).map(|v| v as i32)
    }

    /// Load a signed 64-bit integer (big-endian).
    pub fn load_i64(&mut self) -> CellResult<i64> {
        self.load_int(64)
    }

    /// Load an unsigned integer with a specific bit width.
    pub fn load_uint(&mut self, bits: usize) -> CellResult<u64> {
        if bits > 64 {
            return Err(CellError::InvalidBitLength(bits));
        }
        self.ensure_bits(bits)?;
        Ok(self.take_uint(bits))
    }

    /// Read an unsigned integer without advancing.
    pub fn preload_uint(&self, bits: usize) -> CellResult<u64> {
        self.clone().load_uint(bits)
    }

    /// Load a signed integer with a specific bit width (two's complement).
    pub fn load_int(&mut self, bits: usize) -> CellResult<i64> {
        let unsigned = self.load_uint(bits)?;
        if bits == 0 || bits == 64 {
            return Ok(unsigned as i64);
        }

        // Sign extend
        let shift = 64 - bits;
        Ok(((unsigned << shift) as i64) >> shift)
    }

    /// Load a byte array.
    pub fn load_bytes(&mut self, count: usize) -> CellResult<Vec<u8>> {
        self.ensure_bits(count * 8)?;

        if self.bit_offset.is_multiple_of(8) {
            let start = self.bit_offset / 8;
            let bytes = self.cell.data()[start..start + count].to_vec();
            self.bit_offset += count * 8;
            self.bit_len -= count * 8;
            return Ok(bytes);
        }
        Ok((0..count).map(|_| self.take_uint(8) as u8).collect())
    }

    /// Load a reference to another cell.
    pub fn load_ref(&mut self) -> CellResult<&'a Cell> {
        self.ensure_refs(1)?;
        let reference = self
            .cell
            .reference(self.ref_offset)
            .ok_or(CellError::CellNotFound(self.ref_offset))?;
        self.ref_offset += 1;
        Ok(reference.as_ref())
    }

    /// Load `Maybe ^Cell`.
    pub fn load_maybe_ref(&mut self) -> CellResult<Option<&'a Cell>> {
        let mut probe = self.clone();
        let present = probe.load_bit()?;
        let cell = if present { Some(probe.load_ref()?) } else { None };
        *self = probe;
        Ok(cell)
    }

    /// Copy the next `bits` bits and `refs` references into a new cell.
    pub fn load_slice(&mut self, bits: usize, refs: usize) -> CellResult<Cell> {
        self.ensure_bits(bits)?;
        self.ensure_refs(refs)?;

        let mut builder = CellBuilder::new();
        for i in 0..bits {
            builder.store_bit(self.get_bit_at(self.bit_offset + i))?;
        }
        for i in 0..refs {
            if let Some(reference) = self.cell.reference(self.ref_offset + i) {
                builder.store_ref(reference.clone())?;
            }
        }

        self.skip_bits(bits)?;
        self.skip_refs(refs)?;
        builder.build()
    }

    /// Load coins (VarUInteger 16).
    ///
    /// Format: 4 bits for byte length, then the value in that many bytes.
    pub fn load_coins(&mut self) -> CellResult<u128> {
        let byte_len = self.preload_uint(4)? as usize;
        self.ensure_bits(4 + byte_len * 8)?;
        self.take_uint(4);

        let mut result: u128 = 0;
        for _ in 0..byte_len {
            result = (result << 8) | self.take_uint(8) as u128;
        }
        Ok(result)
    }

    /// Load a message address.
    ///
    /// Accepts `addr_none$00` and `addr_std$10`; an anycast prefix is skipped.
    pub fn load_address(&mut self) -> CellResult<MsgAddress> {
        let mut probe = self.clone();
        let address = match probe.load_uint(2)? {
            0b00 => MsgAddress::Null,
            0b10 => {
                if probe.load_bit()? {
                    // anycast: depth:(#<= 30) rewrite_pfx:(bits depth)
                    let depth = probe.load_uint(5)?;
                    probe.skip_bits(depth as usize)?;
                }
                let workchain = probe.load_i8()?;
                let mut address = [0u8; 32];
                address.copy_from_slice(&probe.load_bytes(32)?);
                MsgAddress::Internal { workchain, address }
            }
            tag => {
                return Err(CellError::InvalidAddress(format!(
                    "Unsupported address tag: {:02b}",
                    tag
                )));
            }
        };
        *self = probe;
        Ok(address)
    }

    /// Remaining bits as bytes; fails if they are not byte-aligned.
    pub fn load_remaining_bytes(&mut self) -> CellResult<Vec<u8>> {
        if !self.bit_len.is_multiple_of(8) {
            return Err(CellError::InvalidBitLength(self.bit_len));
        }
        self.load_bytes(self.bit_len / 8)
    }

    /// Get the number of bits remaining.
    pub fn bits_left(&self) -> usize {
        self.bit_len
    }

    /// Get the number of references remaining.
    pub fn refs_left(&self) -> usize {
        self.cell.reference_count() - self.ref_offset
    }

    /// Skip a number of bits.
    pub fn skip_bits(&mut self, count: usize) -> CellResult<()> {
        self.ensure_bits(count)?;
        self.bit_offset += count;
        self.bit_len -= count;
        Ok(())
    }

    /// Skip a number of references.
    pub fn skip_refs(&mut self, count: usize) -> CellResult<()> {
        self.ensure_refs(count)?;
        self.ref_offset += count;
        Ok(())
    }

    /// Check if the slice is empty (no bits or refs left).
    pub fn is_empty(&self) -> bool {
        self.bit_len == 0 && self.refs_left() == 0
    }

    pub(crate) fn get_bit_at(&self, index: usize) -> bool {
        self.cell.get_bit(index).unwrap_or(false)
    }

    /// Get the underlying cell.
    pub fn cell(&self) -> &'a Cell {
        self.cell
    }

    /// Get the current bit offset.
    pub fn bit_offset(&self) -> usize {
        self.bit_offset
    }

    /// Get the current reference offset.
    pub fn ref_offset(&self) -> usize {
        self.ref_offset
    }
}
