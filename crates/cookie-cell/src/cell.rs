//! Cell: the immutable node every on-chain structure is made of.
//!
//! A cell holds up to 1023 bits of data and up to 4 references to other
//! cells. Cells are built bottom-up, so a finalized cell only ever points at
//! finalized children and the tree is acyclic by construction.

use std::sync::Arc;

use crate::{sha256, MAX_CELL_BITS, MAX_CELL_REFS};

/// Hash size in bytes (SHA256).
pub const HASH_BYTES: usize = 32;

/// Depth size in bytes.
pub const DEPTH_BYTES: usize = 2;

/// An ordinary cell.
///
/// The representation hash and depth are computed once at construction.
/// Two cells compare equal when their hashes match, i.e. when their whole
/// subtrees are identical.
#[derive(Debug, Clone)]
pub struct Cell {
    /// Raw data bytes; bits past `bit_len` in the last byte are zero.
    pub(crate) data: Vec<u8>,
    pub(crate) bit_len: usize,
    pub(crate) references: Vec<Arc<Cell>>,
    hash: [u8; HASH_BYTES],
    depth: u16,
}

impl Cell {
    /// Create a cell from parts already checked against the capacity limits.
    ///
    /// Called by `CellBuilder::build()` and the BoC parser.
    pub(crate) fn new(data: Vec<u8>, bit_len: usize, references: Vec<Arc<Cell>>) -> Self {
        debug_assert!(bit_len <= MAX_CELL_BITS);
        debug_assert!(references.len() <= MAX_CELL_REFS);

        let depth = references
            .iter()
            .map(|r| r.depth.saturating_add(1))
            .max()
            .unwrap_or(0);

        let mut cell = Cell {
            data,
            bit_len,
            references,
            hash: [0u8; HASH_BYTES],
            depth,
        };
        cell.hash = sha256(&cell.cell_representation());
        cell
    }

    /// Create an empty cell.
    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    /// SHA256 representation hash of the cell and its subtree.
    pub fn hash(&self) -> [u8; HASH_BYTES] {
        self.hash
    }

    /// 0 for a leaf, otherwise 1 + the deepest child.
    pub fn depth(&self) -> u16 {
        self.depth
    }

    /// Bytes hashed to produce [`Cell::hash`]:
    /// descriptors, tagged data, child depths, child hashes.
    pub fn cell_representation(&self) -> Vec<u8> {
        let mut repr =
            Vec::with_capacity(2 + 128 + self.references.len() * (DEPTH_BYTES + HASH_BYTES));

        let (d1, d2) = self.descriptors();
        repr.push(d1);
        repr.push(d2);
        repr.extend_from_slice(&self.data_with_completion_tag());

        for reference in &self.references {
            repr.extend_from_slice(&reference.depth.to_be_bytes());
        }
        for reference in &self.references {
            repr.extend_from_slice(&reference.hash);
        }

        repr
    }

    /// Descriptor bytes (d1, d2).
    ///
    /// d1 = refs_count (ordinary cell, level 0)
    /// d2 = ceil(bit_len / 8) + floor(bit_len / 8)
    pub fn descriptors(&self) -> (u8, u8) {
        let d1 = self.references.len() as u8;
        let d2 = (self.bit_len.div_ceil(8) + self.bit_len / 8) as u8;
        (d1, d2)
    }

    /// Data with completion tag.
    ///
    /// If bit_len is not byte-aligned, a 1 bit is appended after the last
    /// data bit and the rest of the byte stays zero.
    pub fn data_with_completion_tag(&self) -> Vec<u8> {
        let mut result = self.data.clone();
        let remainder = self.bit_len % 8;
        if remainder != 0
            && let Some(last) = result.last_mut()
        {
            *last |= 1 << (7 - remainder);
        }
        result
    }

    /// Get the raw data bytes.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the number of bits in this cell.
    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Get all references to child cells.
    pub fn references(&self) -> &[Arc<Cell>] {
        &self.references
    }

    /// Get a reference by index.
    pub fn reference(&self, index: usize) -> Option<&Arc<Cell>> {
        self.references.get(index)
    }

    /// Get the number of references.
    pub fn reference_count(&self) -> usize {
        self.references.len()
    }

    /// Get a specific bit from the cell data.
    ///
    /// Returns None if the index is out of bounds.
    pub fn get_bit(&self, index: usize) -> Option<bool> {
        if index >= self.bit_len {
            return None;
        }
        Some((self.data[index / 8] >> (7 - index % 8)) & 1 == 1)
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.hash.hash(state);
    }
}

impl std::fmt::Display for Cell {
    /// `x{HEX}` with a trailing `_` for non-aligned data, children indented below.
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn write_cell(cell: &Cell, indent: usize, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            let full_nibbles = cell.bit_len / 4;
            let mut hex = hex::encode(cell.data_with_completion_tag());
            if cell.bit_len % 4 != 0 {
                hex.truncate(full_nibbles + 1);
                hex.push('_');
            } else {
                hex.truncate(full_nibbles);
            }
            writeln!(f, "{:indent$}x{{{}}}", "", hex.to_uppercase(), indent = indent)?;
            for reference in &cell.references {
                write_cell(reference, indent + 1, f)?;
            }
            Ok(())
        }
        write_cell(self, 0, f)
    }
}
