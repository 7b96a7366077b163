//! Bag of Cells (BoC) serialization format.
//!
//! BoC is how a finalized cell tree leaves this crate: wallets take message
//! bodies and state inits as base64 BoC, and providers return get-method
//! stacks the same way. Cells are deduplicated by hash and written parent
//! first, so every reference points at a higher index.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing::trace;

use crate::{
    crc32c, Cell, CellError, CellResult, BOC_GENERIC_MAGIC, BOC_INDEXED_CRC32_MAGIC,
    BOC_INDEXED_MAGIC, MAX_CELL_BITS, MAX_CELL_REFS,
};

/// Bag of Cells - a serialized collection of cells.
#[derive(Debug, Clone)]
pub struct BagOfCells {
    roots: Vec<Arc<Cell>>,
}

impl BagOfCells {
    /// Create a new BoC with the given root cells.
    pub fn new(roots: Vec<Arc<Cell>>) -> Self {
        BagOfCells { roots }
    }

    /// Create a BoC with a single root cell.
    pub fn from_root(root: impl Into<Arc<Cell>>) -> Self {
        BagOfCells {
            roots: vec![root.into()],
        }
    }

    /// Get all root cells.
    pub fn roots(&self) -> &[Arc<Cell>] {
        &self.roots
    }

    /// Get a single root cell (errors if not exactly one root).
    pub fn single_root(&self) -> CellResult<&Arc<Cell>> {
        match self.roots.as_slice() {
            [root] => Ok(root),
            roots => Err(CellError::NotSingleRoot(roots.len())),
        }
    }

    /// Consume the BoC and return its only root.
    pub fn into_single_root(self) -> CellResult<Arc<Cell>> {
        let count = self.roots.len();
        let mut roots = self.roots.into_iter();
        match (roots.next(), roots.next()) {
            (Some(root), None) => Ok(root),
            _ => Err(CellError::NotSingleRoot(count)),
        }
    }

    /// Get the number of root cells.
    pub fn root_count(&self) -> usize {
        self.roots.len()
    }

    /// Serialize the BoC to bytes.
    ///
    /// Uses the generic BoC format with CRC32 checksum.
    pub fn serialize(&self) -> CellResult<Vec<u8>> {
        self.serialize_with_options(true, false)
    }

    /// Serialize with options.
    ///
    /// # Arguments
    /// * `with_crc` - Include CRC32 checksum
    /// * `with_index` - Include cell index (for faster deserialization)
    pub fn serialize_with_options(&self, with_crc: bool, with_index: bool) -> CellResult<Vec<u8>> {
        if self.roots.is_empty() {
            return Err(CellError::InvalidBoc("No root cells".to_string()));
        }

        let cells = self.collect_cells_parent_first();
        let cell_count = cells.len();

        let hash_to_index: HashMap<[u8; 32], usize> = cells
            .iter()
            .enumerate()
            .map(|(i, c)| (c.hash(), i))
            .collect();

        let root_indices = self
            .roots
            .iter()
            .map(|r| {
                hash_to_index
                    .get(&r.hash())
                    .copied()
                    .ok_or_else(|| CellError::InvalidBoc("Root not collected".to_string()))
            })
            .collect::<CellResult<Vec<_>>>()?;

        let size_bytes = Self::bytes_needed(cell_count);
        let mut cell_data: Vec<Vec<u8>> = Vec::with_capacity(cell_count);
        let mut total_cells_size = 0usize;
        for cell in &cells {
            let serialized = Self::serialize_cell(cell, &hash_to_index, size_bytes)?;
            total_cells_size += serialized.len();
            cell_data.push(serialized);
        }
        let off_bytes = Self::bytes_needed(total_cells_size);

        let mut result = Vec::with_capacity(total_cells_size + 32);
        result.extend_from_slice(&BOC_GENERIC_MAGIC.to_be_bytes());

        // has_idx (bit 7) | has_crc (bit 6) | has_cache_bits (bit 5) | flags (bits 4-3) | size_bytes (bits 2-0)
        let flags: u8 = (if with_index { 1 << 7 } else { 0 })
            | (if with_crc { 1 << 6 } else { 0 })
            | (size_bytes as u8);
        result.push(flags);
        result.push(off_bytes as u8);

        Self::write_uint(&mut result, cell_count as u64, size_bytes);
        Self::write_uint(&mut result, self.roots.len() as u64, size_bytes);
        // absent cells
        Self::write_uint(&mut result, 0, size_bytes);
        Self::write_uint(&mut result, total_cells_size as u64, off_bytes);

        for idx in &root_indices {
            Self::write_uint(&mut result, *idx as u64, size_bytes);
        }

        if with_index {
            let mut offset = 0usize;
            for data in &cell_data {
                offset += data.len();
                Self::write_uint(&mut result, offset as u64, off_bytes);
            }
        }

        for data in cell_data {
            result.extend_from_slice(&data);
        }

        if with_crc {
            let crc = crc32c(&result);
            result.extend_from_slice(&crc.to_le_bytes());
        }

        trace!("Serialized BoC: {} cells, {} bytes", cell_count, result.len());
        Ok(result)
    }

    /// Serialize to base64 string.
    pub fn serialize_to_base64(&self) -> CellResult<String> {
        Ok(STANDARD.encode(self.serialize()?))
    }

    /// Deserialize from bytes.
    ///
    /// Supports all three BoC formats:
    /// - `0xb5ee9c72` - Generic BoC (serialized_boc)
    /// - `0x68ff65f3` - Indexed BoC (serialized_boc_idx)
    /// - `0xacc3a728` - Indexed BoC with CRC32C (serialized_boc_idx_crc32c)
    pub fn deserialize(data: &[u8]) -> CellResult<Self> {
        if data.len() < 6 {
            return Err(CellError::UnexpectedEof);
        }

        let mut offset = 0;
        let magic = u32::from_be_bytes([data[0], data[1], data[2], data[3]]);
        offset += 4;

        let (has_idx, has_crc, size_bytes) = match magic {
            BOC_GENERIC_MAGIC => {
                let flags = data[offset];
                offset += 1;
                let has_idx = (flags & 0x80) != 0;
                let has_crc = (flags & 0x40) != 0;
                let size_bytes = (flags & 0x07) as usize;
                (has_idx, has_crc, size_bytes)
            }
            BOC_INDEXED_MAGIC => {
                let size_bytes = data[offset] as usize;
                offset += 1;
                (true, false, size_bytes)
            }
            BOC_INDEXED_CRC32_MAGIC => {
                let size_bytes = data[offset] as usize;
                offset += 1;
                (true, true, size_bytes)
            }
            _ => {
                return Err(CellError::InvalidBoc(format!(
                    "Invalid magic: {:08x}, expected one of {:08x}, {:08x}, {:08x}",
                    magic, BOC_GENERIC_MAGIC, BOC_INDEXED_MAGIC, BOC_INDEXED_CRC32_MAGIC
                )));
            }
        };

        if size_bytes == 0 || size_bytes > 4 {
            return Err(CellError::InvalidBoc(format!("Invalid size_bytes: {}", size_bytes)));
        }

        let off_bytes = data[offset] as usize;
        offset += 1;
        if off_bytes == 0 || off_bytes > 8 {
            return Err(CellError::InvalidBoc(format!("Invalid off_bytes: {}", off_bytes)));
        }

        let cells_count = Self::read_uint(data, &mut offset, size_bytes)? as usize;
        let roots_count = Self::read_uint(data, &mut offset, size_bytes)? as usize;
        let _absent_count = Self::read_uint(data, &mut offset, size_bytes)?;
        let total_cells_size = Self::read_uint(data, &mut offset, off_bytes)? as usize;

        if roots_count > cells_count {
            return Err(CellError::InvalidBoc(format!(
                "{} roots but only {} cells",
                roots_count, cells_count
            )));
        }
        // Every root index takes size_bytes and every cell at least two descriptor bytes.
        let remaining = data.len() - offset;
        let min_len = roots_count
            .checked_mul(size_bytes)
            .zip(cells_count.checked_mul(2))
            .and_then(|(roots, cells)| roots.checked_add(cells));
        if min_len.is_none_or(|min_len| min_len > remaining) {
            return Err(CellError::UnexpectedEof);
        }

        let mut root_indices = Vec::with_capacity(roots_count);
        for _ in 0..roots_count {
            root_indices.push(Self::read_uint(data, &mut offset, size_bytes)? as usize);
        }

        if has_idx {
            offset = cells_count
                .checked_mul(off_bytes)
                .and_then(|n| n.checked_add(offset))
                .ok_or(CellError::UnexpectedEof)?;
        }

        let data_end = if has_crc {
            let data_end = data.len().checked_sub(4).ok_or(CellError::UnexpectedEof)?;
            let expected_crc = u32::from_le_bytes([
                data[data_end],
                data[data_end + 1],
                data[data_end + 2],
                data[data_end + 3],
            ]);
            let actual_crc = crc32c(&data[..data_end]);
            if expected_crc != actual_crc {
                return Err(CellError::CrcMismatch {
                    expected: expected_crc,
                    actual: actual_crc,
                });
            }
            data_end
        } else {
            data.len()
        };

        let cells_end = offset
            .checked_add(total_cells_size)
            .filter(|&end| end <= data_end)
            .ok_or(CellError::UnexpectedEof)?;
        let cells = Self::parse_cells(&data[offset..cells_end], cells_count, size_bytes)?;

        let roots = root_indices
            .iter()
            .map(|&idx| cells.get(idx).cloned().ok_or(CellError::CellNotFound(idx)))
            .collect::<CellResult<Vec<_>>>()?;

        Ok(BagOfCells { roots })
    }

    /// Deserialize from base64 string.
    pub fn deserialize_from_base64(base64_str: &str) -> CellResult<Self> {
        let bytes = STANDARD
            .decode(base64_str.trim())
            .map_err(|e| CellError::InvalidBase64(e.to_string()))?;
        Self::deserialize(&bytes)
    }

    /// Deserialize from hex string.
    pub fn deserialize_from_hex(hex_str: &str) -> CellResult<Self> {
        let bytes = hex::decode(hex_str.trim())
            .map_err(|e| CellError::InvalidBoc(format!("invalid hex string: {}", e)))?;
        Self::deserialize(&bytes)
    }

    /// Collect all cells so that every parent precedes its children.
    ///
    /// Reverse DFS post-order is a topological order of the DAG, which holds
    /// even when a subtree is shared by several parents.
    fn collect_cells_parent_first(&self) -> Vec<Arc<Cell>> {
        let mut post_order: Vec<Arc<Cell>> = Vec::new();
        let mut visited: HashSet<[u8; 32]> = HashSet::new();

        for root in self.roots.iter().rev() {
            Self::collect_post_order(root, &mut post_order, &mut visited);
        }

        post_order.reverse();
        post_order
    }

    fn collect_post_order(
        cell: &Arc<Cell>,
        cells: &mut Vec<Arc<Cell>>,
        visited: &mut HashSet<[u8; 32]>,
    ) {
        if !visited.insert(cell.hash()) {
            return;
        }
        for reference in cell.references().iter().rev() {
            Self::collect_post_order(reference, cells, visited);
        }
        cells.push(cell.clone());
    }

    fn serialize_cell(
        cell: &Cell,
        hash_to_index: &HashMap<[u8; 32], usize>,
        ref_size: usize,
    ) -> CellResult<Vec<u8>> {
        let mut result = Vec::with_capacity(2 + cell.data().len() + cell.reference_count() * ref_size);

        let (d1, d2) = cell.descriptors();
        result.push(d1);
        result.push(d2);
        result.extend_from_slice(&cell.data_with_completion_tag());

        for reference in cell.references() {
            let idx = hash_to_index
                .get(&reference.hash())
                .ok_or_else(|| CellError::InvalidBoc("Reference not found".to_string()))?;
            Self::write_uint(&mut result, *idx as u64, ref_size);
        }

        Ok(result)
    }

    /// Parse cells from serialized data.
    fn parse_cells(data: &[u8], cell_count: usize, size_bytes: usize) -> CellResult<Vec<Arc<Cell>>> {
        let mut offset = 0;
        let mut cell_infos: Vec<(Vec<u8>, usize, Vec<usize>)> = Vec::new();

        for _ in 0..cell_count {
            if offset + 2 > data.len() {
                return Err(CellError::UnexpectedEof);
            }

            let d1 = data[offset];
            let d2 = data[offset + 1];
            offset += 2;

            let refs_count = (d1 & 0x07) as usize;
            if d1 & 0x08 != 0 || d1 >> 5 != 0 {
                return Err(CellError::ExoticCell);
            }
            if refs_count > MAX_CELL_REFS {
                return Err(CellError::InvalidBoc(format!("Cell has {} refs", refs_count)));
            }

            // d2 = ceil(bit_len / 8) + floor(bit_len / 8)
            let data_len = (d2 as usize).div_ceil(2);
            if offset + data_len > data.len() {
                return Err(CellError::UnexpectedEof);
            }
            let cell_data = &data[offset..offset + data_len];
            offset += data_len;

            let bit_len = if d2 % 2 == 0 {
                data_len * 8
            } else {
                Self::find_bit_len(cell_data)
            };
            if bit_len > MAX_CELL_BITS {
                return Err(CellError::InvalidBoc(format!("Cell has {} bits", bit_len)));
            }

            let mut ref_indices = Vec::with_capacity(refs_count);
            for _ in 0..refs_count {
                let ref_idx = Self::read_uint(data, &mut offset, size_bytes)? as usize;
                if ref_idx >= cell_count {
                    return Err(CellError::CellNotFound(ref_idx));
                }
                ref_indices.push(ref_idx);
            }

            cell_infos.push((Self::remove_completion_tag(cell_data, bit_len), bit_len, ref_indices));
        }

        // Standard BoCs point parent -> higher index; some writers use the
        // opposite order, so pick the direction from the first cell with refs.
        let refs_point_higher = cell_infos
            .iter()
            .enumerate()
            .find_map(|(i, (_, _, refs))| refs.first().map(|&r| r > i))
            .unwrap_or(true);

        let iteration_order: Vec<usize> = if refs_point_higher {
            (0..cell_count).rev().collect()
        } else {
            (0..cell_count).collect()
        };

        let mut cells: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
        for i in iteration_order {
            let (data, bit_len, ref_indices) = &cell_infos[i];

            let references = ref_indices
                .iter()
                .map(|&idx| {
                    cells[idx]
                        .clone()
                        .ok_or_else(|| CellError::InvalidBoc(format!("Cell {} references unbuilt cell {}", i, idx)))
                })
                .collect::<CellResult<Vec<_>>>()?;

            cells[i] = Some(Arc::new(Cell::new(data.clone(), *bit_len, references)));
        }

        cells
            .into_iter()
            .enumerate()
            .map(|(i, c)| c.ok_or(CellError::CellNotFound(i)))
            .collect()
    }

    /// Find the bit length of tagged data: the last set bit is the tag.
    fn find_bit_len(data: &[u8]) -> usize {
        for i in (0..data.len()).rev() {
            let byte = data[i];
            if byte != 0 {
                return (i + 1) * 8 - byte.trailing_zeros() as usize - 1;
            }
        }
        0
    }

    /// Keep `bit_len` bits of `data` and clear the rest of the last byte.
    fn remove_completion_tag(data: &[u8], bit_len: usize) -> Vec<u8> {
        let mut result = data[..bit_len.div_ceil(8)].to_vec();
        let remainder = bit_len % 8;
        if remainder != 0
            && let Some(last) = result.last_mut()
        {
            *last &= !((1u8 << (8 - remainder)) - 1);
        }
        result
    }

    /// Calculate bytes needed to represent a number.
    fn bytes_needed(n: usize) -> usize {
        if n == 0 {
            1
        } else {
            ((64 - (n as u64).leading_zeros()) as usize).div_ceil(8)
        }
    }

    fn write_uint(buf: &mut Vec<u8>, value: u64, bytes: usize) {
        for i in (0..bytes).rev() {
            buf.push((value >> (i * 8)) as u8);
        }
    }

    fn read_uint(data: &[u8], offset: &mut usize, bytes: usize) -> CellResult<u64> {
        if *offset + bytes > data.len() {
            return Err(CellError::UnexpectedEof);
        }

        let mut result: u64 = 0;
        for i in 0..bytes {
            result = (result << 8) | (data[*offset + i] as u64);
        }
        *offset += bytes;
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CellBuilder;

    #[test]
    fn test_empty_cell_boc_bytes() {
        let boc = BagOfCells::from_root(Cell::empty());
        let serialized = boc.serialize_with_options(false, false).unwrap();
        assert_eq!(hex::encode(&serialized), "b5ee9c72010101010002000000");

        let deserialized = BagOfCells::deserialize(&serialized).unwrap();
        let root = deserialized.single_root().unwrap();
        assert_eq!(root.bit_len(), 0);
        assert_eq!(root.reference_count(), 0);
    }

    #[test]
    fn test_parent_first_layout() {
        let mut child = CellBuilder::new();
        child.store_u8(0xAA).unwrap();
        let child = Arc::new(child.build().unwrap());

        let mut parent = CellBuilder::new();
        parent.store_u8(0x55).unwrap();
        parent.store_ref(child).unwrap();
        let parent = parent.build().unwrap();

        let bytes = BagOfCells::from_root(parent.clone())
            .serialize_with_options(false, false)
            .unwrap();
        // header | root index 0 | parent (d1=1, d2=2, 55, ref 1) | child (00 02 aa)
        assert_eq!(hex::encode(&bytes), "b5ee9c7201010201000700010255010002aa");

        let root = BagOfCells::deserialize(&bytes).unwrap().into_single_root().unwrap();
        assert_eq!(*root, parent);
    }

    #[test]
    fn test_shared_subtree_is_deduplicated() {
        let leaf = Arc::new(Cell::empty());

        let mut mid = CellBuilder::new();
        mid.store_bit(true).unwrap();
        mid.store_ref(leaf.clone()).unwrap();
        let mid = Arc::new(mid.build().unwrap());

        let mut root = CellBuilder::new();
        root.store_ref(leaf).unwrap();
        root.store_ref(mid).unwrap();
        let root = root.build().unwrap();
        let original_hash = root.hash();

        let boc = BagOfCells::from_root(root);
        let serialized = boc.serialize().unwrap();
        // 3 distinct cells
        assert_eq!(serialized[6], 3);

        let restored = BagOfCells::deserialize(&serialized).unwrap();
        assert_eq!(restored.single_root().unwrap().hash(), original_hash);
    }

    #[test]
    fn test_base64_and_index_roundtrip() {
        let mut builder = CellBuilder::new();
        builder.store_uint(0b101, 3).unwrap();
        builder.store_ref(Cell::empty()).unwrap();
        let cell = builder.build().unwrap();
        let original_hash = cell.hash();

        let b64 = BagOfCells::from_root(cell.clone()).serialize_to_base64().unwrap();
        let restored = BagOfCells::deserialize_from_base64(&b64).unwrap();
        assert_eq!(restored.single_root().unwrap().hash(), original_hash);

        let indexed = BagOfCells::from_root(cell).serialize_with_options(true, true).unwrap();
        let restored = BagOfCells::deserialize(&indexed).unwrap();
        assert_eq!(restored.single_root().unwrap().hash(), original_hash);
    }

    #[test]
    fn test_crc_mismatch() {
        let mut bytes = BagOfCells::from_root(Cell::empty()).serialize().unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        assert!(matches!(
            BagOfCells::deserialize(&bytes),
            Err(CellError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_input() {
        let bytes = BagOfCells::from_root(Cell::empty())
            .serialize_with_options(false, false)
            .unwrap();
        assert!(BagOfCells::deserialize(&bytes[..bytes.len() - 1]).is_err());
        assert!(BagOfCells::deserialize(&[0xb5, 0xee]).is_err());
    }

    #[test]
    fn test_oversized_counts_are_rejected() {
        // size_bytes=4, cells=roots=0xFFFFFFFF, no room for either
        let bytes = hex::decode("b5ee9c720401ffffffffffffffff000000000000000000").unwrap();
        assert!(matches!(
            BagOfCells::deserialize(&bytes),
            Err(CellError::UnexpectedEof)
        ));

        // more roots than cells
        let bytes = hex::decode("b5ee9c72010102030000000000000000").unwrap();
        assert!(matches!(
            BagOfCells::deserialize(&bytes),
            Err(CellError::InvalidBoc(_))
        ));
    }

    #[test]
    fn test_multiple_roots() {
        let boc = BagOfCells::new(vec![Arc::new(Cell::empty()), Arc::new(Cell::empty())]);
        assert!(matches!(boc.single_root(), Err(CellError::NotSingleRoot(2))));
    }

    #[test]
    fn test_bytes_needed() {
        assert_eq!(BagOfCells::bytes_needed(0), 1);
        assert_eq!(BagOfCells::bytes_needed(1), 1);
        assert_eq!(BagOfCells::bytes_needed(255), 1);
        assert_eq!(BagOfCells::bytes_needed(256), 2);
        assert_eq!(BagOfCells::bytes_needed(65535), 2);
        assert_eq!(BagOfCells::bytes_needed(65536), 3);
    }
}
