//! Off-chain content in snake format.
//!
//! Content is stored as a `0x01` prefix byte followed by the content bytes,
//! split into a chain of cells holding at most 127 bytes each. Every cell
//! but the last references the next one as its first ref.
//!
//! ```text
//! [0x01 | bytes 0..126] -> [bytes 126..253] -> ... -> [tail]
//! ```

use cookie_cell::{Cell, CellBuilder, CellSlice};
use tracing::trace;

use crate::error::{NftError, NftResult};

/// Prefix byte of off-chain content.
pub const OFF_CHAIN_CONTENT_PREFIX: u8 = 0x01;

/// Bytes stored in one snake cell.
pub const SNAKE_CHUNK_BYTES: usize = 127;

/// Encode content as prefixed snake cells.
///
/// # Example
///
/// ```
/// use cookie_nft::{decode_off_chain_uri, encode_off_chain_content};
///
/// let cell = encode_off_chain_content(b"A.json").unwrap();
/// assert_eq!(cell.bit_len(), 7 * 8);
/// assert_eq!(decode_off_chain_uri(&cell).unwrap(), "A.json");
/// ```
pub fn encode_off_chain_content(content: &[u8]) -> NftResult<Cell> {
    let mut data = Vec::with_capacity(content.len() + 1);
    data.push(OFF_CHAIN_CONTENT_PREFIX);
    data.extend_from_slice(content);
    make_snake_cell(&data)
}

/// Decode prefixed snake cells, returning the bytes after the prefix.
pub fn decode_off_chain_content(cell: &Cell) -> NftResult<Vec<u8>> {
    let data = flatten_snake_cell(cell)?;
    let Some((&prefix, content)) = data.split_first() else {
        return Err(NftError::EmptyContent);
    };
    if prefix != OFF_CHAIN_CONTENT_PREFIX {
        return Err(NftError::UnknownContentPrefix(prefix));
    }
    Ok(content.to_vec())
}

/// Decode prefixed snake cells as UTF-8 text.
pub fn decode_off_chain_uri(cell: &Cell) -> NftResult<String> {
    let content = decode_off_chain_content(cell)?;
    String::from_utf8(content).map_err(|e| NftError::InvalidUtf8(e.to_string()))
}

/// Split `data` into a chain of cells, building the tail first.
///
/// Empty input yields a single empty cell.
pub fn make_snake_cell(data: &[u8]) -> NftResult<Cell> {
    let mut next: Option<Cell> = None;
    let mut cells = 0usize;

    for chunk in data.chunks(SNAKE_CHUNK_BYTES).rev() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(chunk)?;
        if let Some(tail) = next.take() {
            builder.store_ref(tail)?;
        }
        next = Some(builder.build()?);
        cells += 1;
    }

    trace!("Encoded {} bytes into {} snake cells", data.len(), cells);
    Ok(next.unwrap_or_else(Cell::empty))
}

/// Concatenate the bytes of a snake chain, following each cell's first ref.
pub fn flatten_snake_cell(cell: &Cell) -> NftResult<Vec<u8>> {
    let mut result = Vec::new();
    let mut current = Some(cell);

    while let Some(cell) = current {
        if !cell.bit_len().is_multiple_of(8) {
            return Err(NftError::MisalignedContent {
                bits: cell.bit_len(),
            });
        }
        let mut slice = CellSlice::new(cell);
        result.extend(slice.load_remaining_bytes()?);
        current = cell.reference(0).map(|next| &**next);
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn chain_len(cell: &Cell) -> usize {
        let mut count = 1;
        let mut current = cell;
        while let Some(next) = current.reference(0) {
            current = &**next;
            count += 1;
        }
        count
    }

    #[test]
    fn test_single_chunk() {
        let cell = encode_off_chain_content(b"A.json").unwrap();
        assert_eq!(cell.bit_len(), 56);
        assert_eq!(cell.reference_count(), 0);
        assert_eq!(cell.data(), b"\x01A.json");
        assert_eq!(decode_off_chain_uri(&cell).unwrap(), "A.json");
    }

    #[test]
    fn test_empty_content() {
        let cell = encode_off_chain_content(b"").unwrap();
        assert_eq!(cell.data(), &[0x01]);
        assert_eq!(cell.reference_count(), 0);
        assert!(decode_off_chain_content(&cell).unwrap().is_empty());
    }

    #[test]
    fn test_chunk_boundaries() {
        // 126 content bytes + prefix fill one cell exactly
        let cell = encode_off_chain_content(&[b'x'; 126]).unwrap();
        assert_eq!(chain_len(&cell), 1);
        assert_eq!(cell.bit_len(), 127 * 8);

        let cell = encode_off_chain_content(&[b'x'; 127]).unwrap();
        assert_eq!(chain_len(&cell), 2);
        assert_eq!(cell.bit_len(), 127 * 8);
        assert_eq!(cell.reference(0).unwrap().bit_len(), 8);
    }

    #[test]
    fn test_multi_chunk_order() {
        let content: Vec<u8> = (0..300u32).map(|i| (i % 251) as u8).collect();
        let cell = encode_off_chain_content(&content).unwrap();
        assert_eq!(chain_len(&cell), 3);
        assert_eq!(decode_off_chain_content(&cell).unwrap(), content);
    }

    #[test]
    fn test_unknown_prefix() {
        let mut builder = CellBuilder::new();
        builder.store_bytes(b"\x00ipfs://x").unwrap();
        let cell = builder.build().unwrap();

        match decode_off_chain_content(&cell) {
            Err(NftError::UnknownContentPrefix(0x00)) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_cell_has_no_prefix() {
        assert!(matches!(
            decode_off_chain_content(&Cell::empty()),
            Err(NftError::EmptyContent)
        ));
    }

    #[test]
    fn test_misaligned_cell() {
        let mut builder = CellBuilder::new();
        builder.store_u8(0x01).unwrap();
        builder.store_bit(true).unwrap();
        let cell = builder.build().unwrap();

        assert!(matches!(
            flatten_snake_cell(&cell),
            Err(NftError::MisalignedContent { bits: 9 })
        ));
    }

    #[test]
    fn test_invalid_utf8() {
        let cell = encode_off_chain_content(&[0xff, 0xfe]).unwrap();
        assert!(matches!(decode_off_chain_uri(&cell), Err(NftError::InvalidUtf8(_))));
    }

    proptest! {
        #[test]
        fn prop_content_roundtrip(content in proptest::collection::vec(any::<u8>(), 0..1024)) {
            let cell = encode_off_chain_content(&content).unwrap();
            prop_assert_eq!(chain_len(&cell), (content.len() + 1).div_ceil(SNAKE_CHUNK_BYTES));
            prop_assert_eq!(decode_off_chain_content(&cell).unwrap(), content);
        }
    }
}
