//! # cookie-nft
//!
//! Codecs for the Fortune Cookie NFT collection on TON.
//!
//! ## Overview
//!
//! The dApp talks to two contracts:
//!
//! - **Collection**: mints items, tracks the next item index and holds the
//!   collection content and royalty parameters.
//!
//! - **Item**: one contract per minted cookie. Each item carries a range
//!   `[lower_bound, upper_bound]`; unsealing it reveals a lucky value from
//!   that range.
//!
//! This crate builds every message body the dApp sends, derives contract
//! addresses from their state init, and decodes get method results. It does
//! no network I/O: finalized cells are handed to a wallet or liteserver
//! client as a bag of cells.
//!
//! ### Collection Operation Codes
//!
//! - `mint` (1), `batch_mint` (2), `change_owner` (3), `edit_content` (4)
//! - `get_royalty_params` (0x693d3950) / `report_royalty_params` (0xa8cb00ad)
//!
//! ### Item Operation Codes
//!
//! - `transfer` (0x5fcc3d14)
//! - `get_static_data` (0x2fcb26a2) / `report_static_data` (0x8b771735)
//! - `unseal` (0xc35b85d1)
//!
//! ### Content
//!
//! Collection and item content is off-chain content: a `0x01` prefix and a
//! URI split into 127-byte snake cells (see [`content`]).
//!
//! ## Example
//!
//! ```rust
//! use cookie_cell::{BagOfCells, MsgAddress};
//! use cookie_nft::{CollectionMessage, CookieCollection, FeeConfig, MintItemInput};
//!
//! let owner = MsgAddress::Internal { workchain: 0, address: [0x11; 32] };
//! let item = MintItemInput::new(5, owner, 0, 100, "b.json");
//! let fees = FeeConfig::default();
//!
//! let body = CookieCollection::create_mint_body(0, &item, &fees).unwrap();
//! let boc = BagOfCells::from_root(body.clone()).serialize_to_base64().unwrap();
//! assert!(!boc.is_empty());
//!
//! match CollectionMessage::parse(&body).unwrap() {
//!     CollectionMessage::Mint { item, .. } => assert_eq!(item.content, "b.json"),
//!     _ => unreachable!(),
//! }
//! assert_eq!(fees.mint_value(item.pass_amount), 65_000_000);
//! ```

pub mod collection;
pub mod config;
pub mod content;
pub mod error;
pub mod item;
pub mod methods;
pub mod stack;
pub mod state_init;
pub mod types;

// Re-export main types
pub use collection::{BatchMintEntry, CollectionMessage, CookieCollection};
pub use config::{FeeConfig, MAX_BATCH_SIZE};
pub use content::{
    decode_off_chain_content, decode_off_chain_uri, encode_off_chain_content, flatten_snake_cell,
    make_snake_cell,
};
pub use error::{NftError, NftResult};
pub use item::{CookieItem, ReportStaticData};
pub use methods::GetMethod;
pub use stack::{StackReader, StackValue};
pub use state_init::StateInit;
pub use types::{CollectionConfig, CollectionData, MintItemInput, NftItemData, RoyaltyParams};

use cookie_cell::CellBuilder;

/// Start a message body with `op:uint32 query_id:uint64`.
pub(crate) fn message_header(op: u32, query_id: u64) -> NftResult<CellBuilder> {
    let mut builder = CellBuilder::new();
    builder.store_u32(op)?;
    builder.store_u64(query_id)?;
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_header() {
        let cell = message_header(0x5fcc3d14, 1).unwrap().build().unwrap();
        assert_eq!(cell.bit_len(), 96);
        assert_eq!(cell.data(), &[0x5f, 0xcc, 0x3d, 0x14, 0, 0, 0, 0, 0, 0, 0, 1]);
    }

    #[test]
    fn test_opcodes_are_distinct() {
        let ops = [
            collection::OP_MINT,
            collection::OP_BATCH_MINT,
            collection::OP_CHANGE_OWNER,
            collection::OP_EDIT_CONTENT,
            collection::OP_GET_ROYALTY_PARAMS,
            collection::OP_REPORT_ROYALTY_PARAMS,
            item::OP_TRANSFER,
            item::OP_GET_STATIC_DATA,
            item::OP_REPORT_STATIC_DATA,
            item::OP_UNSEAL,
        ];
        for (i, a) in ops.iter().enumerate() {
            for b in &ops[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
