//! Fortune Cookie collection contract interface.
//!
//! The collection contract mints items, tracks the next item index and
//! holds the collection content and royalty parameters. Every body built
//! here starts with `op:uint32 query_id:uint64`.

use std::sync::Arc;

use cookie_cell::{Cell, CellBuilder, CellResult, CellSlice, DictValue, Dictionary, MsgAddress};
use tracing::debug;

use crate::config::{FeeConfig, MAX_BATCH_SIZE};
use crate::error::{NftError, NftResult};
use crate::state_init::StateInit;
use crate::types::{content_pair, load_content_pair, CollectionConfig, MintItemInput, RoyaltyParams};
use crate::message_header;

/// Collection operation codes.
pub mod opcodes {
    /// Mint one item.
    pub const OP_MINT: u32 = 1;

    /// Mint up to 250 items in one message.
    pub const OP_BATCH_MINT: u32 = 2;

    /// Hand the collection over to a new owner.
    pub const OP_CHANGE_OWNER: u32 = 3;

    /// Replace collection content and royalty parameters.
    pub const OP_EDIT_CONTENT: u32 = 4;

    /// Request royalty parameters (TEP-66).
    pub const OP_GET_ROYALTY_PARAMS: u32 = 0x693d3950;

    /// Response with royalty parameters.
    pub const OP_REPORT_ROYALTY_PARAMS: u32 = 0xa8cb00ad;
}

pub use opcodes::*;

/// Key width of the batch mint dictionary.
pub const BATCH_KEY_BITS: usize = 64;

/// Value of one batch mint dictionary entry.
///
/// ```text
/// _ amount:Coins item:^Cell = BatchMintEntry;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchMintEntry {
    /// Amount forwarded to the new item.
    pub amount: u128,
    /// Item message, as built by [`MintItemInput::item_message`].
    pub item: Arc<Cell>,
}

impl BatchMintEntry {
    pub fn new(item: impl Into<Arc<Cell>>, amount: u128) -> Self {
        Self {
            amount,
            item: item.into(),
        }
    }
}

impl DictValue for BatchMintEntry {
    fn store_value(&self, builder: &mut CellBuilder) -> CellResult<()> {
        builder.store_coins(self.amount)?;
        builder.store_ref(self.item.clone())?;
        Ok(())
    }

    fn load_value(slice: &mut CellSlice<'_>) -> CellResult<Self> {
        let amount = slice.load_coins()?;
        let item = slice.load_ref()?.clone();
        Ok(Self::new(item, amount))
    }
}

/// A parsed collection message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionMessage {
    /// `pass_amount` of the item is always set.
    Mint { query_id: u64, item: MintItemInput },
    /// Items in ascending index order.
    BatchMint {
        query_id: u64,
        items: Vec<MintItemInput>,
    },
    ChangeOwner {
        query_id: u64,
        new_owner: MsgAddress,
    },
    EditContent {
        query_id: u64,
        collection_content: String,
        common_content: String,
        royalty: RoyaltyParams,
    },
    GetRoyaltyParams { query_id: u64 },
    ReportRoyaltyParams {
        query_id: u64,
        royalty: RoyaltyParams,
    },
}

impl CollectionMessage {
    /// Parse a collection message body.
    pub fn parse(body: &Cell) -> NftResult<Self> {
        let mut slice = CellSlice::new(body);
        let op = slice.load_u32()?;
        let query_id = slice.load_u64()?;

        match op {
            OP_MINT => {
                let index = slice.load_u64()?;
                let amount = slice.load_coins()?;
                let item = MintItemInput::from_item_message(index, amount, slice.load_ref()?)?;
                Ok(CollectionMessage::Mint { query_id, item })
            }
            OP_BATCH_MINT => {
                let dict = Dictionary::<BatchMintEntry>::load(&mut slice, BATCH_KEY_BITS)?;
                let items = dict
                    .iter()
                    .map(|(index, entry)| {
                        MintItemInput::from_item_message(index, entry.amount, &entry.item)
                    })
                    .collect::<NftResult<Vec<_>>>()?;
                Ok(CollectionMessage::BatchMint { query_id, items })
            }
            OP_CHANGE_OWNER => Ok(CollectionMessage::ChangeOwner {
                query_id,
                new_owner: slice.load_address()?,
            }),
            OP_EDIT_CONTENT => {
                let (collection_content, common_content) = load_content_pair(slice.load_ref()?)?;
                let royalty = RoyaltyParams::load(&mut CellSlice::new(slice.load_ref()?))?;
                Ok(CollectionMessage::EditContent {
                    query_id,
                    collection_content,
                    common_content,
                    royalty,
                })
            }
            OP_GET_ROYALTY_PARAMS => Ok(CollectionMessage::GetRoyaltyParams { query_id }),
            OP_REPORT_ROYALTY_PARAMS => Ok(CollectionMessage::ReportRoyaltyParams {
                query_id,
                royalty: RoyaltyParams::load(&mut slice)?,
            }),
            other => Err(NftError::UnknownOpcode(other)),
        }
    }

    pub fn opcode(&self) -> u32 {
        match self {
            CollectionMessage::Mint { .. } => OP_MINT,
            CollectionMessage::BatchMint { .. } => OP_BATCH_MINT,
            CollectionMessage::ChangeOwner { .. } => OP_CHANGE_OWNER,
            CollectionMessage::EditContent { .. } => OP_EDIT_CONTENT,
            CollectionMessage::GetRoyaltyParams { .. } => OP_GET_ROYALTY_PARAMS,
            CollectionMessage::ReportRoyaltyParams { .. } => OP_REPORT_ROYALTY_PARAMS,
        }
    }

    pub fn query_id(&self) -> u64 {
        match self {
            CollectionMessage::Mint { query_id, .. }
            | CollectionMessage::BatchMint { query_id, .. }
            | CollectionMessage::ChangeOwner { query_id, .. }
            | CollectionMessage::EditContent { query_id, .. }
            | CollectionMessage::GetRoyaltyParams { query_id }
            | CollectionMessage::ReportRoyaltyParams { query_id, .. } => *query_id,
        }
    }
}

/// Fortune Cookie collection contract.
#[derive(Debug, Clone)]
pub struct CookieCollection {
    address: MsgAddress,
    state_init: Option<StateInit>,
}

impl CookieCollection {
    /// Creates a handle for an already deployed collection.
    pub fn new(address: MsgAddress) -> Self {
        Self {
            address,
            state_init: None,
        }
    }

    /// Derives the collection address and state init from its configuration.
    pub fn from_config(
        config: &CollectionConfig,
        code: impl Into<Arc<Cell>>,
        workchain: i8,
    ) -> NftResult<Self> {
        let state_init = StateInit::new(code, config.data_cell()?);
        let address = state_init.address(workchain)?;
        debug!("Collection address for owner {}: {}", config.owner, address);
        Ok(Self {
            address,
            state_init: Some(state_init),
        })
    }

    /// Returns the address of the collection contract.
    pub fn address(&self) -> &MsgAddress {
        &self.address
    }

    /// State init, when the handle was derived from a configuration.
    pub fn state_init(&self) -> Option<&StateInit> {
        self.state_init.as_ref()
    }

    /// Creates a mint body.
    ///
    /// # Message Format (TL-B)
    ///
    /// ```text
    /// mint#00000001 query_id:uint64 index:uint64 amount:Coins
    ///   item:^[owner:MsgAddress lower_bound:uint32 upper_bound:uint32 content:^Cell]
    /// ```
    ///
    /// `amount` is the item's pass amount, or `fees.min_storage`.
    pub fn create_mint_body(query_id: u64, item: &MintItemInput, fees: &FeeConfig) -> NftResult<Cell> {
        let mut builder = message_header(OP_MINT, query_id)?;
        builder.store_u64(item.index)?;
        builder.store_coins(item.pass_amount.unwrap_or(fees.min_storage as u128))?;
        builder.store_ref(item.item_message()?)?;
        Ok(builder.build()?)
    }

    /// Creates a batch mint body.
    ///
    /// # Message Format (TL-B)
    ///
    /// ```text
    /// batch_mint#00000002 query_id:uint64 items:(HashmapE 64 BatchMintEntry)
    /// ```
    ///
    /// Every entry forwards `fees.min_storage`. Fails with `BatchTooLarge`
    /// for more than 250 items and `DuplicateIndex` when two items share an
    /// index.
    pub fn create_batch_mint_body(
        query_id: u64,
        items: &[MintItemInput],
        fees: &FeeConfig,
    ) -> NftResult<Cell> {
        if items.len() > MAX_BATCH_SIZE {
            return Err(NftError::BatchTooLarge {
                max: MAX_BATCH_SIZE,
                got: items.len(),
            });
        }

        let mut dict = Dictionary::new(BATCH_KEY_BITS)?;
        for item in items {
            let entry = BatchMintEntry::new(item.item_message()?, fees.min_storage as u128);
            if dict.insert(item.index, entry)?.is_some() {
                return Err(NftError::DuplicateIndex(item.index));
            }
        }
        debug!("Batch mint of {} items", dict.len());

        let mut builder = message_header(OP_BATCH_MINT, query_id)?;
        dict.store(&mut builder)?;
        Ok(builder.build()?)
    }

    /// Creates a change owner body.
    pub fn create_change_owner_body(query_id: u64, new_owner: &MsgAddress) -> NftResult<Cell> {
        let mut builder = message_header(OP_CHANGE_OWNER, query_id)?;
        builder.store_address(new_owner)?;
        Ok(builder.build()?)
    }

    /// Creates an edit content body.
    ///
    /// # Message Format (TL-B)
    ///
    /// ```text
    /// edit_content#00000004 query_id:uint64
    ///   content:^[collection_content:^Cell common_content:^Cell]
    ///   royalty_params:^RoyaltyParams
    /// ```
    pub fn create_edit_content_body(
        query_id: u64,
        collection_content: &str,
        common_content: &str,
        royalty: &RoyaltyParams,
    ) -> NftResult<Cell> {
        let mut builder = message_header(OP_EDIT_CONTENT, query_id)?;
        builder.store_ref(content_pair(collection_content, common_content)?)?;
        builder.store_ref(royalty.to_cell()?)?;
        Ok(builder.build()?)
    }

    /// Creates a get royalty params body.
    pub fn create_get_royalty_params_body(query_id: u64) -> NftResult<Cell> {
        Ok(message_header(OP_GET_ROYALTY_PARAMS, query_id)?.build()?)
    }

    /// Creates the body the collection answers a royalty request with.
    pub fn create_report_royalty_params_body(query_id: u64, royalty: &RoyaltyParams) -> NftResult<Cell> {
        let mut builder = message_header(OP_REPORT_ROYALTY_PARAMS, query_id)?;
        royalty.store(&mut builder)?;
        Ok(builder.build()?)
    }
}

impl From<MsgAddress> for CookieCollection {
    fn from(address: MsgAddress) -> Self {
        Self::new(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owner() -> MsgAddress {
        MsgAddress::Internal {
            workchain: 0,
            address: [0x34; 32],
        }
    }

    fn items(count: u64) -> Vec<MintItemInput> {
        (0..count)
            .map(|i| MintItemInput::new(i, owner(), 0, 100, format!("{}.json", i)))
            .collect()
    }

    #[test]
    fn test_mint_body_layout() {
        let item = MintItemInput::new(5, owner(), 0, 100, "b.json");
        let body = CookieCollection::create_mint_body(9, &item, &FeeConfig::default()).unwrap();

        let mut slice = CellSlice::new(&body);
        assert_eq!(slice.load_u32().unwrap(), OP_MINT);
        assert_eq!(slice.load_u64().unwrap(), 9);
        assert_eq!(slice.load_u64().unwrap(), 5);
        assert_eq!(slice.load_coins().unwrap(), 50_000_000);
        assert_eq!(slice.bits_left(), 0);

        let item_cell = slice.load_ref().unwrap();
        let mut item_slice = CellSlice::new(item_cell);
        assert_eq!(item_slice.load_address().unwrap(), owner());
        assert_eq!(item_slice.load_u32().unwrap(), 0);
        assert_eq!(item_slice.load_u32().unwrap(), 100);
        assert_eq!(item_slice.load_ref().unwrap().data(), b"b.json");
    }

    #[test]
    fn test_mint_pass_amount_overrides_fee() {
        let item = MintItemInput::new(1, owner(), 1, 2, "c.json").with_pass_amount(0);
        let body = CookieCollection::create_mint_body(0, &item, &FeeConfig::default()).unwrap();

        // header + index + zero-length coins
        assert_eq!(body.bit_len(), 32 + 64 + 64 + 4);
        match CollectionMessage::parse(&body).unwrap() {
            CollectionMessage::Mint { item: parsed, .. } => assert_eq!(parsed, item),
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_batch_mint_limits() {
        let fees = FeeConfig::default();
        assert!(CookieCollection::create_batch_mint_body(0, &items(250), &fees).is_ok());

        match CookieCollection::create_batch_mint_body(0, &items(251), &fees) {
            Err(NftError::BatchTooLarge { max: 250, got: 251 }) => {}
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_batch_mint_duplicate_index() {
        let mut batch = items(3);
        batch[2].index = 0;
        assert!(matches!(
            CookieCollection::create_batch_mint_body(0, &batch, &FeeConfig::default()),
            Err(NftError::DuplicateIndex(0))
        ));
    }

    #[test]
    fn test_batch_entry_layout() {
        let item = Cell::empty();
        let entry = BatchMintEntry::new(item.clone(), 50_000_000);
        let mut builder = CellBuilder::new();
        entry.store_value(&mut builder).unwrap();
        let cell = builder.build().unwrap();

        // 50_000_000 = 0x02faf080, 4 bytes
        assert_eq!(cell.bit_len(), 4 + 32);
        assert_eq!(cell.data(), &[0x40, 0x2f, 0xaf, 0x08, 0x00]);
        assert_eq!(**cell.reference(0).unwrap(), item);

        let loaded = BatchMintEntry::load_value(&mut CellSlice::new(&cell)).unwrap();
        assert_eq!(loaded, entry);
    }

    #[test]
    fn test_empty_batch() {
        let body = CookieCollection::create_batch_mint_body(1, &[], &FeeConfig::default()).unwrap();
        assert_eq!(body.bit_len(), 32 + 64 + 1);
        assert_eq!(body.reference_count(), 0);
    }

    #[test]
    fn test_change_owner_body() {
        let body = CookieCollection::create_change_owner_body(3, &owner()).unwrap();
        assert_eq!(body.bit_len(), 32 + 64 + MsgAddress::STD_BITS);
        assert_eq!(
            CollectionMessage::parse(&body).unwrap(),
            CollectionMessage::ChangeOwner {
                query_id: 3,
                new_owner: owner()
            }
        );
    }

    #[test]
    fn test_edit_content_body() {
        let royalty = RoyaltyParams::new(5, 10, owner());
        let body = CookieCollection::create_edit_content_body(
            123,
            "https://c.example/collectionCover.json",
            "https://c.example/",
            &royalty,
        )
        .unwrap();

        assert_eq!(body.bit_len(), 32 + 64);
        assert_eq!(body.reference_count(), 2);
        assert_eq!(body.reference(1).unwrap().bit_len(), 32 + MsgAddress::STD_BITS);

        let parsed = CollectionMessage::parse(&body).unwrap();
        assert_eq!(parsed.opcode(), OP_EDIT_CONTENT);
        assert_eq!(parsed.query_id(), 123);
        match parsed {
            CollectionMessage::EditContent {
                collection_content,
                common_content,
                royalty: parsed_royalty,
                ..
            } => {
                assert_eq!(collection_content, "https://c.example/collectionCover.json");
                assert_eq!(common_content, "https://c.example/");
                assert_eq!(parsed_royalty, royalty);
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_royalty_messages() {
        let request = CookieCollection::create_get_royalty_params_body(7).unwrap();
        assert_eq!(request.bit_len(), 96);
        assert_eq!(
            CollectionMessage::parse(&request).unwrap(),
            CollectionMessage::GetRoyaltyParams { query_id: 7 }
        );

        let royalty = RoyaltyParams::new(1, 20, owner());
        let report = CookieCollection::create_report_royalty_params_body(7, &royalty).unwrap();
        assert_eq!(
            CollectionMessage::parse(&report).unwrap(),
            CollectionMessage::ReportRoyaltyParams { query_id: 7, royalty }
        );
    }

    #[test]
    fn test_unknown_opcode() {
        let body = message_header(0xdeadbeef, 0).unwrap().build().unwrap();
        assert!(matches!(
            CollectionMessage::parse(&body),
            Err(NftError::UnknownOpcode(0xdeadbeef))
        ));
    }

    #[test]
    fn test_from_config_is_deterministic() {
        let config = CollectionConfig {
            owner: owner(),
            next_item_index: 0,
            collection_content: "collection.json".to_string(),
            common_content: "items/".to_string(),
            item_code: Arc::new(Cell::empty()),
            royalty: RoyaltyParams::new(5, 100, owner()),
        };
        let a = CookieCollection::from_config(&config, Cell::empty(), 0).unwrap();
        let b = CookieCollection::from_config(&config, Cell::empty(), 0).unwrap();
        assert_eq!(a.address(), b.address());

        let state_init = a.state_init().unwrap();
        assert_eq!(*state_init.data, config.data_cell().unwrap());
        assert_eq!(a.address(), &state_init.address(0).unwrap());
    }
}
