//! Core Fortune Cookie NFT types.

use std::sync::Arc;

use cookie_cell::{Cell, CellBuilder, CellSlice, MsgAddress};

use crate::content::{decode_off_chain_uri, encode_off_chain_content};
use crate::error::{NftError, NftResult};

/// One item to mint.
///
/// `lower_bound` and `upper_bound` define the range the item's lucky value
/// is drawn from when it is unsealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MintItemInput {
    /// Index of the item in the collection.
    pub index: u64,
    /// First owner of the item.
    pub owner: MsgAddress,
    pub lower_bound: u32,
    pub upper_bound: u32,
    /// Item content, relative to the collection's common content (e.g. "A.json").
    pub content: String,
    /// Amount forwarded to the new item; the configured storage deposit when `None`.
    pub pass_amount: Option<u128>,
}

impl MintItemInput {
    /// Creates a new MintItemInput without a pass amount.
    pub fn new(
        index: u64,
        owner: MsgAddress,
        lower_bound: u32,
        upper_bound: u32,
        content: impl Into<String>,
    ) -> Self {
        Self {
            index,
            owner,
            lower_bound,
            upper_bound,
            content: content.into(),
            pass_amount: None,
        }
    }

    /// Sets the pass amount.
    pub fn with_pass_amount(mut self, amount: u128) -> Self {
        self.pass_amount = Some(amount);
        self
    }

    /// Item message carried by mint and batch mint bodies.
    ///
    /// ```text
    /// owner:MsgAddress lower_bound:uint32 upper_bound:uint32 content:^Cell
    /// ```
    ///
    /// The content cell holds the raw content bytes, without a prefix.
    pub fn item_message(&self) -> NftResult<Cell> {
        let mut content = CellBuilder::new();
        content.store_bytes(self.content.as_bytes())?;

        let mut builder = CellBuilder::new();
        builder.store_address(&self.owner)?;
        builder.store_u32(self.lower_bound)?;
        builder.store_u32(self.upper_bound)?;
        builder.store_ref(content.build()?)?;
        Ok(builder.build()?)
    }

    /// Parse an item message back into an input for `index`.
    pub fn from_item_message(index: u64, pass_amount: u128, cell: &Cell) -> NftResult<Self> {
        let mut slice = CellSlice::new(cell);
        let owner = slice.load_address()?;
        let lower_bound = slice.load_u32()?;
        let upper_bound = slice.load_u32()?;
        let content = load_text(slice.load_ref()?)?;

        Ok(Self {
            index,
            owner,
            lower_bound,
            upper_bound,
            content,
            pass_amount: Some(pass_amount),
        })
    }
}

/// Royalty parameters of a collection.
///
/// ```text
/// royalty_params#_ factor:uint16 base:uint16 address:MsgAddress = RoyaltyParams;
/// ```
///
/// The royalty share is `factor / base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoyaltyParams {
    pub factor: u16,
    pub base: u16,
    /// Address receiving royalties.
    pub address: MsgAddress,
}

impl RoyaltyParams {
    /// Creates new RoyaltyParams.
    pub fn new(factor: u16, base: u16, address: MsgAddress) -> Self {
        Self {
            factor,
            base,
            address,
        }
    }

    /// Store the fields inline.
    pub fn store(&self, builder: &mut CellBuilder) -> NftResult<()> {
        builder.store_u16(self.factor)?;
        builder.store_u16(self.base)?;
        builder.store_address(&self.address)?;
        Ok(())
    }

    /// Serialize into a standalone cell.
    pub fn to_cell(&self) -> NftResult<Cell> {
        let mut builder = CellBuilder::new();
        self.store(&mut builder)?;
        Ok(builder.build()?)
    }

    /// Load the fields from a slice.
    pub fn load(slice: &mut CellSlice<'_>) -> NftResult<Self> {
        Ok(Self {
            factor: slice.load_u16()?,
            base: slice.load_u16()?,
            address: slice.load_address()?,
        })
    }
}

/// Parameters of a collection deployment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionConfig {
    /// Collection owner, the only sender allowed to mint.
    pub owner: MsgAddress,
    pub next_item_index: u64,
    /// Collection metadata URI, stored as off-chain content.
    pub collection_content: String,
    /// Prefix prepended to every item's content, stored as raw bytes.
    pub common_content: String,
    /// Code of the item contract.
    pub item_code: Arc<Cell>,
    pub royalty: RoyaltyParams,
}

impl CollectionConfig {
    /// Build the collection data cell.
    ///
    /// ```text
    /// storage#_ owner_address:MsgAddress next_item_index:uint64
    ///           ^[collection_content:^Cell common_content:^Cell]
    ///           nft_item_code:^Cell
    ///           royalty_params:^RoyaltyParams
    ///           = Storage;
    /// ```
    pub fn data_cell(&self) -> NftResult<Cell> {
        let content = content_pair(&self.collection_content, &self.common_content)?;

        let mut builder = CellBuilder::new();
        builder.store_address(&self.owner)?;
        builder.store_u64(self.next_item_index)?;
        builder.store_ref(content)?;
        builder.store_ref(self.item_code.clone())?;
        builder.store_ref(self.royalty.to_cell()?)?;
        Ok(builder.build()?)
    }

    /// Parse a collection data cell.
    pub fn from_data_cell(cell: &Cell) -> NftResult<Self> {
        let mut slice = CellSlice::new(cell);
        let owner = slice.load_address()?;
        let next_item_index = slice.load_u64()?;
        let (collection_content, common_content) = load_content_pair(slice.load_ref()?)?;
        let item_code = Arc::new(slice.load_ref()?.clone());
        let royalty = RoyaltyParams::load(&mut CellSlice::new(slice.load_ref()?))?;

        Ok(Self {
            owner,
            next_item_index,
            collection_content,
            common_content,
            item_code,
            royalty,
        })
    }
}

/// Data returned by the `get_collection_data` get method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionData {
    /// Index of the next item to be minted.
    pub next_item_index: u64,
    /// Decoded collection content URI.
    pub collection_content: String,
    /// Address of the collection owner.
    pub owner: MsgAddress,
}

/// Data returned by the `get_nft_data` get method.
///
/// `owner` and `content` are only reported once the item has been
/// initialized by the collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NftItemData {
    pub initialized: bool,
    /// Index of this item in the collection.
    pub index: u64,
    /// Address of the collection contract.
    pub collection: MsgAddress,
    pub owner: Option<MsgAddress>,
    /// Decoded item content.
    pub content: Option<String>,
    /// Content cell as returned by the contract.
    pub content_raw: Option<Arc<Cell>>,
}

/// `^[collection_content:^Cell common_content:^Cell]`
pub(crate) fn content_pair(collection_content: &str, common_content: &str) -> NftResult<Cell> {
    let mut common = CellBuilder::new();
    common.store_bytes(common_content.as_bytes())?;

    let mut builder = CellBuilder::new();
    builder.store_ref(encode_off_chain_content(collection_content.as_bytes())?)?;
    builder.store_ref(common.build()?)?;
    Ok(builder.build()?)
}

pub(crate) fn load_content_pair(cell: &Cell) -> NftResult<(String, String)> {
    let mut slice = CellSlice::new(cell);
    let collection_content = decode_off_chain_uri(slice.load_ref()?)?;
    let common_content = load_text(slice.load_ref()?)?;
    Ok((collection_content, common_content))
}

/// Read a cell's bits as UTF-8 text.
pub(crate) fn load_text(cell: &Cell) -> NftResult<String> {
    let bytes = CellSlice::new(cell).load_remaining_bytes()?;
    String::from_utf8(bytes).map_err(|e| NftError::InvalidUtf8(e.to_string()))
}
