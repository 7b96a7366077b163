//! Typed get methods.
//!
//! Each get method of the collection and item contracts is a record
//! implementing [`GetMethod`]: it knows its name, the parameter stack it
//! is called with, and the fixed positional layout of its result.
//!
//! ```
//! use cookie_nft::methods::{GetMethod, GetNftAddressByIndex};
//! use cookie_nft::StackValue;
//!
//! let call = GetNftAddressByIndex { index: 3 };
//! assert_eq!(call.params().unwrap(), vec![StackValue::Int(3)]);
//! assert_eq!(GetNftAddressByIndex::method_id(), 0x167a3);
//! ```

use std::sync::Arc;

use cookie_cell::{Cell, MsgAddress};
use tracing::trace;

use crate::content::decode_off_chain_uri;
use crate::error::{NftError, NftResult};
use crate::stack::{StackReader, StackValue, parse_stack_boc};
use crate::types::{CollectionData, NftItemData, RoyaltyParams};

/// A contract get method with a fixed result layout.
pub trait GetMethod {
    /// Method name as declared by the contract.
    const NAME: &'static str;

    /// Decoded result.
    type Output;

    /// Parameter stack, bottom first.
    fn params(&self) -> NftResult<Vec<StackValue>> {
        Ok(Vec::new())
    }

    /// Decode the result stack, first returned value first.
    fn decode(stack: &mut StackReader) -> NftResult<Self::Output>;

    /// Numeric method id a liteserver is called with.
    fn method_id() -> u64 {
        method_id(Self::NAME)
    }

    /// Decode a liteserver result: exit code and serialized result stack.
    fn decode_result(exit_code: i32, result: &[u8]) -> NftResult<Self::Output> {
        if exit_code != 0 && exit_code != 1 {
            return Err(NftError::GetMethodFailed(exit_code));
        }
        let values = parse_stack_boc(result)?;
        trace!("{} returned {} values", Self::NAME, values.len());
        Self::decode(&mut StackReader::new(values))
    }
}

/// Method id of a get method: CRC16-XMODEM of the name with bit 16 set.
pub fn method_id(name: &str) -> u64 {
    const CRC16: crc::Crc<u16> = crc::Crc::<u16>::new(&crc::CRC_16_XMODEM);
    (CRC16.checksum(name.as_bytes()) as u64 & 0xffff) | 0x10000
}

/// `get_collection_data() -> (int next_item_index, cell content, slice owner)`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetCollectionData;

impl GetMethod for GetCollectionData {
    const NAME: &'static str = "get_collection_data";
    type Output = CollectionData;

    fn decode(stack: &mut StackReader) -> NftResult<CollectionData> {
        let next_item_index = stack.read_u64()?;
        let collection_content = decode_off_chain_uri(&*stack.read_cell()?)?;
        let owner = stack.read_address()?;
        Ok(CollectionData {
            next_item_index,
            collection_content,
            owner,
        })
    }
}

/// `get_nft_address_by_index(int index) -> slice address`
#[derive(Debug, Clone, Copy)]
pub struct GetNftAddressByIndex {
    pub index: u64,
}

impl GetMethod for GetNftAddressByIndex {
    const NAME: &'static str = "get_nft_address_by_index";
    type Output = MsgAddress;

    fn params(&self) -> NftResult<Vec<StackValue>> {
        Ok(vec![StackValue::Int(self.index as i128)])
    }

    fn decode(stack: &mut StackReader) -> NftResult<MsgAddress> {
        stack.read_address()
    }
}

/// `royalty_params() -> (int factor, int base, slice address)`
#[derive(Debug, Clone, Copy, Default)]
pub struct GetRoyaltyParams;

impl GetMethod for GetRoyaltyParams {
    const NAME: &'static str = "royalty_params";
    type Output = RoyaltyParams;

    fn decode(stack: &mut StackReader) -> NftResult<RoyaltyParams> {
        let factor = stack.read_u16()?;
        let base = stack.read_u16()?;
        let address = stack.read_address()?;
        Ok(RoyaltyParams::new(factor, base, address))
    }
}

/// `get_nft_content(int index, cell individual_content) -> cell full_content`
///
/// The collection joins its common content with the item's content and
/// returns the result as off-chain content.
#[derive(Debug, Clone)]
pub struct GetNftContent {
    pub index: u64,
    pub individual_content: Arc<Cell>,
}

impl GetMethod for GetNftContent {
    const NAME: &'static str = "get_nft_content";
    type Output = String;

    fn params(&self) -> NftResult<Vec<StackValue>> {
        Ok(vec![
            StackValue::Int(self.index as i128),
            StackValue::Cell(self.individual_content.clone()),
        ])
    }

    fn decode(stack: &mut StackReader) -> NftResult<String> {
        decode_off_chain_uri(&*stack.read_cell()?)
    }
}

/// `get_nft_data() -> (int init?, int index, slice collection, slice owner, cell content)`
///
/// An item that has not been initialized yet reports only the first
/// three values.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetNftData;

impl GetMethod for GetNftData {
    const NAME: &'static str = "get_nft_data";
    type Output = NftItemData;

    fn decode(stack: &mut StackReader) -> NftResult<NftItemData> {
        let initialized = stack.read_int()? == -1;
        let index = stack.read_u64()?;
        let collection = stack.read_address()?;

        if !initialized {
            return Ok(NftItemData {
                initialized,
                index,
                collection,
                owner: None,
                content: None,
                content_raw: None,
            });
        }

        let owner = stack.read_address()?;
        let content_raw = stack.read_cell()?;
        let content = decode_off_chain_uri(&content_raw)?;

        Ok(NftItemData {
            initialized,
            index,
            collection,
            owner: Some(owner),
            content: Some(content),
            content_raw: Some(content_raw),
        })
    }
}

/// `get_lucky_value() -> int`
///
/// Zero until the item is unsealed.
#[derive(Debug, Clone, Copy, Default)]
pub struct GetLuckyValue;

impl GetMethod for GetLuckyValue {
    const NAME: &'static str = "get_lucky_value";
    type Output = i64;

    fn decode(stack: &mut StackReader) -> NftResult<i64> {
        stack.read_i64()
    }
}
