//! Fortune Cookie item contract interface.
//!
//! Each item is a separate contract deployed by the collection. It stores
//! its index, collection, owner, lucky value bounds and content; the lucky
//! value is revealed by `unseal`.

use std::sync::Arc;

use cookie_cell::{Cell, CellBuilder, CellSlice, MsgAddress};
use tracing::debug;

use crate::content::encode_off_chain_content;
use crate::error::{NftError, NftResult};
use crate::state_init::StateInit;
use crate::types::MintItemInput;
use crate::message_header;

/// Item operation codes.
pub mod opcodes {
    /// Transfer item ownership (op::transfer).
    pub const OP_TRANSFER: u32 = 0x5fcc3d14;

    /// Request static data (index and collection).
    pub const OP_GET_STATIC_DATA: u32 = 0x2fcb26a2;

    /// Response with static data.
    pub const OP_REPORT_STATIC_DATA: u32 = 0x8b771735;

    /// Reveal the item's lucky value.
    pub const OP_UNSEAL: u32 = 0xc35b85d1;
}

pub use opcodes::*;

/// Static data reported by an item.
///
/// ```text
/// report_static_data#8b771735 query_id:uint64 index:uint256 collection:MsgAddress
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportStaticData {
    pub query_id: u64,
    /// Item index; the contract reports it as a uint256.
    pub index: u64,
    pub collection: MsgAddress,
}

impl ReportStaticData {
    /// Parse a `report_static_data` body.
    pub fn parse(body: &Cell) -> NftResult<Self> {
        let mut slice = CellSlice::new(body);
        let op = slice.load_u32()?;
        if op != OP_REPORT_STATIC_DATA {
            return Err(NftError::UnknownOpcode(op));
        }
        let query_id = slice.load_u64()?;

        let high = slice.load_bytes(24)?;
        if high.iter().any(|&b| b != 0) {
            return Err(NftError::IntegerOutOfRange {
                value: format!("0x{}...", high.iter().map(|b| format!("{:02x}", b)).collect::<String>()),
                target: "u64",
            });
        }
        let index = slice.load_u64()?;
        let collection = slice.load_address()?;

        Ok(Self {
            query_id,
            index,
            collection,
        })
    }

    /// Serialize as a `report_static_data` body.
    pub fn to_cell(&self) -> NftResult<Cell> {
        let mut builder = message_header(OP_REPORT_STATIC_DATA, self.query_id)?;
        builder.store_bytes(&[0u8; 24])?;
        builder.store_u64(self.index)?;
        builder.store_address(&self.collection)?;
        Ok(builder.build()?)
    }
}

/// Fortune Cookie item contract.
#[derive(Debug, Clone)]
pub struct CookieItem {
    address: MsgAddress,
    state_init: Option<StateInit>,
}

impl CookieItem {
    /// Creates a handle for an already deployed item.
    pub fn new(address: MsgAddress) -> Self {
        Self {
            address,
            state_init: None,
        }
    }

    /// Derives the address of item `index` of `collection`.
    pub fn from_config(
        index: u64,
        collection: &MsgAddress,
        code: impl Into<Arc<Cell>>,
        workchain: i8,
    ) -> NftResult<Self> {
        let state_init = StateInit::new(code, item_data_cell(index, collection)?);
        let address = state_init.address(workchain)?;
        debug!("Item {} of {}: {}", index, collection, address);
        Ok(Self {
            address,
            state_init: Some(state_init),
        })
    }

    /// Returns the address of the item contract.
    pub fn address(&self) -> &MsgAddress {
        &self.address
    }

    /// State init, when the handle was derived from a configuration.
    pub fn state_init(&self) -> Option<&StateInit> {
        self.state_init.as_ref()
    }

    /// Creates a transfer message body.
    ///
    /// # Arguments
    ///
    /// * `query_id` - Query ID for response tracking
    /// * `new_owner` - New owner's address
    /// * `response_destination` - Address for excess TON, or `MsgAddress::Null`
    /// * `forward_amount` - Amount of TON to forward with the ownership notification
    /// * `forward_payload` - Optional payload to forward with the notification
    ///
    /// # Message Format (TL-B)
    ///
    /// ```text
    /// transfer#5fcc3d14
    ///   query_id:uint64
    ///   new_owner:MsgAddress
    ///   response_destination:MsgAddress
    ///   custom_payload:(Maybe ^Cell)
    ///   forward_amount:(VarUInteger 16)
    ///   forward_payload:(Either Cell ^Cell)
    /// ```
    ///
    /// A custom payload is never sent. The forward payload's bits and refs
    /// are appended inline as they are, so the caller supplies the `Either`
    /// bit; without a payload a single `0` bit is stored.
    pub fn create_transfer_body(
        query_id: u64,
        new_owner: &MsgAddress,
        response_destination: &MsgAddress,
        forward_amount: u128,
        forward_payload: Option<&Cell>,
    ) -> NftResult<Cell> {
        let mut builder = message_header(OP_TRANSFER, query_id)?;
        builder.store_address(new_owner)?;
        builder.store_address(response_destination)?;
        // custom_payload
        builder.store_bit(false)?;
        builder.store_coins(forward_amount)?;

        match forward_payload {
            Some(payload) => {
                builder.store_slice(&CellSlice::new(payload))?;
            }
            None => {
                builder.store_bit(false)?;
            }
        }

        Ok(builder.build()?)
    }

    /// Creates a get_static_data request body.
    ///
    /// ```text
    /// get_static_data#2fcb26a2 query_id:uint64 = InternalMsgBody;
    /// ```
    pub fn create_get_static_data_body(query_id: u64) -> NftResult<Cell> {
        Ok(message_header(OP_GET_STATIC_DATA, query_id)?.build()?)
    }

    /// Creates an unseal body.
    pub fn create_unseal_body(query_id: u64) -> NftResult<Cell> {
        Ok(message_header(OP_UNSEAL, query_id)?.build()?)
    }

    /// Creates the body the collection deploys an item with.
    ///
    /// ```text
    /// _ owner:MsgAddress lower_bound:uint32 upper_bound:uint32 content:^Cell
    /// ```
    ///
    /// Unlike the item message inside mint bodies, the content here is
    /// stored as prefixed off-chain content.
    pub fn create_init_body(item: &MintItemInput) -> NftResult<Cell> {
        let mut builder = CellBuilder::new();
        builder.store_address(&item.owner)?;
        builder.store_u32(item.lower_bound)?;
        builder.store_u32(item.upper_bound)?;
        builder.store_ref(encode_off_chain_content(item.content.as_bytes())?)?;
        Ok(builder.build()?)
    }
}

impl From<MsgAddress> for CookieItem {
    fn from(address: MsgAddress) -> Self {
        Self::new(address)
    }
}

/// Initial data cell of an item: `index:uint64 collection_address:MsgAddress`.
pub fn item_data_cell(index: u64, collection: &MsgAddress) -> NftResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_u64(index)?;
    builder.store_address(collection)?;
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::decode_off_chain_uri;

    fn addr(byte: u8) -> MsgAddress {
        MsgAddress::Internal {
            workchain: 0,
            address: [byte; 32],
        }
    }

    #[test]
    fn test_transfer_body_without_payload() {
        let body = CookieItem::create_transfer_body(0, &addr(1), &MsgAddress::Null, 0, None).unwrap();

        // header, owner, addr_none, custom payload bit, zero coins, forward payload bit
        assert_eq!(body.bit_len(), 96 + MsgAddress::STD_BITS + 2 + 1 + 4 + 1);
        assert_eq!(body.reference_count(), 0);

        let mut slice = CellSlice::new(&body);
        assert_eq!(slice.load_u32().unwrap(), OP_TRANSFER);
        assert_eq!(slice.load_u64().unwrap(), 0);
        assert_eq!(slice.load_address().unwrap(), addr(1));
        assert_eq!(slice.load_address().unwrap(), MsgAddress::Null);
        assert!(!slice.load_bit().unwrap());
        assert_eq!(slice.load_coins().unwrap(), 0);
        assert!(!slice.load_bit().unwrap());
        assert!(slice.is_empty());
    }

    #[test]
    fn test_transfer_body_with_inline_payload() {
        let mut payload = CellBuilder::new();
        payload.store_bit(false).unwrap();
        payload.store_u32(0).unwrap();
        payload.store_bytes(b"hi").unwrap();
        payload.store_ref(Cell::empty()).unwrap();
        let payload = payload.build().unwrap();

        let body =
            CookieItem::create_transfer_body(4, &addr(1), &addr(2), 1_000, Some(&payload)).unwrap();

        let mut slice = CellSlice::new(&body);
        slice.skip_bits(96 + 2 * MsgAddress::STD_BITS + 1).unwrap();
        assert_eq!(slice.load_coins().unwrap(), 1_000);
        assert_eq!(slice.bits_left(), payload.bit_len());
        assert!(!slice.load_bit().unwrap());
        assert_eq!(slice.load_u32().unwrap(), 0);
        assert_eq!(slice.load_bytes(2).unwrap(), b"hi");
        assert_eq!(slice.refs_left(), 1);
    }

    #[test]
    fn test_header_only_bodies() {
        let static_data = CookieItem::create_get_static_data_body(42).unwrap();
        let mut slice = CellSlice::new(&static_data);
        assert_eq!(slice.load_u32().unwrap(), OP_GET_STATIC_DATA);
        assert_eq!(slice.load_u64().unwrap(), 42);
        assert!(slice.is_empty());

        let unseal = CookieItem::create_unseal_body(0).unwrap();
        assert_eq!(unseal.bit_len(), 96);
        assert_eq!(&unseal.data()[..4], &[0xc3, 0x5b, 0x85, 0xd1]);
    }

    #[test]
    fn test_report_static_data() {
        let report = ReportStaticData {
            query_id: 8,
            index: 17,
            collection: addr(9),
        };
        let body = report.to_cell().unwrap();
        assert_eq!(body.bit_len(), 96 + 256 + MsgAddress::STD_BITS);
        assert_eq!(ReportStaticData::parse(&body).unwrap(), report);
    }

    #[test]
    fn test_report_static_data_huge_index() {
        let mut builder = message_header(OP_REPORT_STATIC_DATA, 0).unwrap();
        builder.store_u8(1).unwrap();
        builder.store_bytes(&[0u8; 31]).unwrap();
        builder.store_address(&addr(9)).unwrap();
        let body = builder.build().unwrap();

        assert!(matches!(
            ReportStaticData::parse(&body),
            Err(NftError::IntegerOutOfRange { target: "u64", .. })
        ));
    }

    #[test]
    fn test_init_body() {
        let item = MintItemInput::new(0, addr(3), 0, 100, "A.json");
        let body = CookieItem::create_init_body(&item).unwrap();

        assert_eq!(body.bit_len(), MsgAddress::STD_BITS + 64);
        let content = body.reference(0).unwrap();
        assert_eq!(content.data(), b"\x01A.json");
        assert_eq!(decode_off_chain_uri(content).unwrap(), "A.json");
    }

    #[test]
    fn test_item_address_per_index() {
        let collection = addr(7);
        let first = CookieItem::from_config(0, &collection, Cell::empty(), 0).unwrap();
        let again = CookieItem::from_config(0, &collection, Cell::empty(), 0).unwrap();
        let second = CookieItem::from_config(1, &collection, Cell::empty(), 0).unwrap();

        assert_eq!(first.address(), again.address());
        assert_ne!(first.address(), second.address());

        let data = &first.state_init().unwrap().data;
        let mut slice = CellSlice::new(data);
        assert_eq!(slice.load_u64().unwrap(), 0);
        assert_eq!(slice.load_address().unwrap(), collection);
    }
}
