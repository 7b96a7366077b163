//! Account addresses.
//!
//! Only the two forms that appear in collection and item messages are
//! modelled: `addr_none` and `addr_std`. Anycast is always written as absent.

use base64::Engine;
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

use crate::{crc16, CellError, CellResult};

/// Tag byte of a bounceable user-friendly address.
const TAG_BOUNCEABLE: u8 = 0x11;
/// Tag byte of a non-bounceable user-friendly address.
const TAG_NON_BOUNCEABLE: u8 = 0x51;
/// Testnet flag OR-ed into the tag byte.
const TAG_TESTNET: u8 = 0x80;

/// Message address.
///
/// # Example
///
/// ```
/// use cookie_cell::MsgAddress;
///
/// let addr = MsgAddress::from_string(
///     "0:0000000000000000000000000000000000000000000000000000000000000000",
/// ).unwrap();
/// assert_eq!(addr.workchain(), Some(0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum MsgAddress {
    /// No address (addr_none$00).
    #[default]
    Null,

    /// Standard address (addr_std$10).
    Internal {
        /// Workchain ID (-1 for masterchain, 0 for basechain).
        workchain: i8,
        /// 256-bit account ID.
        address: [u8; 32],
    },
}

impl MsgAddress {
    /// Serialized width of an `addr_std` with the anycast bit cleared.
    pub const STD_BITS: usize = 2 + 1 + 8 + 256;

    /// Parse an address from a string.
    ///
    /// Supported formats:
    /// - Raw: "workchain:hex_address" (e.g., "0:abc123...")
    /// - User-friendly base64, standard or URL-safe alphabet
    ///
    /// An empty string is `Null`.
    pub fn from_string(s: &str) -> CellResult<Self> {
        let s = s.trim();

        if s.is_empty() {
            return Ok(MsgAddress::Null);
        }

        if let Some((workchain_str, address_str)) = s.split_once(':') {
            let workchain: i8 = workchain_str
                .parse()
                .map_err(|_| CellError::InvalidAddress(format!("Invalid workchain: {}", workchain_str)))?;

            let mut address = [0u8; 32];
            hex::decode_to_slice(address_str, &mut address).map_err(|e| {
                CellError::InvalidAddress(format!("Invalid account id {}: {}", address_str, e))
            })?;

            return Ok(MsgAddress::Internal { workchain, address });
        }

        if s.len() == 48 {
            return Self::from_user_friendly(s);
        }

        Err(CellError::InvalidAddress(format!("Unrecognized address format: {}", s)))
    }

    /// Parse a user-friendly address.
    ///
    /// Format: 1 byte tag + 1 byte workchain + 32 bytes address + 2 bytes CRC16
    fn from_user_friendly(s: &str) -> CellResult<Self> {
        let standard_b64: String = s
            .chars()
            .map(|c| match c {
                '-' => '+',
                '_' => '/',
                c => c,
            })
            .collect();

        let bytes = STANDARD
            .decode(&standard_b64)
            .map_err(|e| CellError::InvalidBase64(e.to_string()))?;

        if bytes.len() != 36 {
            return Err(CellError::InvalidAddress(format!(
                "User-friendly address must be 36 bytes, got {}",
                bytes.len()
            )));
        }

        let expected_crc = u16::from_be_bytes([bytes[34], bytes[35]]);
        let actual_crc = crc16(&bytes[..34]);
        if expected_crc != actual_crc {
            return Err(CellError::InvalidAddress(format!(
                "CRC16 mismatch: expected {:04x}, got {:04x}",
                expected_crc, actual_crc
            )));
        }

        let tag = bytes[0] & !TAG_TESTNET;
        if tag != TAG_BOUNCEABLE && tag != TAG_NON_BOUNCEABLE {
            return Err(CellError::InvalidAddress(format!("Unknown address tag: 0x{:02x}", bytes[0])));
        }

        let workchain = bytes[1] as i8;
        let mut address = [0u8; 32];
        address.copy_from_slice(&bytes[2..34]);

        Ok(MsgAddress::Internal { workchain, address })
    }

    /// Raw form "workchain:hex_address"; empty for `Null`.
    pub fn to_raw_string(&self) -> String {
        match self {
            MsgAddress::Null => String::new(),
            MsgAddress::Internal { workchain, address } => {
                format!("{}:{}", workchain, hex::encode(address))
            }
        }
    }

    /// User-friendly URL-safe base64 form; `None` for `Null`.
    pub fn to_user_friendly(&self, bounceable: bool, testnet: bool) -> Option<String> {
        let MsgAddress::Internal { workchain, address } = self else {
            return None;
        };

        let mut data = Vec::with_capacity(36);
        let mut tag = if bounceable { TAG_BOUNCEABLE } else { TAG_NON_BOUNCEABLE };
        if testnet {
            tag |= TAG_TESTNET;
        }
        data.push(tag);
        data.push(*workchain as u8);
        data.extend_from_slice(address);
        data.extend_from_slice(&crc16(&data).to_be_bytes());

        Some(URL_SAFE_NO_PAD.encode(&data))
    }

    /// Get the workchain ID (if internal address).
    pub fn workchain(&self) -> Option<i8> {
        match self {
            MsgAddress::Internal { workchain, .. } => Some(*workchain),
            MsgAddress::Null => None,
        }
    }

    /// Get the 256-bit address hash (if internal address).
    pub fn hash_part(&self) -> Option<&[u8; 32]> {
        match self {
            MsgAddress::Internal { address, .. } => Some(address),
            MsgAddress::Null => None,
        }
    }

    /// Check if this is a null address.
    pub fn is_null(&self) -> bool {
        matches!(self, MsgAddress::Null)
    }
}

impl std::fmt::Display for MsgAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_raw_string())
    }
}

impl std::str::FromStr for MsgAddress {
    type Err = CellError;

    fn from_str(s: &str) -> CellResult<Self> {
        Self::from_string(s)
    }
}
