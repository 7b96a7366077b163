//! Contract deployment parameters and address derivation.

use std::sync::Arc;

use cookie_cell::{Cell, CellBuilder, CellSlice, MsgAddress};
use tracing::debug;

use crate::error::{NftError, NftResult};

/// Code and data of a contract to deploy.
///
/// ```text
/// _ split_depth:(Maybe (## 5)) special:(Maybe TickTock)
///   code:(Maybe ^Cell) data:(Maybe ^Cell)
///   library:(HashmapE 256 SimpleLib) = StateInit;
/// ```
///
/// Only the `code` and `data` fields are ever set; the others are stored
/// as absent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateInit {
    pub code: Arc<Cell>,
    pub data: Arc<Cell>,
}

impl StateInit {
    /// Creates a new StateInit.
    pub fn new(code: impl Into<Arc<Cell>>, data: impl Into<Arc<Cell>>) -> Self {
        Self {
            code: code.into(),
            data: data.into(),
        }
    }

    /// Serialize into a state init cell.
    pub fn to_cell(&self) -> NftResult<Cell> {
        let mut builder = CellBuilder::new();
        // split_depth, special
        builder.store_bit(false)?;
        builder.store_bit(false)?;
        builder.store_maybe_ref(Some(self.code.clone()))?;
        builder.store_maybe_ref(Some(self.data.clone()))?;
        // library
        builder.store_bit(false)?;
        Ok(builder.build()?)
    }

    /// Parse a state init cell that carries both code and data.
    pub fn from_cell(cell: &Cell) -> NftResult<Self> {
        let mut slice = CellSlice::new(cell);
        if slice.load_bit()? {
            return Err(NftError::UnexpectedResult("split_depth is not supported".to_string()));
        }
        if slice.load_bit()? {
            return Err(NftError::UnexpectedResult("special is not supported".to_string()));
        }
        let code = slice
            .load_maybe_ref()?
            .ok_or_else(|| NftError::UnexpectedResult("state init has no code".to_string()))?;
        let data = slice
            .load_maybe_ref()?
            .ok_or_else(|| NftError::UnexpectedResult("state init has no data".to_string()))?;

        Ok(Self::new(code.clone(), data.clone()))
    }

    /// Address of the contract deployed with this state init.
    ///
    /// The account id is the representation hash of the state init cell.
    pub fn address(&self, workchain: i8) -> NftResult<MsgAddress> {
        let address = MsgAddress::Internal {
            workchain,
            address: self.to_cell()?.hash(),
        };
        debug!("Derived contract address {}", address);
        Ok(address)
    }
}
