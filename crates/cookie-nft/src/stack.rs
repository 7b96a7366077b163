//! Get-method stacks.
//!
//! A liteserver returns get-method results as a serialized `VmStack`:
//!
//! ```text
//! vm_stack#_ depth:(## 24) stack:(VmStackList depth) = VmStack;
//! vm_stk_cons#_ {n:#} rest:^(VmStackList n) tos:VmStackValue = VmStackList (n + 1);
//! vm_stk_nil#_ = VmStackList 0;
//!
//! vm_stk_null#00 = VmStackValue;
//! vm_stk_tinyint#01 value:int64 = VmStackValue;
//! vm_stk_int#0201_ value:int257 = VmStackValue;
//! vm_stk_nan#02ff = VmStackValue;
//! vm_stk_cell#03 cell:^Cell = VmStackValue;
//! vm_stk_slice#04 _:VmCellSlice = VmStackValue;
//! vm_stk_builder#05 cell:^Cell = VmStackValue;
//!
//! _ cell:^Cell st_bits:(## 10) end_bits:(## 10) { st_bits <= end_bits }
//!   st_ref:(#<= 4) end_ref:(#<= 4) { st_ref <= end_ref } = VmCellSlice;
//! ```
//!
//! Values are kept bottom first, so the first value returned by a method is
//! at index 0.

use std::sync::Arc;

use cookie_cell::{BagOfCells, Cell, CellBuilder, CellSlice, MsgAddress};
use tracing::trace;

use crate::error::{NftError, NftResult};

const TAG_NULL: u8 = 0x00;
const TAG_TINYINT: u8 = 0x01;
const TAG_INT: u8 = 0x02;
const TAG_CELL: u8 = 0x03;
const TAG_SLICE: u8 = 0x04;
const TAG_BUILDER: u8 = 0x05;
const NAN_SUFFIX: u8 = 0xff;

/// A single value on a VM stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackValue {
    Null,
    /// Integer; values beyond 128 bits are rejected when parsing.
    Int(i128),
    NaN,
    Cell(Arc<Cell>),
    /// Slice, materialized as a cell holding exactly the sliced bits and refs.
    Slice(Arc<Cell>),
    Builder(Arc<Cell>),
}

impl StackValue {
    /// Slice holding a serialized address, the form get methods take
    /// address parameters in.
    pub fn address(address: &MsgAddress) -> NftResult<Self> {
        let mut builder = CellBuilder::new();
        builder.store_address(address)?;
        Ok(StackValue::Slice(Arc::new(builder.build()?)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            StackValue::Null => "null",
            StackValue::Int(_) => "int",
            StackValue::NaN => "nan",
            StackValue::Cell(_) => "cell",
            StackValue::Slice(_) => "slice",
            StackValue::Builder(_) => "builder",
        }
    }
}

/// Parse a serialized `VmStack`.
pub fn parse_stack(cell: &Cell) -> NftResult<Vec<StackValue>> {
    let mut slice = CellSlice::new(cell);
    let depth = slice.load_uint(24)? as usize;

    let mut values = Vec::new();
    for _ in 0..depth {
        let rest = slice.load_ref()?;
        values.push(load_value(&mut slice)?);
        slice = CellSlice::new(rest);
    }
    values.reverse();

    trace!("Parsed VM stack with {} entries", values.len());
    Ok(values)
}

/// Parse a `VmStack` from BoC bytes.
pub fn parse_stack_boc(data: &[u8]) -> NftResult<Vec<StackValue>> {
    let boc = BagOfCells::deserialize(data)?;
    parse_stack(boc.single_root()?)
}

/// Serialize values (bottom first) as a `VmStack`.
pub fn build_stack(values: &[StackValue]) -> NftResult<Cell> {
    let mut builder = CellBuilder::new();
    builder.store_uint(values.len() as u64, 24)?;

    let Some((top, below)) = values.split_last() else {
        return Ok(builder.build()?);
    };

    let mut rest = Cell::empty();
    for value in below {
        let mut cons = CellBuilder::new();
        cons.store_ref(rest)?;
        store_value(&mut cons, value)?;
        rest = cons.build()?;
    }

    builder.store_ref(rest)?;
    store_value(&mut builder, top)?;
    Ok(builder.build()?)
}

fn load_value(slice: &mut CellSlice<'_>) -> NftResult<StackValue> {
    let tag = slice.load_u8()?;
    match tag {
        TAG_NULL => Ok(StackValue::Null),
        TAG_TINYINT => Ok(StackValue::Int(slice.load_i64()? as i128)),
        TAG_INT => {
            if slice.preload_uint(8)? == NAN_SUFFIX as u64 {
                slice.skip_bits(8)?;
                return Ok(StackValue::NaN);
            }
            if slice.load_uint(7)? != 0 {
                return Err(NftError::UnexpectedResult("Malformed int257 tag".to_string()));
            }
            Ok(StackValue::Int(load_int257(slice)?))
        }
        TAG_CELL => Ok(StackValue::Cell(Arc::new(slice.load_ref()?.clone()))),
        TAG_SLICE => {
            let cell = slice.load_ref()?;
            let st_bits = slice.load_uint(10)? as usize;
            let end_bits = slice.load_uint(10)? as usize;
            let st_ref = slice.load_uint(3)? as usize;
            let end_ref = slice.load_uint(3)? as usize;
            if st_bits > end_bits || st_ref > end_ref {
                return Err(NftError::UnexpectedResult(format!(
                    "Invalid slice bounds: bits {}..{}, refs {}..{}",
                    st_bits, end_bits, st_ref, end_ref
                )));
            }

            let mut inner = CellSlice::new(cell);
            inner.skip_bits(st_bits)?;
            inner.skip_refs(st_ref)?;
            let sliced = inner.load_slice(end_bits - st_bits, end_ref - st_ref)?;
            Ok(StackValue::Slice(Arc::new(sliced)))
        }
        TAG_BUILDER => Ok(StackValue::Builder(Arc::new(slice.load_ref()?.clone()))),
        other => Err(NftError::UnsupportedStackEntry(other)),
    }
}

/// Read a two's complement int257 that must fit in an `i128`.
fn load_int257(slice: &mut CellSlice<'_>) -> NftResult<i128> {
    let negative = slice.load_bit()?;
    let high = (slice.load_u64()? as u128) << 64 | slice.load_u64()? as u128;
    let low = (slice.load_u64()? as u128) << 64 | slice.load_u64()? as u128;

    let sign_fill = if negative { u128::MAX } else { 0 };
    if high != sign_fill || (low >> 127 == 1) != negative {
        return Err(NftError::IntegerOutOfRange {
            value: format!("0x{}{:032x}{:032x}", negative as u8, high, low),
            target: "i128",
        });
    }
    Ok(low as i128)
}

fn store_value(builder: &mut CellBuilder, value: &StackValue) -> NftResult<()> {
    match value {
        StackValue::Null => {
            builder.store_u8(TAG_NULL)?;
        }
        StackValue::Int(n) => match i64::try_from(*n) {
            Ok(small) => {
                builder.store_u8(TAG_TINYINT)?;
                builder.store_i64(small)?;
            }
            Err(_) => {
                builder.store_u8(TAG_INT)?;
                builder.store_uint(0, 7)?;
                let negative = *n < 0;
                let high = if negative { u64::MAX } else { 0 };
                let low = *n as u128;
                builder.store_bit(negative)?;
                builder.store_u64(high)?;
                builder.store_u64(high)?;
                builder.store_u64((low >> 64) as u64)?;
                builder.store_u64(low as u64)?;
            }
        },
        StackValue::NaN => {
            builder.store_u8(TAG_INT)?;
            builder.store_u8(NAN_SUFFIX)?;
        }
        StackValue::Cell(cell) => {
            builder.store_u8(TAG_CELL)?;
            builder.store_ref(cell.clone())?;
        }
        StackValue::Slice(cell) => {
            builder.store_u8(TAG_SLICE)?;
            builder.store_ref(cell.clone())?;
            builder.store_uint(0, 10)?;
            builder.store_uint(cell.bit_len() as u64, 10)?;
            builder.store_uint(0, 3)?;
            builder.store_uint(cell.reference_count() as u64, 3)?;
        }
        StackValue::Builder(cell) => {
            builder.store_u8(TAG_BUILDER)?;
            builder.store_ref(cell.clone())?;
        }
    }
    Ok(())
}

/// Positional reader over a parsed stack, first returned value first.
#[derive(Debug, Clone)]
pub struct StackReader {
    values: Vec<StackValue>,
    position: usize,
}

impl StackReader {
    pub fn new(values: Vec<StackValue>) -> Self {
        Self {
            values,
            position: 0,
        }
    }

    /// Number of values not read yet.
    pub fn remaining(&self) -> usize {
        self.values.len() - self.position
    }

    /// Read the next value of any type.
    pub fn read(&mut self) -> NftResult<&StackValue> {
        let index = self.position;
        if index >= self.values.len() {
            return Err(NftError::StackUnderflow {
                expected: index + 1,
                actual: self.values.len(),
            });
        }
        self.position += 1;
        Ok(&self.values[index])
    }

    pub fn read_int(&mut self) -> NftResult<i128> {
        match self.read()? {
            StackValue::Int(n) => Ok(*n),
            other => Err(invalid_entry("int", other)),
        }
    }

    pub fn read_u64(&mut self) -> NftResult<u64> {
        let value = self.read_int()?;
        u64::try_from(value).map_err(|_| NftError::IntegerOutOfRange {
            value: value.to_string(),
            target: "u64",
        })
    }

    pub fn read_i64(&mut self) -> NftResult<i64> {
        let value = self.read_int()?;
        i64::try_from(value).map_err(|_| NftError::IntegerOutOfRange {
            value: value.to_string(),
            target: "i64",
        })
    }

    pub fn read_u16(&mut self) -> NftResult<u16> {
        let value = self.read_int()?;
        u16::try_from(value).map_err(|_| NftError::IntegerOutOfRange {
            value: value.to_string(),
            target: "u16",
        })
    }

    /// Read a cell value.
    pub fn read_cell(&mut self) -> NftResult<Arc<Cell>> {
        match self.read()? {
            StackValue::Cell(cell) => Ok(cell.clone()),
            other => Err(invalid_entry("cell", other)),
        }
    }

    /// Read an address from a slice (or cell) value.
    pub fn read_address(&mut self) -> NftResult<MsgAddress> {
        match self.read()? {
            StackValue::Slice(cell) | StackValue::Cell(cell) => {
                Ok(CellSlice::new(cell).load_address()?)
            }
            other => Err(invalid_entry("slice", other)),
        }
    }
}

fn invalid_entry(expected: &'static str, actual: &StackValue) -> NftError {
    NftError::InvalidStackEntry {
        expected,
        actual: actual.type_name().to_string(),
    }
}
