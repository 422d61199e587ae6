//! Incremental cell construction

use super::{Cell, CellError, MAX_BITS, MAX_REFS};
use crate::address::TonAddress;
use crate::amount::Coins;
use std::sync::Arc;

#[derive(Debug, Clone, Default)]
pub struct CellBuilder {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
}

impl CellBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    pub fn remaining_bits(&self) -> usize {
        MAX_BITS - self.bit_len
    }

    fn ensure_capacity(&self, bits: usize) -> Result<(), CellError> {
        if self.bit_len + bits > MAX_BITS {
            return Err(CellError::BitOverflow(self.bit_len + bits));
        }
        Ok(())
    }

    fn push_bit(&mut self, bit: bool) {
        if self.bit_len % 8 == 0 {
            self.data.push(0);
        }
        if bit {
            let idx = self.bit_len / 8;
            self.data[idx] |= 0x80 >> (self.bit_len % 8);
        }
        self.bit_len += 1;
    }

    pub fn store_bit(&mut self, bit: bool) -> Result<&mut Self, CellError> {
        self.ensure_capacity(1)?;
        self.push_bit(bit);
        Ok(self)
    }

    /// Store `value` as an unsigned big-endian integer of `bits` width (at most 128)
    pub fn store_uint(&mut self, value: u128, bits: usize) -> Result<&mut Self, CellError> {
        if bits > 128 || (bits < 128 && value >> bits != 0) {
            return Err(CellError::ValueOutOfRange { bits });
        }
        self.ensure_capacity(bits)?;
        for i in (0..bits).rev() {
            self.push_bit((value >> i) & 1 == 1);
        }
        Ok(self)
    }

    /// Store `value` in two's complement of `bits` width (1..=128)
    pub fn store_int(&mut self, value: i128, bits: usize) -> Result<&mut Self, CellError> {
        if bits == 0 || bits > 128 {
            return Err(CellError::ValueOutOfRange { bits });
        }
        if bits < 128 {
            let min = -(1i128 << (bits - 1));
            let max = (1i128 << (bits - 1)) - 1;
            if value < min || value > max {
                return Err(CellError::ValueOutOfRange { bits });
            }
        }
        let raw = if bits == 128 {
            value as u128
        } else {
            (value as u128) & ((1u128 << bits) - 1)
        };
        self.store_uint(raw, bits)
    }

    pub fn store_bytes(&mut self, bytes: &[u8]) -> Result<&mut Self, CellError> {
        self.ensure_capacity(bytes.len() * 8)?;
        for &byte in bytes {
            for i in (0..8).rev() {
                self.push_bit((byte >> i) & 1 == 1);
            }
        }
        Ok(self)
    }

    /// `VarUInteger 16`: 4-bit byte length followed by the big-endian value
    pub fn store_coins(&mut self, amount: Coins) -> Result<&mut Self, CellError> {
        let nano = amount.nano();
        let len = (128 - nano.leading_zeros() as usize).div_ceil(8);
        if len > 15 {
            return Err(CellError::ValueOutOfRange { bits: len * 8 });
        }
        self.ensure_capacity(4 + len * 8)?;
        self.store_uint(len as u128, 4)?;
        self.store_uint(nano, len * 8)
    }

    /// `addr_std$10 anycast:(Maybe Anycast) workchain_id:int8 address:bits256`
    pub fn store_address(&mut self, address: &TonAddress) -> Result<&mut Self, CellError> {
        self.ensure_capacity(267)?;
        self.store_uint(0b10, 2)?;
        self.store_bit(false)?;
        self.store_int(i128::from(address.workchain()), 8)?;
        self.store_bytes(address.hash())
    }

    /// `addr_none$00`
    pub fn store_address_none(&mut self) -> Result<&mut Self, CellError> {
        self.store_uint(0, 2)
    }

    pub fn store_ref(&mut self, cell: Arc<Cell>) -> Result<&mut Self, CellError> {
        if self.refs.len() >= MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        self.refs.push(cell);
        Ok(self)
    }

    /// Append all bits and references of `cell`
    pub fn store_cell(&mut self, cell: &Cell) -> Result<&mut Self, CellError> {
        self.ensure_capacity(cell.bit_len())?;
        if self.refs.len() + cell.references().len() > MAX_REFS {
            return Err(CellError::RefOverflow);
        }
        for i in 0..cell.bit_len() {
            let bit = cell.data()[i / 8] & (0x80 >> (i % 8)) != 0;
            self.push_bit(bit);
        }
        self.refs.extend(cell.references().iter().cloned());
        Ok(self)
    }

    pub fn build(&self) -> Cell {
        Cell::new(self.data.clone(), self.bit_len, self.refs.clone())
    }
}
