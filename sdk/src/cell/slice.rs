//! Sequential reader over a cell

use super::{Cell, CellError};
use crate::address::TonAddress;
use crate::amount::Coins;
use std::sync::Arc;

pub struct CellSlice<'a> {
    cell: &'a Cell,
    bit_pos: usize,
    ref_pos: usize,
}

impl<'a> CellSlice<'a> {
    pub fn new(cell: &'a Cell) -> Self {
        Self {
            cell,
            bit_pos: 0,
            ref_pos: 0,
        }
    }

    pub fn remaining_bits(&self) -> usize {
        self.cell.bit_len() - self.bit_pos
    }

    pub fn remaining_refs(&self) -> usize {
        self.cell.references().len() - self.ref_pos
    }

    fn ensure(&self, bits: usize) -> Result<(), CellError> {
        if bits > self.remaining_bits() {
            return Err(CellError::SliceUnderflow {
                requested: bits,
                remaining: self.remaining_bits(),
            });
        }
        Ok(())
    }

    fn next_bit(&mut self) -> bool {
        let byte = self.cell.data()[self.bit_pos / 8];
        let bit = byte & (0x80 >> (self.bit_pos % 8)) != 0;
        self.bit_pos += 1;
        bit
    }

    pub fn load_bit(&mut self) -> Result<bool, CellError> {
        self.ensure(1)?;
        Ok(self.next_bit())
    }

    pub fn load_uint(&mut self, bits: usize) -> Result<u128, CellError> {
        if bits > 128 {
            return Err(CellError::ValueOutOfRange { bits });
        }
        self.ensure(bits)?;
        let mut value = 0u128;
        for _ in 0..bits {
            value = (value << 1) | u128::from(self.next_bit());
        }
        Ok(value)
    }

    pub fn load_u32(&mut self) -> Result<u32, CellError> {
        Ok(self.load_uint(32)? as u32)
    }

    pub fn load_int(&mut self, bits: usize) -> Result<i128, CellError> {
        if bits == 0 || bits > 128 {
            return Err(CellError::ValueOutOfRange { bits });
        }
        let raw = self.load_uint(bits)?;
        if bits == 128 {
            return Ok(raw as i128);
        }
        // Sign-extend
        let shift = 128 - bits;
        Ok(((raw << shift) as i128) >> shift)
    }

    pub fn load_bytes(&mut self, len: usize) -> Result<Vec<u8>, CellError> {
        self.ensure(len * 8)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            out.push(self.load_uint(8)? as u8);
        }
        Ok(out)
    }

    pub fn load_coins(&mut self) -> Result<Coins, CellError> {
        let len = self.load_uint(4)? as usize;
        let nano = self.load_uint(len * 8)?;
        Coins::from_nano(nano).map_err(|_| CellError::ValueOutOfRange { bits: len * 8 })
    }

    /// Load a `MsgAddressInt`; only `addr_std` without anycast is supported
    pub fn load_address(&mut self) -> Result<TonAddress, CellError> {
        let tag = self.load_uint(2)?;
        if tag != 0b10 {
            return Err(CellError::UnsupportedAddress(format!("tag {tag:02b}")));
        }
        if self.load_bit()? {
            return Err(CellError::UnsupportedAddress("anycast".to_string()));
        }
        let workchain = self.load_int(8)? as i8;
        let mut hash = [0u8; 32];
        hash.copy_from_slice(&self.load_bytes(32)?);
        Ok(TonAddress::new(workchain, hash))
    }

    pub fn load_ref(&mut self) -> Result<&'a Arc<Cell>, CellError> {
        let r = self
            .cell
            .references()
            .get(self.ref_pos)
            .ok_or(CellError::RefUnderflow)?;
        self.ref_pos += 1;
        Ok(r)
    }

    /// Fail if any bits or references are left unread
    pub fn ensure_empty(&self) -> Result<(), CellError> {
        if self.remaining_bits() != 0 || self.remaining_refs() != 0 {
            return Err(CellError::TrailingData {
                bits: self.remaining_bits(),
                refs: self.remaining_refs(),
            });
        }
        Ok(())
    }
}
