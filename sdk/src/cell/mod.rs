//! TON cells and bag-of-cells serialization
//!
//! A cell holds up to 1023 bits and up to 4 references to other cells. Only
//! ordinary (level 0) cells are supported; that is all the wallet and the
//! airdrop contract messages need.

mod boc;
mod builder;
mod slice;

pub use boc::{deserialize_boc, serialize_boc};
pub use builder::CellBuilder;
pub use slice::CellSlice;

use sha2::{Digest, Sha256};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

pub const MAX_BITS: usize = 1023;
pub const MAX_REFS: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CellError {
    #[error("cell bit overflow: {0} bits requested, capacity is 1023")]
    BitOverflow(usize),

    #[error("cell reference overflow: capacity is 4")]
    RefOverflow,

    #[error("value does not fit in {bits} bits")]
    ValueOutOfRange { bits: usize },

    #[error("read past end of cell: {requested} bits requested, {remaining} remaining")]
    SliceUnderflow { requested: usize, remaining: usize },

    #[error("no more references in cell")]
    RefUnderflow,

    #[error("unsupported address encoding: {0}")]
    UnsupportedAddress(String),

    #[error("invalid bag of cells: {0}")]
    InvalidBoc(String),

    #[error("bag of cells checksum mismatch")]
    ChecksumMismatch,

    #[error("unknown message opcode 0x{0:08x}")]
    UnknownOpcode(u32),

    #[error("unexpected trailing data: {bits} bits, {refs} refs")]
    TrailingData { bits: usize, refs: usize },
}

/// An immutable ordinary cell with its representation hash precomputed
#[derive(Clone)]
pub struct Cell {
    data: Vec<u8>,
    bit_len: usize,
    refs: Vec<Arc<Cell>>,
    hash: [u8; 32],
    depth: u16,
}

impl Cell {
    fn new(data: Vec<u8>, bit_len: usize, refs: Vec<Arc<Cell>>) -> Self {
        let depth = refs
            .iter()
            .map(|r| r.depth + 1)
            .max()
            .unwrap_or(0);

        let mut cell = Self {
            data,
            bit_len,
            refs,
            hash: [0u8; 32],
            depth,
        };
        cell.hash = cell.compute_hash();
        cell
    }

    pub fn empty() -> Self {
        Self::new(Vec::new(), 0, Vec::new())
    }

    pub fn bit_len(&self) -> usize {
        self.bit_len
    }

    /// Data bytes, unused trailing bits are zero
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn references(&self) -> &[Arc<Cell>] {
        &self.refs
    }

    pub fn hash(&self) -> [u8; 32] {
        self.hash
    }

    pub fn depth(&self) -> u16 {
        self.depth
    }

    pub fn parse(&self) -> CellSlice<'_> {
        CellSlice::new(self)
    }

    /// Refs descriptor byte (`d1`)
    fn refs_descriptor(&self) -> u8 {
        self.refs.len() as u8
    }

    /// Bits descriptor byte (`d2`)
    fn bits_descriptor(&self) -> u8 {
        ((self.bit_len / 8) + self.bit_len.div_ceil(8)) as u8
    }

    /// Data padded with the completion tag when not byte aligned
    fn augmented_data(&self) -> Vec<u8> {
        let mut data = self.data.clone();
        let rem = self.bit_len % 8;
        if rem != 0 {
            if let Some(last) = data.last_mut() {
                *last |= 0x80 >> rem;
            }
        }
        data
    }

    fn compute_hash(&self) -> [u8; 32] {
        let mut hasher = Sha256::new();
        hasher.update([self.refs_descriptor(), self.bits_descriptor()]);
        hasher.update(self.augmented_data());
        for r in &self.refs {
            hasher.update(r.depth.to_be_bytes());
        }
        for r in &self.refs {
            hasher.update(r.hash);
        }
        hasher.finalize().into()
    }
}

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.hash == other.hash
    }
}

impl Eq for Cell {}

impl fmt::Debug for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cell")
            .field("bits", &self.bit_len)
            .field("data", &hex::encode(&self.data))
            .field("refs", &self.refs)
            .finish()
    }
}
