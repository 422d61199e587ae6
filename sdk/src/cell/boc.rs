//! Bag-of-cells (BOC) serialization
//!
//! Layout of the serialized form:
//! ```text
//! magic:u32 = 0xb5ee9c72
//! has_idx:1 has_crc32c:1 has_cache_bits:1 flags:2 size:3
//! off_bytes:u8
//! cells:size roots:size absent:size tot_cells_size:off_bytes
//! root_list:[size]
//! cell_data: d1 d2 data refs:[size]
//! crc32c:u32 (little endian, optional)
//! ```

use super::{Cell, CellError};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

const BOC_MAGIC: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

/// Serialize `root` and everything reachable from it
pub fn serialize_boc(root: &Cell, with_crc: bool) -> Vec<u8> {
    let order = topological_order(root);
    let index: HashMap<[u8; 32], usize> = order
        .iter()
        .enumerate()
        .map(|(i, cell)| (cell.hash(), i))
        .collect();

    let size_bytes = bytes_needed(order.len() as u64).max(1);

    let mut cells_data = Vec::new();
    for cell in &order {
        cells_data.push(cell.refs_descriptor());
        cells_data.push(cell.bits_descriptor());
        cells_data.extend_from_slice(&cell.augmented_data());
        for r in cell.references() {
            write_uint(&mut cells_data, index[&r.hash()] as u64, size_bytes);
        }
    }

    let off_bytes = bytes_needed(cells_data.len() as u64).max(1);

    let mut out = Vec::with_capacity(cells_data.len() + 32);
    out.extend_from_slice(&BOC_MAGIC);
    let crc_flag = if with_crc { 0x40 } else { 0 };
    out.push(crc_flag | size_bytes as u8);
    out.push(off_bytes as u8);
    write_uint(&mut out, order.len() as u64, size_bytes);
    write_uint(&mut out, 1, size_bytes);
    write_uint(&mut out, 0, size_bytes);
    write_uint(&mut out, cells_data.len() as u64, off_bytes);
    write_uint(&mut out, 0, size_bytes);
    out.extend_from_slice(&cells_data);

    if with_crc {
        let crc = crc32c(&out);
        out.extend_from_slice(&crc.to_le_bytes());
    }
    out
}

/// Parse a bag of cells and return its first root
pub fn deserialize_boc(bytes: &[u8]) -> Result<Arc<Cell>, CellError> {
    let invalid = |msg: &str| CellError::InvalidBoc(msg.to_string());

    let mut reader = Reader::new(bytes);
    if reader.take(4)? != BOC_MAGIC {
        return Err(invalid("bad magic"));
    }

    let flags = reader.byte()?;
    let has_idx = flags & 0x80 != 0;
    let has_crc = flags & 0x40 != 0;
    let size_bytes = usize::from(flags & 0x07);
    if size_bytes == 0 || size_bytes > 4 {
        return Err(invalid("bad reference size"));
    }
    let off_bytes = usize::from(reader.byte()?);
    if off_bytes == 0 || off_bytes > 8 {
        return Err(invalid("bad offset size"));
    }

    if has_crc {
        if bytes.len() < 4 {
            return Err(invalid("truncated checksum"));
        }
        let (body, tail) = bytes.split_at(bytes.len() - 4);
        let expected = u32::from_le_bytes([tail[0], tail[1], tail[2], tail[3]]);
        if crc32c(body) != expected {
            return Err(CellError::ChecksumMismatch);
        }
    }

    let cell_count = reader.uint(size_bytes)? as usize;
    let root_count = reader.uint(size_bytes)? as usize;
    let _absent = reader.uint(size_bytes)?;
    let _total_size = reader.uint(off_bytes)?;
    if root_count == 0 || cell_count == 0 {
        return Err(invalid("no root cell"));
    }
    // Every root costs `size_bytes` and every cell at least its two descriptor bytes
    let min_len = root_count
        .checked_mul(size_bytes)
        .zip(cell_count.checked_mul(2))
        .and_then(|(roots, cells)| roots.checked_add(cells));
    if !matches!(min_len, Some(min) if min <= reader.remaining()) {
        return Err(invalid("cell count exceeds data length"));
    }

    let mut roots = Vec::with_capacity(root_count);
    for _ in 0..root_count {
        roots.push(reader.uint(size_bytes)? as usize);
    }
    if has_idx {
        let index_len = cell_count
            .checked_mul(off_bytes)
            .ok_or_else(|| invalid("index too large"))?;
        reader.take(index_len)?;
    }

    struct RawCell {
        data: Vec<u8>,
        bit_len: usize,
        refs: Vec<usize>,
    }

    let mut raw = Vec::with_capacity(cell_count);
    for i in 0..cell_count {
        let d1 = reader.byte()?;
        let d2 = reader.byte()?;
        if d1 & 0x08 != 0 || d1 >> 5 != 0 {
            return Err(invalid("exotic or non-zero level cells are not supported"));
        }
        if d1 & 0x10 != 0 {
            return Err(invalid("cells with stored hashes are not supported"));
        }
        let ref_count = usize::from(d1 & 0x07);
        if ref_count > super::MAX_REFS {
            return Err(invalid("too many references"));
        }

        let data_len = usize::from(d2).div_ceil(2);
        let mut data = reader.take(data_len)?.to_vec();
        let bit_len = if d2 % 2 == 0 {
            data_len * 8
        } else {
            // Strip the completion tag
            let last = data
                .last_mut()
                .ok_or_else(|| invalid("missing completion tag"))?;
            if *last == 0 {
                return Err(invalid("missing completion tag"));
            }
            let tag_pos = last.trailing_zeros() as usize;
            *last &= !(1u8 << tag_pos);
            data_len * 8 - tag_pos - 1
        };

        let mut refs = Vec::with_capacity(ref_count);
        for _ in 0..ref_count {
            let r = reader.uint(size_bytes)? as usize;
            if r <= i || r >= cell_count {
                return Err(invalid("reference out of order"));
            }
            refs.push(r);
        }
        raw.push(RawCell {
            data,
            bit_len,
            refs,
        });
    }

    // Children always have larger indices; build back to front
    let mut built: Vec<Option<Arc<Cell>>> = vec![None; cell_count];
    for i in (0..cell_count).rev() {
        let refs = raw[i]
            .refs
            .iter()
            .map(|&r| built[r].clone().ok_or_else(|| invalid("dangling reference")))
            .collect::<Result<Vec<_>, _>>()?;
        let cell = Cell::new(std::mem::take(&mut raw[i].data), raw[i].bit_len, refs);
        built[i] = Some(Arc::new(cell));
    }

    let root = *roots.first().ok_or_else(|| invalid("no root cell"))?;
    built
        .get(root)
        .cloned()
        .flatten()
        .ok_or_else(|| invalid("root index out of range"))
}

/// Parents before children, each distinct cell once
fn topological_order(root: &Cell) -> Vec<&Cell> {
    fn visit<'c>(cell: &'c Cell, seen: &mut HashSet<[u8; 32]>, post: &mut Vec<&'c Cell>) {
        if !seen.insert(cell.hash()) {
            return;
        }
        for r in cell.references() {
            visit(r, seen, post);
        }
        post.push(cell);
    }

    let mut seen = HashSet::new();
    let mut post = Vec::new();
    visit(root, &mut seen, &mut post);
    post.reverse();
    post
}

fn bytes_needed(value: u64) -> usize {
    (64 - value.leading_zeros() as usize).div_ceil(8)
}

fn write_uint(out: &mut Vec<u8>, value: u64, bytes: usize) {
    out.extend_from_slice(&value.to_be_bytes()[8 - bytes..]);
}

/// CRC-32C (Castagnoli)
fn crc32c(data: &[u8]) -> u32 {
    let mut crc = !0u32;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0x82F6_3B78
            } else {
                crc >> 1
            };
        }
    }
    !crc
}

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], CellError> {
        let end = self
            .pos
            .checked_add(n)
            .filter(|&end| end <= self.bytes.len())
            .ok_or_else(|| CellError::InvalidBoc("unexpected end of data".to_string()))?;
        let out = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(out)
    }

    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn byte(&mut self) -> Result<u8, CellError> {
        Ok(self.take(1)?[0])
    }

    fn uint(&mut self, n: usize) -> Result<u64, CellError> {
        Ok(self
            .take(n)?
            .iter()
            .fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
    }
}
