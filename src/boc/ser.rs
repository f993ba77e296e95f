//! BOC encoder.

use ahash::AHashMap;

use super::BocTag;
use crate::cell::{Cell, HashBytes};

/// Serializer state for one or more cell trees.
///
/// Stored indices count from the root, while cells are collected from
/// the leaves up, so every index is flipped on write.
pub struct BocHeader<'a> {
    roots: Vec<u32>,
    indices: AHashMap<HashBytes, u32>,
    cells: Vec<&'a Cell>,
    data_bytes: u64,
    ref_slots: u64,
    include_crc: bool,
}

impl<'a> BocHeader<'a> {
    /// Constructs a serializer state over the specified root.
    pub fn new(root: &'a Cell) -> Self {
        let mut res = Self {
            roots: Vec::new(),
            indices: AHashMap::new(),
            cells: Vec::new(),
            data_bytes: 0,
            ref_slots: 0,
            include_crc: false,
        };
        res.add_root(root);
        res
    }

    /// Adds an additional root to the serializer state.
    pub fn add_root(&mut self, root: &'a Cell) {
        let index = self.index_cell(root);
        self.roots.push(index);
    }

    /// Sets whether a CRC32-C checksum is appended.
    #[inline]
    pub fn with_crc(mut self, include_crc: bool) -> Self {
        self.include_crc = include_crc;
        self
    }

    /// Writes the serialized BOC into the target buffer.
    pub fn encode(self, target: &mut Vec<u8>) {
        let start = target.len();
        let cell_count = self.cells.len() as u32;

        let ref_size = byte_width(cell_count as u64);
        // Each serialized cell is two descriptor bytes, its data and
        // one index per reference
        let total_cells_size =
            cell_count as u64 * 2 + self.data_bytes + self.ref_slots * ref_size as u64;
        let offset_size = byte_width(total_cells_size);

        let header_size =
            6 + ref_size * (3 + self.roots.len()) + offset_size + self.include_crc as usize * 4;
        target.reserve(header_size + total_cells_size as usize);

        let flags = ref_size as u8 | (self.include_crc as u8) << 6;
        target.extend_from_slice(&BocTag::Generic.to_bytes());
        target.extend_from_slice(&[flags, offset_size as u8]);

        let write_index = |target: &mut Vec<u8>, value: u32| {
            target.extend_from_slice(&value.to_be_bytes()[4 - ref_size..]);
        };

        write_index(target, cell_count);
        write_index(target, self.roots.len() as u32);
        write_index(target, 0); // no absent cells
        target.extend_from_slice(&total_cells_size.to_be_bytes()[8 - offset_size..]);

        for index in &self.roots {
            write_index(target, cell_count - 1 - index);
        }

        for cell in self.cells.iter().rev() {
            let descriptor = cell.descriptor();
            target.extend_from_slice(&[descriptor.d1, descriptor.d2]);
            target.extend_from_slice(cell.data());
            for child in cell.references() {
                // Every reachable cell was indexed while collecting
                let index = self.indices.get(child.repr_hash()).copied().unwrap_or_default();
                write_index(target, cell_count - 1 - index);
            }
        }

        if self.include_crc {
            let checksum = crc32c::crc32c(&target[start..]);
            target.extend_from_slice(&checksum.to_le_bytes());
        }
    }

    fn index_cell(&mut self, cell: &'a Cell) -> u32 {
        if let Some(index) = self.indices.get(cell.repr_hash()) {
            return *index;
        }

        for child in cell.references() {
            self.index_cell(child);
        }

        let descriptor = cell.descriptor();
        self.data_bytes += descriptor.byte_len() as u64;
        self.ref_slots += descriptor.reference_count() as u64;

        let index = self.cells.len() as u32;
        self.indices.insert(*cell.repr_hash(), index);
        self.cells.push(cell);
        index
    }
}

fn byte_width(value: u64) -> usize {
    (value.max(1).ilog2() / 8 + 1) as usize
}
