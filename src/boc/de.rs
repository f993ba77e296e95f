//! BOC decoder.

use smallvec::SmallVec;

use super::BocTag;
use crate::cell::{compute_bit_len, Cell, CellBuilder, CellDescriptor};

/// Error type for BOC decoding related errors.
#[derive(Debug, thiserror::Error)]
pub enum ParseBocError {
    /// EOF encountered during another operation.
    #[error("unexpected EOF")]
    UnexpectedEof,
    /// Invalid magic bytes.
    #[error("unknown BOC tag")]
    UnknownBocTag,
    /// Invalid BOC header.
    #[error("invalid header")]
    InvalidHeader,
    /// Root cell not found.
    #[error("root cell not found")]
    RootCellNotFound,
    /// Malformed cell data or references.
    #[error("invalid cell")]
    InvalidCell,
    /// Checksum verification failed.
    #[error("checksum mismatch")]
    ChecksumMismatch,
    /// Invalid base64 envelope.
    #[error("invalid base64")]
    InvalidBase64(#[from] base64::DecodeError),
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8], ParseBocError> {
        match self.data.get(self.offset..self.offset + len) {
            Some(bytes) => {
                self.offset += len;
                Ok(bytes)
            }
            None => Err(ParseBocError::UnexpectedEof),
        }
    }

    fn read_be_uint(&mut self, size: usize) -> Result<u64, ParseBocError> {
        debug_assert!(size <= 8);
        let bytes = ok!(self.read_bytes(size));
        let mut result = 0u64;
        for byte in bytes {
            result = (result << 8) | *byte as u64;
        }
        Ok(result)
    }

    fn skip(&mut self, len: usize) -> Result<(), ParseBocError> {
        ok!(self.read_bytes(len));
        Ok(())
    }
}

struct RawCell<'a> {
    descriptor: CellDescriptor,
    data: &'a [u8],
    references: SmallVec<[u32; 4]>,
}

/// Decodes the first root of a serialized cell tree.
pub(crate) fn decode(data: &[u8]) -> Result<Cell, ParseBocError> {
    let mut reader = Reader::new(data);

    let tag_bytes = ok!(reader.read_bytes(4));
    // The tag was read as exactly 4 bytes
    let tag = match BocTag::from_bytes(tag_bytes.try_into().unwrap_or_default()) {
        Some(tag) => tag,
        None => return Err(ParseBocError::UnknownBocTag),
    };

    let flags = ok!(reader.read_be_uint(1)) as u8;
    let offset_size = ok!(reader.read_be_uint(1)) as usize;

    let (has_index, has_crc, ref_size, supports_multiple_roots) = match tag {
        BocTag::Indexed => (true, false, flags as usize, false),
        BocTag::IndexedCrc32 => (true, true, flags as usize, false),
        BocTag::Generic => (
            flags & 0b1000_0000 != 0,
            flags & 0b0100_0000 != 0,
            (flags & 0b0000_0111) as usize,
            true,
        ),
    };

    if !(1..=4).contains(&ref_size) || !(1..=8).contains(&offset_size) {
        return Err(ParseBocError::InvalidHeader);
    }

    let cell_count = ok!(reader.read_be_uint(ref_size)) as usize;
    let root_count = ok!(reader.read_be_uint(ref_size)) as usize;
    let absent_count = ok!(reader.read_be_uint(ref_size)) as usize;
    let total_cells_size = ok!(reader.read_be_uint(offset_size));

    if root_count == 0 {
        return Err(ParseBocError::RootCellNotFound);
    }
    if absent_count > 0
        || root_count.saturating_add(absent_count) > cell_count
        || (!supports_multiple_roots && root_count > 1)
    {
        return Err(ParseBocError::InvalidHeader);
    }

    // The declared counts must be consistent with the input length
    // before anything is allocated from them: every cell occupies at
    // least its two descriptor bytes and at most its descriptor, 128
    // data bytes and four child indices
    let max_cell_size = 2 + 128 + 4 * ref_size as u64;
    let remaining = (data.len() - reader.offset) as u64;
    if total_cells_size < cell_count as u64 * 2
        || total_cells_size > cell_count as u64 * max_cell_size
        || root_count as u64 * ref_size as u64 + total_cells_size > remaining
    {
        return Err(ParseBocError::InvalidHeader);
    }

    let root_index = if supports_multiple_roots {
        let mut first = 0;
        for i in 0..root_count {
            let index = ok!(reader.read_be_uint(ref_size)) as usize;
            if index >= cell_count {
                return Err(ParseBocError::InvalidHeader);
            }
            if i == 0 {
                first = index;
            }
        }
        first
    } else {
        0
    };

    if has_index {
        ok!(reader.skip(cell_count * offset_size));
    }

    let cells_start_offset = reader.offset;
    let mut raw_cells = Vec::with_capacity(cell_count);
    for index in 0..cell_count {
        let descriptor = CellDescriptor::new(
            // The descriptor was read as exactly 2 bytes
            ok!(reader.read_bytes(2)).try_into().unwrap_or_default(),
        );

        // Level masks and stored hashes are not supported
        if descriptor.d1 & 0b1111_0000 != 0 || descriptor.reference_count() > 4 {
            return Err(ParseBocError::InvalidCell);
        }

        let data = ok!(reader.read_bytes(descriptor.byte_len() as usize));
        if !descriptor.is_aligned() {
            // An unaligned cell ends with a completion tag in the low
            // seven bits of the last byte
            match data.last() {
                Some(last) if last & 0x7f != 0 => {}
                _ => return Err(ParseBocError::InvalidCell),
            }
        }

        let mut references = SmallVec::new();
        for _ in 0..descriptor.reference_count() {
            let child = ok!(reader.read_be_uint(ref_size)) as usize;
            // Parents strictly precede their children
            if child <= index || child >= cell_count {
                return Err(ParseBocError::InvalidCell);
            }
            references.push(child as u32);
        }

        raw_cells.push(RawCell {
            descriptor,
            data,
            references,
        });
    }

    if (reader.offset - cells_start_offset) as u64 != total_cells_size {
        return Err(ParseBocError::InvalidHeader);
    }

    if has_crc {
        let expected = crc32c::crc32c(&data[..reader.offset]);
        let stored = ok!(reader.read_bytes(4));
        if expected.to_le_bytes() != *stored {
            return Err(ParseBocError::ChecksumMismatch);
        }
    }

    // Children have larger indices, so a reverse pass builds them first
    // and re-checks all structural limits through the builder
    let mut cells: Vec<Option<Cell>> = vec![None; cell_count];
    for (index, raw) in raw_cells.iter().enumerate().rev() {
        let mut builder = CellBuilder::new();
        builder.set_exotic(raw.descriptor.is_exotic());

        let bit_len = compute_bit_len(raw.data, raw.descriptor.is_aligned());
        if builder.store_raw(raw.data, bit_len).is_err() {
            return Err(ParseBocError::InvalidCell);
        }
        for child in &raw.references {
            match &cells[*child as usize] {
                Some(cell) => {
                    if builder.store_reference(cell.clone()).is_err() {
                        return Err(ParseBocError::InvalidCell);
                    }
                }
                None => return Err(ParseBocError::InvalidCell),
            }
        }

        match builder.build() {
            Ok(cell) => cells[index] = Some(cell),
            Err(_) => return Err(ParseBocError::InvalidCell),
        }
    }

    match cells.into_iter().nth(root_index).flatten() {
        Some(root) => Ok(root),
        None => Err(ParseBocError::RootCellNotFound),
    }
}
