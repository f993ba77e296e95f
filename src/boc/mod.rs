//! BOC (Bag Of Cells) implementation.

pub use self::de::ParseBocError;
pub use self::ser::BocHeader;

mod de;
mod ser;

use crate::cell::Cell;

/// BOC magic tag.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum BocTag {
    /// Legacy indexed format without a checksum.
    Indexed,
    /// Legacy indexed format with a checksum.
    IndexedCrc32,
    /// Generic format.
    Generic,
}

impl BocTag {
    const BOC_INDEXED_TAG: [u8; 4] = [0x68, 0xff, 0x65, 0xf3];
    const BOC_INDEXED_CRC32_TAG: [u8; 4] = [0xac, 0xc3, 0xa7, 0x28];
    const BOC_GENERIC_TAG: [u8; 4] = [0xb5, 0xee, 0x9c, 0x72];

    /// Tries to match bytes with a BOC tag.
    pub const fn from_bytes(data: [u8; 4]) -> Option<Self> {
        match data {
            Self::BOC_GENERIC_TAG => Some(Self::Generic),
            Self::BOC_INDEXED_CRC32_TAG => Some(Self::IndexedCrc32),
            Self::BOC_INDEXED_TAG => Some(Self::Indexed),
            _ => None,
        }
    }

    /// Converts the BOC tag to bytes.
    pub const fn to_bytes(self) -> [u8; 4] {
        match self {
            Self::Indexed => Self::BOC_INDEXED_TAG,
            Self::IndexedCrc32 => Self::BOC_INDEXED_CRC32_TAG,
            Self::Generic => Self::BOC_GENERIC_TAG,
        }
    }
}

/// BOC encoder and decoder.
pub struct Boc;

impl Boc {
    /// Encodes the cell tree into the generic format with a checksum.
    pub fn encode(root: &Cell) -> Vec<u8> {
        Self::encode_ext(root, true)
    }

    /// Encodes the cell tree into the generic format.
    pub fn encode_ext(root: &Cell, include_crc: bool) -> Vec<u8> {
        let mut result = Vec::new();
        BocHeader::new(root).with_crc(include_crc).encode(&mut result);
        result
    }

    /// Encodes the cell tree into the generic format as a base64 string.
    pub fn encode_base64(root: &Cell) -> String {
        use base64::Engine;
        base64::engine::general_purpose::STANDARD.encode(Self::encode(root))
    }

    /// Decodes the first root of a serialized cell tree.
    pub fn decode(data: &[u8]) -> Result<Cell, ParseBocError> {
        de::decode(data)
    }

    /// Decodes a base64-encoded serialized cell tree.
    pub fn decode_base64(data: impl AsRef<[u8]>) -> Result<Cell, ParseBocError> {
        use base64::Engine;
        let data = base64::engine::general_purpose::STANDARD.decode(data.as_ref())?;
        de::decode(&data)
    }
}
