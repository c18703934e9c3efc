use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::config;
use crate::integrity;

#[derive(Error, Debug)]
pub enum MetadataError {
    #[error("frame too short for a metadata header")]
    TooShort,
    #[error("bad magic: 0x{0:08X}")]
    BadMagic(u32),
    #[error("unsupported version: {0}")]
    UnsupportedVersion(u8),
    #[error("header CRC mismatch")]
    CrcMismatch,
    #[error("implausible header geometry")]
    BadGeometry,
}

/// The self-describing preamble carried by the first frame(s) of a
/// stream. Everything the decoder needs (chunk count, chunk size, exact
/// output length, whether a password is required) lives here; there is
/// no side channel.
///
/// Wire layout, all integers little-endian:
/// `magic(4) | version(1) | flags(1) | N(4) | B(4) | file_size(8) |
/// name_len(2) | name | header_crc32(4)`
///
/// When the stream is encrypted, `file_size` is the envelope length (the
/// chunker's input), not the plaintext length.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataRecord {
    pub flags: u8,
    pub num_chunks: u32,
    pub chunk_size: u32,
    pub file_size: u64,
    pub name: String,
}

impl MetadataRecord {
    pub fn is_encrypted(&self) -> bool {
        self.flags & config::FLAG_ENCRYPTED != 0
    }

    pub fn serialize(&self) -> Vec<u8> {
        let name = self.name.as_bytes();
        debug_assert!(name.len() <= config::MAX_NAME_LEN);

        let total = config::METADATA_FIXED_SIZE + name.len() + config::METADATA_CRC_SIZE;
        let mut out = vec![0u8; total];

        LittleEndian::write_u32(&mut out[0..], config::MAGIC);
        out[4] = config::FORMAT_VERSION;
        out[5] = self.flags;
        LittleEndian::write_u32(&mut out[6..], self.num_chunks);
        LittleEndian::write_u32(&mut out[10..], self.chunk_size);
        LittleEndian::write_u64(&mut out[14..], self.file_size);
        LittleEndian::write_u16(&mut out[22..], name.len() as u16);
        out[24..24 + name.len()].copy_from_slice(name);

        let crc = integrity::crc32(&out[..total - config::METADATA_CRC_SIZE]);
        LittleEndian::write_u32(&mut out[total - config::METADATA_CRC_SIZE..], crc);
        out
    }

    /// Parse a metadata record from a frame's leading bytes (trailing
    /// zero padding is ignored).
    pub fn parse(data: &[u8]) -> Result<Self, MetadataError> {
        let fixed = config::METADATA_FIXED_SIZE;
        if data.len() < fixed + config::METADATA_CRC_SIZE {
            return Err(MetadataError::TooShort);
        }

        let magic = LittleEndian::read_u32(&data[0..]);
        if magic != config::MAGIC {
            return Err(MetadataError::BadMagic(magic));
        }
        let version = data[4];
        if version != config::FORMAT_VERSION {
            return Err(MetadataError::UnsupportedVersion(version));
        }

        let flags = data[5];
        let num_chunks = LittleEndian::read_u32(&data[6..]);
        let chunk_size = LittleEndian::read_u32(&data[10..]);
        let file_size = LittleEndian::read_u64(&data[14..]);
        let name_len = LittleEndian::read_u16(&data[22..]) as usize;

        let total = fixed + name_len + config::METADATA_CRC_SIZE;
        if data.len() < total {
            return Err(MetadataError::TooShort);
        }
        let stored = LittleEndian::read_u32(&data[total - config::METADATA_CRC_SIZE..]);
        let computed = integrity::crc32(&data[..total - config::METADATA_CRC_SIZE]);
        if stored != computed {
            return Err(MetadataError::CrcMismatch);
        }

        if num_chunks == 0 || chunk_size == 0 {
            return Err(MetadataError::BadGeometry);
        }
        // file_size must fit the chunk grid: N is exactly ceil(file_size / B).
        let n = num_chunks as u64;
        let b = chunk_size as u64;
        if file_size > n * b || file_size <= (n - 1) * b {
            return Err(MetadataError::BadGeometry);
        }

        let name = String::from_utf8_lossy(&data[24..24 + name_len]).into_owned();

        Ok(Self {
            flags,
            num_chunks,
            chunk_size,
            file_size,
            name,
        })
    }
}
