use crc::{Crc, CRC_32_ISO_HDLC};
use sha2::{Digest, Sha256};

/// CRC-32 with the IEEE polynomial (reflected 0xEDB88320, init and
/// xor-out 0xFFFFFFFF). Every CRC in the stream format uses this.
const CRC_IEEE: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);

pub fn crc32(data: &[u8]) -> u32 {
    CRC_IEEE.checksum(data)
}

/// SHA-256 hex digest of an in-memory buffer. The pipeline works on
/// whole files in memory (the AEAD envelope demands it), so its digests
/// do too.
pub fn sha256_hex(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc32_known_value() {
        // "123456789" has a well-known CRC-32/IEEE checksum
        assert_eq!(crc32(b"123456789"), 0xCBF43926);
    }

    #[test]
    fn test_crc32_empty() {
        assert_eq!(crc32(b""), 0);
    }

    #[test]
    fn test_crc32_detects_single_bit_flip() {
        let mut data = vec![0x55u8; 64];
        let clean = crc32(&data);
        data[17] ^= 0x01;
        assert_ne!(crc32(&data), clean);
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            sha256_hex(b"hello"),
            "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824"
        );
    }
}
