use bitvec::prelude::*;
use byteorder::{ByteOrder, LittleEndian};
use thiserror::Error;

use crate::config;
use crate::integrity;

#[derive(Error, Debug)]
pub enum PacketError {
    #[error("buffer too short: need {need} bytes, have {have}")]
    BufferTooShort { need: usize, have: usize },
    #[error("mask length mismatch: expected {expected} bytes, got {got}")]
    MaskLengthMismatch { expected: u32, got: u32 },
    #[error("CRC mismatch: stored 0x{stored:08X}, computed 0x{computed:08X}")]
    CrcMismatch { stored: u32, computed: u32 },
    #[error("empty mask")]
    EmptyMask,
}

/// One fountain packet. `mask` marks which source chunks were XORed into
/// `payload`; `xor_crc` covers the XOR payload, not the source chunks.
/// Packets are self-contained: the decoder needs nothing but the packet
/// bytes and the chunk count and size from the metadata preamble.
#[derive(Debug, Clone)]
pub struct Packet {
    pub seed: u32,
    pub mask: BitVec<u8, Lsb0>,
    pub xor_crc: u32,
    pub payload: Vec<u8>,
}

// Wire layout: seed(4 LE) | mask_len(4 LE) | mask_bits | xor_crc(4 LE) | payload
const OFF_SEED: usize = 0;
const OFF_MASK_LEN: usize = 4;
const OFF_MASK: usize = 8;

impl Packet {
    /// Build a packet over an already-XORed payload, computing its CRC.
    pub fn new(seed: u32, mask: BitVec<u8, Lsb0>, payload: Vec<u8>) -> Self {
        let xor_crc = integrity::crc32(&payload);
        Self {
            seed,
            mask,
            xor_crc,
            payload,
        }
    }

    /// Systematic packet: identity mask over a single chunk.
    pub fn systematic(index: u32, num_chunks: usize, payload: Vec<u8>) -> Self {
        let mut mask = bitvec![u8, Lsb0; 0; num_chunks];
        mask.set(index as usize, true);
        Self::new(index, mask, payload)
    }

    pub fn degree(&self) -> usize {
        self.mask.count_ones()
    }

    pub fn wire_size(&self) -> usize {
        config::PACKET_FIXED_SIZE + self.mask.as_raw_slice().len() + self.payload.len()
    }

    /// Serialize into `out` (cleared first).
    pub fn serialize_into(&self, out: &mut Vec<u8>) {
        out.clear();
        out.reserve(self.wire_size());

        let mask_bytes = self.mask.as_raw_slice();
        let mut fixed = [0u8; 8];
        LittleEndian::write_u32(&mut fixed[OFF_SEED..], self.seed);
        LittleEndian::write_u32(&mut fixed[OFF_MASK_LEN..], mask_bytes.len() as u32);
        out.extend_from_slice(&fixed);
        out.extend_from_slice(mask_bytes);
        out.extend_from_slice(&self.xor_crc.to_le_bytes());
        out.extend_from_slice(&self.payload);
    }

    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.serialize_into(&mut out);
        out
    }
}

/// Parse one packet out of a frame's leading bytes. `num_chunks` and
/// `chunk_size` come from the metadata preamble; the trailing frame
/// padding is ignored. Every failure here means the frame is damaged and
/// the caller skips it and the fountain code absorbs the loss.
pub fn deserialize(
    data: &[u8],
    num_chunks: usize,
    chunk_size: usize,
) -> Result<Packet, PacketError> {
    let expected_mask = config::mask_bytes(num_chunks);
    let total = config::packet_size(num_chunks, chunk_size);
    if data.len() < total {
        return Err(PacketError::BufferTooShort {
            need: total,
            have: data.len(),
        });
    }

    let seed = LittleEndian::read_u32(&data[OFF_SEED..]);
    let mask_len = LittleEndian::read_u32(&data[OFF_MASK_LEN..]);
    if mask_len as usize != expected_mask {
        return Err(PacketError::MaskLengthMismatch {
            expected: expected_mask as u32,
            got: mask_len,
        });
    }

    let crc_off = OFF_MASK + expected_mask;
    let payload_off = crc_off + 4;

    let mut mask = BitVec::<u8, Lsb0>::from_slice(&data[OFF_MASK..crc_off]);
    mask.truncate(num_chunks);
    if mask.not_any() {
        return Err(PacketError::EmptyMask);
    }

    let stored = LittleEndian::read_u32(&data[crc_off..]);
    let payload = data[payload_off..payload_off + chunk_size].to_vec();
    let computed = integrity::crc32(&payload);
    if stored != computed {
        return Err(PacketError::CrcMismatch { stored, computed });
    }

    Ok(Packet {
        seed,
        mask,
        xor_crc: stored,
        payload,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_packet() -> Packet {
        let mut mask = bitvec![u8, Lsb0; 0; 12];
        mask.set(2, true);
        mask.set(7, true);
        mask.set(11, true);
        Packet::new(42, mask, vec![0xA5; 64])
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let pkt = sample_packet();
        let wire = pkt.serialize();
        assert_eq!(wire.len(), config::packet_size(12, 64));

        let parsed = deserialize(&wire, 12, 64).unwrap();
        assert_eq!(parsed.seed, 42);
        assert_eq!(parsed.degree(), 3);
        assert!(parsed.mask[2] && parsed.mask[7] && parsed.mask[11]);
        assert_eq!(parsed.payload, pkt.payload);
        assert_eq!(parsed.xor_crc, pkt.xor_crc);
    }

    #[test]
    fn test_roundtrip_survives_frame_padding() {
        let pkt = sample_packet();
        let mut wire = pkt.serialize();
        wire.resize(wire.len() + 500, 0);
        let parsed = deserialize(&wire, 12, 64).unwrap();
        assert_eq!(parsed.payload, pkt.payload);
    }

    #[test]
    fn test_payload_tamper_detected() {
        let mut wire = sample_packet().serialize();
        let last = wire.len() - 1;
        wire[last] ^= 0xFF;
        assert!(matches!(
            deserialize(&wire, 12, 64),
            Err(PacketError::CrcMismatch { .. })
        ));
    }

    #[test]
    fn test_mask_length_mismatch_detected() {
        let mut wire = sample_packet().serialize();
        wire[OFF_MASK_LEN] = 0xFF;
        assert!(matches!(
            deserialize(&wire, 12, 64),
            Err(PacketError::MaskLengthMismatch { .. })
        ));
    }

    #[test]
    fn test_truncated_buffer_rejected() {
        let wire = sample_packet().serialize();
        assert!(matches!(
            deserialize(&wire[..10], 12, 64),
            Err(PacketError::BufferTooShort { .. })
        ));
    }

    #[test]
    fn test_empty_mask_rejected() {
        let mask = bitvec![u8, Lsb0; 0; 12];
        let pkt = Packet::new(0, mask, vec![0u8; 64]);
        let wire = pkt.serialize();
        assert!(matches!(
            deserialize(&wire, 12, 64),
            Err(PacketError::EmptyMask)
        ));
    }

    #[test]
    fn test_systematic_packet_shape() {
        let pkt = Packet::systematic(5, 9, vec![1, 2, 3]);
        assert_eq!(pkt.degree(), 1);
        assert_eq!(pkt.mask.first_one(), Some(5));
        assert_eq!(pkt.seed, 5);
        // 9 chunks round up to 2 mask bytes on the wire
        assert_eq!(pkt.wire_size(), config::PACKET_FIXED_SIZE + 2 + 3);
    }
}
