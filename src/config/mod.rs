use crate::error::{Result, RvsError};

/// Stream magic, "RVS1" on the wire when written little-endian.
pub const MAGIC: u32 = u32::from_le_bytes(*b"RVS1");
pub const FORMAT_VERSION: u8 = 1;

// Video parameters
pub const DEFAULT_FRAME_WIDTH: u32 = 3840;
pub const DEFAULT_FRAME_HEIGHT: u32 = 2160;
pub const DEFAULT_FPS: u32 = 30;
pub const CHANNELS: usize = 3; // R, G, B

// Data parameters
pub const DEFAULT_CHUNK_SIZE: u32 = 4096;
pub const DEFAULT_REDUNDANCY: f32 = 0.30;
pub const MAX_REDUNDANCY: f32 = 2.0;

// Robust Soliton parameters. Tunable; the decoder derives nothing from
// them (masks travel on the wire), so changing them only shifts the loss
// tolerance of freshly encoded streams.
pub const SOLITON_C: f64 = 0.03;
pub const SOLITON_DELTA: f64 = 0.5;

// AEAD envelope layout
pub const SALT_SIZE: usize = 16;
pub const NONCE_SIZE: usize = 12;
pub const NONCE_FIELD_SIZE: usize = 16;
pub const TAG_SIZE: usize = 16;
pub const ENVELOPE_OVERHEAD: usize = SALT_SIZE + NONCE_FIELD_SIZE + TAG_SIZE;

// PBKDF2-HMAC-SHA256
pub const PBKDF2_ITERATIONS: u32 = 100_000;
pub const KEY_SIZE: usize = 32;

// Packet wire format: seed(4) | mask_len(4) | mask_bits | xor_crc(4) | payload
pub const PACKET_FIXED_SIZE: usize = 12;

// Metadata preamble: magic(4) | version(1) | flags(1) | N(4) | B(4)
// | file_size(8) | name_len(2) | name | header_crc32(4)
pub const METADATA_FIXED_SIZE: usize = 24;
pub const METADATA_CRC_SIZE: usize = 4;
pub const MAX_NAME_LEN: usize = u16::MAX as usize;

/// How many leading frames the reader inspects for the metadata preamble
/// before declaring the video invalid.
pub const METADATA_SCAN_FRAMES: usize = 8;

// Metadata flag bits
pub const FLAG_ENCRYPTED: u8 = 0x01;

/// Bytes of packet data one frame carries.
pub fn frame_capacity(width: u32, height: u32) -> usize {
    width as usize * height as usize * CHANNELS
}

/// Bytes needed to hold a mask over `num_chunks` chunks.
pub fn mask_bytes(num_chunks: usize) -> usize {
    (num_chunks + 7) / 8
}

/// Total serialized size of one packet for the given chunk count and size.
pub fn packet_size(num_chunks: usize, chunk_size: usize) -> usize {
    PACKET_FIXED_SIZE + mask_bytes(num_chunks) + chunk_size
}

/// Runtime options for an encode operation. Decode derives everything it
/// needs from the metadata preamble and the container itself.
#[derive(Debug, Clone)]
pub struct RvsConfig {
    pub chunk_size: u32,
    pub redundancy: f32,
    pub frame_width: u32,
    pub frame_height: u32,
    pub fps: u32,
    /// Mixed into repair-packet PRNG seeds. `None` draws a fresh seed per
    /// encode; tests pin it for reproducible packet streams.
    pub stream_seed: Option<u32>,
}

impl Default for RvsConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            redundancy: DEFAULT_REDUNDANCY,
            frame_width: DEFAULT_FRAME_WIDTH,
            frame_height: DEFAULT_FRAME_HEIGHT,
            fps: DEFAULT_FPS,
            stream_seed: None,
        }
    }
}

impl RvsConfig {
    /// Reject option combinations the pipeline cannot honour.
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RvsError::InvalidInput("chunk_size must be positive".into()));
        }
        if !(0.0..=MAX_REDUNDANCY).contains(&self.redundancy) {
            return Err(RvsError::InvalidInput(format!(
                "redundancy {} outside [0, {}]",
                self.redundancy, MAX_REDUNDANCY
            )));
        }
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(RvsError::InvalidInput(
                "frame dimensions must be positive".into(),
            ));
        }
        if self.fps == 0 {
            return Err(RvsError::InvalidInput("fps must be positive".into()));
        }
        Ok(())
    }

    pub fn frame_capacity(&self) -> usize {
        frame_capacity(self.frame_width, self.frame_height)
    }
}
