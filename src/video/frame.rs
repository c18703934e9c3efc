use crate::config;
use crate::error::{Result, RvsError};

/// Fixed frame geometry and the byte↔pixel mapping.
///
/// Payload bytes fill pixels in row-major order, channel order R, G, B,
/// zero-padded to the full frame. The mapping is positional and exact:
/// no dithering and no error correction. The lossless codec underneath
/// must preserve every byte; the fountain layer handles loss.
#[derive(Debug, Clone, Copy)]
pub struct FrameLayout {
    pub width: u32,
    pub height: u32,
}

impl FrameLayout {
    /// Build a layout and check that one frame can carry `payload_size`
    /// bytes. Callers map the failure to their own error category.
    pub fn new(width: u32, height: u32, payload_size: usize) -> Result<Self> {
        let layout = Self { width, height };
        if payload_size > layout.capacity() {
            return Err(RvsError::InvalidInput(format!(
                "packet of {} bytes exceeds {}x{} frame capacity of {} bytes",
                payload_size,
                width,
                height,
                layout.capacity()
            )));
        }
        Ok(layout)
    }

    /// Pixel-byte capacity of one frame.
    pub fn capacity(&self) -> usize {
        config::frame_capacity(self.width, self.height)
    }

    /// Lay `payload` out as one frame, reusing `frame` as the buffer.
    pub fn pack_into(&self, payload: &[u8], frame: &mut Vec<u8>) {
        debug_assert!(payload.len() <= self.capacity());
        frame.clear();
        frame.resize(self.capacity(), 0);
        frame[..payload.len()].copy_from_slice(payload);
    }
}
