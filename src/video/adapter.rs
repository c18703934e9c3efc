use crate::error::Result;

/// Sink for raw RGB frames. The codec behind it must round-trip every
/// pixel byte exactly; the stream format makes no other demand of it.
pub trait FrameWriter {
    /// Append one frame of `width * height * 3` bytes.
    fn write_frame(&mut self, rgb: &[u8]) -> Result<()>;

    /// Flush and durably commit the stream. Nothing is visible at the
    /// output path until this succeeds.
    fn finish(&mut self) -> Result<()>;
}

/// Source of raw RGB frames, in stream order.
pub trait FrameReader {
    /// Next frame, or `None` at end of stream.
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>>;
}

/// Frame transport backed by a plain vector. Lets the whole pipeline run
/// without FFmpeg; unit tests and collaborators that ship frames some
/// other way use this.
#[derive(Debug, Default, Clone)]
pub struct MemoryVideo {
    pub frames: Vec<Vec<u8>>,
    cursor: usize,
}

impl MemoryVideo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_frames(frames: Vec<Vec<u8>>) -> Self {
        Self { frames, cursor: 0 }
    }
}

impl FrameWriter for MemoryVideo {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        self.frames.push(rgb.to_vec());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

impl FrameReader for MemoryVideo {
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.cursor >= self.frames.len() {
            return Ok(None);
        }
        let frame = self.frames[self.cursor].clone();
        self.cursor += 1;
        Ok(Some(frame))
    }
}
