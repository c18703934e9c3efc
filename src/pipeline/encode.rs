use std::fs;
use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use log::info;
use rand::Rng;

use crate::chunker;
use crate::config::{self, RvsConfig};
use crate::crypto;
use crate::error::{Result, RvsError};
use crate::fountain;
use crate::metadata::MetadataRecord;
use crate::video::adapter::FrameWriter;
use crate::video::encoder::FfmpegFrameWriter;
use crate::video::frame::FrameLayout;

/// Full encode pipeline: file -> [seal] -> chunks -> fountain packets ->
/// frames -> lossless video.
pub fn encode_file(
    input_path: &Path,
    output_path: &Path,
    password: Option<&str>,
    cfg: &RvsConfig,
) -> Result<()> {
    cfg.validate()?;

    let data = fs::read(input_path).map_err(|e| {
        RvsError::InvalidInput(format!("cannot read {}: {e}", input_path.display()))
    })?;
    let name = input_path
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut writer = FfmpegFrameWriter::create(output_path, cfg)?;
    encode_stream(&data, &name, password, cfg, &mut writer)
}

/// Adapter-agnostic encode: everything above the frame transport.
pub fn encode_stream(
    data: &[u8],
    name: &str,
    password: Option<&str>,
    cfg: &RvsConfig,
    writer: &mut dyn FrameWriter,
) -> Result<()> {
    cfg.validate()?;
    if data.is_empty() {
        return Err(RvsError::InvalidInput("input is empty".into()));
    }
    if name.len() > config::MAX_NAME_LEN {
        return Err(RvsError::InvalidInput("file name too long".into()));
    }

    let mut flags = 0u8;
    let payload = if let Some(pw) = password {
        flags |= config::FLAG_ENCRYPTED;
        crypto::seal(data, pw)?
    } else {
        data.to_vec()
    };

    let chunk_size = cfg.chunk_size as usize;
    let chunks = chunker::split(&payload, chunk_size);
    let num_chunks = chunks.len();

    let layout = FrameLayout::new(
        cfg.frame_width,
        cfg.frame_height,
        config::packet_size(num_chunks, chunk_size),
    )?;

    let record = MetadataRecord {
        flags,
        num_chunks: num_chunks as u32,
        chunk_size: cfg.chunk_size,
        file_size: payload.len() as u64,
        name: name.to_string(),
    };
    let preamble = record.serialize();
    if preamble.len() > layout.capacity() {
        return Err(RvsError::InvalidInput("file name too long for one frame".into()));
    }

    let stream_seed = cfg
        .stream_seed
        .unwrap_or_else(|| rand::thread_rng().gen());

    info!(
        "encoding {} bytes as {} chunks of {} (redundancy {:.0}%)",
        payload.len(),
        num_chunks,
        chunk_size,
        cfg.redundancy * 100.0
    );

    let packets = fountain::encode(&chunks, cfg.redundancy, stream_seed);

    let progress = ProgressBar::new(packets.len() as u64);
    progress.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta})")
            .unwrap()
            .progress_chars("##-"),
    );

    let mut frame = Vec::new();
    let mut wire = Vec::new();

    layout.pack_into(&preamble, &mut frame);
    writer.write_frame(&frame)?;

    for packet in &packets {
        packet.serialize_into(&mut wire);
        layout.pack_into(&wire, &mut frame);
        writer.write_frame(&frame)?;
        progress.inc(1);
    }
    progress.finish_and_clear();

    writer.finish()?;
    info!(
        "encode complete: 1 metadata frame + {} data frames",
        packets.len()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::adapter::MemoryVideo;

    fn small_cfg() -> RvsConfig {
        RvsConfig {
            chunk_size: 256,
            redundancy: 0.5,
            frame_width: 48,
            frame_height: 32,
            fps: 30,
            stream_seed: Some(0),
        }
    }

    #[test]
    fn test_emits_metadata_frame_then_data_frames() {
        let mut video = MemoryVideo::new();
        let data = vec![0x42u8; 1000]; // 4 chunks -> 6 packets at r=0.5
        encode_stream(&data, "blob.bin", None, &small_cfg(), &mut video).unwrap();

        assert_eq!(video.frames.len(), 7);
        let capacity = 48 * 32 * 3;
        assert!(video.frames.iter().all(|f| f.len() == capacity));

        let record = MetadataRecord::parse(&video.frames[0]).unwrap();
        assert_eq!(record.num_chunks, 4);
        assert_eq!(record.chunk_size, 256);
        assert_eq!(record.file_size, 1000);
        assert_eq!(record.name, "blob.bin");
        assert!(!record.is_encrypted());
    }

    #[test]
    fn test_tiny_file_is_two_data_frames() {
        // N = 1 source chunk, redundancy 0.3 -> M = 2 packets.
        let cfg = RvsConfig {
            chunk_size: 4096,
            redundancy: 0.3,
            frame_width: 48,
            frame_height: 32,
            fps: 30,
            stream_seed: Some(0),
        };
        let mut video = MemoryVideo::new();
        encode_stream(b"hello world", "hello.txt", None, &cfg, &mut video).unwrap();
        assert_eq!(video.frames.len(), 3);

        let record = MetadataRecord::parse(&video.frames[0]).unwrap();
        assert_eq!(record.num_chunks, 1);
        assert_eq!(record.file_size, 11);
    }

    #[test]
    fn test_empty_input_rejected() {
        let mut video = MemoryVideo::new();
        let result = encode_stream(&[], "x", None, &small_cfg(), &mut video);
        assert!(matches!(result, Err(RvsError::InvalidInput(_))));
        assert!(video.frames.is_empty());
    }

    #[test]
    fn test_packet_too_big_for_frame_rejected() {
        let mut cfg = small_cfg();
        cfg.chunk_size = 1 << 20;
        let mut video = MemoryVideo::new();
        let result = encode_stream(&[1, 2, 3], "x", None, &cfg, &mut video);
        assert!(matches!(result, Err(RvsError::InvalidInput(_))));
    }

    #[test]
    fn test_encrypted_metadata_describes_envelope() {
        let mut video = MemoryVideo::new();
        let data = vec![7u8; 500];
        encode_stream(&data, "s.bin", Some("pw"), &small_cfg(), &mut video).unwrap();

        let record = MetadataRecord::parse(&video.frames[0]).unwrap();
        assert!(record.is_encrypted());
        // file_size covers the whole envelope, not the plaintext.
        assert_eq!(
            record.file_size,
            (500 + config::ENVELOPE_OVERHEAD) as u64
        );
    }

    #[test]
    fn test_fixed_stream_seed_is_reproducible() {
        let data: Vec<u8> = (0..3000u32).map(|i| (i % 253) as u8).collect();
        let mut a = MemoryVideo::new();
        let mut b = MemoryVideo::new();
        encode_stream(&data, "d", None, &small_cfg(), &mut a).unwrap();
        encode_stream(&data, "d", None, &small_cfg(), &mut b).unwrap();
        assert_eq!(a.frames, b.frames);
    }
}
