use std::ffi::OsString;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use indicatif::ProgressBar;
use log::{debug, info};

use crate::chunker;
use crate::config;
use crate::crypto;
use crate::error::{Result, RvsError};
use crate::fountain::FountainDecoder;
use crate::metadata::MetadataRecord;
use crate::packet;
use crate::video::adapter::FrameReader;
use crate::video::decoder::{probe_dimensions, FfmpegFrameReader};

/// Full decode pipeline: video -> frames -> fountain decode -> [open] ->
/// original file. Geometry comes from the container, everything else
/// from the metadata preamble.
pub fn decode_file(input_path: &Path, output_path: &Path, password: Option<&str>) -> Result<()> {
    let (width, height) = probe_dimensions(input_path)?;
    let mut reader = FfmpegFrameReader::open(input_path, width, height)?;

    let (record, bytes) = decode_stream(&mut reader, password)?;
    info!(
        "recovered \"{}\": {} bytes from {} frames",
        record.name,
        bytes.len(),
        reader.frames_read()
    );

    write_atomically(output_path, &bytes)
}

/// Adapter-agnostic decode: everything above the frame transport.
/// Returns the parsed preamble along with the recovered bytes.
pub fn decode_stream(
    reader: &mut dyn FrameReader,
    password: Option<&str>,
) -> Result<(MetadataRecord, Vec<u8>)> {
    // Locate the metadata preamble within the first few frames.
    let mut record = None;
    let mut frame_capacity = 0usize;
    for attempt in 0..config::METADATA_SCAN_FRAMES {
        let Some(frame) = reader.read_frame()? else {
            break;
        };
        frame_capacity = frame.len();
        match MetadataRecord::parse(&frame) {
            Ok(r) => {
                record = Some(r);
                break;
            }
            Err(e) => debug!("frame {attempt} holds no metadata: {e}"),
        }
    }
    let record = record.ok_or_else(|| {
        RvsError::InvalidVideo(format!(
            "no metadata preamble in the first {} frames",
            config::METADATA_SCAN_FRAMES
        ))
    })?;

    let num_chunks = record.num_chunks as usize;
    let chunk_size = record.chunk_size as usize;
    if config::packet_size(num_chunks, chunk_size) > frame_capacity {
        return Err(RvsError::InvalidVideo(format!(
            "frame capacity {} cannot hold packets for {} chunks of {}",
            frame_capacity, num_chunks, chunk_size
        )));
    }
    if record.is_encrypted() && password.is_none() {
        return Err(RvsError::AuthFailure(
            "stream is encrypted and no password was given".into(),
        ));
    }

    info!(
        "decoding \"{}\": {} chunks of {} bytes, {} bytes total",
        record.name, num_chunks, chunk_size, record.file_size
    );

    let mut decoder = FountainDecoder::new(num_chunks, chunk_size);
    let progress = ProgressBar::new_spinner();

    while let Some(frame) = reader.read_frame()? {
        progress.inc(1);
        match packet::deserialize(&frame, num_chunks, chunk_size) {
            Ok(pkt) => {
                if decoder.absorb(pkt)? {
                    break;
                }
            }
            Err(e) => debug!("skipping damaged frame: {e}"),
        }
    }
    progress.finish_and_clear();

    debug!(
        "fountain decode consumed {} packets for {} chunks",
        decoder.packets_absorbed(),
        num_chunks
    );

    let chunks = decoder.into_chunks()?;
    let payload = chunker::reassemble(&chunks, record.file_size);

    let bytes = if record.is_encrypted() {
        let pw = password.ok_or_else(|| {
            RvsError::AuthFailure("stream is encrypted and no password was given".into())
        })?;
        crypto::open(&payload, pw)?
    } else {
        payload
    };

    Ok((record, bytes))
}

/// Write via a sibling temp path and rename, so an interrupted decode
/// never leaves a partial output file.
fn write_atomically(path: &Path, bytes: &[u8]) -> Result<()> {
    let mut temp = OsString::from(path.as_os_str());
    temp.push(".tmp");
    let temp_path = PathBuf::from(temp);

    let write = (|| -> std::io::Result<()> {
        let mut file = fs::File::create(&temp_path)?;
        file.write_all(bytes)?;
        file.flush()?;
        Ok(())
    })();
    if let Err(e) = write {
        fs::remove_file(&temp_path).ok();
        return Err(e.into());
    }

    fs::rename(&temp_path, path)?;
    Ok(())
}
