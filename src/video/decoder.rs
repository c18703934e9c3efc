use std::io::{self, Read};
use std::path::Path;
use std::process::{Child, ChildStdout, Command, Stdio};

use log::debug;

use crate::config;
use crate::error::{Result, RvsError};
use crate::video::adapter::FrameReader;

/// Ask ffprobe for the video stream's frame geometry. The preamble
/// cannot be read until the frame size is known, so this runs first.
pub fn probe_dimensions(path: &Path) -> Result<(u32, u32)> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "stream=width,height",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .map_err(|e| {
            RvsError::Io(io::Error::new(
                e.kind(),
                format!("failed to spawn ffprobe (is it installed?): {e}"),
            ))
        })?;

    if !output.status.success() {
        return Err(RvsError::InvalidVideo(format!(
            "ffprobe failed on {}",
            path.display()
        )));
    }

    let text = String::from_utf8_lossy(&output.stdout);
    let mut fields = text.trim().trim_end_matches(',').split(',');
    let parse = |field: Option<&str>| -> Option<u32> { field?.trim().parse().ok() };
    match (parse(fields.next()), parse(fields.next())) {
        (Some(w), Some(h)) if w > 0 && h > 0 => {
            debug!("probed {}: {}x{}", path.display(), w, h);
            Ok((w, h))
        }
        _ => Err(RvsError::InvalidVideo(format!(
            "no video stream geometry in {}",
            path.display()
        ))),
    }
}

/// Frame source backed by an `ffmpeg` subprocess decoding the container
/// back to raw rgb24 on stdout.
pub struct FfmpegFrameReader {
    child: Child,
    stdout: ChildStdout,
    frame_size: usize,
    frames_read: u64,
    done: bool,
}

impl FfmpegFrameReader {
    pub fn open(path: &Path, width: u32, height: u32) -> Result<Self> {
        let mut child = Command::new("ffmpeg")
            .arg("-i")
            .arg(path)
            .args([
                "-f",
                "rawvideo",
                "-pixel_format",
                "rgb24",
                "pipe:1",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                RvsError::Io(io::Error::new(
                    e.kind(),
                    format!("failed to spawn ffmpeg (is it installed?): {e}"),
                ))
            })?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| RvsError::Io(io::Error::other("ffmpeg stdout unavailable")))?;

        Ok(Self {
            child,
            stdout,
            frame_size: config::frame_capacity(width, height),
            frames_read: 0,
            done: false,
        })
    }

    pub fn frames_read(&self) -> u64 {
        self.frames_read
    }
}

impl FrameReader for FfmpegFrameReader {
    fn read_frame(&mut self) -> Result<Option<Vec<u8>>> {
        if self.done {
            return Ok(None);
        }

        let mut frame = vec![0u8; self.frame_size];
        let mut filled = 0;
        while filled < frame.len() {
            match self.stdout.read(&mut frame[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(ref e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == self.frame_size {
            self.frames_read += 1;
            return Ok(Some(frame));
        }

        // End of the pixel stream: reap ffmpeg and make sure the stream
        // ended on a frame boundary.
        self.done = true;
        let status = self.child.wait()?;
        if !status.success() {
            return Err(RvsError::InvalidVideo(format!(
                "ffmpeg decode exited with status {status}"
            )));
        }
        if filled != 0 {
            return Err(RvsError::InvalidVideo(format!(
                "container ends mid-frame: {filled} of {} bytes",
                self.frame_size
            )));
        }
        debug!("stream exhausted after {} frames", self.frames_read);
        Ok(None)
    }
}

impl Drop for FfmpegFrameReader {
    fn drop(&mut self) {
        if !self.done {
            self.child.kill().ok();
            self.child.wait().ok();
        }
    }
}
