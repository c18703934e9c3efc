use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use log::{debug, info};

use crate::config::RvsConfig;
use crate::error::{Result, RvsError};
use crate::video::adapter::FrameWriter;

/// Frame sink that drives an `ffmpeg` subprocess: raw rgb24 frames on
/// stdin, FFV1 level 3 with per-slice CRCs in a Matroska container on
/// the way out.
///
/// Frames are written to a sibling `.tmp` path; the real output path
/// only appears when [`FrameWriter::finish`] succeeds, so a failed or
/// aborted encode never leaves a partial video behind.
pub struct FfmpegFrameWriter {
    child: Child,
    temp_path: PathBuf,
    final_path: PathBuf,
    finished: bool,
}

impl FfmpegFrameWriter {
    pub fn create(path: &Path, cfg: &RvsConfig) -> Result<Self> {
        let mut temp = OsString::from(path.as_os_str());
        temp.push(".tmp");
        let temp_path = PathBuf::from(temp);

        debug!(
            "spawning ffmpeg: {}x{} @ {} fps -> {}",
            cfg.frame_width,
            cfg.frame_height,
            cfg.fps,
            temp_path.display()
        );

        let child = Command::new("ffmpeg")
            .args([
                "-y",
                "-f",
                "rawvideo",
                "-pixel_format",
                "rgb24",
                "-video_size",
                &format!("{}x{}", cfg.frame_width, cfg.frame_height),
                "-framerate",
                &cfg.fps.to_string(),
                "-i",
                "pipe:0",
                "-c:v",
                "ffv1",
                "-level",
                "3",
                "-slices",
                "4",
                "-slicecrc",
                "1",
                "-f",
                "matroska",
            ])
            .arg(&temp_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| {
                RvsError::Io(io::Error::new(
                    e.kind(),
                    format!("failed to spawn ffmpeg (is it installed?): {e}"),
                ))
            })?;

        Ok(Self {
            child,
            temp_path,
            final_path: path.to_path_buf(),
            finished: false,
        })
    }
}

impl FrameWriter for FfmpegFrameWriter {
    fn write_frame(&mut self, rgb: &[u8]) -> Result<()> {
        let stdin = self
            .child
            .stdin
            .as_mut()
            .ok_or_else(|| RvsError::Io(io::Error::other("ffmpeg stdin already closed")))?;
        stdin.write_all(rgb)?;
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        drop(self.child.stdin.take());
        let status = self.child.wait()?;
        self.finished = true;

        if !status.success() {
            std::fs::remove_file(&self.temp_path).ok();
            return Err(RvsError::Io(io::Error::other(format!(
                "ffmpeg exited with status {status}"
            ))));
        }

        std::fs::rename(&self.temp_path, &self.final_path)?;
        info!("video committed to {}", self.final_path.display());
        Ok(())
    }
}

impl Drop for FfmpegFrameWriter {
    fn drop(&mut self) {
        if !self.finished {
            self.child.kill().ok();
            self.child.wait().ok();
            std::fs::remove_file(&self.temp_path).ok();
        }
    }
}
