use std::path::PathBuf;

use anyhow::Result;

use crate::config::RvsConfig;

/// Everything a platform collaborator needs to ship an encoded video on
/// its trip through VK or RuTube.
#[derive(Debug, Clone)]
pub struct EncodedVideo {
    /// Local path of the freshly committed `.mkv`.
    pub path: PathBuf,
    /// Upload title, suggested from the input file name.
    pub title: String,
    /// Whether a password will be needed at decode time.
    pub encrypted: bool,
    /// Geometry and rate the platform copy has to preserve. A host that
    /// re-encodes to different dimensions breaks the stream outright;
    /// frame loss within the same geometry is absorbed, up to the
    /// fountain redundancy budget.
    pub config: RvsConfig,
}

/// Transport leg between encode and decode in a
/// [`roundtrip`](super::roundtrip).
///
/// Implementations upload [`EncodedVideo::path`] to a platform, pull it
/// back down, and say where the downloaded copy landed. The codec never
/// touches the network itself.
///
/// # Example
///
/// ```rust
/// use std::path::PathBuf;
/// use anyhow::Result;
/// use rvs::{EncodedVideo, PipelineHook};
///
/// struct RutubeHook;
///
/// impl PipelineHook for RutubeHook {
///     fn transport(&self, video: &EncodedVideo) -> Result<PathBuf> {
///         // upload video.path under video.title, download it back ...
///         Ok(video.path.clone()) // placeholder
///     }
/// }
/// ```
pub trait PipelineHook {
    /// Ship the video through the platform and return the local path of
    /// the copy the decoder should read.
    fn transport(&self, video: &EncodedVideo) -> Result<PathBuf>;
}

/// Skips the platform entirely: decode reads the file encode just wrote.
pub struct NoopHook;

impl PipelineHook for NoopHook {
    fn transport(&self, video: &EncodedVideo) -> Result<PathBuf> {
        Ok(video.path.clone())
    }
}
