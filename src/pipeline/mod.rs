pub mod decode;
pub mod encode;
pub mod hook;

use std::fs;
use std::path::Path;

use anyhow::Result;
use rand::Rng;

use crate::config::RvsConfig;
use crate::integrity;
use hook::{EncodedVideo, PipelineHook};

/// Outcome of an encode → transport → decode trip.
pub struct RoundtripReport {
    /// Stream seed the fountain encoder ran with. Feeding it back via
    /// [`RvsConfig::stream_seed`] reproduces the exact same video, which
    /// is how a failed trip gets replayed.
    pub stream_seed: u32,
    pub original_sha256: String,
    pub recovered_sha256: String,
}

impl RoundtripReport {
    /// `true` when the recovered file is byte-identical to the input.
    pub fn lossless(&self) -> bool {
        self.original_sha256 == self.recovered_sha256
    }
}

/// Encode `input` to `encoded_path`, hand the video to `hook` for its
/// trip through the platform, decode whatever comes back into `output`,
/// and compare digests.
pub fn roundtrip<H: PipelineHook>(
    input: &Path,
    encoded_path: &Path,
    output: &Path,
    password: Option<&str>,
    cfg: &RvsConfig,
    hook: &H,
) -> Result<RoundtripReport> {
    let original_sha256 = integrity::sha256_hex(&fs::read(input)?);

    // Pin the stream seed before encoding so the report can name it.
    let mut cfg = cfg.clone();
    let stream_seed = cfg
        .stream_seed
        .unwrap_or_else(|| rand::thread_rng().gen());
    cfg.stream_seed = Some(stream_seed);

    encode::encode_file(input, encoded_path, password, &cfg)?;

    let video = EncodedVideo {
        path: encoded_path.to_path_buf(),
        title: input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "untitled".into()),
        encrypted: password.is_some(),
        config: cfg,
    };
    let decode_from = hook.transport(&video)?;

    decode::decode_file(&decode_from, output, password)?;

    let recovered_sha256 = integrity::sha256_hex(&fs::read(output)?);

    Ok(RoundtripReport {
        stream_seed,
        original_sha256,
        recovered_sha256,
    })
}
