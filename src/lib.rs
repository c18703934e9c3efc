mod chunker;
pub mod config;
mod crypto;
pub mod error;
mod fountain;
mod integrity;
mod metadata;
mod packet;
pub mod pipeline;
pub mod video;

pub use config::RvsConfig;
pub use error::{Result, RvsError};
pub use pipeline::decode::{decode_file, decode_stream};
pub use pipeline::encode::{encode_file, encode_stream};
pub use pipeline::hook::{EncodedVideo, NoopHook, PipelineHook};
pub use pipeline::{roundtrip, RoundtripReport};
pub use video::adapter::{FrameReader, FrameWriter, MemoryVideo};
