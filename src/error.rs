use std::collections::BTreeSet;

use thiserror::Error;

/// Every failure the codec can surface. All six kinds are fatal to the
/// current call; nothing is retried or swallowed inside the library.
#[derive(Error, Debug)]
pub enum RvsError {
    /// Unreadable or empty input, or options out of range.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The container does not carry a decodable stream: bad magic, header
    /// CRC mismatch, unsupported version, or geometry too small for the
    /// packets the preamble describes.
    #[error("invalid video: {0}")]
    InvalidVideo(String),

    /// The fountain decode stalled below full rank after the whole stream
    /// was consumed.
    #[error("incomplete recovery: {} of the source chunks missing", missing.len())]
    IncompleteRecovery { missing: BTreeSet<u32> },

    /// A solved chunk contradicts the received packet set.
    #[error("integrity failure: {0}")]
    IntegrityFailure(String),

    /// AEAD tag mismatch, or the stream is encrypted and no password was
    /// supplied.
    #[error("authentication failure: {0}")]
    AuthFailure(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, RvsError>;
