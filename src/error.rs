use crate::channels::Channel;
use std::fmt;

/// Result type used throughout the library, wrapping [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Which way a codec was being driven when it failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encode,
    Decode,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Direction::Encode => write!(f, "encoding"),
            Direction::Decode => write!(f, "decoding"),
        }
    }
}

/// Every failure that can end a compress, decompress or info call.
///
/// None of these are retried. Each carries enough context (line, channel,
/// digests) to diagnose the failure without running the operation again.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The input is not a well formed 4-line FastQ stream.
    #[error("Malformed FastQ record at line {line}: {reason}")]
    MalformedRecord { line: u64, reason: String },

    /// The three channels disagree on record count or record boundaries.
    #[error("Channels out of sync in the {channel} channel: {reason}")]
    ChannelDesync { channel: Channel, reason: String },

    /// The backend compressor rejected a channel.
    #[error("Codec failure while {direction} the {channel} channel: {source}")]
    CodecFailure {
        channel: Channel,
        direction: Direction,
        #[source]
        source: std::io::Error,
    },

    /// A freshly written container did not decompress to the original bytes.
    #[error("Round-trip verification failed: original md5 {expected}, decompressed md5 {actual}")]
    RoundTripVerificationFailed { expected: String, actual: String },

    /// Decompressed output does not match the checksum recorded in the container.
    #[error("Checksum mismatch: container records md5 {expected}, decompressed md5 {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    /// The decoded records disagree with the counts recorded in the container.
    #[error(
        "Count mismatch: container records {expected_seq} records ({expected_nt} nt), \
         decoded {seq} records ({nt} nt)"
    )]
    CountMismatch {
        expected_seq: u64,
        expected_nt: u64,
        seq: u64,
        nt: u64,
    },

    /// The file is not a container, or its layout is damaged.
    #[error("Invalid container: {0}")]
    InvalidContainer(String),

    #[error("Unable to (de)serialize info: {0}")]
    Info(#[from] serde_json::Error),

    #[error("Unable to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    #[error("Error with IO: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for building a [`Error::MalformedRecord`].
    pub fn malformed(line: u64, reason: impl Into<String>) -> Self {
        Error::MalformedRecord {
            line,
            reason: reason.into(),
        }
    }

    /// Shorthand for building a [`Error::ChannelDesync`].
    pub fn desync(channel: Channel, reason: impl Into<String>) -> Self {
        Error::ChannelDesync {
            channel,
            reason: reason.into(),
        }
    }

    /// True for the errors that mean a container cannot be trusted: its
    /// channels failed to decode, disagree with each other, or produce
    /// bytes that do not match the recorded checksum.
    #[must_use]
    pub fn is_integrity_failure(&self) -> bool {
        matches!(
            self,
            Error::ChannelDesync { .. }
                | Error::CodecFailure { .. }
                | Error::RoundTripVerificationFailed { .. }
                | Error::ChecksumMismatch { .. }
                | Error::CountMismatch { .. }
                | Error::InvalidContainer(_)
        )
    }
}
