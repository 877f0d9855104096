//! Compression backends applied to each channel.
//!
//! The container and channel logic only ever see the [`Codec`] trait, so a backend is a pair of
//! `bytes -> bytes` functions. Which backend wrote a container is recorded in its header.

use crate::channels::Channel;
use crate::error::{Direction, Error, Result};
use std::io;
use zstd::stream::{copy_decode, copy_encode};

/// zstd level used for the sequences channel, which gains the most from a slower search.
pub const SEQUENCE_LEVEL: i32 = 18;

/// zstd level used for the headers and qualities channels.
pub const DEFAULT_LEVEL: i32 = 3;

/// A byte-to-byte compressor. Implementations hold no mutable state, so one instance can serve
/// several channels from several threads at once.
pub trait Codec: Send + Sync {
    fn encode(&self, bytes: &[u8]) -> io::Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> io::Result<Vec<u8>>;
}

/// zstd at a fixed compression level.
#[derive(Debug, Clone, Copy)]
pub struct Zstd {
    level: i32,
}

impl Zstd {
    pub fn new(level: i32) -> Self {
        Self { level }
    }

    pub fn level(&self) -> i32 {
        self.level
    }
}

impl Codec for Zstd {
    fn encode(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(bytes.len() / 4);
        copy_encode(bytes, &mut out, self.level)?;
        Ok(out)
    }

    fn decode(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        let mut out = Vec::with_capacity(bytes.len() * 4);
        copy_decode(bytes, &mut out)?;
        Ok(out)
    }
}

/// Identity backend: channels are stored as they are.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stored;

impl Codec for Stored {
    fn encode(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }

    fn decode(&self, bytes: &[u8]) -> io::Result<Vec<u8>> {
        Ok(bytes.to_vec())
    }
}

/// The backends a container can be written with.
#[derive(clap::ValueEnum, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CodecKind {
    /// zstd, level 18 for sequences and level 3 for headers and qualities
    #[default]
    Zstd,
    /// no compression, mostly useful for inspecting containers
    Stored,
}

impl CodecKind {
    pub fn id(&self) -> u8 {
        match self {
            CodecKind::Zstd => 0,
            CodecKind::Stored => 1,
        }
    }

    pub fn from_id(id: u8) -> Result<Self> {
        match id {
            0 => Ok(CodecKind::Zstd),
            1 => Ok(CodecKind::Stored),
            _ => Err(Error::InvalidContainer(format!("unknown codec id {id}"))),
        }
    }

    /// Builds the backend used for `channel`.
    pub fn codec_for(&self, channel: Channel) -> Box<dyn Codec> {
        match self {
            CodecKind::Zstd => match channel {
                Channel::Sequences => Box::new(Zstd::new(SEQUENCE_LEVEL)),
                Channel::Headers | Channel::Qualities => Box::new(Zstd::new(DEFAULT_LEVEL)),
            },
            CodecKind::Stored => Box::new(Stored),
        }
    }

    /// Encodes one channel, tagging any failure with the channel it came from.
    pub fn encode(&self, channel: Channel, bytes: &[u8]) -> Result<Vec<u8>> {
        self.codec_for(channel)
            .encode(bytes)
            .map_err(|source| Error::CodecFailure {
                channel,
                direction: Direction::Encode,
                source,
            })
    }

    /// Decodes one channel, tagging any failure with the channel it came from.
    pub fn decode(&self, channel: Channel, bytes: &[u8]) -> Result<Vec<u8>> {
        self.codec_for(channel)
            .decode(bytes)
            .map_err(|source| Error::CodecFailure {
                channel,
                direction: Direction::Decode,
                source,
            })
    }
}
