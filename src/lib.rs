//! zfq losslessly recompresses FastQ files into a smaller, self-verifying container.
//!
//! A FastQ stream is split into three channels (headers, sequences and qualities), each channel
//! is compressed on its own, and the results are packed into a `.zfq` container together with
//! an [`Info`] record: record count, nucleotide count, MD5 of the original bytes and the
//! original modification time.
//!
//! Every compression decompresses its own output and compares checksums before it reports
//! success, and every decompression is checked against the stored MD5.
//!
//! ```no_run
//! use std::path::Path;
//! use zfq::{Config, Pipeline};
//!
//! let pipeline = Pipeline::new(Config { workers: 3, ..Config::default() })?;
//! let info = pipeline.compress(Path::new("reads.fastq.gz"), Path::new("reads.zfq"), false)?;
//! println!("{} records, {} nt", info.seq, info.nt);
//!
//! pipeline.decompress(Path::new("reads.zfq"), Path::new("copy.fastq"), false)?;
//! # Ok::<(), zfq::Error>(())
//! ```

#[macro_use]
extern crate log;

pub mod channels;
pub mod codec;
pub mod container;
pub mod error;
pub mod gzip;
pub mod info;
pub mod pipeline;
pub mod record;

use std::path::Path;

pub use channels::{Channel, Channels, Tally};
pub use codec::{Codec, CodecKind};
pub use container::Container;
pub use error::{Error, Result};
pub use info::Info;
pub use pipeline::{Config, Pipeline, Stage};
pub use record::{FastqReader, Record};

/// Compresses `input` into the container `output` using `workers` threads.
pub fn compress(input: &Path, output: &Path, workers: usize) -> Result<Info> {
    let pipeline = Pipeline::new(Config {
        workers,
        ..Config::default()
    })?;
    pipeline.compress(input, output, false)
}

/// Restores the FastQ file held in the container `input` to `output`, optionally deleting the
/// container once the output has been verified.
pub fn decompress(input: &Path, output: &Path, remove_input: bool) -> Result<Info> {
    Pipeline::new(Config::default())?.decompress(input, output, remove_input)
}

/// Reads the [`Info`] record of a container without decoding its channels.
pub fn info(input: &Path) -> Result<Info> {
    pipeline::read_info(input)
}
