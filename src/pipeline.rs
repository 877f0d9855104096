use crate::channels::{self, Channels, Tally};
use crate::codec::CodecKind;
use crate::container::{Container, ContainerReader};
use crate::error::{Error, Result};
use crate::gzip;
use crate::info::{self, Info, Md5Reader, Md5Writer};
use crate::record::FastqReader;

use rayon::prelude::*;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Settings for a [`Pipeline`]. Nothing is read from global state.
///
/// # Fields
///
/// * `workers` - Size of the worker pool used for the per-channel codecs
/// * `temp_dir` - Where gzip input is unwrapped before splitting. Defaults to the directory of
///   the output file.
/// * `codec` - Backend used to compress the channels
#[derive(Debug, Clone)]
pub struct Config {
    pub workers: usize,
    pub temp_dir: Option<PathBuf>,
    pub codec: CodecKind,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            workers: 1,
            temp_dir: None,
            codec: CodecKind::default(),
        }
    }
}

/// Where an operation is, or where it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Idle,
    // compression
    Splitting,
    Encoding,
    Packaging,
    SelfVerifying,
    // decompression
    Unpacking,
    Decoding,
    Merging,
    Verifying,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Stage::Idle => "idle",
            Stage::Splitting => "splitting",
            Stage::Encoding => "encoding",
            Stage::Packaging => "packaging",
            Stage::SelfVerifying => "self-verifying",
            Stage::Unpacking => "unpacking",
            Stage::Decoding => "decoding",
            Stage::Merging => "merging",
            Stage::Verifying => "verifying",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        write!(f, "{name}")
    }
}

/// Follows one operation through its stages and reports where it failed.
struct Tracker {
    operation: &'static str,
    stage: Stage,
}

impl Tracker {
    fn new(operation: &'static str) -> Self {
        Tracker {
            operation,
            stage: Stage::Idle,
        }
    }

    fn enter(&mut self, stage: Stage) {
        debug!("{}: {} -> {}", self.operation, self.stage, stage);
        self.stage = stage;
    }

    fn conclude<T>(mut self, result: Result<T>) -> Result<T> {
        match &result {
            Ok(_) => self.enter(Stage::Done),
            Err(_) => {
                error!("{} failed during the {} stage", self.operation, self.stage);
                self.stage = Stage::Failed;
            }
        }
        result
    }
}

/// Directory that holds `path`, `.` for bare file names.
fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// Scratch file next to `target`, so that persisting it onto `target` is a rename.
fn scratch_next_to(target: &Path) -> io::Result<NamedTempFile> {
    tempfile::Builder::new()
        .prefix(".zfq-")
        .suffix(".tmp")
        .tempfile_in(parent_dir(target))
}

/// Fails unless `tally` matches the record and nucleotide counts held in `info`.
fn check_tally(info: &Info, tally: &Tally) -> Result<()> {
    if tally.records != info.seq || tally.nucleotides != info.nt {
        return Err(Error::CountMismatch {
            expected_seq: info.seq,
            expected_nt: info.nt,
            seq: tally.records,
            nt: tally.nucleotides,
        });
    }
    Ok(())
}

/// Drives compression and decompression, verifying both.
///
/// Compression only succeeds once the written container has been decompressed again and found
/// to reproduce the original bytes. Decompression only succeeds once the output matches the
/// checksum stored in the container. Outputs are written to scratch files and moved onto the
/// requested path at the very end, so a failure never leaves an output behind.
pub struct Pipeline {
    config: Config,
    pool: rayon::ThreadPool,
}

impl Pipeline {
    pub fn new(config: Config) -> Result<Self> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(config.workers.max(1))
            .build()?;
        Ok(Pipeline { config, pool })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Compresses the FastQ file `input` (plain or gzipped) into a container at `output`.
    ///
    /// # Arguments
    ///
    /// * `input` - The FastQ file. gzip input is recognised by its content.
    /// * `output` - The container to create. It only appears once it has been verified.
    /// * `remove_input` - Delete `input` after a successful compression.
    ///
    /// # Errors
    ///
    /// * [`Error::MalformedRecord`] if `input` is not valid FastQ
    /// * [`Error::CodecFailure`] if a channel cannot be compressed
    /// * [`Error::RoundTripVerificationFailed`] if the container does not decompress to `input`
    pub fn compress(&self, input: &Path, output: &Path, remove_input: bool) -> Result<Info> {
        let mut tracker = Tracker::new("compress");
        let result = self.run_compress(input, output, remove_input, &mut tracker);
        tracker.conclude(result)
    }

    /// Decompresses the container `input` into a FastQ file at `output`, gzipped if `output` ends
    /// in `.gz`.
    ///
    /// # Errors
    ///
    /// * [`Error::InvalidContainer`] if `input` is not a container
    /// * [`Error::CodecFailure`] or [`Error::ChannelDesync`] if the channels are damaged
    /// * [`Error::ChecksumMismatch`] if the output differs from what was compressed
    pub fn decompress(&self, input: &Path, output: &Path, remove_input: bool) -> Result<Info> {
        let mut tracker = Tracker::new("decompress");
        let result = self.run_decompress(input, output, remove_input, &mut tracker);
        tracker.conclude(result)
    }

    fn run_compress(
        &self,
        input: &Path,
        output: &Path,
        remove_input: bool,
        tracker: &mut Tracker,
    ) -> Result<Info> {
        tracker.enter(Stage::Splitting);
        let mtime = info::file_mtime(input)?;
        let (channels, info) = self.split_input(input, output, mtime)?;
        info!(
            "Read {} records ({} nt) from {}",
            info.seq,
            info.nt,
            input.display()
        );

        tracker.enter(Stage::Encoding);
        let plain_len = channels.total_len();
        let encoded = self.encode_channels(channels)?;
        debug!("Channels encoded: {} -> {} bytes", plain_len, encoded.total_len());

        tracker.enter(Stage::Packaging);
        let mut packed = scratch_next_to(output)?;
        let container = Container::new(self.config.codec, info, encoded);
        container.write_to(&mut BufWriter::new(packed.as_file_mut()))?;
        let Container { info, .. } = container;

        tracker.enter(Stage::SelfVerifying);
        self.verify_container(packed.path(), &info)?;

        packed.as_file().set_modified(info.modified()?)?;
        packed.persist(output).map_err(|e| e.error)?;
        info!("Wrote {} (md5 {} verified)", output.display(), info.md5);

        if remove_input {
            fs::remove_file(input)?;
            info!("Removed {}", input.display());
        }
        Ok(info)
    }

    /// Parses `input` into channels, digesting the plain FastQ bytes along the way.
    fn split_input(&self, input: &Path, output: &Path, mtime: f64) -> Result<(Channels, Info)> {
        let scratch = if gzip::is_gzip(input)? {
            let dir = self
                .config
                .temp_dir
                .clone()
                .unwrap_or_else(|| parent_dir(output));
            debug!("Unwrapping gzip input into {}", dir.display());
            Some(gzip::unwrap_to_scratch(input, &dir)?)
        } else {
            None
        };
        let path = scratch.as_ref().map_or(input, |s| s.path());

        let file = File::open(path)?;
        let mut reader = FastqReader::new(BufReader::new(Md5Reader::new(file)));
        let (channels, tally) = channels::split(&mut reader)?;
        let md5 = reader.into_inner().into_inner().finalize();

        let info = Info {
            seq: tally.records,
            nt: tally.nucleotides,
            md5,
            mtime,
        };
        Ok((channels, info))
    }

    /// Runs `f` over each channel on the worker pool. Each task owns its buffer.
    fn map_channels<F>(&self, channels: Channels, f: F) -> Result<Channels>
    where
        F: Fn(channels::Channel, Vec<u8>) -> Result<Vec<u8>> + Send + Sync,
    {
        let parts = self.pool.install(|| {
            channels
                .into_parts()
                .into_par_iter()
                .map(|(channel, bytes)| f(channel, bytes).map(|out| (channel, out)))
                .collect::<Result<Vec<_>>>()
        })?;
        Ok(Channels::from_parts(parts))
    }

    fn encode_channels(&self, channels: Channels) -> Result<Channels> {
        let codec = self.config.codec;
        self.map_channels(channels, |channel, bytes| {
            let encoded = codec.encode(channel, &bytes)?;
            debug!("{channel}: {} -> {} bytes", bytes.len(), encoded.len());
            Ok(encoded)
        })
    }

    fn decode_channels(&self, codec: CodecKind, channels: Channels) -> Result<Channels> {
        self.map_channels(channels, |channel, bytes| codec.decode(channel, &bytes))
    }

    /// Decodes a whole container from `reader` and writes the FastQ it holds to `writer`.
    fn decode_into<R: Read, W: Write>(
        &self,
        reader: R,
        writer: &mut W,
        on_stage: &mut dyn FnMut(Stage),
    ) -> Result<(Info, Tally)> {
        let mut container = ContainerReader::new(reader)?;
        let info = container.read_info()?;
        let codec = container.header().codec;
        let encoded = container.read_channels()?;

        on_stage(Stage::Decoding);
        let channels = self.decode_channels(codec, encoded)?;

        on_stage(Stage::Merging);
        let tally = channels::merge_into(&channels, writer)?;
        writer.flush()?;
        Ok((info, tally))
    }

    /// Decompresses the container at `path` without keeping the output, and compares its digest
    /// with the one taken from the original input.
    fn verify_container(&self, path: &Path, expected: &Info) -> Result<()> {
        let file = File::open(path)?;
        let mut sink = Md5Writer::new(io::sink());
        let (_, tally) = self.decode_into(BufReader::new(file), &mut sink, &mut |_| {})?;
        let (actual, _) = sink.finalize();

        if actual != expected.md5 {
            return Err(Error::RoundTripVerificationFailed {
                expected: expected.md5.clone(),
                actual,
            });
        }
        check_tally(expected, &tally)?;
        debug!("Round trip reproduced {} records", tally.records);
        Ok(())
    }

    fn run_decompress(
        &self,
        input: &Path,
        output: &Path,
        remove_input: bool,
        tracker: &mut Tracker,
    ) -> Result<Info> {
        tracker.enter(Stage::Unpacking);
        let reader = BufReader::new(File::open(input)?);
        let mut scratch = scratch_next_to(output)?;

        let (info, tally, actual) = {
            let mut on_stage = |stage: Stage| tracker.enter(stage);
            let buffered = BufWriter::new(scratch.as_file_mut());
            if gzip::wants_gzip(output) {
                let mut writer = Md5Writer::new(gzip::encoder(buffered));
                let (info, tally) = self.decode_into(reader, &mut writer, &mut on_stage)?;
                let (actual, encoder) = writer.finalize();
                encoder.finish()?.flush()?;
                (info, tally, actual)
            } else {
                let mut writer = Md5Writer::new(buffered);
                let (info, tally) = self.decode_into(reader, &mut writer, &mut on_stage)?;
                let (actual, mut buffered) = writer.finalize();
                buffered.flush()?;
                (info, tally, actual)
            }
        };

        tracker.enter(Stage::Verifying);
        if actual != info.md5 {
            return Err(Error::ChecksumMismatch {
                expected: info.md5,
                actual,
            });
        }
        check_tally(&info, &tally)?;

        scratch.as_file().set_modified(info.modified()?)?;
        scratch.persist(output).map_err(|e| e.error)?;
        info!(
            "Wrote {} records ({} nt) to {}",
            tally.records,
            tally.nucleotides,
            output.display()
        );

        if remove_input {
            fs::remove_file(input)?;
            info!("Removed {}", input.display());
        }
        Ok(info)
    }
}

/// Reads the info record of the container at `path`. The channels are not read.
pub fn read_info(path: &Path) -> Result<Info> {
    let file = File::open(path)?;
    ContainerReader::new(BufReader::new(file))?.read_info()
}
