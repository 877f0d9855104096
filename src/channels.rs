//! Splits records into three byte channels, and merges them back.
//!
//! * `headers` - every header line, newline included
//! * `sequences` - every sequence line, newline removed, no delimiter between records
//! * `qualities` - every quality line, newline included when the input had one
//!
//! Sequences carry no boundaries of their own. Since a sequence is always as long as its quality
//! line, the merger walks the qualities channel line by line and takes that many bytes from the
//! sequences channel for each record.

use crate::error::{Error, Result};
use crate::record::{write_fastq, Record};
use memchr::memchr;
use std::fmt;
use std::io::Write;

/// One of the three derived byte streams.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Channel {
    Headers,
    Sequences,
    Qualities,
}

impl Channel {
    /// The channels in the order they are stored in a container.
    pub const ALL: [Channel; 3] = [Channel::Headers, Channel::Sequences, Channel::Qualities];

    /// Name of the container entry that holds this channel.
    pub fn entry_name(&self) -> &'static str {
        match self {
            Channel::Headers => "headers",
            Channel::Sequences => "sequences",
            Channel::Qualities => "qualities",
        }
    }

    pub fn from_entry_name(name: &str) -> Option<Self> {
        Channel::ALL.into_iter().find(|c| c.entry_name() == name)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.entry_name())
    }
}

/// Record and nucleotide counts gathered while splitting or merging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Tally {
    pub records: u64,
    pub nucleotides: u64,
}

/// The three channel buffers. The same struct carries plain channels (after a split, before a
/// merge) and encoded channels (inside a container).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Channels {
    pub headers: Vec<u8>,
    pub sequences: Vec<u8>,
    pub qualities: Vec<u8>,
}

impl Channels {
    pub fn get(&self, channel: Channel) -> &[u8] {
        match channel {
            Channel::Headers => &self.headers,
            Channel::Sequences => &self.sequences,
            Channel::Qualities => &self.qualities,
        }
    }

    pub fn get_mut(&mut self, channel: Channel) -> &mut Vec<u8> {
        match channel {
            Channel::Headers => &mut self.headers,
            Channel::Sequences => &mut self.sequences,
            Channel::Qualities => &mut self.qualities,
        }
    }

    /// Hands out each buffer as an owned work item, in [`Channel::ALL`] order.
    pub fn into_parts(self) -> Vec<(Channel, Vec<u8>)> {
        vec![
            (Channel::Headers, self.headers),
            (Channel::Sequences, self.sequences),
            (Channel::Qualities, self.qualities),
        ]
    }

    /// Reassembles buffers produced by [`Channels::into_parts`], in any order.
    pub fn from_parts(parts: impl IntoIterator<Item = (Channel, Vec<u8>)>) -> Self {
        let mut channels = Channels::default();
        for (channel, bytes) in parts {
            *channels.get_mut(channel) = bytes;
        }
        channels
    }

    /// Total size of the three buffers, in bytes.
    pub fn total_len(&self) -> usize {
        self.headers.len() + self.sequences.len() + self.qualities.len()
    }
}

/// Accumulates records into [`Channels`].
#[derive(Default)]
pub struct Splitter {
    channels: Channels,
    tally: Tally,
    closed: bool,
}

impl Splitter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one record to the three channels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if a record follows one whose quality line had no
    /// newline, as that record can only be the last of a stream.
    pub fn push(&mut self, record: &Record) -> Result<()> {
        if self.closed {
            return Err(Error::malformed(
                self.tally.records * 4 + 1,
                "record follows an unterminated quality line",
            ));
        }

        self.channels.headers.extend_from_slice(&record.header);
        self.channels.headers.push(b'\n');

        self.channels.sequences.extend_from_slice(&record.sequence);

        self.channels.qualities.extend_from_slice(&record.quality);
        if record.terminated {
            self.channels.qualities.push(b'\n');
        } else {
            self.closed = true;
        }

        self.tally.records += 1;
        self.tally.nucleotides += record.sequence.len() as u64;
        Ok(())
    }

    pub fn tally(&self) -> Tally {
        self.tally
    }

    pub fn finish(self) -> (Channels, Tally) {
        (self.channels, self.tally)
    }
}

/// Splits a stream of records, stopping at the first error.
pub fn split<I>(records: I) -> Result<(Channels, Tally)>
where
    I: IntoIterator<Item = Result<Record>>,
{
    let mut splitter = Splitter::new();
    for record in records {
        splitter.push(&record?)?;
    }
    Ok(splitter.finish())
}

/// A record borrowed from the channel buffers during a merge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordRef<'a> {
    pub header: &'a [u8],
    pub sequence: &'a [u8],
    pub quality: &'a [u8],
    pub terminated: bool,
}

impl RecordRef<'_> {
    pub fn to_record(&self) -> Record {
        Record {
            header: self.header.to_vec(),
            sequence: self.sequence.to_vec(),
            quality: self.quality.to_vec(),
            terminated: self.terminated,
        }
    }

    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> std::io::Result<()> {
        write_fastq(
            writer,
            self.header,
            self.sequence,
            self.quality,
            self.terminated,
        )
    }
}

/// Walks the three channels in lockstep, driven by the qualities channel.
///
/// Yields [`Error::ChannelDesync`] (and then stops) when a channel runs out before the
/// qualities channel does, or still holds bytes once it is exhausted.
pub struct Merger<'a> {
    channels: &'a Channels,
    header_pos: usize,
    seq_pos: usize,
    qual_pos: usize,
    records: u64,
    done: bool,
}

impl<'a> Merger<'a> {
    pub fn new(channels: &'a Channels) -> Self {
        Self {
            channels,
            header_pos: 0,
            seq_pos: 0,
            qual_pos: 0,
            records: 0,
            done: false,
        }
    }

    fn next_record(&mut self) -> Result<Option<RecordRef<'a>>> {
        let channels = self.channels;

        if self.qual_pos == channels.qualities.len() {
            if self.header_pos != channels.headers.len() {
                return Err(Error::desync(
                    Channel::Headers,
                    format!(
                        "{} bytes left over after {} records",
                        channels.headers.len() - self.header_pos,
                        self.records
                    ),
                ));
            }
            if self.seq_pos != channels.sequences.len() {
                return Err(Error::desync(
                    Channel::Sequences,
                    format!(
                        "{} bytes left over after {} records",
                        channels.sequences.len() - self.seq_pos,
                        self.records
                    ),
                ));
            }
            return Ok(None);
        }

        // qualities drive the record boundaries
        let remaining = &channels.qualities[self.qual_pos..];
        let (quality, terminated) = match memchr(b'\n', remaining) {
            Some(i) => {
                self.qual_pos += i + 1;
                (&remaining[..i], true)
            }
            None => {
                self.qual_pos = channels.qualities.len();
                (remaining, false)
            }
        };

        let seq_end = self.seq_pos + quality.len();
        if seq_end > channels.sequences.len() {
            return Err(Error::desync(
                Channel::Sequences,
                format!(
                    "exhausted at record {}: needed {} bytes, {} remain",
                    self.records + 1,
                    quality.len(),
                    channels.sequences.len() - self.seq_pos
                ),
            ));
        }
        let sequence = &channels.sequences[self.seq_pos..seq_end];
        self.seq_pos = seq_end;

        let remaining = &channels.headers[self.header_pos..];
        let header = match memchr(b'\n', remaining) {
            Some(i) => {
                self.header_pos += i + 1;
                &remaining[..i]
            }
            None => {
                return Err(Error::desync(
                    Channel::Headers,
                    format!("exhausted at record {}", self.records + 1),
                ))
            }
        };

        self.records += 1;
        Ok(Some(RecordRef {
            header,
            sequence,
            quality,
            terminated,
        }))
    }
}

impl<'a> Iterator for Merger<'a> {
    type Item = Result<RecordRef<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Merges the channels back into owned records.
pub fn merge(channels: &Channels) -> Result<Vec<Record>> {
    Merger::new(channels)
        .map(|r| r.map(|r| r.to_record()))
        .collect()
}

/// Merges the channels and serializes the records as FastQ straight into `writer`.
pub fn merge_into<W: Write + ?Sized>(channels: &Channels, writer: &mut W) -> Result<Tally> {
    let mut tally = Tally::default();
    for record in Merger::new(channels) {
        let record = record?;
        record.write_to(writer)?;
        tally.records += 1;
        tally.nucleotides += record.sequence.len() as u64;
    }
    Ok(tally)
}
