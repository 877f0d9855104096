use crate::error::{Error, Result};
use std::io::{BufRead, Write};

/// First byte of every header line.
pub const RECORD_MARKER: u8 = b'@';

/// First byte of every separator line. The rest of the separator line is not
/// kept, a bare `+` is written back on output.
pub const SEPARATOR_MARKER: u8 = b'+';

/// A single FastQ record.
///
/// # Fields
///
/// * `header` - The header line, starting with `@`, without its newline
/// * `sequence` - The sequence line, without its newline
/// * `quality` - The quality line, without its newline
/// * `terminated` - Whether the quality line ended with a newline. Only the final record of a
///   stream can be unterminated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub header: Vec<u8>,
    pub sequence: Vec<u8>,
    pub quality: Vec<u8>,
    pub terminated: bool,
}

impl Record {
    pub fn new(header: &[u8], sequence: &[u8], quality: &[u8]) -> Self {
        Record {
            header: header.to_vec(),
            sequence: sequence.to_vec(),
            quality: quality.to_vec(),
            terminated: true,
        }
    }

    /// Number of nucleotides in the record.
    pub fn len(&self) -> usize {
        self.sequence.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequence.is_empty()
    }

    /// Writes the record as four FastQ lines, regenerating the separator.
    pub fn write_to(&self, writer: &mut impl Write) -> std::io::Result<()> {
        write_fastq(
            writer,
            &self.header,
            &self.sequence,
            &self.quality,
            self.terminated,
        )
    }
}

/// Writes one FastQ record. The quality line only gets a newline when `terminated` is set, so a
/// file that did not end in a newline is reproduced as such.
pub fn write_fastq<W: Write + ?Sized>(
    writer: &mut W,
    header: &[u8],
    seq: &[u8],
    qual: &[u8],
    terminated: bool,
) -> std::io::Result<()> {
    writer.write_all(header)?;
    writer.write_all(b"\n")?;
    writer.write_all(seq)?;
    writer.write_all(b"\n")?;
    writer.write_all(&[SEPARATOR_MARKER, b'\n'])?;
    writer.write_all(qual)?;
    if terminated {
        writer.write_all(b"\n")?;
    }
    Ok(())
}

/// Parses a byte stream made of consecutive 4-line FastQ blocks.
///
/// The reader is strict: a stream that stops part way through a record, a header without `@`,
/// a separator without `+`, or a quality line whose length differs from its sequence line all
/// produce [`Error::MalformedRecord`].
pub struct FastqReader<R: BufRead> {
    reader: R,
    lines: u64,
    buf: Vec<u8>,
    finished: bool,
}

impl<R: BufRead> FastqReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            lines: 0,
            buf: Vec::new(),
            finished: false,
        }
    }

    /// Number of lines consumed so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Gives back the underlying reader.
    pub fn into_inner(self) -> R {
        self.reader
    }

    /// Reads the next line into `self.buf` with the newline trimmed.
    ///
    /// Returns `None` on EOF, otherwise whether the line was newline terminated.
    fn read_line(&mut self) -> Result<Option<bool>> {
        self.buf.clear();
        let n = self.reader.read_until(b'\n', &mut self.buf)?;
        if n == 0 {
            return Ok(None);
        }
        self.lines += 1;

        if self.buf.last() == Some(&b'\n') {
            self.buf.pop();
            Ok(Some(true))
        } else {
            Ok(Some(false))
        }
    }

    /// Reads a line that must exist and must be newline terminated, i.e. any line of a record
    /// other than the quality line.
    fn read_inner_line(&mut self, what: &str) -> Result<Vec<u8>> {
        match self.read_line()? {
            Some(true) => Ok(std::mem::take(&mut self.buf)),
            _ => Err(Error::malformed(
                self.lines + 1,
                format!("stream ends mid-record, expected a {what} line"),
            )),
        }
    }

    /// Reads the next record, returning `Ok(None)` once the stream is exhausted.
    pub fn next_record(&mut self) -> Result<Option<Record>> {
        if self.finished {
            return Ok(None);
        }

        // line 1: header
        let header = match self.read_line()? {
            None => {
                self.finished = true;
                return Ok(None);
            }
            Some(false) => {
                return Err(Error::malformed(
                    self.lines,
                    "stream ends mid-record after a header line",
                ))
            }
            Some(true) => std::mem::take(&mut self.buf),
        };
        if header.first() != Some(&RECORD_MARKER) {
            return Err(Error::malformed(self.lines, "header line does not start with '@'"));
        }

        // line 2: sequence
        let sequence = self.read_inner_line("sequence")?;

        // line 3: separator, only its marker is checked
        let separator = self.read_inner_line("separator")?;
        if separator.first() != Some(&SEPARATOR_MARKER) {
            return Err(Error::malformed(self.lines, "separator line does not start with '+'"));
        }

        // line 4: quality, may be the last line of the stream without a newline
        let terminated = match self.read_line()? {
            Some(terminated) => terminated,
            None => {
                return Err(Error::malformed(
                    self.lines + 1,
                    "stream ends mid-record, expected a quality line",
                ))
            }
        };
        let quality = std::mem::take(&mut self.buf);

        if quality.len() != sequence.len() {
            return Err(Error::malformed(
                self.lines,
                format!(
                    "quality length {} does not match sequence length {}",
                    quality.len(),
                    sequence.len()
                ),
            ));
        }

        if !terminated {
            self.finished = true;
        }

        Ok(Some(Record {
            header,
            sequence,
            quality,
            terminated,
        }))
    }
}

impl<R: BufRead> Iterator for FastqReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_record() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => None,
            Err(e) => {
                // a malformed stream is not resumable
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}
