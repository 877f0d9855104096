//! gzip handling for the outer FastQ file.
//!
//! Only the file as seen by the user is ever gzipped. Checksums and channels always refer to the
//! plain FastQ bytes.

use flate2::read::MultiGzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Whether the file at `path` starts with the gzip magic bytes.
pub fn is_gzip(path: &Path) -> io::Result<bool> {
    let mut magic = [0u8; 2];
    let mut file = File::open(path)?;
    let mut read = 0;
    while read < magic.len() {
        match file.read(&mut magic[read..])? {
            0 => return Ok(false),
            n => read += n,
        }
    }
    Ok(magic == GZIP_MAGIC)
}

/// Whether output written to `path` should be gzipped, judged by a `.gz` extension.
pub fn wants_gzip(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("gz"))
}

/// Decompresses the gzip file at `path` into a scratch file created in `scratch_dir`.
///
/// The scratch file is deleted when the returned handle is dropped.
pub fn unwrap_to_scratch(path: &Path, scratch_dir: &Path) -> io::Result<NamedTempFile> {
    let mut scratch = tempfile::Builder::new()
        .prefix(".zfq-input-")
        .suffix(".fastq")
        .tempfile_in(scratch_dir)?;

    let mut decoder = MultiGzDecoder::new(BufReader::new(File::open(path)?));
    {
        let mut writer = BufWriter::new(scratch.as_file_mut());
        io::copy(&mut decoder, &mut writer)?;
        writer.flush()?;
    }
    Ok(scratch)
}

/// Wraps `writer` in a gzip encoder at the best compression level.
pub fn encoder<W: Write>(writer: W) -> GzEncoder<W> {
    GzEncoder::new(writer, Compression::best())
}
