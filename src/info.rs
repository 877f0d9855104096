use crate::error::{Error, Result};
use chrono::{DateTime, Local};
use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Metadata recorded once per compression.
///
/// # Fields
///
/// * `seq` - Number of records
/// * `nt` - Total number of nucleotides, the sum of all sequence lengths
/// * `md5` - Hex MD5 digest of the whole uncompressed FastQ byte stream
/// * `mtime` - Modification time of the original file, in seconds since the Unix epoch
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Info {
    pub seq: u64,
    pub nt: u64,
    pub md5: String,
    pub mtime: f64,
}

impl Info {
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// The original modification time.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidContainer`] if `mtime` is not a representable timestamp.
    pub fn modified(&self) -> Result<SystemTime> {
        seconds_to_time(self.mtime)
    }

    /// JSON view with an extra RFC 3339 `modified` field, for people rather than scripts.
    pub fn to_pretty_json(&self) -> Result<String> {
        let mut data = serde_json::to_value(self)?;
        let modified: DateTime<Local> = self.modified()?.into();
        data["modified"] = serde_json::json!(modified.to_rfc3339());
        Ok(serde_json::to_string_pretty(&data)?)
    }
}

pub fn time_to_seconds(time: SystemTime) -> f64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_secs_f64(),
        Err(e) => -e.duration().as_secs_f64(),
    }
}

pub fn seconds_to_time(seconds: f64) -> Result<SystemTime> {
    let invalid = || Error::InvalidContainer(format!("timestamp {seconds} is out of range"));
    let offset = Duration::try_from_secs_f64(seconds.abs()).map_err(|_| invalid())?;
    if seconds >= 0.0 {
        UNIX_EPOCH.checked_add(offset).ok_or_else(invalid)
    } else {
        UNIX_EPOCH.checked_sub(offset).ok_or_else(invalid)
    }
}

/// Modification time of the file at `path`, in seconds since the Unix epoch.
pub fn file_mtime(path: &Path) -> io::Result<f64> {
    Ok(time_to_seconds(fs::metadata(path)?.modified()?))
}

/// Sets the modification time of the file at `path`.
pub fn set_file_mtime(path: &Path, mtime: f64) -> Result<()> {
    let time = seconds_to_time(mtime)?;
    File::options().write(true).open(path)?.set_modified(time)?;
    Ok(())
}

fn hex_digest(hasher: Md5) -> String {
    format!("{:x}", hasher.finalize())
}

/// A reader that computes the MD5 digest of every byte read through it.
pub struct Md5Reader<R> {
    inner: R,
    hasher: Md5,
}

impl<R: Read> Md5Reader<R> {
    pub fn new(inner: R) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
        }
    }

    /// Hex digest of the bytes read so far.
    pub fn finalize(self) -> String {
        hex_digest(self.hasher)
    }
}

impl<R: Read> Read for Md5Reader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let n = self.inner.read(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }
}

/// A writer that computes the MD5 digest of every byte written through it.
pub struct Md5Writer<W> {
    inner: W,
    hasher: Md5,
}

impl<W: Write> Md5Writer<W> {
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Md5::new(),
        }
    }

    /// Hex digest of the bytes written so far, and the inner writer.
    pub fn finalize(self) -> (String, W) {
        (hex_digest(self.hasher), self.inner)
    }
}

impl<W: Write> Write for Md5Writer<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Hex MD5 digest of everything `reader` yields.
pub fn md5_of(reader: impl Read) -> io::Result<String> {
    let mut reader = Md5Reader::new(reader);
    io::copy(&mut reader, &mut io::sink())?;
    Ok(reader.finalize())
}
