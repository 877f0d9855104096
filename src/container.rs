//! The `.zfq` container.
//!
//! ```text
//! [u8; 7]  magic "ZFQPACK"
//! u8       format version
//! u8       codec id
//! [u8; 7]  reserved, zero
//! entries: info, headers, sequences, qualities, each as
//!          u8 name length | name | u64 payload length | payload
//! ```
//!
//! Integers are little-endian. The info entry comes first and is not compressed, so reading it
//! costs the same whatever the size of the channels behind it. Nothing in the layout depends on
//! the time of writing.

use crate::channels::{Channel, Channels};
use crate::codec::CodecKind;
use crate::error::{Error, Result};
use crate::info::Info;
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{Read, Write};

pub const FILE_MAGIC: &[u8; 7] = b"ZFQPACK";
pub const FORMAT_VERSION: u8 = 1;
pub const HEADER_SIZE: usize = 16;
pub const INFO_ENTRY: &str = "info";

/// Largest info entry accepted when reading, anything bigger is not one we wrote.
const MAX_INFO_LEN: u64 = 1 << 16;

/// Fixed-size header at the start of every container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    pub version: u8,
    pub codec: CodecKind,
}

impl FileHeader {
    pub fn new(codec: CodecKind) -> Self {
        Self {
            version: FORMAT_VERSION,
            codec,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(FILE_MAGIC)?;
        writer.write_u8(self.version)?;
        writer.write_u8(self.codec.id())?;
        writer.write_all(&[0u8; HEADER_SIZE - FILE_MAGIC.len() - 2])?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = [0u8; HEADER_SIZE];
        reader.read_exact(&mut bytes).map_err(|e| match e.kind() {
            std::io::ErrorKind::UnexpectedEof => {
                Error::InvalidContainer("file is too short to hold a header".to_string())
            }
            _ => Error::Io(e),
        })?;

        if &bytes[..FILE_MAGIC.len()] != FILE_MAGIC {
            return Err(Error::InvalidContainer("invalid file magic".to_string()));
        }
        let version = bytes[7];
        if version != FORMAT_VERSION {
            return Err(Error::InvalidContainer(format!(
                "unsupported format version {version} (expected {FORMAT_VERSION})"
            )));
        }
        let codec = CodecKind::from_id(bytes[8])?;
        if bytes[9..].iter().any(|b| *b != 0) {
            return Err(Error::InvalidContainer("invalid reserved bytes".to_string()));
        }

        Ok(Self { version, codec })
    }
}

fn write_entry<W: Write>(writer: &mut W, name: &str, payload: &[u8]) -> Result<()> {
    writer.write_u8(name.len() as u8)?;
    writer.write_all(name.as_bytes())?;
    writer.write_u64::<LittleEndian>(payload.len() as u64)?;
    writer.write_all(payload)?;
    Ok(())
}

/// Reads one entry, checking its name. `max_len` bounds the payload size that is accepted.
fn read_entry<R: Read>(reader: &mut R, expected: &str, max_len: Option<u64>) -> Result<Vec<u8>> {
    let truncated = || Error::InvalidContainer(format!("truncated '{expected}' entry"));

    let name_len = reader.read_u8().map_err(|_| truncated())? as usize;
    let mut name = vec![0u8; name_len];
    reader.read_exact(&mut name).map_err(|_| truncated())?;
    if name != expected.as_bytes() {
        return Err(Error::InvalidContainer(format!(
            "expected entry '{expected}', found '{}'",
            String::from_utf8_lossy(&name)
        )));
    }

    let len = reader.read_u64::<LittleEndian>().map_err(|_| truncated())?;
    if max_len.is_some_and(|max| len > max) {
        return Err(Error::InvalidContainer(format!(
            "'{expected}' entry is {len} bytes long"
        )));
    }

    // read through `take` so a damaged length cannot trigger a huge allocation up front
    let mut payload = Vec::new();
    reader.take(len).read_to_end(&mut payload)?;
    if payload.len() as u64 != len {
        return Err(truncated());
    }
    Ok(payload)
}

/// A container held in memory: the info record plus three encoded channel blobs.
///
/// It is built once and then either written out or consumed; nothing mutates it in place.
#[derive(Debug, Clone, PartialEq)]
pub struct Container {
    pub codec: CodecKind,
    pub info: Info,
    pub channels: Channels,
}

impl Container {
    pub fn new(codec: CodecKind, info: Info, channels: Channels) -> Self {
        Self {
            codec,
            info,
            channels,
        }
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        FileHeader::new(self.codec).write_to(writer)?;
        write_entry(writer, INFO_ENTRY, &self.info.to_bytes()?)?;
        for channel in Channel::ALL {
            write_entry(writer, channel.entry_name(), self.channels.get(channel))?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut container = ContainerReader::new(reader)?;
        let info = container.read_info()?;
        let channels = container.read_channels()?;
        Ok(Self {
            codec: container.header().codec,
            info,
            channels,
        })
    }
}

/// Reads a container entry by entry, so the info record can be had without touching the
/// channels.
pub struct ContainerReader<R: Read> {
    reader: R,
    header: FileHeader,
    info_read: bool,
}

impl<R: Read> ContainerReader<R> {
    /// Reads and validates the file header.
    pub fn new(mut reader: R) -> Result<Self> {
        let header = FileHeader::read_from(&mut reader)?;
        Ok(Self {
            reader,
            header,
            info_read: false,
        })
    }

    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Reads the info entry. Must be called before [`ContainerReader::read_channels`].
    pub fn read_info(&mut self) -> Result<Info> {
        if self.info_read {
            return Err(Error::InvalidContainer("info entry already consumed".to_string()));
        }
        let bytes = read_entry(&mut self.reader, INFO_ENTRY, Some(MAX_INFO_LEN))?;
        self.info_read = true;
        Info::from_bytes(&bytes)
    }

    /// Reads the three encoded channel entries and checks nothing follows them.
    pub fn read_channels(&mut self) -> Result<Channels> {
        if !self.info_read {
            self.read_info()?;
        }

        let mut channels = Channels::default();
        for channel in Channel::ALL {
            *channels.get_mut(channel) = read_entry(&mut self.reader, channel.entry_name(), None)?;
        }

        let mut trailing = [0u8; 1];
        if self.reader.read(&mut trailing)? != 0 {
            return Err(Error::InvalidContainer(
                "unexpected bytes after the last entry".to_string(),
            ));
        }
        Ok(channels)
    }
}
