//! The common surface of every on-disk file type in avkit.
//!
//! A file type knows how to read itself from a seekable stream, how to write
//! itself back, and carries a small [`FileType`] record describing its byte
//! order and conventional extension. Everything else (loading from disk,
//! converting to/from byte buffers) is provided on top of those two methods.

use std::fs;
use std::io::{Cursor, Read, Seek, Write};
use std::path::Path;

use crate::Result;

/// Byte order of a file format's multi-byte fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Endian {
    Big,
    Little,
}

/// Static metadata describing a file format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileType {
    /// Byte order of the format's header fields.
    pub endian: Endian,
    /// Conventional file extension, without the leading dot.
    pub extension: &'static str,
}

/// A file format that can be decoded from and encoded to bytes.
pub trait BinaryFile: Sized {
    /// Byte order and extension of this format.
    const FILE_TYPE: FileType;

    /// Decode from `r`, which must be positioned at the start of the file.
    fn read_from<R: Read + Seek>(r: &mut R) -> Result<Self>;

    /// Encode to `w`, starting at its current position.
    fn write_to<W: Write + Seek>(&self, w: &mut W) -> Result<()>;

    /// Decode from an in-memory buffer.
    fn from_bytes(data: &[u8]) -> Result<Self> {
        Self::read_from(&mut Cursor::new(data))
    }

    /// Encode into a fresh in-memory buffer.
    fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut c = Cursor::new(Vec::new());
        self.write_to(&mut c)?;
        Ok(c.into_inner())
    }

    /// Read and decode a file from disk.
    fn load(path: impl AsRef<Path>) -> Result<Self> {
        let data = fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Encode in memory, then write the result to disk in one go.
    ///
    /// Nothing is written if encoding fails.
    fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let data = self.to_bytes()?;
        fs::write(path, data)?;
        Ok(())
    }
}
