//! Library-wide error and result types.

use std::io;

use thiserror::Error;

/// Result alias used throughout avkit.
pub type Result<T> = std::result::Result<T, Error>;

/// All errors the library can produce.
///
/// Format errors mean "this is not a well-formed file of the expected kind".
/// They are never retried and never come with a partial result. Use
/// [`Error::is_format`] to test for the whole family at once.
#[derive(Debug, Error)]
pub enum Error {
    /// A magic/signature field did not match the expected value.
    #[error("bad magic value: expected {expected:#010x}, got {actual:#010x}")]
    BadMagic { expected: u32, actual: u32 },
    /// A fixed padding run contained an unexpected byte.
    #[error("bad padding at offset {offset:#x}: expected {expected:#04x}, got {actual:#04x}")]
    BadPadding {
        offset: u64,
        expected: u8,
        actual: u8,
    },
    /// An LZ header size field matches neither known size convention.
    #[error(
        "LZ header size field {header_size} does not match stream length {stream_len} under either known convention"
    )]
    HeaderSize { header_size: i32, stream_len: u64 },
    /// A structural constraint was violated (message describes which one).
    #[error("parse error: {0}")]
    Parse(&'static str),
    /// An offset or size field would read outside the valid region.
    #[error("invalid offset or size")]
    InvalidRange,
    /// The stream ended before all expected bytes could be read.
    #[error("unexpected end of file")]
    UnexpectedEof,
    /// Decoded data length differs from the length declared in its header.
    #[error("decoded {actual} bytes but header declares {expected}")]
    SizeMismatch { expected: u64, actual: u64 },
    /// A game id or name outside the supported set.
    #[error("unsupported game: {0}")]
    UnsupportedGame(String),
    /// A caller-supplied value cannot be represented in the output format.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// An underlying I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[source] io::Error),
}

impl Error {
    /// Whether this error means the input is malformed (as opposed to an
    /// I/O failure or a caller mistake).
    pub fn is_format(&self) -> bool {
        matches!(
            self,
            Error::BadMagic { .. }
                | Error::BadPadding { .. }
                | Error::HeaderSize { .. }
                | Error::Parse(_)
                | Error::InvalidRange
                | Error::UnexpectedEof
        )
    }
}

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        // Short reads are a property of the input, not of the device.
        if e.kind() == io::ErrorKind::UnexpectedEof {
            Error::UnexpectedEof
        } else {
            Error::Io(e)
        }
    }
}
