//! **avkit** - reading and writing Amusement Vision GameCube asset files.
//!
//! # Supported formats
//! | Module | Format |
//! |--------|--------|
//! | [`compression::lzss`] | Raw LZSS payloads (4 KiB window) |
//! | [`compression::lz`]   | `.lz` - LZSS payload with a size header |
//! | [`formats::arc`]      | `.arc` - file archive with an embedded file system table |
//! | [`formats::fst`]      | FST - the archive's file system table |
//!
//! Every whole-file format implements [`BinaryFile`], which adds
//! `from_bytes`/`to_bytes`/`load`/`save` on top of stream-based reading and
//! writing.
//!
//! The library logs through [`tracing`] and never installs a subscriber.

pub mod compression;
pub mod error;
pub mod file;
pub mod formats;
pub mod game;
pub(crate) mod utils;

pub use error::{Error, Result};
pub use file::{BinaryFile, Endian, FileType};
pub use formats::arc::{Archive, ArchiveFile, ArchiveHeader, ArchiveOptions};
pub use game::{Game, SizeConvention};
