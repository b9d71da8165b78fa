//! Compression used by Amusement Vision asset files.
//!
//! ## Submodules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`lzss`] | Raw LZSS codec (4 KiB window, 3..=18 byte matches) |
//! | [`lz`]   | `.lz` files: LZSS payload behind an 8-byte size header |
//!
//! ## Choosing the right function
//!
//! * **`.lz` files on disc** - use [`lz::unpack`] / [`lz::pack`], or
//!   [`lz::LzFile`] through [`crate::file::BinaryFile`] to keep the header
//!   convention of the original file.
//! * **Bare payloads** - use [`lzss::decode`] / [`lzss::encode`]. The caller
//!   must know the decompressed size independently.
//!
//! Archives ([`crate::formats::arc`]) never compress their contents
//! themselves; compress individual files before adding them if needed.

pub mod lz;
pub mod lzss;
