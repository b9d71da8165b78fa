//! Container formats.
//!
//! Parsers follow the same conventions:
//!
//! * **Generic over** [`std::io::Read`] + [`std::io::Seek`] - pass a
//!   [`std::fs::File`], a [`std::io::Cursor`], or anything else that
//!   implements both traits. Writers additionally need [`std::io::Write`].
//! * **Offsets are relative to the container start**, so a container can be
//!   read from or written into the middle of a larger stream.
//! * **Compression is separate** - archives store whatever bytes they are
//!   given. Use [`crate::compression::lz`] on individual files first when
//!   necessary.
//!
//! ## Format overview
//!
//! | Module  | Format | Description |
//! |---------|--------|-------------|
//! | [`arc`] | ARC    | Archive: header, file system table, aligned file data |
//! | [`fst`] | FST    | File system table embedded in an ARC |

pub mod arc;
pub mod fst;
