//! ARC - Amusement Vision file archive.
//!
//! A small container holding a [file system table](super::fst) followed by
//! raw file data. Files inside may themselves be `.lz` compressed; the
//! archive does not care.
//!
//! ## Layout (big-endian)
//! ```text
//! [0x00] Magic 0x55AA382D                 (u32)
//! [0x04] FileSystemPtr                    (u32, from archive start)
//! [0x08] FileSystemSize                   (u32)
//! [0x0C] DataPtr                          (u32, from archive start, 32-aligned)
//! [0x10] Padding, 0xCC × 16               (length is revision-dependent)
//! [....] File system table                (FileSystemSize bytes)
//! [DataPtr] File data, each file 32-aligned
//! ```
//!
//! ## Writing
//! The header pointers depend on regions that come after them, and the file
//! system table records where each file's data ends up. Both are written
//! with placeholder zeros first and patched in place once the data region is
//! complete, so the output stream must be seekable. Use
//! [`BinaryFile::to_bytes`] to build into memory for a non-seekable sink.

use std::fs;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::ops::Index;
use std::path::{Component, Path};

use tracing::{debug, trace, warn};
use walkdir::WalkDir;

use super::fst::{FileSystem, NodeKind, split_path};
use crate::file::{BinaryFile, Endian, FileType};
use crate::utils::{
    align_writer, be_u32, bytesv, magic_be_u32, read_padding, stream_len, write_be_u32,
    write_padding,
};
use crate::{Error, Result};

/// Archive magic.
pub const MAGIC: u32 = 0x55AA_382D;
/// Byte the header padding run is made of.
pub const PADDING_BYTE: u8 = 0xCC;
/// Alignment of the data region.
pub const DATA_ALIGNMENT: u64 = 32;

/// Magic plus the three pointer fields.
const FIXED_HEADER_SIZE: u64 = 0x10;

/// Format revision knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveOptions {
    /// Length of the `0xCC` run after the pointer fields.
    pub padding_len: usize,
    /// Alignment of each file inside the data region (a power of two).
    pub file_alignment: u64,
}

impl Default for ArchiveOptions {
    fn default() -> Self {
        Self {
            padding_len: 16,
            file_alignment: 32,
        }
    }
}

impl ArchiveOptions {
    fn validate(&self) -> Result<()> {
        if !self.file_alignment.is_power_of_two() {
            return Err(Error::InvalidArgument(format!(
                "file alignment {} is not a power of two",
                self.file_alignment
            )));
        }
        Ok(())
    }
}

/// A region of a serialized archive, from the archive start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AddressRange {
    pub start: u64,
    pub size: u64,
}

impl AddressRange {
    /// Offset one past the last byte.
    pub fn end(&self) -> u64 {
        self.start + self.size
    }
}

/// The pointer fields of an archive header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ArchiveHeader {
    pub file_system_ptr: u32,
    pub file_system_size: u32,
    pub data_ptr: u32,
}

impl ArchiveHeader {
    /// Where the file system table lives.
    pub fn file_system_range(&self) -> AddressRange {
        AddressRange {
            start: self.file_system_ptr.into(),
            size: self.file_system_size.into(),
        }
    }

    fn read<R: Read>(r: &mut R) -> Result<Self> {
        Ok(Self {
            file_system_ptr: be_u32(r)?,
            file_system_size: be_u32(r)?,
            data_ptr: be_u32(r)?,
        })
    }

    fn write<W: Write>(&self, w: &mut W) -> Result<()> {
        write_be_u32(w, self.file_system_ptr)?;
        write_be_u32(w, self.file_system_size)?;
        write_be_u32(w, self.data_ptr)
    }
}

/// A file stored in an archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveFile {
    /// `/`-separated path inside the archive.
    pub path: String,
    pub data: Vec<u8>,
}

impl ArchiveFile {
    /// Size of this file's data in bytes.
    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }
}

/// An archive held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Archive {
    /// Files in data-region order.
    pub files: Vec<ArchiveFile>,
    /// Header as found when parsing; [`None`] for archives built in memory.
    pub header: Option<ArchiveHeader>,
}

impl Archive {
    /// An empty archive.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build an archive from `(path, data)` pairs.
    pub fn from_entries<I, P>(entries: I) -> Self
    where
        I: IntoIterator<Item = (P, Vec<u8>)>,
        P: Into<String>,
    {
        let mut archive = Self::new();
        for (path, data) in entries {
            archive.add_file(path, data);
        }
        archive
    }

    /// Pack every regular file below `root`.
    ///
    /// Paths are relative to `root` and visited in name order, so the same
    /// tree always produces the same archive.
    pub fn from_directory(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut archive = Self::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry.map_err(io::Error::from)?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(root)
                .map_err(|_| Error::InvalidArgument("walked outside the root".into()))?;
            let mut parts = Vec::new();
            for part in rel.components() {
                let part = part.as_os_str().to_str().ok_or_else(|| {
                    Error::InvalidArgument(format!("{} is not valid UTF-8", rel.display()))
                })?;
                parts.push(part);
            }
            let path = parts.join("/");
            trace!(%path, "adding file");
            archive.add_file(path, fs::read(entry.path())?);
        }
        Ok(archive)
    }

    /// Append a file. Paths are checked when the archive is written.
    pub fn add_file(&mut self, path: impl Into<String>, data: Vec<u8>) {
        self.files.push(ArchiveFile {
            path: path.into(),
            data,
        });
    }

    /// Iterate over all files.
    pub fn files(&self) -> impl Iterator<Item = &ArchiveFile> {
        self.files.iter()
    }

    /// Find a file by its exact path. Returns [`None`] if not found.
    pub fn get_file_by_name(&self, path: &str) -> Option<&ArchiveFile> {
        self.files.iter().find(|f| f.path == path)
    }

    /// Parse an archive with the default format revision.
    pub fn parse<R: Read + Seek>(r: &mut R) -> Result<Self> {
        Self::parse_with(r, &ArchiveOptions::default())
    }

    /// Parse an archive, reading every file's data into memory.
    ///
    /// `r` must be positioned at the magic. A wrong magic or padding byte
    /// stops parsing before the file system table is touched.
    pub fn parse_with<R: Read + Seek>(r: &mut R, options: &ArchiveOptions) -> Result<Self> {
        let base = r.stream_position()?;
        let len = stream_len(r)? - base;

        magic_be_u32(r, MAGIC)?;
        let header = ArchiveHeader::read(r)?;
        read_padding(r, PADDING_BYTE, options.padding_len)?;
        debug!(?header, "parsed archive header");

        let fs_range = header.file_system_range();
        let data_ptr = u64::from(header.data_ptr);
        if fs_range.start < FIXED_HEADER_SIZE + options.padding_len as u64 || fs_range.end() > len
        {
            return Err(Error::InvalidRange);
        }
        if data_ptr < fs_range.end() || data_ptr > len {
            return Err(Error::Parse("data pointer overlaps the file system table"));
        }
        if data_ptr % DATA_ALIGNMENT != 0 {
            warn!(data_ptr, "archive data region is not 32-byte aligned");
        }

        r.seek(SeekFrom::Start(base + fs_range.start))?;
        let fst = FileSystem::parse(r, header.file_system_size)?;

        let mut files = Vec::new();
        for (node, path) in fst.file_paths() {
            let NodeKind::File { offset, size } = fst.nodes[node].kind else {
                continue;
            };
            let (offset, size) = (u64::from(offset), u64::from(size));
            if size != 0 && (offset < data_ptr || offset + size > len) {
                return Err(Error::InvalidRange);
            }
            r.seek(SeekFrom::Start(base + offset))?;
            let data = bytesv(r, size as usize)?;
            trace!(%path, offset, size, "read file");
            files.push(ArchiveFile { path, data });
        }

        Ok(Self {
            files,
            header: Some(header),
        })
    }

    /// Write the archive with the default format revision.
    pub fn write<W: Write + Seek>(&self, w: &mut W) -> Result<ArchiveHeader> {
        self.write_with(w, &ArchiveOptions::default())
    }

    /// Serialize the archive at the writer's position, returning the header
    /// that was written.
    ///
    /// If this fails the writer holds a partial archive and should be
    /// discarded.
    pub fn write_with<W: Write + Seek>(
        &self,
        w: &mut W,
        options: &ArchiveOptions,
    ) -> Result<ArchiveHeader> {
        options.validate()?;
        let (mut fst, order) = FileSystem::build(self.files.iter().map(|f| f.path.as_str()))?;
        let base = w.stream_position()?;

        // Header with placeholder pointers.
        write_be_u32(w, MAGIC)?;
        let pointers_at = w.stream_position()?;
        ArchiveHeader::default().write(w)?;
        write_padding(w, PADDING_BYTE, options.padding_len)?;

        // File system table with placeholder file locations.
        let fs_start = w.stream_position()? - base;
        fst.write(w)?;
        let fs_range = AddressRange {
            start: fs_start,
            size: w.stream_position()? - base - fs_start,
        };

        let data_start = align_writer(w, base, DATA_ALIGNMENT)? - base;
        for (node, index) in order {
            let file = &self.files[index];
            let offset = align_writer(w, base, options.file_alignment)? - base;
            w.write_all(&file.data)?;
            fst.set_file_location(node, to_u32(offset)?, to_u32(file.size())?)?;
            trace!(path = %file.path, offset, size = file.size(), "placed file");
        }
        let end = w.stream_position()?;
        let total = to_u32(end - base)?;

        let header = ArchiveHeader {
            file_system_ptr: to_u32(fs_range.start)?,
            file_system_size: to_u32(fs_range.size)?,
            data_ptr: to_u32(data_start)?,
        };

        // Patch the pointers and the file locations.
        w.seek(SeekFrom::Start(pointers_at))?;
        header.write(w)?;
        w.seek(SeekFrom::Start(base + fs_range.start))?;
        fst.write(w)?;
        w.seek(SeekFrom::Start(end))?;

        debug!(?header, files = self.files.len(), total, "wrote archive");
        Ok(header)
    }

    /// Write every file below `dir`, creating directories as needed.
    pub fn extract_to(&self, dir: impl AsRef<Path>) -> Result<()> {
        let dir = dir.as_ref();
        for file in &self.files {
            let mut dest = dir.to_path_buf();
            for part in split_path(&file.path)? {
                // A single component like "C:" would still escape `dir`.
                let mut comps = Path::new(part).components();
                if !matches!((comps.next(), comps.next()), (Some(Component::Normal(_)), None)) {
                    return Err(Error::InvalidArgument(format!(
                        "'{}' cannot be extracted safely",
                        file.path
                    )));
                }
                dest.push(part);
            }
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent)?;
            }
            trace!(path = %file.path, dest = %dest.display(), "extracting");
            fs::write(&dest, &file.data)?;
        }
        Ok(())
    }
}

fn to_u32(v: u64) -> Result<u32> {
    u32::try_from(v)
        .map_err(|_| Error::InvalidArgument("archive exceeds the 32-bit offset range".into()))
}

impl BinaryFile for Archive {
    const FILE_TYPE: FileType = FileType {
        endian: Endian::Big,
        extension: "arc",
    };

    fn read_from<R: Read + Seek>(r: &mut R) -> Result<Self> {
        Self::parse(r)
    }

    fn write_to<W: Write + Seek>(&self, w: &mut W) -> Result<()> {
        self.write(w).map(|_| ())
    }
}

impl Index<&str> for Archive {
    type Output = ArchiveFile;

    /// Index by path.
    ///
    /// # Panics
    /// Panics if the path does not exist in the archive.
    fn index(&self, index: &str) -> &Self::Output {
        self.get_file_by_name(index)
            .unwrap_or_else(|| panic!("no file '{index}' in archive"))
    }
}
