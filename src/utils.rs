//! Low-level I/O primitives shared by the codecs and containers.
//!
//! Each function reads or writes exactly the bytes it promises or returns an
//! error - there is no partial-read ambiguity. Byte order is always explicit
//! in the function name.

use std::io::{Read, Seek, SeekFrom, Write};

use byteorder::{BigEndian, LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::{Error, Result};

/// Read a big-endian `u32`.
#[inline]
pub(crate) fn be_u32<R: Read>(r: &mut R) -> Result<u32> {
    Ok(r.read_u32::<BigEndian>()?)
}

/// Read a little-endian `i32`.
#[inline]
pub(crate) fn le_i32<R: Read>(r: &mut R) -> Result<i32> {
    Ok(r.read_i32::<LittleEndian>()?)
}

/// Write a big-endian `u32`.
#[inline]
pub(crate) fn write_be_u32<W: Write>(w: &mut W, v: u32) -> Result<()> {
    Ok(w.write_u32::<BigEndian>(v)?)
}

/// Write a little-endian `i32`.
#[inline]
pub(crate) fn write_le_i32<W: Write>(w: &mut W, v: i32) -> Result<()> {
    Ok(w.write_i32::<LittleEndian>(v)?)
}

/// Read exactly `len` bytes into a `Vec`.
#[inline]
pub(crate) fn bytesv<R: Read>(r: &mut R, len: usize) -> Result<Vec<u8>> {
    let mut b = vec![0u8; len];
    r.read_exact(&mut b)?;
    Ok(b)
}

/// Verify that the next big-endian `u32` equals `expected`.
///
/// Returns [`Error::BadMagic`] on mismatch.
#[inline]
pub(crate) fn magic_be_u32<R: Read>(r: &mut R, expected: u32) -> Result<()> {
    let actual = be_u32(r)?;
    if actual != expected {
        return Err(Error::BadMagic { expected, actual });
    }
    Ok(())
}

/// Read `len` bytes and check that every one of them equals `fill`.
///
/// Returns [`Error::BadPadding`] naming the first offending byte.
pub(crate) fn read_padding<R: Read + Seek>(r: &mut R, fill: u8, len: usize) -> Result<()> {
    let start = r.stream_position()?;
    let run = bytesv(r, len)?;
    if let Some(i) = run.iter().position(|&b| b != fill) {
        return Err(Error::BadPadding {
            offset: start + i as u64,
            expected: fill,
            actual: run[i],
        });
    }
    Ok(())
}

/// Write `len` copies of `fill`.
pub(crate) fn write_padding<W: Write>(w: &mut W, fill: u8, len: usize) -> Result<()> {
    w.write_all(&vec![fill; len])?;
    Ok(())
}

/// Round `offset` up to the next multiple of `alignment` (a power of two).
#[inline]
pub(crate) fn align_up(offset: u64, alignment: u64) -> u64 {
    debug_assert!(alignment.is_power_of_two());
    (offset + alignment - 1) & !(alignment - 1)
}

/// Pad the writer with zero bytes until its position is a multiple of
/// `alignment`, measured from `base`. Returns the new position.
pub(crate) fn align_writer<W: Write + Seek>(w: &mut W, base: u64, alignment: u64) -> Result<u64> {
    let pos = w.stream_position()?;
    let target = base + align_up(pos - base, alignment);
    write_padding(w, 0, (target - pos) as usize)?;
    Ok(target)
}

/// Total length of the stream in bytes, leaving the cursor where it was.
pub(crate) fn stream_len<S: Seek>(s: &mut S) -> Result<u64> {
    let pos = s.stream_position()?;
    let len = s.seek(SeekFrom::End(0))?;
    if len != pos {
        s.seek(SeekFrom::Start(pos))?;
    }
    Ok(len)
}

/// Extract a null-terminated string from a byte slice at `offset`.
///
/// Returns [`Error::InvalidRange`] if `offset` is out of bounds, or
/// [`Error::Parse`] if no null byte is found.
#[inline]
pub(crate) fn null_string(buf: &[u8], offset: usize) -> Result<String> {
    let slice = buf.get(offset..).ok_or(Error::InvalidRange)?;
    let end = slice
        .iter()
        .position(|&b| b == 0)
        .ok_or(Error::Parse("unterminated name"))?;
    Ok(String::from_utf8_lossy(&slice[..end]).into_owned())
}
