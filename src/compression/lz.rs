//! `.lz` files - an LZSS payload behind an 8-byte size header.
//!
//! ## Layout (little-endian)
//! ```text
//! [0x00] SizeField          (i32)  payload length, or payload length + 8
//! [0x04] UncompressedSize   (i32)
//! [0x08] LZSS payload       (see [`crate::compression::lzss`])
//! ```
//!
//! Whether `SizeField` counts the header depends on the game the file was
//! made for (see [`SizeConvention`]). Readers tell the two apart by comparing
//! the field against the total stream length, which only works because the
//! payload always runs to the end of the file.

use std::io::{Cursor, Read, Seek, Write};

use tracing::debug;

use crate::compression::lzss;
use crate::file::{BinaryFile, Endian, FileType};
use crate::game::{Game, SizeConvention};
use crate::utils::{bytesv, le_i32, stream_len, write_le_i32};
use crate::{Error, Result};

/// Size of the `.lz` header in bytes.
pub const HEADER_SIZE: u64 = 8;

/// Work out which convention a header size field follows, given the length
/// of the whole stream (header included).
///
/// Returns [`Error::HeaderSize`] if it matches neither.
pub fn detect_convention(header_size: i32, stream_len: u64) -> Result<SizeConvention> {
    let field = i64::from(header_size);
    let len = stream_len as i64;
    if field == len {
        Ok(SizeConvention::IncludesHeader)
    } else if field == len - HEADER_SIZE as i64 {
        Ok(SizeConvention::PayloadOnly)
    } else {
        Err(Error::HeaderSize {
            header_size,
            stream_len,
        })
    }
}

/// Decompress an `.lz` stream, returning the data and the size convention
/// its header used.
///
/// `r` must be positioned at the header; the payload is assumed to run to
/// the end of the stream.
pub fn unpack_with_convention<R: Read + Seek>(r: &mut R) -> Result<(Vec<u8>, SizeConvention)> {
    let start = r.stream_position()?;
    let len = stream_len(r)? - start;

    let header_size = le_i32(r)?;
    let uncompressed_size = le_i32(r)?;
    let convention = detect_convention(header_size, len)?;
    let uncompressed_size = u64::try_from(uncompressed_size)
        .map_err(|_| Error::Parse("negative uncompressed size"))?;

    // Both conventions leave exactly the rest of the stream as payload.
    let compressed_size = (header_size - convention.header_bias()) as usize;
    debug!(
        ?convention,
        compressed_size, uncompressed_size, "unpacking lz stream"
    );

    let payload = bytesv(r, compressed_size)?;
    let data = lzss::decode(&payload)?;
    if data.len() as u64 != uncompressed_size {
        return Err(Error::SizeMismatch {
            expected: uncompressed_size,
            actual: data.len() as u64,
        });
    }
    Ok((data, convention))
}

/// Decompress an `.lz` stream.
pub fn unpack<R: Read + Seek>(r: &mut R) -> Result<Vec<u8>> {
    unpack_with_convention(r).map(|(data, _)| data)
}

/// Decompress an in-memory `.lz` file.
pub fn unpack_bytes(data: &[u8]) -> Result<Vec<u8>> {
    unpack(&mut Cursor::new(data))
}

/// Compress `data` and write it as an `.lz` file using `convention`.
pub fn pack_with_convention<W: Write>(
    data: &[u8],
    convention: SizeConvention,
    w: &mut W,
) -> Result<()> {
    let uncompressed_size = i32::try_from(data.len())
        .map_err(|_| Error::InvalidArgument("input exceeds 2 GiB".into()))?;

    let compressed = lzss::encode(data);
    let header_size = i32::try_from(compressed.len())
        .ok()
        .and_then(|n| n.checked_add(convention.header_bias()))
        .ok_or_else(|| Error::InvalidArgument("compressed output exceeds 2 GiB".into()))?;

    debug!(
        ?convention,
        uncompressed = data.len(),
        compressed = compressed.len(),
        "packing lz stream"
    );

    write_le_i32(w, header_size)?;
    write_le_i32(w, uncompressed_size)?;
    w.write_all(&compressed)?;
    Ok(())
}

/// Compress `data` into an `.lz` file readable by `game`.
pub fn pack<W: Write>(data: &[u8], game: Game, w: &mut W) -> Result<()> {
    pack_with_convention(data, game.size_convention(), w)
}

/// Compress `data` into an in-memory `.lz` file readable by `game`.
pub fn pack_bytes(data: &[u8], game: Game) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    pack(data, game, &mut out)?;
    Ok(out)
}

/// An `.lz` file held decompressed, remembering its header convention so it
/// can be written back the same way.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LzFile {
    /// Decompressed contents.
    pub data: Vec<u8>,
    /// How the header size field is written.
    pub convention: SizeConvention,
}

impl LzFile {
    /// Wrap `data` for writing in the format `game` expects.
    pub fn new(data: Vec<u8>, game: Game) -> Self {
        Self {
            data,
            convention: game.size_convention(),
        }
    }
}

impl BinaryFile for LzFile {
    const FILE_TYPE: FileType = FileType {
        endian: Endian::Little,
        extension: "lz",
    };

    fn read_from<R: Read + Seek>(r: &mut R) -> Result<Self> {
        let (data, convention) = unpack_with_convention(r)?;
        Ok(Self { data, convention })
    }

    /// The payload must end the stream for readers to find it, so write
    /// into an empty or truncated sink.
    fn write_to<W: Write + Seek>(&self, w: &mut W) -> Result<()> {
        pack_with_convention(&self.data, self.convention, w)
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn header_size(stream: &[u8]) -> i32 {
        i32::from_le_bytes(stream[..4].try_into().unwrap())
    }

    #[test]
    fn gx_stores_exact_payload_size() {
        let data = b"F-Zero GX F-Zero GX F-Zero GX";
        let packed = pack_bytes(data, Game::FZeroGx).unwrap();
        let payload = lzss::encode(data);
        assert_eq!(header_size(&packed), payload.len() as i32);
        assert_eq!(&packed[8..], &payload[..]);
    }

    #[test]
    fn smb_counts_the_header() {
        let data = b"monkey monkey monkey ball";
        let packed = pack_bytes(data, Game::SuperMonkeyBall).unwrap();
        assert_eq!(header_size(&packed), lzss::encode(data).len() as i32 + 8);
        assert_eq!(header_size(&packed), packed.len() as i32);
    }

    #[test]
    fn roundtrip_every_game() {
        let data: Vec<u8> = (0..2000u32).map(|i| (i * 7 % 13) as u8).collect();
        for game in Game::ALL {
            let packed = pack_bytes(&data, game).unwrap();
            assert_eq!(unpack_bytes(&packed).unwrap(), data, "{game}");
        }
    }

    #[test]
    fn empty_file_roundtrips() {
        for game in Game::ALL {
            let packed = pack_bytes(&[], game).unwrap();
            assert_eq!(packed.len(), 8);
            assert!(unpack_bytes(&packed).unwrap().is_empty());
        }
    }

    #[test]
    fn rejects_size_field_matching_neither_convention() {
        let mut stream = vec![0u8; 50];
        stream[..4].copy_from_slice(&1000i32.to_le_bytes());
        let err = unpack_bytes(&stream).unwrap_err();
        assert!(matches!(
            err,
            Error::HeaderSize {
                header_size: 1000,
                stream_len: 50
            }
        ));
        assert!(err.is_format());
    }

    #[test]
    fn rejects_wrong_uncompressed_size() {
        let mut packed = pack_bytes(b"hello hello hello", Game::FZeroGx).unwrap();
        packed[4..8].copy_from_slice(&99i32.to_le_bytes());
        assert!(matches!(
            unpack_bytes(&packed),
            Err(Error::SizeMismatch {
                expected: 99,
                actual: 17
            })
        ));
    }

    #[test]
    fn short_header_is_eof() {
        assert!(matches!(unpack_bytes(&[1, 2, 3]), Err(Error::UnexpectedEof)));
    }

    #[test]
    fn lz_file_keeps_its_convention() {
        let original = pack_bytes(b"abcabcabcabc", Game::FZeroAx).unwrap();
        let file = LzFile::from_bytes(&original).unwrap();
        assert_eq!(file.convention, SizeConvention::IncludesHeader);
        assert_eq!(file.to_bytes().unwrap(), original);
    }
}
