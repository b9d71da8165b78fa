//! End-to-end properties of the codec and archive formats.

use std::io::Cursor;

use avkit::compression::lz::{self, LzFile};
use avkit::compression::lzss::{self, Token, Tokens};
use avkit::{Archive, BinaryFile, Error, Game, SizeConvention};
use pretty_assertions::assert_eq;
use proptest::prelude::*;

fn game() -> impl Strategy<Value = Game> {
    prop::sample::select(Game::ALL.to_vec())
}

/// Byte strings with plenty of repetition, so the encoder takes its match
/// paths and not just literals.
fn repetitive_bytes() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec((prop::collection::vec(any::<u8>(), 1..8), 1usize..40), 0..60).prop_map(
        |runs| {
            runs.into_iter()
                .flat_map(|(chunk, n)| chunk.repeat(n))
                .collect()
        },
    )
}

proptest! {
    #[test]
    fn lzss_roundtrips_arbitrary_bytes(data in prop::collection::vec(any::<u8>(), 0..5000)) {
        prop_assert_eq!(lzss::decode(&lzss::encode(&data)).unwrap(), data);
    }

    #[test]
    fn lzss_roundtrips_repetitive_bytes(data in repetitive_bytes()) {
        prop_assert_eq!(lzss::decode(&lzss::encode(&data)).unwrap(), data);
    }

    #[test]
    fn lz_roundtrips_for_every_game(data in repetitive_bytes(), game in game()) {
        let packed = lz::pack_bytes(&data, game).unwrap();
        prop_assert_eq!(lz::unpack_bytes(&packed).unwrap(), data);
    }

    #[test]
    fn matches_stay_in_bounds(data in repetitive_bytes()) {
        for token in Tokens::new(&lzss::encode(&data)) {
            if let Token::Match { position, length } = token.unwrap() {
                prop_assert!((3..=18).contains(&length));
                prop_assert!(position <= 4095);
            }
        }
    }
}

#[test]
fn roundtrips_edge_shapes() {
    let window_spanning: Vec<u8> = b"0123456789abcdefghij".repeat(700);
    let mut boundary = vec![0x5Au8; 4090];
    boundary.extend_from_slice(b"repeat-me-repeat-me-repeat-me");
    boundary.extend(std::iter::repeat_n(0x5A, 30));

    let cases: [Vec<u8>; 5] = [
        Vec::new(),
        vec![0x42],
        vec![0x11; 4097 * 3],
        window_spanning,
        boundary,
    ];
    for data in cases {
        assert_eq!(lzss::decode(&lzss::encode(&data)).unwrap(), data);
    }
}

#[test]
fn single_value_compresses_well() {
    let data = vec![0x7Fu8; 5000];
    let packed = lzss::encode(&data);
    assert!(packed.len() < 100, "{} bytes", packed.len());
    assert_eq!(lzss::decode(&packed).unwrap(), data);
}

#[test]
fn header_conventions() {
    let data = b"header convention check, header convention check".to_vec();
    let payload_len = lzss::encode(&data).len() as i32;

    let gx = lz::pack_bytes(&data, Game::FZeroGx).unwrap();
    assert_eq!(i32::from_le_bytes(gx[..4].try_into().unwrap()), payload_len);
    let smb = lz::pack_bytes(&data, Game::SuperMonkeyBall).unwrap();
    assert_eq!(
        i32::from_le_bytes(smb[..4].try_into().unwrap()),
        payload_len + 8
    );
    assert_eq!(
        i32::from_le_bytes(smb[4..8].try_into().unwrap()),
        data.len() as i32
    );
}

#[test]
fn unpack_rejects_inconsistent_header() {
    let mut stream = vec![0u8; 50];
    stream[..4].copy_from_slice(&1000i32.to_le_bytes());
    let err = lz::unpack_bytes(&stream).unwrap_err();
    assert!(err.is_format(), "{err}");
}

#[test]
fn lz_file_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("stage.lz");
    let file = LzFile::new(b"stage stage stage stage".to_vec(), Game::FZeroGx);
    file.save(&path).unwrap();

    let loaded = LzFile::load(&path).unwrap();
    assert_eq!(loaded.convention, SizeConvention::PayloadOnly);
    assert_eq!(loaded, file);
}

#[test]
fn archive_roundtrip() {
    let archive = Archive::from_entries([
        ("a.txt", b"hello".to_vec()),
        ("b/c.dat", vec![1, 2, 3]),
    ]);
    let bytes = archive.to_bytes().unwrap();
    assert_eq!(&bytes[..4], &[0x55, 0xAA, 0x38, 0x2D]);

    let parsed = Archive::from_bytes(&bytes).unwrap();
    let header = parsed.header.unwrap();
    assert_eq!(header.data_ptr % 32, 0);
    assert!(header.data_ptr >= header.file_system_ptr + header.file_system_size);
    assert_eq!(parsed.files.len(), 2);
    assert_eq!(parsed["a.txt"].data, b"hello");
    assert_eq!(parsed["b/c.dat"].data, [1, 2, 3]);
}

#[test]
fn archive_rejects_corrupt_header_bytes() {
    let bytes = Archive::from_entries([("a.txt", b"hello".to_vec())])
        .to_bytes()
        .unwrap();
    for i in (0..4).chain(0x10..0x20) {
        let mut bad = bytes.clone();
        bad[i] = bad[i].wrapping_add(1);
        let err = Archive::parse(&mut Cursor::new(&bad)).unwrap_err();
        assert!(
            matches!(err, Error::BadMagic { .. } | Error::BadPadding { .. }),
            "byte {i}: {err}"
        );
    }
}

#[test]
fn archive_of_compressed_files() {
    let level = vec![0x33u8; 3000];
    let packed = lz::pack_bytes(&level, Game::SuperMonkeyBallDx).unwrap();
    let archive = Archive::from_entries([("stage/st001.lz", packed)]);

    let parsed = Archive::from_bytes(&archive.to_bytes().unwrap()).unwrap();
    let restored = lz::unpack_bytes(&parsed["stage/st001.lz"].data).unwrap();
    assert_eq!(restored, level);
}

#[test]
fn directory_pack_and_extract() {
    let src = tempfile::tempdir().unwrap();
    std::fs::create_dir_all(src.path().join("bg/sub")).unwrap();
    std::fs::write(src.path().join("z.bin"), [9, 9]).unwrap();
    std::fs::write(src.path().join("bg/sky.tpl"), b"sky").unwrap();
    std::fs::write(src.path().join("bg/sub/x"), b"").unwrap();

    let archive = Archive::from_directory(src.path()).unwrap();
    let paths: Vec<&str> = archive.files().map(|f| f.path.as_str()).collect();
    assert_eq!(paths, ["bg/sky.tpl", "bg/sub/x", "z.bin"]);

    let parsed = Archive::from_bytes(&archive.to_bytes().unwrap()).unwrap();
    let out = tempfile::tempdir().unwrap();
    parsed.extract_to(out.path()).unwrap();
    assert_eq!(std::fs::read(out.path().join("bg/sky.tpl")).unwrap(), b"sky");
    assert_eq!(std::fs::read(out.path().join("z.bin")).unwrap(), [9, 9]);
    assert!(std::fs::read(out.path().join("bg/sub/x")).unwrap().is_empty());
}

#[test]
fn extract_refuses_escaping_paths() {
    let archive = Archive::from_entries([("../evil", vec![1])]);
    let out = tempfile::tempdir().unwrap();
    assert!(matches!(
        archive.extract_to(out.path()),
        Err(Error::InvalidArgument(_))
    ));
}
