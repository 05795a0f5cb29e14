use std::io::Cursor;

use pretty_assertions::assert_eq;
use ufs_serialized::{
    detect_renderable,
    error::{Error, Result},
    header::MIN_HEADER_SIZE,
    ObjectSummary, SerializedFile, SerializedFileHeader,
};

fn header_bytes(version: u32, endianness: u8) -> Result<Vec<u8>> {
    let header = SerializedFileHeader {
        metadata_size: 0,
        file_size: 0,
        version,
        data_offset: 0,
        endianness,
    };
    let mut out = Vec::new();
    header.write(&mut Cursor::new(&mut out))?;
    Ok(out)
}

/// A version 22 little endian file with empty type, object and external tables
fn empty_file() -> Result<Vec<u8>> {
    let mut out = header_bytes(22, 0)?;
    out.extend_from_slice(b"2021.3.5f1\0");
    out.extend_from_slice(&19i32.to_le_bytes());
    out.push(0);
    // types, objects, script types, externals, ref types
    for _ in 0..5 {
        out.extend_from_slice(&0i32.to_le_bytes());
    }
    out.push(0);
    Ok(out)
}

#[test]
fn empty_file_parses() -> Result<()> {
    let input = empty_file()?;
    let file = SerializedFile::parse(input.clone())?;

    assert_eq!(file.version(), 22);
    assert_eq!(file.unity_version(), "2021.3.5f1");
    assert_eq!(file.target_platform(), 19);
    assert!(file.objects().is_empty());
    assert!(file.find_object(1).is_none());
    assert!(!detect_renderable(&input)?);

    let summary = ObjectSummary::from(&file);
    assert_eq!(summary.object_count, 0);
    assert!(!summary.has_renderable());

    Ok(())
}

#[test]
fn missing_metadata_is_read_past_end() -> Result<()> {
    let mut input = empty_file()?;
    input.truncate(input.len() - 6);

    assert!(matches!(
        SerializedFile::parse(input),
        Err(Error::ReadPastEnd { .. })
    ));
    Ok(())
}

#[test]
fn header_checks_run_in_order() -> Result<()> {
    // too short wins over everything else
    assert!(matches!(
        SerializedFileHeader::read(&[0xFF; MIN_HEADER_SIZE - 1]),
        Err(Error::CorruptedHeader { len: 19, needed: 20 })
    ));

    // version is checked before the endianness byte
    assert!(matches!(
        SerializedFileHeader::read(&header_bytes(31, 7)?),
        Err(Error::InvalidVersion(31))
    ));
    assert!(matches!(
        SerializedFileHeader::read(&header_bytes(17, 7)?),
        Err(Error::EndiannessMismatch(7))
    ));

    // wide headers need all 48 bytes
    let wide = header_bytes(22, 0)?;
    assert!(matches!(
        SerializedFileHeader::read(&wide[..40]),
        Err(Error::CorruptedHeader { len: 40, needed: 48 })
    ));

    Ok(())
}

#[test]
fn detector_shares_header_errors() -> Result<()> {
    assert!(matches!(
        detect_renderable(&header_bytes(8, 0)?),
        Err(Error::InvalidVersion(8))
    ));
    Ok(())
}
