//! Index buffer decoding.

use binrw::Endian;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;
use tracing::warn;

use crate::error::{Error, Result};

/// Width of the entries of an index buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum IndexFormat {
    UInt16,
    UInt32,
}

impl IndexFormat {
    /// Map the recorded `m_IndexFormat` value
    pub fn from_raw(raw: i32) -> Result<Self> {
        match raw {
            0 => Ok(IndexFormat::UInt16),
            1 => Ok(IndexFormat::UInt32),
            other => Err(Error::UnknownIndexFormat(other)),
        }
    }

    pub fn raw(self) -> i32 {
        match self {
            IndexFormat::UInt16 => 0,
            IndexFormat::UInt32 => 1,
        }
    }

    /// Bytes per index
    pub fn size(self) -> usize {
        match self {
            IndexFormat::UInt16 => 2,
            IndexFormat::UInt32 => 4,
        }
    }
}

impl TryFrom<i32> for IndexFormat {
    type Error = Error;

    fn try_from(raw: i32) -> Result<Self> {
        IndexFormat::from_raw(raw)
    }
}

/// Decide the index width of a buffer of `len` bytes
///
/// A recorded format is authoritative and the length must be a multiple of its size. Without one
/// the width is guessed from the length, preferring 32-bit whenever it divides evenly. That guess
/// cannot tell 32-bit indices from an even number of 16-bit ones, so it is logged every time it
/// has to choose.
pub fn resolve_format(len: usize, recorded: Option<i32>) -> Result<IndexFormat> {
    if let Some(raw) = recorded {
        let format = IndexFormat::from_raw(raw)?;
        if len % format.size() != 0 {
            return Err(Error::IndexBufferLength { len, format });
        }
        return Ok(format);
    }

    if len == 0 {
        Ok(IndexFormat::UInt16)
    } else if len % 4 == 0 {
        warn!(len, "no index format recorded, assuming 32-bit indices");
        Ok(IndexFormat::UInt32)
    } else if len % 2 == 0 {
        Ok(IndexFormat::UInt16)
    } else {
        Err(Error::UnalignedIndexBuffer(len))
    }
}

/// Decode an index buffer into 32-bit indices
pub fn decode_indices(
    buffer: &[u8],
    recorded: Option<i32>,
    endian: Endian,
) -> Result<(Vec<u32>, IndexFormat)> {
    let format = resolve_format(buffer.len(), recorded)?;
    let indices = match (format, endian) {
        (IndexFormat::UInt16, Endian::Little) => {
            read_all(buffer, 2, |b| LittleEndian::read_u16(b).into())
        }
        (IndexFormat::UInt16, Endian::Big) => {
            read_all(buffer, 2, |b| BigEndian::read_u16(b).into())
        }
        (IndexFormat::UInt32, Endian::Little) => read_all(buffer, 4, LittleEndian::read_u32),
        (IndexFormat::UInt32, Endian::Big) => read_all(buffer, 4, BigEndian::read_u32),
    };
    Ok((indices, format))
}

fn read_all(buffer: &[u8], size: usize, read: impl Fn(&[u8]) -> u32) -> Vec<u32> {
    buffer.chunks_exact(size).map(read).collect()
}
