//! Positioned reads over a byte buffer with a runtime selected byte order.

use binrw::Endian;
use byteorder::{BigEndian, ByteOrder, LittleEndian};

use crate::error::{Error, Result};

macro_rules! read_primitive {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $size:expr, $read:ident) => {
        $(#[$doc])*
        pub fn $name(&mut self) -> Result<$ty> {
            let bytes = self.take($size)?;
            Ok(match self.endian {
                Endian::Big => BigEndian::$read(bytes),
                Endian::Little => LittleEndian::$read(bytes),
            })
        }
    };
}

/// A cursor over a fixed buffer
///
/// Every read either returns the full value or fails with [`Error::ReadPastEnd`]; nothing is
/// clamped or zero filled.
#[derive(Debug, Clone)]
pub struct EndianReader<'a> {
    data: &'a [u8],
    position: usize,
    endian: Endian,
}

impl<'a> EndianReader<'a> {
    pub fn new(data: &'a [u8], endian: Endian) -> Self {
        Self {
            data,
            position: 0,
            endian,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn set_position(&mut self, position: usize) {
        self.position = position;
    }

    pub fn endian(&self) -> Endian {
        self.endian
    }

    pub fn set_endian(&mut self, endian: Endian) {
        self.endian = endian;
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Bytes left after the cursor
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Borrow the next `count` bytes and advance past them
    pub fn take(&mut self, count: usize) -> Result<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .filter(|end| *end <= self.data.len())
            .ok_or(Error::ReadPastEnd {
                position: self.position,
                needed: count,
                len: self.data.len(),
            })?;

        let bytes = &self.data[self.position..end];
        self.position = end;
        Ok(bytes)
    }

    pub fn skip(&mut self, count: usize) -> Result<()> {
        self.take(count).map(|_| ())
    }

    /// Advance to the next multiple of `alignment`, staying put when already aligned.
    pub fn align(&mut self, alignment: usize) -> Result<()> {
        if alignment <= 1 {
            return Ok(());
        }
        let padding = (alignment - self.position % alignment) % alignment;
        self.skip(padding)
    }

    pub fn read_u8(&mut self) -> Result<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn read_i8(&mut self) -> Result<i8> {
        Ok(self.read_u8()? as i8)
    }

    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_u8()? != 0)
    }

    read_primitive!(read_u16, u16, 2, read_u16);
    read_primitive!(read_i16, i16, 2, read_i16);
    read_primitive!(read_u32, u32, 4, read_u32);
    read_primitive!(read_i32, i32, 4, read_i32);
    read_primitive!(read_u64, u64, 8, read_u64);
    read_primitive!(read_i64, i64, 8, read_i64);
    read_primitive!(read_f32, f32, 4, read_f32);
    read_primitive!(read_f64, f64, 8, read_f64);

    /// Read a fixed size array such as a hash or GUID
    pub fn read_array<const N: usize>(&mut self) -> Result<[u8; N]> {
        let mut array = [0u8; N];
        array.copy_from_slice(self.take(N)?);
        Ok(array)
    }

    /// A signed 32-bit element count; negative counts are rejected
    pub fn read_count(&mut self) -> Result<usize> {
        let position = self.position;
        let length = self.read_i32()?;
        usize::try_from(length).map_err(|_| Error::InvalidLength { position, length })
    }

    /// Read a string up to the first zero byte or the end of the buffer, whichever comes first.
    pub fn read_cstring(&mut self) -> Result<String> {
        let rest = &self.data[self.position.min(self.data.len())..];
        let (text, consumed) = match rest.iter().position(|b| *b == 0) {
            Some(end) => (&rest[..end], end + 1),
            None => (rest, rest.len()),
        };
        self.position += consumed;
        Ok(String::from_utf8_lossy(text).into_owned())
    }

    /// A length prefixed byte array
    pub fn read_byte_array(&mut self) -> Result<&'a [u8]> {
        let length = self.read_count()?;
        self.take(length)
    }

    /// A length prefixed string followed by alignment to 4 bytes
    pub fn read_aligned_string(&mut self) -> Result<String> {
        let bytes = self.read_byte_array()?;
        self.align(4)?;
        Ok(String::from_utf8_lossy(bytes).into_owned())
    }

    /// A length prefixed array of signed 32-bit integers
    pub fn read_i32_array(&mut self) -> Result<Vec<i32>> {
        let count = self.read_count()?;
        let mut values = Vec::with_capacity(count.min(self.remaining() / 4));
        for _ in 0..count {
            values.push(self.read_i32()?);
        }
        Ok(values)
    }
}
