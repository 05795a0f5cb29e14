//! Serialized file header.

use std::io::{Cursor, Seek, Write};

use binrw::{binrw, BinRead, BinResult, BinWrite, Endian};
use tracing::debug;

use crate::{
    error::{Error, Result},
    layout::FieldLayout,
};

/// Lowest and highest serialized file versions this library reads
pub const SUPPORTED_VERSIONS: std::ops::RangeInclusive<u32> = 9..=30;

/// The probe plus the endianness word
pub const MIN_HEADER_SIZE: usize = 20;

/// The four big-endian words every serialized file starts with
///
/// Files of version 22 and newer leave the size fields zeroed here and store them again with
/// wider types after the endianness word.
#[binrw]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(big)]
pub struct HeaderProbe {
    pub metadata_size: u32,
    pub file_size: u32,
    pub version: u32,
    pub data_offset: u32,
}

#[binrw]
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(big)]
struct WideFields {
    metadata_size: u32,
    file_size: u64,
    data_offset: u64,
    reserved: u64,
}

/// Parsed serialized file header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SerializedFileHeader {
    pub metadata_size: u32,
    pub file_size: u64,
    pub version: u32,
    pub data_offset: u64,
    /// Raw endianness byte, 0 for little and 1 for big endian
    pub endianness: u8,
}

impl SerializedFileHeader {
    /// Read and validate the header.
    ///
    /// The buffer length is checked before anything else, then the version, then the endianness
    /// byte.
    pub fn read(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_HEADER_SIZE {
            return Err(Error::CorruptedHeader {
                len: data.len(),
                needed: MIN_HEADER_SIZE,
            });
        }

        let mut reader = Cursor::new(data);
        let probe = HeaderProbe::read(&mut reader)?;
        if !SUPPORTED_VERSIONS.contains(&probe.version) {
            return Err(Error::InvalidVersion(probe.version));
        }

        let endianness = data[16];
        if endianness > 1 {
            return Err(Error::EndiannessMismatch(endianness));
        }

        let layout = FieldLayout::for_version(probe.version);
        let header = if layout.wide_header {
            if data.len() < layout.header_size() {
                return Err(Error::CorruptedHeader {
                    len: data.len(),
                    needed: layout.header_size(),
                });
            }
            reader.set_position(MIN_HEADER_SIZE as u64);
            let wide = WideFields::read(&mut reader)?;
            SerializedFileHeader {
                metadata_size: wide.metadata_size,
                file_size: wide.file_size,
                version: probe.version,
                data_offset: wide.data_offset,
                endianness,
            }
        } else {
            SerializedFileHeader {
                metadata_size: probe.metadata_size,
                file_size: probe.file_size as u64,
                version: probe.version,
                data_offset: probe.data_offset as u64,
                endianness,
            }
        };

        debug!(?header, "read serialized file header");
        Ok(header)
    }

    /// Write the header with the field widths of its version.
    pub fn write<W: Write + Seek>(&self, writer: &mut W) -> BinResult<()> {
        let layout = self.layout();
        let probe = if layout.wide_header {
            HeaderProbe {
                version: self.version,
                ..Default::default()
            }
        } else {
            HeaderProbe {
                metadata_size: self.metadata_size,
                file_size: self.file_size as u32,
                version: self.version,
                data_offset: self.data_offset as u32,
            }
        };
        probe.write(writer)?;
        writer.write_all(&[self.endianness, 0, 0, 0])?;

        if layout.wide_header {
            WideFields {
                metadata_size: self.metadata_size,
                file_size: self.file_size,
                data_offset: self.data_offset,
                reserved: 0,
            }
            .write(writer)?;
        }
        Ok(())
    }

    pub fn layout(&self) -> FieldLayout {
        FieldLayout::for_version(self.version)
    }

    /// Byte order of everything after the header
    pub fn endian(&self) -> Endian {
        if self.endianness == 0 {
            Endian::Little
        } else {
            Endian::Big
        }
    }

    pub fn size(&self) -> usize {
        self.layout().header_size()
    }
}
