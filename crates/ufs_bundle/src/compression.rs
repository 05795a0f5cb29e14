//! Block compression handling.

use std::fmt;

use tracing::instrument;

use crate::error::{Error, Result};

/// Mask selecting the compression method out of header and block flags
pub const COMPRESSION_MASK: u32 = 0x3F;

/// Identifies the storage format used to compress the BlocksInfo directory or a storage block
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Hash)]
pub enum CompressionType {
    /// Stores the data as it is
    #[default]
    None,

    /// LZMA, which is not supported by this library
    Lzma,

    /// LZ4 block format
    Lz4,

    /// LZ4 block format produced by the high compression encoder
    Lz4Hc,

    /// LZHAM, which is not supported by this library
    Lzham,

    /// A value not defined by the format
    Unknown(u8),
}

impl CompressionType {
    /// Extract the compression method from a flags field
    pub fn from_flags(flags: u32) -> Self {
        Self::from((flags & COMPRESSION_MASK) as u8)
    }

    /// Whether this library can decode data compressed with this method
    pub fn is_supported(&self) -> bool {
        matches!(
            self,
            CompressionType::None | CompressionType::Lz4 | CompressionType::Lz4Hc
        )
    }
}

impl From<u8> for CompressionType {
    fn from(value: u8) -> Self {
        match value {
            0 => CompressionType::None,
            1 => CompressionType::Lzma,
            2 => CompressionType::Lz4,
            3 => CompressionType::Lz4Hc,
            4 => CompressionType::Lzham,
            other => CompressionType::Unknown(other),
        }
    }
}

impl From<CompressionType> for u8 {
    fn from(value: CompressionType) -> Self {
        match value {
            CompressionType::None => 0,
            CompressionType::Lzma => 1,
            CompressionType::Lz4 => 2,
            CompressionType::Lz4Hc => 3,
            CompressionType::Lzham => 4,
            CompressionType::Unknown(other) => other,
        }
    }
}

impl fmt::Display for CompressionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionType::None => write!(f, "none"),
            CompressionType::Lzma => write!(f, "lzma"),
            CompressionType::Lz4 => write!(f, "lz4"),
            CompressionType::Lz4Hc => write!(f, "lz4hc"),
            CompressionType::Lzham => write!(f, "lzham"),
            CompressionType::Unknown(value) => write!(f, "unknown ({value})"),
        }
    }
}

/// Decompress `data` into exactly `uncompressed_size` bytes.
///
/// A decoder producing any other length is an error; the output is never truncated or padded.
#[instrument(skip(data), fields(len = data.len()), err)]
pub fn decompress(
    data: &[u8],
    uncompressed_size: usize,
    compression: CompressionType,
) -> Result<Vec<u8>> {
    match compression {
        CompressionType::None => {
            if data.len() != uncompressed_size {
                return Err(Error::DecompressedSizeMismatch {
                    expected: uncompressed_size,
                    actual: data.len(),
                });
            }
            Ok(data.to_vec())
        }
        CompressionType::Lz4 | CompressionType::Lz4Hc => {
            let mut output = vec![0u8; uncompressed_size];
            let written = lz4_flex::block::decompress_into(data, &mut output)?;
            if written != uncompressed_size {
                return Err(Error::DecompressedSizeMismatch {
                    expected: uncompressed_size,
                    actual: written,
                });
            }
            Ok(output)
        }
        CompressionType::Lzma | CompressionType::Lzham | CompressionType::Unknown(_) => {
            Err(Error::UnsupportedCompression(compression))
        }
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{decompress, CompressionType};
    use crate::error::{Error, Result};

    #[test]
    fn flags_select_compression() {
        assert_eq!(CompressionType::from_flags(0x43), CompressionType::Lz4Hc);
        assert_eq!(CompressionType::from_flags(0x80), CompressionType::None);
        assert_eq!(CompressionType::from_flags(0x3F), CompressionType::Unknown(0x3F));
    }

    #[test]
    fn passthrough_keeps_bytes() -> Result<()> {
        let data = b"Hello World";
        assert_eq!(decompress(data, 11, CompressionType::None)?, data.to_vec());
        Ok(())
    }

    #[test]
    fn lz4_decodes_to_exact_size() -> Result<()> {
        let data = b"Hello World Hello World Hello World".to_vec();
        let compressed = lz4_flex::block::compress(&data);

        assert_eq!(
            decompress(&compressed, data.len(), CompressionType::Lz4)?,
            data
        );
        assert_eq!(
            decompress(&compressed, data.len(), CompressionType::Lz4Hc)?,
            data
        );
        Ok(())
    }

    #[test]
    fn lz4_short_output_is_rejected() {
        let data = b"Hello World Hello World Hello World".to_vec();
        let compressed = lz4_flex::block::compress(&data);

        let result = decompress(&compressed, data.len() + 4, CompressionType::Lz4);
        assert!(matches!(
            result,
            Err(Error::DecompressedSizeMismatch { expected, actual })
                if expected == data.len() + 4 && actual == data.len()
        ));
    }

    #[test]
    fn lzma_is_unsupported() {
        let result = decompress(&[0x5D, 0x00, 0x00], 3, CompressionType::Lzma);
        assert!(matches!(
            result,
            Err(Error::UnsupportedCompression(CompressionType::Lzma))
        ));
    }
}
