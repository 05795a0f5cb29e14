//! The logical data region assembled from the storage blocks.

use bytes::{Bytes, BytesMut};
use tracing::{debug, instrument};

use crate::{
    compression::{self, CompressionType},
    error::{Error, Result},
    types::{NodeInfo, StorageBlock},
};

/// Concatenation of every decompressed storage block, in table order
///
/// Node offsets are expressed in this offset space. Slices handed out by the region share its
/// buffer, nothing is copied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataRegion {
    data: Bytes,
}

impl DataRegion {
    /// Wrap already decompressed bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Decompress every block stored from `start` in `file` and join them.
    ///
    /// When no block is compressed the region is a view into `file`.
    #[instrument(skip(file, blocks), fields(blocks = blocks.len()), err)]
    pub fn build(file: &Bytes, start: u64, blocks: &[StorageBlock], limit: u64) -> Result<Self> {
        let total: u64 = blocks.iter().map(|b| b.uncompressed_size as u64).sum();
        if total > limit {
            return Err(Error::RegionTooLarge { size: total, limit });
        }

        let file_len = file.len() as u64;
        if start > file_len {
            return Err(Error::DataOffsetOutOfBounds {
                offset: start,
                file_len,
            });
        }

        let mut position = start;
        let mut chunks = Vec::with_capacity(blocks.len());
        for (index, block) in blocks.iter().enumerate() {
            let size = block.compressed_size as u64;
            let end = position.saturating_add(size);
            if end > file_len {
                return Err(Error::BlockOutOfBounds {
                    index,
                    offset: position,
                    size,
                    file_len,
                });
            }

            let stored = file.slice(position as usize..end as usize);
            let compression = block.compression();
            debug!(index, %compression, size, "reading block");

            chunks.push(match compression {
                CompressionType::None => {
                    if block.uncompressed_size != block.compressed_size {
                        return Err(Error::DecompressedSizeMismatch {
                            expected: block.uncompressed_size as usize,
                            actual: block.compressed_size as usize,
                        });
                    }
                    stored
                }
                _ => Bytes::from(compression::decompress(
                    &stored,
                    block.uncompressed_size as usize,
                    compression,
                )?),
            });
            position = end;
        }

        if blocks.iter().all(|b| b.compression() == CompressionType::None) {
            return Ok(Self {
                data: file.slice(start as usize..position as usize),
            });
        }

        let mut data = BytesMut::with_capacity(total as usize);
        chunks.iter().for_each(|c| data.extend_from_slice(c));
        Ok(Self {
            data: data.freeze(),
        })
    }

    /// Number of bytes in the region
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the region holds no bytes
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// The whole region
    pub fn as_bytes(&self) -> &Bytes {
        &self.data
    }

    /// A view of `size` bytes starting at `offset`
    pub fn slice(&self, offset: u64, size: u64) -> Option<Bytes> {
        let end = offset.checked_add(size)?;
        if end > self.data.len() as u64 {
            return None;
        }
        Some(self.data.slice(offset as usize..end as usize))
    }

    /// The bytes of a node
    pub fn read_node(&self, node: &NodeInfo) -> Result<Bytes> {
        self.slice(node.offset, node.size)
            .ok_or_else(|| Error::NodeExceedsDataRegion {
                path: node.path.clone(),
                offset: node.offset,
                size: node.size,
                region_len: self.data.len() as u64,
            })
    }
}
