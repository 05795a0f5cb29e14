//! Synthetic bundles for tests and benchmarks.
//!
//! Only compiled for tests or with the `fixture` feature.

use std::io::Cursor;

use binrw::BinWrite;
use bon::Builder;
use md5::{Digest, Md5};

use crate::{
    compression::CompressionType,
    error::Result,
    types::{flags, node_flags, BlocksInfo, BundleHeader, HeaderLayout, NodeInfo, StorageBlock},
};

/// A node to place in a [`BundleFixture`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureNode {
    pub path: String,
    pub data: Vec<u8>,
    pub flags: u32,
    placement: Option<(u64, u64)>,
}

impl FixtureNode {
    /// A serialized file node whose bytes are appended to the data region
    pub fn new(path: impl Into<String>, data: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            data,
            flags: node_flags::SERIALIZED_FILE,
            placement: None,
        }
    }

    /// Declare the node at a fixed range instead of appending its data
    pub fn at(mut self, offset: u64, size: u64) -> Self {
        self.placement = Some((offset, size));
        self
    }

    pub fn with_flags(mut self, flags: u32) -> Self {
        self.flags = flags;
        self
    }
}

/// Describes a bundle to be written with [`BundleFixture::to_bytes`]
#[derive(Debug, Clone, Builder)]
pub struct BundleFixture {
    #[builder(default = 7)]
    pub version: u32,

    #[builder(default = "5.x.x".to_owned(), into)]
    pub unity_version: String,

    #[builder(default = "2019.4.16f1".to_owned(), into)]
    pub unity_revision: String,

    #[builder(default)]
    pub blocks_info_compression: CompressionType,

    #[builder(default)]
    pub block_compression: CompressionType,

    /// Largest uncompressed size of a storage block
    #[builder(default = 0x20000)]
    pub block_size: usize,

    #[builder(default)]
    pub blocks_info_at_end: bool,

    #[builder(default)]
    pub needs_padding: bool,

    /// Write the digest of the BlocksInfo directory, otherwise leave it zeroed
    #[builder(default = true)]
    pub record_hash: bool,

    #[builder(default)]
    pub nodes: Vec<FixtureNode>,
}

impl BundleFixture {
    /// Encode the bundle
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.encode()?.0)
    }

    /// Where the stored BlocksInfo directory sits in [`BundleFixture::to_bytes`]
    pub fn blocks_info_range(&self) -> Result<(usize, usize)> {
        Ok(self.encode()?.1)
    }

    fn encode(&self) -> Result<(Vec<u8>, (usize, usize))> {
        let mut region = Vec::new();
        let mut nodes = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let (offset, size) = match node.placement {
                Some(placement) => placement,
                None => {
                    let offset = region.len() as u64;
                    region.extend_from_slice(&node.data);
                    (offset, node.data.len() as u64)
                }
            };
            nodes.push(NodeInfo {
                offset,
                size,
                flags: node.flags,
                path: node.path.clone(),
            });
        }

        let mut blocks = Vec::new();
        let mut stored_blocks = Vec::new();
        for chunk in region.chunks(self.block_size.max(1)) {
            let stored = compress(chunk, self.block_compression);
            blocks.push(StorageBlock {
                uncompressed_size: chunk.len() as u32,
                compressed_size: stored.len() as u32,
                flags: u8::from(self.block_compression) as u16,
            });
            stored_blocks.extend_from_slice(&stored);
        }

        let mut blocks_info = Vec::new();
        BlocksInfo {
            hash: [0; 16],
            blocks,
            nodes,
        }
        .write(&mut Cursor::new(&mut blocks_info))?;
        if self.record_hash {
            let digest = Md5::digest(&blocks_info[16..]);
            blocks_info[..16].copy_from_slice(&digest);
        }
        let stored_blocks_info = compress(&blocks_info, self.blocks_info_compression);

        let mut flags = u8::from(self.blocks_info_compression) as u32
            | flags::BLOCKS_AND_DIRECTORY_COMBINED;
        if self.blocks_info_at_end {
            flags |= flags::BLOCKS_INFO_AT_END;
        }
        if self.needs_padding {
            flags |= flags::BLOCK_INFO_NEEDS_PADDING;
        }

        let mut header = BundleHeader {
            version: self.version,
            unity_version: self.unity_version.clone(),
            unity_revision: self.unity_revision.clone(),
            size: 0,
            compressed_blocks_info_size: stored_blocks_info.len() as u32,
            uncompressed_blocks_info_size: blocks_info.len() as u32,
            flags,
        };

        let layout = HeaderLayout::for_version(self.version);
        let mut output = Vec::new();
        header.write(&mut Cursor::new(&mut output))?;
        let header_len = output.len();
        pad(&mut output, layout.header_alignment as usize);

        let blocks_info_range;
        if self.blocks_info_at_end {
            output.extend_from_slice(&stored_blocks);
            blocks_info_range = (output.len(), output.len() + stored_blocks_info.len());
            output.extend_from_slice(&stored_blocks_info);
        } else {
            blocks_info_range = (output.len(), output.len() + stored_blocks_info.len());
            output.extend_from_slice(&stored_blocks_info);
            if layout.honours_padding_flag && self.needs_padding {
                pad(&mut output, 16);
            }
            output.extend_from_slice(&stored_blocks);
        }

        header.size = output.len() as u64;
        let mut encoded_header = Vec::with_capacity(header_len);
        header.write(&mut Cursor::new(&mut encoded_header))?;
        output[..header_len].copy_from_slice(&encoded_header);

        Ok((output, blocks_info_range))
    }
}

fn compress(data: &[u8], compression: CompressionType) -> Vec<u8> {
    match compression {
        CompressionType::Lz4 | CompressionType::Lz4Hc => lz4_flex::block::compress(data),
        _ => data.to_vec(),
    }
}

fn pad(output: &mut Vec<u8>, alignment: usize) {
    if alignment > 1 {
        let padded = output.len().div_ceil(alignment) * alignment;
        output.resize(padded, 0);
    }
}
