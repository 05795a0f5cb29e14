//! JSON summary of a parsed bundle.
//!
//! The field names follow the reference dumps produced for real bundles so the two can be diffed
//! directly.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::{
    error::Result,
    read::Bundle,
    types::{BundleHeader, NodeInfo, StorageBlock},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderReport {
    pub signature: String,
    pub version: u32,
    pub unity_version: String,
    pub unity_revision: String,
    pub size: u64,
    pub compressed_blocks_info_size: u32,
    pub uncompressed_blocks_info_size: u32,
    pub flags: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageBlockReport {
    pub uncompressed_size: u32,
    pub compressed_size: u32,
    pub flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeReport {
    pub offset: u64,
    pub size: u64,
    pub flags: u32,
    pub path: String,
}

/// Header, storage blocks, nodes and data offset of a bundle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleReport {
    pub header: HeaderReport,
    pub storage_blocks: Vec<StorageBlockReport>,
    pub nodes: Vec<NodeReport>,
    pub data_offset: u64,
}

impl BundleReport {
    /// Read a report previously written with [`BundleReport::to_json_pretty`]
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&BundleHeader> for HeaderReport {
    fn from(header: &BundleHeader) -> Self {
        HeaderReport {
            signature: "UnityFS".into(),
            version: header.version,
            unity_version: header.unity_version.clone(),
            unity_revision: header.unity_revision.clone(),
            size: header.size,
            compressed_blocks_info_size: header.compressed_blocks_info_size,
            uncompressed_blocks_info_size: header.uncompressed_blocks_info_size,
            flags: header.flags,
        }
    }
}

impl From<&StorageBlock> for StorageBlockReport {
    fn from(block: &StorageBlock) -> Self {
        StorageBlockReport {
            uncompressed_size: block.uncompressed_size,
            compressed_size: block.compressed_size,
            flags: block.flags,
        }
    }
}

impl From<&NodeInfo> for NodeReport {
    fn from(node: &NodeInfo) -> Self {
        NodeReport {
            offset: node.offset,
            size: node.size,
            flags: node.flags,
            path: node.path.clone(),
        }
    }
}

impl From<&Bundle> for BundleReport {
    fn from(bundle: &Bundle) -> Self {
        BundleReport {
            header: bundle.header().into(),
            storage_blocks: bundle.blocks().iter().map(Into::into).collect(),
            nodes: bundle.nodes().iter().map(Into::into).collect(),
            data_offset: bundle.data_offset(),
        }
    }
}

impl fmt::Display for BundleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header = &self.header;
        writeln!(
            f,
            "{} v{} ({} / {})",
            header.signature, header.version, header.unity_version, header.unity_revision
        )?;
        writeln!(
            f,
            "size: {} bytes, blocks info: {} -> {} bytes, flags: {:#x}",
            header.size,
            header.compressed_blocks_info_size,
            header.uncompressed_blocks_info_size,
            header.flags
        )?;
        writeln!(
            f,
            "{} storage blocks, data offset {}",
            self.storage_blocks.len(),
            self.data_offset
        )?;
        for node in &self.nodes {
            writeln!(
                f,
                "  {:>10} {:>10} {:#06x} {}",
                node.offset, node.size, node.flags, node.path
            )?;
        }
        Ok(())
    }
}
