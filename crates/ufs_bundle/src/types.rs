//! Base types for structure of a UnityFS bundle.

use binrw::{binrw, BinRead, BinWrite, NullString};

use crate::compression::CompressionType;

/// The signature every UnityFS bundle starts with
pub const SIGNATURE: &[u8; 8] = b"UnityFS\0";

/// Lowest and highest container format versions this library reads
pub const SUPPORTED_VERSIONS: std::ops::RangeInclusive<u32> = 6..=8;

/// Size of the fixed probe read before the version is known
pub const PROBE_SIZE: usize = 16;

/// Length of the digest stored at the start of the BlocksInfo directory
pub const HASH_SIZE: usize = 16;

/// Header flag bits
pub mod flags {
    /// Blocks and directory are stored together
    pub const BLOCKS_AND_DIRECTORY_COMBINED: u32 = 0x40;

    /// BlocksInfo directory is stored at the end of the file
    pub const BLOCKS_INFO_AT_END: u32 = 0x80;

    /// Storage blocks start on a 16 byte boundary
    pub const BLOCK_INFO_NEEDS_PADDING: u32 = 0x200;
}

/// Node flag bits
pub mod node_flags {
    /// Node is a directory
    pub const DIRECTORY: u32 = 0x1;

    /// Node has been deleted
    pub const DELETED: u32 = 0x2;

    /// Node is a serialized file
    pub const SERIALIZED_FILE: u32 = 0x4;
}

/// Fixed width probe over the start of the file
///
/// The first four big-endian words of a bundle: the signature as two words, the format version,
/// and a word that is not interpreted. It is read only to discover the version.
#[derive(BinRead, Debug, Copy, Clone, PartialEq, Eq)]
#[br(big)]
pub struct HeaderProbe {
    /// The signature, split into two words
    pub signature: [u32; 2],

    /// The container format version
    pub version: u32,

    /// First word of the player version string
    pub reserved: u32,
}

impl HeaderProbe {
    /// The signature as it is stored in the file
    pub fn signature_bytes(&self) -> [u8; 8] {
        let mut bytes = [0u8; 8];
        bytes[..4].copy_from_slice(&self.signature[0].to_be_bytes());
        bytes[4..].copy_from_slice(&self.signature[1].to_be_bytes());
        bytes
    }
}

/// Version dependent header layout
///
/// Computed once from the probed version and used for every read that follows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct HeaderLayout {
    /// Boundary the stream is aligned to after the header
    pub header_alignment: u64,

    /// Whether [`flags::BLOCK_INFO_NEEDS_PADDING`] is honoured
    pub honours_padding_flag: bool,
}

impl HeaderLayout {
    /// Layout used by a given container format version
    pub fn for_version(version: u32) -> Self {
        match version {
            0..=6 => HeaderLayout {
                header_alignment: 1,
                honours_padding_flag: false,
            },
            _ => HeaderLayout {
                header_alignment: 16,
                honours_padding_flag: true,
            },
        }
    }
}

/// UnityFS bundle header
///
/// All data is stored in big endian format
#[binrw]
#[derive(Debug, Clone, PartialEq, Eq)]
#[brw(big, magic = b"UnityFS\0")]
pub struct BundleHeader {
    /// The container format version
    pub version: u32,

    /// The player version, usually `5.x.x`
    #[br(map = |s: NullString| s.to_string())]
    #[bw(map = |s: &String| NullString::from(s.as_str()))]
    pub unity_version: String,

    /// The engine version that built the bundle
    #[br(map = |s: NullString| s.to_string())]
    #[bw(map = |s: &String| NullString::from(s.as_str()))]
    pub unity_revision: String,

    /// Total size of the bundle file
    pub size: u64,

    /// Size of the BlocksInfo directory as stored in the file
    pub compressed_blocks_info_size: u32,

    /// Size of the BlocksInfo directory after decompression
    pub uncompressed_blocks_info_size: u32,

    /// Compression and layout flags
    pub flags: u32,
}

impl Default for BundleHeader {
    fn default() -> Self {
        Self {
            version: 7,
            unity_version: "5.x.x".into(),
            unity_revision: "2019.4.16f1".into(),
            size: Default::default(),
            compressed_blocks_info_size: Default::default(),
            uncompressed_blocks_info_size: Default::default(),
            flags: flags::BLOCKS_AND_DIRECTORY_COMBINED,
        }
    }
}

impl BundleHeader {
    /// Compression method of the BlocksInfo directory
    pub fn compression(&self) -> CompressionType {
        CompressionType::from_flags(self.flags)
    }

    /// Whether the BlocksInfo directory is stored at the end of the file
    pub fn blocks_info_at_end(&self) -> bool {
        self.flags & flags::BLOCKS_INFO_AT_END != 0
    }

    /// Whether the storage blocks start on a 16 byte boundary
    pub fn needs_padding(&self) -> bool {
        self.flags & flags::BLOCK_INFO_NEEDS_PADDING != 0
    }

    /// Layout derived from the format version
    pub fn layout(&self) -> HeaderLayout {
        HeaderLayout::for_version(self.version)
    }
}

/// One chunk of the bundle payload
#[derive(BinRead, BinWrite, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[brw(big)]
pub struct StorageBlock {
    /// Size of the block after decompression
    pub uncompressed_size: u32,

    /// Size of the block as stored in the file
    pub compressed_size: u32,

    /// Low bits select the compression method
    pub flags: u16,
}

impl StorageBlock {
    /// Compression method of this block
    pub fn compression(&self) -> CompressionType {
        CompressionType::from_flags(self.flags as u32)
    }
}

/// A named virtual file inside the data region
#[binrw]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[brw(big)]
pub struct NodeInfo {
    /// Offset of the node inside the data region
    pub offset: u64,

    /// Size of the node in bytes
    pub size: u64,

    /// Node flags, see [`node_flags`]
    pub flags: u32,

    /// Path of the node, e.g. `CAB-0123456789abcdef`
    #[br(map = |s: NullString| s.to_string())]
    #[bw(map = |s: &String| NullString::from(s.as_str()))]
    pub path: String,
}

impl NodeInfo {
    /// Exclusive end of the node inside the data region
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.size)
    }

    pub fn is_directory(&self) -> bool {
        self.flags & node_flags::DIRECTORY != 0
    }

    pub fn is_deleted(&self) -> bool {
        self.flags & node_flags::DELETED != 0
    }

    pub fn is_serialized_file(&self) -> bool {
        self.flags & node_flags::SERIALIZED_FILE != 0
    }
}

/// The BlocksInfo directory, after decompression
#[binrw]
#[derive(Debug, Default, Clone, PartialEq, Eq)]
#[brw(big)]
pub struct BlocksInfo {
    /// Digest over everything following it
    pub hash: [u8; HASH_SIZE],

    #[br(temp)]
    #[bw(calc = blocks.len() as u32)]
    block_count: u32,

    /// Storage blocks in data region order
    #[br(count = block_count)]
    pub blocks: Vec<StorageBlock>,

    #[br(temp)]
    #[bw(calc = nodes.len() as u32)]
    node_count: u32,

    /// Nodes in declaration order
    #[br(count = node_count)]
    pub nodes: Vec<NodeInfo>,
}

impl BlocksInfo {
    /// Sum of the decompressed sizes of every block
    pub fn region_size(&self) -> u64 {
        self.blocks.iter().map(|b| b.uncompressed_size as u64).sum()
    }
}
