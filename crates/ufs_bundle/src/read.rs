//! Types for reading UnityFS bundles
//!

use binrw::BinRead;
use bon::Builder;
use bytes::Bytes;
use indexmap::IndexMap;
use md5::{Digest, Md5};
use std::io::Cursor;
use tracing::{debug, instrument, warn};

use crate::{
    compression,
    error::{Error, NodeNotFoundError, Result},
    node,
    region::DataRegion,
    types::{
        BlocksInfo, BundleHeader, HeaderLayout, HeaderProbe, NodeInfo, StorageBlock, HASH_SIZE,
        PROBE_SIZE, SIGNATURE, SUPPORTED_VERSIONS,
    },
};

/// Default cap on the size of the decompressed data region (1 GiB)
pub const DEFAULT_MAX_REGION_SIZE: u64 = 1024 * 1024 * 1024;

/// Options for how a bundle should be read
#[derive(Debug, Clone, Copy, Builder)]
pub struct ParseOptions {
    /// Recompute the BlocksInfo digest and compare it with the stored one
    #[builder(default = true)]
    pub verify_hash: bool,

    /// Reject duplicate, overlapping and out of range nodes
    #[builder(default = true)]
    pub validate_nodes: bool,

    /// Largest data region that will be allocated
    #[builder(default = DEFAULT_MAX_REGION_SIZE)]
    pub max_region_size: u64,
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A parsed UnityFS bundle
///
/// ```no_run
/// fn list_nodes(data: Vec<u8>) -> ufs_bundle::error::Result<()> {
///     let bundle = ufs_bundle::Bundle::parse(data)?;
///
///     for node in bundle.nodes() {
///         let bytes = bundle.read_node(node)?;
///         println!("{}: {} bytes", node.path, bytes.len());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct Bundle {
    header: BundleHeader,
    blocks_info: BlocksInfo,
    data_offset: u64,
    region: DataRegion,
    paths: IndexMap<String, usize>,
}

impl Bundle {
    /// Read a bundle with the default [`ParseOptions`].
    pub fn parse(data: impl Into<Bytes>) -> Result<Bundle> {
        Self::parse_with(data, ParseOptions::default())
    }

    /// Read a bundle, stopping at the first error.
    #[instrument(skip(data), err)]
    pub fn parse_with(data: impl Into<Bytes>, options: ParseOptions) -> Result<Bundle> {
        let data = data.into();
        let (header, blocks_info, data_offset) = Self::read_metadata(&data, &options)?;

        if options.validate_nodes {
            node::validate_unique_paths(&blocks_info.nodes)?;
            node::validate_no_overlaps(&blocks_info.nodes)?;
        }

        let region = DataRegion::build(
            &data,
            data_offset,
            &blocks_info.blocks,
            options.max_region_size,
        )?;

        if options.validate_nodes {
            node::validate_bounds(&blocks_info.nodes, region.len() as u64)?;
        }

        Ok(Self::assemble(header, blocks_info, data_offset, region))
    }

    /// Read a bundle, reporting every problem instead of stopping at the first one.
    ///
    /// A bundle is only returned when no error was found.
    pub fn try_parse(data: impl Into<Bytes>) -> (Option<Bundle>, Vec<String>) {
        let data = data.into();
        let options = ParseOptions::default();

        let (header, blocks_info, data_offset) = match Self::read_metadata(&data, &options) {
            Ok(metadata) => metadata,
            Err(err) => return (None, vec![err.to_string()]),
        };

        let region = DataRegion::build(
            &data,
            data_offset,
            &blocks_info.blocks,
            options.max_region_size,
        );

        let mut errors = node::collect_violations(
            &blocks_info.nodes,
            region.as_ref().ok().map(|r| r.len() as u64),
        )
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>();

        match region {
            Ok(region) if errors.is_empty() => (
                Some(Self::assemble(header, blocks_info, data_offset, region)),
                errors,
            ),
            Ok(_) => (None, errors),
            Err(err) => {
                errors.insert(0, err.to_string());
                (None, errors)
            }
        }
    }

    fn assemble(
        header: BundleHeader,
        blocks_info: BlocksInfo,
        data_offset: u64,
        region: DataRegion,
    ) -> Bundle {
        let paths = blocks_info
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.path.clone(), i))
            .collect();

        Bundle {
            header,
            blocks_info,
            data_offset,
            region,
            paths,
        }
    }

    /// Probe the version, read the header and the BlocksInfo directory.
    fn read_metadata(data: &Bytes, options: &ParseOptions) -> Result<(BundleHeader, BlocksInfo, u64)> {
        if data.len() < PROBE_SIZE {
            return Err(Error::CorruptedHeader {
                len: data.len(),
                needed: PROBE_SIZE,
            });
        }

        let mut reader = Cursor::new(data.as_ref());
        let probe = HeaderProbe::read(&mut reader)?;

        let signature = probe.signature_bytes();
        if &signature != SIGNATURE {
            return Err(Error::InvalidBundleSignature(
                String::from_utf8_lossy(&signature)
                    .trim_end_matches('\0')
                    .to_string(),
            ));
        }

        if !SUPPORTED_VERSIONS.contains(&probe.version) {
            return Err(Error::UnsupportedVersion(probe.version));
        }

        let layout = HeaderLayout::for_version(probe.version);
        reader.set_position(0);
        let header = BundleHeader::read(&mut reader)?;
        let header_end = align(reader.position(), layout.header_alignment);
        debug!(?header, header_end, "read bundle header");

        let file_len = data.len() as u64;
        let stored_size = header.compressed_blocks_info_size as u64;
        let blocks_info_offset = if header.blocks_info_at_end() {
            file_len.checked_sub(stored_size)
        } else {
            Some(header_end)
        }
        .filter(|offset| offset.saturating_add(stored_size) <= file_len)
        .ok_or(Error::BlocksInfoOutOfBounds {
            offset: if header.blocks_info_at_end() {
                file_len.saturating_sub(stored_size)
            } else {
                header_end
            },
            size: stored_size,
            file_len,
        })?;

        let uncompressed_size = header.uncompressed_blocks_info_size as u64;
        if uncompressed_size > options.max_region_size {
            return Err(Error::RegionTooLarge {
                size: uncompressed_size,
                limit: options.max_region_size,
            });
        }

        let stored =
            &data[blocks_info_offset as usize..(blocks_info_offset + stored_size) as usize];
        let blocks_info_bytes = compression::decompress(
            stored,
            header.uncompressed_blocks_info_size as usize,
            header.compression(),
        )?;

        if options.verify_hash {
            verify_hash(&blocks_info_bytes)?;
        }

        let blocks_info = BlocksInfo::read(&mut Cursor::new(blocks_info_bytes.as_slice()))?;
        debug!(
            blocks = blocks_info.blocks.len(),
            nodes = blocks_info.nodes.len(),
            "read blocks info"
        );

        let mut data_offset = if header.blocks_info_at_end() {
            header_end
        } else {
            header_end + stored_size
        };
        if layout.honours_padding_flag && header.needs_padding() {
            data_offset = align(data_offset, 16);
        }
        if data_offset > file_len {
            return Err(Error::DataOffsetOutOfBounds {
                offset: data_offset,
                file_len,
            });
        }

        Ok((header, blocks_info, data_offset))
    }

    /// The bundle header
    pub fn header(&self) -> &BundleHeader {
        &self.header
    }

    /// Digest stored in the BlocksInfo directory
    pub fn hash(&self) -> &[u8; HASH_SIZE] {
        &self.blocks_info.hash
    }

    /// Storage blocks in data region order
    pub fn blocks(&self) -> &[StorageBlock] {
        &self.blocks_info.blocks
    }

    /// Nodes in declaration order
    pub fn nodes(&self) -> &[NodeInfo] {
        &self.blocks_info.nodes
    }

    /// Offset in the file where the first storage block starts
    pub fn data_offset(&self) -> u64 {
        self.data_offset
    }

    /// The decompressed data region
    pub fn region(&self) -> &DataRegion {
        &self.region
    }

    /// Number of nodes contained in this bundle.
    pub fn len(&self) -> usize {
        self.blocks_info.nodes.len()
    }

    /// Whether this bundle contains no nodes
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over all the node paths in this bundle.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.paths.keys().map(|s| s.as_str())
    }

    /// Get the index of a node by path, if it's present.
    #[inline(always)]
    pub fn index_for_path(&self, path: &str) -> Option<usize> {
        self.paths.get(path).copied()
    }

    /// Search for a node by path
    pub fn node_by_path(&self, path: &str) -> Result<&NodeInfo> {
        let index = self
            .index_for_path(path)
            .ok_or_else(|| NodeNotFoundError::Path(path.to_owned()))?;
        self.node_by_index(index)
    }

    /// Get a node by index
    pub fn node_by_index(&self, index: usize) -> Result<&NodeInfo> {
        Ok(self
            .blocks_info
            .nodes
            .get(index)
            .ok_or(NodeNotFoundError::Index(index))?)
    }

    /// The bytes of a node, as a view into the data region
    pub fn read_node(&self, node: &NodeInfo) -> Result<Bytes> {
        self.region.read_node(node)
    }

    /// Nodes flagged as serialized files, falling back to nodes that are not resource streams
    pub fn serialized_nodes(&self) -> impl Iterator<Item = &NodeInfo> {
        let flagged = self.nodes().iter().any(NodeInfo::is_serialized_file);
        self.nodes().iter().filter(move |n| {
            if flagged {
                n.is_serialized_file()
            } else {
                !n.is_directory() && !n.path.ends_with(".resS") && !n.path.ends_with(".resource")
            }
        })
    }
}

/// Compare the stored BlocksInfo digest with one computed over the rest of the directory.
///
/// A digest of all zeros was never recorded by the writer and is not checked.
pub fn verify_hash(blocks_info: &[u8]) -> Result<()> {
    if blocks_info.len() < HASH_SIZE {
        return Err(Error::CorruptedHeader {
            len: blocks_info.len(),
            needed: HASH_SIZE,
        });
    }

    let (stored, payload) = blocks_info.split_at(HASH_SIZE);
    if stored.iter().all(|b| *b == 0) {
        warn!("blocks info hash not recorded, skipping verification");
        return Ok(());
    }

    let computed = Md5::digest(payload);
    if computed.as_slice() != stored {
        return Err(Error::HashMismatch {
            expected: hex::encode(stored),
            computed: hex::encode(computed),
        });
    }
    Ok(())
}

fn align(position: u64, alignment: u64) -> u64 {
    if alignment <= 1 {
        return position;
    }
    position.div_ceil(alignment) * alignment
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};
    use bytes::Bytes;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::compression::CompressionType;
    use crate::error::{Error, Result};
    use crate::fixture::{BundleFixture, FixtureNode};
    use crate::read::{verify_hash, Bundle, ParseOptions};
    use crate::types::BundleHeader;

    fn hello_nodes() -> Vec<FixtureNode> {
        vec![
            FixtureNode::new("CAB-hello", b"Hello World".to_vec()),
            FixtureNode::new("CAB-hello.resS", b"World Hello".to_vec()),
        ]
    }

    fn hello_fixture() -> BundleFixture {
        BundleFixture::builder().nodes(hello_nodes()).build()
    }

    #[test]
    fn read_invalid_signature() -> Result<()> {
        let mut input = hello_fixture().to_bytes()?;
        input[0] = b'u';

        assert!(matches!(
            Bundle::parse(input),
            Err(Error::InvalidBundleSignature(sig)) if sig == "unityFS"
        ));
        Ok(())
    }

    #[test]
    fn read_truncated_header() {
        assert!(matches!(
            Bundle::parse(b"UnityFS\0".to_vec()),
            Err(Error::CorruptedHeader { len: 8, needed: 16 })
        ));
    }

    #[test]
    fn read_unsupported_version() -> Result<()> {
        let input = BundleFixture::builder().version(99).build().to_bytes()?;

        assert!(matches!(
            Bundle::parse(input),
            Err(Error::UnsupportedVersion(99))
        ));
        Ok(())
    }

    #[test]
    fn read_empty_bundle() -> Result<()> {
        let bundle = Bundle::parse(BundleFixture::builder().build().to_bytes()?)?;

        assert!(bundle.is_empty());
        assert!(bundle.region().is_empty());
        assert_eq!(bundle.paths().count(), 0);

        Ok(())
    }

    #[test]
    fn padded_data_offset_past_end_is_rejected() -> Result<()> {
        let fixture = BundleFixture::builder().needs_padding(true).build();
        let (_, end) = fixture.blocks_info_range()?;
        let mut input = fixture.to_bytes()?;
        assert!(end % 16 != 0);
        input.truncate(end);

        let len = input.len() as u64;
        assert!(matches!(
            Bundle::parse(input.clone()),
            Err(Error::DataOffsetOutOfBounds { offset, file_len }) if file_len == len && offset > len
        ));

        let (bundle, errors) = Bundle::try_parse(input);
        assert!(bundle.is_none());
        assert_eq!(errors.len(), 1);

        Ok(())
    }

    #[test]
    fn oversized_blocks_info_is_rejected_before_decompression() -> Result<()> {
        let input = BundleFixture::builder()
            .blocks_info_compression(CompressionType::Lz4)
            .nodes(hello_nodes())
            .build()
            .to_bytes()?;

        let mut cursor = Cursor::new(input.as_slice());
        let mut header = BundleHeader::read(&mut cursor)?;
        let header_len = cursor.position() as usize;
        header.uncompressed_blocks_info_size = u32::MAX;

        let mut patched = Vec::new();
        header.write(&mut Cursor::new(&mut patched))?;
        assert_eq!(patched.len(), header_len);
        patched.extend_from_slice(&input[header_len..]);

        assert!(matches!(
            Bundle::parse(patched.clone()),
            Err(Error::RegionTooLarge { size, .. }) if size == u32::MAX as u64
        ));

        let options = ParseOptions::builder().max_region_size(64).build();
        assert!(matches!(
            Bundle::parse_with(input, options),
            Err(Error::RegionTooLarge { limit: 64, .. })
        ));

        Ok(())
    }

    #[test]
    fn read_uncompressed_bundle_with_nodes() -> Result<()> {
        let bundle = Bundle::parse(hello_fixture().to_bytes()?)?;
        assert_eq!(bundle.len(), 2);
        assert_eq!(bundle.header().unity_revision, "2019.4.16f1");

        let node = bundle.node_by_path("CAB-hello")?;
        assert_eq!(node.offset, 0);
        assert_eq!(bundle.read_node(node)?.as_ref(), b"Hello World");

        let node = bundle.node_by_index(1)?;
        assert_eq!(node.path, "CAB-hello.resS");
        assert_eq!(bundle.read_node(node)?.as_ref(), b"World Hello");

        Ok(())
    }

    #[test]
    fn read_lz4_bundle_with_blocks_info_at_end() -> Result<()> {
        let input = BundleFixture::builder()
            .version(6)
            .blocks_info_compression(CompressionType::Lz4Hc)
            .block_compression(CompressionType::Lz4)
            .block_size(4)
            .blocks_info_at_end(true)
            .nodes(hello_nodes())
            .build()
            .to_bytes()?;

        let bundle = Bundle::parse(input)?;
        assert_eq!(bundle.blocks().len(), 6);
        assert!(bundle.header().blocks_info_at_end());
        assert_eq!(
            bundle
                .read_node(bundle.node_by_path("CAB-hello.resS")?)?
                .as_ref(),
            b"World Hello"
        );

        Ok(())
    }

    #[test]
    fn read_padded_bundle() -> Result<()> {
        let input = BundleFixture::builder()
            .version(8)
            .needs_padding(true)
            .nodes(hello_nodes())
            .build()
            .to_bytes()?;

        let bundle = Bundle::parse(input)?;
        assert_eq!(bundle.data_offset() % 16, 0);
        assert_eq!(
            bundle.read_node(bundle.node_by_index(0)?)?.as_ref(),
            b"Hello World"
        );

        Ok(())
    }

    #[test]
    fn missing_node_is_reported() -> Result<()> {
        let bundle = Bundle::parse(hello_fixture().to_bytes()?)?;

        assert!(matches!(
            bundle.node_by_path("CAB-missing"),
            Err(Error::NodeNotFound(_))
        ));
        assert!(matches!(
            bundle.node_by_index(2),
            Err(Error::NodeNotFound(_))
        ));

        Ok(())
    }

    #[test]
    fn hash_mismatch_carries_both_digests() -> Result<()> {
        let mut blocks_info = vec![0u8; 24];

        let digest = {
            use md5::{Digest, Md5};
            Md5::digest(&blocks_info[16..])
        };
        blocks_info[..16].copy_from_slice(&digest);
        verify_hash(&blocks_info)?;

        blocks_info[19] ^= 0x01;
        match verify_hash(&blocks_info) {
            Err(Error::HashMismatch { expected, computed }) => {
                assert_eq!(expected.len(), 32);
                assert_eq!(computed.len(), 32);
                assert_ne!(expected, computed);
            }
            other => panic!("unexpected result {other:?}"),
        }

        Ok(())
    }

    #[test]
    fn corrupted_blocks_info_is_rejected() -> Result<()> {
        let fixture = hello_fixture();
        let mut input = fixture.to_bytes()?;
        let (start, _) = fixture.blocks_info_range()?;
        // low byte of the block count
        input[start + 19] ^= 0xFF;

        assert!(matches!(
            Bundle::parse(input.clone()),
            Err(Error::HashMismatch { .. })
        ));

        let options = ParseOptions::builder().verify_hash(false).build();
        assert!(Bundle::parse_with(input, options).is_err());

        Ok(())
    }

    #[traced_test]
    #[test]
    fn unrecorded_hash_is_skipped() -> Result<()> {
        let input = BundleFixture::builder()
            .record_hash(false)
            .nodes(hello_nodes())
            .build()
            .to_bytes()?;

        assert_eq!(Bundle::parse(input)?.len(), 2);
        assert!(logs_contain("hash not recorded"));

        Ok(())
    }

    #[test]
    fn duplicate_nodes_are_rejected() -> Result<()> {
        let input = BundleFixture::builder()
            .nodes(vec![
                FixtureNode::new("CAB-same", vec![1; 4]),
                FixtureNode::new("CAB-same", vec![2; 4]),
            ])
            .build()
            .to_bytes()?;

        assert!(matches!(
            Bundle::parse(input),
            Err(Error::DuplicateNode { index: 1, .. })
        ));
        Ok(())
    }

    #[test]
    fn overlapping_nodes_are_rejected() -> Result<()> {
        let input = BundleFixture::builder()
            .nodes(vec![
                FixtureNode::new("CAB-a", vec![1; 30]),
                FixtureNode::new("CAB-b", Vec::new()).at(10, 20),
            ])
            .build()
            .to_bytes()?;

        assert!(matches!(
            Bundle::parse(input),
            Err(Error::NodeOverlap { .. })
        ));
        Ok(())
    }

    #[test]
    fn node_past_region_is_rejected() -> Result<()> {
        let input = BundleFixture::builder()
            .nodes(vec![
                FixtureNode::new("CAB-a", vec![1; 10]),
                FixtureNode::new("CAB-b", Vec::new()).at(10, 20),
            ])
            .build()
            .to_bytes()?;

        assert!(matches!(
            Bundle::parse(input),
            Err(Error::NodeExceedsDataRegion { region_len: 10, .. })
        ));
        Ok(())
    }

    #[test]
    fn unvalidated_nodes_are_kept() -> Result<()> {
        let input = BundleFixture::builder()
            .nodes(vec![
                FixtureNode::new("CAB-a", vec![1; 30]),
                FixtureNode::new("CAB-b", Vec::new()).at(10, 20),
            ])
            .build()
            .to_bytes()?;

        let options = ParseOptions::builder().validate_nodes(false).build();
        let bundle = Bundle::parse_with(input, options)?;
        assert_eq!(bundle.read_node(bundle.node_by_path("CAB-b")?)?.len(), 20);

        Ok(())
    }

    #[test]
    fn try_parse_reports_every_violation() -> Result<()> {
        let input = BundleFixture::builder()
            .nodes(vec![
                FixtureNode::new("CAB-a", vec![1; 10]),
                FixtureNode::new("CAB-a", Vec::new()).at(5, 20),
            ])
            .build()
            .to_bytes()?;

        let (bundle, errors) = Bundle::try_parse(input);
        assert!(bundle.is_none());
        assert_eq!(errors.len(), 3);
        assert!(errors[0].contains("duplicate node"));
        assert!(errors[1].contains("overlaps"));
        assert!(errors[2].contains("exceeds data region"));

        Ok(())
    }

    #[test]
    fn try_parse_returns_bundle_without_errors() -> Result<()> {
        let (bundle, errors) = Bundle::try_parse(Bytes::from(hello_fixture().to_bytes()?));
        assert!(errors.is_empty());
        assert_eq!(bundle.map(|b| b.len()), Some(2));

        Ok(())
    }

    #[test]
    fn serialized_nodes_skip_resources() -> Result<()> {
        let input = BundleFixture::builder()
            .nodes(vec![
                FixtureNode::new("CAB-hello", b"Hello World".to_vec()),
                FixtureNode::new("CAB-hello.resS", b"World Hello".to_vec()).with_flags(0),
            ])
            .build()
            .to_bytes()?;

        let bundle = Bundle::parse(input)?;
        let paths = bundle
            .serialized_nodes()
            .map(|n| n.path.as_str())
            .collect::<Vec<_>>();

        assert_eq!(paths, vec!["CAB-hello"]);
        Ok(())
    }
}
