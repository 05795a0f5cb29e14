//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

use crate::compression::CompressionType;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// Transparent wrapper for [`serde_json::Error`]
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// buffer too small to hold a bundle header
    #[error("corrupted header: buffer too small ({len} bytes, need at least {needed})")]
    #[diagnostic(code(ufs_bundle::corrupted_header))]
    CorruptedHeader { len: usize, needed: usize },

    /// wrong magic tag
    #[error("invalid bundle signature {0:?}")]
    #[diagnostic(
        code(ufs_bundle::invalid_signature),
        help("this file is not a UnityFS bundle")
    )]
    InvalidBundleSignature(String),

    /// format version outside of the supported range
    #[error("unsupported bundle version {0}")]
    #[diagnostic(code(ufs_bundle::unsupported_version))]
    UnsupportedVersion(u32),

    /// BlocksInfo digest does not match its payload
    #[error("blocks info hash mismatch: expected {expected}, computed {computed}")]
    #[diagnostic(code(ufs_bundle::hash_mismatch), help("the bundle is corrupted"))]
    HashMismatch { expected: String, computed: String },

    /// BlocksInfo location lies outside of the file
    #[error("blocks info at {offset} with size {size} exceeds file of {file_len} bytes")]
    BlocksInfoOutOfBounds { offset: u64, size: u64, file_len: u64 },

    /// data region would start past the end of the file
    #[error("data region at {offset} starts past the end of file of {file_len} bytes")]
    #[diagnostic(code(ufs_bundle::data_offset_out_of_bounds))]
    DataOffsetOutOfBounds { offset: u64, file_len: u64 },

    /// storage block lies outside of the file
    #[error("storage block {index} at {offset} with size {size} exceeds file of {file_len} bytes")]
    BlockOutOfBounds {
        index: usize,
        offset: u64,
        size: u64,
        file_len: u64,
    },

    /// codec that cannot be decoded
    #[error("compression not supported: {0}")]
    #[diagnostic(code(ufs_bundle::unsupported_compression))]
    UnsupportedCompression(CompressionType),

    /// decompressed data does not have the declared length
    #[error("decompressed size mismatch: expected {expected} bytes, got {actual}")]
    DecompressedSizeMismatch { expected: usize, actual: usize },

    /// Transparent wrapper for [`lz4_flex::block::DecompressError`]
    #[error(transparent)]
    Lz4Error(#[from] lz4_flex::block::DecompressError),

    /// declared data region is larger than the configured limit
    #[error("data region of {size} bytes exceeds limit of {limit} bytes")]
    RegionTooLarge { size: u64, limit: u64 },

    /// two nodes share a path
    #[error("duplicate node {path:?} at index {index} (first seen at index {first_index})")]
    #[diagnostic(code(ufs_bundle::duplicate_node))]
    DuplicateNode {
        path: String,
        index: usize,
        first_index: usize,
    },

    /// two node byte ranges intersect
    #[error(
        "node {first:?} [{}, {}) overlaps node {second:?} [{}, {})",
        .first_range.0, .first_range.1, .second_range.0, .second_range.1
    )]
    #[diagnostic(code(ufs_bundle::node_overlap))]
    NodeOverlap {
        first: String,
        first_range: (u64, u64),
        second: String,
        second_range: (u64, u64),
    },

    /// node range lies outside of the data region
    #[error("node {path:?} exceeds data region: [{offset}, {offset} + {size}) with region of {region_len} bytes")]
    #[diagnostic(code(ufs_bundle::node_exceeds_data_region))]
    NodeExceedsDataRegion {
        path: String,
        offset: u64,
        size: u64,
        region_len: u64,
    },

    /// unable to find requested node
    #[error("unable to find requested node")]
    NodeNotFound(#[from] NodeNotFoundError),
}

/// Error type to provide further information when a node has not been found
#[derive(Error, Diagnostic, Debug)]
pub enum NodeNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by path {0}
    #[error("by path {0}")]
    Path(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
