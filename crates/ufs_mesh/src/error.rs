//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

use crate::index::IndexFormat;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`ufs_bundle::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Bundle(#[from] ufs_bundle::error::Error),

    /// Transparent wrapper for [`ufs_serialized::error::Error`]
    #[error(transparent)]
    #[diagnostic(transparent)]
    Serialized(#[from] ufs_serialized::error::Error),

    /// Transparent wrapper for [`serde_json::Error`]
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    #[error("invalid unity version {0:?}")]
    #[diagnostic(code(ufs_mesh::invalid_unity_version))]
    InvalidUnityVersion(String),

    /// mesh layouts before 2017 are not read
    #[error("unsupported unity version {0} for mesh objects")]
    #[diagnostic(
        code(ufs_mesh::unsupported_unity_version),
        help("only meshes written by unity 2017.1 and newer can be read")
    )]
    UnsupportedUnityVersion(String),

    #[error("mesh {name:?} uses compression level {compression}")]
    #[diagnostic(
        code(ufs_mesh::compressed_mesh),
        help("compressed meshes are not supported, re-export with mesh compression off")
    )]
    CompressedMesh { name: String, compression: u8 },

    /// the index format field holds something other than 0 or 1
    #[error("unknown index format {0}")]
    #[diagnostic(code(ufs_mesh::unknown_index_format))]
    UnknownIndexFormat(i32),

    #[error("index buffer length {len} is not a multiple of {} ({format:?})", .format.size())]
    #[diagnostic(code(ufs_mesh::index_buffer_length))]
    IndexBufferLength { len: usize, format: IndexFormat },

    /// no index format recorded and the buffer cannot hold 16-bit indices
    #[error("index buffer length {0} fits no index size and no index format is recorded")]
    #[diagnostic(code(ufs_mesh::ambiguous_index_buffer))]
    UnalignedIndexBuffer(usize),

    #[error("unknown vertex format {format} in channel {channel}")]
    #[diagnostic(code(ufs_mesh::unknown_vertex_format))]
    UnknownVertexFormat { channel: usize, format: u8 },

    #[error("vertex data declares {count} channels, at most {max} are supported")]
    #[diagnostic(code(ufs_mesh::too_many_channels))]
    TooManyChannels { count: usize, max: usize },

    #[error("channel {channel} needs {needed} bytes of vertex data but only {len} are present")]
    #[diagnostic(code(ufs_mesh::vertex_data_out_of_bounds))]
    VertexDataOutOfBounds {
        channel: usize,
        needed: usize,
        len: usize,
    },

    #[error("mesh {0:?} has no position channel")]
    MissingPositions(String),

    #[error("submesh {index} ({start}..{start}+{count}) exceeds index buffer of {len} indices")]
    #[diagnostic(code(ufs_mesh::submesh_out_of_range))]
    SubmeshOutOfRange {
        index: usize,
        start: usize,
        count: usize,
        len: usize,
    },

    /// the node named by a mesh's stream data is not in the bundle
    #[error("stream data {0:?} not found in bundle")]
    #[diagnostic(code(ufs_mesh::stream_data_not_found))]
    StreamDataNotFound(String),

    #[error("stream data {path:?} at {offset} with size {size} exceeds resource of {len} bytes")]
    #[diagnostic(code(ufs_mesh::stream_data_out_of_bounds))]
    StreamDataOutOfBounds {
        path: String,
        offset: u64,
        size: u32,
        len: usize,
    },

    /// vertex data lives in an external resource and resolving it was turned off
    #[error("mesh {0:?} keeps its vertex data in an external resource")]
    StreamDataNotResolved(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
