//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

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

    /// buffer too small to hold a serialized file header
    #[error("corrupted header: buffer too small ({len} bytes, need at least {needed})")]
    #[diagnostic(code(ufs_serialized::corrupted_header))]
    CorruptedHeader { len: usize, needed: usize },

    /// format version outside of the supported range
    #[error("invalid serialized file version {0}")]
    #[diagnostic(
        code(ufs_serialized::invalid_version),
        help("only serialized file versions 9 to 30 are supported")
    )]
    InvalidVersion(u32),

    /// endianness byte is neither 0 nor 1
    #[error("endianness mismatch: invalid endianness byte {0}")]
    #[diagnostic(code(ufs_serialized::endianness_mismatch))]
    EndiannessMismatch(u8),

    /// a read reached past the end of the buffer
    #[error("read past end: {needed} bytes at {position} with buffer of {len} bytes")]
    #[diagnostic(code(ufs_serialized::read_past_end))]
    ReadPastEnd {
        position: usize,
        needed: usize,
        len: usize,
    },

    /// a length prefix is negative
    #[error("invalid length {length} at {position}")]
    InvalidLength { position: usize, length: i32 },

    /// a legacy type tree nests deeper than a node level can record
    #[error("type tree node at {position} nested deeper than {max} levels")]
    #[diagnostic(code(ufs_serialized::type_tree_too_deep))]
    TypeTreeTooDeep { position: usize, max: u8 },

    /// an object refers to a type that is not in the type table
    #[error("type index {index} out of range, file declares {count} types")]
    TypeIndexOutOfRange { index: i32, count: usize },

    /// object byte range lies outside of the file
    #[error("object {path_id} at {start} with size {size} exceeds file of {len} bytes")]
    #[diagnostic(code(ufs_serialized::object_out_of_bounds))]
    ObjectOutOfBounds {
        path_id: i64,
        start: u64,
        size: u32,
        len: usize,
    },
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
