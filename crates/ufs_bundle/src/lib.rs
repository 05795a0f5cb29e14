//! This library handles reading **UnityFS** asset bundle containers.
//!
//! # UnityFS Container Format Documentation
//!
//! A UnityFS bundle packs one or more virtual files ("nodes") behind a directory that describes
//! how the payload was split into storage blocks and how those blocks were compressed. Bundles are
//! typically shipped with the `.bundle`, `.unity3d` or mod specific extensions such as `.hhh`.
//!
//! ## File Structure
//!
//! A bundle consists of a header, the BlocksInfo directory and the storage blocks. The directory
//! either directly follows the header or sits at the very end of the file.
//!
//! | Offset (bytes) | Field                   | Description                                               |
//! |----------------|-------------------------|-----------------------------------------------------------|
//! | 0x0000         | Signature               | 8 bytes: `"UnityFS\0"`                                    |
//! | 0x0008         | Format Version          | 4 bytes: Container format version (6, 7 or 8)             |
//! | 0x000C         | Player Version          | Null-terminated string, usually `"5.x.x"`                 |
//! | ...            | Engine Version          | Null-terminated string, e.g. `"2019.4.16f1"`              |
//! | ...            | Size                    | 8 bytes: Total size of the bundle file                    |
//! | ...            | BlocksInfo Comp. Size   | 4 bytes: Compressed size of the BlocksInfo directory      |
//! | ...            | BlocksInfo Uncomp. Size | 4 bytes: Uncompressed size of the BlocksInfo directory    |
//! | ...            | Flags                   | 4 bytes: Compression and layout flags                     |
//!
//! ### Header
//!
//! - **Signature**: The fixed tag `UnityFS` followed by a null byte.
//! - **Format Version**: Only versions `6..=8` are supported. Starting with version `7` the header
//!   is padded with zeros up to the next 16 byte boundary.
//! - **Flags**:
//!   - `0x3F`: Compression method of the BlocksInfo directory
//!   - `0x40`: Blocks and directory are stored together
//!   - `0x80`: The BlocksInfo directory is stored at the end of the file
//!   - `0x200`: The storage blocks are padded to a 16 byte boundary
//!
//! Reading the header is done in two phases. A fixed probe of four 32-bit words is read first so
//! the format version is known before the version dependent layout is committed to.
//!
//! ### BlocksInfo
//!
//! The directory is compressed as a whole with the method named in the header flags.
//!
//! | Offset (bytes) | Field                  | Description                                             |
//! |----------------|------------------------|---------------------------------------------------------|
//! | 0x0000         | Hash                   | 16 bytes: MD5 digest over the rest of the directory     |
//! | 0x0010         | Block Count            | 4 bytes: Number of storage blocks                       |
//! | 0x0014         | Blocks                 | 10 bytes each: uncompressed size, compressed size, flags|
//! | ...            | Node Count             | 4 bytes: Number of nodes                                |
//! | ...            | Nodes                  | offset (8), size (8), flags (4), null-terminated path   |
//!
//! Node offsets are expressed in the **data region**: the concatenation of all decompressed
//! storage blocks in table order, not in the file.
//!
//! ## Additional Information
//!
//! - **Endianness**: Big-endian for all multi-byte integers
//! - **Compression Methods**:
//!   - `0`: None
//!   - `1`: LZMA (not supported)
//!   - `2`: LZ4
//!   - `3`: LZ4HC
//!   - `4`: LZHAM (not supported)
//!

pub mod compression;
pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod node;
pub mod read;
pub mod region;
pub mod report;
pub mod types;

pub use compression::CompressionType;
pub use read::{Bundle, ParseOptions};
pub use region::DataRegion;
pub use report::BundleReport;
pub use types::{BlocksInfo, BundleHeader, NodeInfo, StorageBlock};
