//! This library handles reading Unity **serialized files**, the per-node format stored inside
//! UnityFS bundles.
//!
//! # Serialized File Format Documentation
//!
//! A serialized file consists of a header, a metadata section describing types and objects, and a
//! data section holding the raw bytes of every object.
//!
//! ## Header
//!
//! The header is always stored big-endian.
//!
//! | Offset (bytes) | Field            | Description                                               |
//! |----------------|------------------|-----------------------------------------------------------|
//! | 0x0000         | Metadata Size    | 4 bytes: Size of the metadata section                      |
//! | 0x0004         | File Size        | 4 bytes: Size of the whole file                            |
//! | 0x0008         | Version          | 4 bytes: Serialized file format version (9 to 30)          |
//! | 0x000C         | Data Offset      | 4 bytes: Offset of the data section                        |
//! | 0x0010         | Endianness       | 1 byte: 0 for little endian metadata, 1 for big endian     |
//! | 0x0011         | Reserved         | 3 bytes                                                    |
//!
//! Starting with version `22` the size fields above are zero and stored again after the
//! reserved bytes with wider types:
//!
//! | Offset (bytes) | Field            | Description                                               |
//! |----------------|------------------|-----------------------------------------------------------|
//! | 0x0014         | Metadata Size    | 4 bytes                                                    |
//! | 0x0018         | File Size        | 8 bytes                                                    |
//! | 0x0020         | Data Offset      | 8 bytes                                                    |
//! | 0x0028         | Reserved         | 8 bytes                                                    |
//!
//! ## Metadata
//!
//! Stored in the byte order selected by the endianness byte. In order:
//!
//! - Unity version, null-terminated string
//! - Target platform, 4 bytes
//! - Type tree enabled, 1 byte (version 13+)
//! - Type table: count followed by one entry per class, each optionally carrying a type tree
//! - Big id enabled, 4 bytes (versions 7 to 13)
//! - Object table: count followed by one record per object. Records are aligned to 4 bytes from
//!   version 14, path ids widen to 8 bytes at version 14 and data offsets at version 22
//! - Script types (version 11+)
//! - External references: GUID, type and path of each file this one depends on
//! - Reference types (version 20+)
//! - User information, null-terminated string
//!
//! Every version dependent choice is captured once in [`layout::FieldLayout`].
//!
//! ## Data
//!
//! Object data starts at the data offset from the header. Each object record locates its bytes
//! relative to that offset.
//!

pub mod detect;
pub mod error;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod header;
pub mod layout;
pub mod metadata;
pub mod read;
pub mod reader;
pub mod report;
pub mod typetree;
pub mod types;

pub use detect::{detect_renderable, detect_renderable_class_ids};
pub use header::SerializedFileHeader;
pub use read::SerializedFile;
pub use reader::EndianReader;
pub use report::ObjectSummary;
pub use types::{ClassId, ExternalReference, ObjectInfo, SerializedType};
