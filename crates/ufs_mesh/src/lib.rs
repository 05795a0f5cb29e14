//! This library reconstructs mesh geometry from the `Mesh` objects of Unity serialized files.
//!
//! # Mesh Format Documentation
//!
//! A mesh object stores its geometry in two buffers:
//!
//! - the **index buffer**, 16-bit or 32-bit unsigned indices as selected by the index format
//!   field (recorded from 2017.4, guessed from the buffer length before that)
//! - the **vertex buffer**, described by a channel table. Each channel names the stream it lives
//!   in, its byte offset within a vertex, its numeric format and its dimension
//!
//! Submeshes select runs of the index buffer:
//!
//! | Field         | Description                                              |
//! |---------------|----------------------------------------------------------|
//! | First Byte    | Byte offset of the first index in the index buffer       |
//! | Index Count   | Number of indices                                        |
//! | Topology      | 0 for triangle lists                                     |
//! | Base Vertex   | Added to every index of the submesh (2017.3+)            |
//!
//! From 2018.3 the vertex buffer may be empty in the object and kept in a `.resS` resource
//! node of the same bundle instead, located by the mesh's stream data.
//!
//! # Example
//!
//! ```no_run
//! let bytes = std::fs::read("level.bundle")?;
//! for mesh in ufs_mesh::extract_meshes(bytes)? {
//!     println!("{}: {} triangles", mesh.name, mesh.triangle_count);
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod extract;
#[cfg(any(test, feature = "fixture"))]
pub mod fixture;
pub mod geometry;
pub mod index;
pub mod object;
pub mod report;
pub mod version;
pub mod vertex;

pub use extract::{extract_meshes, extract_meshes_with, read_meshes, ExtractOptions, MeshEntry};
pub use geometry::{MeshGeometryDto, SubmeshGroup};
pub use index::IndexFormat;
pub use object::MeshObject;
pub use report::{diagnose_meshes, MeshDiagnostics};
pub use version::UnityVersion;
