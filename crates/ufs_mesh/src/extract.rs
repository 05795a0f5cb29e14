//! End to end mesh extraction: bundle bytes in, geometry out.

use binrw::Endian;
use bon::Builder;
use bytes::Bytes;
use tracing::{debug, instrument};
use ufs_bundle::{Bundle, NodeInfo, ParseOptions};
use ufs_serialized::{ClassId, SerializedFile};

use crate::{
    error::{Error, Result},
    geometry::MeshGeometryDto,
    object::{MeshObject, StreamingInfo},
    version::{self, UnityVersion},
};

/// Options for [`extract_meshes_with`]
#[derive(Debug, Clone, Copy, Builder)]
pub struct ExtractOptions {
    /// Visit every serialized file in the bundle, otherwise only the first
    #[builder(default = true)]
    pub all_nodes: bool,

    /// Load vertex buffers kept in `.resS` resources of the same bundle. When off such meshes are
    /// still read, but building their geometry fails.
    #[builder(default = true)]
    pub resolve_stream_data: bool,

    #[builder(default)]
    pub bundle: ParseOptions,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// A mesh object together with where it was found and how to decode it
#[derive(Debug, Clone)]
pub struct MeshEntry {
    /// Path of the serialized file node
    pub node: String,
    pub path_id: i64,
    pub version: UnityVersion,
    pub endian: Endian,
    pub mesh: MeshObject,
    /// The vertex buffer was loaded from a resource node
    pub external: bool,
}

impl MeshEntry {
    /// Fails with [`Error::StreamDataNotResolved`] when the vertex buffer was left in its resource
    pub fn geometry(&self) -> Result<MeshGeometryDto> {
        if self.mesh.has_external_vertices() {
            return Err(Error::StreamDataNotResolved(self.mesh.name.clone()));
        }
        MeshGeometryDto::from_mesh(&self.mesh, &self.version, self.endian)
    }
}

/// Reconstruct every mesh in a bundle with default options
pub fn extract_meshes(data: impl Into<Bytes>) -> Result<Vec<MeshGeometryDto>> {
    extract_meshes_with(data, ExtractOptions::default())
}

#[instrument(skip(data), err)]
pub fn extract_meshes_with(
    data: impl Into<Bytes>,
    options: ExtractOptions,
) -> Result<Vec<MeshGeometryDto>> {
    let bundle = Bundle::parse_with(data, options.bundle)?;
    read_meshes(&bundle, &options)?
        .iter()
        .map(MeshEntry::geometry)
        .collect()
}

/// Read the mesh objects of a parsed bundle without building geometry
pub fn read_meshes(bundle: &Bundle, options: &ExtractOptions) -> Result<Vec<MeshEntry>> {
    let nodes = bundle
        .serialized_nodes()
        .take(if options.all_nodes { usize::MAX } else { 1 })
        .collect::<Vec<_>>();

    let mut entries = Vec::new();
    for node in nodes {
        let file = SerializedFile::parse(bundle.read_node(node)?)?;
        let version = version::resolve([
            file.unity_version(),
            bundle.header().unity_revision.as_str(),
        ])?;
        let endian = file.header().endian();
        debug!(node = %node.path, %version, "reading meshes");

        for object in file.objects_by_class_id(ClassId::Mesh) {
            let data = file.read_object_data(object)?;
            let mut mesh = MeshObject::read(&data, &version, endian)?;

            let external = mesh.has_external_vertices() && options.resolve_stream_data;
            if external {
                if let Some(stream) = &mesh.stream_data {
                    mesh.vertex_data.data = resolve_stream_data(bundle, stream)?.to_vec();
                }
            }

            entries.push(MeshEntry {
                node: node.path.clone(),
                path_id: object.path_id,
                version,
                endian,
                mesh,
                external,
            });
        }
    }
    Ok(entries)
}

/// Load the bytes a [`StreamingInfo`] points at from the bundle's resource nodes
pub fn resolve_stream_data(bundle: &Bundle, stream: &StreamingInfo) -> Result<Bytes> {
    let name = stream.file_name();
    let node = bundle
        .index_for_path(name)
        .and_then(|index| bundle.nodes().get(index))
        .or_else(|| bundle.nodes().iter().find(|n| file_name(n) == name))
        .ok_or_else(|| Error::StreamDataNotFound(stream.path.clone()))?;

    let resource = bundle.read_node(node)?;
    let out_of_bounds = || Error::StreamDataOutOfBounds {
        path: stream.path.clone(),
        offset: stream.offset,
        size: stream.size,
        len: resource.len(),
    };
    let start = usize::try_from(stream.offset).map_err(|_| out_of_bounds())?;
    let end = start
        .checked_add(stream.size as usize)
        .filter(|end| *end <= resource.len())
        .ok_or_else(out_of_bounds)?;
    Ok(resource.slice(start..end))
}

fn file_name(node: &NodeInfo) -> &str {
    node.path.rsplit('/').next().unwrap_or(&node.path)
}
