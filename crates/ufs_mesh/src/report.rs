//! Per mesh diagnostics for operators.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use tracing::instrument;
use ufs_bundle::Bundle;

use crate::{
    error::Result,
    extract::{read_meshes, ExtractOptions, MeshEntry},
    object::StreamingInfo,
};

/// What a mesh object carries, without building its geometry
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MeshDiagnostics {
    pub node: String,
    pub path_id: i64,
    pub name: String,
    pub unity_version: String,
    pub vertex_count: u32,
    pub index_buffer_len: usize,
    pub vertex_data_len: usize,
    /// Channels with a non zero dimension
    pub channel_count: usize,
    pub index_format: Option<i32>,
    pub sub_mesh_count: usize,
    pub mesh_compression: u8,
    pub stream: Option<StreamingInfo>,
    /// Vertex buffer was loaded from a resource node
    pub external: bool,
    /// Has vertices, indices and somewhere to read the vertices from
    pub renderable: bool,
}

impl From<&MeshEntry> for MeshDiagnostics {
    fn from(entry: &MeshEntry) -> Self {
        let mesh = &entry.mesh;
        let stream = mesh.stream_data.clone().filter(|s| !s.is_empty());
        let vertex_data_len = mesh.vertex_data.data.len();
        let renderable = mesh.vertex_data.vertex_count > 0
            && !mesh.index_buffer.is_empty()
            && (vertex_data_len > 0 || stream.is_some());

        MeshDiagnostics {
            node: entry.node.clone(),
            path_id: entry.path_id,
            name: mesh.name.clone(),
            unity_version: entry.version.to_string(),
            vertex_count: mesh.vertex_data.vertex_count,
            index_buffer_len: mesh.index_buffer.len(),
            vertex_data_len,
            channel_count: mesh.vertex_data.channels.iter().filter(|c| c.is_used()).count(),
            index_format: mesh.index_format,
            sub_mesh_count: mesh.sub_meshes.len(),
            mesh_compression: mesh.mesh_compression,
            stream,
            external: entry.external,
            renderable,
        }
    }
}

impl fmt::Display for MeshDiagnostics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{} {:?} ({}) vertices={} index_bytes={} vertex_bytes={} channels={} submeshes={}",
            self.node,
            self.path_id,
            self.name,
            self.unity_version,
            self.vertex_count,
            self.index_buffer_len,
            self.vertex_data_len,
            self.channel_count,
            self.sub_mesh_count,
        )?;
        if let Some(stream) = &self.stream {
            write!(f, " stream={}@{}+{}", stream.path, stream.offset, stream.size)?;
        }
        if !self.renderable {
            write!(f, " [not renderable]")?;
        }
        Ok(())
    }
}

/// Diagnostics for every mesh in a bundle
///
/// Stream data is left unresolved so meshes whose resource is missing are still reported.
#[instrument(skip(data), err)]
pub fn diagnose_meshes(data: impl Into<Bytes>) -> Result<Vec<MeshDiagnostics>> {
    let options = ExtractOptions::builder().resolve_stream_data(false).build();
    let bundle = Bundle::parse_with(data, options.bundle)?;
    Ok(read_meshes(&bundle, &options)?
        .iter()
        .map(MeshDiagnostics::from)
        .collect())
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use ufs_bundle::fixture::{BundleFixture, FixtureNode};
    use ufs_serialized::{
        fixture::{FixtureObject, SerializedFileFixture},
        ClassId,
    };

    use super::diagnose_meshes;
    use crate::error::Result;
    use crate::fixture::{FixtureVertices, MeshFixture};
    use crate::object::StreamingInfo;

    #[test]
    fn reports_inline_and_streamed_meshes() -> Result<()> {
        let inline = MeshFixture::builder()
            .name("inline")
            .vertices(FixtureVertices::quad())
            .indices(vec![0, 1, 2])
            .build();
        let streamed = MeshFixture::builder()
            .name("streamed")
            .vertices(FixtureVertices::quad())
            .indices(vec![0, 1, 2])
            .stream_data(StreamingInfo {
                offset: 0,
                size: 64,
                path: "archive:/CAB-x/CAB-x.resS".to_owned(),
            })
            .build();
        let empty = MeshFixture::builder().name("empty").build();

        let file = SerializedFileFixture::builder()
            .objects(vec![
                FixtureObject::new(1, ClassId::Mesh, inline.to_bytes()?),
                FixtureObject::new(2, ClassId::Mesh, streamed.to_bytes()?),
                FixtureObject::new(3, ClassId::Mesh, empty.to_bytes()?),
            ])
            .build()
            .to_bytes()?;
        let input = BundleFixture::builder()
            .nodes(vec![FixtureNode::new("CAB-x", file)])
            .build()
            .to_bytes()?;

        let report = diagnose_meshes(input)?;
        assert_eq!(report.len(), 3);

        assert_eq!(report[0].name, "inline");
        assert_eq!(report[0].vertex_count, 4);
        assert_eq!(report[0].index_buffer_len, 6);
        assert_eq!(report[0].channel_count, 4);
        assert_eq!(report[0].index_format, Some(0));
        assert!(report[0].renderable);
        assert!(report[0].stream.is_none());

        assert_eq!(report[1].vertex_data_len, 0);
        assert!(report[1].renderable);
        assert!(!report[1].external);
        assert!(report[1].to_string().contains("stream=archive:/CAB-x/CAB-x.resS@0+64"));

        assert!(!report[2].renderable);
        assert!(report[2].to_string().ends_with("[not renderable]"));

        let json = serde_json::to_value(&report)?;
        assert_eq!(json[0]["path_id"], 1);
        assert_eq!(json[1]["stream"]["size"], 64);

        Ok(())
    }
}
