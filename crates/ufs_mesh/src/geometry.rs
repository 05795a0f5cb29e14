//! Renderer agnostic geometry built from a [`MeshObject`].

use binrw::Endian;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    index::{decode_indices, IndexFormat},
    object::{MeshObject, SubMesh},
    vertex::Channel,
    version::UnityVersion,
};

/// A contiguous run of [`MeshGeometryDto::indices`] drawn with one material
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmeshGroup {
    pub start: u32,
    pub count: u32,
    pub material_index: u32,
}

/// Flat geometry arrays of one mesh
///
/// Positions and normals hold 3 floats per vertex, texture coordinates 2 and colors 4 (RGBA in
/// `0..=1`). Indices are absolute: submesh base vertices are already applied.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeshGeometryDto {
    pub name: String,
    pub positions: Vec<f32>,
    pub normals: Option<Vec<f32>>,
    pub uvs: Option<Vec<f32>>,
    pub colors: Option<Vec<f32>>,
    pub indices: Vec<u32>,
    pub groups: Vec<SubmeshGroup>,
    pub vertex_count: usize,
    pub triangle_count: usize,
    #[serde(rename = "uses16BitIndices")]
    pub uses_16_bit_indices: bool,
}

impl MeshGeometryDto {
    /// Build geometry from a mesh whose vertex buffer is already in place
    #[instrument(skip_all, fields(name = %mesh.name), err)]
    pub fn from_mesh(
        mesh: &MeshObject,
        version: &UnityVersion,
        endian: Endian,
    ) -> Result<MeshGeometryDto> {
        if mesh.mesh_compression != 0 {
            return Err(Error::CompressedMesh {
                name: mesh.name.clone(),
                compression: mesh.mesh_compression,
            });
        }

        let vertex_data = &mesh.vertex_data;
        let channel = |channel: Channel, components: usize| -> Result<Option<Vec<f32>>> {
            Ok(vertex_data
                .read_channel(channel, version, endian)?
                .map(|values| values.components(components)))
        };

        let positions = match channel(Channel::Position, 3)? {
            Some(positions) => positions,
            None if vertex_data.vertex_count == 0 => Vec::new(),
            None => return Err(Error::MissingPositions(mesh.name.clone())),
        };
        let normals = channel(Channel::Normal, 3)?;
        let uvs = channel(Channel::TexCoord(0), 2)?;
        let colors = channel(Channel::Color, 4)?;

        let (buffer, format) = decode_indices(&mesh.index_buffer, mesh.index_format, endian)?;
        let (indices, groups, triangle_count) = slice_sub_meshes(&mesh.sub_meshes, &buffer, format)?;

        debug!(
            vertices = vertex_data.vertex_count,
            indices = indices.len(),
            groups = groups.len(),
            "reconstructed mesh"
        );

        Ok(MeshGeometryDto {
            name: mesh.name.clone(),
            positions,
            normals,
            uvs,
            colors,
            indices,
            groups,
            vertex_count: vertex_data.vertex_count as usize,
            triangle_count,
            uses_16_bit_indices: format == IndexFormat::UInt16,
        })
    }

    /// Total of all group counts, equal to `indices.len()` for every reconstructed mesh
    pub fn grouped_index_count(&self) -> usize {
        self.groups.iter().map(|g| g.count as usize).sum()
    }
}

/// Cut the index buffer into one group per submesh, offsetting each index by its base vertex
///
/// Without submeshes the whole buffer becomes a single triangle list group.
pub fn slice_sub_meshes(
    sub_meshes: &[SubMesh],
    buffer: &[u32],
    format: IndexFormat,
) -> Result<(Vec<u32>, Vec<SubmeshGroup>, usize)> {
    if sub_meshes.is_empty() {
        let group = SubmeshGroup {
            start: 0,
            count: buffer.len() as u32,
            material_index: 0,
        };
        return Ok((buffer.to_vec(), vec![group], buffer.len() / 3));
    }

    let mut indices = Vec::with_capacity(buffer.len());
    let mut groups = Vec::with_capacity(sub_meshes.len());
    let mut triangle_count = 0;
    for (index, sub_mesh) in sub_meshes.iter().enumerate() {
        let start = sub_mesh.first_byte as usize / format.size();
        let count = sub_mesh.index_count as usize;
        let slice = start
            .checked_add(count)
            .and_then(|end| buffer.get(start..end))
            .ok_or(Error::SubmeshOutOfRange {
                index,
                start,
                count,
                len: buffer.len(),
            })?;

        groups.push(SubmeshGroup {
            start: indices.len() as u32,
            count: count as u32,
            material_index: index as u32,
        });
        indices.extend(slice.iter().map(|i| i.saturating_add(sub_mesh.base_vertex)));
        if sub_mesh.topology == SubMesh::TRIANGLES {
            triangle_count += count / 3;
        }
    }
    Ok((indices, groups, triangle_count))
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use super::{MeshGeometryDto, SubmeshGroup};
    use crate::error::{Error, Result};
    use crate::fixture::{FixtureVertices, MeshFixture};
    use crate::index::IndexFormat;
    use crate::object::{MeshObject, SubMesh};
    use crate::version::UnityVersion;

    fn reconstruct(fixture: &MeshFixture) -> Result<MeshGeometryDto> {
        let mesh = MeshObject::read(&fixture.to_bytes()?, &fixture.version, fixture.endian)?;
        MeshGeometryDto::from_mesh(&mesh, &fixture.version, fixture.endian)
    }

    fn sub_mesh(first_byte: u32, index_count: u32, base_vertex: u32) -> SubMesh {
        SubMesh {
            first_byte,
            index_count,
            base_vertex,
            ..Default::default()
        }
    }

    #[test]
    fn quad() -> Result<()> {
        let geometry = reconstruct(
            &MeshFixture::builder()
                .name("quad")
                .vertices(FixtureVertices::quad())
                .indices(vec![0, 1, 2, 2, 1, 3])
                .build(),
        )?;

        assert_eq!(geometry.name, "quad");
        assert_eq!(geometry.vertex_count, 4);
        assert_eq!(
            geometry.positions,
            vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0, 1.0, 1.0, 0.0]
        );
        assert_eq!(geometry.normals.as_ref().map(Vec::len), Some(12));
        assert_eq!(
            geometry.uvs,
            Some(vec![0.0, 0.0, 1.0, 0.0, 0.0, 1.0, 1.0, 1.0])
        );
        assert_eq!(
            geometry.colors.as_ref().map(|c| c[..4].to_vec()),
            Some(vec![1.0, 0.0, 0.0, 1.0])
        );
        assert_eq!(geometry.indices, vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(
            geometry.groups,
            vec![SubmeshGroup {
                start: 0,
                count: 6,
                material_index: 0
            }]
        );
        assert_eq!(geometry.triangle_count, 2);
        assert!(geometry.uses_16_bit_indices);

        Ok(())
    }

    #[test]
    fn base_vertex_is_applied() -> Result<()> {
        let geometry = reconstruct(
            &MeshFixture::builder()
                .vertices(FixtureVertices::quad())
                .indices(vec![0, 1, 2, 0, 1, 2])
                .sub_meshes(vec![sub_mesh(0, 3, 0), sub_mesh(6, 3, 1)])
                .build(),
        )?;

        assert_eq!(geometry.indices, vec![0, 1, 2, 1, 2, 3]);
        assert_eq!(
            geometry.groups,
            vec![
                SubmeshGroup {
                    start: 0,
                    count: 3,
                    material_index: 0
                },
                SubmeshGroup {
                    start: 3,
                    count: 3,
                    material_index: 1
                },
            ]
        );

        Ok(())
    }

    #[test]
    fn group_counts_sum_to_index_count() -> Result<()> {
        let indices = (0..24).map(|i| i % 4).collect::<Vec<u32>>();
        for format in [IndexFormat::UInt16, IndexFormat::UInt32] {
            let size = format.size() as u32;
            for split in [vec![24], vec![12, 12], vec![3, 9, 6, 6]] {
                let mut first = 0;
                let sub_meshes = split
                    .iter()
                    .map(|count| {
                        let sub_mesh = sub_mesh(first * size, *count, 0);
                        first += count;
                        sub_mesh
                    })
                    .collect::<Vec<_>>();

                let geometry = reconstruct(
                    &MeshFixture::builder()
                        .vertices(FixtureVertices::quad())
                        .indices(indices.clone())
                        .index_format(format)
                        .sub_meshes(sub_meshes)
                        .build(),
                )?;

                assert_eq!(geometry.grouped_index_count(), geometry.indices.len());
                assert_eq!(geometry.indices.len(), 24);
                assert_eq!(geometry.uses_16_bit_indices, format == IndexFormat::UInt16);
            }
        }

        Ok(())
    }

    #[test]
    fn big_endian_mesh() -> Result<()> {
        let geometry = reconstruct(
            &MeshFixture::builder()
                .endian(Endian::Big)
                .vertices(FixtureVertices::quad())
                .indices(vec![0, 1, 2, 2, 1, 3])
                .index_format(IndexFormat::UInt32)
                .build(),
        )?;

        assert_eq!(geometry.indices, vec![0, 1, 2, 2, 1, 3]);
        assert_eq!(geometry.positions[3], 1.0);
        assert!(!geometry.uses_16_bit_indices);

        Ok(())
    }

    #[test]
    fn legacy_versions_decode_colors() -> Result<()> {
        for version in ["2017.2.0f3", "2018.4.36f1"] {
            let version: UnityVersion = version.parse()?;
            let geometry = reconstruct(
                &MeshFixture::builder()
                    .version(version)
                    .vertices(FixtureVertices::quad())
                    .indices(vec![0, 1, 2])
                    .build(),
            )?;

            assert_eq!(
                geometry.colors.as_ref().map(|c| c[4..8].to_vec()),
                Some(vec![0.0, 1.0, 0.0, 1.0]),
                "{version}"
            );
            assert_eq!(geometry.uvs.as_ref().map(Vec::len), Some(8));
        }

        Ok(())
    }

    #[test]
    fn submesh_past_the_buffer() {
        let result = reconstruct(
            &MeshFixture::builder()
                .vertices(FixtureVertices::quad())
                .indices(vec![0, 1, 2])
                .sub_meshes(vec![sub_mesh(2, 3, 0)])
                .build(),
        );

        assert!(matches!(
            result,
            Err(Error::SubmeshOutOfRange {
                index: 0,
                start: 1,
                count: 3,
                len: 3
            })
        ));
    }

    #[test]
    fn compressed_meshes_are_rejected() {
        let result = reconstruct(
            &MeshFixture::builder()
                .name("packed")
                .vertices(FixtureVertices::quad())
                .mesh_compression(2)
                .build(),
        );

        assert!(matches!(
            result,
            Err(Error::CompressedMesh { name, compression: 2 }) if name == "packed"
        ));
    }

    #[test]
    fn unknown_index_format_from_object() {
        let mut fixture = MeshFixture::builder()
            .vertices(FixtureVertices::quad())
            .indices(vec![0, 1, 2])
            .build();
        fixture.index_buffer = Some(vec![0; 6]);

        let bytes = fixture.to_bytes().unwrap();
        let mut mesh = MeshObject::read(&bytes, &fixture.version, Endian::Little).unwrap();
        mesh.index_format = Some(5);

        assert!(matches!(
            MeshGeometryDto::from_mesh(&mesh, &fixture.version, Endian::Little),
            Err(Error::UnknownIndexFormat(5))
        ));
    }

    #[test]
    fn serializes_for_exporters() -> Result<()> {
        let geometry = reconstruct(
            &MeshFixture::builder()
                .vertices(FixtureVertices::quad())
                .indices(vec![0, 1, 2])
                .build(),
        )?;

        let json = serde_json::to_value(&geometry)?;
        assert_eq!(json["groups"][0]["materialIndex"], 0);
        assert_eq!(json["vertexCount"], 4);
        assert_eq!(json["uses16BitIndices"], true);
        assert_eq!(json["triangleCount"], 1);

        Ok(())
    }
}
