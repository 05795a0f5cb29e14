//! Reading `Mesh` objects (class id 43) from their serialized bytes.
//!
//! Only layouts written by 2017.1 and newer are understood. Fields are read in declaration order,
//! with the version gates below:
//!
//! | Since    | Fields                                                               |
//! |----------|----------------------------------------------------------------------|
//! | 2017.3   | submesh base vertex                                                  |
//! | 2017.4   | index format (also 2017.3.1p1 and later patches)                     |
//! | 2018.1   | 14 entry channel table, current channel mask dropped                 |
//! | 2018.2   | mesh metrics                                                         |
//! | 2018.3   | external stream data                                                 |
//! | 2019.1   | bone bounding boxes, variable bone count weights                     |
//! | 2020.1   | 64-bit stream data offset                                            |
//! | 2022.1   | cooking options                                                      |

use binrw::Endian;
use serde::Serialize;
use tracing::{instrument, trace};
use ufs_serialized::EndianReader;

use crate::{
    error::{Error, Result},
    vertex::{ChannelInfo, VertexData, MAX_CHANNELS},
    version::UnityVersion,
};

/// Axis aligned box stored as center and extent
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct Aabb {
    pub center: [f32; 3],
    pub extent: [f32; 3],
}

/// Axis aligned box stored as corners
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct MinMaxAabb {
    pub min: [f32; 3],
    pub max: [f32; 3],
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct SubMesh {
    /// Offset of the first index, in bytes
    pub first_byte: u32,
    pub index_count: u32,
    /// 0 triangles, 2 quads, 3 lines, 4 line strip, 5 points
    pub topology: i32,
    /// Added to every index of the submesh
    pub base_vertex: u32,
    pub first_vertex: u32,
    pub vertex_count: u32,
    pub local_aabb: Aabb,
}

impl SubMesh {
    pub const TRIANGLES: i32 = 0;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlendShapeChannel {
    pub name: String,
    pub name_hash: u32,
    pub frame_index: i32,
    pub frame_count: i32,
}

/// Blend shape tables; only the channel names are kept, the per vertex deltas are skipped
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BlendShapeData {
    pub vertex_count: usize,
    pub shape_count: usize,
    pub channels: Vec<BlendShapeChannel>,
    pub full_weights: Vec<f32>,
}

/// Location of data kept in a resource file next to the serialized file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StreamingInfo {
    pub offset: u64,
    pub size: u32,
    /// Usually `archive:/CAB-<hash>/CAB-<hash>.resS`
    pub path: String,
}

impl StreamingInfo {
    pub fn is_empty(&self) -> bool {
        self.size == 0 || self.path.is_empty()
    }

    /// Last path component, which is how the resource is named inside the bundle
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

/// A decoded mesh object
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshObject {
    pub name: String,
    pub sub_meshes: Vec<SubMesh>,
    pub shapes: BlendShapeData,
    pub bind_poses: Vec<[f32; 16]>,
    pub bone_name_hashes: Vec<u32>,
    pub root_bone_name_hash: u32,
    pub bones_aabb: Vec<MinMaxAabb>,
    pub variable_bone_count_weights: Vec<u32>,
    /// 0 when off
    pub mesh_compression: u8,
    pub is_readable: bool,
    pub keep_vertices: bool,
    pub keep_indices: bool,
    /// `None` for versions that do not record it
    pub index_format: Option<i32>,
    pub index_buffer: Vec<u8>,
    pub vertex_data: VertexData,
    pub local_aabb: Aabb,
    pub mesh_usage_flags: i32,
    pub cooking_options: Option<i32>,
    pub baked_convex_collision_mesh: Vec<u8>,
    pub baked_triangle_collision_mesh: Vec<u8>,
    pub mesh_metrics: Option<[f32; 2]>,
    pub stream_data: Option<StreamingInfo>,
}

impl MeshObject {
    /// Decode a mesh from the bytes of its object
    #[instrument(skip(data, version), fields(len = data.len(), version = %version), err)]
    pub fn read(data: &[u8], version: &UnityVersion, endian: Endian) -> Result<MeshObject> {
        if version.major < 2017 {
            return Err(Error::UnsupportedUnityVersion(version.to_string()));
        }

        let mut reader = EndianReader::new(data, endian);
        let mut mesh = MeshObject {
            name: reader.read_aligned_string()?,
            ..Default::default()
        };
        trace!(name = %mesh.name, "reading mesh");

        let count = reader.read_count()?;
        mesh.sub_meshes = (0..count)
            .map(|_| read_sub_mesh(&mut reader, version))
            .collect::<Result<_>>()?;

        mesh.shapes = read_blend_shapes(&mut reader)?;

        let count = reader.read_count()?;
        mesh.bind_poses = (0..count)
            .map(|_| read_floats::<16>(&mut reader))
            .collect::<Result<_>>()?;
        mesh.bone_name_hashes = read_u32_array(&mut reader)?;
        mesh.root_bone_name_hash = reader.read_u32()?;

        if version.major >= 2019 {
            let count = reader.read_count()?;
            mesh.bones_aabb = (0..count)
                .map(|_| -> Result<MinMaxAabb> {
                    Ok(MinMaxAabb {
                        min: read_floats(&mut reader)?,
                        max: read_floats(&mut reader)?,
                    })
                })
                .collect::<Result<_>>()?;
            mesh.variable_bone_count_weights = read_u32_array(&mut reader)?;
        }

        mesh.mesh_compression = reader.read_u8()?;
        mesh.is_readable = reader.read_bool()?;
        mesh.keep_vertices = reader.read_bool()?;
        mesh.keep_indices = reader.read_bool()?;
        reader.align(4)?;

        if has_index_format(version) {
            mesh.index_format = Some(reader.read_i32()?);
        }
        mesh.index_buffer = reader.read_byte_array()?.to_vec();
        reader.align(4)?;

        mesh.vertex_data = read_vertex_data(&mut reader, version)?;

        skip_compressed_mesh(&mut reader)?;

        mesh.local_aabb = read_aabb(&mut reader)?;
        mesh.mesh_usage_flags = reader.read_i32()?;
        if version.at_least(2022, 1) {
            mesh.cooking_options = Some(reader.read_i32()?);
        }

        mesh.baked_convex_collision_mesh = reader.read_byte_array()?.to_vec();
        reader.align(4)?;
        mesh.baked_triangle_collision_mesh = reader.read_byte_array()?.to_vec();
        reader.align(4)?;

        if version.at_least(2018, 2) {
            mesh.mesh_metrics = Some([reader.read_f32()?, reader.read_f32()?]);
        }

        if version.at_least(2018, 3) {
            reader.align(4)?;
            let offset = if version.major >= 2020 {
                reader.read_u64()?
            } else {
                u64::from(reader.read_u32()?)
            };
            mesh.stream_data = Some(StreamingInfo {
                offset,
                size: reader.read_u32()?,
                path: reader.read_aligned_string()?,
            });
        }

        Ok(mesh)
    }

    /// Vertex buffer is held in an external resource rather than inline
    pub fn has_external_vertices(&self) -> bool {
        self.vertex_data.data.is_empty()
            && self.stream_data.as_ref().is_some_and(|s| !s.is_empty())
    }
}

/// `m_IndexFormat` was introduced part way through the 2017.3 patch releases
pub fn has_index_format(version: &UnityVersion) -> bool {
    version.at_least(2017, 4)
        || (version.major == 2017
            && version.minor == 3
            && version.build_type == 'p'
            && version.patch >= 1)
}

fn read_floats<const N: usize>(reader: &mut EndianReader) -> Result<[f32; N]> {
    let mut values = [0f32; N];
    for value in &mut values {
        *value = reader.read_f32()?;
    }
    Ok(values)
}

fn read_u32_array(reader: &mut EndianReader) -> Result<Vec<u32>> {
    let count = reader.read_count()?;
    let mut values = Vec::with_capacity(count.min(reader.remaining() / 4));
    for _ in 0..count {
        values.push(reader.read_u32()?);
    }
    Ok(values)
}

fn read_aabb(reader: &mut EndianReader) -> Result<Aabb> {
    Ok(Aabb {
        center: read_floats(reader)?,
        extent: read_floats(reader)?,
    })
}

fn read_sub_mesh(reader: &mut EndianReader, version: &UnityVersion) -> Result<SubMesh> {
    let first_byte = reader.read_u32()?;
    let index_count = reader.read_u32()?;
    let topology = reader.read_i32()?;
    let base_vertex = if version.at_least(2017, 3) {
        reader.read_u32()?
    } else {
        0
    };
    Ok(SubMesh {
        first_byte,
        index_count,
        topology,
        base_vertex,
        first_vertex: reader.read_u32()?,
        vertex_count: reader.read_u32()?,
        local_aabb: read_aabb(reader)?,
    })
}

fn read_blend_shapes(reader: &mut EndianReader) -> Result<BlendShapeData> {
    // vertex: three vectors and an index
    let vertex_count = reader.read_count()?;
    reader.skip(vertex_count.saturating_mul(40))?;

    // shape: first vertex, vertex count, two flags, padding
    let shape_count = reader.read_count()?;
    reader.skip(shape_count.saturating_mul(12))?;

    let count = reader.read_count()?;
    let channels = (0..count)
        .map(|_| -> Result<BlendShapeChannel> {
            Ok(BlendShapeChannel {
                name: reader.read_aligned_string()?,
                name_hash: reader.read_u32()?,
                frame_index: reader.read_i32()?,
                frame_count: reader.read_i32()?,
            })
        })
        .collect::<Result<_>>()?;

    let count = reader.read_count()?;
    let mut full_weights = Vec::with_capacity(count.min(reader.remaining() / 4));
    for _ in 0..count {
        full_weights.push(reader.read_f32()?);
    }

    Ok(BlendShapeData {
        vertex_count,
        shape_count,
        channels,
        full_weights,
    })
}

fn read_vertex_data(reader: &mut EndianReader, version: &UnityVersion) -> Result<VertexData> {
    let current_channels = if version.major < 2018 {
        reader.read_u32()?
    } else {
        0
    };
    let vertex_count = reader.read_u32()?;

    let count = reader.read_count()?;
    if count > MAX_CHANNELS {
        return Err(Error::TooManyChannels {
            count,
            max: MAX_CHANNELS,
        });
    }
    let mut channels = Vec::with_capacity(count);
    for _ in 0..count {
        let [stream, offset, format, dimension] = reader.read_array::<4>()?;
        channels.push(ChannelInfo {
            stream,
            offset,
            format,
            dimension: dimension & 0x0F,
        });
    }

    let data = reader.read_byte_array()?.to_vec();
    reader.align(4)?;

    let mut vertex_data = VertexData {
        current_channels,
        vertex_count,
        channels,
        data,
    };
    vertex_data.normalize_channels(version);
    Ok(vertex_data)
}

/// Step over the quantized copy of the mesh. It is present even when compression is off.
fn skip_compressed_mesh(reader: &mut EndianReader) -> Result<()> {
    // vertices, uv
    skip_packed_floats(reader)?;
    skip_packed_floats(reader)?;
    // normals, tangents
    skip_packed_floats(reader)?;
    skip_packed_floats(reader)?;
    // weights, normal signs, tangent signs
    skip_packed_ints(reader)?;
    skip_packed_ints(reader)?;
    skip_packed_ints(reader)?;
    // float colors
    skip_packed_floats(reader)?;
    // bone indices, triangles
    skip_packed_ints(reader)?;
    skip_packed_ints(reader)?;
    // uv info
    Ok(reader.skip(4)?)
}

fn skip_packed_floats(reader: &mut EndianReader) -> Result<()> {
    // item count, range, start
    reader.skip(12)?;
    reader.read_byte_array()?;
    reader.align(4)?;
    reader.skip(1)?;
    reader.align(4)?;
    Ok(())
}

fn skip_packed_ints(reader: &mut EndianReader) -> Result<()> {
    reader.skip(4)?;
    reader.read_byte_array()?;
    reader.align(4)?;
    reader.skip(1)?;
    reader.align(4)?;
    Ok(())
}
