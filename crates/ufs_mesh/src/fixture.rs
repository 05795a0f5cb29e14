//! Synthetic mesh objects for tests.
//!
//! Only compiled for tests or with the `fixture` feature.

use binrw::Endian;
use bon::Builder;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::{
    error::Result,
    index::IndexFormat,
    object::{has_index_format, StreamingInfo, SubMesh},
    vertex::{Channel, ChannelInfo},
    version::UnityVersion,
};

/// Per vertex attributes of a fixture mesh; empty lists leave the channel unused
///
/// Positions and normals share the first stream, texture coordinates and colors each get a
/// stream of their own.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FixtureVertices {
    pub positions: Vec<[f32; 3]>,
    pub normals: Vec<[f32; 3]>,
    pub uvs: Vec<[f32; 2]>,
    pub colors: Vec<[u8; 4]>,
}

impl FixtureVertices {
    /// A unit quad facing +z
    pub fn quad() -> Self {
        Self {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [1.0, 1.0, 0.0],
            ],
            normals: vec![[0.0, 0.0, 1.0]; 4],
            uvs: vec![[0.0, 0.0], [1.0, 0.0], [0.0, 1.0], [1.0, 1.0]],
            colors: vec![[255, 0, 0, 255], [0, 255, 0, 255], [0, 0, 255, 255], [255; 4]],
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Channel table and vertex buffer as written by `version`
    pub fn encode(
        &self,
        version: &UnityVersion,
        endian: Endian,
    ) -> Result<(Vec<ChannelInfo>, Vec<u8>)> {
        let slots = if version.major >= 2018 { 14 } else { 8 };
        let mut channels = vec![ChannelInfo::default(); slots];
        let mut out = Writer::new(endian);
        let mut stream = 0u8;

        let mut set = |channel: Channel, info: ChannelInfo| {
            if let Some(slot) = channel.slot(version) {
                channels[slot] = info;
            }
        };

        if !self.positions.is_empty() {
            let normals = !self.normals.is_empty();
            set(Channel::Position, float_channel(stream, 0, 3));
            if normals {
                set(Channel::Normal, float_channel(stream, 12, 3));
            }
            for (index, position) in self.positions.iter().enumerate() {
                for value in position {
                    out.f32(*value)?;
                }
                if let Some(normal) = self.normals.get(index).filter(|_| normals) {
                    for value in normal {
                        out.f32(*value)?;
                    }
                }
            }
            out.align(16);
            stream += 1;
        }

        if !self.uvs.is_empty() {
            set(Channel::TexCoord(0), float_channel(stream, 0, 2));
            for uv in &self.uvs {
                for value in uv {
                    out.f32(*value)?;
                }
            }
            out.align(16);
            stream += 1;
        }

        if !self.colors.is_empty() {
            let (format, dimension) = match version.major {
                2019.. => (2, 4),
                2018 => (3, 4),
                _ => (2, 1),
            };
            set(
                Channel::Color,
                ChannelInfo {
                    stream,
                    offset: 0,
                    format,
                    dimension,
                },
            );
            for color in &self.colors {
                out.data.extend_from_slice(color);
            }
            out.align(16);
        }

        Ok((channels, out.data))
    }
}

fn float_channel(stream: u8, offset: u8, dimension: u8) -> ChannelInfo {
    ChannelInfo {
        stream,
        offset,
        format: 0,
        dimension,
    }
}

/// Describes a mesh object to be written with [`MeshFixture::to_bytes`]
#[derive(Debug, Clone, Builder)]
pub struct MeshFixture {
    #[builder(default = "mesh".to_owned(), into)]
    pub name: String,

    #[builder(default = UnityVersion::new(2019, 4, 16))]
    pub version: UnityVersion,

    #[builder(default = Endian::Little)]
    pub endian: Endian,

    #[builder(default)]
    pub vertices: FixtureVertices,

    #[builder(default)]
    pub indices: Vec<u32>,

    #[builder(default = IndexFormat::UInt16)]
    pub index_format: IndexFormat,

    /// Written in place of the encoded `indices` when set
    pub index_buffer: Option<Vec<u8>>,

    /// One triangle list over every index when empty
    #[builder(default)]
    pub sub_meshes: Vec<SubMesh>,

    #[builder(default)]
    pub mesh_compression: u8,

    /// Moves the vertex buffer out of the object; place [`MeshFixture::vertex_bytes`] at the
    /// stream location yourself
    pub stream_data: Option<StreamingInfo>,
}

impl MeshFixture {
    /// The vertex buffer this mesh describes
    pub fn vertex_bytes(&self) -> Result<Vec<u8>> {
        Ok(self.vertices.encode(&self.version, self.endian)?.1)
    }

    /// Encode the object
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let version = &self.version;
        let mut out = Writer::new(self.endian);

        out.aligned_string(&self.name)?;

        let default_sub_mesh = [SubMesh {
            index_count: self.indices.len() as u32,
            vertex_count: self.vertices.len() as u32,
            ..Default::default()
        }];
        let sub_meshes = if self.sub_meshes.is_empty() {
            &default_sub_mesh[..]
        } else {
            &self.sub_meshes[..]
        };
        out.i32(sub_meshes.len() as i32)?;
        for sub_mesh in sub_meshes {
            out.u32(sub_mesh.first_byte)?;
            out.u32(sub_mesh.index_count)?;
            out.i32(sub_mesh.topology)?;
            if version.at_least(2017, 3) {
                out.u32(sub_mesh.base_vertex)?;
            }
            out.u32(sub_mesh.first_vertex)?;
            out.u32(sub_mesh.vertex_count)?;
            for value in sub_mesh
                .local_aabb
                .center
                .iter()
                .chain(&sub_mesh.local_aabb.extent)
            {
                out.f32(*value)?;
            }
        }

        // blend shape vertices, shapes, channels, full weights
        for _ in 0..4 {
            out.i32(0)?;
        }
        // bind poses, bone name hashes, root bone name hash
        for _ in 0..3 {
            out.i32(0)?;
        }
        if version.major >= 2019 {
            // bone bounds, variable bone count weights
            out.i32(0)?;
            out.i32(0)?;
        }

        out.u8(self.mesh_compression);
        out.u8(1);
        out.u8(0);
        out.u8(0);
        out.align(4);

        if has_index_format(version) {
            out.i32(self.index_format.raw())?;
        }
        let index_buffer = match &self.index_buffer {
            Some(buffer) => buffer.clone(),
            None => self.index_bytes()?,
        };
        out.byte_array(&index_buffer)?;

        let (channels, vertex_bytes) = self.vertices.encode(version, self.endian)?;
        if version.major < 2018 {
            let mask = channels
                .iter()
                .enumerate()
                .filter(|(_, c)| c.is_used())
                .fold(0u32, |mask, (index, _)| mask | 1 << index);
            out.u32(mask)?;
        }
        out.u32(self.vertices.len() as u32)?;
        out.i32(channels.len() as i32)?;
        for channel in &channels {
            out.data.extend_from_slice(&[
                channel.stream,
                channel.offset,
                channel.format,
                channel.dimension,
            ]);
        }
        if self.stream_data.is_some() {
            out.byte_array(&[])?;
        } else {
            out.byte_array(&vertex_bytes)?;
        }

        // compressed mesh, all vectors empty
        for packed in ["f", "f", "f", "f", "i", "i", "i", "f", "i", "i"] {
            out.u32(0)?;
            if packed == "f" {
                out.f32(0.0)?;
                out.f32(0.0)?;
            }
            out.byte_array(&[])?;
            out.u8(0);
            out.align(4);
        }
        out.u32(0)?;

        // local bounds
        for _ in 0..6 {
            out.f32(0.0)?;
        }
        out.i32(0)?;
        if version.at_least(2022, 1) {
            out.i32(0)?;
        }
        out.byte_array(&[])?;
        out.byte_array(&[])?;

        if version.at_least(2018, 2) {
            out.f32(1.0)?;
            out.f32(1.0)?;
        }

        if version.at_least(2018, 3) {
            out.align(4);
            let stream = self.stream_data.clone().unwrap_or_default();
            if version.major >= 2020 {
                out.u64(stream.offset)?;
            } else {
                out.u32(stream.offset as u32)?;
            }
            out.u32(stream.size)?;
            out.aligned_string(&stream.path)?;
        }

        Ok(out.data)
    }

    fn index_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Writer::new(self.endian);
        for index in &self.indices {
            match self.index_format {
                IndexFormat::UInt16 => out.u16(*index as u16)?,
                IndexFormat::UInt32 => out.u32(*index)?,
            }
        }
        Ok(out.data)
    }
}

struct Writer {
    data: Vec<u8>,
    endian: Endian,
}

impl Writer {
    fn new(endian: Endian) -> Self {
        Self {
            data: Vec::new(),
            endian,
        }
    }

    fn u8(&mut self, value: u8) {
        self.data.push(value);
    }

    fn u16(&mut self, value: u16) -> Result<()> {
        match self.endian {
            Endian::Big => self.data.write_u16::<BigEndian>(value)?,
            Endian::Little => self.data.write_u16::<LittleEndian>(value)?,
        }
        Ok(())
    }

    fn i32(&mut self, value: i32) -> Result<()> {
        match self.endian {
            Endian::Big => self.data.write_i32::<BigEndian>(value)?,
            Endian::Little => self.data.write_i32::<LittleEndian>(value)?,
        }
        Ok(())
    }

    fn u32(&mut self, value: u32) -> Result<()> {
        match self.endian {
            Endian::Big => self.data.write_u32::<BigEndian>(value)?,
            Endian::Little => self.data.write_u32::<LittleEndian>(value)?,
        }
        Ok(())
    }

    fn u64(&mut self, value: u64) -> Result<()> {
        match self.endian {
            Endian::Big => self.data.write_u64::<BigEndian>(value)?,
            Endian::Little => self.data.write_u64::<LittleEndian>(value)?,
        }
        Ok(())
    }

    fn f32(&mut self, value: f32) -> Result<()> {
        match self.endian {
            Endian::Big => self.data.write_f32::<BigEndian>(value)?,
            Endian::Little => self.data.write_f32::<LittleEndian>(value)?,
        }
        Ok(())
    }

    /// Length prefixed and padded to 4 bytes
    fn byte_array(&mut self, bytes: &[u8]) -> Result<()> {
        self.i32(bytes.len() as i32)?;
        self.data.extend_from_slice(bytes);
        self.align(4);
        Ok(())
    }

    fn aligned_string(&mut self, value: &str) -> Result<()> {
        self.byte_array(value.as_bytes())
    }

    fn align(&mut self, alignment: usize) {
        let padded = self.data.len().div_ceil(alignment) * alignment;
        self.data.resize(padded, 0);
    }
}
