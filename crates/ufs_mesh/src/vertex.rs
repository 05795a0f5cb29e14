//! Vertex channel descriptors and decoding of the interleaved vertex buffer.
//!
//! The buffer holds one or more streams laid out back to back, each starting on a 16 byte
//! boundary. Within a stream every vertex takes `stride` bytes and each channel assigned to the
//! stream sits at a fixed offset inside that stride.

use binrw::Endian;
use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::Serialize;

use crate::{
    error::{Error, Result},
    version::UnityVersion,
};

const STREAM_ALIGNMENT: usize = 16;

/// Channels a stream's channel mask can describe
pub const MAX_CHANNELS: usize = u32::BITS as usize;

/// Numeric format of a single vertex component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum VertexFormat {
    Float,
    Float16,
    UNorm8,
    SNorm8,
    UNorm16,
    SNorm16,
    UInt8,
    SInt8,
    UInt16,
    SInt16,
    UInt32,
    SInt32,
}

impl VertexFormat {
    /// Map a raw channel format, whose numbering changed in 2019
    pub fn from_raw(raw: u8, version: &UnityVersion) -> Option<Self> {
        use VertexFormat::*;

        if version.major >= 2019 {
            const TABLE: [VertexFormat; 12] = [
                Float, Float16, UNorm8, SNorm8, UNorm16, SNorm16, UInt8, SInt8, UInt16, SInt16,
                UInt32, SInt32,
            ];
            TABLE.get(usize::from(raw)).copied()
        } else {
            // 2017 and 2018 carry a packed 32-bit color format at 2
            const TABLE: [VertexFormat; 13] = [
                Float, Float16, UNorm8, UNorm8, SNorm8, UNorm16, SNorm16, UInt8, SInt8, UInt16,
                SInt16, UInt32, SInt32,
            ];
            TABLE.get(usize::from(raw)).copied()
        }
    }

    /// Bytes per component
    pub fn size(self) -> usize {
        match self {
            VertexFormat::UNorm8 | VertexFormat::SNorm8 | VertexFormat::UInt8 | VertexFormat::SInt8 => 1,
            VertexFormat::Float16
            | VertexFormat::UNorm16
            | VertexFormat::SNorm16
            | VertexFormat::UInt16
            | VertexFormat::SInt16 => 2,
            VertexFormat::Float | VertexFormat::UInt32 | VertexFormat::SInt32 => 4,
        }
    }

    /// Read one component as a float. Normalized formats map to `0..=1` or `-1..=1`.
    pub fn decode(self, bytes: &[u8], endian: Endian) -> f32 {
        match endian {
            Endian::Little => self.decode_with::<LittleEndian>(bytes),
            Endian::Big => self.decode_with::<BigEndian>(bytes),
        }
    }

    fn decode_with<B: ByteOrder>(self, bytes: &[u8]) -> f32 {
        match self {
            VertexFormat::Float => B::read_f32(bytes),
            VertexFormat::Float16 => f16_to_f32(B::read_u16(bytes)),
            VertexFormat::UNorm8 => f32::from(bytes[0]) / 255.0,
            VertexFormat::SNorm8 => (f32::from(bytes[0] as i8) / 127.0).max(-1.0),
            VertexFormat::UNorm16 => f32::from(B::read_u16(bytes)) / 65535.0,
            VertexFormat::SNorm16 => (f32::from(B::read_i16(bytes)) / 32767.0).max(-1.0),
            VertexFormat::UInt8 => f32::from(bytes[0]),
            VertexFormat::SInt8 => f32::from(bytes[0] as i8),
            VertexFormat::UInt16 => f32::from(B::read_u16(bytes)),
            VertexFormat::SInt16 => f32::from(B::read_i16(bytes)),
            VertexFormat::UInt32 => B::read_u32(bytes) as f32,
            VertexFormat::SInt32 => B::read_i32(bytes) as f32,
        }
    }
}

/// Widen an IEEE 754 half precision value
pub fn f16_to_f32(bits: u16) -> f32 {
    let negative = bits & 0x8000 != 0;
    let exponent = u32::from((bits >> 10) & 0x1F);
    let mantissa = u32::from(bits & 0x03FF);

    let magnitude = match exponent {
        0 => {
            // subnormal: mantissa * 2^-24
            let value = mantissa as f32 / 16_777_216.0;
            return if negative { -value } else { value };
        }
        0x1F => 0x7F80_0000 | (mantissa << 13),
        _ => ((exponent + 112) << 23) | (mantissa << 13),
    };
    let sign = if negative { 0x8000_0000 } else { 0 };
    f32::from_bits(sign | magnitude)
}

/// What a channel slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Channel {
    Position,
    Normal,
    Tangent,
    Color,
    TexCoord(u8),
    BlendWeight,
    BlendIndices,
}

impl Channel {
    /// Slot of `channel` in the channel table, which grew from 8 to 14 entries in 2018
    pub fn slot(self, version: &UnityVersion) -> Option<usize> {
        if version.major >= 2018 {
            match self {
                Channel::Position => Some(0),
                Channel::Normal => Some(1),
                Channel::Tangent => Some(2),
                Channel::Color => Some(3),
                Channel::TexCoord(n) if n < 8 => Some(4 + usize::from(n)),
                Channel::TexCoord(_) => None,
                Channel::BlendWeight => Some(12),
                Channel::BlendIndices => Some(13),
            }
        } else {
            match self {
                Channel::Position => Some(0),
                Channel::Normal => Some(1),
                Channel::Color => Some(2),
                Channel::TexCoord(n) if n < 4 => Some(3 + usize::from(n)),
                Channel::Tangent => Some(7),
                Channel::TexCoord(_) | Channel::BlendWeight | Channel::BlendIndices => None,
            }
        }
    }
}

/// One entry of the channel table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ChannelInfo {
    pub stream: u8,
    pub offset: u8,
    pub format: u8,
    /// Components per vertex, zero when the channel is unused
    pub dimension: u8,
}

impl ChannelInfo {
    pub fn is_used(&self) -> bool {
        self.dimension > 0
    }
}

/// Placement of one stream inside the vertex buffer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StreamInfo {
    /// Bit `n` set when channel `n` lives in this stream
    pub channel_mask: u32,
    pub offset: usize,
    pub stride: usize,
}

/// Vertex count, channel table and raw vertex buffer of a mesh
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VertexData {
    /// Only recorded before 2018
    pub current_channels: u32,
    pub vertex_count: u32,
    pub channels: Vec<ChannelInfo>,
    pub data: Vec<u8>,
}

/// A decoded channel, `dimension` floats per vertex
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelValues {
    pub dimension: usize,
    pub values: Vec<f32>,
}

impl ChannelValues {
    /// Exactly `count` components per vertex, dropping extra ones and padding missing ones with 0
    pub fn components(&self, count: usize) -> Vec<f32> {
        if self.dimension == count {
            return self.values.clone();
        }
        let vertices = self.values.len() / self.dimension.max(1);
        let mut out = Vec::with_capacity(vertices * count);
        for vertex in self.values.chunks_exact(self.dimension.max(1)) {
            out.extend((0..count).map(|i| vertex.get(i).copied().unwrap_or(0.0)));
        }
        out
    }
}

impl VertexData {
    /// Before 2018 a color channel in the packed color format records dimension 1 for its four
    /// bytes
    pub fn normalize_channels(&mut self, version: &UnityVersion) {
        if version.major < 2018 {
            if let Some(color) = self.channels.get_mut(2) {
                if color.format == 2 && color.is_used() {
                    color.dimension = 4;
                }
            }
        }
    }

    /// Compute the stream table from the channel table
    pub fn streams(&self, version: &UnityVersion) -> Result<Vec<StreamInfo>> {
        if self.channels.len() > MAX_CHANNELS {
            return Err(Error::TooManyChannels {
                count: self.channels.len(),
                max: MAX_CHANNELS,
            });
        }

        let stream_count = self
            .channels
            .iter()
            .map(|c| usize::from(c.stream) + 1)
            .max()
            .unwrap_or(0);

        let mut streams = Vec::with_capacity(stream_count);
        let mut offset = 0usize;
        for stream in 0..stream_count {
            let mut info = StreamInfo {
                offset,
                ..Default::default()
            };
            for (index, channel) in self.channels.iter().enumerate() {
                if usize::from(channel.stream) != stream || !channel.is_used() {
                    continue;
                }
                let format = self.format_of(index, channel, version)?;
                info.channel_mask |= 1 << index;
                info.stride += usize::from(channel.dimension) * format.size();
            }
            offset += self.vertex_count as usize * info.stride;
            offset = offset.div_ceil(STREAM_ALIGNMENT) * STREAM_ALIGNMENT;
            streams.push(info);
        }
        Ok(streams)
    }

    /// Decode a channel into floats, `None` when the mesh does not use it
    pub fn read_channel(
        &self,
        channel: Channel,
        version: &UnityVersion,
        endian: Endian,
    ) -> Result<Option<ChannelValues>> {
        let Some(index) = channel.slot(version) else {
            return Ok(None);
        };
        let Some(info) = self.channels.get(index).filter(|c| c.is_used()) else {
            return Ok(None);
        };
        if self.vertex_count == 0 {
            return Ok(Some(ChannelValues {
                dimension: usize::from(info.dimension),
                values: Vec::new(),
            }));
        }

        let format = self.format_of(index, info, version)?;
        let streams = self.streams(version)?;
        let stream = streams[usize::from(info.stream)];

        let dimension = usize::from(info.dimension);
        let component = format.size();
        let vertex_count = self.vertex_count as usize;
        let first = stream.offset + usize::from(info.offset);
        let needed = first + stream.stride * (vertex_count - 1) + dimension * component;
        if needed > self.data.len() {
            return Err(Error::VertexDataOutOfBounds {
                channel: index,
                needed,
                len: self.data.len(),
            });
        }

        let mut values = Vec::with_capacity(vertex_count * dimension);
        for vertex in 0..vertex_count {
            let start = first + stream.stride * vertex;
            let bytes = &self.data[start..start + dimension * component];
            values.extend(
                bytes
                    .chunks_exact(component)
                    .map(|b| format.decode(b, endian)),
            );
        }
        Ok(Some(ChannelValues { dimension, values }))
    }

    fn format_of(
        &self,
        index: usize,
        channel: &ChannelInfo,
        version: &UnityVersion,
    ) -> Result<VertexFormat> {
        VertexFormat::from_raw(channel.format, version).ok_or(Error::UnknownVertexFormat {
            channel: index,
            format: channel.format,
        })
    }
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use super::{f16_to_f32, Channel, ChannelInfo, StreamInfo, VertexData, VertexFormat};
    use crate::error::{Error, Result};
    use crate::version::UnityVersion;

    const V2019: UnityVersion = UnityVersion::new(2019, 4, 16);
    const V2017: UnityVersion = UnityVersion::new(2017, 4, 40);

    fn channel(stream: u8, offset: u8, format: u8, dimension: u8) -> ChannelInfo {
        ChannelInfo {
            stream,
            offset,
            format,
            dimension,
        }
    }

    #[test]
    fn half_floats() {
        assert_eq!(f16_to_f32(0x0000), 0.0);
        assert_eq!(f16_to_f32(0x3C00), 1.0);
        assert_eq!(f16_to_f32(0xC000), -2.0);
        assert_eq!(f16_to_f32(0x3800), 0.5);
        assert_eq!(f16_to_f32(0x7BFF), 65504.0);
        assert_eq!(f16_to_f32(0x0001), 2f32.powi(-24));
        assert!(f16_to_f32(0x7C00).is_infinite());
        assert!(f16_to_f32(0x7E00).is_nan());
    }

    #[test]
    fn format_tables_differ_by_version() {
        assert_eq!(VertexFormat::from_raw(2, &V2019), Some(VertexFormat::UNorm8));
        assert_eq!(VertexFormat::from_raw(4, &V2019), Some(VertexFormat::UNorm16));
        assert_eq!(VertexFormat::from_raw(4, &V2017), Some(VertexFormat::SNorm8));
        assert_eq!(VertexFormat::from_raw(12, &V2017), Some(VertexFormat::SInt32));
        assert_eq!(VertexFormat::from_raw(12, &V2019), None);
    }

    #[test]
    fn normalized_formats() {
        assert_eq!(VertexFormat::UNorm8.decode(&[255], Endian::Little), 1.0);
        assert_eq!(VertexFormat::SNorm8.decode(&[0x80], Endian::Little), -1.0);
        assert_eq!(VertexFormat::SNorm16.decode(&[0x7F, 0xFF], Endian::Big), 1.0);
        assert_eq!(VertexFormat::UInt16.decode(&[0x01, 0x00], Endian::Little), 1.0);
    }

    #[test]
    fn channel_slots_by_version() {
        assert_eq!(Channel::TexCoord(0).slot(&V2019), Some(4));
        assert_eq!(Channel::Color.slot(&V2019), Some(3));
        assert_eq!(Channel::TexCoord(0).slot(&V2017), Some(3));
        assert_eq!(Channel::Tangent.slot(&V2017), Some(7));
        assert_eq!(Channel::BlendWeight.slot(&V2017), None);
    }

    #[test]
    fn streams_are_aligned() -> Result<()> {
        let data = VertexData {
            vertex_count: 3,
            channels: vec![
                channel(0, 0, 0, 3),
                channel(0, 12, 0, 3),
                channel(0, 0, 0, 0),
                channel(0, 0, 0, 0),
                channel(1, 0, 0, 2),
            ],
            ..Default::default()
        };

        assert_eq!(
            data.streams(&V2019)?,
            vec![
                StreamInfo {
                    channel_mask: 0b00011,
                    offset: 0,
                    stride: 24,
                },
                StreamInfo {
                    channel_mask: 0b10000,
                    offset: 80,
                    stride: 8,
                },
            ]
        );

        Ok(())
    }

    #[test]
    fn channel_mask_overflow_is_an_error() {
        let mut channels = vec![channel(0, 0, 0, 0); 33];
        channels[32] = channel(0, 0, 0, 3);
        let data = VertexData {
            vertex_count: 1,
            channels,
            data: vec![0; 12],
            ..Default::default()
        };

        assert!(matches!(
            data.streams(&V2019),
            Err(Error::TooManyChannels { count: 33, max: 32 })
        ));
        assert!(matches!(
            data.read_channel(Channel::Position, &V2019, Endian::Little),
            Ok(None)
        ));
    }

    #[test]
    fn reads_interleaved_and_split_streams() -> Result<()> {
        let positions = [[1.0f32, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let uvs = [[0.25f32, 0.75], [0.5, 1.0]];

        let mut bytes = Vec::new();
        for p in positions {
            bytes.extend(p.iter().flat_map(|f| f.to_le_bytes()));
        }
        bytes.resize(32, 0);
        for uv in uvs {
            bytes.extend(uv.iter().flat_map(|f| f.to_le_bytes()));
        }

        let data = VertexData {
            vertex_count: 2,
            channels: vec![
                channel(0, 0, 0, 3),
                channel(0, 0, 0, 0),
                channel(0, 0, 0, 0),
                channel(0, 0, 0, 0),
                channel(1, 0, 0, 2),
            ],
            data: bytes,
            ..Default::default()
        };

        let read = data
            .read_channel(Channel::Position, &V2019, Endian::Little)?
            .map(|c| c.values);
        assert_eq!(read, Some(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]));

        let read = data
            .read_channel(Channel::TexCoord(0), &V2019, Endian::Little)?
            .map(|c| c.values);
        assert_eq!(read, Some(vec![0.25, 0.75, 0.5, 1.0]));

        assert_eq!(data.read_channel(Channel::Normal, &V2019, Endian::Little)?, None);

        Ok(())
    }

    #[test]
    fn packed_colors_before_2018() -> Result<()> {
        let mut data = VertexData {
            vertex_count: 1,
            channels: vec![
                channel(0, 0, 0, 0),
                channel(0, 0, 0, 0),
                channel(0, 0, 2, 1),
            ],
            data: vec![255, 0, 51, 255],
            ..Default::default()
        };
        data.normalize_channels(&V2017);

        let colors = data.read_channel(Channel::Color, &V2017, Endian::Little)?;
        assert_eq!(colors.map(|c| c.values), Some(vec![1.0, 0.0, 0.2, 1.0]));

        Ok(())
    }

    #[test]
    fn short_buffer_is_an_error() {
        let data = VertexData {
            vertex_count: 4,
            channels: vec![channel(0, 0, 0, 3)],
            data: vec![0; 40],
            ..Default::default()
        };

        assert!(matches!(
            data.read_channel(Channel::Position, &V2019, Endian::Little),
            Err(Error::VertexDataOutOfBounds {
                channel: 0,
                needed: 48,
                len: 40
            })
        ));
    }

    #[test]
    fn components_pad_and_truncate() {
        let values = super::ChannelValues {
            dimension: 4,
            values: vec![1.0, 2.0, 3.0, 4.0],
        };
        assert_eq!(values.components(3), vec![1.0, 2.0, 3.0]);

        let values = super::ChannelValues {
            dimension: 2,
            values: vec![1.0, 2.0],
        };
        assert_eq!(values.components(3), vec![1.0, 2.0, 0.0]);
    }
}
