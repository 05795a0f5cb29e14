//! Synthetic serialized files for tests and benchmarks.
//!
//! Only compiled for tests or with the `fixture` feature.

use std::io::Cursor;

use binrw::Endian;
use bon::Builder;
use byteorder::{BigEndian, LittleEndian, WriteBytesExt};

use crate::{
    error::Result,
    header::SerializedFileHeader,
    layout::FieldLayout,
    typetree::{common_string_offset, COMMON_STRING_FLAG},
    types::ClassId,
};

/// An object to place in a [`SerializedFileFixture`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FixtureObject {
    pub path_id: i64,
    pub class_id: ClassId,
    pub data: Vec<u8>,
}

impl FixtureObject {
    pub fn new(path_id: i64, class_id: impl Into<ClassId>, data: Vec<u8>) -> Self {
        Self {
            path_id,
            class_id: class_id.into(),
            data,
        }
    }
}

/// Describes a serialized file to be written with [`SerializedFileFixture::to_bytes`]
///
/// One type table entry is written per distinct class, in order of first use. Type trees, when
/// written, hold a root named `Base` and a single `m_Name` string field.
#[derive(Debug, Clone, Builder)]
pub struct SerializedFileFixture {
    #[builder(default = 22)]
    pub version: u32,

    #[builder(default = Endian::Little)]
    pub endian: Endian,

    #[builder(default = "2019.4.16f1".to_owned(), into)]
    pub unity_version: String,

    #[builder(default = 19)]
    pub target_platform: i32,

    #[builder(default)]
    pub enable_type_tree: bool,

    #[builder(default)]
    pub objects: Vec<FixtureObject>,

    /// Paths of the external references
    #[builder(default)]
    pub externals: Vec<String>,
}

impl SerializedFileFixture {
    /// Encode the file
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let layout = FieldLayout::for_version(self.version);
        let mut out = Writer {
            data: vec![0u8; layout.header_size()],
            endian: self.endian,
        };

        let mut classes: Vec<ClassId> = Vec::new();
        for object in &self.objects {
            if !classes.contains(&object.class_id) {
                classes.push(object.class_id);
            }
        }

        if layout.has_unity_version {
            out.cstring(&self.unity_version);
        }
        if layout.has_target_platform {
            out.i32(self.target_platform)?;
        }
        let type_trees = !layout.has_type_tree_flag || self.enable_type_tree;
        if layout.has_type_tree_flag {
            out.u8(self.enable_type_tree as u8);
        }

        out.i32(classes.len() as i32)?;
        for class_id in &classes {
            self.write_type(&mut out, &layout, *class_id, type_trees)?;
        }

        if layout.has_big_id_flag {
            out.i32(0)?;
        }

        let mut placements = Vec::with_capacity(self.objects.len());
        let mut relative = 0u64;
        for object in &self.objects {
            relative = relative.div_ceil(8) * 8;
            placements.push(relative);
            relative += object.data.len() as u64;
        }

        out.i32(self.objects.len() as i32)?;
        for (object, byte_start) in self.objects.iter().zip(&placements) {
            if layout.align_objects {
                out.align(4);
            }
            if layout.wide_path_id {
                out.i64(object.path_id)?;
            } else {
                out.i32(object.path_id as i32)?;
            }
            if layout.wide_byte_start {
                out.u64(*byte_start)?;
            } else {
                out.u32(*byte_start as u32)?;
            }
            out.u32(object.data.len() as u32)?;

            let class_id = i32::from(object.class_id);
            if layout.has_object_class_id {
                out.i32(class_id)?;
                out.u16(class_id as u16)?;
            } else {
                let index = classes.iter().position(|c| *c == object.class_id);
                out.i32(index.unwrap_or_default() as i32)?;
            }
            if layout.has_is_destroyed {
                out.u16(0)?;
            }
            if layout.has_object_script_index {
                out.i16(-1)?;
            }
            if layout.has_object_stripped {
                out.u8(0);
            }
        }

        if layout.has_script_types {
            out.i32(0)?;
        }

        out.i32(self.externals.len() as i32)?;
        for path in &self.externals {
            if layout.has_external_temp {
                out.cstring("");
            }
            if layout.has_external_guid {
                out.data.extend_from_slice(&[0u8; 16]);
                out.i32(0)?;
            }
            out.cstring(path);
        }

        if layout.has_ref_types {
            out.i32(0)?;
        }
        if layout.has_user_information {
            out.cstring("");
        }

        let metadata_size = (out.data.len() - layout.header_size()) as u32;
        out.align(16);
        let data_offset = out.data.len() as u64;
        for (object, byte_start) in self.objects.iter().zip(&placements) {
            out.data.resize((data_offset + byte_start) as usize, 0);
            out.data.extend_from_slice(&object.data);
        }

        let header = SerializedFileHeader {
            metadata_size,
            file_size: out.data.len() as u64,
            version: self.version,
            data_offset,
            endianness: match self.endian {
                Endian::Little => 0,
                Endian::Big => 1,
            },
        };
        let mut encoded = Vec::with_capacity(layout.header_size());
        header.write(&mut Cursor::new(&mut encoded))?;
        out.data[..encoded.len()].copy_from_slice(&encoded);

        Ok(out.data)
    }

    fn write_type(
        &self,
        out: &mut Writer,
        layout: &FieldLayout,
        class_id: ClassId,
        type_tree: bool,
    ) -> Result<()> {
        let id = i32::from(class_id);
        out.i32(id)?;
        if layout.has_stripped_type {
            out.u8(0);
        }
        if layout.has_type_script_index {
            out.i16(-1)?;
        }
        if layout.has_type_hashes {
            let has_script_id = (layout.version < 16 && id < 0)
                || (layout.version >= 16 && class_id == ClassId::MonoBehaviour);
            if has_script_id {
                out.data.extend_from_slice(&[0u8; 16]);
            }
            out.data.extend_from_slice(&[0u8; 16]);
        }

        if !type_tree {
            return Ok(());
        }

        let class_name = class_id.to_string();
        if layout.blob_type_tree {
            let common = |name: &str| COMMON_STRING_FLAG | common_string_offset(name).unwrap_or(0);
            let nodes = [
                (0u8, 0u32, common("Base"), 0x8000),
                (1u8, common("string"), common("m_Name"), 0x4000),
            ];

            out.i32(nodes.len() as i32)?;
            out.i32(class_name.len() as i32 + 1)?;
            for (index, (level, type_offset, name_offset, meta_flag)) in nodes.iter().enumerate() {
                out.u16(1)?;
                out.u8(*level);
                out.u8(0);
                out.u32(*type_offset)?;
                out.u32(*name_offset)?;
                out.i32(-1)?;
                out.i32(index as i32)?;
                out.i32(*meta_flag)?;
                if layout.type_tree_node_hash {
                    out.u64(0)?;
                }
            }
            out.cstring(&class_name);
        } else {
            for (type_name, name, index, meta_flag, children) in [
                (class_name.as_str(), "Base", 0, 0x8000, 1),
                ("string", "m_Name", 1, 0x4000, 0),
            ] {
                out.cstring(type_name);
                out.cstring(name);
                for value in [-1, index, 0, 1, meta_flag, children] {
                    out.i32(value)?;
                }
            }
        }

        if layout.has_type_dependencies {
            out.i32(0)?;
        }
        Ok(())
    }
}

struct Writer {
    data: Vec<u8>,
    endian: Endian,
}

impl Writer {
    fn u8(&mut self, value: u8) {
        self.data.push(value);
    }

    fn i16(&mut self, value: i16) -> Result<()> {
        match self.endian {
            Endian::Big => self.data.write_i16::<BigEndian>(value)?,
            Endian::Little => self.data.write_i16::<LittleEndian>(value)?,
        }
        Ok(())
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

    fn i64(&mut self, value: i64) -> Result<()> {
        match self.endian {
            Endian::Big => self.data.write_i64::<BigEndian>(value)?,
            Endian::Little => self.data.write_i64::<LittleEndian>(value)?,
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

    fn cstring(&mut self, value: &str) {
        self.data.extend_from_slice(value.as_bytes());
        self.data.push(0);
    }

    fn align(&mut self, alignment: usize) {
        let padded = self.data.len().div_ceil(alignment) * alignment;
        self.data.resize(padded, 0);
    }
}
