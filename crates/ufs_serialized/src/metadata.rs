//! Readers for the individual tables of the metadata section.
//!
//! Each reader consults the [`FieldLayout`] instead of comparing versions itself.

use crate::{
    error::{Error, Result},
    layout::FieldLayout,
    reader::EndianReader,
    typetree::TypeTree,
    types::{ClassId, ExternalReference, Guid, ObjectInfo, ScriptType, SerializedType},
};

/// Whether type trees are parsed into nodes or only stepped over
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TypeTreeMode {
    Parse,
    Skip,
}

/// Fields that precede the type table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preamble {
    pub unity_version: String,
    pub target_platform: i32,
    pub enable_type_tree: bool,
}

pub fn read_preamble(reader: &mut EndianReader, layout: &FieldLayout) -> Result<Preamble> {
    let mut preamble = Preamble {
        enable_type_tree: true,
        ..Default::default()
    };
    if layout.has_unity_version {
        preamble.unity_version = reader.read_cstring()?;
    }
    if layout.has_target_platform {
        preamble.target_platform = reader.read_i32()?;
    }
    if layout.has_type_tree_flag {
        preamble.enable_type_tree = reader.read_bool()?;
    }
    Ok(preamble)
}

/// Read one entry of the type table or of the reference type table
pub fn read_type(
    reader: &mut EndianReader,
    layout: &FieldLayout,
    enable_type_tree: bool,
    is_ref_type: bool,
    mode: TypeTreeMode,
) -> Result<SerializedType> {
    let mut serialized_type = SerializedType {
        class_id: reader.read_i32()?,
        script_type_index: -1,
        ..Default::default()
    };

    if layout.has_stripped_type {
        serialized_type.is_stripped_type = reader.read_bool()?;
    }
    if layout.has_type_script_index {
        serialized_type.script_type_index = reader.read_i16()?;
    }
    if layout.has_type_hashes {
        let class_id = serialized_type.class_id;
        let has_script_id = (is_ref_type && serialized_type.script_type_index >= 0)
            || (layout.version < 16 && class_id < 0)
            || (layout.version >= 16 && class_id == i32::from(ClassId::MonoBehaviour));
        if has_script_id {
            serialized_type.script_id = Some(Guid::from(reader.read_array::<16>()?));
        }
        serialized_type.old_type_hash = Some(Guid::from(reader.read_array::<16>()?));
    }

    if enable_type_tree {
        match mode {
            TypeTreeMode::Parse => {
                serialized_type.type_tree = Some(TypeTree::read(reader, layout)?);
            }
            TypeTreeMode::Skip => TypeTree::skip(reader, layout)?,
        }

        if layout.has_type_dependencies {
            if is_ref_type {
                serialized_type.ref_type_names = Some((
                    reader.read_cstring()?,
                    reader.read_cstring()?,
                    reader.read_cstring()?,
                ));
            } else {
                serialized_type.type_dependencies = reader.read_i32_array()?;
            }
        }
    }

    Ok(serialized_type)
}

/// Read the type table
pub fn read_types(
    reader: &mut EndianReader,
    layout: &FieldLayout,
    enable_type_tree: bool,
    is_ref_type: bool,
    mode: TypeTreeMode,
) -> Result<Vec<SerializedType>> {
    let count = reader.read_count()?;
    let mut types = Vec::with_capacity(count.min(reader.remaining() / 4));
    for _ in 0..count {
        types.push(read_type(
            reader,
            layout,
            enable_type_tree,
            is_ref_type,
            mode,
        )?);
    }
    Ok(types)
}

/// The big id flag, present for files older than version 14
pub fn read_big_id_enabled(reader: &mut EndianReader, layout: &FieldLayout) -> Result<bool> {
    if layout.has_big_id_flag {
        Ok(reader.read_i32()? != 0)
    } else {
        Ok(false)
    }
}

/// Read one object record.
///
/// `byte_start` is returned relative to the start of the file, `data_offset` already added.
pub fn read_object(
    reader: &mut EndianReader,
    layout: &FieldLayout,
    big_id_enabled: bool,
    data_offset: u64,
    types: &[SerializedType],
) -> Result<ObjectInfo> {
    if layout.align_objects {
        reader.align(4)?;
    }

    let path_id = if big_id_enabled || layout.wide_path_id {
        reader.read_i64()?
    } else {
        reader.read_i32()? as i64
    };

    let byte_start = if layout.wide_byte_start {
        reader.read_u64()?
    } else {
        reader.read_u32()? as u64
    };
    let byte_size = reader.read_u32()?;
    let type_id = reader.read_i32()?;

    let (class_id, type_stripped) = if layout.has_object_class_id {
        (reader.read_u16()? as i32, false)
    } else {
        let serialized_type = usize::try_from(type_id)
            .ok()
            .and_then(|index| types.get(index))
            .ok_or(Error::TypeIndexOutOfRange {
                index: type_id,
                count: types.len(),
            })?;
        (serialized_type.class_id, serialized_type.is_stripped_type)
    };

    let mut object = ObjectInfo {
        path_id,
        byte_start: byte_start.saturating_add(data_offset),
        byte_size,
        type_id,
        class_id: ClassId::from(class_id),
        is_destroyed: 0,
        script_type_index: -1,
        stripped: type_stripped,
    };

    if layout.has_is_destroyed {
        object.is_destroyed = reader.read_u16()?;
    }
    if layout.has_object_script_index {
        object.script_type_index = reader.read_i16()?;
    }
    if layout.has_object_stripped {
        object.stripped = reader.read_u8()? != 0;
    }

    Ok(object)
}

pub fn read_script_types(
    reader: &mut EndianReader,
    layout: &FieldLayout,
) -> Result<Vec<ScriptType>> {
    if !layout.has_script_types {
        return Ok(Vec::new());
    }

    let count = reader.read_count()?;
    let mut scripts = Vec::with_capacity(count.min(reader.remaining() / 8));
    for _ in 0..count {
        let local_serialized_file_index = reader.read_i32()?;
        let local_identifier_in_file = if layout.wide_script_identifier {
            reader.align(4)?;
            reader.read_i64()?
        } else {
            reader.read_i32()? as i64
        };
        scripts.push(ScriptType {
            local_serialized_file_index,
            local_identifier_in_file,
        });
    }
    Ok(scripts)
}

pub fn read_externals(
    reader: &mut EndianReader,
    layout: &FieldLayout,
) -> Result<Vec<ExternalReference>> {
    let count = reader.read_count()?;
    let mut externals = Vec::with_capacity(count.min(reader.remaining()));
    for _ in 0..count {
        let mut external = ExternalReference::default();
        if layout.has_external_temp {
            reader.read_cstring()?;
        }
        if layout.has_external_guid {
            external.guid = Guid::from(reader.read_array::<16>()?);
            external.kind = reader.read_i32()?;
        }
        external.path = reader.read_cstring()?;
        externals.push(external);
    }
    Ok(externals)
}
