//! Types for reading serialized files
//!

use bytes::Bytes;
use indexmap::IndexMap;
use tracing::{debug, instrument};

use crate::{
    error::{Error, Result},
    header::SerializedFileHeader,
    metadata::{self, TypeTreeMode},
    reader::EndianReader,
    types::{ClassId, ExternalReference, ObjectInfo, ScriptType, SerializedType},
};

/// A parsed serialized file
///
/// ```no_run
/// fn list_meshes(node: bytes::Bytes) -> ufs_serialized::error::Result<()> {
///     let file = ufs_serialized::SerializedFile::parse(node)?;
///
///     for object in file.objects_by_class_id(ufs_serialized::ClassId::Mesh) {
///         let data = file.read_object_data(object)?;
///         println!("{}: {} bytes", object.path_id, data.len());
///     }
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone)]
pub struct SerializedFile {
    header: SerializedFileHeader,
    unity_version: String,
    target_platform: i32,
    enable_type_tree: bool,
    types: Vec<SerializedType>,
    big_id_enabled: bool,
    objects: Vec<ObjectInfo>,
    script_types: Vec<ScriptType>,
    externals: Vec<ExternalReference>,
    ref_types: Vec<SerializedType>,
    user_information: String,
    path_ids: IndexMap<i64, usize>,
    data: Bytes,
}

impl SerializedFile {
    /// Read the header and the whole metadata section.
    #[instrument(skip(data), err)]
    pub fn parse(data: impl Into<Bytes>) -> Result<SerializedFile> {
        let data = data.into();

        let header = SerializedFileHeader::read(&data)?;
        let layout = header.layout();

        let mut reader = EndianReader::new(&data, header.endian());
        reader.set_position(header.size());

        let preamble = metadata::read_preamble(&mut reader, &layout)?;
        let types = metadata::read_types(
            &mut reader,
            &layout,
            preamble.enable_type_tree,
            false,
            TypeTreeMode::Parse,
        )?;
        let big_id_enabled = metadata::read_big_id_enabled(&mut reader, &layout)?;

        let count = reader.read_count()?;
        let mut objects = Vec::with_capacity(count.min(reader.remaining() / 20));
        for _ in 0..count {
            objects.push(metadata::read_object(
                &mut reader,
                &layout,
                big_id_enabled,
                header.data_offset,
                &types,
            )?);
        }

        let script_types = metadata::read_script_types(&mut reader, &layout)?;
        let externals = metadata::read_externals(&mut reader, &layout)?;

        let ref_types = if layout.has_ref_types {
            metadata::read_types(
                &mut reader,
                &layout,
                preamble.enable_type_tree,
                true,
                TypeTreeMode::Parse,
            )?
        } else {
            Vec::new()
        };

        let user_information = if layout.has_user_information {
            reader.read_cstring()?
        } else {
            String::new()
        };

        debug!(
            version = header.version,
            unity_version = %preamble.unity_version,
            types = types.len(),
            objects = objects.len(),
            externals = externals.len(),
            "read serialized file metadata"
        );

        let path_ids = objects
            .iter()
            .enumerate()
            .map(|(i, o)| (o.path_id, i))
            .collect();

        Ok(SerializedFile {
            header,
            unity_version: preamble.unity_version,
            target_platform: preamble.target_platform,
            enable_type_tree: preamble.enable_type_tree,
            types,
            big_id_enabled,
            objects,
            script_types,
            externals,
            ref_types,
            user_information,
            path_ids,
            data,
        })
    }

    /// Read a serialized file, reporting every problem instead of stopping at the first one.
    ///
    /// A file is only returned when no error was found.
    pub fn try_parse(data: impl Into<Bytes>) -> (Option<SerializedFile>, Vec<String>) {
        match Self::parse(data) {
            Ok(file) => {
                let errors = file
                    .validate()
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>();
                if errors.is_empty() {
                    (Some(file), errors)
                } else {
                    (None, errors)
                }
            }
            Err(err) => (None, vec![err.to_string()]),
        }
    }

    /// Every object whose data lies outside of the file
    pub fn validate(&self) -> Vec<Error> {
        self.objects
            .iter()
            .filter(|o| o.byte_end() > self.data.len() as u64)
            .map(|o| self.out_of_bounds(o))
            .collect()
    }

    fn out_of_bounds(&self, object: &ObjectInfo) -> Error {
        Error::ObjectOutOfBounds {
            path_id: object.path_id,
            start: object.byte_start,
            size: object.byte_size,
            len: self.data.len(),
        }
    }

    pub fn header(&self) -> &SerializedFileHeader {
        &self.header
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    /// Engine version that wrote the file, e.g. `2019.4.16f1`
    ///
    /// Release builds may strip it to `0.0.0`.
    pub fn unity_version(&self) -> &str {
        &self.unity_version
    }

    pub fn target_platform(&self) -> i32 {
        self.target_platform
    }

    pub fn enable_type_tree(&self) -> bool {
        self.enable_type_tree
    }

    pub fn big_id_enabled(&self) -> bool {
        self.big_id_enabled
    }

    pub fn types(&self) -> &[SerializedType] {
        &self.types
    }

    pub fn objects(&self) -> &[ObjectInfo] {
        &self.objects
    }

    pub fn script_types(&self) -> &[ScriptType] {
        &self.script_types
    }

    pub fn externals(&self) -> &[ExternalReference] {
        &self.externals
    }

    pub fn ref_types(&self) -> &[SerializedType] {
        &self.ref_types
    }

    pub fn user_information(&self) -> &str {
        &self.user_information
    }

    /// The whole file
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Find an object by path id; absence is not an error
    pub fn find_object(&self, path_id: i64) -> Option<&ObjectInfo> {
        self.path_ids
            .get(&path_id)
            .and_then(|index| self.objects.get(*index))
    }

    /// Objects of a class in table order
    pub fn objects_by_class_id(
        &self,
        class_id: impl Into<ClassId>,
    ) -> impl Iterator<Item = &ObjectInfo> {
        let class_id = class_id.into();
        self.objects.iter().filter(move |o| o.class_id == class_id)
    }

    /// Type table entry of an object, when the file has one for it
    pub fn object_type(&self, object: &ObjectInfo) -> Option<&SerializedType> {
        if self.header.layout().has_object_class_id {
            let class_id = i32::from(object.class_id);
            return self.types.iter().find(|t| t.class_id == class_id);
        }
        usize::try_from(object.type_id)
            .ok()
            .and_then(|index| self.types.get(index))
    }

    /// The raw bytes of an object, as a view into the file
    pub fn read_object_data(&self, object: &ObjectInfo) -> Result<Bytes> {
        if object.byte_end() > self.data.len() as u64 {
            return Err(self.out_of_bounds(object));
        }
        Ok(self
            .data
            .slice(object.byte_start as usize..object.byte_end() as usize))
    }
}
