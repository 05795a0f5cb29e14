//! Records stored in the metadata of a serialized file.

use std::fmt;

use derive_more::derive::{Deref, From};
use serde::{Serialize, Serializer};

use crate::typetree::TypeTree;

/// Engine class identifiers relevant to asset inspection
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ClassId {
    GameObject,
    Component,
    Transform,
    Material,
    MeshRenderer,
    Texture2D,
    MeshFilter,
    Mesh,
    Shader,
    TextAsset,
    AnimationClip,
    AudioClip,
    Avatar,
    Animator,
    MonoBehaviour,
    MonoScript,
    Font,
    SkinnedMeshRenderer,
    AssetBundle,
    PreloadData,
    Sprite,
    RectTransform,
    /// A class id this library has no name for
    Unknown(i32),
}

impl ClassId {
    /// Classes that carry geometry or draw it
    pub const RENDERABLE: [ClassId; 3] = [
        ClassId::Mesh,
        ClassId::MeshRenderer,
        ClassId::SkinnedMeshRenderer,
    ];

    pub fn is_renderable(&self) -> bool {
        Self::RENDERABLE.contains(self)
    }
}

impl From<i32> for ClassId {
    fn from(value: i32) -> Self {
        match value {
            1 => ClassId::GameObject,
            2 => ClassId::Component,
            4 => ClassId::Transform,
            21 => ClassId::Material,
            23 => ClassId::MeshRenderer,
            28 => ClassId::Texture2D,
            33 => ClassId::MeshFilter,
            43 => ClassId::Mesh,
            48 => ClassId::Shader,
            49 => ClassId::TextAsset,
            74 => ClassId::AnimationClip,
            83 => ClassId::AudioClip,
            90 => ClassId::Avatar,
            95 => ClassId::Animator,
            114 => ClassId::MonoBehaviour,
            115 => ClassId::MonoScript,
            128 => ClassId::Font,
            137 => ClassId::SkinnedMeshRenderer,
            142 => ClassId::AssetBundle,
            150 => ClassId::PreloadData,
            213 => ClassId::Sprite,
            224 => ClassId::RectTransform,
            other => ClassId::Unknown(other),
        }
    }
}

impl From<ClassId> for i32 {
    fn from(value: ClassId) -> Self {
        match value {
            ClassId::GameObject => 1,
            ClassId::Component => 2,
            ClassId::Transform => 4,
            ClassId::Material => 21,
            ClassId::MeshRenderer => 23,
            ClassId::Texture2D => 28,
            ClassId::MeshFilter => 33,
            ClassId::Mesh => 43,
            ClassId::Shader => 48,
            ClassId::TextAsset => 49,
            ClassId::AnimationClip => 74,
            ClassId::AudioClip => 83,
            ClassId::Avatar => 90,
            ClassId::Animator => 95,
            ClassId::MonoBehaviour => 114,
            ClassId::MonoScript => 115,
            ClassId::Font => 128,
            ClassId::SkinnedMeshRenderer => 137,
            ClassId::AssetBundle => 142,
            ClassId::PreloadData => 150,
            ClassId::Sprite => 213,
            ClassId::RectTransform => 224,
            ClassId::Unknown(other) => other,
        }
    }
}

impl fmt::Display for ClassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassId::Unknown(id) => write!(f, "Unknown({id})"),
            known => write!(f, "{known:?}"),
        }
    }
}

impl Serialize for ClassId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_i32((*self).into())
    }
}

/// A 128-bit identifier, displayed as lowercase hex
#[derive(Deref, From, Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub struct Guid([u8; 16]);

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl Serialize for Guid {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.collect_str(self)
    }
}

/// An entry of the type table
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SerializedType {
    pub class_id: i32,
    pub is_stripped_type: bool,
    pub script_type_index: i16,
    pub script_id: Option<Guid>,
    pub old_type_hash: Option<Guid>,
    pub type_tree: Option<TypeTree>,
    pub type_dependencies: Vec<i32>,
    /// Class, namespace and assembly names of a reference type
    pub ref_type_names: Option<(String, String, String)>,
}

impl SerializedType {
    pub fn class(&self) -> ClassId {
        self.class_id.into()
    }
}

/// An entry of the object table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ObjectInfo {
    /// Identity of the object within its file
    pub path_id: i64,

    /// Offset of the object data from the start of the file
    pub byte_start: u64,
    pub byte_size: u32,

    /// Index into the type table, or the class id for files older than version 16
    pub type_id: i32,
    pub class_id: ClassId,
    pub is_destroyed: u16,
    pub script_type_index: i16,
    pub stripped: bool,
}

impl ObjectInfo {
    /// Exclusive end of the object data
    pub fn byte_end(&self) -> u64 {
        self.byte_start.saturating_add(self.byte_size as u64)
    }
}

/// A script referenced by MonoBehaviour objects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ScriptType {
    pub local_serialized_file_index: i32,
    pub local_identifier_in_file: i64,
}

/// Another file this one depends on
///
/// The path is kept as written, resolving it is up to the caller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExternalReference {
    pub guid: Guid,
    pub kind: i32,
    pub path: String,
}

impl ExternalReference {
    /// Final component of the path, e.g. `cab-0123` for `archive:/CAB-0123/cab-0123`
    pub fn file_name(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or(&self.path)
    }
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;

    use super::{ClassId, ExternalReference, Guid};

    #[test]
    fn class_ids_map_both_ways() {
        assert_eq!(ClassId::from(43), ClassId::Mesh);
        assert_eq!(ClassId::from(137), ClassId::SkinnedMeshRenderer);
        assert_eq!(ClassId::from(9999), ClassId::Unknown(9999));
        assert_eq!(i32::from(ClassId::Texture2D), 28);
        assert_eq!(i32::from(ClassId::Unknown(-5)), -5);
    }

    #[test]
    fn renderable_classes() {
        assert!(ClassId::Mesh.is_renderable());
        assert!(ClassId::MeshRenderer.is_renderable());
        assert!(!ClassId::Texture2D.is_renderable());
        assert!(!ClassId::Unknown(43_000).is_renderable());
    }

    #[test]
    fn class_id_display() {
        assert_eq!(ClassId::Mesh.to_string(), "Mesh");
        assert_eq!(ClassId::Unknown(7).to_string(), "Unknown(7)");
    }

    #[test]
    fn external_file_name() {
        let external = ExternalReference {
            guid: Guid::from([0xAB; 16]),
            kind: 0,
            path: "archive:/CAB-abc/CAB-abc".into(),
        };

        assert_eq!(external.file_name(), "CAB-abc");
        assert_eq!(external.guid.to_string(), "ab".repeat(16));
    }
}
