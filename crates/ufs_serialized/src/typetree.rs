//! Type trees describe the field layout of object classes.
//!
//! Two encodings exist. The blob encoding stores a flat array of fixed size node records followed
//! by a string buffer; names whose offset has the high bit set are looked up in the engine's
//! common string table instead. The legacy encoding stores each node recursively with inline
//! strings.

use serde::Serialize;

use crate::{
    error::{Error, Result},
    layout::FieldLayout,
    reader::EndianReader,
};

/// Offsets with this bit set index into [`COMMON_STRINGS`]
pub const COMMON_STRING_FLAG: u32 = 0x8000_0000;

/// Names shared by every engine build, concatenated with zero separators
pub const COMMON_STRINGS: &str = "AABB\0AnimationClip\0AnimationCurve\0AnimationState\0Array\0\
Base\0BitField\0bitset\0bool\0char\0ColorRGBA\0Component\0data\0deque\0double\0dynamic_array\0\
FastPropertyName\0first\0float\0Font\0GameObject\0Generic Mono\0GradientNEW\0GUID\0GUIStyle\0\
int\0list\0long long\0map\0Matrix4x4f\0MdFour\0MonoBehaviour\0MonoScript\0m_ByteSize\0m_Curve\0\
m_EditorClassIdentifier\0m_EditorHideFlags\0m_Enabled\0m_ExtensionPtr\0m_GameObject\0m_Index\0\
m_IsArray\0m_IsStatic\0m_MetaFlag\0m_Name\0m_ObjectHideFlags\0m_PrefabInternal\0\
m_PrefabParentObject\0m_Script\0m_StaticEditorFlags\0m_Type\0m_Version\0Object\0pair\0\
PPtr<Component>\0PPtr<GameObject>\0PPtr<Material>\0PPtr<MonoBehaviour>\0PPtr<MonoScript>\0\
PPtr<Object>\0PPtr<Prefab>\0PPtr<Sprite>\0PPtr<TextAsset>\0PPtr<Texture>\0PPtr<Texture2D>\0\
PPtr<Transform>\0Prefab\0Quaternionf\0Rectf\0RectInt\0RectOffset\0second\0set\0short\0size\0\
SInt16\0SInt32\0SInt64\0SInt8\0staticvector\0string\0TextAsset\0TextMesh\0Texture\0Texture2D\0\
Transform\0TypelessData\0UInt16\0UInt32\0UInt64\0UInt8\0unsigned int\0unsigned long long\0\
unsigned short\0vector\0Vector2f\0Vector3f\0Vector4f\0m_ScriptingClassIdentifier\0Gradient\0\
Type*\0int2_storage\0int3_storage\0BoundsInt\0m_CorrespondingSourceObject\0m_PrefabInstance\0\
m_PrefabAsset\0FileSize\0Hash128\0";

/// Common string starting at `offset`
pub fn common_string(offset: u32) -> Option<&'static str> {
    let rest = COMMON_STRINGS.get(offset as usize..)?;
    rest.split('\0').next().filter(|s| !s.is_empty())
}

/// Offset of `name` in the common string table, if it is one of the shared names
pub fn common_string_offset(name: &str) -> Option<u32> {
    let mut offset = 0;
    for entry in COMMON_STRINGS.split('\0') {
        if entry == name && !entry.is_empty() {
            return Some(offset as u32);
        }
        offset += entry.len() + 1;
    }
    None
}

/// One field of a type tree
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeTreeNode {
    pub version: u16,
    pub level: u8,
    pub type_flags: u8,
    pub type_name: String,
    pub name: String,
    pub byte_size: i32,
    pub index: i32,
    pub meta_flag: i32,
    pub ref_type_hash: u64,
}

impl TypeTreeNode {
    pub fn is_array(&self) -> bool {
        self.type_flags & 0x1 != 0
    }

    /// Whether the field is followed by alignment to 4 bytes
    pub fn is_aligned(&self) -> bool {
        self.meta_flag & 0x4000 != 0
    }
}

/// Flattened type tree in depth first order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TypeTree {
    pub nodes: Vec<TypeTreeNode>,
}

impl TypeTree {
    /// The root node, usually named `Base`
    pub fn root(&self) -> Option<&TypeTreeNode> {
        self.nodes.first()
    }

    /// Direct children of the root
    pub fn fields(&self) -> impl Iterator<Item = &TypeTreeNode> {
        self.nodes.iter().filter(|n| n.level == 1)
    }

    /// Read a type tree in the encoding used by `layout`
    pub fn read(reader: &mut EndianReader, layout: &FieldLayout) -> Result<Self> {
        let mut nodes = Vec::new();
        if layout.blob_type_tree {
            read_blob(reader, layout, &mut nodes)?;
        } else {
            read_legacy(reader, &mut nodes)?;
        }
        Ok(TypeTree { nodes })
    }

    /// Advance past a type tree without building its nodes
    pub fn skip(reader: &mut EndianReader, layout: &FieldLayout) -> Result<()> {
        if layout.blob_type_tree {
            let node_count = reader.read_count()?;
            let string_buffer_size = reader.read_count()?;
            let records = node_count.saturating_mul(layout.type_tree_node_size());
            reader.skip(records.saturating_add(string_buffer_size))
        } else {
            skip_legacy(reader)
        }
    }
}

fn resolve_string(buffer: &[u8], offset: u32) -> String {
    if offset & COMMON_STRING_FLAG != 0 {
        return common_string(offset & !COMMON_STRING_FLAG)
            .map(str::to_owned)
            .unwrap_or_else(|| offset.to_string());
    }

    match buffer.get(offset as usize..) {
        Some(rest) => {
            let end = rest.iter().position(|b| *b == 0).unwrap_or(rest.len());
            String::from_utf8_lossy(&rest[..end]).into_owned()
        }
        None => offset.to_string(),
    }
}

fn read_blob(
    reader: &mut EndianReader,
    layout: &FieldLayout,
    nodes: &mut Vec<TypeTreeNode>,
) -> Result<()> {
    let node_count = reader.read_count()?;
    let string_buffer_size = reader.read_count()?;

    let mut offsets = Vec::with_capacity(node_count.min(reader.remaining() / 24));
    for _ in 0..node_count {
        let mut node = TypeTreeNode {
            version: reader.read_u16()?,
            level: reader.read_u8()?,
            type_flags: reader.read_u8()?,
            ..Default::default()
        };
        let type_offset = reader.read_u32()?;
        let name_offset = reader.read_u32()?;
        node.byte_size = reader.read_i32()?;
        node.index = reader.read_i32()?;
        node.meta_flag = reader.read_i32()?;
        if layout.type_tree_node_hash {
            node.ref_type_hash = reader.read_u64()?;
        }
        offsets.push((type_offset, name_offset));
        nodes.push(node);
    }

    let buffer = reader.take(string_buffer_size)?;
    for (node, (type_offset, name_offset)) in nodes.iter_mut().zip(offsets) {
        node.type_name = resolve_string(buffer, type_offset);
        node.name = resolve_string(buffer, name_offset);
    }
    Ok(())
}

fn read_legacy(reader: &mut EndianReader, nodes: &mut Vec<TypeTreeNode>) -> Result<()> {
    // children left to read at each open level, so deep trees don't recurse
    let mut pending: Vec<usize> = Vec::new();
    loop {
        let position = reader.position();
        let level = u8::try_from(pending.len()).map_err(|_| Error::TypeTreeTooDeep {
            position,
            max: u8::MAX,
        })?;
        nodes.push(TypeTreeNode {
            level,
            type_name: reader.read_cstring()?,
            name: reader.read_cstring()?,
            byte_size: reader.read_i32()?,
            index: reader.read_i32()?,
            type_flags: reader.read_i32()? as u8,
            version: reader.read_i32()? as u16,
            meta_flag: reader.read_i32()?,
            ..Default::default()
        });

        let children = reader.read_count()?;
        if children > 0 {
            pending.push(children);
            continue;
        }

        loop {
            match pending.last_mut() {
                None => return Ok(()),
                Some(left) if *left > 1 => {
                    *left -= 1;
                    break;
                }
                Some(_) => {
                    pending.pop();
                }
            }
        }
    }
}

fn skip_legacy(reader: &mut EndianReader) -> Result<()> {
    // pending children, so deep trees don't recurse
    let mut pending = 1usize;
    while pending > 0 {
        pending -= 1;
        reader.read_cstring()?;
        reader.read_cstring()?;
        reader.skip(5 * 4)?;
        pending = pending.saturating_add(reader.read_count()?);
    }
    Ok(())
}

#[cfg(test)]
mod test {
    use binrw::Endian;
    use pretty_assertions::assert_eq;

    use super::{common_string, common_string_offset, TypeTree, COMMON_STRING_FLAG};
    use crate::error::{Error, Result};
    use crate::layout::FieldLayout;
    use crate::reader::EndianReader;

    #[test]
    fn common_strings_resolve_by_offset() {
        assert_eq!(common_string(0), Some("AABB"));
        assert_eq!(common_string(55), Some("Base"));
        assert_eq!(common_string(427), Some("m_Name"));
        assert_eq!(common_string(4), None);
        assert_eq!(common_string(100_000), None);

        assert_eq!(common_string_offset("Base"), Some(55));
        assert_eq!(common_string_offset("m_Name"), Some(427));
        assert_eq!(common_string_offset("NotShared"), None);
    }

    fn blob_node(out: &mut Vec<u8>, level: u8, type_offset: u32, name_offset: u32, hash: bool) {
        out.extend_from_slice(&1u16.to_le_bytes());
        out.push(level);
        out.push(0);
        out.extend_from_slice(&type_offset.to_le_bytes());
        out.extend_from_slice(&name_offset.to_le_bytes());
        out.extend_from_slice(&(-1i32).to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&0x4000i32.to_le_bytes());
        if hash {
            out.extend_from_slice(&0u64.to_le_bytes());
        }
    }

    #[test]
    fn blob_tree_mixes_local_and_common_strings() -> Result<()> {
        let strings = b"Mesh\0";
        let mut data = Vec::new();
        data.extend_from_slice(&2i32.to_le_bytes());
        data.extend_from_slice(&(strings.len() as i32).to_le_bytes());
        blob_node(&mut data, 0, 0, COMMON_STRING_FLAG | 55, true);
        blob_node(
            &mut data,
            1,
            COMMON_STRING_FLAG | common_string_offset("string").unwrap_or_default(),
            COMMON_STRING_FLAG | 427,
            true,
        );
        data.extend_from_slice(strings);
        data.push(0xAA);

        let layout = FieldLayout::for_version(22);
        let mut reader = EndianReader::new(&data, Endian::Little);
        let tree = TypeTree::read(&mut reader, &layout)?;

        assert_eq!(tree.nodes.len(), 2);
        assert_eq!(tree.root().map(|n| n.type_name.as_str()), Some("Mesh"));
        assert_eq!(tree.root().map(|n| n.name.as_str()), Some("Base"));

        let fields = tree.fields().collect::<Vec<_>>();
        assert_eq!(fields[0].type_name, "string");
        assert_eq!(fields[0].name, "m_Name");
        assert!(fields[0].is_aligned());
        assert_eq!(reader.read_u8()?, 0xAA);

        let mut reader = EndianReader::new(&data, Endian::Little);
        TypeTree::skip(&mut reader, &layout)?;
        assert_eq!(reader.read_u8()?, 0xAA);

        Ok(())
    }

    fn legacy_node(out: &mut Vec<u8>, type_name: &str, name: &str, children: i32) {
        out.extend_from_slice(type_name.as_bytes());
        out.push(0);
        out.extend_from_slice(name.as_bytes());
        out.push(0);
        for value in [4i32, 0, 0, 1, 0, children] {
            out.extend_from_slice(&value.to_le_bytes());
        }
    }

    #[test]
    fn legacy_tree_is_flattened_depth_first() -> Result<()> {
        let mut data = Vec::new();
        legacy_node(&mut data, "GameObject", "Base", 2);
        legacy_node(&mut data, "vector", "m_Component", 1);
        legacy_node(&mut data, "Array", "Array", 0);
        legacy_node(&mut data, "string", "m_Name", 0);
        data.push(0x55);

        let layout = FieldLayout::for_version(9);
        let mut reader = EndianReader::new(&data, Endian::Little);
        let tree = TypeTree::read(&mut reader, &layout)?;

        let names = tree
            .nodes
            .iter()
            .map(|n| (n.level, n.name.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            names,
            vec![(0, "Base"), (1, "m_Component"), (2, "Array"), (1, "m_Name")]
        );
        assert_eq!(reader.read_u8()?, 0x55);

        let mut reader = EndianReader::new(&data, Endian::Little);
        TypeTree::skip(&mut reader, &layout)?;
        assert_eq!(reader.read_u8()?, 0x55);

        Ok(())
    }

    fn legacy_chain(depth: usize) -> Vec<u8> {
        let mut data = Vec::new();
        for level in 0..depth {
            let children = i32::from(level + 1 < depth);
            legacy_node(&mut data, "Generic", "child", children);
        }
        data
    }

    #[test]
    fn legacy_tree_keeps_every_level_up_to_the_limit() -> Result<()> {
        let data = legacy_chain(256);

        let layout = FieldLayout::for_version(11);
        let mut reader = EndianReader::new(&data, Endian::Little);
        let tree = TypeTree::read(&mut reader, &layout)?;

        assert_eq!(tree.nodes.len(), 256);
        assert_eq!(tree.nodes.last().map(|n| n.level), Some(u8::MAX));
        assert!(tree.nodes.iter().enumerate().all(|(i, n)| n.level as usize == i));
        assert_eq!(reader.remaining(), 0);

        Ok(())
    }

    #[test]
    fn deep_legacy_chain_is_an_error() {
        let data = legacy_chain(200_000);
        let layout = FieldLayout::for_version(9);

        let mut reader = EndianReader::new(&data, Endian::Little);
        assert!(matches!(
            TypeTree::read(&mut reader, &layout),
            Err(Error::TypeTreeTooDeep { max: 255, .. })
        ));

        let mut reader = EndianReader::new(&data, Endian::Little);
        assert!(TypeTree::skip(&mut reader, &layout).is_ok());
        assert_eq!(reader.remaining(), 0);
    }
}
