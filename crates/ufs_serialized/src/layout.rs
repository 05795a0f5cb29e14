//! Version dependent field layout of a serialized file.

/// Which optional fields exist and how wide the variable width fields are
///
/// Computed once from the header version and consulted by every read that follows.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct FieldLayout {
    pub version: u32,

    /// Header stores metadata size, file size and data offset again as 32/64/64-bit fields
    pub wide_header: bool,
    pub has_endianness: bool,

    pub has_unity_version: bool,
    pub has_target_platform: bool,
    pub has_type_tree_flag: bool,
    pub has_big_id_flag: bool,

    pub blob_type_tree: bool,
    /// Blob type tree nodes carry an extra 64-bit reference type hash
    pub type_tree_node_hash: bool,
    pub has_stripped_type: bool,
    pub has_type_script_index: bool,
    pub has_type_hashes: bool,
    pub has_type_dependencies: bool,

    pub align_objects: bool,
    pub wide_path_id: bool,
    pub wide_byte_start: bool,
    pub has_object_class_id: bool,
    pub has_is_destroyed: bool,
    pub has_object_script_index: bool,
    pub has_object_stripped: bool,

    pub has_script_types: bool,
    pub wide_script_identifier: bool,
    pub has_external_temp: bool,
    pub has_external_guid: bool,
    pub has_ref_types: bool,
    pub has_user_information: bool,
}

impl FieldLayout {
    pub fn for_version(version: u32) -> Self {
        Self {
            version,
            wide_header: version >= 22,
            has_endianness: version >= 9,
            has_unity_version: version >= 7,
            has_target_platform: version >= 8,
            has_type_tree_flag: version >= 13,
            has_big_id_flag: (7..14).contains(&version),
            blob_type_tree: version >= 12 || version == 10,
            type_tree_node_hash: version >= 19,
            has_stripped_type: version >= 16,
            has_type_script_index: version >= 17,
            has_type_hashes: version >= 13,
            has_type_dependencies: version >= 21,
            align_objects: version >= 14,
            wide_path_id: version >= 14,
            wide_byte_start: version >= 22,
            has_object_class_id: version < 16,
            has_is_destroyed: version < 11,
            has_object_script_index: (11..17).contains(&version),
            has_object_stripped: (15..17).contains(&version),
            has_script_types: version >= 11,
            wide_script_identifier: version >= 14,
            has_external_temp: version >= 6,
            has_external_guid: version >= 5,
            has_ref_types: version >= 20,
            has_user_information: version >= 5,
        }
    }

    /// Size of the header in bytes
    pub fn header_size(&self) -> usize {
        if self.wide_header {
            48
        } else {
            20
        }
    }

    /// Size of one blob type tree node record in bytes
    pub fn type_tree_node_size(&self) -> usize {
        if self.type_tree_node_hash {
            32
        } else {
            24
        }
    }
}

#[cfg(test)]
mod test {
    use super::FieldLayout;

    #[test]
    fn widths_switch_at_thresholds() {
        let old = FieldLayout::for_version(13);
        assert!(!old.wide_path_id);
        assert!(!old.align_objects);
        assert!(old.has_big_id_flag);

        let modern = FieldLayout::for_version(14);
        assert!(modern.wide_path_id);
        assert!(modern.align_objects);
        assert!(!modern.has_big_id_flag);

        assert!(!FieldLayout::for_version(21).wide_header);
        assert!(FieldLayout::for_version(22).wide_header);
        assert!(FieldLayout::for_version(22).wide_byte_start);
        assert_eq!(FieldLayout::for_version(21).header_size(), 20);
        assert_eq!(FieldLayout::for_version(22).header_size(), 48);
    }

    #[test]
    fn narrow_bands() {
        assert!(!FieldLayout::for_version(14).has_object_stripped);
        assert!(FieldLayout::for_version(15).has_object_stripped);
        assert!(FieldLayout::for_version(16).has_object_stripped);
        assert!(!FieldLayout::for_version(17).has_object_stripped);

        assert!(!FieldLayout::for_version(10).has_object_script_index);
        assert!(FieldLayout::for_version(11).has_object_script_index);
        assert!(!FieldLayout::for_version(17).has_object_script_index);

        assert!(FieldLayout::for_version(10).blob_type_tree);
        assert!(!FieldLayout::for_version(11).blob_type_tree);
        assert_eq!(FieldLayout::for_version(19).type_tree_node_size(), 32);
    }
}
