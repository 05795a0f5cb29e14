//! Classify a serialized file by the classes of its objects without reading any object data.
//!
//! Only the header, the type table (with type trees stepped over) and the object table are
//! visited. Nothing after the object table is read.

use std::ops::ControlFlow;

use indexmap::IndexSet;
use tracing::{instrument, trace};

use crate::{
    error::Result,
    header::SerializedFileHeader,
    metadata::{self, TypeTreeMode},
    reader::EndianReader,
    types::ClassId,
};

/// Whether the file holds at least one object of a renderable class
///
/// Returns as soon as the first renderable object is found; records after it are never read.
#[instrument(skip(data), fields(len = data.len()), ret, err)]
pub fn detect_renderable(data: &[u8]) -> Result<bool> {
    let mut found = false;
    scan_classes(data, |class_id| {
        if class_id.is_renderable() {
            found = true;
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    })?;
    Ok(found)
}

/// Every distinct renderable class present in the file, in order of first appearance
#[instrument(skip(data), fields(len = data.len()), err)]
pub fn detect_renderable_class_ids(data: &[u8]) -> Result<IndexSet<ClassId>> {
    let mut classes = IndexSet::new();
    scan_classes(data, |class_id| {
        if class_id.is_renderable() {
            classes.insert(class_id);
        }
        ControlFlow::Continue(())
    })?;
    Ok(classes)
}

/// Walk the object table in order, handing each class id to `visit` until it breaks
pub fn scan_classes(
    data: &[u8],
    mut visit: impl FnMut(ClassId) -> ControlFlow<()>,
) -> Result<()> {
    let header = SerializedFileHeader::read(data)?;
    let layout = header.layout();

    let mut reader = EndianReader::new(data, header.endian());
    reader.set_position(header.size());

    let preamble = metadata::read_preamble(&mut reader, &layout)?;
    let types = metadata::read_types(
        &mut reader,
        &layout,
        preamble.enable_type_tree,
        false,
        TypeTreeMode::Skip,
    )?;
    let big_id_enabled = metadata::read_big_id_enabled(&mut reader, &layout)?;

    let count = reader.read_count()?;
    for index in 0..count {
        let object = metadata::read_object(
            &mut reader,
            &layout,
            big_id_enabled,
            header.data_offset,
            &types,
        )?;
        trace!(index, class_id = %object.class_id, "visiting object");
        if visit(object.class_id).is_break() {
            break;
        }
    }
    Ok(())
}
