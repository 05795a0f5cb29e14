//! Summaries of the object table for operators.

use std::{collections::BTreeMap, fmt};

use serde::Serialize;

use crate::{error::Result, read::SerializedFile, types::ClassId};

/// Object counts per class of one serialized file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ObjectSummary {
    pub version: u32,
    pub unity_version: String,
    pub object_count: usize,
    pub type_count: usize,
    pub external_count: usize,
    /// Class name to number of objects of that class
    pub classes: BTreeMap<String, usize>,
    pub renderable_class_ids: Vec<ClassId>,
}

impl ObjectSummary {
    pub fn has_renderable(&self) -> bool {
        !self.renderable_class_ids.is_empty()
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl From<&SerializedFile> for ObjectSummary {
    fn from(file: &SerializedFile) -> Self {
        let mut classes = BTreeMap::new();
        let mut renderable_class_ids = Vec::new();
        for object in file.objects() {
            *classes.entry(object.class_id.to_string()).or_insert(0) += 1;
            if object.class_id.is_renderable() && !renderable_class_ids.contains(&object.class_id)
            {
                renderable_class_ids.push(object.class_id);
            }
        }

        ObjectSummary {
            version: file.version(),
            unity_version: file.unity_version().to_owned(),
            object_count: file.objects().len(),
            type_count: file.types().len(),
            external_count: file.externals().len(),
            classes,
            renderable_class_ids,
        }
    }
}

impl fmt::Display for ObjectSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "serialized file v{} ({}): {} objects, {} types, {} externals",
            self.version,
            self.unity_version,
            self.object_count,
            self.type_count,
            self.external_count
        )?;
        for (class, count) in &self.classes {
            writeln!(f, "  {count:>6} {class}")?;
        }
        if self.has_renderable() {
            let names = self
                .renderable_class_ids
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>();
            writeln!(f, "renderable: {}", names.join(", "))?;
        }
        Ok(())
    }
}
