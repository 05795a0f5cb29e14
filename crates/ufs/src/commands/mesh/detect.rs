use std::path::PathBuf;

use clap::Args;
use itertools::Itertools;
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use tracing::{debug, warn};
use ufs_bundle::Bundle;
use walkdir::WalkDir;

use crate::commands::{is_bundle, read_file};

#[derive(Args)]
pub struct DetectArgs {
    /// A bundle, or a directory searched recursively for bundles
    #[arg(short, long, value_name = "PATH")]
    path: PathBuf,

    /// Also read every mesh and print what it carries
    #[arg(long, default_value_t = false)]
    diagnose: bool,
}

impl DetectArgs {
    pub fn handle(&self) -> Result<()> {
        let mut renderable = 0;
        for entry in WalkDir::new(&self.path).sort_by_file_name() {
            let entry = entry.into_diagnostic()?;
            if !entry.file_type().is_file() {
                continue;
            }

            let data = read_file(entry.path())?;
            if !is_bundle(&data) {
                debug!("skipping {}", entry.path().display());
                continue;
            }

            // one broken bundle should not end a directory scan
            match self.detect(&data) {
                Ok(found) if found.is_empty() => {}
                Ok(found) => {
                    renderable += 1;
                    println!("{}", entry.path().display().bold());
                    for line in found {
                        println!("  {line}");
                    }
                }
                Err(err) => warn!("{}: {err}", entry.path().display()),
            }
        }

        println!("{renderable} bundles with renderable objects");
        Ok(())
    }

    fn detect(&self, data: &[u8]) -> Result<Vec<String>> {
        let bundle = Bundle::parse(data.to_vec())?;

        let mut found = Vec::new();
        for node in bundle.serialized_nodes() {
            let node_data = bundle.read_node(node)?;
            let classes = ufs_serialized::detect_renderable_class_ids(&node_data)?;
            if !classes.is_empty() {
                found.push(format!(
                    "{}: {}",
                    node.path,
                    classes.iter().map(|c| c.green().to_string()).join(", ")
                ));
            }
        }

        if self.diagnose && !found.is_empty() {
            for diagnostics in ufs_mesh::diagnose_meshes(data.to_vec())? {
                found.push(diagnostics.to_string());
            }
        }
        Ok(found)
    }
}
