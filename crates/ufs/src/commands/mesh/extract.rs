use std::{fs::File, io::Write, path::PathBuf};

use clap::Args;
use miette::{Context, IntoDiagnostic, Result};
use tracing::info;
use ufs_mesh::{extract_meshes_with, ExtractOptions};

use crate::commands::read_file;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Write the geometry here instead of standard output
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only read the first serialized file of the bundle
    #[arg(long, default_value_t = false)]
    first_only: bool,

    /// Do not load vertex buffers from resource nodes
    #[arg(long, default_value_t = false)]
    no_stream_data: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let options = ExtractOptions::builder()
            .all_nodes(!self.first_only)
            .resolve_stream_data(!self.no_stream_data)
            .build();
        let meshes = extract_meshes_with(read_file(&self.file)?, options)?;
        info!("reconstructed {} meshes", meshes.len());

        let json = serde_json::to_string_pretty(&meshes).into_diagnostic()?;
        match &self.output {
            Some(path) => {
                let mut out = File::create(path)
                    .into_diagnostic()
                    .context(format!("creating {}", path.display()))?;
                out.write_all(json.as_bytes()).into_diagnostic()?;
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}
