use std::{fs::File, io::Write, path::PathBuf};

use clap::Args;
use miette::{miette, Context, IntoDiagnostic, Result};
use tracing::info;
use ufs_bundle::Bundle;

use crate::commands::read_file;

#[derive(Args)]
pub struct ExtractArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let bundle = Bundle::parse(read_file(&self.file)?)?;

        for node in bundle.nodes() {
            if node.is_directory() {
                continue;
            }
            let p = self.directory.join(&node.path);
            if !p.starts_with(&self.directory) || node.path.split('/').any(|c| c == "..") {
                return Err(miette!("refusing to write {} outside of the target", node.path));
            }
            info!("writing {}", p.display());

            if let Some(parent) = p.parent() {
                std::fs::create_dir_all(parent)
                    .into_diagnostic()
                    .context(format!("creating {}", parent.display()))?;
            }
            let mut out = if !self.overwrite {
                File::create_new(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            } else {
                File::create(&p)
                    .into_diagnostic()
                    .context(format!("creating {}", &p.display()))?
            };

            out.write_all(&bundle.read_node(node)?).into_diagnostic()?;
        }
        Ok(())
    }
}
