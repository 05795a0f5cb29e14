use std::path::Path;

use miette::{Context, IntoDiagnostic, Result};

pub mod bundle;
pub mod mesh;
pub mod serialized;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle UnityFS bundles
    Bundle {
        #[command(subcommand)]
        command: bundle::BundleCommands,
    },
    /// Handle serialized files, on their own or inside a bundle
    Serialized {
        #[command(subcommand)]
        command: serialized::SerializedCommands,
    },
    /// Handle meshes stored in bundles
    Mesh {
        #[command(subcommand)]
        command: mesh::MeshCommands,
    },
}

impl Commands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            Commands::Bundle { command } => command.handle(),
            Commands::Serialized { command } => command.handle(),
            Commands::Mesh { command } => command.handle(),
        }
    }
}

pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))
}

pub(crate) fn is_bundle(data: &[u8]) -> bool {
    data.starts_with(ufs_bundle::types::SIGNATURE)
}
