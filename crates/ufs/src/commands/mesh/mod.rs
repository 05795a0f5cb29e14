pub mod detect;
pub mod extract;

#[derive(clap::Subcommand)]
pub enum MeshCommands {
    /// Reconstruct the meshes of a bundle as JSON geometry
    Extract(extract::ExtractArgs),
    /// Find bundles holding renderable objects
    Detect(detect::DetectArgs),
}

impl MeshCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            MeshCommands::Extract(extract) => extract.handle(),
            MeshCommands::Detect(detect) => detect.handle(),
        }
    }
}
