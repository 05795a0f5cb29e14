pub mod extract;
pub mod info;
pub mod verify;

#[derive(clap::Subcommand)]
pub enum BundleCommands {
    /// Print the header, storage blocks and nodes of a bundle
    Info(info::InfoArgs),
    /// Extract the nodes of a bundle into a directory
    Extract(extract::ExtractArgs),
    /// Compare the structure of a bundle with a reference JSON report
    Verify(verify::VerifyArgs),
}

impl BundleCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            BundleCommands::Info(info) => info.handle(),
            BundleCommands::Extract(extract) => extract.handle(),
            BundleCommands::Verify(verify) => verify.handle(),
        }
    }
}
