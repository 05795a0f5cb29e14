pub mod info;

#[derive(clap::Subcommand)]
pub enum SerializedCommands {
    /// Summarize the object table of a serialized file
    Info(info::InfoArgs),
}

impl SerializedCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            SerializedCommands::Info(info) => info.handle(),
        }
    }
}
