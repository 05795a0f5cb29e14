use std::path::PathBuf;

use clap::Args;
use miette::{IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use ufs_bundle::Bundle;
use ufs_serialized::{ObjectSummary, SerializedFile};

use crate::commands::{is_bundle, read_file};

#[derive(Args)]
pub struct InfoArgs {
    /// A serialized file, or a bundle holding serialized files
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Only summarize this node when reading a bundle
    #[arg(short, long, value_name = "PATH")]
    node: Option<String>,

    /// Print the summaries as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_file(&self.file)?;

        let mut summaries = Vec::new();
        if is_bundle(&data) {
            let bundle = Bundle::parse(data)?;
            let nodes = match &self.node {
                Some(path) => vec![bundle.node_by_path(path)?],
                None => bundle.serialized_nodes().collect(),
            };
            for node in nodes {
                let file = SerializedFile::parse(bundle.read_node(node)?)?;
                summaries.push((node.path.clone(), ObjectSummary::from(&file)));
            }
        } else {
            let file = SerializedFile::parse(data)?;
            summaries.push((self.file.display().to_string(), ObjectSummary::from(&file)));
        }

        if self.json {
            let values = summaries
                .into_iter()
                .map(|(path, summary)| Ok((path, serde_json::to_value(summary)?)))
                .collect::<serde_json::Result<serde_json::Map<String, serde_json::Value>>>()
                .into_diagnostic()?;
            println!(
                "{}",
                serde_json::to_string_pretty(&values).into_diagnostic()?
            );
            return Ok(());
        }

        for (path, summary) in summaries {
            println!("{}", path.bold());
            print!("{summary}");
        }
        Ok(())
    }
}
