use std::path::PathBuf;

use clap::Args;
use miette::Result;
use owo_colors::OwoColorize;
use ufs_bundle::{Bundle, BundleReport};

use crate::commands::read_file;

#[derive(Args)]
pub struct InfoArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Print the report as JSON
    #[arg(long, default_value_t = false)]
    json: bool,

    /// Report every node table problem instead of stopping at the first
    #[arg(long, default_value_t = false)]
    all_errors: bool,
}

impl InfoArgs {
    pub fn handle(&self) -> Result<()> {
        let data = read_file(&self.file)?;

        let bundle = if self.all_errors {
            let (bundle, errors) = Bundle::try_parse(data);
            for error in &errors {
                eprintln!("{} {}", "error:".red(), error);
            }
            match bundle {
                Some(bundle) => bundle,
                None => return Err(miette::miette!("{} problems found", errors.len())),
            }
        } else {
            Bundle::parse(data)?
        };

        let report = BundleReport::from(&bundle);
        if self.json {
            println!("{}", report.to_json_pretty()?);
        } else {
            print!("{report}");
        }
        Ok(())
    }
}
