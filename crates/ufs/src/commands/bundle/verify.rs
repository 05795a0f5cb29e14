use std::path::PathBuf;

use clap::{Args, ValueEnum};
use itertools::Itertools;
use miette::{miette, Context, IntoDiagnostic, Result};
use owo_colors::OwoColorize;
use similar::{ChangeTag, TextDiff};
use tracing::info;
use ufs_bundle::{Bundle, BundleReport};

use crate::commands::read_file;

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum)]
enum Mode {
    /// Only list the differing lines
    #[default]
    Summary,
    /// Show every line with inline highlights
    Full,
}

#[derive(Args)]
pub struct VerifyArgs {
    /// An input bundle
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A JSON report of the same bundle written by another tool
    #[arg(short, long, value_name = "FILE")]
    reference: PathBuf,

    /// Output mode
    #[arg(short, long, value_enum, default_value_t = Mode::Summary)]
    mode: Mode,
}

impl VerifyArgs {
    pub fn handle(&self) -> Result<()> {
        let bundle = Bundle::parse(read_file(&self.file)?)?;
        let ours = BundleReport::from(&bundle).to_json_pretty()?;

        let reference = std::fs::read_to_string(&self.reference)
            .into_diagnostic()
            .context(format!("path: {}", self.reference.display()))?;
        let theirs = BundleReport::from_json(&reference)?.to_json_pretty()?;

        let diff = TextDiff::from_lines(&theirs, &ours);
        if diff.ratio() >= 1.0 {
            info!("{} matches the reference", self.file.display());
            return Ok(());
        }

        let mut differences = 0;
        for op in diff.ops() {
            for change in diff.iter_inline_changes(op) {
                let sign = match change.tag() {
                    ChangeTag::Delete => "-",
                    ChangeTag::Insert => "+",
                    ChangeTag::Equal if self.mode == Mode::Full => " ",
                    ChangeTag::Equal => continue,
                };
                if change.tag() != ChangeTag::Equal {
                    differences += 1;
                }

                let line = change
                    .iter_strings_lossy()
                    .map(|(emphasized, value)| match (change.tag(), emphasized) {
                        (ChangeTag::Insert, true) => value.green().underline().to_string(),
                        (ChangeTag::Insert, false) => value.green().to_string(),
                        (ChangeTag::Delete, true) => value.red().underline().to_string(),
                        (ChangeTag::Delete, false) => value.red().to_string(),
                        (ChangeTag::Equal, _) => value.dimmed().to_string(),
                    })
                    .join("");
                print!("{sign}{line}");
                if change.missing_newline() {
                    println!();
                }
            }
        }

        Err(miette!(
            "{} differs from {} in {} lines",
            self.file.display(),
            self.reference.display(),
            differences
        ))
    }
}
