//! Run subcommand for task-insight CLI

use crate::format::OutputFormat;
use clap::Args;
use std::path::{Path, PathBuf};

/// Arguments for the run subcommand
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Ignore cached classifier answers and request them again
    #[arg(long)]
    pub refresh: bool,

    /// Output file (default: sources.output_file in the profile's cache dir).
    /// Written gzip-compressed when it ends in .gz
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Task source (overrides config)
    #[arg(long, value_name = "FILE")]
    pub tasks: Option<PathBuf>,

    /// Commit source (overrides config)
    #[arg(long, value_name = "FILE")]
    pub commits: Option<PathBuf>,

    /// Only process the first N tasks (overrides config)
    #[arg(long, value_name = "N")]
    pub limit: Option<usize>,

    /// Also print the correlated tasks to stdout in this format
    #[arg(short, long, value_enum, value_name = "FORMAT")]
    pub format: Option<OutputFormat>,
}

impl RunArgs {
    /// Where the correlated tasks are written.
    pub fn output_path(&self, cache_dir: &Path, output_file: &str) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| cache_dir.join(output_file))
    }
}
