//! Features subcommand for task-insight CLI

use clap::Args;
use std::path::PathBuf;

/// Arguments for the features subcommand
#[derive(Args, Debug)]
pub struct FeaturesArgs {
    /// Correlated output of `run` (plain or gzipped JSON)
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Output file path (default: stdout). Written gzip-compressed when it
    /// ends in .gz
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
