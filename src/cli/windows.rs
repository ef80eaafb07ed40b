//! Windows subcommand for task-insight CLI

use crate::format::OutputFormat;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the windows subcommand
#[derive(Args, Debug)]
pub struct WindowsArgs {
    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Markdown)]
    pub format: OutputFormat,

    /// Task source (overrides config)
    #[arg(long, value_name = "FILE")]
    pub tasks: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}
