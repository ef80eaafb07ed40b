//! CLI command definitions for task-insight
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod distribute;
pub mod features;
pub mod run;
pub mod windows;

use clap::{Parser, Subcommand};
use distribute::DistributeArgs;
use features::FeaturesArgs;
use run::RunArgs;
use std::path::PathBuf;
use windows::WindowsArgs;

/// Correlate tasks with commits and classify them with a language model
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Profile to run for (default: profiles.default_profile)
    #[arg(short, long, global = true)]
    pub profile: Option<String>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run the full classification and correlation pipeline
    Run(RunArgs),

    /// Print the correlation windows of the profile's tasks
    Windows(WindowsArgs),

    /// Derive the effort dataset from a correlated output
    Features(FeaturesArgs),

    /// Distribute tasks over assignees by predicted effort
    Distribute(DistributeArgs),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::OutputFormat;

    #[test]
    fn test_parse_run_with_globals() {
        let cli = Cli::parse_from([
            "task-insight",
            "run",
            "--refresh",
            "-p",
            "alice",
            "--log",
            "off",
        ]);
        assert_eq!(cli.profile.as_deref(), Some("alice"));
        assert_eq!(cli.log, "off");
        match cli.command {
            Command::Run(args) => assert!(args.refresh),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_run_summary_format() {
        let cli = Cli::parse_from(["task-insight", "run", "-f", "md"]);
        match cli.command {
            Command::Run(args) => assert_eq!(args.format, Some(OutputFormat::Markdown)),
            other => panic!("unexpected command {other:?}"),
        }

        let cli = Cli::parse_from(["task-insight", "run"]);
        match cli.command {
            Command::Run(args) => assert_eq!(args.format, None),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_command_is_required() {
        assert!(Cli::try_parse_from(["task-insight"]).is_err());
    }
}
