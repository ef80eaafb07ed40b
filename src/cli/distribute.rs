//! Distribute subcommand for task-insight CLI

use crate::features::TaskFeatures;
use crate::format::OutputFormat;
use clap::Args;
use std::path::PathBuf;

/// Arguments for the distribute subcommand
#[derive(Args, Debug)]
pub struct DistributeArgs {
    /// Effort dataset to distribute, as written by `features`
    #[arg(value_name = "FILE")]
    pub input: PathBuf,

    /// Comma-separated assignee ids (default: every assignee in the input)
    #[arg(long, value_name = "LIST", value_delimiter = ',')]
    pub assignees: Vec<String>,

    /// Effort dataset to learn assignee ratios from (default: the input)
    #[arg(long, value_name = "FILE")]
    pub history: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,
}

impl DistributeArgs {
    /// Explicit assignees, or all assignees of `tasks` in first-seen order.
    pub fn resolve_assignees(&self, tasks: &[TaskFeatures]) -> Vec<String> {
        if !self.assignees.is_empty() {
            return self.assignees.clone();
        }
        let mut found: Vec<String> = Vec::new();
        for assignee in tasks.iter().flat_map(|t| &t.assignees) {
            if !found.contains(assignee) {
                found.push(assignee.clone());
            }
        }
        found
    }
}
