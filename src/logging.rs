//! Logging setup.
//!
//! The binary logs through `tracing` to one of: nowhere, stdout, stderr
//! (default) or a file opened in append mode. `RUST_LOG` takes precedence
//! over the `--verbose` level when set.

use anyhow::Result;
use std::fs::OpenOptions;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Where log output goes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogTarget {
    Off,
    Stdout,
    Stderr,
    File(PathBuf),
}

impl LogTarget {
    /// Parse the `--log` value: `0`/`off`, `1`/`stdout`, `2`/`stderr`, or a
    /// file name.
    pub fn parse(value: &str) -> Self {
        match value {
            "0" | "off" => LogTarget::Off,
            "1" | "stdout" => LogTarget::Stdout,
            "2" | "stderr" => LogTarget::Stderr,
            filename => LogTarget::File(PathBuf::from(filename)),
        }
    }
}

fn filter(verbose: bool) -> EnvFilter {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.as_str()))
}

/// Install the global subscriber.
pub fn init_tracing(target: &LogTarget, verbose: bool) -> Result<()> {
    match target {
        LogTarget::Off => {}
        LogTarget::Stdout => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(std::io::stdout)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::Stderr => {
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
        LogTarget::File(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let subscriber = FmtSubscriber::builder()
                .with_env_filter(filter(verbose))
                .with_writer(file)
                .with_ansi(false)
                .finish();
            tracing::subscriber::set_global_default(subscriber)?;
        }
    }
    Ok(())
}
