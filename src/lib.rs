//! Task Insight Library
//!
//! Correlates tracked tasks with the commits that implement them, using an
//! LLM classifier behind a replayable cache, and derives effort features for
//! workload planning.

pub mod batch;
pub mod cache;
pub mod classifier;
pub mod cli;
pub mod config;
pub mod correlate;
pub mod distribute;
pub mod error;
pub mod export;
pub mod features;
pub mod format;
pub mod keywords;
pub mod logging;
pub mod pipeline;
pub mod prompts;
pub mod reconcile;
pub mod response;
pub mod source;
pub mod tokens;
pub mod types;
pub mod window;
