//! Typed errors for each pipeline concern.
//!
//! Library functions return these and leave policy to the caller: the query
//! orchestrator downgrades classifier failures to "no data", while shape
//! violations and extraction failures abort the run.

use std::path::PathBuf;
use thiserror::Error;

/// Errors reading the task and commit sources.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Errors deriving correlation windows from a task's history.
#[derive(Debug, Error)]
pub enum WindowError {
    #[error("task {task_id} has no status edits")]
    NoStatusEdits { task_id: String },
}

/// Failures of the external classification call.
#[derive(Debug, Error)]
pub enum ClassifyError {
    #[error("input is too long: {tokens} tokens exceeds the {limit} token input limit")]
    InputTooLong { tokens: usize, limit: usize },
    #[error("missing API key: set the {env_var} environment variable")]
    MissingApiKey { env_var: String },
    #[error("classifier request failed: {0}")]
    Transport(String),
    #[error("classifier returned no message content")]
    EmptyResponse,
}

/// Errors interpreting a classifier response.
#[derive(Debug, Error)]
pub enum ResponseError {
    #[error("response contains no JSON payload")]
    NoPayload,
    #[error("response payload is not valid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),
    #[error("output structure is not as expected: {0}")]
    UnexpectedShape(String),
}

/// Errors of the classification cache/replay layer.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("cache I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("cache artifact {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("batch {index}: {source}")]
    Classify {
        index: usize,
        #[source]
        source: ClassifyError,
    },
    #[error("batch {index}: {source}")]
    Response {
        index: usize,
        #[source]
        source: ResponseError,
    },
}

/// Top-level pipeline error.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error("window extraction failed: {0}")]
    Window(#[from] WindowError),
    #[error(transparent)]
    Response(#[from] ResponseError),
    #[error(transparent)]
    Cache(#[from] CacheError),
    #[error("failed to render prompt payload: {0}")]
    Render(#[source] serde_json::Error),
    #[error("failed to write {path}: {source}")]
    Output {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, PipelineError>;
