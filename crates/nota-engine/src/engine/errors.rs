//! Error types for engine and converter invocations

use thiserror::Error;

/// Failures of the external rendering toolchain
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("{tool} not found: {source}")]
    ToolNotFound {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{tool} failed (exit {exit_code:?}): {stderr}")]
    ToolFailed {
        tool: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("{tool} timed out after {seconds}s")]
    Timeout { tool: String, seconds: u64 },

    #[error("{tool} produced no output at {path}")]
    MissingOutput { tool: String, path: String },

    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: usize, page_count: usize },

    #[error("Invalid engine output: {0}")]
    InvalidOutput(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
