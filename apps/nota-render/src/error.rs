//! Per-request failure taxonomy
//!
//! A [`RenderError`] ends one request only; the batch carries on.

use nota_engine::EngineError;
use nota_pdf::PdfError;
use nota_types::DimensionError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("[{id}] source file not found: {path}")]
    MissingSource { id: String, path: String },

    #[error("[{id}] format conversion failed: {source}")]
    Conversion {
        id: String,
        #[source]
        source: EngineError,
    },

    #[error("[{id}] invalid page dimension: {source}")]
    InvalidDimension {
        id: String,
        #[source]
        source: DimensionError,
    },

    #[error("[{id}] engine failed to load score: {source}")]
    EngineLoad {
        id: String,
        #[source]
        source: EngineError,
    },

    #[error("[{id}] score has no pages")]
    EmptyDocument { id: String },

    #[error("[{id}] rendering page {page} failed: {source}")]
    PageRender {
        id: String,
        page: usize,
        #[source]
        source: EngineError,
    },

    #[error("[{id}] converting page {page} failed: {source}")]
    PageConvert {
        id: String,
        page: usize,
        #[source]
        source: EngineError,
    },

    #[error("[{id}] merging pages failed: {source}")]
    Merge {
        id: String,
        #[source]
        source: PdfError,
    },

    #[error("[{id}] writing snippet failed: {source}")]
    SnippetWrite {
        id: String,
        #[source]
        source: PdfError,
    },

    #[error("[{id}] render panicked: {message}")]
    Panicked { id: String, message: String },

    #[error("[{id}] scratch space unavailable: {source}")]
    Scratch {
        id: String,
        #[source]
        source: std::io::Error,
    },
}

impl RenderError {
    /// Id of the request that failed
    pub fn id(&self) -> &str {
        match self {
            RenderError::MissingSource { id, .. }
            | RenderError::Conversion { id, .. }
            | RenderError::InvalidDimension { id, .. }
            | RenderError::EngineLoad { id, .. }
            | RenderError::EmptyDocument { id }
            | RenderError::PageRender { id, .. }
            | RenderError::PageConvert { id, .. }
            | RenderError::Merge { id, .. }
            | RenderError::SnippetWrite { id, .. }
            | RenderError::Panicked { id, .. }
            | RenderError::Scratch { id, .. } => id,
        }
    }

    /// Pipeline stage the request failed in
    pub fn stage(&self) -> &'static str {
        match self {
            RenderError::MissingSource { .. } => "pending",
            RenderError::Conversion { .. } => "format_converting",
            RenderError::InvalidDimension { .. }
            | RenderError::EngineLoad { .. }
            | RenderError::EmptyDocument { .. } => "loading",
            RenderError::PageRender { .. } => "rendering",
            RenderError::PageConvert { .. } | RenderError::Scratch { .. } => "page_converting",
            RenderError::Merge { .. } => "merging",
            RenderError::SnippetWrite { .. } => "snippet_writing",
            RenderError::Panicked { .. } => "failed",
        }
    }
}
