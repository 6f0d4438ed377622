//! Format converters around the engine
//!
//! - [`FormatConverter`]: turns a source the engine cannot read into one it can
//! - [`PageConverter`]: turns one rendered SVG page into a single-page PDF

pub mod musescore;
pub mod svg;

pub use musescore::MuseScoreCli;
pub use svg::RsvgConvertCli;

use std::path::{Path, PathBuf};

use tempfile::TempPath;

use crate::engine::EngineError;

/// Source format pre-conversion
pub trait FormatConverter: Send + Sync {
    /// Whether `source` must be converted before loading
    fn needs_conversion(&self, source: &Path) -> bool;

    fn convert(&self, source: &Path) -> Result<ConvertedSource, EngineError>;
}

/// A converted source file, removed from disk when dropped
#[derive(Debug)]
pub struct ConvertedSource {
    path: TempPath,
}

impl ConvertedSource {
    pub fn new(path: TempPath) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Path the file lived at, for checking cleanup
    pub fn location(&self) -> PathBuf {
        self.path.to_path_buf()
    }
}

/// SVG page to PDF page conversion
pub trait PageConverter: Send + Sync {
    /// Convert `svg` into a PDF written at `output`.
    fn svg_to_pdf(&self, svg: &str, output: &Path) -> Result<(), EngineError>;
}

/// Fail unless `path` exists and is non-empty
pub(crate) fn require_output(tool: &str, path: &Path) -> Result<(), EngineError> {
    match std::fs::metadata(path) {
        Ok(meta) if meta.len() > 0 => Ok(()),
        _ => Err(EngineError::MissingOutput {
            tool: tool.to_string(),
            path: path.display().to_string(),
        }),
    }
}
