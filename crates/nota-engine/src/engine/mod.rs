//! Notation engine seam
//!
//! The engine turns a notation document into paginated SVG. It is driven
//! through [`NotationEngine`] so the pipeline can run against the Verovio
//! command line tool in production and against in-process doubles in tests.

pub mod errors;
pub mod verovio;

pub use errors::EngineError;
pub use verovio::VerovioCli;

use std::path::Path;

use nota_types::EngineOptions;

/// A notation rendering engine
pub trait NotationEngine: Send + Sync {
    /// Load `source` laid out with `options`.
    fn load(
        &self,
        source: &Path,
        options: &EngineOptions,
    ) -> Result<Box<dyn LoadedScore>, EngineError>;
}

/// A document loaded into the engine, ready to render page by page
pub trait LoadedScore: Send {
    fn page_count(&self) -> usize;

    /// SVG for `page`, counting from 1
    fn render_page(&self, page: usize) -> Result<String, EngineError>;
}
