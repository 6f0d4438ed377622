//! Fixed-page artifact handling
//!
//! Rendered score pages arrive as one single-page PDF each. This crate
//! merges them, in order, into the artifact the typesetting pass includes,
//! and writes it so a reader never sees a half-written file.

pub mod error;
pub mod merge;
pub mod write;

pub use error::PdfError;
pub use merge::merge_documents;
pub use write::write_atomic;

/// Parse PDF bytes and return page count
pub fn page_count(bytes: &[u8]) -> Result<usize, PdfError> {
    let doc = lopdf::Document::load_mem(bytes).map_err(|e| PdfError::ParseError(e.to_string()))?;
    Ok(doc.get_pages().len())
}
