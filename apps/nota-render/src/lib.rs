//! Score rendering pass
//!
//! Runs between two typesetting passes: reads the score requests the first
//! pass wrote, renders each referenced notation file to a merged PDF with a
//! LaTeX inclusion snippet, and leaves them in the job's output directory for
//! the second pass to pick up.

pub mod config;
pub mod error;
pub mod orchestrator;
pub mod snippet;
pub mod worker;

pub use config::{DuplicateIds, JobLayout, RenderConfig};
pub use error::RenderError;
pub use orchestrator::{parse_directives, run, DirectiveBatch, RunOutcome, RunSummary};
pub use worker::{Pipeline, RenderResult, RenderedScore};
