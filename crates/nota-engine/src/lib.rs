//! External rendering toolchain
//!
//! This crate wraps the tools the score pipeline shells out to:
//! - the notation engine (Verovio) that lays out and paginates a score as SVG
//! - the MuseScore exporter for `.mscz` sources
//! - the SVG to PDF page converter (`rsvg-convert`)
//!
//! Each tool sits behind a trait so the pipeline can be exercised with
//! in-process doubles, and every process runs under a deadline.

pub mod convert;
pub mod engine;
pub mod process;

pub use convert::{ConvertedSource, FormatConverter, MuseScoreCli, PageConverter, RsvgConvertCli};
pub use engine::{EngineError, LoadedScore, NotationEngine, VerovioCli};
pub use process::ExternalTool;
