//! Shared data model for the score rendering pass
//!
//! - `request`: directive lines parsed into typed [`ScoreRequest`] records
//! - `dimension`: typesetting lengths converted into engine pixel units
//! - `geometry`: per-category page layout and engine options

pub mod dimension;
pub mod geometry;
pub mod request;

pub use dimension::{resolve, DimensionError, PT_TO_MM};
pub use geometry::{build_options, BreakPolicy, EngineOptions, RenderGeometry, Visibility};
pub use request::{parse_directive_line, Category, ParseError, ScoreRequest, FIELD_COUNT};
