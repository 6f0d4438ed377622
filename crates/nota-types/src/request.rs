//! Directive parsing
//!
//! A directive line has exactly eleven pipe-delimited fields:
//! `id|category|source|font|unit|paperwidth|paperheight|topmargin|bottommargin|oddsidemargin|evensidemargin`

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

/// Number of fields in a well-formed directive line
pub const FIELD_COUNT: usize = 11;

/// Inclusion style requested for a score
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Inline,
    Fullscore,
    Example,
    /// Any category name the renderer does not know
    Other(String),
}

impl Category {
    pub fn as_str(&self) -> &str {
        match self {
            Category::Inline => "inline",
            Category::Fullscore => "fullscore",
            Category::Example => "example",
            Category::Other(name) => name,
        }
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        match value {
            "inline" => Category::Inline,
            "fullscore" => Category::Fullscore,
            "example" => Category::Example,
            other => Category::Other(other.to_string()),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One score to render, as written by the typesetting pass
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRequest {
    pub id: String,
    pub category: Category,
    /// Relative to the invocation's working directory
    pub source_path: PathBuf,
    pub font: String,
    pub unit: String,
    pub paper_width: String,
    pub paper_height: String,
    pub top_margin: String,
    pub bottom_margin: String,
    pub odd_side_margin: String,
    pub even_side_margin: String,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Expected {FIELD_COUNT} fields, found {0}")]
    FieldCount(usize),

    #[error("Empty {0} field")]
    EmptyField(&'static str),

    #[error("Score id '{0}' cannot be used as a file name")]
    UnsafeId(String),
}

/// Parse one non-blank directive line into a request.
pub fn parse_directive_line(line: &str) -> Result<ScoreRequest, ParseError> {
    let fields: Vec<&str> = line.trim().split('|').map(str::trim).collect();
    let [id, category, source, font, unit, paper_width, paper_height, top_margin, bottom_margin, odd_side_margin, even_side_margin] =
        <[&str; FIELD_COUNT]>::try_from(fields)
            .map_err(|fields| ParseError::FieldCount(fields.len()))?;

    if id.is_empty() {
        return Err(ParseError::EmptyField("id"));
    }
    if id == "." || id == ".." || id.contains(|c: char| c == '/' || c == '\\') {
        return Err(ParseError::UnsafeId(id.to_string()));
    }
    if source.is_empty() {
        return Err(ParseError::EmptyField("source"));
    }

    Ok(ScoreRequest {
        id: id.to_string(),
        category: Category::from(category),
        source_path: PathBuf::from(source),
        font: font.to_string(),
        unit: unit.to_string(),
        paper_width: paper_width.to_string(),
        paper_height: paper_height.to_string(),
        top_margin: top_margin.to_string(),
        bottom_margin: bottom_margin.to_string(),
        odd_side_margin: odd_side_margin.to_string(),
        even_side_margin: even_side_margin.to_string(),
    })
}
