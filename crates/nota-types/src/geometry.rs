//! Page geometry policy
//!
//! Turns the typesetting pass's page dimensions into the option set the
//! notation engine renders with. Every category gets its own layout rules.

use serde::Serialize;

use crate::dimension::{resolve, DimensionError};
use crate::request::{Category, ScoreRequest};

/// Horizontal pad added to the text width, and vertical pad added to the
/// text height for full scores
const PAGE_PAD: i64 = 100;

/// Fixed starting height for inline scores; the engine grows it to fit
const INLINE_PAGE_HEIGHT: i64 = 100;

/// Bottom margin reserved under full score systems
const FULLSCORE_MARGIN_BOTTOM: i64 = 120;

/// Page layout of one request, in engine pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderGeometry {
    pub paper_width: i64,
    pub paper_height: i64,
    pub top_margin: i64,
    pub bottom_margin: i64,
    pub odd_side_margin: i64,
    pub even_side_margin: i64,
}

impl RenderGeometry {
    /// Resolve all six length strings of a request.
    pub fn from_request(request: &ScoreRequest) -> Result<Self, DimensionError> {
        Ok(Self {
            paper_width: resolve(&request.paper_width)?,
            paper_height: resolve(&request.paper_height)?,
            top_margin: resolve(&request.top_margin)?,
            bottom_margin: resolve(&request.bottom_margin)?,
            odd_side_margin: resolve(&request.odd_side_margin)?,
            even_side_margin: resolve(&request.even_side_margin)?,
        })
    }

    pub fn text_width(&self) -> i64 {
        self.paper_width - self.odd_side_margin - self.even_side_margin
    }

    pub fn text_height(&self) -> i64 {
        self.paper_height - self.top_margin - self.bottom_margin
    }
}

/// Header/footer display mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    None,
    Auto,
}

/// System and page break policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakPolicy {
    Auto,
    /// Keep the breaks written in the source
    Encoded,
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Engine configuration for a single request.
///
/// Serializes to the engine's named option keys; unset values are left out
/// so the engine keeps its own default for them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineOptions {
    #[serde(skip_serializing_if = "is_false")]
    pub mm_output: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header: Option<Visibility>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<Visibility>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub font: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub unit: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_width: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_height: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_margin_top: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_margin_bottom: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_margin_left: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_margin_right: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub breaks: Option<BreakPolicy>,
    #[serde(skip_serializing_if = "is_false")]
    pub justify_vertically: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub adjust_page_height: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub adjust_page_width: bool,
}

impl EngineOptions {
    /// Options as an ordered key/value map using the engine's key names
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => serde_json::Map::new(),
        }
    }
}

/// Build the engine options for a request category.
pub fn build_options(
    category: &Category,
    geometry: &RenderGeometry,
    font: &str,
    unit: &str,
) -> EngineOptions {
    let mut options = EngineOptions {
        mm_output: true,
        footer: Some(Visibility::None),
        font: font.to_string(),
        unit: unit.to_string(),
        ..Default::default()
    };

    match category {
        Category::Inline => {
            options.header = Some(Visibility::None);
            options.page_height = Some(INLINE_PAGE_HEIGHT);
            options.page_width = Some(geometry.text_width() + PAGE_PAD);
            options.adjust_page_height = true;
            options.page_margin_top = Some(0);
            options.page_margin_bottom = Some(0);
        }
        Category::Fullscore => {
            options.page_width = Some(geometry.text_width() + PAGE_PAD);
            options.page_height = Some(geometry.text_height() + PAGE_PAD);
            options.page_margin_top = Some(0);
            options.page_margin_bottom = Some(FULLSCORE_MARGIN_BOTTOM);
            options.justify_vertically = true;
            options.adjust_page_height = true;
        }
        Category::Example => {
            options.header = Some(Visibility::None);
            options.breaks = Some(BreakPolicy::Encoded);
            // The layout contract sizes examples by the paper height value
            options.page_width = Some(geometry.paper_height);
            options.page_margin_left = Some(geometry.odd_side_margin);
            options.page_margin_right = Some(geometry.even_side_margin);
            options.adjust_page_height = true;
            options.adjust_page_width = true;
        }
        Category::Other(_) => {
            // No page size overrides; only running headers are suppressed
            options.header = Some(Visibility::None);
        }
    }

    options
}
