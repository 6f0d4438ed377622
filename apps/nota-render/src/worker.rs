//! Render one score request end to end
//!
//! Stages: source check, optional format conversion, engine load, page
//! rendering, parallel page conversion, merge, snippet. Any stage can end
//! the request with a [`RenderError`]; nothing is written to the output
//! directory until the merged artifact is complete.

use std::any::Any;
use std::fs;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use nota_engine::{
    EngineError, FormatConverter, MuseScoreCli, NotationEngine, PageConverter, RsvgConvertCli,
    VerovioCli,
};
use nota_pdf::{merge_documents, page_count as pdf_page_count, write_atomic, PdfError};
use nota_types::{build_options, RenderGeometry, ScoreRequest};
use rayon::prelude::*;
use tracing::{debug, info, info_span, warn};

use crate::config::{JobLayout, RenderConfig};
use crate::error::RenderError;
use crate::snippet::{relative_reference, snippet_text};

/// A successfully rendered request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedScore {
    pub id: String,
    pub page_count: usize,
    pub artifact_path: PathBuf,
    pub snippet_path: PathBuf,
}

/// Outcome of one request
pub type RenderResult = Result<RenderedScore, RenderError>;

/// One converted page, before merge
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageArtifact {
    /// Counting from 1
    pub page: usize,
    pub path: PathBuf,
}

/// The tools and output layout shared, read-only, by every worker
#[derive(Clone)]
pub struct Pipeline {
    pub engine: Arc<dyn NotationEngine>,
    pub format_converter: Arc<dyn FormatConverter>,
    pub page_converter: Arc<dyn PageConverter>,
    pub layout: JobLayout,
}

impl Pipeline {
    /// Pipeline backed by the command line tools named in `config`
    pub fn from_config(config: &RenderConfig, layout: JobLayout) -> Self {
        let timeout = config.stage_timeout();
        Self {
            engine: Arc::new(VerovioCli::new(&config.tools.verovio, timeout)),
            format_converter: Arc::new(MuseScoreCli::new(&config.tools.mscore, timeout)),
            page_converter: Arc::new(RsvgConvertCli::new(&config.tools.rsvg_convert, timeout)),
            layout,
        }
    }

    /// Render `request`, containing every failure in the returned result.
    /// A panic in any stage becomes [`RenderError::Panicked`].
    pub fn render(&self, request: &ScoreRequest) -> RenderResult {
        // Work-stealing can run this inside another request's span
        let span = info_span!(
            parent: None,
            "score",
            id = %request.id,
            category = %request.category,
            source = %request.source_path.display(),
        );
        let _enter = span.enter();

        let started_at = Instant::now();
        let result = panic::catch_unwind(AssertUnwindSafe(|| self.run_stages(request)))
            .unwrap_or_else(|payload| {
                Err(RenderError::Panicked {
                    id: request.id.clone(),
                    message: panic_message(payload.as_ref()),
                })
            });
        let elapsed_ms = started_at.elapsed().as_millis() as u64;

        match &result {
            Ok(rendered) => debug!(elapsed_ms, pages = rendered.page_count, "Done"),
            Err(err) => warn!(elapsed_ms, stage = err.stage(), error = %err, "Failed"),
        }
        result
    }

    fn run_stages(&self, request: &ScoreRequest) -> RenderResult {
        let id = request.id.clone();
        info!(stage = "pending", "Processing score");

        let source = self.layout.source_path(&request.source_path);
        if !source.is_file() {
            return Err(RenderError::MissingSource {
                id,
                path: source.display().to_string(),
            });
        }

        let converted = if self.format_converter.needs_conversion(&source) {
            info!(stage = "format_converting", "Converting source format");
            let converted = self
                .format_converter
                .convert(&source)
                .map_err(|source| RenderError::Conversion {
                    id: id.clone(),
                    source,
                })?;
            Some(converted)
        } else {
            None
        };
        let load_path = converted
            .as_ref()
            .map(|c| c.path().to_path_buf())
            .unwrap_or(source);

        info!(stage = "loading", path = %load_path.display(), "Loading score");
        let geometry = RenderGeometry::from_request(request).map_err(|source| {
            RenderError::InvalidDimension {
                id: id.clone(),
                source,
            }
        })?;
        let options = build_options(&request.category, &geometry, &request.font, &request.unit);
        let score = self
            .engine
            .load(&load_path, &options)
            .map_err(|source| RenderError::EngineLoad {
                id: id.clone(),
                source,
            })?;
        // The converted file is only needed until the engine has read it
        drop(converted);

        let page_count = score.page_count();
        if page_count == 0 {
            return Err(RenderError::EmptyDocument { id });
        }

        info!(stage = "rendering", page_count, "Rendering pages");
        let svgs = (1..=page_count)
            .map(|page| {
                score
                    .render_page(page)
                    .map_err(|source| RenderError::PageRender {
                        id: id.clone(),
                        page,
                        source,
                    })
            })
            .collect::<Result<Vec<String>, RenderError>>()?;

        info!(stage = "page_converting", page_count, "Converting pages");
        let scratch = tempfile::Builder::new()
            .prefix("nota-pages-")
            .tempdir()
            .map_err(|source| RenderError::Scratch {
                id: id.clone(),
                source,
            })?;
        let pages = self.convert_pages(&id, &svgs, scratch.path())?;

        info!(stage = "merging", "Merging pages");
        let artifact_path = self.layout.artifact_path(&id);
        let merge_error = |source| RenderError::Merge {
            id: id.clone(),
            source,
        };
        let documents = pages
            .iter()
            .map(|page| {
                fs::read(&page.path).map_err(|source| RenderError::PageConvert {
                    id: id.clone(),
                    page: page.page,
                    source: EngineError::IoError(source),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        let merged = merge_documents(documents).map_err(merge_error)?;
        let merged_pages = pdf_page_count(&merged).map_err(merge_error)?;
        if merged_pages != page_count {
            return Err(merge_error(PdfError::MergeError(format!(
                "expected {} pages, merged document has {}",
                page_count, merged_pages
            ))));
        }
        write_atomic(&artifact_path, &merged).map_err(merge_error)?;

        info!(stage = "snippet_writing", "Writing snippet");
        let snippet_path = self.layout.snippet_path(&id);
        let reference = relative_reference(&artifact_path, &snippet_path);
        let text = snippet_text(&request.category, page_count, &reference);
        if let Err(source) = write_atomic(&snippet_path, text.as_bytes()) {
            if let Err(err) = fs::remove_file(&artifact_path) {
                warn!(error = %err, artifact = %artifact_path.display(), "Could not remove artifact");
            }
            return Err(RenderError::SnippetWrite { id, source });
        }

        info!(
            pages = page_count,
            artifact = %artifact_path.display(),
            "Rendered score"
        );
        Ok(RenderedScore {
            id,
            page_count,
            artifact_path,
            snippet_path,
        })
    }

    /// Convert every page concurrently on the current pool and return them
    /// in page order. The first failing page fails the request.
    fn convert_pages(
        &self,
        id: &str,
        svgs: &[String],
        scratch: &std::path::Path,
    ) -> Result<Vec<PageArtifact>, RenderError> {
        let mut converted: Vec<(usize, Result<PathBuf, EngineError>)> = svgs
            .par_iter()
            .enumerate()
            .map(|(index, svg)| {
                let page = index + 1;
                let path = scratch.join(format!("p{}.pdf", page));
                let result = self.page_converter.svg_to_pdf(svg, &path).map(|()| path);
                (page, result)
            })
            .collect();
        converted.sort_by_key(|(page, _)| *page);

        converted
            .into_iter()
            .map(|(page, result)| {
                result
                    .map(|path| PageArtifact { page, path })
                    .map_err(|source| RenderError::PageConvert {
                        id: id.to_string(),
                        page,
                        source,
                    })
            })
            .collect()
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
