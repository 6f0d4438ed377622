//! Verovio command line backend
//!
//! Each load runs `verovio --all-pages -t svg` in its own process, so no
//! engine state is ever shared between concurrent requests. Pages land in a
//! scratch directory that lives as long as the loaded score.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use nota_types::EngineOptions;
use serde_json::Value;
use tempfile::TempDir;
use tracing::debug;

use super::{EngineError, LoadedScore, NotationEngine};
use crate::process::ExternalTool;

/// Base name for rendered pages inside the scratch directory
const OUTPUT_STEM: &str = "score";

#[derive(Debug, Clone)]
pub struct VerovioCli {
    tool: ExternalTool,
}

impl VerovioCli {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool: ExternalTool::new(program, timeout),
        }
    }
}

impl NotationEngine for VerovioCli {
    fn load(
        &self,
        source: &Path,
        options: &EngineOptions,
    ) -> Result<Box<dyn LoadedScore>, EngineError> {
        let scratch = tempfile::Builder::new()
            .prefix("nota-verovio-")
            .tempdir()?;
        let outfile = scratch.path().join(format!("{}.svg", OUTPUT_STEM));

        let mut args = option_args(options);
        args.push("--all-pages".into());
        args.push("-t".into());
        args.push("svg".into());
        args.push("-o".into());
        args.push(outfile.into_os_string());
        args.push(source.as_os_str().to_owned());

        self.tool.run(&args)?;

        let pages = collect_pages(scratch.path())?;
        debug!(
            source = %source.display(),
            page_count = pages.len(),
            "Verovio rendered pages"
        );

        Ok(Box::new(VerovioScore {
            pages,
            _scratch: scratch,
        }))
    }
}

struct VerovioScore {
    pages: Vec<PathBuf>,
    // Deleted with the score
    _scratch: TempDir,
}

impl LoadedScore for VerovioScore {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn render_page(&self, page: usize) -> Result<String, EngineError> {
        let path = page
            .checked_sub(1)
            .and_then(|index| self.pages.get(index))
            .ok_or(EngineError::PageOutOfRange {
                page,
                page_count: self.pages.len(),
            })?;
        Ok(fs::read_to_string(path)?)
    }
}

/// Engine options as command line flags: `pageWidth` becomes `--page-width`,
/// true booleans become bare flags and false ones are dropped.
pub fn option_args(options: &EngineOptions) -> Vec<OsString> {
    let mut args = Vec::new();
    for (key, value) in options.to_map() {
        let flag = format!("--{}", kebab_case(&key));
        match value {
            Value::Bool(true) => args.push(flag.into()),
            Value::Bool(false) | Value::Null => {}
            Value::String(text) => {
                args.push(flag.into());
                args.push(text.into());
            }
            Value::Number(number) => {
                args.push(flag.into());
                args.push(number.to_string().into());
            }
            Value::Array(_) | Value::Object(_) => {}
        }
    }
    args
}

fn kebab_case(key: &str) -> String {
    let mut out = String::with_capacity(key.len() + 4);
    for ch in key.chars() {
        if ch.is_ascii_uppercase() {
            out.push('-');
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Rendered SVG files ordered by the page number at the end of their stem.
/// A lone file without a number is page 1.
fn collect_pages(dir: &Path) -> Result<Vec<PathBuf>, EngineError> {
    let mut pages = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.extension().and_then(|ext| ext.to_str()) != Some("svg") {
            continue;
        }
        let number = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .and_then(|stem| stem.rsplit_once('_'))
            .and_then(|(_, digits)| digits.parse::<usize>().ok())
            .unwrap_or(1);
        pages.push((number, path));
    }
    pages.sort();
    Ok(pages.into_iter().map(|(_, path)| path).collect())
}
