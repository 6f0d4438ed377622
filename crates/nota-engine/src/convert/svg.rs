//! SVG page to PDF via `rsvg-convert`

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::{require_output, PageConverter};
use crate::engine::EngineError;
use crate::process::ExternalTool;

#[derive(Debug, Clone)]
pub struct RsvgConvertCli {
    tool: ExternalTool,
}

impl RsvgConvertCli {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool: ExternalTool::new(program, timeout),
        }
    }
}

impl PageConverter for RsvgConvertCli {
    fn svg_to_pdf(&self, svg: &str, output: &Path) -> Result<(), EngineError> {
        let mut input = tempfile::Builder::new()
            .prefix("nota-page-")
            .suffix(".svg")
            .tempfile()?;
        input.write_all(svg.as_bytes())?;
        input.flush()?;

        self.tool.run(&[
            "-f".into(),
            "pdf".into(),
            "-o".into(),
            output.as_os_str().to_owned(),
            input.path().as_os_str().to_owned(),
        ])?;

        require_output(&self.tool.name(), output)
    }
}
