//! MuseScore pre-conversion
//!
//! `.mscz` scores are exported to compressed MusicXML with
//! `mscore <input> -o <output.mxl>` before the engine sees them.

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{debug, warn};

use super::{require_output, ConvertedSource, FormatConverter};
use crate::engine::EngineError;
use crate::process::ExternalTool;

const NATIVE_EXTENSION: &str = "mscz";
const EXPORT_SUFFIX: &str = ".mxl";

#[derive(Debug, Clone)]
pub struct MuseScoreCli {
    tool: ExternalTool,
}

impl MuseScoreCli {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            tool: ExternalTool::new(program, timeout),
        }
    }
}

impl FormatConverter for MuseScoreCli {
    fn needs_conversion(&self, source: &Path) -> bool {
        source.extension().and_then(|ext| ext.to_str()) == Some(NATIVE_EXTENSION)
    }

    fn convert(&self, source: &Path) -> Result<ConvertedSource, EngineError> {
        // Owned from here on, so every return path below removes the file
        let converted = ConvertedSource::new(
            tempfile::Builder::new()
                .prefix("nota-")
                .suffix(EXPORT_SUFFIX)
                .tempfile()?
                .into_temp_path(),
        );

        self.tool.run(&[
            source.as_os_str().to_owned(),
            "-o".into(),
            converted.path().as_os_str().to_owned(),
        ])?;

        require_output(&self.tool.name(), converted.path()).inspect_err(|err| {
            warn!(source = %source.display(), error = %err, "MuseScore wrote no export");
        })?;

        debug!(
            source = %source.display(),
            export = %converted.path().display(),
            "Converted MuseScore file"
        );
        Ok(converted)
    }
}
