//! Configuration parsing for the render pass
//!
//! Settings come from an optional TOML file; every field has a default so an
//! empty or missing file is a valid configuration. Command line flags are
//! applied on top by the binary.

use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration file picked up from the working directory when present
pub const DEFAULT_CONFIG_FILE: &str = "nota.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// External executables
    pub tools: ToolsConfig,
    /// Output naming
    pub output: OutputConfig,
    /// Worker pool size; defaults to the available parallelism
    pub jobs: Option<usize>,
    /// Deadline for each external tool run
    pub stage_timeout_secs: u64,
    /// What to do with a repeated score id in one directive file
    pub duplicate_ids: DuplicateIds,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub verovio: PathBuf,
    pub mscore: PathBuf,
    pub rsvg_convert: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Appended to the job name to find the directive file
    pub directive_suffix: String,
    /// Appended to the job name to name the output directory
    pub aux_suffix: String,
    /// File name prefix for every artifact
    pub prefix: String,
    pub artifact_ext: String,
    pub snippet_ext: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateIds {
    /// Keep the first request with an id, skip the rest
    #[default]
    Reject,
    /// Render every request; later ones overwrite earlier artifacts
    Overwrite,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            tools: ToolsConfig::default(),
            output: OutputConfig::default(),
            jobs: None,
            stage_timeout_secs: 300,
            duplicate_ids: DuplicateIds::default(),
        }
    }
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            verovio: PathBuf::from("verovio"),
            mscore: PathBuf::from("mscore"),
            rsvg_convert: PathBuf::from("rsvg-convert"),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directive_suffix: ".scores.aux".to_string(),
            aux_suffix: "-notaaux".to_string(),
            prefix: "nota-score".to_string(),
            artifact_ext: "pdf".to_string(),
            snippet_ext: "tex".to_string(),
        }
    }
}

impl RenderConfig {
    /// Load configuration from a TOML file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or the TOML is malformed
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        Self::from_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))
    }

    /// Parse configuration from a TOML string
    pub fn from_str(s: &str) -> anyhow::Result<Self> {
        let config: RenderConfig = toml::from_str(s).context("Failed to parse TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load `explicit` if given, else `nota.toml` under `root` if present,
    /// else defaults.
    pub fn load(explicit: Option<&Path>, root: &Path) -> anyhow::Result<Self> {
        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let candidate = root.join(DEFAULT_CONFIG_FILE);
                if candidate.is_file() {
                    Self::from_file(candidate)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.jobs == Some(0) {
            anyhow::bail!("jobs must be at least 1");
        }
        if self.stage_timeout_secs == 0 {
            anyhow::bail!("stage_timeout_secs must be at least 1");
        }
        if self.output.prefix.is_empty() {
            anyhow::bail!("output.prefix must not be empty");
        }
        Ok(())
    }

    /// Worker pool size
    pub fn worker_count(&self) -> usize {
        self.jobs.unwrap_or_else(|| {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        })
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Resolve file locations for one job rooted at `root`
    pub fn layout(&self, job: &str, root: &Path) -> JobLayout {
        JobLayout {
            root: root.to_path_buf(),
            directive_path: root.join(format!("{}{}", job, self.output.directive_suffix)),
            output_dir: root.join(format!("{}{}", job, self.output.aux_suffix)),
            prefix: self.output.prefix.clone(),
            artifact_ext: self.output.artifact_ext.clone(),
            snippet_ext: self.output.snippet_ext.clone(),
        }
    }
}

/// Where one job reads directives and sources and writes artifacts
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobLayout {
    /// Sources are resolved against this directory
    pub root: PathBuf,
    pub directive_path: PathBuf,
    pub output_dir: PathBuf,
    pub prefix: String,
    pub artifact_ext: String,
    pub snippet_ext: String,
}

impl JobLayout {
    pub fn artifact_path(&self, id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}-{}.{}", self.prefix, id, self.artifact_ext))
    }

    pub fn snippet_path(&self, id: &str) -> PathBuf {
        self.output_dir
            .join(format!("{}-{}.{}", self.prefix, id, self.snippet_ext))
    }

    pub fn source_path(&self, relative: &Path) -> PathBuf {
        self.root.join(relative)
    }
}
