//! External tool invocation with a deadline
//!
//! Every engine and converter call goes through [`ExternalTool::run`]. The
//! child's stderr is spooled to an anonymous temp file so a chatty tool can
//! never block on a full pipe, and the child is killed once the deadline
//! passes.

use std::ffi::OsString;
use std::io::{ErrorKind, Read, Seek, SeekFrom};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::engine::EngineError;

const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Longest stderr excerpt carried in an error
const STDERR_LIMIT: usize = 4096;

/// An executable plus the deadline applied to each of its runs
#[derive(Debug, Clone)]
pub struct ExternalTool {
    program: PathBuf,
    timeout: Duration,
}

impl ExternalTool {
    pub fn new(program: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    /// Short name used in logs and errors
    pub fn name(&self) -> String {
        self.program
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.program.display().to_string())
    }

    /// Run to completion, failing on spawn error, non-zero exit or timeout.
    pub fn run(&self, args: &[OsString]) -> Result<(), EngineError> {
        let tool = self.name();
        let started_at = Instant::now();

        let mut stderr_spool = tempfile::tempfile()?;
        let mut child = Command::new(&self.program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::from(stderr_spool.try_clone()?))
            .spawn()
            .map_err(|err| {
                warn!(tool = %tool, error = %err, "Failed to spawn external tool");
                if err.kind() == ErrorKind::NotFound {
                    EngineError::ToolNotFound {
                        tool: tool.clone(),
                        source: err,
                    }
                } else {
                    EngineError::IoError(err)
                }
            })?;

        let deadline = started_at + self.timeout;
        let status = loop {
            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    let now = Instant::now();
                    if now >= deadline {
                        // Reap the child so no zombie outlives the request
                        let _ = child.kill();
                        let _ = child.wait();
                        warn!(
                            tool = %tool,
                            elapsed_ms = started_at.elapsed().as_millis() as u64,
                            "External tool killed after deadline"
                        );
                        return Err(EngineError::Timeout {
                            tool,
                            seconds: self.timeout.as_secs(),
                        });
                    }
                    thread::sleep(POLL_INTERVAL.min(deadline - now));
                }
                Err(err) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(EngineError::IoError(err));
                }
            }
        };

        let elapsed_ms = started_at.elapsed().as_millis() as u64;
        if !status.success() {
            let stderr = read_spool(&mut stderr_spool);
            warn!(
                tool = %tool,
                exit_code = status.code().map(i64::from).unwrap_or(-1),
                elapsed_ms,
                stderr = %stderr,
                "External tool failed"
            );
            return Err(EngineError::ToolFailed {
                tool,
                exit_code: status.code(),
                stderr,
            });
        }

        debug!(tool = %tool, elapsed_ms, "External tool finished");
        Ok(())
    }
}

fn read_spool(spool: &mut std::fs::File) -> String {
    let mut bytes = Vec::new();
    if spool.seek(SeekFrom::Start(0)).is_err() || spool.read_to_end(&mut bytes).is_err() {
        return String::new();
    }
    let text = String::from_utf8_lossy(&bytes);
    let text = text.trim();
    match text.char_indices().nth(STDERR_LIMIT) {
        Some((cut, _)) => format!("{}...", &text[..cut]),
        None => text.to_string(),
    }
}

#[cfg(all(test, unix))]
pub(crate) mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// Write an executable shell script into `dir`
    pub(crate) fn fake_tool(dir: &TempDir, name: &str, script: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, script).expect("write script");
        let mut perms = fs::metadata(&path).expect("metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("set perms");
        path
    }

    #[test]
    fn runs_successful_tool() {
        let dir = TempDir::new().expect("temp dir");
        let marker = dir.path().join("ran");
        let script = fake_tool(
            &dir,
            "ok-tool",
            &format!("#!/bin/sh\ntouch \"{}\"\n", marker.display()),
        );

        ExternalTool::new(script, Duration::from_secs(10))
            .run(&[])
            .expect("tool succeeds");

        assert!(marker.exists());
    }

    #[test]
    fn passes_arguments_through() {
        let dir = TempDir::new().expect("temp dir");
        let args_log = dir.path().join("args.log");
        let script = fake_tool(
            &dir,
            "echo-tool",
            &format!("#!/bin/sh\necho \"$@\" > \"{}\"\n", args_log.display()),
        );

        ExternalTool::new(script, Duration::from_secs(10))
            .run(&["--page-width".into(), "1820".into(), "--mm-output".into()])
            .expect("tool succeeds");

        let args = fs::read_to_string(&args_log).expect("read args");
        assert_eq!(args.trim(), "--page-width 1820 --mm-output");
    }

    #[test]
    fn surfaces_exit_code_and_stderr() {
        let dir = TempDir::new().expect("temp dir");
        let script = fake_tool(&dir, "bad-tool", "#!/bin/sh\necho \"boom\" >&2\nexit 42\n");

        let err = ExternalTool::new(script, Duration::from_secs(10))
            .run(&[])
            .expect_err("expected failure");

        match err {
            EngineError::ToolFailed {
                tool,
                exit_code,
                stderr,
            } => {
                assert_eq!(tool, "bad-tool");
                assert_eq!(exit_code, Some(42));
                assert_eq!(stderr, "boom");
            }
            other => panic!("unexpected error variant: {other:?}"),
        }
    }

    #[test]
    fn kills_tool_after_deadline() {
        let dir = TempDir::new().expect("temp dir");
        let script = fake_tool(&dir, "slow-tool", "#!/bin/sh\nexec sleep 30\n");

        let started = Instant::now();
        let err = ExternalTool::new(script, Duration::from_millis(200))
            .run(&[])
            .expect_err("expected timeout");

        assert!(matches!(err, EngineError::Timeout { .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn missing_program_is_not_found() {
        let err = ExternalTool::new("/nonexistent/nota-tool", Duration::from_secs(1))
            .run(&[])
            .expect_err("expected spawn failure");
        assert!(matches!(err, EngineError::ToolNotFound { .. }));
    }
}
