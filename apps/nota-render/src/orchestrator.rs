//! Batch orchestration
//!
//! Reads the directive file, fans the requests out over a bounded worker
//! pool and reports each outcome as it completes. A failing request never
//! stops the batch; only problems with the run itself (unreadable directive
//! file, unusable output directory) are returned as errors.

use std::collections::HashSet;
use std::fs;
use std::sync::mpsc;
use std::thread;

use anyhow::Context;
use nota_types::{parse_directive_line, ScoreRequest};
use tracing::{error, info, warn};

use crate::config::DuplicateIds;
use crate::worker::{Pipeline, RenderResult};

/// Aggregate outcome of a run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Well-formed requests dispatched to workers
    pub dispatched: usize,
    pub succeeded: usize,
    pub failed: usize,
    /// Malformed or duplicate lines
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The typesetting pass has not written a directive file yet
    NoDirectives,
    Completed(RunSummary),
}

/// Requests parsed from a directive file plus the number of skipped lines
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DirectiveBatch {
    pub requests: Vec<ScoreRequest>,
    pub skipped: usize,
}

/// Parse directive file content, skipping blank, malformed (including
/// non-UTF-8) and, under [`DuplicateIds::Reject`], repeated-id lines.
pub fn parse_directives(content: &[u8], duplicates: DuplicateIds) -> DirectiveBatch {
    let mut batch = DirectiveBatch::default();
    let mut seen = HashSet::new();

    for (index, raw) in content.split(|&byte| byte == b'\n').enumerate() {
        let line_number = index + 1;
        let line = match std::str::from_utf8(raw) {
            Ok(line) => line,
            Err(err) => {
                warn!(line = line_number, error = %err, "Directive line is not valid UTF-8, skipping");
                batch.skipped += 1;
                continue;
            }
        };
        if line.trim().is_empty() {
            continue;
        }

        let request = match parse_directive_line(line) {
            Ok(request) => request,
            Err(err) => {
                warn!(line = line_number, error = %err, content = %line.trim(), "Malformed directive line, skipping");
                batch.skipped += 1;
                continue;
            }
        };

        if !seen.insert(request.id.clone()) {
            match duplicates {
                DuplicateIds::Reject => {
                    warn!(line = line_number, id = %request.id, "Duplicate score id, skipping");
                    batch.skipped += 1;
                    continue;
                }
                DuplicateIds::Overwrite => {
                    warn!(line = line_number, id = %request.id, "Duplicate score id, artifacts will be overwritten");
                }
            }
        }

        batch.requests.push(request);
    }

    batch
}

/// Run every request in `pipeline.layout.directive_path` on `workers` threads.
pub fn run(
    pipeline: &Pipeline,
    workers: usize,
    duplicates: DuplicateIds,
) -> anyhow::Result<RunOutcome> {
    let layout = &pipeline.layout;

    fs::create_dir_all(&layout.output_dir).with_context(|| {
        format!(
            "Failed to create output directory {}",
            layout.output_dir.display()
        )
    })?;

    if !layout.directive_path.is_file() {
        info!(
            path = %layout.directive_path.display(),
            "Directive file not found. Run LaTeX first."
        );
        return Ok(RunOutcome::NoDirectives);
    }

    info!(path = %layout.directive_path.display(), "Reading score requests");
    let content = fs::read(&layout.directive_path).with_context(|| {
        format!(
            "Failed to read directive file {}",
            layout.directive_path.display()
        )
    })?;

    let batch = parse_directives(&content, duplicates);
    let mut summary = RunSummary {
        dispatched: batch.requests.len(),
        skipped: batch.skipped,
        ..Default::default()
    };

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("nota-worker-{}", i))
        .build()
        .context("Failed to build worker pool")?;

    info!(
        requests = batch.requests.len(),
        workers = pool.current_num_threads(),
        "Dispatching score requests"
    );

    let (tx, rx) = mpsc::channel::<RenderResult>();
    thread::scope(|scope| {
        scope.spawn(|| {
            pool.scope(|jobs| {
                for request in &batch.requests {
                    let tx = tx.clone();
                    jobs.spawn(move |_| {
                        // Receiver outlives every job
                        let _ = tx.send(pipeline.render(request));
                    });
                }
            });
            drop(tx);
        });

        for result in rx {
            match result {
                Ok(rendered) => {
                    summary.succeeded += 1;
                    info!(
                        id = %rendered.id,
                        pages = rendered.page_count,
                        snippet = %rendered.snippet_path.display(),
                        "Score ready"
                    );
                }
                Err(err) => {
                    summary.failed += 1;
                    error!(id = %err.id(), stage = err.stage(), "Score failed: {}", err);
                }
            }
        }
    });

    info!(
        succeeded = summary.succeeded,
        failed = summary.failed,
        skipped = summary.skipped,
        "Score rendering finished"
    );
    Ok(RunOutcome::Completed(summary))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    const GOOD: &str = "|fullscore|a.mei|Leipzig|9|597pt|845pt|0pt|0pt|62pt|62pt";

    #[test]
    fn test_parse_skips_blank_and_malformed_lines() {
        let content = format!("s1{GOOD}\n\n   \nbroken|line\ns2{GOOD}\n");
        let batch = parse_directives(content.as_bytes(), DuplicateIds::Reject);

        let ids: Vec<_> = batch.requests.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s2"]);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_parse_rejects_duplicate_ids() {
        let content = format!("s1{GOOD}\ns1{GOOD}\ns2{GOOD}\n");
        let batch = parse_directives(content.as_bytes(), DuplicateIds::Reject);

        assert_eq!(batch.requests.len(), 2);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_parse_overwrite_keeps_duplicates() {
        let content = format!("s1{GOOD}\ns1{GOOD}\n");
        let batch = parse_directives(content.as_bytes(), DuplicateIds::Overwrite);

        assert_eq!(batch.requests.len(), 2);
        assert_eq!(batch.skipped, 0);
    }

    #[test]
    fn test_parse_skips_invalid_utf8_line() {
        let mut content = format!("s1{GOOD}\n").into_bytes();
        content.extend_from_slice(b"s2|fullscore|H\xe4ndel.mei|Leipzig|9|1pt|1pt|0pt|0pt|0pt|0pt\n");
        content.extend_from_slice(format!("s3{GOOD}").as_bytes());

        let batch = parse_directives(&content, DuplicateIds::Reject);

        let ids: Vec<_> = batch.requests.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["s1", "s3"]);
        assert_eq!(batch.skipped, 1);
    }

    #[test]
    fn test_parse_accepts_crlf_lines() {
        let content = format!("s1{GOOD}\r\ns2{GOOD}\r\n");
        let batch = parse_directives(content.as_bytes(), DuplicateIds::Reject);

        assert_eq!(batch.requests.len(), 2);
        assert_eq!(batch.requests[1].even_side_margin, "62pt");
    }

    #[test]
    fn test_parse_empty_content() {
        assert_eq!(
            parse_directives(b"", DuplicateIds::Reject),
            DirectiveBatch::default()
        );
    }

    proptest! {
        #[test]
        fn every_line_is_requested_or_skipped(kinds in prop::collection::vec(0u8..4, 0..40)) {
            let mut content = Vec::new();
            let mut good = 0;
            let mut bad = 0;
            for (i, kind) in kinds.iter().enumerate() {
                match kind {
                    0 => {
                        content.extend_from_slice(format!("s{i}{GOOD}").as_bytes());
                        good += 1;
                    }
                    1 => {
                        content.extend_from_slice(format!("s{i}|fullscore|a.mei").as_bytes());
                        bad += 1;
                    }
                    2 => {
                        content.extend_from_slice(b"s\xff|fullscore");
                        bad += 1;
                    }
                    _ => content.extend_from_slice(b"   "),
                }
                content.push(b'\n');
            }

            let batch = parse_directives(&content, DuplicateIds::Reject);

            prop_assert_eq!(batch.requests.len(), good);
            prop_assert_eq!(batch.skipped, bad);
        }
    }
}
