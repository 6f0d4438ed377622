//! nota-render binary
//!
//! `nota-render <job>` renders every score requested by `<job>.scores.aux`.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use nota_render::{orchestrator, Pipeline, RenderConfig, RunOutcome};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "nota-render")]
#[command(version, about = "Render music notation requested by a LaTeX job")]
struct Args {
    /// Job name of the LaTeX document, without extension
    job: String,

    /// Configuration file (defaults to ./nota.toml when present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of worker threads
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Deadline for each external tool run, in seconds
    #[arg(long)]
    timeout_secs: Option<u64>,
}

fn main() -> ExitCode {
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    match execute(args) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!("{:#}", err);
            ExitCode::FAILURE
        }
    }
}

fn execute(args: Args) -> anyhow::Result<RunOutcome> {
    let root = std::env::current_dir().context("Failed to resolve working directory")?;

    let mut config = RenderConfig::load(args.config.as_deref(), &root)?;
    if let Some(jobs) = args.jobs {
        config.jobs = Some(jobs);
    }
    if let Some(timeout_secs) = args.timeout_secs {
        config.stage_timeout_secs = timeout_secs;
    }
    config.validate()?;

    tracing::info!("nota-render v{} job={}", env!("CARGO_PKG_VERSION"), args.job);

    let layout = config.layout(&args.job, &root);
    let pipeline = Pipeline::from_config(&config, layout);
    orchestrator::run(&pipeline, config.worker_count(), config.duplicate_ids)
}
