use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use pipeline_core::{
    FeatureEngineeringRequest, JobRequest, JobStatus, JobViewModel, PreprocessRequest,
};
use pipeline_engine::{JobPoller, Notifier, PipelineClient};
use pipeline_logging::{pipeline_info, pipeline_warn, LevelFilter};
use serde_json::Value;

use crate::args::{Cli, Command};
use crate::config::{load_config, save_config, AppConfig};
use crate::render::{progress_line, summary_lines};
use crate::toast::TerminalToastSink;

const DRAIN_POLL: Duration = Duration::from_millis(50);

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if !pipeline_logging::initialize(cli.log.into(), level) {
        eprintln!("Logging could not be initialized; continuing without it.");
    }

    if let Command::InitConfig = cli.command {
        save_config(&cli.config, &AppConfig::with_defaults())?;
        println!("Wrote {}", cli.config.display());
        return Ok(());
    }

    let mut config = load_config(&cli.config)?;
    if let Some(base_url) = &cli.base_url {
        config.base_url = Some(base_url.clone());
    }
    let settings = config.engine_settings()?;
    pipeline_info!("Using backend {}", settings.backend.base_url);

    let client = PipelineClient::new(settings, Arc::new(TerminalToastSink))
        .context("failed to build the HTTP client")?;
    let poller = client.job_poller();

    let (request, save) = match &cli.command {
        Command::Preprocess(args) => {
            let steps: Value = serde_json::from_str(&args.steps)
                .with_context(|| format!("--steps is not valid JSON: {}", args.steps))?;
            (
                JobRequest::Preprocess(PreprocessRequest::new(args.file.clone(), steps)),
                false,
            )
        }
        Command::Train(args) => (JobRequest::Training(args.to_request()), args.save),
        Command::FeatureEngineer(args) => {
            let steps: Value = serde_json::from_str(&args.steps)
                .with_context(|| format!("--steps is not valid JSON: {}", args.steps))?;
            (
                JobRequest::FeatureEngineering(FeatureEngineeringRequest::new(
                    args.file.clone(),
                    steps,
                )),
                false,
            )
        }
        Command::InitConfig => return Ok(()),
    };

    let outcome = run_job(&poller, request, save).await;
    drain_notices(client.notifier(), config.notice_drain()).await;
    outcome
}

async fn run_job(poller: &JobPoller, request: JobRequest, save: bool) -> anyhow::Result<()> {
    let printer = tokio::spawn(print_progress(poller.subscribe()));

    let started = poller.start(request).await;
    let view = match started {
        Ok(job_id) => {
            pipeline_info!("Tracking job {}", job_id);
            tokio::select! {
                view = poller.wait_until_settled() => view,
                _ = tokio::signal::ctrl_c() => {
                    pipeline_warn!("Interrupted, abandoning job");
                    poller.reset();
                    printer.abort();
                    bail!("interrupted");
                }
            }
        }
        Err(err) => {
            printer.abort();
            return Err(err.into());
        }
    };
    printer.abort();

    for line in summary_lines(&view) {
        println!("{line}");
    }
    if view.status == JobStatus::Failed {
        bail!("job did not complete");
    }

    if save {
        let model_id = poller.save_model().await?;
        println!("Saved model {model_id}");
    }
    Ok(())
}

async fn print_progress(mut rx: tokio::sync::watch::Receiver<JobViewModel>) {
    let mut last = String::new();
    while rx.changed().await.is_ok() {
        let line = {
            let view = rx.borrow_and_update();
            if view.status == JobStatus::Idle {
                continue;
            }
            progress_line(&view)
        };
        if line != last {
            println!("{line}");
            last = line;
        }
    }
}

/// Lets queued notifications reach the terminal before the process exits.
async fn drain_notices(notifier: &Notifier, limit: Duration) {
    let deadline = tokio::time::Instant::now() + limit;
    while !notifier.is_idle() && tokio::time::Instant::now() < deadline {
        tokio::time::sleep(DRAIN_POLL).await;
    }
}
