//! Grade command - runs one batch from files on disk

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Args;
use tokio::signal;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{error, info, warn};

use crate::config::AppConfig;
use crate::domain::grading::{BatchReport, GradingEvent, ItemOutcome, event_channel};
use crate::domain::item::Item;
use crate::domain::retrieval::ReferenceDocument;
use crate::domain::rubric::Rubric;
use crate::infrastructure::logging;
use crate::infrastructure::observability::init_metrics;

#[derive(Args, Debug)]
pub struct GradeArgs {
    /// Rubric JSON file
    #[arg(long)]
    pub rubric: PathBuf,

    /// JSON array of items to grade
    #[arg(long)]
    pub items: PathBuf,

    /// Reference text file used as grading context (repeatable)
    #[arg(long = "reference")]
    pub references: Vec<PathBuf>,

    /// Write the batch report here instead of stdout
    #[arg(long)]
    pub output: Option<PathBuf>,

    /// Run a second pass over items that failed
    #[arg(long)]
    pub retry_failed: bool,

    /// Print the batch summary instead of the full report
    #[arg(long)]
    pub summary: bool,

    /// Check the batch setup and exit without grading
    #[arg(long)]
    pub dry_run: bool,

    /// Write Prometheus metrics here when the batch ends
    #[arg(long)]
    pub metrics_out: Option<PathBuf>,
}

/// Run the grade command
pub async fn run(args: GradeArgs) -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    let mut config = AppConfig::load().context("loading configuration")?;
    if args.metrics_out.is_some() {
        config.metrics.enabled = true;
    }
    logging::init_logging(&config.logging);
    let metrics = init_metrics(&config.metrics);

    let rubric: Rubric = read_json(&args.rubric).await?;
    let items: Vec<Item> = read_json(&args.items).await?;
    let references = read_references(&args.references).await?;

    let (events, rx) = event_channel();
    let orchestrator = crate::build_orchestrator(&config)?.with_events(events);

    let setup = orchestrator.validate_setup(&rubric, &items);
    for warning in &setup.warnings {
        warn!("{}", warning);
    }
    if !setup.is_valid() {
        for e in &setup.errors {
            error!("{}", e);
        }
        anyhow::bail!("batch setup is invalid ({} error(s))", setup.errors.len());
    }
    if args.dry_run {
        info!(items = items.len(), "Batch setup is valid");
        return Ok(());
    }

    let listener = tokio::spawn(log_events(rx));

    let cancellation = orchestrator.cancellation_handle();
    tokio::spawn(async move {
        if signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received; finishing the current item then stopping");
            cancellation.cancel();
        }
    });

    let mut report = orchestrator
        .grade_batch(&rubric, items, references.clone())
        .await?;

    if args.retry_failed && report.has_failures() && !report.was_cancelled {
        report = orchestrator
            .retry_failed(&report, &rubric, references)
            .await?;
    }

    drop(orchestrator);
    listener.await.ok();

    write_report(&report, &args).await?;

    if let (Some(path), Some(metrics)) = (&args.metrics_out, metrics) {
        tokio::fs::write(path, metrics.render())
            .await
            .with_context(|| format!("writing metrics to {}", path.display()))?;
    }

    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> anyhow::Result<T> {
    let text = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

async fn read_references(paths: &[PathBuf]) -> anyhow::Result<Vec<ReferenceDocument>> {
    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("reading reference {}", path.display()))?;
        let id = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        documents.push(ReferenceDocument::new(id, content));
    }
    Ok(documents)
}

async fn write_report(report: &BatchReport, args: &GradeArgs) -> anyhow::Result<()> {
    let json = if args.summary {
        serde_json::to_string_pretty(&report.summary())?
    } else {
        serde_json::to_string_pretty(report)?
    };

    match &args.output {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}

async fn log_events(mut rx: UnboundedReceiver<GradingEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            GradingEvent::Progress(progress) => info!(
                completed = progress.completed,
                failed = progress.failed,
                total = progress.total,
                eta = ?progress.eta,
                "Progress"
            ),
            GradingEvent::ItemCompleted {
                item_id, outcome, ..
            } => match outcome {
                ItemOutcome::Graded { result } => info!(
                    item_id = %item_id,
                    score = result.total_score,
                    max_score = result.total_max_score,
                    grade = %result.letter_grade(),
                    "Graded"
                ),
                ItemOutcome::Failed { error } => {
                    warn!(item_id = %item_id, error = %error, "Not graded")
                }
            },
            GradingEvent::BatchCompleted { count } => info!(count, "Batch completed"),
            GradingEvent::Error { context, message } => {
                error!(context = %context, message = %message, "Grading error")
            }
        }
    }
}
