mod config;
mod dispatch;
mod error;
mod report;
mod runner;
mod stats;

use std::path::Path;
use std::sync::Arc;

pub use config::{FailurePolicy, RequestConfig, CHAT_COMPLETIONS_PATH};
pub use dispatch::{dispatch, DispatchOutcome};
pub use error::{BenchError, Result};
pub use report::{render_csv, BenchmarkReport, FailureRecord, Summary, CSV_HEADER};
pub use runner::{HttpRunner, RequestResult, RequestRunner};
pub use stats::{nearest_rank, summarize};

/// Runs the configured benchmark against the live endpoint.
pub async fn run_benchmark(config: &RequestConfig) -> Result<BenchmarkReport> {
    let runner = Arc::new(HttpRunner::new(config)?);
    run_with(runner, config).await
}

/// Same pipeline as [`run_benchmark`] over any [`RequestRunner`].
pub async fn run_with<R>(runner: Arc<R>, config: &RequestConfig) -> Result<BenchmarkReport>
where
    R: RequestRunner + 'static,
{
    config.validate()?;

    let outcome = dispatch(
        runner,
        config.requests,
        config.concurrency,
        config.failure_policy,
    )
    .await?;

    let summary = summarize(
        config.requests,
        config.concurrency,
        &outcome.results,
        outcome.failures.len(),
    )?;

    Ok(BenchmarkReport {
        summary,
        results: outcome.results,
        failures: outcome.failures,
        wall_time: outcome.wall_time,
    })
}

/// Runs the benchmark and persists both artifacts.
///
/// Files are only touched once the run has produced a summary, so a rejected
/// configuration or a failed run leaves `json_path` and `csv_path` alone.
pub async fn run_and_write(
    config: &RequestConfig,
    json_path: &Path,
    csv_path: &Path,
) -> anyhow::Result<BenchmarkReport> {
    let report = run_benchmark(config).await?;
    report.write_artifacts(json_path, csv_path).await?;
    Ok(report)
}
