use std::fmt::Write as _;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Serialize, Serializer};
use tokio::fs;
use tracing::warn;

use crate::runner::RequestResult;

pub const CSV_HEADER: &str = "elapsed_s,prompt_tokens,completion_tokens,tps";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FailureRecord {
    pub index: usize,
    pub error: String,
}

/// Aggregate statistics for one run. Latencies are in seconds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub requests: usize,
    pub concurrency: usize,
    #[serde(serialize_with = "round_latency")]
    pub avg_latency_s: f64,
    #[serde(serialize_with = "round_latency")]
    pub p95_latency_s: f64,
    #[serde(serialize_with = "round_latency")]
    pub p99_latency_s: f64,
    #[serde(serialize_with = "round_tps")]
    pub avg_tps: f64,
    #[serde(serialize_with = "round_latency")]
    pub p50_latency_s: f64,
    pub successful_requests: usize,
    pub failed_requests: usize,
}

#[derive(Debug, Clone)]
pub struct BenchmarkReport {
    pub summary: Summary,
    pub results: Vec<RequestResult>,
    pub failures: Vec<FailureRecord>,
    pub wall_time: Duration,
}

#[derive(Serialize)]
struct ReportDocument<'a> {
    summary: &'a Summary,
    results: &'a [RequestResult],
}

impl BenchmarkReport {
    /// Summary plus raw results, results kept at full precision.
    pub fn to_json(&self) -> Result<String> {
        let document = ReportDocument {
            summary: &self.summary,
            results: &self.results,
        };
        serde_json::to_string_pretty(&document).context("failed to serialize report as JSON")
    }

    pub fn to_csv(&self) -> String {
        render_csv(&self.results)
    }

    /// What gets echoed to stdout.
    pub fn console_summary(&self) -> Result<String> {
        serde_json::to_string_pretty(&self.summary).context("failed to serialize summary")
    }

    /// Writes both artifacts or neither: a failed CSV write removes the JSON file.
    pub async fn write_artifacts(&self, json_path: &Path, csv_path: &Path) -> Result<()> {
        let json = self.to_json()?;
        let csv = self.to_csv();

        fs::write(json_path, json)
            .await
            .with_context(|| format!("failed to write {}", json_path.display()))?;

        if let Err(err) = fs::write(csv_path, csv).await {
            if let Err(cleanup) = fs::remove_file(json_path).await {
                warn!(path = %json_path.display(), error = %cleanup, "failed to remove partial report");
            }
            return Err(err).with_context(|| format!("failed to write {}", csv_path.display()));
        }

        Ok(())
    }
}

pub fn render_csv(results: &[RequestResult]) -> String {
    let mut out = String::with_capacity(CSV_HEADER.len() + results.len() * 32);
    out.push_str(CSV_HEADER);
    out.push('\n');
    for r in results {
        // writing into a String cannot fail
        let _ = writeln!(
            out,
            "{:.4},{},{},{:.2}",
            r.elapsed_s, r.prompt_tokens, r.completion_tokens, r.tps
        );
    }
    out
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

fn round_latency<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 4))
}

fn round_tps<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(round_to(*value, 2))
}
