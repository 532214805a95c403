use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use chatbench_rs::{run_and_write, BenchmarkReport, FailurePolicy, RequestConfig};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "chatbench",
    about = "Benchmark latency and throughput of a chat-completion endpoint"
)]
struct Args {
    /// Server base URL; `/v1/chat/completions` is appended
    #[arg(long, env = "CHATBENCH_BASE_URL", default_value = "http://localhost:8000")]
    base_url: String,

    /// Model identifier to embed in each request body
    #[arg(
        long,
        env = "CHATBENCH_MODEL",
        default_value = "Llama-3.2-1B-Instruct-Q4_K_M.gguf"
    )]
    model: String,

    /// Prompt sent as the single user message
    #[arg(long, default_value = "Write a short sentence about the weather.")]
    prompt: String,

    /// Total number of requests to issue
    #[arg(long, default_value_t = 10)]
    requests: usize,

    /// Maximum number of requests in flight at once
    #[arg(long, default_value_t = 2)]
    concurrency: usize,

    #[arg(long, default_value_t = 64)]
    max_tokens: u32,

    #[arg(long, default_value_t = 0.7)]
    temperature: f64,

    /// Where to write the summary and raw results as JSON
    #[arg(long, default_value = "benchmark.json")]
    out_json: PathBuf,

    /// Where to write the raw results as CSV
    #[arg(long, default_value = "benchmark.csv")]
    out_csv: PathBuf,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 120)]
    timeout_secs: u64,

    /// Keep going after failed requests and summarize the rest
    #[arg(long)]
    tolerate_failures: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let policy = if args.tolerate_failures {
        FailurePolicy::Tolerate
    } else {
        FailurePolicy::FailFast
    };

    let config = RequestConfig::try_new(
        &args.base_url,
        args.model,
        args.prompt,
        args.max_tokens,
        args.temperature,
        args.requests,
        args.concurrency,
    )
    .context("refusing to start benchmark")?
    .with_request_timeout(Duration::from_secs(args.timeout_secs))
    .with_failure_policy(policy);

    let report = run_and_write(&config, &args.out_json, &args.out_csv)
        .await
        .with_context(|| format!("benchmark against {} failed", config.endpoint))?;

    print_summary(&report)?;

    Ok(())
}

fn print_summary(report: &BenchmarkReport) -> Result<()> {
    println!("{}", report.console_summary()?);

    if !report.failures.is_empty() {
        warn!(
            failed = report.failures.len(),
            "some requests failed and were left out of the summary"
        );
        for failure in &report.failures {
            warn!("  request {}: {}", failure.index, failure.error);
        }
    }

    info!(
        wall_time_s = report.wall_time.as_secs_f64(),
        "benchmark finished"
    );

    Ok(())
}
