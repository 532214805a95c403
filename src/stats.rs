use crate::error::{BenchError, Result};
use crate::report::Summary;
use crate::runner::RequestResult;

/// Folds the collected results into one [`Summary`].
///
/// Input order does not matter: latencies are sorted before ranking.
pub fn summarize(
    requests: usize,
    concurrency: usize,
    results: &[RequestResult],
    failed_requests: usize,
) -> Result<Summary> {
    if results.is_empty() {
        return Err(BenchError::EmptyResultSet);
    }

    let count = results.len() as f64;
    let mut sorted: Vec<&RequestResult> = results.iter().collect();
    sorted.sort_by(|a, b| a.elapsed_s.total_cmp(&b.elapsed_s));
    let latencies: Vec<f64> = sorted.iter().map(|r| r.elapsed_s).collect();

    let avg_latency_s = latencies.iter().sum::<f64>() / count;
    let avg_tps = sorted.iter().map(|r| r.tps).sum::<f64>() / count;

    Ok(Summary {
        requests,
        concurrency,
        successful_requests: results.len(),
        failed_requests,
        avg_latency_s,
        p50_latency_s: nearest_rank(&latencies, 50).unwrap_or_default(),
        p95_latency_s: nearest_rank(&latencies, 95).unwrap_or_default(),
        p99_latency_s: nearest_rank(&latencies, 99).unwrap_or_default(),
        avg_tps,
    })
}

/// Nearest-rank percentile over an ascending slice, no interpolation.
///
/// Picks index `max(0, ceil(percent * n / 100) - 1)`; integer arithmetic keeps
/// exact ranks such as 95% of 20 from drifting to the next element.
pub fn nearest_rank(sorted: &[f64], percent: u32) -> Option<f64> {
    if sorted.is_empty() {
        return None;
    }

    let percent = percent.min(100) as usize;
    let rank = (percent * sorted.len()).div_ceil(100);
    let idx = rank.saturating_sub(1).min(sorted.len() - 1);
    sorted.get(idx).copied()
}
