use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::config::FailurePolicy;
use crate::error::{BenchError, Result};
use crate::report::FailureRecord;
use crate::runner::{RequestResult, RequestRunner};

/// Upper bound on the result buffer reserved before any request completes.
const MAX_PREALLOCATED_RESULTS: usize = 1024;

/// Everything the worker pool collected, in completion order.
#[derive(Debug, Default)]
pub struct DispatchOutcome {
    pub results: Vec<RequestResult>,
    pub failures: Vec<FailureRecord>,
    pub wall_time: Duration,
}

/// Runs `requests` calls of `runner` with at most `concurrency` in flight.
///
/// A fixed pool of `min(concurrency, requests)` workers pulls request indices
/// from a shared counter, so workers are reused rather than spawned per
/// request. Results are funnelled over a channel to this task, which is the
/// only writer of the output collections.
pub async fn dispatch<R>(
    runner: Arc<R>,
    requests: usize,
    concurrency: usize,
    policy: FailurePolicy,
) -> Result<DispatchOutcome>
where
    R: RequestRunner + 'static,
{
    if requests == 0 {
        return Err(BenchError::config("requests", "must be greater than zero"));
    }
    if concurrency == 0 {
        return Err(BenchError::config("concurrency", "must be greater than zero"));
    }

    let start = Instant::now();
    let workers = concurrency.min(requests);
    info!(requests, workers, "dispatching requests");

    let next_index = Arc::new(AtomicUsize::new(0));
    let (event_tx, mut event_rx) = mpsc::unbounded_channel();

    let mut join_set = JoinSet::new();
    for worker_id in 0..workers {
        let runner = Arc::clone(&runner);
        let next_index = Arc::clone(&next_index);
        let tx = event_tx.clone();
        join_set.spawn(run_worker(worker_id, runner, next_index, requests, tx));
    }
    drop(event_tx);

    let mut outcome = DispatchOutcome {
        results: Vec::with_capacity(requests.min(MAX_PREALLOCATED_RESULTS)),
        ..Default::default()
    };

    while let Some(event) = event_rx.recv().await {
        match event {
            WorkerEvent::Success { index, result } => {
                debug!(
                    index,
                    elapsed_s = result.elapsed_s,
                    completion_tokens = result.completion_tokens,
                    "request completed"
                );
                outcome.results.push(result);
            }
            WorkerEvent::Failure { index, error } => {
                warn!(index, error = %error, "request failed");
                if policy == FailurePolicy::FailFast {
                    join_set.abort_all();
                    return Err(error);
                }
                outcome.failures.push(FailureRecord {
                    index,
                    error: error.to_string(),
                });
            }
        }
    }

    while let Some(joined) = join_set.join_next().await {
        joined.map_err(|err| BenchError::Worker(err.to_string()))?;
    }

    outcome.wall_time = start.elapsed();
    info!(
        successes = outcome.results.len(),
        failures = outcome.failures.len(),
        wall_time_s = outcome.wall_time.as_secs_f64(),
        "dispatch finished"
    );
    Ok(outcome)
}

async fn run_worker<R>(
    worker_id: usize,
    runner: Arc<R>,
    next_index: Arc<AtomicUsize>,
    requests: usize,
    event_tx: mpsc::UnboundedSender<WorkerEvent>,
) where
    R: RequestRunner + 'static,
{
    loop {
        let index = next_index.fetch_add(1, Ordering::Relaxed);
        if index >= requests {
            break;
        }

        let event = match runner.run_once().await {
            Ok(result) => WorkerEvent::Success { index, result },
            Err(error) => WorkerEvent::Failure { index, error },
        };

        if event_tx.send(event).is_err() {
            debug!(worker_id, "collector gone, stopping worker");
            break;
        }
    }
}

#[derive(Debug)]
enum WorkerEvent {
    Success {
        index: usize,
        result: RequestResult,
    },
    Failure {
        index: usize,
        error: BenchError,
    },
}
