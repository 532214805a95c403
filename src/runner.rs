use std::time::Instant;

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, Url};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::RequestConfig;
use crate::error::{BenchError, Result};

/// Longest slice of an error body carried into a protocol failure.
const ERROR_SNIPPET_LEN: usize = 512;

/// Timing and token accounting for one completed request.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RequestResult {
    pub elapsed_s: f64,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub tps: f64,
}

impl RequestResult {
    pub fn new(elapsed_s: f64, prompt_tokens: u64, completion_tokens: u64) -> Self {
        let elapsed_s = elapsed_s.max(0.0);
        let tps = if elapsed_s > 0.0 {
            completion_tokens as f64 / elapsed_s
        } else {
            0.0
        };
        Self {
            elapsed_s,
            prompt_tokens,
            completion_tokens,
            tps,
        }
    }
}

/// One unit of benchmark work. The dispatcher only ever talks to this trait.
#[async_trait]
pub trait RequestRunner: Send + Sync {
    async fn run_once(&self) -> Result<RequestResult>;
}

/// Issues chat-completion requests against a live server.
#[derive(Debug, Clone)]
pub struct HttpRunner {
    client: Client,
    endpoint: Url,
    headers: HeaderMap,
    body: Value,
}

impl HttpRunner {
    pub fn new(config: &RequestConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(BenchError::Network)?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            headers: config.headers.clone(),
            body: config.request_body(),
        })
    }
}

#[async_trait]
impl RequestRunner for HttpRunner {
    async fn run_once(&self) -> Result<RequestResult> {
        let request = self
            .client
            .post(self.endpoint.clone())
            .headers(self.headers.clone())
            .json(&self.body);

        let start = Instant::now();
        let response = request.send().await?;
        let status = response.status();
        let bytes = response.bytes().await?;
        let elapsed = start.elapsed();

        if !status.is_success() {
            let snippet = String::from_utf8_lossy(&bytes);
            let body: String = snippet.chars().take(ERROR_SNIPPET_LEN).collect();
            return Err(BenchError::Protocol { status, body });
        }

        let usage = extract_usage(&bytes)?;
        Ok(RequestResult::new(
            elapsed.as_secs_f64(),
            usage.prompt_tokens,
            usage.completion_tokens,
        ))
    }
}

#[derive(Debug, Default, Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
pub(crate) struct Usage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
}

/// Missing usage data counts as zero tokens; an unparseable body is an error.
pub(crate) fn extract_usage(bytes: &[u8]) -> Result<Usage> {
    let payload: CompletionResponse = serde_json::from_slice(bytes)?;
    Ok(payload.usage.unwrap_or_default())
}
