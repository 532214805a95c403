use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::Url;
use serde_json::{json, Value};

use crate::error::{BenchError, Result};

pub const CHAT_COMPLETIONS_PATH: &str = "/v1/chat/completions";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Abort the whole run on the first failed request.
    #[default]
    FailFast,
    /// Record failed requests and summarize whatever succeeded.
    Tolerate,
}

/// Immutable description of one benchmark run.
#[derive(Clone, Debug)]
pub struct RequestConfig {
    pub endpoint: Url,
    pub model: String,
    pub prompt: String,
    pub max_tokens: u32,
    pub temperature: f64,
    pub requests: usize,
    pub concurrency: usize,
    pub request_timeout: Duration,
    pub failure_policy: FailurePolicy,
    pub headers: HeaderMap,
}

impl RequestConfig {
    pub fn try_new(
        base_url: impl AsRef<str>,
        model: impl Into<String>,
        prompt: impl Into<String>,
        max_tokens: u32,
        temperature: f64,
        requests: usize,
        concurrency: usize,
    ) -> Result<Self> {
        let endpoint = resolve_endpoint(base_url.as_ref())?;

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let config = Self {
            endpoint,
            model: model.into(),
            prompt: prompt.into(),
            max_tokens,
            temperature,
            requests,
            concurrency,
            request_timeout: Duration::from_secs(120),
            failure_policy: FailurePolicy::default(),
            headers,
        };
        config.validate()?;
        Ok(config)
    }

    /// Checks the run-shaping fields; the fields are public, so the pipeline
    /// calls this again before dispatching.
    pub fn validate(&self) -> Result<()> {
        if self.requests == 0 {
            return Err(BenchError::config("requests", "must be greater than zero"));
        }
        if self.concurrency == 0 {
            return Err(BenchError::config("concurrency", "must be greater than zero"));
        }
        if self.max_tokens == 0 {
            return Err(BenchError::config("max_tokens", "must be greater than zero"));
        }
        Ok(())
    }

    pub fn with_request_timeout(mut self, request_timeout: Duration) -> Self {
        if !request_timeout.is_zero() {
            self.request_timeout = request_timeout;
        }
        self
    }

    pub fn with_failure_policy(mut self, failure_policy: FailurePolicy) -> Self {
        self.failure_policy = failure_policy;
        self
    }

    pub fn request_body(&self) -> Value {
        json!({
            "model": self.model,
            "temperature": self.temperature,
            "max_tokens": self.max_tokens,
            "messages": [
                {
                    "role": "user",
                    "content": self.prompt,
                }
            ]
        })
    }
}

fn resolve_endpoint(base_url: &str) -> Result<Url> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(BenchError::config("base_url", "must not be empty"));
    }

    let joined = format!("{}{}", trimmed, CHAT_COMPLETIONS_PATH);
    Url::parse(&joined)
        .map_err(|err| BenchError::config("base_url", format!("{} ({})", err, base_url)))
}
