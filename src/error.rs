use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BenchError {
    #[error("invalid {parameter}: {reason}")]
    Configuration {
        parameter: &'static str,
        reason: String,
    },

    #[error("network failure: {0}")]
    Network(#[source] reqwest::Error),

    #[error("request failed ({status}) {body}")]
    Protocol { status: StatusCode, body: String },

    #[error("response body is not valid JSON: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("no successful results to aggregate")]
    EmptyResultSet,

    #[error("worker task failed: {0}")]
    Worker(String),
}

impl BenchError {
    pub(crate) fn config(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::Configuration {
            parameter,
            reason: reason.into(),
        }
    }

    /// Connection refused, DNS failure or timeout.
    pub fn is_network(&self) -> bool {
        matches!(self, Self::Network(_))
    }

    /// Non-success status or an unparseable body.
    pub fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol { .. } | Self::Decode(_))
    }
}

impl From<reqwest::Error> for BenchError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err)
    }
}

pub type Result<T, E = BenchError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configuration_error_names_parameter() {
        let err = BenchError::config("requests", "must be greater than zero");
        assert_eq!(err.to_string(), "invalid requests: must be greater than zero");
        assert!(!err.is_network());
        assert!(!err.is_protocol());
    }

    #[test]
    fn decode_and_status_failures_are_protocol() {
        let decode = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        assert!(BenchError::from(decode).is_protocol());

        let status = BenchError::Protocol {
            status: StatusCode::SERVICE_UNAVAILABLE,
            body: "busy".to_string(),
        };
        assert!(status.is_protocol());
        assert_eq!(status.to_string(), "request failed (503 Service Unavailable) busy");
    }
}
