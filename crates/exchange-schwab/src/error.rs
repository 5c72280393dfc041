//! Error types for the Schwab integration.

use gamma_core::RefreshError;
use thiserror::Error;

/// Errors that can occur when talking to Schwab.
#[derive(Debug, Error)]
pub enum SchwabError {
    /// Missing or unusable credentials.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Token refresh rejected or response unusable.
    #[error("authentication error: {0}")]
    Authentication(String),

    /// Non-success HTTP status.
    #[error("API error: {status_code} - {message}")]
    Api { status_code: u16, message: String },

    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimit { retry_after_secs: u64 },

    #[error("network error: {0}")]
    Network(String),

    #[error("request timeout: {0}")]
    Timeout(String),

    /// Body was not valid JSON.
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl SchwabError {
    /// Creates an API error from status code and body text. The body is
    /// truncated so upstream HTML error pages do not flood the logs.
    pub fn api(status_code: u16, message: impl Into<String>) -> Self {
        let mut message = message.into();
        if message.len() > 400 {
            let cut = (0..=400).rev().find(|i| message.is_char_boundary(*i)).unwrap_or(0);
            message.truncate(cut);
        }
        Self::Api {
            status_code,
            message,
        }
    }

    pub fn rate_limit(retry_after_secs: u64) -> Self {
        Self::RateLimit { retry_after_secs }
    }

    /// True when the next scheduled attempt may succeed unchanged.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) | Self::Timeout(_) | Self::RateLimit { .. } => true,
            Self::Api { status_code, .. } => *status_code >= 500,
            _ => false,
        }
    }

    #[must_use]
    pub fn is_auth(&self) -> bool {
        match self {
            Self::Configuration(_) | Self::Authentication(_) => true,
            Self::Api { status_code, .. } => matches!(status_code, 401 | 403),
            _ => false,
        }
    }
}

impl From<reqwest::Error> for SchwabError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout(err.to_string())
        } else if err.is_connect() {
            Self::Network(format!("connection failed: {err}"))
        } else {
            Self::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for SchwabError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<SchwabError> for RefreshError {
    fn from(err: SchwabError) -> Self {
        let message = err.to_string();
        if err.is_auth() {
            RefreshError::auth(message)
        } else if err.is_transient() {
            RefreshError::transient(message)
        } else if matches!(err, SchwabError::Serialization(_)) {
            RefreshError::malformed(message)
        } else {
            // Other 4xx: surfaced and retried on the next cycle.
            RefreshError::transient(message)
        }
    }
}

/// Result type alias for Schwab operations.
pub type Result<T> = std::result::Result<T, SchwabError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(SchwabError::api(503, "unavailable").is_transient());
        assert!(SchwabError::api(401, "expired").is_auth());
        assert!(SchwabError::api(403, "forbidden").is_auth());
        assert!(!SchwabError::api(400, "bad request").is_transient());
        assert!(SchwabError::rate_limit(30).is_transient());
    }

    #[test]
    fn test_refresh_error_mapping() {
        assert!(matches!(
            RefreshError::from(SchwabError::api(401, "expired")),
            RefreshError::UpstreamAuth(_)
        ));
        assert!(matches!(
            RefreshError::from(SchwabError::Configuration("missing SCHWAB_REFRESH_TOKEN".into())),
            RefreshError::UpstreamAuth(_)
        ));
        assert!(matches!(
            RefreshError::from(SchwabError::Timeout("20s".into())),
            RefreshError::UpstreamTransient(_)
        ));
        assert!(matches!(
            RefreshError::from(SchwabError::rate_limit(60)),
            RefreshError::UpstreamTransient(_)
        ));
        assert!(matches!(
            RefreshError::from(SchwabError::Serialization("expected value".into())),
            RefreshError::MalformedData(_)
        ));
    }

    #[test]
    fn test_api_message_truncated() {
        let err = SchwabError::api(500, "x".repeat(1000));
        match err {
            SchwabError::Api { message, .. } => assert_eq!(message.len(), 400),
            other => panic!("unexpected {other:?}"),
        }
    }
}
