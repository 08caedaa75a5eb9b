//! Error types for provider calls.
//!
//! Every failure a backend can produce is one of the closed set of
//! [`ProviderError`] kinds. Retry decisions operate on the kind via
//! [`ProviderError::is_retryable`], not on error text; the historical
//! "overloaded" substring check survives only as a classification fallback
//! for errors no kind-specific rule catches.

use std::time::Duration;

use reqwest::header::HeaderMap;
use thiserror::Error;

/// Unified error type for chat completion calls.
#[derive(Error, Debug, Clone)]
pub enum ProviderError {
    /// Missing or rejected credentials (HTTP 401/403).
    #[error("authentication failed: {0}")]
    Authentication(String),

    /// The request itself is malformed or unacceptable (HTTP 400/413/415).
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The requested model (or endpoint) does not exist (HTTP 404).
    #[error("model not found: {0}")]
    ModelNotFound(String),

    /// Request rate exceeded (HTTP 429), with the server's wait hint when present.
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// The provider is temporarily overloaded (HTTP 529 or an error body
    /// announcing overload).
    #[error("provider overloaded: {0}")]
    Overloaded(String),

    /// Any other HTTP-level API failure, with the raw status preserved.
    #[error("api error {status}: {message}")]
    Api {
        status: u16,
        message: String,
        details: Option<serde_json::Value>,
    },

    /// Connection-level failure before a response was received.
    #[error("network error: {0}")]
    Network(String),

    /// The request exceeded the configured timeout.
    #[error("request timed out: {0}")]
    Timeout(String),

    /// The event stream broke mid-response.
    #[error("stream error: {0}")]
    Stream(String),

    /// The response payload could not be decoded.
    #[error("response parse error: {0}")]
    Parse(String),

    /// Invalid or missing client configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The operation was cancelled before it produced a result.
    #[error("operation cancelled")]
    Cancelled,

    /// A failure in this library rather than in the provider.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Coarse grouping of error kinds, mainly for logging and metrics labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Auth,
    Client,
    RateLimit,
    Transient,
    Server,
    Network,
    Protocol,
    Cancelled,
    Internal,
}

impl ErrorCategory {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auth => "auth",
            Self::Client => "client",
            Self::RateLimit => "rate_limit",
            Self::Transient => "transient",
            Self::Server => "server",
            Self::Network => "network",
            Self::Protocol => "protocol",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }
}

impl ProviderError {
    /// Create an API error without structured details.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: None,
        }
    }

    /// Create an API error carrying the decoded response body.
    pub fn api_with_details(
        status: u16,
        message: impl Into<String>,
        details: serde_json::Value,
    ) -> Self {
        Self::Api {
            status,
            message: message.into(),
            details: Some(details),
        }
    }

    /// The HTTP status this error originated from, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Authentication(_) => Some(401),
            Self::ModelNotFound(_) => Some(404),
            Self::RateLimited { .. } => Some(429),
            Self::Overloaded(_) => Some(529),
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether the error text announces an overloaded provider.
    ///
    /// This reproduces the substring check the original retry loops used, kept
    /// as a fallback for errors the status-based classification leaves generic.
    pub fn mentions_overload(&self) -> bool {
        self.to_string().to_lowercase().contains("overloaded")
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimited { .. } | Self::Overloaded(_) | Self::Timeout(_) | Self::Network(_) => {
                true
            }
            Self::Api { status, .. } => *status >= 500 || self.mentions_overload(),
            Self::Internal(_) => self.mentions_overload(),
            _ => false,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Authentication(_) => ErrorCategory::Auth,
            Self::InvalidRequest(_) | Self::ModelNotFound(_) | Self::Configuration(_) => {
                ErrorCategory::Client
            }
            Self::RateLimited { .. } => ErrorCategory::RateLimit,
            Self::Overloaded(_) => ErrorCategory::Transient,
            Self::Api { status, .. } => {
                if *status >= 500 {
                    ErrorCategory::Server
                } else {
                    ErrorCategory::Client
                }
            }
            Self::Network(_) | Self::Timeout(_) => ErrorCategory::Network,
            Self::Stream(_) | Self::Parse(_) => ErrorCategory::Protocol,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Internal(_) => ErrorCategory::Internal,
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            Self::Timeout(error.to_string())
        } else if error.is_connect() {
            Self::Network(format!("connection failed: {error}"))
        } else {
            Self::Network(error.to_string())
        }
    }
}

impl From<serde_json::Error> for ProviderError {
    fn from(error: serde_json::Error) -> Self {
        Self::Parse(error.to_string())
    }
}

/// Classify an HTTP failure into a specific [`ProviderError`] kind.
///
/// Inspects the status code, a sample of the response body and the
/// `Retry-After` header to derive a better-typed error than a generic
/// [`ProviderError::Api`]. Provider-agnostic; the body sniffing covers the
/// envelope patterns the common OpenAI-compatible endpoints emit.
pub fn classify_http_response(
    provider_id: &str,
    status: u16,
    body_text: &str,
    headers: &HeaderMap,
) -> ProviderError {
    let lower = body_text.to_lowercase();
    // Limit body sample size to keep error text readable
    let body_sample = body_text.chars().take(200).collect::<String>();

    if status == 529 {
        return ProviderError::Overloaded(format!(
            "provider={provider_id} http=529 body_sample={body_sample}"
        ));
    }

    if status == 429 {
        let retry_after = headers
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_secs);
        return ProviderError::RateLimited {
            message: format!("provider={provider_id} http=429 body_sample={body_sample}"),
            retry_after,
        };
    }

    if status == 401 {
        return ProviderError::Authentication(format!(
            "provider={provider_id} unauthorized body_sample={body_sample}"
        ));
    }

    if status == 404 {
        return ProviderError::ModelNotFound(format!(
            "provider={provider_id} http=404 body_sample={body_sample}"
        ));
    }

    if status == 413 {
        return ProviderError::InvalidRequest(format!(
            "provider={provider_id} http=413 payload too large"
        ));
    }
    if status == 415 {
        return ProviderError::InvalidRequest(format!(
            "provider={provider_id} http=415 unsupported media type"
        ));
    }

    // 403/400 carrying a rate-limit envelope are rate limits in disguise
    if status == 403 || status == 400 {
        let rate_like = lower.contains("rate limit")
            || lower.contains("ratelimit")
            || lower.contains("rate_limit_exceeded")
            || lower.contains("resource_exhausted");
        if rate_like {
            return ProviderError::RateLimited {
                message: format!("provider={provider_id} http={status} rate limited"),
                retry_after: None,
            };
        }
    }

    if status == 403 {
        return ProviderError::Authentication(format!(
            "provider={provider_id} forbidden body_sample={body_sample}"
        ));
    }
    if status == 400 {
        return ProviderError::InvalidRequest(format!(
            "provider={provider_id} bad request body_sample={body_sample}"
        ));
    }

    // Overload announced in the body regardless of status
    if lower.contains("overloaded") {
        return ProviderError::Overloaded(format!(
            "provider={provider_id} http={status} body_sample={body_sample}"
        ));
    }

    // 5xx → server error, retryable via is_retryable()
    if (500..=599).contains(&status) {
        return ProviderError::api(status, format!("provider={provider_id} server error"));
    }

    let message = if body_text.trim().is_empty() {
        format!("provider={provider_id} api error")
    } else {
        body_sample
    };
    let details = match serde_json::from_str::<serde_json::Value>(body_text) {
        Ok(json) => serde_json::json!({
            "status": status,
            "provider": provider_id,
            "response": json,
        }),
        Err(_) => serde_json::json!({
            "status": status,
            "provider": provider_id,
            "raw": body_text,
        }),
    };
    ProviderError::api_with_details(status, message, details)
}
