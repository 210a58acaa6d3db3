use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API returned error (HTTP {status}): {message}")]
    Api {
        status: u16,
        message: String,
        errors: Vec<String>,
    },

    #[error("Resource not found")]
    NotFound,

    #[error("Invalid host {0:?}")]
    InvalidHost(String),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Authentication failed, check the API token")]
    AuthError,

    #[error("Request timeout after {0} seconds")]
    Timeout(u64),

    #[error("Too many requests, rate limited")]
    RateLimited,

    #[error("Service unavailable, retry later")]
    ServiceUnavailable,
}

impl ApiError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound)
    }

    /// Text for a diagnostic detail: the API's own error list when it sent one
    pub fn detail(&self) -> String {
        match self {
            ApiError::Api { status, errors, .. } if !errors.is_empty() => {
                format!("HTTP {}: {}", status, errors.join("; "))
            }
            other => other.to_string(),
        }
    }
}
