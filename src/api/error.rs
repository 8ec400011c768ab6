use thiserror::Error;

use super::http::Method;

/// Failures surfaced by the CDN and certificate API clients.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error("transport error on {method} {url}: {message}")]
    Transport {
        method: Method,
        url: String,
        message: String,
    },
    #[error("{method} {url} returned {status}{}", status_hint(.status))]
    UnexpectedStatus {
        method: Method,
        url: String,
        status: u16,
        body: String,
    },
    #[error("{kind} not found: {key}")]
    NotFound { kind: &'static str, key: String },
    #[error("failed to decode response from {url}: {message}")]
    Decode { url: String, message: String },
}

impl ApiError {
    /// HTTP status of an unexpected-status failure, if that is what this is.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ApiError::NotFound { .. })
    }

    pub(crate) fn is_transient(&self) -> bool {
        matches!(self, ApiError::Transport { .. })
    }
}

fn status_hint(status: &u16) -> &'static str {
    match *status {
        401 | 403 => " (authentication failed)",
        404 => " (not found)",
        429 => " (rate limit exceeded)",
        500..=599 => " (provider error)",
        _ => "",
    }
}
