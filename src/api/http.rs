use std::fmt;

use log::debug;
use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use zeroize::Zeroizing;

use super::error::ApiError;
use super::retry::{RetryPolicy, retry_transient};
use crate::config::ApiConfig;

pub const JSON_CONTENT_TYPE: &str = "application/json";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Put,
    Post,
    Delete,
}

impl Method {
    /// The only status code treated as success for this verb.
    pub fn expected_status(self) -> u16 {
        match self {
            Method::Get | Method::Put => 200,
            Method::Post => 201,
            Method::Delete => 204,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Put => "PUT",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        }
    }

    /// POST and DELETE are not replayed: a repeated upload would duplicate the
    /// certificate and a repeated delete would report NotFound.
    fn is_replay_safe(self) -> bool {
        matches!(self, Method::Get | Method::Put)
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Authenticated request/response exchange with a REST API.
///
/// Returns the response body when the status matches
/// [`Method::expected_status`], otherwise [`ApiError::UnexpectedStatus`]
/// carrying the status and the body for diagnostics.
pub trait Transport: Send + Sync {
    fn request(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<String, ApiError>;
}

pub struct HttpTransport {
    client: Client,
    token: Zeroizing<String>,
    retry: RetryPolicy,
}

impl HttpTransport {
    pub fn from_config(config: &ApiConfig) -> Result<Self, ApiError> {
        let token = config
            .token
            .as_ref()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| ApiError::Config("API token is required".to_string()))?;
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|err| ApiError::Config(format!("failed to build HTTP client: {err}")))?;
        Ok(Self::with_client(client, token.as_str(), config.retry))
    }

    pub fn with_client(client: Client, token: &str, retry: RetryPolicy) -> Self {
        Self {
            client,
            token: Zeroizing::new(token.to_string()),
            retry,
        }
    }

    fn send_once(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<String, ApiError> {
        let builder = match method {
            Method::Get => self.client.get(url),
            Method::Put => self.client.put(url),
            Method::Post => self.client.post(url),
            Method::Delete => self.client.delete(url),
        };
        let mut builder = builder
            .bearer_auth(self.token.as_str())
            .header(CONTENT_TYPE, JSON_CONTENT_TYPE);
        if let Some(body) = body {
            builder = builder.body(body.to_vec());
        }

        let transport_error = |err: reqwest::Error| ApiError::Transport {
            method,
            url: url.to_string(),
            message: err.to_string(),
        };
        let response = builder.send().map_err(&transport_error)?;
        let status = response.status().as_u16();
        let text = response.text().map_err(&transport_error)?;
        debug!("[http] {} {} -> {}", method, url, status);

        if status != method.expected_status() {
            return Err(ApiError::UnexpectedStatus {
                method,
                url: url.to_string(),
                status,
                body: text,
            });
        }
        Ok(text)
    }
}

impl Transport for HttpTransport {
    fn request(&self, method: Method, url: &str, body: Option<&[u8]>) -> Result<String, ApiError> {
        let policy = if method.is_replay_safe() {
            self.retry
        } else {
            RetryPolicy::none()
        };
        retry_transient(&format!("{method} {url}"), policy, || {
            self.send_once(method, url, body)
        })
    }
}
