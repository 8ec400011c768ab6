use serde::de::DeserializeOwned;

mod cdn;
mod certificates;
mod error;
pub(crate) mod http;
mod pagination;
mod retry;

pub use cdn::CdnDirectory;
pub use certificates::{CertificateStore, upload_body};
pub use error::ApiError;
pub use http::{HttpTransport, JSON_CONTENT_TYPE, Method, Transport};
pub use pagination::{DEFAULT_PAGE_SIZE, PageCursor};
pub use retry::{RetryPolicy, retry_transient};

/// Maps a 404 from a by-id call onto [`ApiError::NotFound`].
pub(crate) fn map_not_found(err: ApiError, kind: &'static str, key: &str) -> ApiError {
    if err.status() == Some(404) {
        ApiError::NotFound {
            kind,
            key: key.to_string(),
        }
    } else {
        err
    }
}

pub(crate) fn decode<T: DeserializeOwned>(url: &str, body: &str) -> Result<T, ApiError> {
    serde_json::from_str(body).map_err(|err| ApiError::Decode {
        url: url.to_string(),
        message: err.to_string(),
    })
}

/// Rejects ids that would change the shape of the request path.
pub(crate) fn path_segment<'a>(kind: &'static str, id: &'a str) -> Result<&'a str, ApiError> {
    let trimmed = id.trim();
    if trimmed.is_empty() || trimmed.contains(['/', '?', '#']) {
        return Err(ApiError::Config(format!("invalid {kind} id: {id:?}")));
    }
    Ok(trimmed)
}
