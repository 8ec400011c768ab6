use std::sync::Arc;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use super::{ApiError, Method, PageCursor, Transport, decode, map_not_found, path_segment};
use crate::config::ApiConfig;
use crate::core::types::CdnEndpoint;

#[derive(Deserialize)]
struct EndpointEnvelope {
    endpoint: CdnEndpoint,
}

#[derive(Serialize)]
struct RebindRequest<'a> {
    certificate_id: &'a str,
}

/// Read access to the provider's CDN endpoints plus the single mutation this
/// tool performs on them: pointing an endpoint at another certificate.
pub struct CdnDirectory {
    transport: Arc<dyn Transport>,
    endpoints_url: String,
    page_size: u32,
}

impl CdnDirectory {
    pub fn new(transport: Arc<dyn Transport>, config: &ApiConfig) -> Self {
        Self {
            transport,
            endpoints_url: format!("{}/cdn/endpoints", config.base_url.trim_end_matches('/')),
            page_size: config.page_size,
        }
    }

    /// Endpoints in listing order.
    pub fn endpoints(&self) -> PageCursor<'_, CdnEndpoint> {
        PageCursor::new(
            self.transport.as_ref(),
            self.endpoints_url.clone(),
            "endpoints",
            self.page_size,
        )
    }

    pub fn list_all(&self) -> Result<Vec<CdnEndpoint>, ApiError> {
        self.endpoints().collect()
    }

    /// Id of the first endpoint, in listing order, whose custom domain is
    /// exactly `domain`.
    pub fn find_by_domain(&self, domain: &str) -> Result<String, ApiError> {
        for endpoint in self.endpoints() {
            let endpoint = endpoint?;
            if endpoint.custom_domain() == Some(domain) {
                debug!("[cdn] {} resolved to endpoint {}", domain, endpoint.id);
                return Ok(endpoint.id);
            }
        }
        Err(ApiError::NotFound {
            kind: "CDN endpoint for domain",
            key: domain.to_string(),
        })
    }

    pub fn find_by_id(&self, id: &str) -> Result<CdnEndpoint, ApiError> {
        let id = path_segment("endpoint", id)?;
        let url = format!("{}/{}", self.endpoints_url, id);
        let body = self
            .transport
            .request(Method::Get, &url, None)
            .map_err(|err| map_not_found(err, "CDN endpoint", id))?;
        let envelope: EndpointEnvelope = decode(&url, &body)?;
        Ok(envelope.endpoint)
    }

    /// Points the endpoint at `certificate_id` and returns the updated endpoint.
    pub fn rebind(&self, id: &str, certificate_id: &str) -> Result<CdnEndpoint, ApiError> {
        let id = path_segment("endpoint", id)?;
        let url = format!("{}/{}", self.endpoints_url, id);
        let payload = serde_json::to_vec(&RebindRequest { certificate_id }).map_err(|err| {
            ApiError::Decode {
                url: url.clone(),
                message: err.to_string(),
            }
        })?;
        let body = self
            .transport
            .request(Method::Put, &url, Some(&payload))
            .map_err(|err| map_not_found(err, "CDN endpoint", id))?;
        let envelope: EndpointEnvelope = decode(&url, &body)?;
        info!(
            "[cdn] endpoint {} now bound to certificate {}",
            envelope.endpoint.id, certificate_id
        );
        Ok(envelope.endpoint)
    }
}
