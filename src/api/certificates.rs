use std::sync::Arc;

use log::info;
use serde::{Deserialize, Serialize};

use super::{ApiError, Method, PageCursor, Transport, decode, map_not_found, path_segment};
use crate::config::ApiConfig;
use crate::core::types::{CertificateMaterial, CertificateRecord};

const CUSTOM_CERTIFICATE_TYPE: &str = "custom";

#[derive(Deserialize)]
struct CertificateEnvelope {
    certificate: CertificateRecord,
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'a str,
    private_key: &'a str,
    leaf_certificate: &'a str,
    certificate_chain: &'a str,
}

/// Builds the single-line JSON upload body.
///
/// JSON string encoding escapes every embedded newline as the two characters
/// `\n`; decoding the body gives back the PEM blobs byte for byte.
pub fn upload_body(name: &str, material: &CertificateMaterial) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(&UploadRequest {
        name,
        kind: CUSTOM_CERTIFICATE_TYPE,
        private_key: material.private_key.as_str(),
        leaf_certificate: &material.leaf,
        certificate_chain: &material.chain,
    })
}

/// Certificate records held by the provider. The provider is the only source
/// of truth; nothing is cached between calls.
pub struct CertificateStore {
    transport: Arc<dyn Transport>,
    certificates_url: String,
    page_size: u32,
}

impl CertificateStore {
    pub fn new(transport: Arc<dyn Transport>, config: &ApiConfig) -> Self {
        Self {
            transport,
            certificates_url: format!("{}/certificates", config.base_url.trim_end_matches('/')),
            page_size: config.page_size,
        }
    }

    pub fn certificates(&self) -> PageCursor<'_, CertificateRecord> {
        PageCursor::new(
            self.transport.as_ref(),
            self.certificates_url.clone(),
            "certificates",
            self.page_size,
        )
    }

    pub fn list_all(&self) -> Result<Vec<CertificateRecord>, ApiError> {
        self.certificates().collect()
    }

    pub fn get(&self, id: &str) -> Result<CertificateRecord, ApiError> {
        let id = path_segment("certificate", id)?;
        let url = format!("{}/{}", self.certificates_url, id);
        let body = self
            .transport
            .request(Method::Get, &url, None)
            .map_err(|err| map_not_found(err, "certificate", id))?;
        let envelope: CertificateEnvelope = decode(&url, &body)?;
        Ok(envelope.certificate)
    }

    /// Uploads custom certificate material and returns the stored record,
    /// including its newly assigned id.
    pub fn upload(&self, name: &str, material: &CertificateMaterial) -> Result<CertificateRecord, ApiError> {
        let payload = upload_body(name, material).map_err(|err| ApiError::Decode {
            url: self.certificates_url.clone(),
            message: err.to_string(),
        })?;
        let body = self
            .transport
            .request(Method::Post, &self.certificates_url, Some(&payload))?;
        let envelope: CertificateEnvelope = decode(&self.certificates_url, &body)?;
        info!(
            "[certs] uploaded {} as certificate {}",
            envelope.certificate.name, envelope.certificate.id
        );
        Ok(envelope.certificate)
    }

    /// Deletes a certificate. A missing id is reported as
    /// [`ApiError::NotFound`], never as success.
    pub fn delete(&self, id: &str) -> Result<(), ApiError> {
        let id = path_segment("certificate", id)?;
        let url = format!("{}/{}", self.certificates_url, id);
        self.transport
            .request(Method::Delete, &url, None)
            .map_err(|err| map_not_found(err, "certificate", id))?;
        info!("[certs] deleted certificate {}", id);
        Ok(())
    }
}
