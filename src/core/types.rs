use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zeroize::Zeroizing;

/// A CDN endpoint as served by the provider. Endpoints are created and
/// destroyed elsewhere; this tool only reads and rebinds them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CdnEndpoint {
    /// Provider-assigned identifier, immutable once created
    pub id: String,
    #[serde(default)]
    pub origin: Option<String>,
    /// Provider hostname serving the endpoint
    #[serde(default, rename = "endpoint")]
    pub hostname: Option<String>,
    #[serde(default)]
    pub custom_domain: Option<String>,
    /// Currently bound certificate; reassigned by a rebind
    #[serde(default)]
    pub certificate_id: Option<String>,
    #[serde(default)]
    pub ttl: Option<u32>,
}

impl CdnEndpoint {
    /// Custom domain, treating the provider's empty string as unset.
    pub fn custom_domain(&self) -> Option<&str> {
        self.custom_domain.as_deref().filter(|domain| !domain.is_empty())
    }

    pub fn bound_certificate(&self) -> Option<&str> {
        self.certificate_id.as_deref().filter(|id| !id.is_empty())
    }
}

/// A certificate record held by the certificate store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CertificateRecord {
    /// Identifier assigned by the store on upload
    pub id: String,
    /// Human-readable label, `<domain-slug>-<fingerprint>` for uploads made here
    pub name: String,
    /// Expiry instant (UTC)
    pub not_after: DateTime<Utc>,
    #[serde(default)]
    pub sha1_fingerprint: Option<String>,
    #[serde(default)]
    pub dns_names: Option<Vec<String>>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

/// PEM material handed through to the store unmodified.
pub struct CertificateMaterial {
    pub private_key: Zeroizing<String>,
    pub leaf: String,
    pub chain: String,
}

impl fmt::Debug for CertificateMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CertificateMaterial")
            .field("private_key", &"<redacted>")
            .field("leaf_len", &self.leaf.len())
            .field("chain_len", &self.chain.len())
            .finish()
    }
}
