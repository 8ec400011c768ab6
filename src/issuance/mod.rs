//! Certificate issuance through an external ACME client.

mod authority;
mod certbot;
mod plugins;

pub use authority::{
    CHAIN_FILE, CertificateAuthority, IssuanceError, IssuedMaterial, LEAF_FILE, PRIVATE_KEY_FILE,
};
pub use certbot::{CAPTURE_ENV, CertbotAuthority};
pub use plugins::DnsPlugin;
