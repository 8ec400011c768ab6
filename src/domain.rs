use anyhow::{Result, anyhow};
use sha2::{Digest, Sha256};

const FINGERPRINT_HEX_LEN: usize = 16;

/// Lowercase ASCII (punycode) form of a hostname, wildcard prefix preserved.
pub fn normalize_domain(input: &str) -> Result<String> {
    let trimmed = input.trim();
    let (wildcard, host) = match trimmed.strip_prefix("*.") {
        Some(rest) => (true, rest),
        None => (false, trimmed),
    };
    let host = host.trim_end_matches('.');
    if host.is_empty() {
        return Err(anyhow!("domain name is required"));
    }
    if host.contains('*') {
        return Err(anyhow!("wildcard is only allowed as the leftmost label: {input}"));
    }
    let ascii =
        idna::domain_to_ascii(host).map_err(|err| anyhow!("invalid domain name: {err}"))?;
    let ascii = ascii.to_lowercase();
    Ok(if wildcard { format!("*.{ascii}") } else { ascii })
}

/// Short SHA-256 digest of the leaf certificate bytes.
pub fn leaf_fingerprint(leaf_pem: &str) -> String {
    let digest = Sha256::digest(leaf_pem.as_bytes());
    let mut fingerprint = hex::encode(digest);
    fingerprint.truncate(FINGERPRINT_HEX_LEN);
    fingerprint
}

/// Domain part of a certificate name, e.g. `wildcard-example-com`.
pub fn certificate_slug(domain: &str) -> Result<String> {
    let normalized = normalize_domain(domain)?;
    Ok(match normalized.strip_prefix("*.") {
        Some(rest) => format!("wildcard-{}", rest.replace('.', "-")),
        None => normalized.replace('.', "-"),
    })
}

pub fn slugged_name(slug: &str, leaf_pem: &str) -> String {
    format!("{}-{}", slug, leaf_fingerprint(leaf_pem))
}

/// Store label for an uploaded certificate: `<domain-slug>-<fingerprint>`,
/// e.g. `example-com-3f5a0c2e9b1d4478`.
pub fn certificate_name(domain: &str, leaf_pem: &str) -> Result<String> {
    Ok(slugged_name(&certificate_slug(domain)?, leaf_pem))
}
