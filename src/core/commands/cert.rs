use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use chrono::Utc;

use super::CommandStatus;
use crate::api::CertificateStore;
use crate::core::types::CertificateRecord;
use crate::domain::{certificate_name, normalize_domain};
use crate::issuance::{CertificateAuthority, IssuedMaterial};

pub fn list(store: &CertificateStore, json: bool, out: &mut dyn Write) -> Result<CommandStatus> {
    let certificates = store.list_all().context("failed to list certificates")?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &certificates)?;
        writeln!(out)?;
    } else {
        write_certificate_table(&certificates, out)?;
    }
    Ok(CommandStatus::Success)
}

pub fn get(store: &CertificateStore, id: &str, out: &mut dyn Write) -> Result<CommandStatus> {
    let certificate = store
        .get(id)
        .with_context(|| format!("failed to fetch certificate {id}"))?;
    serde_json::to_writer_pretty(&mut *out, &certificate)?;
    writeln!(out)?;
    Ok(CommandStatus::Success)
}

/// Issues a certificate without touching the provider and prints where the
/// material was written.
pub fn issue(
    authority: &dyn CertificateAuthority,
    domain: &str,
    out: &mut dyn Write,
) -> Result<CommandStatus> {
    let issued = authority
        .issue(domain)
        .with_context(|| format!("failed to issue a certificate for {domain}"))?;
    writeln!(out, "{}", issued.lineage.display())?;
    writeln!(out, "  key:   {}", issued.private_key.display())?;
    writeln!(out, "  leaf:  {}", issued.leaf.display())?;
    writeln!(out, "  chain: {}", issued.chain.display())?;
    Ok(CommandStatus::Success)
}

/// Uploads previously issued material from a lineage directory.
///
/// # Arguments
/// * `store` - Certificate store to upload into
/// * `domain` - Domain the material was issued for; used to name the upload
/// * `lineage` - Directory holding `privkey.pem`, `cert.pem` and `chain.pem`
pub fn upload(
    store: &CertificateStore,
    domain: &str,
    lineage: &Path,
    out: &mut dyn Write,
) -> Result<CommandStatus> {
    let domain = normalize_domain(domain)?;
    let issued = IssuedMaterial::from_lineage(&domain, lineage)?;
    let material = issued
        .read()
        .with_context(|| format!("failed to read material from {}", lineage.display()))?;
    let name = certificate_name(&domain, &material.leaf)?;
    let record = store
        .upload(&name, &material)
        .with_context(|| format!("failed to upload {name}"))?;
    writeln!(out, "{} {}", record.id, record.name)?;
    Ok(CommandStatus::Success)
}

pub fn delete(store: &CertificateStore, id: &str, out: &mut dyn Write) -> Result<CommandStatus> {
    store
        .delete(id)
        .with_context(|| format!("failed to delete certificate {id}"))?;
    writeln!(out, "deleted {id}")?;
    Ok(CommandStatus::Success)
}

fn write_certificate_table(certificates: &[CertificateRecord], out: &mut dyn Write) -> Result<()> {
    let now = Utc::now();
    let id_width = certificates
        .iter()
        .map(|certificate| certificate.id.len())
        .max()
        .unwrap_or(0)
        .max("ID".len());
    let name_width = certificates
        .iter()
        .map(|certificate| certificate.name.len())
        .max()
        .unwrap_or(0)
        .max("NAME".len());

    writeln!(out, "{:<id_width$}  {:<name_width$}  NOT AFTER             DAYS", "ID", "NAME")?;
    for certificate in certificates {
        writeln!(
            out,
            "{:<id_width$}  {:<name_width$}  {}  {}",
            certificate.id,
            certificate.name,
            certificate.not_after.format("%Y-%m-%dT%H:%M:%SZ"),
            (certificate.not_after - now).num_days(),
        )?;
    }
    Ok(())
}
