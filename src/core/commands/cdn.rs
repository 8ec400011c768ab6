use std::io::Write;

use anyhow::{Context, Result};

use super::CommandStatus;
use crate::api::CdnDirectory;
use crate::core::types::CdnEndpoint;

/// Prints every CDN endpoint, as a table or as a JSON array.
pub fn list(directory: &CdnDirectory, json: bool, out: &mut dyn Write) -> Result<CommandStatus> {
    let endpoints = directory
        .list_all()
        .context("failed to list CDN endpoints")?;
    if json {
        serde_json::to_writer_pretty(&mut *out, &endpoints)?;
        writeln!(out)?;
    } else {
        write_endpoint_table(&endpoints, out)?;
    }
    Ok(CommandStatus::Success)
}

pub fn get(directory: &CdnDirectory, id: &str, out: &mut dyn Write) -> Result<CommandStatus> {
    let endpoint = directory
        .find_by_id(id)
        .with_context(|| format!("failed to fetch CDN endpoint {id}"))?;
    serde_json::to_writer_pretty(&mut *out, &endpoint)?;
    writeln!(out)?;
    Ok(CommandStatus::Success)
}

/// Binds an endpoint to an existing certificate. The previously bound
/// certificate is left in the store.
pub fn update(
    directory: &CdnDirectory,
    endpoint_id: &str,
    certificate_id: &str,
    out: &mut dyn Write,
) -> Result<CommandStatus> {
    let endpoint = directory
        .rebind(endpoint_id, certificate_id)
        .with_context(|| format!("failed to bind {endpoint_id} to {certificate_id}"))?;
    writeln!(
        out,
        "{} -> {}",
        endpoint.id,
        endpoint.bound_certificate().unwrap_or(certificate_id)
    )?;
    Ok(CommandStatus::Success)
}

pub(crate) fn write_endpoint_table(endpoints: &[CdnEndpoint], out: &mut dyn Write) -> Result<()> {
    let id_width = endpoints
        .iter()
        .map(|endpoint| endpoint.id.len())
        .max()
        .unwrap_or(0)
        .max("ID".len());
    let domain_width = endpoints
        .iter()
        .map(|endpoint| endpoint.custom_domain().unwrap_or("-").len())
        .max()
        .unwrap_or(0)
        .max("DOMAIN".len());

    writeln!(out, "{:<id_width$}  {:<domain_width$}  CERTIFICATE", "ID", "DOMAIN")?;
    for endpoint in endpoints {
        writeln!(
            out,
            "{:<id_width$}  {:<domain_width$}  {}",
            endpoint.id,
            endpoint.custom_domain().unwrap_or("-"),
            endpoint.bound_certificate().unwrap_or("-"),
        )?;
    }
    Ok(())
}
