use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::api::{CdnDirectory, CertificateStore, HttpTransport, Transport};
use crate::config::{ApiConfig, AuthorityConfig, RenewerConfig};
use crate::issuance::CertbotAuthority;
use crate::renewal::{BatchPolicy, Interrupt, Renewer};

pub mod cdn;
pub mod cert;
pub mod renew;

/// Every operation reachable from the command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    CdnList { json: bool },
    CdnGet { id: String },
    CdnUpdate { endpoint_id: String, certificate_id: String },
    CertList { json: bool },
    CertGet { id: String },
    CertIssue { domain: String },
    CertUpload { domain: String, lineage: PathBuf },
    CertDelete { id: String },
    RenewId { endpoint_id: String },
    RenewDomain { domain: String },
    RenewAll { policy: BatchPolicy },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    Success,
    /// The command ran but reported failures (e.g. part of a batch).
    Failed,
    Interrupted,
}

impl CommandStatus {
    pub fn exit_code(self) -> u8 {
        match self {
            CommandStatus::Success => 0,
            CommandStatus::Failed => 1,
            CommandStatus::Interrupted => 130,
        }
    }
}

/// Runs one command against the configured provider.
///
/// Clients are built per command so that a command only demands the
/// settings it actually uses. Missing settings fail here, before any
/// request is sent or process spawned.
///
/// # Arguments
/// * `command` - The parsed command
/// * `config` - Settings resolved at startup
/// * `interrupt` - Flag raised by SIGINT/SIGTERM
/// * `out` - Destination for command output
pub fn execute(
    command: Command,
    config: &RenewerConfig,
    interrupt: &Interrupt,
    out: &mut dyn Write,
) -> Result<CommandStatus> {
    match command {
        Command::CdnList { json } => cdn::list(&directory(&config.api)?, json, out),
        Command::CdnGet { id } => cdn::get(&directory(&config.api)?, &id, out),
        Command::CdnUpdate {
            endpoint_id,
            certificate_id,
        } => cdn::update(&directory(&config.api)?, &endpoint_id, &certificate_id, out),
        Command::CertList { json } => cert::list(&store(&config.api)?, json, out),
        Command::CertGet { id } => cert::get(&store(&config.api)?, &id, out),
        Command::CertIssue { domain } => cert::issue(&authority(&config.authority)?, &domain, out),
        Command::CertUpload { domain, lineage } => {
            cert::upload(&store(&config.api)?, &domain, &lineage, out)
        }
        Command::CertDelete { id } => cert::delete(&store(&config.api)?, &id, out),
        Command::RenewId { endpoint_id } => {
            let services = Services::connect(config)?;
            renew::by_id(&services.renewer(interrupt), &endpoint_id, out)
        }
        Command::RenewDomain { domain } => {
            let services = Services::connect(config)?;
            renew::by_domain(&services.renewer(interrupt), &domain, out)
        }
        Command::RenewAll { policy } => {
            let services = Services::connect(config)?;
            renew::all(&services.renewer(interrupt), policy, out)
        }
    }
}

fn transport(config: &ApiConfig) -> Result<Arc<dyn Transport>> {
    let transport = HttpTransport::from_config(config).context("failed to set up API client")?;
    Ok(Arc::new(transport))
}

fn directory(config: &ApiConfig) -> Result<CdnDirectory> {
    Ok(CdnDirectory::new(transport(config)?, config))
}

fn store(config: &ApiConfig) -> Result<CertificateStore> {
    Ok(CertificateStore::new(transport(config)?, config))
}

fn authority(config: &AuthorityConfig) -> Result<CertbotAuthority> {
    CertbotAuthority::new(config).context("failed to set up certbot")
}

/// Everything a renewal touches, sharing one HTTP transport.
struct Services {
    directory: CdnDirectory,
    store: CertificateStore,
    authority: CertbotAuthority,
}

impl Services {
    fn connect(config: &RenewerConfig) -> Result<Self> {
        let transport = transport(&config.api)?;
        let authority = authority(&config.authority)?;
        Ok(Self {
            directory: CdnDirectory::new(Arc::clone(&transport), &config.api),
            store: CertificateStore::new(transport, &config.api),
            authority,
        })
    }

    fn renewer(&self, interrupt: &Interrupt) -> Renewer<'_> {
        Renewer::new(&self.directory, &self.store, &self.authority)
            .with_interrupt(interrupt.clone())
    }
}
