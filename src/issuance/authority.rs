use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use zeroize::Zeroizing;

use crate::core::types::CertificateMaterial;

pub const PRIVATE_KEY_FILE: &str = "privkey.pem";
pub const LEAF_FILE: &str = "cert.pem";
pub const CHAIN_FILE: &str = "chain.pem";

#[derive(Error, Debug)]
pub enum IssuanceError {
    #[error("issuance configuration error: {0}")]
    Config(String),
    #[error("failed to prepare issuance workspace: {0}")]
    Workspace(#[source] io::Error),
    #[error("failed to launch {binary}: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: io::Error,
    },
    #[error("certificate authority client failed ({})", describe_exit(.code))]
    ClientFailed { code: Option<i32> },
    #[error("issued material missing: {0}")]
    MissingOutput(String),
}

fn describe_exit(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit status {code}"),
        None => "terminated by signal".to_string(),
    }
}

/// Location of freshly issued key, leaf and chain for one domain. The files
/// belong to the authority client's working area; callers only read them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedMaterial {
    pub domain: String,
    pub lineage: PathBuf,
    pub private_key: PathBuf,
    pub leaf: PathBuf,
    pub chain: PathBuf,
}

impl IssuedMaterial {
    /// Resolves the material files inside a lineage directory; every file
    /// must already exist.
    pub fn from_lineage(domain: &str, lineage: &Path) -> Result<Self, IssuanceError> {
        let material = Self {
            domain: domain.to_string(),
            lineage: lineage.to_path_buf(),
            private_key: lineage.join(PRIVATE_KEY_FILE),
            leaf: lineage.join(LEAF_FILE),
            chain: lineage.join(CHAIN_FILE),
        };
        for path in [&material.private_key, &material.leaf, &material.chain] {
            if !path.is_file() {
                return Err(IssuanceError::MissingOutput(format!(
                    "{} does not exist",
                    path.display()
                )));
            }
        }
        Ok(material)
    }

    pub fn read(&self) -> io::Result<CertificateMaterial> {
        Ok(CertificateMaterial {
            private_key: Zeroizing::new(fs::read_to_string(&self.private_key)?),
            leaf: fs::read_to_string(&self.leaf)?,
            chain: fs::read_to_string(&self.chain)?,
        })
    }
}

/// Obtains a certificate for a domain through a DNS-01 challenge.
pub trait CertificateAuthority: Send + Sync {
    fn issue(&self, domain: &str) -> Result<IssuedMaterial, IssuanceError>;
}
