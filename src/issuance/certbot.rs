//! certbot-backed certificate authority.
//!
//! Each `issue` call owns a scratch directory holding the DNS credentials
//! file, a generated deploy hook and the file the hook reports the lineage
//! path into. The directory is removed when the call returns, whatever the
//! outcome.

use std::ffi::OsString;
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

#[cfg(unix)]
use std::os::unix::fs::{OpenOptionsExt, PermissionsExt};

use log::{debug, info, warn};
use tempfile::TempDir;
use zeroize::Zeroizing;

use super::authority::{CertificateAuthority, IssuanceError, IssuedMaterial};
use super::plugins::DnsPlugin;
use crate::config::AuthorityConfig;
use crate::domain::normalize_domain;

/// Environment variable naming the file the deploy hook writes to.
pub const CAPTURE_ENV: &str = "CDN_RENEW_CAPTURE";

const CREDENTIALS_FILE: &str = "credentials.ini";
const HOOK_FILE: &str = "deploy-hook.sh";
const CAPTURE_FILE: &str = "lineage";

const DEPLOY_HOOK: &str = "#!/bin/sh\nprintf '%s' \"$RENEWED_LINEAGE\" > \"$CDN_RENEW_CAPTURE\"\n";

pub struct CertbotAuthority {
    binary: PathBuf,
    plugin: DnsPlugin,
    dns_token: Zeroizing<String>,
    email: String,
    staging: bool,
    propagation_seconds: Option<u32>,
    state_dir: Option<PathBuf>,
}

impl CertbotAuthority {
    /// Validates the issuance settings; nothing is spawned or written here.
    pub fn new(config: &AuthorityConfig) -> Result<Self, IssuanceError> {
        if !config.certbot.is_file() {
            return Err(IssuanceError::Config(format!(
                "certbot binary not found: {}",
                config.certbot.display()
            )));
        }
        let email = config
            .email
            .as_deref()
            .map(str::trim)
            .filter(|email| !email.is_empty())
            .ok_or_else(|| IssuanceError::Config("contact email is required".into()))?;
        if !email.contains('@') {
            return Err(IssuanceError::Config(format!(
                "contact email looks invalid: {email}"
            )));
        }
        let dns_token = config
            .dns_token
            .clone()
            .filter(|token| !token.trim().is_empty())
            .ok_or_else(|| {
                IssuanceError::Config(format!("{} DNS token is required", config.plugin))
            })?;

        Ok(Self {
            binary: config.certbot.clone(),
            plugin: config.plugin,
            dns_token,
            email: email.to_string(),
            staging: config.staging,
            propagation_seconds: config.propagation_seconds,
            state_dir: config.state_dir.clone(),
        })
    }

    fn args(&self, domain: &str, workspace: &IssuanceWorkspace) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "certonly".into(),
            "--non-interactive".into(),
            "--agree-tos".into(),
            "--force-renewal".into(),
            "--email".into(),
            self.email.as_str().into(),
            self.plugin.authenticator_flag().into(),
            self.plugin.credentials_flag().into(),
            workspace.credentials.clone().into(),
        ];
        if let Some(seconds) = self.propagation_seconds {
            args.push(self.plugin.propagation_flag().into());
            args.push(seconds.to_string().into());
        }
        args.extend([
            "-d".into(),
            domain.into(),
            "--cert-name".into(),
            domain.into(),
            "--deploy-hook".into(),
            workspace.hook.clone().into(),
        ]);
        if self.staging {
            args.push("--test-cert".into());
        }
        if let Some(dir) = &self.state_dir {
            args.push("--config-dir".into());
            args.push(dir.clone().into());
            args.push("--work-dir".into());
            args.push(dir.join("work").into());
            args.push("--logs-dir".into());
            args.push(dir.join("logs").into());
        }
        args
    }
}

impl CertificateAuthority for CertbotAuthority {
    fn issue(&self, domain: &str) -> Result<IssuedMaterial, IssuanceError> {
        let domain = normalize_domain(domain).map_err(|err| IssuanceError::Config(err.to_string()))?;
        let workspace = IssuanceWorkspace::create(self.plugin, &self.dns_token)
            .map_err(IssuanceError::Workspace)?;

        info!(
            "[certbot] issuing {} via dns-{}{}",
            domain,
            self.plugin,
            if self.staging { " (staging)" } else { "" }
        );
        let output = Command::new(&self.binary)
            .args(self.args(&domain, &workspace))
            .env(CAPTURE_ENV, &workspace.capture)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| IssuanceError::Spawn {
                binary: self.binary.display().to_string(),
                source,
            })?;
        debug!(
            "[certbot] stdout: {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );

        if !output.status.success() {
            warn!(
                "[certbot] issuance for {} failed: {}",
                domain,
                String::from_utf8_lossy(&output.stderr).trim()
            );
            return Err(IssuanceError::ClientFailed {
                code: output.status.code(),
            });
        }

        let lineage = workspace.captured_lineage()?;
        let issued = IssuedMaterial::from_lineage(&domain, &lineage)?;
        info!("[certbot] issued {} into {}", domain, lineage.display());
        Ok(issued)
    }
}

/// Scratch directory for one issuance attempt.
struct IssuanceWorkspace {
    _dir: TempDir,
    credentials: PathBuf,
    hook: PathBuf,
    capture: PathBuf,
}

impl IssuanceWorkspace {
    fn create(plugin: DnsPlugin, token: &str) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix("cdn-renew-").tempdir()?;
        let credentials = dir.path().join(CREDENTIALS_FILE);
        let hook = dir.path().join(HOOK_FILE);
        let capture = dir.path().join(CAPTURE_FILE);

        write_private_file(&credentials, plugin.credentials_file(token).as_bytes(), 0o600)?;
        write_private_file(&hook, DEPLOY_HOOK.as_bytes(), 0o700)?;

        Ok(Self {
            _dir: dir,
            credentials,
            hook,
            capture,
        })
    }

    fn captured_lineage(&self) -> Result<PathBuf, IssuanceError> {
        let raw = match fs::read_to_string(&self.capture) {
            Ok(raw) => raw,
            Err(err) if err.kind() == io::ErrorKind::NotFound => {
                return Err(IssuanceError::MissingOutput(
                    "deploy hook did not run".into(),
                ));
            }
            Err(err) => return Err(IssuanceError::Workspace(err)),
        };
        let lineage = raw.trim();
        if lineage.is_empty() {
            return Err(IssuanceError::MissingOutput(
                "deploy hook reported an empty lineage".into(),
            ));
        }
        Ok(PathBuf::from(lineage))
    }
}

fn write_private_file(path: &Path, content: &[u8], mode: u32) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create_new(true);
    #[cfg(unix)]
    {
        options.mode(mode);
    }
    let mut file = options.open(path)?;
    file.write_all(content)?;
    file.flush()?;
    drop(file);

    #[cfg(unix)]
    {
        let current = fs::metadata(path)?.permissions().mode() & 0o777;
        if current != mode {
            fs::set_permissions(path, fs::Permissions::from_mode(mode))?;
        }
    }
    #[cfg(not(unix))]
    let _ = mode;
    Ok(())
}
