//! Runtime configuration.
//!
//! Built once at startup from command line flags (with environment fallbacks
//! resolved by the CLI layer) and handed to each component constructor.
//! Components never consult the process environment themselves.

use std::ffi::OsStr;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use log::warn;
use zeroize::Zeroizing;

use crate::api::{DEFAULT_PAGE_SIZE, RetryPolicy};
use crate::issuance::DnsPlugin;

pub const DEFAULT_API_URL: &str = "https://api.digitalocean.com/v2";
const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub token: Option<Zeroizing<String>>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
    pub page_size: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_API_URL.to_string(),
            token: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            retry: RetryPolicy::default(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

impl fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiConfig")
            .field("base_url", &self.base_url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("page_size", &self.page_size)
            .finish()
    }
}

#[derive(Clone)]
pub struct AuthorityConfig {
    /// certbot executable, already resolved against `PATH`
    pub certbot: PathBuf,
    pub plugin: DnsPlugin,
    pub dns_token: Option<Zeroizing<String>>,
    pub email: Option<String>,
    /// Issue from the staging directory (untrusted test certificates)
    pub staging: bool,
    pub propagation_seconds: Option<u32>,
    /// Root for certbot's config/work/logs directories; certbot's own
    /// defaults apply when unset
    pub state_dir: Option<PathBuf>,
}

impl Default for AuthorityConfig {
    fn default() -> Self {
        Self {
            certbot: PathBuf::from("certbot"),
            plugin: DnsPlugin::DigitalOcean,
            dns_token: None,
            email: None,
            staging: false,
            propagation_seconds: None,
            state_dir: None,
        }
    }
}

impl fmt::Debug for AuthorityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorityConfig")
            .field("certbot", &self.certbot)
            .field("plugin", &self.plugin)
            .field("dns_token", &self.dns_token.as_ref().map(|_| "<redacted>"))
            .field("email", &self.email)
            .field("staging", &self.staging)
            .field("propagation_seconds", &self.propagation_seconds)
            .field("state_dir", &self.state_dir)
            .finish()
    }
}

#[derive(Debug, Clone, Default)]
pub struct RenewerConfig {
    pub api: ApiConfig,
    pub authority: AuthorityConfig,
}

/// Per-request timeout; zero is rejected in favour of the default.
pub fn resolve_timeout(secs: Option<u64>) -> Duration {
    match secs {
        Some(0) => {
            warn!("[config] invalid HTTP timeout 0; using default");
            Duration::from_secs(DEFAULT_TIMEOUT_SECS)
        }
        Some(secs) => Duration::from_secs(secs),
        None => Duration::from_secs(DEFAULT_TIMEOUT_SECS),
    }
}

/// Retry budget for idempotent requests; zero attempts still sends once.
pub fn resolve_retry(attempts: Option<u32>) -> RetryPolicy {
    match attempts {
        Some(attempts) => RetryPolicy::new(attempts, RetryPolicy::default().initial_delay),
        None => RetryPolicy::default(),
    }
}

/// Treats blank secrets as absent.
pub fn secret(value: Option<String>) -> Option<Zeroizing<String>> {
    value
        .map(Zeroizing::new)
        .filter(|value| !value.trim().is_empty())
}

/// Resolves an executable name against a `PATH`-style search list. Names with
/// a directory component are only checked for existence.
pub fn resolve_binary(name: &Path, search_path: Option<&OsStr>) -> Option<PathBuf> {
    if name.components().count() > 1 {
        return name.is_file().then(|| name.to_path_buf());
    }
    let search_path = search_path?;
    std::env::split_paths(search_path)
        .map(|dir| dir.join(name))
        .find(|candidate| candidate.is_file())
}
