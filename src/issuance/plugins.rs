use std::fmt;

use clap::ValueEnum;
use zeroize::Zeroizing;

/// DNS-01 plugins the certbot adapter knows how to drive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DnsPlugin {
    #[value(name = "cloudflare")]
    Cloudflare,
    #[value(name = "digitalocean")]
    DigitalOcean,
}

impl DnsPlugin {
    pub fn as_str(self) -> &'static str {
        match self {
            DnsPlugin::Cloudflare => "cloudflare",
            DnsPlugin::DigitalOcean => "digitalocean",
        }
    }

    fn flag_prefix(self) -> String {
        format!("--dns-{}", self.as_str())
    }

    /// Selects the plugin as certbot's authenticator.
    pub fn authenticator_flag(self) -> String {
        self.flag_prefix()
    }

    pub fn credentials_flag(self) -> String {
        format!("{}-credentials", self.flag_prefix())
    }

    pub fn propagation_flag(self) -> String {
        format!("{}-propagation-seconds", self.flag_prefix())
    }

    /// INI body of the plugin's credentials file.
    pub fn credentials_file(self, token: &str) -> Zeroizing<String> {
        let key = match self {
            DnsPlugin::Cloudflare => "dns_cloudflare_api_token",
            DnsPlugin::DigitalOcean => "dns_digitalocean_token",
        };
        Zeroizing::new(format!("{key} = {token}\n"))
    }
}

impl fmt::Display for DnsPlugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
