use std::env;
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{ArgAction, Args, Parser, Subcommand};
use log::{error, warn};

use cdn_cert_renewer::config::{
    ApiConfig, AuthorityConfig, DEFAULT_API_URL, RenewerConfig, resolve_binary, resolve_retry,
    resolve_timeout, secret,
};
use cdn_cert_renewer::core::commands::{self, Command, CommandStatus};
use cdn_cert_renewer::issuance::DnsPlugin;
use cdn_cert_renewer::renewal::{BatchPolicy, Interrupt};

/// Renews TLS certificates bound to CDN endpoints.
#[derive(Parser)]
#[command(name = "cdn-cert-renewer", version, about, long_about = None)]
struct Cli {
    #[command(flatten)]
    api: ApiArgs,

    #[command(flatten)]
    authority: AuthorityArgs,

    /// More logging (-v debug, -vv trace); RUST_LOG takes precedence
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    group: Group,
}

#[derive(Args)]
struct ApiArgs {
    /// Bearer token for the provider API
    #[arg(long, env = "DIGITALOCEAN_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    #[arg(long, env = "CDN_RENEW_API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Per-request timeout in seconds
    #[arg(long, env = "CDN_RENEW_HTTP_TIMEOUT_SECS")]
    http_timeout: Option<u64>,

    /// Attempts for GET/PUT requests that fail at the transport level
    #[arg(long, env = "CDN_RENEW_HTTP_RETRIES")]
    http_retries: Option<u32>,

    #[arg(long, default_value_t = 50)]
    page_size: u32,
}

#[derive(Args)]
struct AuthorityArgs {
    /// API token for the DNS plugin
    #[arg(long, env = "CDN_RENEW_DNS_TOKEN", hide_env_values = true)]
    dns_token: Option<String>,

    #[arg(long, value_enum, env = "CDN_RENEW_DNS_PLUGIN", default_value_t = DnsPlugin::DigitalOcean)]
    dns_plugin: DnsPlugin,

    /// Contact email registered with the certificate authority
    #[arg(long, env = "CDN_RENEW_EMAIL")]
    email: Option<String>,

    /// Issue untrusted certificates from the staging environment
    #[arg(long, env = "CDN_RENEW_STAGING")]
    staging: bool,

    #[arg(long, env = "CDN_RENEW_CERTBOT", default_value = "certbot")]
    certbot: PathBuf,

    /// Directory for certbot's config, work and logs
    #[arg(long, env = "CDN_RENEW_CERTBOT_DIR")]
    certbot_dir: Option<PathBuf>,

    /// Seconds to wait for DNS propagation (plugin default when unset)
    #[arg(long)]
    propagation_seconds: Option<u32>,
}

#[derive(Subcommand)]
enum Group {
    /// Inspect and rebind CDN endpoints
    Cdn {
        #[command(subcommand)]
        command: CdnCommand,
    },
    /// Manage certificates in the provider's store
    Cert {
        #[command(subcommand)]
        command: CertCommand,
    },
    /// Renew certificates that expire within 30 days
    Renew {
        #[command(subcommand)]
        command: RenewCommand,
    },
}

#[derive(Subcommand)]
enum CdnCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Get {
        id: String,
    },
    /// Bind an endpoint to an existing certificate
    Update {
        endpoint_id: String,
        certificate_id: String,
    },
}

#[derive(Subcommand)]
enum CertCommand {
    List {
        #[arg(long)]
        json: bool,
    },
    Get {
        id: String,
    },
    /// Issue a certificate via DNS-01 without uploading it
    Issue {
        domain: String,
    },
    /// Upload privkey.pem, cert.pem and chain.pem from a lineage directory
    Upload {
        domain: String,
        lineage: PathBuf,
    },
    Delete {
        id: String,
    },
}

#[derive(Subcommand)]
enum RenewCommand {
    /// Renew one endpoint by id
    Id { endpoint_id: String },
    /// Renew the endpoint serving a custom domain
    Domain { domain: String },
    /// Renew every endpoint in listing order
    All {
        /// Keep going after an endpoint fails
        #[arg(long)]
        continue_on_error: bool,
    },
}

impl Group {
    fn into_command(self) -> Command {
        match self {
            Group::Cdn { command } => match command {
                CdnCommand::List { json } => Command::CdnList { json },
                CdnCommand::Get { id } => Command::CdnGet { id },
                CdnCommand::Update {
                    endpoint_id,
                    certificate_id,
                } => Command::CdnUpdate {
                    endpoint_id,
                    certificate_id,
                },
            },
            Group::Cert { command } => match command {
                CertCommand::List { json } => Command::CertList { json },
                CertCommand::Get { id } => Command::CertGet { id },
                CertCommand::Issue { domain } => Command::CertIssue { domain },
                CertCommand::Upload { domain, lineage } => Command::CertUpload { domain, lineage },
                CertCommand::Delete { id } => Command::CertDelete { id },
            },
            Group::Renew { command } => match command {
                RenewCommand::Id { endpoint_id } => Command::RenewId { endpoint_id },
                RenewCommand::Domain { domain } => Command::RenewDomain { domain },
                RenewCommand::All { continue_on_error } => Command::RenewAll {
                    policy: if continue_on_error {
                        BatchPolicy::ContinueOnFailure
                    } else {
                        BatchPolicy::HaltOnFailure
                    },
                },
            },
        }
    }
}

impl Cli {
    fn config(&self) -> RenewerConfig {
        let path = env::var_os("PATH");
        let certbot = resolve_binary(&self.authority.certbot, path.as_deref())
            .unwrap_or_else(|| self.authority.certbot.clone());

        RenewerConfig {
            api: ApiConfig {
                base_url: self.api.api_url.clone(),
                token: secret(self.api.api_token.clone()),
                timeout: resolve_timeout(self.api.http_timeout),
                retry: resolve_retry(self.api.http_retries),
                page_size: self.api.page_size.max(1),
            },
            authority: AuthorityConfig {
                certbot,
                plugin: self.authority.dns_plugin,
                dns_token: secret(self.authority.dns_token.clone()),
                email: self.authority.email.clone(),
                staging: self.authority.staging,
                propagation_seconds: self.authority.propagation_seconds,
                state_dir: self.authority.certbot_dir.clone(),
            },
        }
    }
}

fn init_logging(verbose: u8) {
    let default_filter = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_secs()
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = cli.config();
    let interrupt = Interrupt::new();
    if let Err(err) = interrupt.register_signals() {
        warn!("[signals] failed to install SIGINT/SIGTERM handlers: {err}");
    }

    let command = cli.group.into_command();
    let stdout = io::stdout();
    let mut out = stdout.lock();
    match commands::execute(command, &config, &interrupt, &mut out) {
        Ok(status) => ExitCode::from(status.exit_code()),
        Err(err) => {
            error!("{err:#}");
            if interrupt.is_set() {
                ExitCode::from(CommandStatus::Interrupted.exit_code())
            } else {
                ExitCode::FAILURE
            }
        }
    }
}
