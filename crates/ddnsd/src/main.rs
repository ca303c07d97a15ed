// # ddnsd - DDNS Daemon
//
// Thin integration layer: reads configuration from the environment, wires
// the transport, the IP strategies and one provider into an
// `UpdateCoordinator`, validates credentials, then polls until SIGTERM/SIGINT.
//
// All resolution, decision and retry logic lives in the library crates.
//
// ## Configuration
//
// ### Provider
// - `DDNS_PROVIDER_TYPE`: dnsimple, noip or duckdns
// - `DDNS_UPDATE_INTERVAL`: Seconds between cycles (default 300, minimum 60)
//
// dnsimple:
// - `DDNS_DNSIMPLE_ACCOUNT_ID`, `DDNS_DNSIMPLE_TOKEN`, `DDNS_DNSIMPLE_ZONE`
// - `DDNS_DNSIMPLE_RECORD_NAME`: Record within the zone, `@` for the apex (default `@`)
//
// noip:
// - `DDNS_NOIP_USERNAME`, `DDNS_NOIP_PASSWORD`, `DDNS_NOIP_HOSTNAME`
//
// duckdns:
// - `DDNS_DUCKDNS_TOKEN`, `DDNS_DUCKDNS_DOMAIN`
//
// ### Transport
// - `DDNS_HTTP_RETRIES`: Attempts per request (default 3)
// - `DDNS_HTTP_TIMEOUT_SECS`: Per-attempt timeout (default 10)
// - `DDNS_HTTP_RETRY_DELAY_SECS`: Base backoff delay (default 1.0)
//
// ### Resolution
// - `DDNS_IP_ECHO_URL`: Echo endpoint (default https://api.ipify.org)
// - `DDNS_DNS_TIMEOUT_SECS`: DNS query timeout (default 10)
//
// ### Logging
// - `DDNS_LOG_LEVEL`: trace, debug, info, warn or error (default info)
//
// ## Example
//
// ```bash
// export DDNS_PROVIDER_TYPE=duckdns
// export DDNS_DUCKDNS_TOKEN=your_token
// export DDNS_DUCKDNS_DOMAIN=myhome
//
// ddnsd
// ```

use anyhow::{Context, Result};
use ddns_core::config::{
    DdnsConfig, DnsimpleConfig, DuckDnsConfig, NoIpConfig, ProviderConfig, ResolverConfig,
    TransportConfig, UpdateInterval,
};
use ddns_core::traits::{DnsProvider, HttpTransport};
use ddns_core::{IpResolver, UpdateCoordinator};
use ddns_http::ReqwestTransport;
use ddns_ip_dns::{AuthoritativeStrategy, SystemStrategy};
use ddns_ip_http::EchoStrategy;
use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, error, info};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum DdnsExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<DdnsExitCode> for ExitCode {
    fn from(code: DdnsExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Daemon configuration
struct Config {
    ddns: DdnsConfig,
    log_level: Level,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, then validate it
    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        let required = |key: &str| {
            var(key).with_context(|| format!("{} is required. Set it via: export {}=...", key, key))
        };

        let update_interval = match parse_var::<u64>(&var, "DDNS_UPDATE_INTERVAL")? {
            Some(secs) => UpdateInterval::new(secs)?,
            None => UpdateInterval::default(),
        };

        let provider_type = required("DDNS_PROVIDER_TYPE")?;
        let provider = match provider_type.to_lowercase().as_str() {
            "dnsimple" => ProviderConfig::Dnsimple(DnsimpleConfig {
                account_id: required("DDNS_DNSIMPLE_ACCOUNT_ID")?,
                token: required("DDNS_DNSIMPLE_TOKEN")?,
                zone: required("DDNS_DNSIMPLE_ZONE")?,
                record_name: var("DDNS_DNSIMPLE_RECORD_NAME").unwrap_or_else(|| "@".to_string()),
                update_interval,
            }),
            "noip" => ProviderConfig::NoIp(NoIpConfig {
                username: required("DDNS_NOIP_USERNAME")?,
                password: required("DDNS_NOIP_PASSWORD")?,
                hostname: required("DDNS_NOIP_HOSTNAME")?,
                update_interval,
            }),
            "duckdns" => ProviderConfig::DuckDns(DuckDnsConfig {
                token: required("DDNS_DUCKDNS_TOKEN")?,
                domain: required("DDNS_DUCKDNS_DOMAIN")?,
                update_interval,
            }),
            other => anyhow::bail!(
                "DDNS_PROVIDER_TYPE '{}' is not supported. \
                Supported providers: dnsimple, noip, duckdns",
                other
            ),
        };

        let transport_defaults = TransportConfig::default();
        let transport = TransportConfig {
            retries: parse_var(&var, "DDNS_HTTP_RETRIES")?.unwrap_or(transport_defaults.retries),
            timeout_secs: parse_var(&var, "DDNS_HTTP_TIMEOUT_SECS")?
                .unwrap_or(transport_defaults.timeout_secs),
            retry_delay_secs: parse_var(&var, "DDNS_HTTP_RETRY_DELAY_SECS")?
                .unwrap_or(transport_defaults.retry_delay_secs),
        };

        let resolver_defaults = ResolverConfig::default();
        let resolver = ResolverConfig {
            echo_url: var("DDNS_IP_ECHO_URL").unwrap_or(resolver_defaults.echo_url),
            query_timeout_secs: parse_var(&var, "DDNS_DNS_TIMEOUT_SECS")?
                .unwrap_or(resolver_defaults.query_timeout_secs),
            nameserver_cache_ttl_secs: resolver_defaults.nameserver_cache_ttl_secs,
        };

        let ddns = DdnsConfig {
            provider,
            transport,
            resolver,
        };
        ddns.validate()?;

        let log_level = match var("DDNS_LOG_LEVEL") {
            None => Level::INFO,
            Some(level) => Level::from_str(&level).map_err(|_| {
                anyhow::anyhow!(
                    "DDNS_LOG_LEVEL '{}' is not valid. \
                    Valid levels: trace, debug, info, warn, error",
                    level
                )
            })?,
        };

        Ok(Self { ddns, log_level })
    }
}

/// Parse an optional numeric variable, rejecting malformed values
fn parse_var<T: FromStr>(var: impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>> {
    var(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .map_err(|_| anyhow::anyhow!("{} must be a number. Got: {}", key, raw))
        })
        .transpose()
}

fn main() -> ExitCode {
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return DdnsExitCode::ConfigError.into();
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return DdnsExitCode::ConfigError.into();
    }

    info!("Starting ddnsd daemon");
    info!("Configuration loaded: {}", config.ddns.provider.to_redacted_json());

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return DdnsExitCode::RuntimeError.into();
        }
    };

    rt.block_on(run_daemon(config.ddns)).into()
}

/// Build a provider for `config`
fn build_provider(
    config: &ProviderConfig,
    transport: Arc<dyn HttpTransport>,
) -> Result<Arc<dyn DnsProvider>> {
    match config {
        #[cfg(feature = "dnsimple")]
        ProviderConfig::Dnsimple(config) => Ok(Arc::new(
            ddns_provider_dnsimple::DnsimpleProvider::new(config.clone(), transport)?,
        )),
        #[cfg(feature = "noip")]
        ProviderConfig::NoIp(config) => Ok(Arc::new(ddns_provider_noip::NoIpProvider::new(
            config.clone(),
            transport,
        )?)),
        #[cfg(feature = "duckdns")]
        ProviderConfig::DuckDns(config) => Ok(Arc::new(
            ddns_provider_duckdns::DuckDnsProvider::new(config.clone(), transport)?,
        )),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!(
            "Provider '{}' is not compiled into this build",
            other.type_name()
        ),
    }
}

/// Wire everything together and poll until a shutdown signal
async fn run_daemon(config: DdnsConfig) -> DdnsExitCode {
    let transport: Arc<dyn HttpTransport> = match ReqwestTransport::new(config.transport.clone()) {
        Ok(transport) => Arc::new(transport),
        Err(e) => {
            error!("Invalid transport configuration: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    let provider = match build_provider(&config.provider, Arc::clone(&transport)) {
        Ok(provider) => provider,
        Err(e) => {
            error!("Failed to create provider: {}", e);
            return DdnsExitCode::ConfigError;
        }
    };

    if let Err(e) = provider.validate_connection().await {
        report_validation_failure(provider.as_ref(), &e);
        transport.close().await;
        return DdnsExitCode::ConfigError;
    }
    info!("{}: credentials validated", provider.display_name());

    let hostname = provider.domain_name();
    let resolver = IpResolver::new(
        hostname.clone(),
        Box::new(AuthoritativeStrategy::new(hostname.clone(), &config.resolver)),
        Box::new(SystemStrategy::new(hostname)),
        Box::new(EchoStrategy::from_config(&config.resolver, Arc::clone(&transport))),
    );

    let coordinator = UpdateCoordinator::new(provider, resolver, transport);

    let shutdown_signal = match install_shutdown_signal() {
        Ok(signal) => signal,
        Err(e) => {
            error!("Shutdown handler error: {}", e);
            coordinator.stop().await;
            return DdnsExitCode::RuntimeError;
        }
    };

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(async move {
        let signal = shutdown_signal.await;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
    });

    coordinator.run(shutdown_rx).await;

    info!("Daemon stopped");
    DdnsExitCode::CleanShutdown
}

/// Log a startup validation failure by category
fn report_validation_failure(provider: &dyn DnsProvider, e: &ddns_core::Error) {
    let name = provider.display_name();
    match e {
        ddns_core::Error::Authentication(_) => {
            error!("{}: credentials rejected: {}", name, e)
        }
        ddns_core::Error::Configuration(_) => {
            error!("{}: provider configuration invalid: {}", name, e)
        }
        ddns_core::Error::Connection { .. } => {
            error!("{}: provider unreachable: {}", name, e)
        }
        _ => error!("{}: validation failed: {}", name, e),
    }
}

/// Register SIGTERM and SIGINT handlers
///
/// Registration happens before returning, so a failure surfaces here rather
/// than as a premature shutdown. The returned future resolves with the name
/// of the first signal received.
#[cfg(unix)]
fn install_shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    let mut sigterm =
        signal(SignalKind::terminate()).context("Failed to setup SIGTERM handler")?;
    let mut sigint = signal(SignalKind::interrupt()).context("Failed to setup SIGINT handler")?;

    Ok(async move {
        tokio::select! {
            _ = sigterm.recv() => "SIGTERM",
            _ = sigint.recv() => "SIGINT",
        }
    })
}

/// Register a CTRL-C handler
///
/// Fallback implementation for non-Unix platforms. A handler error is
/// logged and never resolves, so the daemon keeps running.
#[cfg(not(unix))]
fn install_shutdown_signal() -> Result<impl Future<Output = &'static str> + Send + 'static> {
    Ok(async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => "SIGINT",
            Err(e) => {
                error!("Failed to wait for CTRL-C: {}", e);
                std::future::pending().await
            }
        }
    })
}
