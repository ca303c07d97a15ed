// DNS query seam for the authoritative strategy.

use async_trait::async_trait;
use ddns_core::{Error, Result};
use hickory_resolver::{
    TokioResolver,
    config::{NameServerConfigGroup, ResolverConfig, ResolverOpts},
    name_server::TokioConnectionProvider,
};
use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::debug;

/// Low-level DNS queries used by [`crate::AuthoritativeStrategy`]
///
/// Errors are `Error::Resolution` carrying the queried name.
#[async_trait]
pub trait DnsQuery: Send + Sync {
    /// Prepare resolver state (e.g. read the system configuration)
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    /// IPv4 addresses of the authoritative nameservers for `domain`
    async fn nameservers(&self, domain: &str) -> Result<Vec<Ipv4Addr>>;

    /// A records for `hostname`, asked directly of `nameservers`
    async fn a_records(&self, hostname: &str, nameservers: &[Ipv4Addr]) -> Result<Vec<Ipv4Addr>>;
}

/// [`DnsQuery`] over hickory-resolver
///
/// NS records and nameserver addresses are looked up through the system
/// resolver configuration. A records are asked of a fresh resolver pointed
/// only at the authoritative servers, so no answer is ever served from a
/// cache.
pub struct HickoryQuery {
    timeout: Duration,
    system: OnceCell<TokioResolver>,
}

impl HickoryQuery {
    /// Create a query helper whose lookups give up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self {
            timeout,
            system: OnceCell::new(),
        }
    }

    fn options(&self) -> ResolverOpts {
        let mut opts = ResolverOpts::default();
        opts.timeout = self.timeout;
        opts.attempts = 1;
        opts
    }

    async fn system(&self) -> Result<&TokioResolver> {
        self.system
            .get_or_try_init(|| async {
                let mut builder = TokioResolver::builder_tokio().map_err(|e| {
                    Error::resolution(format!("Failed to load system DNS configuration: {}", e))
                })?;
                *builder.options_mut() = self.options();
                debug!("system DNS resolver ready");
                Ok::<_, Error>(builder.build())
            })
            .await
    }
}

#[async_trait]
impl DnsQuery for HickoryQuery {
    async fn initialize(&self) -> Result<()> {
        self.system().await.map(|_| ())
    }

    async fn nameservers(&self, domain: &str) -> Result<Vec<Ipv4Addr>> {
        let resolver = self.system().await?;

        let ns = resolver
            .ns_lookup(domain)
            .await
            .map_err(|e| Error::resolution(format!("Failed to get nameservers for {}: {}", domain, e)))?;

        let mut addresses = Vec::new();
        for name in ns.iter() {
            let name = name.to_string();
            let answer = resolver.ipv4_lookup(name.as_str()).await.map_err(|e| {
                Error::resolution(format!(
                    "Failed to resolve nameserver {} for {}: {}",
                    name.trim_end_matches('.'),
                    domain,
                    e
                ))
            })?;
            addresses.extend(answer.iter().map(|a| a.0));
        }

        debug!("{}: {} authoritative nameserver address(es)", domain, addresses.len());
        Ok(addresses)
    }

    async fn a_records(&self, hostname: &str, nameservers: &[Ipv4Addr]) -> Result<Vec<Ipv4Addr>> {
        let ips: Vec<IpAddr> = nameservers.iter().copied().map(IpAddr::V4).collect();
        let config = ResolverConfig::from_parts(
            None,
            vec![],
            NameServerConfigGroup::from_ips_clear(&ips, 53, true),
        );
        let resolver = TokioResolver::builder_with_config(config, TokioConnectionProvider::default())
            .with_options(self.options())
            .build();

        let answer = resolver
            .ipv4_lookup(hostname)
            .await
            .map_err(|e| Error::resolution(format!("Failed to resolve {}: {}", hostname, e)))?;

        Ok(answer.iter().map(|a| a.0).collect())
    }
}

impl std::fmt::Debug for HickoryQuery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HickoryQuery")
            .field("timeout", &self.timeout)
            .field("initialized", &self.system.initialized())
            .finish()
    }
}
