// System resolver strategy.

use async_trait::async_trait;
use ddns_core::Result;
use ddns_core::traits::IpStrategy;
use std::net::{IpAddr, Ipv4Addr};
use tracing::debug;

/// Looks the hostname up through the platform resolver
///
/// Subject to every cache between this host and the authoritative servers.
/// Returns `Ok(None)` when the name does not resolve to an IPv4 address.
#[derive(Debug, Clone)]
pub struct SystemStrategy {
    hostname: String,
}

impl SystemStrategy {
    /// Create a strategy for `hostname`
    pub fn new(hostname: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
        }
    }
}

#[async_trait]
impl IpStrategy for SystemStrategy {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn resolve(&self) -> Result<Option<Ipv4Addr>> {
        match tokio::net::lookup_host((self.hostname.as_str(), 0)).await {
            Ok(addrs) => Ok(addrs
                .filter_map(|addr| match addr.ip() {
                    IpAddr::V4(ip) => Some(ip),
                    IpAddr::V6(_) => None,
                })
                .next()),
            Err(e) => {
                debug!("{}: system lookup failed: {}", self.hostname, e);
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "system"
    }
}
