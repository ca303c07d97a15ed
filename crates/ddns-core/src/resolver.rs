//! IP resolver
//!
//! Combines the three resolution strategies for one managed hostname and
//! answers two distinct questions:
//!
//! - [`IpResolver::get_ip`]: what the DNS currently publishes for the hostname
//!   (authoritative → system → external, first answer wins)
//! - [`IpResolver::get_current_ip`]: what IP this host presents to the
//!   internet (external echo only)
//!
//! Keeping the two apart is what lets the coordinator tell a stale record
//! from a stale local cache.

use std::net::Ipv4Addr;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::traits::IpStrategy;

/// Per-hostname IP resolver
///
/// Owns one instance of each strategy. Strategies are initialized lazily,
/// concurrently, and exactly once: a failed authoritative initialization is
/// reported to the caller and attempted again on the next call, failures of
/// the other two are only logged.
pub struct IpResolver {
    hostname: String,
    authoritative: Box<dyn IpStrategy>,
    system: Box<dyn IpStrategy>,
    external: Box<dyn IpStrategy>,
    initialized: OnceCell<()>,
}

impl IpResolver {
    /// Create a resolver for `hostname`
    pub fn new(
        hostname: impl Into<String>,
        authoritative: Box<dyn IpStrategy>,
        system: Box<dyn IpStrategy>,
        external: Box<dyn IpStrategy>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            authoritative,
            system,
            external,
            initialized: OnceCell::new(),
        }
    }

    /// The managed hostname
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Initialize all strategies if not done yet
    pub async fn initialize(&self) -> Result<()> {
        self.initialized
            .get_or_try_init(|| async {
                let (authoritative, system, external) = tokio::join!(
                    self.authoritative.initialize(),
                    self.system.initialize(),
                    self.external.initialize(),
                );

                for (name, result) in [(self.system.name(), system), (self.external.name(), external)] {
                    if let Err(e) = result {
                        warn!("{}: {} strategy failed to initialize: {}", self.hostname, name, e);
                    }
                }

                authoritative.map_err(|e| {
                    Error::resolution(format!(
                        "Failed to initialize {} strategy: {}",
                        self.authoritative.name(),
                        e
                    ))
                })?;

                debug!("{}: IP resolution strategies initialized", self.hostname);
                Ok::<(), Error>(())
            })
            .await
            .map(|_| ())
    }

    /// The IP currently published for the hostname
    ///
    /// Tries each strategy in priority order and returns the first answer.
    /// An error from one strategy does not stop the chain.
    ///
    /// # Errors
    ///
    /// `Error::Resolution` when no strategy produced an address.
    pub async fn get_ip(&self) -> Result<Ipv4Addr> {
        self.initialize().await?;

        let mut failures = Vec::new();
        for strategy in [&self.authoritative, &self.system, &self.external] {
            match strategy.resolve().await {
                Ok(Some(ip)) => {
                    debug!("{}: resolved {} via {} strategy", self.hostname, ip, strategy.name());
                    return Ok(ip);
                }
                Ok(None) => {
                    debug!("{}: {} strategy returned no address", self.hostname, strategy.name());
                    failures.push(format!("{}: no address", strategy.name()));
                }
                Err(e) => {
                    warn!("{}: {} strategy failed: {}", self.hostname, strategy.name(), e);
                    failures.push(format!("{}: {}", strategy.name(), e));
                }
            }
        }

        Err(Error::resolution(format!(
            "All resolution strategies failed for {} ({})",
            self.hostname,
            failures.join("; ")
        )))
    }

    /// The public IP this host currently presents, from the external echo strategy
    pub async fn get_current_ip(&self) -> Result<Option<Ipv4Addr>> {
        self.initialize().await?;
        self.external.resolve().await
    }
}

impl std::fmt::Debug for IpResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpResolver")
            .field("hostname", &self.hostname)
            .field("authoritative", &self.authoritative.name())
            .field("system", &self.system.name())
            .field("external", &self.external.name())
            .field("initialized", &self.initialized.initialized())
            .finish()
    }
}
