// # DNS Provider Trait
//
// Defines the interface for pushing the managed A record to a DNS provider.
//
// ## Implementations
//
// - DNSimple: `ddns-provider-dnsimple` crate
// - No-IP: `ddns-provider-noip` crate
// - DuckDNS: `ddns-provider-duckdns` crate
//
// The provider set is closed: the daemon picks one of the three from the
// `ProviderConfig` variant, there is no runtime plugin registration.
//
// ## Usage
//
// ```rust,ignore
// use ddns_core::DnsProvider;
//
// provider.validate_connection().await?;
//
// if provider.update_record("1.2.3.4".parse()?).await? {
//     assert_eq!(provider.current_ip(), Some("1.2.3.4".parse()?));
// }
// ```

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::Ipv4Addr;

use crate::config::UpdateInterval;

/// Trait for DNS provider implementations
///
/// # Responsibilities
///
/// ## Allowed
/// - ✅ Perform HTTP calls to their own endpoints through the shared transport
/// - ✅ Interpret provider-specific responses
/// - ✅ Record the IP they last pushed successfully
///
/// ## Forbidden
/// - ❌ Retry or back off (owned by the transport)
/// - ❌ Decide whether an update is needed (owned by `UpdateCoordinator`)
/// - ❌ Record the pushed IP before their success criterion is met
/// - ❌ Expose credentials through identity methods, `Debug`, or logs
///
/// # Errors
///
/// - `Error::Authentication`: credentials rejected
/// - `Error::Configuration`: credentials fine, resource missing/mismatched
/// - `Error::Connection`: the transport gave up reaching the provider
/// - `Error::Update`: any other provider-side anomaly
#[async_trait]
pub trait DnsProvider: Send + Sync {
    /// Check credentials and the configured resource
    ///
    /// Used by setup paths so they can tell bad credentials, bad
    /// configuration, and connectivity problems apart.
    async fn validate_connection(&self) -> Result<bool, crate::Error>;

    /// Push `ip` as the record's value
    ///
    /// On success the provider's [`current_ip`](Self::current_ip) becomes
    /// exactly `ip`. Pushing the IP the provider already holds must succeed
    /// again without creating duplicate records.
    ///
    /// # Returns
    ///
    /// - `Ok(true)`: the provider confirmed the update
    /// - `Ok(false)`: the provider declined without an error condition
    /// - `Err(Error)`: the push failed
    async fn update_record(&self, ip: Ipv4Addr) -> Result<bool, crate::Error>;

    /// The IP this provider last pushed successfully, `None` when unknown
    fn current_ip(&self) -> Option<Ipv4Addr>;

    /// Fully-qualified name of the managed record
    fn domain_name(&self) -> String;

    /// Provider name (for logging/display)
    fn provider_name(&self) -> &'static str;

    /// Human-readable identity, e.g. "home.example.com (DNSimple)"
    fn display_name(&self) -> String {
        format!("{} ({})", self.domain_name(), self.provider_name())
    }

    /// Provider-specific, secret-free attributes for diagnostics
    fn extra_attributes(&self) -> BTreeMap<String, String>;

    /// Polling interval from the provider's configuration
    fn update_interval(&self) -> UpdateInterval;
}
