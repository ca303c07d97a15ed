// # IP Strategy Trait
//
// Defines the interface for one way of resolving an IPv4 address.
//
// ## Implementations
//
// - Authoritative nameservers: `ddns-ip-dns` crate (`AuthoritativeStrategy`)
// - System resolver: `ddns-ip-dns` crate (`SystemStrategy`)
// - External echo service: `ddns-ip-http` crate (`EchoStrategy`)
//
// Strategies are combined by [`crate::IpResolver`], which tries them in a fixed
// priority order and falls back on absent results.

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for IP resolution strategies
///
/// # Failure Contract
///
/// - `Ok(Some(ip))`: resolved
/// - `Ok(None)`: this strategy has no answer right now; the resolver moves on
/// - `Err(Error::Resolution)`: the lookup path itself failed. Only strategies
///   that must not silently degrade (the authoritative one) return errors;
///   the others report failures as `Ok(None)`.
///
/// Implementations must be thread-safe and usable across async tasks.
#[async_trait]
pub trait IpStrategy: Send + Sync {
    /// Prepare the strategy
    ///
    /// Must be idempotent. May do blocking setup (reading system resolver
    /// configuration...) so the hot path does not have to.
    async fn initialize(&self) -> Result<(), crate::Error>;

    /// Resolve an IPv4 address
    async fn resolve(&self) -> Result<Option<Ipv4Addr>, crate::Error>;

    /// Short name for logs (e.g. "authoritative", "system", "echo")
    fn name(&self) -> &'static str;
}
