// # DNS IP Strategies
//
// This crate provides the two DNS-backed IP strategies for the DDNS system.
//
// - [`AuthoritativeStrategy`]: asks the managed domain's own nameservers for
//   the A record, bypassing every intermediate cache. Highest priority.
// - [`SystemStrategy`]: ordinary lookup through the platform resolver.
//   Degrades to "no answer" instead of failing.
//
// The authoritative strategy talks DNS through the [`DnsQuery`] seam so that
// its caching and error mapping can be exercised without a network.

mod authoritative;
mod query;
mod system;

pub use authoritative::{AuthoritativeStrategy, second_level_domain};
pub use query::{DnsQuery, HickoryQuery};
pub use system::SystemStrategy;
