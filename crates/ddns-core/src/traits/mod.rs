//! Core traits for the DDNS system
//!
//! This module defines the abstract interfaces that all implementations must follow.
//!
//! - [`HttpTransport`]: Perform HTTP requests with retry/backoff
//! - [`IpStrategy`]: Resolve an IPv4 address one particular way
//! - [`DnsProvider`]: Update DNS records via provider APIs

pub mod dns_provider;
pub mod http_transport;
pub mod ip_strategy;

pub use dns_provider::DnsProvider;
pub use http_transport::{HttpRequest, HttpResponse, HttpTransport, Method};
pub use ip_strategy::IpStrategy;
