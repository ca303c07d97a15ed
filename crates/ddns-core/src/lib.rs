// # ddns-core
//
// Core library for the polling DDNS system.
//
// ## Architecture Overview
//
// This library provides the resolution-and-update engine:
// - **HttpTransport**: Trait for HTTP with retry/backoff (implemented in `ddns-http`)
// - **IpStrategy**: Trait for one way of resolving an IPv4 address
// - **IpResolver**: Combines the strategies in a fixed priority order
// - **DnsProvider**: Trait for updating DNS records via provider APIs
// - **UpdateCoordinator**: Drives resolve → decide → update cycles
//
// ## Design Principles
//
// 1. **Separation of Concerns**: Core logic is separate from implementations
// 2. **Closed Provider Set**: Three providers, chosen by configuration variant
// 3. **Library-First**: All core functionality can be used as a library
// 4. **Idempotency**: Pushes happen only when the record, the held IP or the
//    public IP disagree
// 5. **Typed Failures**: Errors travel as `Result` up to the coordinator, which
//    turns them into outcomes

pub mod cache;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod resolver;
pub mod state;
pub mod traits;
pub mod transport;

// Re-export core types for convenience
pub use cache::{CacheEntry, NameserverCache, TtlCache};
pub use config::{DdnsConfig, ProviderConfig, UpdateInterval};
pub use coordinator::{Diagnostics, UpdateCoordinator, UpdateOutcome, UpdateReport, UpdateStatus};
pub use error::{Error, Result};
pub use resolver::IpResolver;
pub use state::CurrentIp;
pub use traits::{DnsProvider, HttpRequest, HttpResponse, HttpTransport, IpStrategy, Method};
pub use transport::MockTransport;
