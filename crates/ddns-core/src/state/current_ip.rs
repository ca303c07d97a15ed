// # Provider-held Current IP
//
// The IP a provider believes it last successfully wrote.
//
// ## Lifecycle
//
// - Starts as `None` ("unknown") on every process start
// - Written only by the owning provider, after its own success criterion is met
// - Read by the update coordinator to detect a stale local cache
//
// Cycles for one hostname never overlap, so a plain lock around the value is
// enough: there is no read-modify-write across an await point.

use std::net::Ipv4Addr;
use std::sync::{PoisonError, RwLock};

/// Last successfully pushed IP address of one provider instance
///
/// # Example
///
/// ```rust
/// use ddns_core::state::CurrentIp;
/// use std::net::Ipv4Addr;
///
/// let current = CurrentIp::new();
/// assert_eq!(current.get(), None);
///
/// current.set(Ipv4Addr::new(1, 2, 3, 4));
/// assert_eq!(current.get(), Some(Ipv4Addr::new(1, 2, 3, 4)));
/// ```
#[derive(Debug, Default)]
pub struct CurrentIp {
    inner: RwLock<Option<Ipv4Addr>>,
}

impl CurrentIp {
    /// Create an "unknown" current IP
    pub fn new() -> Self {
        Self::default()
    }

    /// The last confirmed IP, if any
    pub fn get(&self) -> Option<Ipv4Addr> {
        *self.inner.read().unwrap_or_else(PoisonError::into_inner)
    }

    /// Record a confirmed push
    pub fn set(&self, ip: Ipv4Addr) {
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = Some(ip);
    }
}
