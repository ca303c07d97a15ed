// Authoritative nameserver strategy.

use async_trait::async_trait;
use ddns_core::cache::{NameserverCache, TtlCache};
use ddns_core::config::ResolverConfig;
use ddns_core::traits::IpStrategy;
use ddns_core::{Error, Result};
use std::net::Ipv4Addr;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::query::{DnsQuery, HickoryQuery};

/// Last two labels of `hostname`
///
/// `home.example.com` → `example.com`. Names with fewer than two labels are
/// returned unchanged.
pub fn second_level_domain(hostname: &str) -> String {
    let labels: Vec<&str> = hostname
        .trim_end_matches('.')
        .split('.')
        .filter(|label| !label.is_empty())
        .collect();
    let start = labels.len().saturating_sub(2);
    labels[start..].join(".")
}

/// Queries the managed domain's authoritative nameservers directly
///
/// Nameserver addresses are cached per second-level domain for the
/// configured TTL (one hour by default). The A-record answer itself is never
/// cached.
///
/// # Errors
///
/// `Error::Resolution` when the NS lookup or the A query fails. This is the
/// only strategy that fails instead of degrading, so a broken authoritative
/// path is visible in the resolver's logs.
pub struct AuthoritativeStrategy {
    hostname: String,
    query: Box<dyn DnsQuery>,
    nameservers: Mutex<NameserverCache>,
}

impl AuthoritativeStrategy {
    /// Create a strategy for `hostname` backed by hickory-resolver
    pub fn new(hostname: impl Into<String>, config: &ResolverConfig) -> Self {
        Self::with_query(
            hostname,
            Box::new(HickoryQuery::new(config.query_timeout())),
            config.nameserver_cache_ttl_secs,
        )
    }

    /// Create a strategy over a custom query implementation
    pub fn with_query(
        hostname: impl Into<String>,
        query: Box<dyn DnsQuery>,
        nameserver_ttl_secs: u64,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            query,
            nameservers: Mutex::new(TtlCache::new(nameserver_ttl_secs)),
        }
    }

    /// The managed hostname
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    fn cache(&self) -> MutexGuard<'_, NameserverCache> {
        self.nameservers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn nameservers(&self, domain: &str) -> Result<Vec<Ipv4Addr>> {
        let cached = self.cache().get(domain);
        if let Some(cached) = cached {
            debug!("{}: using cached nameservers", domain);
            return Ok(cached);
        }

        let fresh = self.query.nameservers(domain).await?;
        self.cache().insert(domain.to_string(), fresh.clone());
        Ok(fresh)
    }
}

#[async_trait]
impl IpStrategy for AuthoritativeStrategy {
    async fn initialize(&self) -> Result<()> {
        self.query.initialize().await
    }

    async fn resolve(&self) -> Result<Option<Ipv4Addr>> {
        let domain = second_level_domain(&self.hostname);
        let nameservers = self.nameservers(&domain).await?;

        if nameservers.is_empty() {
            debug!("{}: no authoritative nameservers found", domain);
            return Ok(None);
        }

        let answers = self
            .query
            .a_records(&self.hostname, &nameservers)
            .await
            .map_err(|e| match e {
                Error::Resolution(_) => e,
                other => Error::resolution(format!("Failed to resolve {}: {}", self.hostname, other)),
            })?;

        Ok(answers.first().copied())
    }

    fn name(&self) -> &'static str {
        "authoritative"
    }
}

impl std::fmt::Debug for AuthoritativeStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthoritativeStrategy")
            .field("hostname", &self.hostname)
            .field("cached_domains", &self.cache().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Canned DnsQuery counting its calls
    struct MockQuery {
        nameservers: std::result::Result<Vec<Ipv4Addr>, String>,
        answers: std::result::Result<Vec<Ipv4Addr>, String>,
        ns_calls: Arc<AtomicUsize>,
        a_calls: Arc<AtomicUsize>,
        asked: Arc<Mutex<Vec<(String, Vec<Ipv4Addr>)>>>,
    }

    impl MockQuery {
        fn new(nameservers: &[[u8; 4]], answers: &[[u8; 4]]) -> Self {
            Self {
                nameservers: Ok(nameservers.iter().map(|ip| Ipv4Addr::from(*ip)).collect()),
                answers: Ok(answers.iter().map(|ip| Ipv4Addr::from(*ip)).collect()),
                ns_calls: Arc::new(AtomicUsize::new(0)),
                a_calls: Arc::new(AtomicUsize::new(0)),
                asked: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    #[async_trait]
    impl DnsQuery for MockQuery {
        async fn nameservers(&self, domain: &str) -> Result<Vec<Ipv4Addr>> {
            self.ns_calls.fetch_add(1, Ordering::SeqCst);
            self.nameservers
                .clone()
                .map_err(|e| Error::resolution(format!("Failed to get nameservers for {}: {}", domain, e)))
        }

        async fn a_records(&self, hostname: &str, nameservers: &[Ipv4Addr]) -> Result<Vec<Ipv4Addr>> {
            self.a_calls.fetch_add(1, Ordering::SeqCst);
            self.asked
                .lock()
                .unwrap()
                .push((hostname.to_string(), nameservers.to_vec()));
            self.answers
                .clone()
                .map_err(|e| Error::resolution(format!("Failed to resolve {}: {}", hostname, e)))
        }
    }

    #[test]
    fn test_second_level_domain() {
        assert_eq!(second_level_domain("home.example.com"), "example.com");
        assert_eq!(second_level_domain("a.b.example.com."), "example.com");
        assert_eq!(second_level_domain("example.com"), "example.com");
        assert_eq!(second_level_domain("localhost"), "localhost");
    }

    #[tokio::test]
    async fn test_queries_resolved_nameservers_for_full_hostname() {
        let query = MockQuery::new(&[[198, 51, 100, 1], [198, 51, 100, 2]], &[[1, 2, 3, 4]]);
        let asked = Arc::clone(&query.asked);
        let strategy = AuthoritativeStrategy::with_query("home.example.com", Box::new(query), 3600);

        let ip = strategy.resolve().await.unwrap();

        assert_eq!(ip, Some(Ipv4Addr::new(1, 2, 3, 4)));
        assert_eq!(
            asked.lock().unwrap().as_slice(),
            [(
                "home.example.com".to_string(),
                vec![Ipv4Addr::new(198, 51, 100, 1), Ipv4Addr::new(198, 51, 100, 2)]
            )]
        );
    }

    #[tokio::test]
    async fn test_nameservers_cached_within_ttl() {
        let query = MockQuery::new(&[[198, 51, 100, 1]], &[[1, 2, 3, 4]]);
        let ns_calls = Arc::clone(&query.ns_calls);
        let a_calls = Arc::clone(&query.a_calls);
        let strategy = AuthoritativeStrategy::with_query("home.example.com", Box::new(query), 3600);

        strategy.resolve().await.unwrap();
        strategy.resolve().await.unwrap();

        assert_eq!(ns_calls.load(Ordering::SeqCst), 1, "NS query must not be re-issued");
        assert_eq!(a_calls.load(Ordering::SeqCst), 2, "A answer is never cached");
    }

    #[tokio::test]
    async fn test_expired_nameservers_are_refetched() {
        let query = MockQuery::new(&[[198, 51, 100, 1]], &[[1, 2, 3, 4]]);
        let ns_calls = Arc::clone(&query.ns_calls);
        let strategy = AuthoritativeStrategy::with_query("home.example.com", Box::new(query), 0);

        strategy.resolve().await.unwrap();
        strategy.resolve().await.unwrap();

        assert_eq!(ns_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_no_nameservers_is_absent() {
        let query = MockQuery::new(&[], &[[1, 2, 3, 4]]);
        let a_calls = Arc::clone(&query.a_calls);
        let strategy = AuthoritativeStrategy::with_query("home.example.com", Box::new(query), 3600);

        assert_eq!(strategy.resolve().await.unwrap(), None);
        assert_eq!(a_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_ns_failure_is_resolution_error() {
        let mut query = MockQuery::new(&[], &[]);
        query.nameservers = Err("SERVFAIL".to_string());
        let strategy = AuthoritativeStrategy::with_query("home.example.com", Box::new(query), 3600);

        let err = strategy.resolve().await.unwrap_err();
        assert!(matches!(err, Error::Resolution(_)));
        assert!(err.to_string().contains("example.com"));
    }

    #[tokio::test]
    async fn test_a_failure_is_resolution_error_and_keeps_cache() {
        let mut query = MockQuery::new(&[[198, 51, 100, 1]], &[]);
        query.answers = Err("NXDOMAIN".to_string());
        let ns_calls = Arc::clone(&query.ns_calls);
        let strategy = AuthoritativeStrategy::with_query("home.example.com", Box::new(query), 3600);

        assert!(matches!(strategy.resolve().await, Err(Error::Resolution(_))));
        assert!(matches!(strategy.resolve().await, Err(Error::Resolution(_))));
        assert_eq!(ns_calls.load(Ordering::SeqCst), 1);
    }
}
