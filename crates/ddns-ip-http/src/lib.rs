// # HTTP Echo IP Strategy
//
// This crate provides the "what is my IP" strategy for the DDNS system.
//
// ## Purpose
//
// The echo service is the **ground truth** for the public IP: it reports the
// address this host presents to the internet, independently of what any DNS
// record currently says. `IpResolver::get_current_ip` uses it exclusively; it
// is also the last fallback of `IpResolver::get_ip`.
//
// ## Architecture
//
// Issues a plain GET to the configured endpoint (default
// `https://api.ipify.org`) through the shared `HttpTransport`, so it inherits
// the transport's timeout and retry policy. The trimmed body is the address.
//
// ## Failure Contract
//
// Never fails: non-200 statuses, unparsable bodies and transport errors all
// read as "no answer".

use async_trait::async_trait;
use ddns_core::config::ResolverConfig;
use ddns_core::traits::{HttpTransport, IpStrategy};
use ddns_core::Result;
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

/// Echo-service IP strategy
pub struct EchoStrategy {
    /// Endpoint answering with the caller's address as plain text
    url: String,

    /// Shared transport
    transport: Arc<dyn HttpTransport>,
}

impl EchoStrategy {
    /// Create a strategy querying `url`
    pub fn new(url: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            url: url.into(),
            transport,
        }
    }

    /// Create a strategy querying the configured echo endpoint
    pub fn from_config(config: &ResolverConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(config.echo_url.clone(), transport)
    }

    /// Endpoint URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

#[async_trait]
impl IpStrategy for EchoStrategy {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn resolve(&self) -> Result<Option<Ipv4Addr>> {
        let response = match self.transport.get(&self.url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Echo service {} unreachable: {}", self.url, e);
                return Ok(None);
            }
        };

        if response.status != 200 {
            warn!("Echo service {} returned HTTP {}", self.url, response.status);
            return Ok(None);
        }

        let body = response.text.trim();
        match body.parse::<Ipv4Addr>() {
            Ok(ip) => {
                debug!("Echo service reports {}", ip);
                Ok(Some(ip))
            }
            Err(_) => {
                warn!("Echo service {} returned a non-IPv4 body: {:?}", self.url, body);
                Ok(None)
            }
        }
    }

    fn name(&self) -> &'static str {
        "echo"
    }
}

impl std::fmt::Debug for EchoStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EchoStrategy").field("url", &self.url).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::MockTransport;
    use ddns_core::config::DEFAULT_ECHO_URL;

    fn strategy(transport: &Arc<MockTransport>) -> EchoStrategy {
        let transport: Arc<dyn HttpTransport> = transport.clone();
        EchoStrategy::from_config(&ResolverConfig::default(), transport)
    }

    #[tokio::test]
    async fn test_trimmed_body_is_the_ip() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(DEFAULT_ECHO_URL, 200, " 203.0.113.7\n", None);

        let ip = strategy(&transport).resolve().await.unwrap();

        assert_eq!(ip, Some(Ipv4Addr::new(203, 0, 113, 7)));
        assert_eq!(transport.call_count(DEFAULT_ECHO_URL), 1);
    }

    #[tokio::test]
    async fn test_non_200_is_absent() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(DEFAULT_ECHO_URL, 503, "203.0.113.7", None);

        assert_eq!(strategy(&transport).resolve().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_transport_failure_is_absent() {
        // Nothing mapped: the mock fails like an exhausted transport
        let transport = Arc::new(MockTransport::new());

        assert_eq!(strategy(&transport).resolve().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_body_is_absent() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(DEFAULT_ECHO_URL, 200, "<html>rate limited</html>", None);

        assert_eq!(strategy(&transport).resolve().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_ipv6_body_is_absent() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response("https://api64.ipify.org", 200, "2001:db8::1", None);
        let shared: Arc<dyn HttpTransport> = transport.clone();

        let strategy = EchoStrategy::new("https://api64.ipify.org", shared);
        assert_eq!(strategy.resolve().await.unwrap(), None);
    }
}
