// # DuckDNS Provider
//
// Updates a `<domain>.duckdns.org` A record through the DuckDNS HTTP API.
//
// The token travels in the query string, so it is only ever placed in
// `HttpRequest::query` and never formatted into a URL, log line or error.

use async_trait::async_trait;
use ddns_core::config::{DuckDnsConfig, UpdateInterval};
use ddns_core::state::CurrentIp;
use ddns_core::traits::{DnsProvider, HttpRequest, HttpTransport};
use ddns_core::{Error, Result};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// DuckDNS update endpoint
pub const DUCKDNS_UPDATE_URL: &str = "https://www.duckdns.org/update";

const DUCKDNS_SUFFIX: &str = ".duckdns.org";
const PROVIDER_NAME: &str = "DuckDNS";

/// Lowercased subdomain without the `.duckdns.org` suffix
pub fn normalize_domain(domain: &str) -> String {
    let domain = domain.trim().to_ascii_lowercase();
    match domain.strip_suffix(DUCKDNS_SUFFIX) {
        Some(subdomain) => subdomain.to_string(),
        None => domain,
    }
}

/// DuckDNS provider
pub struct DuckDnsProvider {
    /// Normalized subdomain
    domain: String,
    token: String,
    update_interval: UpdateInterval,
    transport: Arc<dyn HttpTransport>,
    current_ip: CurrentIp,
}

impl DuckDnsProvider {
    /// Create a new DuckDNS provider
    ///
    /// # Errors
    ///
    /// `Error::Configuration` if `config` does not validate.
    pub fn new(config: DuckDnsConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            domain: normalize_domain(&config.domain),
            token: config.token,
            update_interval: config.update_interval,
            transport,
            current_ip: CurrentIp::new(),
        })
    }

    fn request(&self) -> HttpRequest {
        HttpRequest::get(DUCKDNS_UPDATE_URL)
            .query("domains", self.domain.as_str())
            .query("token", self.token.as_str())
    }
}

#[async_trait]
impl DnsProvider for DuckDnsProvider {
    async fn validate_connection(&self) -> Result<bool> {
        let response = self
            .transport
            .request(self.request().query("verbose", "true"))
            .await?;

        if response.status != 200 {
            return Err(Error::update(
                PROVIDER_NAME,
                format!("DuckDNS returned status {}", response.status),
            ));
        }
        if response.text.contains("KO") {
            return Err(Error::auth("Invalid DuckDNS token"));
        }
        if !response.text.contains("OK") {
            return Err(Error::update(PROVIDER_NAME, "Unexpected DuckDNS response"));
        }

        tracing::debug!("DuckDNS token accepted for {}", self.domain_name());
        Ok(true)
    }

    async fn update_record(&self, ip: Ipv4Addr) -> Result<bool> {
        let response = self
            .transport
            .request(self.request().query("ip", ip.to_string()))
            .await?;

        let confirmed = response.status == 200 && response.text.contains("OK");
        if confirmed {
            self.current_ip.set(ip);
            tracing::info!("DuckDNS record {} now points to {}", self.domain_name(), ip);
        } else {
            tracing::warn!(
                "DuckDNS declined update of {} (HTTP {}): {}",
                self.domain_name(),
                response.status,
                response.text.trim()
            );
        }
        Ok(confirmed)
    }

    fn current_ip(&self) -> Option<Ipv4Addr> {
        self.current_ip.get()
    }

    fn domain_name(&self) -> String {
        format!("{}{}", self.domain, DUCKDNS_SUFFIX)
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn extra_attributes(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("domain".to_string(), self.domain.clone())])
    }

    fn update_interval(&self) -> UpdateInterval {
        self.update_interval
    }
}

impl std::fmt::Debug for DuckDnsProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDnsProvider")
            .field("domain", &self.domain)
            .field("token", &"<REDACTED>")
            .field("current_ip", &self.current_ip.get())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ddns_core::MockTransport;

    const VALIDATE_URL: &str = "https://www.duckdns.org/update?domains=test&token=test-token&verbose=true";
    const UPDATE_URL: &str = "https://www.duckdns.org/update?domains=test&token=test-token&ip=1.2.3.4";

    fn provider_for(domain: &str, transport: &Arc<MockTransport>) -> DuckDnsProvider {
        let config = DuckDnsConfig {
            token: "test-token".to_string(),
            domain: domain.to_string(),
            update_interval: UpdateInterval::default(),
        };
        let shared: Arc<dyn HttpTransport> = transport.clone();
        DuckDnsProvider::new(config, shared).unwrap()
    }

    #[test]
    fn test_normalize_domain() {
        assert_eq!(normalize_domain("test"), "test");
        assert_eq!(normalize_domain("Test.DuckDNS.org"), "test");
        assert_eq!(normalize_domain("my-home.duckdns.org"), "my-home");
    }

    #[tokio::test]
    async fn test_validate_ok() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(VALIDATE_URL, 200, "OK\n1.2.3.4\n\nNOCHANGE", None);

        assert!(provider_for("test", &transport).validate_connection().await.unwrap());
    }

    #[tokio::test]
    async fn test_validate_ko_is_auth_error() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(VALIDATE_URL, 200, "KO", None);

        let err = provider_for("test", &transport).validate_connection().await.unwrap_err();
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[tokio::test]
    async fn test_validate_unexpected_body() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(VALIDATE_URL, 200, "<html></html>", None);

        let err = provider_for("test", &transport).validate_connection().await.unwrap_err();
        assert!(err.to_string().contains("Unexpected DuckDNS response"));
    }

    #[tokio::test]
    async fn test_update_ok_sets_current_ip() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(UPDATE_URL, 200, "OK", None);
        let provider = provider_for("test.duckdns.org", &transport);

        assert!(provider.update_record(Ipv4Addr::new(1, 2, 3, 4)).await.unwrap());
        assert_eq!(transport.requested_urls(), vec![UPDATE_URL.to_string()]);
        assert_eq!(provider.current_ip(), Some(Ipv4Addr::new(1, 2, 3, 4)));
    }

    #[tokio::test]
    async fn test_update_ko_is_declined() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(UPDATE_URL, 200, "KO", None);
        let provider = provider_for("test", &transport);

        assert!(!provider.update_record(Ipv4Addr::new(1, 2, 3, 4)).await.unwrap());
        assert_eq!(provider.current_ip(), None);
    }

    #[tokio::test]
    async fn test_update_http_error_is_declined() {
        let transport = Arc::new(MockTransport::new());
        transport.mock_response(UPDATE_URL, 502, "OK", None);

        assert!(
            !provider_for("test", &transport)
                .update_record(Ipv4Addr::new(1, 2, 3, 4))
                .await
                .unwrap()
        );
    }

    #[test]
    fn test_identity_and_redaction() {
        let transport = Arc::new(MockTransport::new());
        let provider = provider_for("Test.duckdns.org", &transport);

        assert_eq!(provider.domain_name(), "test.duckdns.org");
        assert_eq!(provider.provider_name(), "DuckDNS");
        assert_eq!(provider.display_name(), "test.duckdns.org (DuckDNS)");
        assert_eq!(
            provider.extra_attributes(),
            BTreeMap::from([("domain".to_string(), "test".to_string())])
        );
        assert!(!format!("{:?}", provider).contains("test-token"));
    }
}
