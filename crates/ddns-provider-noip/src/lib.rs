// # No-IP DNS Provider
//
// Implements the No-IP dynamic update protocol (dyndns2 flavor).
//
// ## Behavior
//
// - ✅ HTTP Basic authentication, header computed once at construction
// - ✅ `good <ip>` and `nochg <ip>` are both confirmations
// - ✅ Any other body (`nohost`, `badauth`, `abuse`, `911`...) is an error
// - ❌ NO retry logic (owned by the transport)
// - ❌ NO update decisions (owned by UpdateCoordinator)
//
// ## Security Requirements
//
// - Password NEVER appears in logs, errors or `Debug` output
//
// ## API Reference
//
// GET `https://dynupdate.no-ip.com/nic/update?hostname=<host>&myip=<ip>`

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ddns_core::config::{NoIpConfig, UpdateInterval};
use ddns_core::state::CurrentIp;
use ddns_core::traits::{DnsProvider, HttpRequest, HttpTransport};
use ddns_core::{Error, Result};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// No-IP update endpoint
pub const NOIP_UPDATE_URL: &str = "https://dynupdate.no-ip.com/nic/update";

const PROVIDER_NAME: &str = "No-IP";

/// No-IP provider
pub struct NoIpProvider {
    config: NoIpConfig,

    /// "Basic <base64(user:password)>"
    /// ⚠️ NEVER log this value
    auth_header: String,

    transport: Arc<dyn HttpTransport>,
    current_ip: CurrentIp,
}

impl NoIpProvider {
    /// Create a new No-IP provider
    ///
    /// # Errors
    ///
    /// `Error::Configuration` if `config` does not validate.
    pub fn new(config: NoIpConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        let credentials = STANDARD.encode(format!("{}:{}", config.username, config.password));
        Ok(Self {
            auth_header: format!("Basic {}", credentials),
            config,
            transport,
            current_ip: CurrentIp::new(),
        })
    }

    fn request(&self) -> HttpRequest {
        HttpRequest::get(NOIP_UPDATE_URL)
            .header("Authorization", self.auth_header.as_str())
            .query("hostname", self.config.hostname.as_str())
    }
}

#[async_trait]
impl DnsProvider for NoIpProvider {
    async fn validate_connection(&self) -> Result<bool> {
        let response = self.transport.request(self.request()).await?;

        match response.status {
            200 => {
                tracing::debug!("No-IP credentials accepted for {}", self.config.hostname);
                Ok(true)
            }
            401 => Err(Error::auth("Invalid No-IP credentials")),
            status => Err(Error::update(
                PROVIDER_NAME,
                format!("No-IP returned status {}: {}", status, response.text.trim()),
            )),
        }
    }

    async fn update_record(&self, ip: Ipv4Addr) -> Result<bool> {
        let response = self
            .transport
            .request(self.request().query("myip", ip.to_string()))
            .await?;

        if response.status != 200 {
            return Err(Error::update(PROVIDER_NAME, format!("HTTP {}", response.status)));
        }

        let body = response.text.trim();
        if body.starts_with("good") || body.starts_with("nochg") {
            self.current_ip.set(ip);
            tracing::info!("No-IP record {} now points to {} ({})", self.config.hostname, ip, body);
            Ok(true)
        } else {
            Err(Error::update(
                PROVIDER_NAME,
                format!("Failed to update No-IP record: {}", body),
            ))
        }
    }

    fn current_ip(&self) -> Option<Ipv4Addr> {
        self.current_ip.get()
    }

    fn domain_name(&self) -> String {
        self.config.hostname.clone()
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn extra_attributes(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("hostname".to_string(), self.config.hostname.clone())])
    }

    fn update_interval(&self) -> UpdateInterval {
        self.config.update_interval
    }
}

impl std::fmt::Debug for NoIpProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoIpProvider")
            .field("config", &self.config)
            .field("auth_header", &"<REDACTED>")
            .field("current_ip", &self.current_ip.get())
            .finish()
    }
}
