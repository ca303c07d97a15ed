// # DNSimple DNS Provider
//
// This crate provides a DNSimple API v2 provider implementation for the DDNS system.
//
// ## Behavior
//
// - ✅ Bearer token authentication
// - ✅ Credential validation: token → account id → zone
// - ✅ Find-then-patch updates: an existing A record is PATCHed, a missing
//   one is created, pushing the same IP twice never creates duplicates
// - ❌ NO retry logic (owned by the transport)
// - ❌ NO update decisions (owned by UpdateCoordinator)
//
// ## Security Requirements
//
// - API token NEVER appears in logs, errors, `Debug` output or attributes
//
// ## API Reference
//
// - Who am I: GET `/v2/whoami`
// - Zone: GET `/v2/:account/zones/:zone`
// - List records: GET `/v2/:account/zones/:zone/records`
// - Update record: PATCH `/v2/:account/zones/:zone/records/:id` `{"content": ip}`
// - Create record: POST `/v2/:account/zones/:zone/records` `{"name", "type": "A", "content"}`

use async_trait::async_trait;
use ddns_core::config::{DnsimpleConfig, UpdateInterval};
use ddns_core::state::CurrentIp;
use ddns_core::traits::{DnsProvider, HttpRequest, HttpResponse, HttpTransport};
use ddns_core::{Error, Result};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::Arc;

/// DNSimple API v2 base URL
pub const DNSIMPLE_API_BASE: &str = "https://api.dnsimple.com/v2";

const PROVIDER_NAME: &str = "DNSimple";

/// DNSimple provider
///
/// # Security
///
/// The Debug implementation intentionally does NOT expose the API token.
pub struct DnsimpleProvider {
    config: DnsimpleConfig,

    /// "Bearer <token>"
    /// ⚠️ NEVER log this value
    auth_header: String,

    transport: Arc<dyn HttpTransport>,
    current_ip: CurrentIp,
}

impl DnsimpleProvider {
    /// Create a new DNSimple provider
    ///
    /// # Errors
    ///
    /// `Error::Configuration` if `config` does not validate.
    pub fn new(config: DnsimpleConfig, transport: Arc<dyn HttpTransport>) -> Result<Self> {
        config.validate()?;
        let auth_header = format!("Bearer {}", config.token);
        Ok(Self {
            config,
            auth_header,
            transport,
            current_ip: CurrentIp::new(),
        })
    }

    fn zone_url(&self) -> String {
        format!(
            "{}/{}/zones/{}",
            DNSIMPLE_API_BASE, self.config.account_id, self.config.zone
        )
    }

    fn records_url(&self) -> String {
        format!("{}/records", self.zone_url())
    }

    /// Record name as the API stores it: the apex is the empty name
    fn api_record_name(&self) -> &str {
        if self.config.record_name == "@" {
            ""
        } else {
            &self.config.record_name
        }
    }

    async fn send(&self, request: HttpRequest) -> Result<HttpResponse> {
        let request = request
            .header("Authorization", self.auth_header.as_str())
            .header("Accept", "application/json");
        self.transport.request(request).await
    }

    /// Id of the existing A record for the managed name, if any
    async fn find_record_id(&self) -> Result<Option<String>> {
        let response = self.send(HttpRequest::get(self.records_url())).await?;
        if response.status != 200 {
            return Err(Error::update(
                PROVIDER_NAME,
                format!("Failed to get DNS records (HTTP {})", response.status),
            ));
        }

        let records = response
            .json
            .as_ref()
            .and_then(|body| body.get("data"))
            .and_then(Value::as_array)
            .ok_or_else(|| Error::update(PROVIDER_NAME, "Invalid response format: data is not an array"))?;

        let name = self.api_record_name();
        Ok(records
            .iter()
            .find(|record| {
                record.get("name").and_then(Value::as_str) == Some(name)
                    && record.get("type").and_then(Value::as_str) == Some("A")
            })
            .and_then(|record| record.get("id"))
            .and_then(id_string))
    }
}

/// DNSimple ids are numbers, but accept strings too
fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::Number(n) => Some(n.to_string()),
        Value::String(s) => Some(s.clone()),
        _ => None,
    }
}

#[async_trait]
impl DnsProvider for DnsimpleProvider {
    async fn validate_connection(&self) -> Result<bool> {
        let whoami = self
            .send(HttpRequest::get(format!("{}/whoami", DNSIMPLE_API_BASE)))
            .await?;
        if whoami.status != 200 {
            return Err(Error::auth("Failed to authenticate with DNSimple"));
        }

        let account_id = whoami
            .json
            .as_ref()
            .and_then(|body| body.pointer("/data/account/id"))
            .and_then(id_string)
            .ok_or_else(|| Error::update(PROVIDER_NAME, "whoami response carries no account id"))?;

        if account_id != self.config.account_id {
            return Err(Error::config("Account ID does not match the provided token"));
        }

        let zone = self.send(HttpRequest::get(self.zone_url())).await?;
        if zone.status != 200 {
            return Err(Error::config("Zone not found or not accessible"));
        }

        tracing::debug!("DNSimple credentials valid for zone {}", self.config.zone);
        Ok(true)
    }

    async fn update_record(&self, ip: Ipv4Addr) -> Result<bool> {
        let content = ip.to_string();

        match self.find_record_id().await? {
            Some(record_id) => {
                tracing::debug!("Updating DNSimple record {} ({})", record_id, self.domain_name());
                let response = self
                    .send(
                        HttpRequest::patch(format!("{}/{}", self.records_url(), record_id))
                            .json(json!({ "content": content })),
                    )
                    .await?;

                if response.status != 200 {
                    return Err(Error::update(
                        PROVIDER_NAME,
                        format!("Failed to update DNS record (HTTP {})", response.status),
                    ));
                }
            }
            None => {
                tracing::debug!("Creating DNSimple A record for {}", self.domain_name());
                let response = self
                    .send(HttpRequest::post(self.records_url()).json(json!({
                        "name": self.api_record_name(),
                        "type": "A",
                        "content": content,
                    })))
                    .await?;

                if response.status != 201 {
                    return Err(Error::update(
                        PROVIDER_NAME,
                        format!("Failed to create DNS record (HTTP {})", response.status),
                    ));
                }
            }
        }

        self.current_ip.set(ip);
        tracing::info!("DNSimple record {} now points to {}", self.domain_name(), ip);
        Ok(true)
    }

    fn current_ip(&self) -> Option<Ipv4Addr> {
        self.current_ip.get()
    }

    fn domain_name(&self) -> String {
        if self.config.record_name == "@" {
            self.config.zone.clone()
        } else {
            format!("{}.{}", self.config.record_name, self.config.zone)
        }
    }

    fn provider_name(&self) -> &'static str {
        PROVIDER_NAME
    }

    fn extra_attributes(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("zone".to_string(), self.config.zone.clone()),
            ("record_name".to_string(), self.config.record_name.clone()),
        ])
    }

    fn update_interval(&self) -> UpdateInterval {
        self.config.update_interval
    }
}

// Custom Debug implementation that hides the API token
impl std::fmt::Debug for DnsimpleProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsimpleProvider")
            .field("config", &self.config)
            .field("auth_header", &"<REDACTED>")
            .field("current_ip", &self.current_ip.get())
            .finish()
    }
}
