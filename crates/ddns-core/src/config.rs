//! Configuration types for the DDNS system
//!
//! Configuration arrives as already-parsed in-memory structures. Each provider
//! configuration is validated once, before the owning provider is constructed.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Mask used in place of secrets when a configuration is rendered for display
pub const SECRET_MASK: &str = "***";

/// Lowest accepted polling interval, in seconds
pub const MIN_UPDATE_INTERVAL_SECS: u64 = 60;

/// Highest accepted polling interval, in seconds (365 days)
pub const MAX_UPDATE_INTERVAL_SECS: u64 = 365 * 24 * 3600;

/// Polling interval used when none is configured, in seconds
pub const DEFAULT_UPDATE_INTERVAL_SECS: u64 = 300;

/// Default echo service for the public IP
pub const DEFAULT_ECHO_URL: &str = "https://api.ipify.org";

/// Polling interval between update cycles
///
/// Always within [`MIN_UPDATE_INTERVAL_SECS`]..=[`MAX_UPDATE_INTERVAL_SECS`];
/// both [`UpdateInterval::new`] and deserialization reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "u64", into = "u64")]
pub struct UpdateInterval(u64);

impl UpdateInterval {
    /// Create an interval of `secs` seconds
    pub fn new(secs: u64) -> Result<Self, crate::Error> {
        if secs < MIN_UPDATE_INTERVAL_SECS {
            return Err(crate::Error::config(format!(
                "Update interval must be at least {} seconds",
                MIN_UPDATE_INTERVAL_SECS
            )));
        }
        if secs > MAX_UPDATE_INTERVAL_SECS {
            return Err(crate::Error::config(format!(
                "Update interval must be at most {} seconds",
                MAX_UPDATE_INTERVAL_SECS
            )));
        }
        Ok(Self(secs))
    }

    /// Interval length in seconds
    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// Interval length as a [`Duration`]
    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.0)
    }
}

impl Default for UpdateInterval {
    fn default() -> Self {
        Self(DEFAULT_UPDATE_INTERVAL_SECS)
    }
}

impl TryFrom<u64> for UpdateInterval {
    type Error = crate::Error;

    fn try_from(secs: u64) -> Result<Self, Self::Error> {
        Self::new(secs)
    }
}

impl From<UpdateInterval> for u64 {
    fn from(interval: UpdateInterval) -> Self {
        interval.0
    }
}

fn require(value: &str, message: &str) -> Result<(), crate::Error> {
    if value.trim().is_empty() {
        return Err(crate::Error::config(message));
    }
    Ok(())
}

/// DNSimple (token/account/zone/record) configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DnsimpleConfig {
    /// Numeric account id, as a string
    pub account_id: String,
    /// API v2 token
    pub token: String,
    /// Zone name (e.g. "example.com")
    pub zone: String,
    /// Record name inside the zone, "@" for the apex
    pub record_name: String,
    /// Polling interval
    #[serde(default)]
    pub update_interval: UpdateInterval,
}

impl DnsimpleConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        require(&self.token, "Token is required")?;
        require(&self.account_id, "Account ID is required")?;
        require(&self.zone, "Zone is required")?;
        require(&self.record_name, "Record name is required")?;
        Ok(())
    }

    /// Render for display with the token masked
    pub fn to_redacted_json(&self) -> serde_json::Value {
        serde_json::json!({
            "account_id": self.account_id,
            "token": SECRET_MASK,
            "zone": self.zone,
            "record_name": self.record_name,
            "update_interval": self.update_interval.as_secs(),
        })
    }
}

impl std::fmt::Debug for DnsimpleConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsimpleConfig")
            .field("account_id", &self.account_id)
            .field("token", &"<REDACTED>")
            .field("zone", &self.zone)
            .field("record_name", &self.record_name)
            .field("update_interval", &self.update_interval)
            .finish()
    }
}

/// No-IP (username/password/hostname) configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct NoIpConfig {
    /// Account username or update group username
    pub username: String,
    /// Account password
    pub password: String,
    /// Fully-qualified hostname to update
    pub hostname: String,
    /// Polling interval
    #[serde(default)]
    pub update_interval: UpdateInterval,
}

impl NoIpConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        require(&self.username, "Username is required")?;
        require(&self.password, "Password is required")?;
        require(&self.hostname, "Hostname is required")?;
        Ok(())
    }

    /// Render for display with the password masked
    pub fn to_redacted_json(&self) -> serde_json::Value {
        serde_json::json!({
            "username": self.username,
            "password": SECRET_MASK,
            "hostname": self.hostname,
            "update_interval": self.update_interval.as_secs(),
        })
    }
}

impl std::fmt::Debug for NoIpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NoIpConfig")
            .field("username", &self.username)
            .field("password", &"<REDACTED>")
            .field("hostname", &self.hostname)
            .field("update_interval", &self.update_interval)
            .finish()
    }
}

/// DuckDNS (token/domain) configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct DuckDnsConfig {
    /// Account token
    pub token: String,
    /// Subdomain, with or without the ".duckdns.org" suffix
    pub domain: String,
    /// Polling interval
    #[serde(default)]
    pub update_interval: UpdateInterval,
}

impl DuckDnsConfig {
    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        require(&self.token, "Token is required")?;
        require(&self.domain, "Domain is required")?;
        Ok(())
    }

    /// Render for display with the token masked
    pub fn to_redacted_json(&self) -> serde_json::Value {
        serde_json::json!({
            "token": SECRET_MASK,
            "domain": self.domain,
            "update_interval": self.update_interval.as_secs(),
        })
    }
}

impl std::fmt::Debug for DuckDnsConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDnsConfig")
            .field("token", &"<REDACTED>")
            .field("domain", &self.domain)
            .field("update_interval", &self.update_interval)
            .finish()
    }
}

/// DNS provider configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// DNSimple REST API
    Dnsimple(DnsimpleConfig),

    /// No-IP dyn-update protocol
    #[serde(rename = "noip")]
    NoIp(NoIpConfig),

    /// DuckDNS update endpoint
    #[serde(rename = "duckdns")]
    DuckDns(DuckDnsConfig),
}

impl ProviderConfig {
    /// Validate the provider configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            ProviderConfig::Dnsimple(config) => config.validate(),
            ProviderConfig::NoIp(config) => config.validate(),
            ProviderConfig::DuckDns(config) => config.validate(),
        }
    }

    /// Get the provider type name
    pub fn type_name(&self) -> &'static str {
        match self {
            ProviderConfig::Dnsimple(_) => "dnsimple",
            ProviderConfig::NoIp(_) => "noip",
            ProviderConfig::DuckDns(_) => "duckdns",
        }
    }

    /// Polling interval carried by the provider configuration
    pub fn update_interval(&self) -> UpdateInterval {
        match self {
            ProviderConfig::Dnsimple(config) => config.update_interval,
            ProviderConfig::NoIp(config) => config.update_interval,
            ProviderConfig::DuckDns(config) => config.update_interval,
        }
    }

    /// Render for display with secrets masked
    pub fn to_redacted_json(&self) -> serde_json::Value {
        match self {
            ProviderConfig::Dnsimple(config) => config.to_redacted_json(),
            ProviderConfig::NoIp(config) => config.to_redacted_json(),
            ProviderConfig::DuckDns(config) => config.to_redacted_json(),
        }
    }
}

/// Highest accepted base retry delay, in seconds
pub const MAX_RETRY_DELAY_SECS: f64 = 300.0;

/// Resilient transport settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Total attempts per request before a connection failure is surfaced
    #[serde(default = "default_retries")]
    pub retries: u32,

    /// Per-attempt timeout (in seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Base delay between attempts (in seconds); attempt `n` waits `n * delay`
    #[serde(default = "default_retry_delay_secs")]
    pub retry_delay_secs: f64,
}

impl TransportConfig {
    /// Validate the transport configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.retries == 0 {
            return Err(crate::Error::config("Transport retries must be > 0"));
        }
        if self.timeout_secs == 0 {
            return Err(crate::Error::config("Transport timeout must be > 0"));
        }
        if !(0.0..=MAX_RETRY_DELAY_SECS).contains(&self.retry_delay_secs) {
            return Err(crate::Error::config(format!(
                "Transport retry delay must be between 0 and {} seconds. Got: {}",
                MAX_RETRY_DELAY_SECS, self.retry_delay_secs
            )));
        }
        Ok(())
    }

    /// Per-attempt timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Base retry delay
    ///
    /// Out-of-range values (only possible on an unvalidated config) read as
    /// zero.
    pub fn retry_delay(&self) -> Duration {
        if (0.0..=MAX_RETRY_DELAY_SECS).contains(&self.retry_delay_secs) {
            Duration::from_secs_f64(self.retry_delay_secs)
        } else {
            Duration::ZERO
        }
    }
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            retries: default_retries(),
            timeout_secs: default_timeout_secs(),
            retry_delay_secs: default_retry_delay_secs(),
        }
    }
}

fn default_retries() -> u32 {
    3
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_retry_delay_secs() -> f64 {
    1.0
}

/// IP resolution settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// "What is my IP" endpoint answering with a plain-text address
    #[serde(default = "default_echo_url")]
    pub echo_url: String,

    /// Lifetime of a single DNS query (in seconds)
    #[serde(default = "default_query_timeout_secs")]
    pub query_timeout_secs: u64,

    /// How long resolved authoritative nameservers are reused (in seconds)
    #[serde(default = "default_nameserver_cache_ttl_secs")]
    pub nameserver_cache_ttl_secs: u64,
}

impl ResolverConfig {
    /// Validate the resolver configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if !self.echo_url.starts_with("https://") && !self.echo_url.starts_with("http://") {
            return Err(crate::Error::config(format!(
                "Echo URL must use HTTP or HTTPS scheme. Got: {}",
                self.echo_url
            )));
        }
        if self.query_timeout_secs == 0 {
            return Err(crate::Error::config("DNS query timeout must be > 0"));
        }
        Ok(())
    }

    /// DNS query lifetime
    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            echo_url: default_echo_url(),
            query_timeout_secs: default_query_timeout_secs(),
            nameserver_cache_ttl_secs: default_nameserver_cache_ttl_secs(),
        }
    }
}

fn default_echo_url() -> String {
    DEFAULT_ECHO_URL.to_string()
}

fn default_query_timeout_secs() -> u64 {
    10
}

fn default_nameserver_cache_ttl_secs() -> u64 {
    crate::cache::NAMESERVER_CACHE_TTL_SECS
}

/// Main DDNS configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DdnsConfig {
    /// DNS provider configuration
    pub provider: ProviderConfig,

    /// Transport settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Resolution settings
    #[serde(default)]
    pub resolver: ResolverConfig,
}

impl DdnsConfig {
    /// Create a configuration with default transport and resolver settings
    pub fn new(provider: ProviderConfig) -> Self {
        Self {
            provider,
            transport: TransportConfig::default(),
            resolver: ResolverConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.provider.validate()?;
        self.transport.validate()?;
        self.resolver.validate()?;
        Ok(())
    }
}
