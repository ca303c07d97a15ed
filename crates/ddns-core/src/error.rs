//! Error types for the DDNS system
//!
//! Every layer above the transport reports failures through [`Error`]. The
//! variants follow the failure taxonomy the setup and steady-state paths care
//! about: bad credentials, bad configuration, connectivity, DNS resolution and
//! provider-side anomalies.

use thiserror::Error;

/// Result type alias for DDNS operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for the DDNS system
#[derive(Error, Debug)]
pub enum Error {
    /// Credentials were rejected by the provider (user-actionable, never retried)
    #[error("Authentication failed: {0}")]
    Authentication(String),

    /// Structurally invalid configuration, or credentials that do not match
    /// the configured resource
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Network/transport failure, surfaced only after the transport has
    /// exhausted its retries
    #[error("Connection failed ({url}): {message}")]
    Connection {
        /// Request URL, without its query string
        url: String,
        /// Last underlying error
        message: String,
    },

    /// The DNS lookup path failed
    #[error("Resolution failed: {0}")]
    Resolution(String),

    /// Provider-side anomaly that fits none of the above
    #[error("Update failed ({provider}): {message}")]
    Update {
        /// Provider name
        provider: String,
        /// Error message
        message: String,
    },
}

impl Error {
    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Authentication(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a connection error for the given URL
    pub fn connection(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Connection {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Create a resolution error
    pub fn resolution(msg: impl Into<String>) -> Self {
        Self::Resolution(msg.into())
    }

    /// Create a provider update error
    pub fn update(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Update {
            provider: provider.into(),
            message: message.into(),
        }
    }

    /// Whether retrying the same request could succeed
    ///
    /// Only transport-level failures qualify. HTTP error statuses never reach
    /// this type from the transport, so they are not covered here.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Connection { .. })
    }
}
