//! Update coordinator
//!
//! The UpdateCoordinator is responsible for:
//! - Resolving the published record value and the current public IP
//! - Deciding whether the provider needs a push, and why
//! - Delegating the push to the DnsProvider
//! - Classifying each cycle into an [`UpdateOutcome`]
//!
//! ## Architecture
//!
//! ```text
//!                         ┌───────────────────┐
//!                         │ UpdateCoordinator │
//!                         └───────────────────┘
//!                                   │
//!         ┌─────────────────────────┼─────────────────────────┐
//!         │                         │                         │
//!         ▼                         ▼                         ▼
//! ┌──────────────┐         ┌──────────────┐         ┌──────────────────┐
//! │  IpResolver  │         │ DnsProvider  │         │ watch::Sender    │
//! │ (get_ip,     │         │ (update)     │         │ (latest outcome) │
//! │  current_ip) │         └──────────────┘         └──────────────────┘
//! └──────────────┘
//! ```
//!
//! ## Cycle
//!
//! 1. Resolve the record value and the current public IP
//! 2. No current IP: the cycle ends with `Error`
//! 3. Compare the current IP with the provider's held IP and the record
//! 4. Nothing differs: `NoUpdate`
//! 5. Otherwise push: `Success` or `Failed`
//! 6. Any error along the way becomes `Error`; the polling loop carries on
//!
//! Nothing is retried within a cycle. The next tick is the recovery path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{oneshot, watch};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::resolver::IpResolver;
use crate::traits::{DnsProvider, HttpTransport};

/// Reason recorded when the held IP differs from the current IP
pub const REASON_LOCAL_MISMATCH: &str = "local IP cache mismatch";

/// Reason recorded when the published record differs from the current IP
pub const REASON_RECORD_MISMATCH: &str = "DNS record mismatch";

/// Reason recorded when nothing needed pushing
pub const REASON_NO_UPDATE: &str = "no update needed";

/// Reason recorded when the public IP could not be determined
pub const REASON_NO_CURRENT_IP: &str = "failed to determine current IP";

/// Status token of an outcome, as exposed in reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UpdateStatus {
    /// Provider confirmed the push
    #[serde(rename = "success")]
    Success,
    /// Provider declined the push
    #[serde(rename = "failed")]
    Failed,
    /// Nothing to push
    #[serde(rename = "no_update_needed")]
    NoUpdate,
    /// The cycle failed
    #[serde(rename = "error")]
    Error,
}

impl UpdateStatus {
    /// Wire token
    pub fn as_str(&self) -> &'static str {
        match self {
            UpdateStatus::Success => "success",
            UpdateStatus::Failed => "failed",
            UpdateStatus::NoUpdate => "no_update_needed",
            UpdateStatus::Error => "error",
        }
    }
}

impl std::fmt::Display for UpdateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of one update cycle
///
/// Produced once per cycle and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The provider confirmed the push of `ip`
    Success {
        ip: Ipv4Addr,
        record: Ipv4Addr,
        reasons: Vec<String>,
    },

    /// The provider declined the push of `ip` without an error
    Failed {
        ip: Ipv4Addr,
        record: Ipv4Addr,
        reasons: Vec<String>,
    },

    /// Record, held IP and current IP already agree
    NoUpdate {
        ip: Ipv4Addr,
        record: Ipv4Addr,
        reasons: Vec<String>,
    },

    /// Resolution or the provider call failed
    Error { reasons: Vec<String> },
}

impl UpdateOutcome {
    /// Status token of this outcome
    pub fn status(&self) -> UpdateStatus {
        match self {
            UpdateOutcome::Success { .. } => UpdateStatus::Success,
            UpdateOutcome::Failed { .. } => UpdateStatus::Failed,
            UpdateOutcome::NoUpdate { .. } => UpdateStatus::NoUpdate,
            UpdateOutcome::Error { .. } => UpdateStatus::Error,
        }
    }

    /// The current public IP the cycle worked with
    pub fn ip(&self) -> Option<Ipv4Addr> {
        match self {
            UpdateOutcome::Success { ip, .. }
            | UpdateOutcome::Failed { ip, .. }
            | UpdateOutcome::NoUpdate { ip, .. } => Some(*ip),
            UpdateOutcome::Error { .. } => None,
        }
    }

    /// The published record value the cycle saw
    pub fn record(&self) -> Option<Ipv4Addr> {
        match self {
            UpdateOutcome::Success { record, .. }
            | UpdateOutcome::Failed { record, .. }
            | UpdateOutcome::NoUpdate { record, .. } => Some(*record),
            UpdateOutcome::Error { .. } => None,
        }
    }

    /// Human-readable reasons
    pub fn reasons(&self) -> &[String] {
        match self {
            UpdateOutcome::Success { reasons, .. }
            | UpdateOutcome::Failed { reasons, .. }
            | UpdateOutcome::NoUpdate { reasons, .. }
            | UpdateOutcome::Error { reasons } => reasons,
        }
    }

    /// Check if the provider confirmed a push
    pub fn is_success(&self) -> bool {
        matches!(self, UpdateOutcome::Success { .. })
    }

    /// Serializable report of this outcome
    pub fn report(&self) -> UpdateReport {
        UpdateReport {
            ip: self.ip(),
            dns_record: self.record(),
            last_update: self.status(),
            update_reason: self.reasons().to_vec(),
        }
    }
}

/// Observable-state shape of an [`UpdateOutcome`]
///
/// ```json
/// {"ip": "2.2.2.2", "dns_record": "1.1.1.1", "last_update": "success",
///  "update_reason": ["local IP cache mismatch", "DNS record mismatch"]}
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReport {
    pub ip: Option<Ipv4Addr>,
    pub dns_record: Option<Ipv4Addr>,
    pub last_update: UpdateStatus,
    pub update_reason: Vec<String>,
}

/// Snapshot of a coordinator's identity and latest state
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub domain: String,
    pub provider: String,
    pub display_name: String,
    pub update_interval_secs: u64,
    pub current_ip: Option<Ipv4Addr>,
    pub attributes: BTreeMap<String, String>,
    pub last_report: Option<UpdateReport>,
    /// RFC 3339 timestamp, or "never"
    pub last_update_success: String,
}

/// Reasons an update is needed, empty when none is
///
/// Both mismatches may apply at once.
pub fn update_reasons(current: Ipv4Addr, held: Option<Ipv4Addr>, record: Ipv4Addr) -> Vec<String> {
    let mut reasons = Vec::new();
    if held != Some(current) {
        reasons.push(REASON_LOCAL_MISMATCH.to_string());
    }
    if record != current {
        reasons.push(REASON_RECORD_MISMATCH.to_string());
    }
    reasons
}

/// Drives update cycles for one managed record
///
/// ## Lifecycle
///
/// 1. Create with [`UpdateCoordinator::new()`]
/// 2. Either drive cycles yourself ([`start`](Self::start) /
///    [`refresh`](Self::refresh) / [`stop`](Self::stop)) or hand control to
///    [`run`](Self::run) until a shutdown signal
/// 3. Observe outcomes via [`subscribe`](Self::subscribe) or
///    [`diagnostics`](Self::diagnostics)
///
/// ## Threading
///
/// Cycles for one coordinator are not expected to overlap; `run` guarantees
/// that by driving them from a single task.
pub struct UpdateCoordinator {
    provider: Arc<dyn DnsProvider>,
    resolver: IpResolver,
    transport: Arc<dyn HttpTransport>,
    outcome_tx: watch::Sender<Option<UpdateOutcome>>,
    last_success: Mutex<Option<DateTime<Utc>>>,
}

impl UpdateCoordinator {
    /// Create a coordinator
    ///
    /// # Parameters
    ///
    /// - `provider`: DNS provider owning the managed record
    /// - `resolver`: resolver for the same hostname
    /// - `transport`: transport shared by the provider and the echo strategy,
    ///   released on [`stop`](Self::stop)
    pub fn new(
        provider: Arc<dyn DnsProvider>,
        resolver: IpResolver,
        transport: Arc<dyn HttpTransport>,
    ) -> Self {
        let (outcome_tx, _) = watch::channel(None);
        Self {
            provider,
            resolver,
            transport,
            outcome_tx,
            last_success: Mutex::new(None),
        }
    }

    /// Run the first cycle
    pub async fn start(&self) -> UpdateOutcome {
        info!("{}: starting", self.provider.display_name());
        self.refresh().await
    }

    /// Release transport resources
    pub async fn stop(&self) {
        self.transport.close().await;
        info!("{}: stopped", self.provider.display_name());
    }

    /// Run one cycle and publish its outcome
    pub async fn refresh(&self) -> UpdateOutcome {
        let outcome = self.run_cycle().await;

        if outcome.is_success() {
            *self.last_success.lock().unwrap_or_else(PoisonError::into_inner) = Some(Utc::now());
        }
        self.outcome_tx.send_replace(Some(outcome.clone()));

        outcome
    }

    /// Run one cycle without publishing
    ///
    /// Never fails: errors are folded into [`UpdateOutcome::Error`].
    pub async fn run_cycle(&self) -> UpdateOutcome {
        let domain = self.provider.domain_name();

        if let Some(last) = self.last_success() {
            debug!(
                "{}: {}s since last successful update (interval: {}s)",
                domain,
                (Utc::now() - last).num_seconds(),
                self.provider.update_interval().as_secs()
            );
        }
        debug!("{}: starting update at {}", domain, Utc::now().to_rfc3339());

        match self.evaluate(&domain).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("{}: {}", domain, e);
                UpdateOutcome::Error {
                    reasons: vec![e.to_string()],
                }
            }
        }
    }

    async fn evaluate(&self, domain: &str) -> Result<UpdateOutcome> {
        let record = self.resolver.get_ip().await?;
        debug!("{}: current DNS record: {}", domain, record);

        let current = match self.resolver.get_current_ip().await? {
            Some(ip) => ip,
            None => {
                error!("{}: {}", domain, REASON_NO_CURRENT_IP);
                return Ok(UpdateOutcome::Error {
                    reasons: vec![REASON_NO_CURRENT_IP.to_string()],
                });
            }
        };
        debug!("{}: current public IP: {}", domain, current);

        let held = self.provider.current_ip();
        let reasons = update_reasons(current, held, record);

        if reasons.is_empty() {
            debug!("{}: no update needed, IP and DNS record match", domain);
            return Ok(UpdateOutcome::NoUpdate {
                ip: current,
                record,
                reasons: vec![REASON_NO_UPDATE.to_string()],
            });
        }

        debug!(
            "{}: update needed (current: {}, record: {}, held: {:?}, reasons: {})",
            domain,
            current,
            record,
            held,
            reasons.join(", ")
        );

        if self.provider.update_record(current).await? {
            info!("{}: updated DNS record to {}", domain, current);
            Ok(UpdateOutcome::Success {
                ip: current,
                record,
                reasons,
            })
        } else {
            warn!("{}: provider declined the update to {}", domain, current);
            Ok(UpdateOutcome::Failed {
                ip: current,
                record,
                reasons,
            })
        }
    }

    /// Run cycles until `shutdown` fires
    ///
    /// Runs one cycle immediately, then one per configured update interval.
    /// Dropping the shutdown sender also stops the loop. The transport is
    /// released before returning.
    pub async fn run(&self, mut shutdown: oneshot::Receiver<()>) {
        self.start().await;

        let period = self.provider.update_interval().as_duration();
        let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.refresh().await;
                }

                _ = &mut shutdown => {
                    info!("{}: shutdown signal received", self.provider.display_name());
                    break;
                }
            }
        }

        self.stop().await;
    }

    /// Watch the latest outcome
    pub fn subscribe(&self) -> watch::Receiver<Option<UpdateOutcome>> {
        self.outcome_tx.subscribe()
    }

    /// The latest published outcome
    pub fn latest(&self) -> Option<UpdateOutcome> {
        self.outcome_tx.borrow().clone()
    }

    /// When the provider last confirmed a push
    pub fn last_success(&self) -> Option<DateTime<Utc>> {
        *self.last_success.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// The managed provider
    pub fn provider(&self) -> &Arc<dyn DnsProvider> {
        &self.provider
    }

    /// Identity and latest state
    pub fn diagnostics(&self) -> Diagnostics {
        Diagnostics {
            domain: self.provider.domain_name(),
            provider: self.provider.provider_name().to_string(),
            display_name: self.provider.display_name(),
            update_interval_secs: self.provider.update_interval().as_secs(),
            current_ip: self.provider.current_ip(),
            attributes: self.provider.extra_attributes(),
            last_report: self.latest().map(|outcome| outcome.report()),
            last_update_success: self
                .last_success()
                .map(|at| at.to_rfc3339())
                .unwrap_or_else(|| "never".to_string()),
        }
    }
}
