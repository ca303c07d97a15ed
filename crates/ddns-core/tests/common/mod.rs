//! Test doubles and common utilities for architecture contract tests
//!
//! This module provides minimal test doubles that verify architectural
//! constraints without touching the network.

#![allow(dead_code)]

use ddns_core::config::UpdateInterval;
use ddns_core::error::{Error, Result};
use ddns_core::traits::{DnsProvider, HttpTransport, IpStrategy};
use ddns_core::{CurrentIp, IpResolver, MockTransport, UpdateCoordinator};
use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What a [`ControlledStrategy`] answers
#[derive(Debug, Clone)]
pub enum Answer {
    Ip(Ipv4Addr),
    Absent,
    Fail(String),
}

/// An IpStrategy whose answer the test controls and can change between cycles
pub struct ControlledStrategy {
    name: &'static str,
    answer: Arc<Mutex<Answer>>,
    fail_init: Arc<AtomicBool>,
    init_call_count: Arc<AtomicUsize>,
    resolve_call_count: Arc<AtomicUsize>,
}

impl ControlledStrategy {
    pub fn new(name: &'static str, answer: Answer) -> Self {
        Self {
            name,
            answer: Arc::new(Mutex::new(answer)),
            fail_init: Arc::new(AtomicBool::new(false)),
            init_call_count: Arc::new(AtomicUsize::new(0)),
            resolve_call_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn ip(name: &'static str, ip: [u8; 4]) -> Self {
        Self::new(name, Answer::Ip(Ipv4Addr::from(ip)))
    }

    pub fn absent(name: &'static str) -> Self {
        Self::new(name, Answer::Absent)
    }

    pub fn failing(name: &'static str, message: &str) -> Self {
        Self::new(name, Answer::Fail(message.to_string()))
    }

    /// Change the answer for subsequent resolves
    pub fn set_answer(&self, answer: Answer) {
        *self.answer.lock().unwrap() = answer;
    }

    /// Make initialize() fail (or succeed again)
    pub fn set_fail_init(&self, fail: bool) {
        self.fail_init.store(fail, Ordering::SeqCst);
    }

    /// Get the number of times initialize() was called
    pub fn init_call_count(&self) -> usize {
        self.init_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times resolve() was called
    pub fn resolve_call_count(&self) -> usize {
        self.resolve_call_count.load(Ordering::SeqCst)
    }

    /// Create a new ControlledStrategy that shares answer and counters with an existing one
    pub fn sharing_counters_with(other: &Self) -> Self {
        Self {
            name: other.name,
            answer: Arc::clone(&other.answer),
            fail_init: Arc::clone(&other.fail_init),
            init_call_count: Arc::clone(&other.init_call_count),
            resolve_call_count: Arc::clone(&other.resolve_call_count),
        }
    }

    /// Boxed copy sharing state with `self`, ready to hand to an IpResolver
    pub fn boxed(&self) -> Box<dyn IpStrategy> {
        Box::new(Self::sharing_counters_with(self))
    }
}

#[async_trait::async_trait]
impl IpStrategy for ControlledStrategy {
    async fn initialize(&self) -> Result<()> {
        self.init_call_count.fetch_add(1, Ordering::SeqCst);
        if self.fail_init.load(Ordering::SeqCst) {
            return Err(Error::resolution(format!("{} init failed", self.name)));
        }
        Ok(())
    }

    async fn resolve(&self) -> Result<Option<Ipv4Addr>> {
        self.resolve_call_count.fetch_add(1, Ordering::SeqCst);
        match self.answer.lock().unwrap().clone() {
            Answer::Ip(ip) => Ok(Some(ip)),
            Answer::Absent => Ok(None),
            Answer::Fail(message) => Err(Error::resolution(message)),
        }
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// The three strategies of one resolver, kept for assertions
pub struct Strategies {
    pub authoritative: ControlledStrategy,
    pub system: ControlledStrategy,
    pub echo: ControlledStrategy,
}

impl Strategies {
    /// Authoritative answers `record`, system is absent, echo answers `current`
    pub fn new(record: [u8; 4], current: [u8; 4]) -> Self {
        Self {
            authoritative: ControlledStrategy::ip("authoritative", record),
            system: ControlledStrategy::absent("system"),
            echo: ControlledStrategy::ip("echo", current),
        }
    }

    pub fn resolver(&self, hostname: &str) -> IpResolver {
        IpResolver::new(
            hostname,
            self.authoritative.boxed(),
            self.system.boxed(),
            self.echo.boxed(),
        )
    }
}

/// How a [`MockDnsProvider`] responds to update_record()
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushBehavior {
    Accept,
    Decline,
    Fail,
}

/// A mock DnsProvider that tracks calls
pub struct MockDnsProvider {
    current_ip: CurrentIp,
    behavior: Mutex<PushBehavior>,
    update_call_count: AtomicUsize,
    pushed: Mutex<Vec<Ipv4Addr>>,
    interval: Mutex<UpdateInterval>,
    /// Provider name
    pub name: &'static str,
}

impl MockDnsProvider {
    pub fn new(name: &'static str) -> Self {
        Self {
            current_ip: CurrentIp::new(),
            behavior: Mutex::new(PushBehavior::Accept),
            update_call_count: AtomicUsize::new(0),
            pushed: Mutex::new(Vec::new()),
            interval: Mutex::new(UpdateInterval::default()),
            name,
        }
    }

    /// Start out believing `ip` is already published
    pub fn holding(name: &'static str, ip: [u8; 4]) -> Self {
        let provider = Self::new(name);
        provider.current_ip.set(Ipv4Addr::from(ip));
        provider
    }

    pub fn set_behavior(&self, behavior: PushBehavior) {
        *self.behavior.lock().unwrap() = behavior;
    }

    pub fn set_update_interval(&self, interval: UpdateInterval) {
        *self.interval.lock().unwrap() = interval;
    }

    /// Get the number of times update_record() was called
    pub fn update_call_count(&self) -> usize {
        self.update_call_count.load(Ordering::SeqCst)
    }

    /// The IP the provider currently holds
    pub fn current_ip_value(&self) -> Option<Ipv4Addr> {
        self.current_ip.get()
    }

    /// Get the IPs passed to update_record(), in order
    pub fn pushed_ips(&self) -> Vec<Ipv4Addr> {
        self.pushed.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl DnsProvider for MockDnsProvider {
    async fn validate_connection(&self) -> Result<bool> {
        Ok(true)
    }

    async fn update_record(&self, ip: Ipv4Addr) -> Result<bool> {
        self.update_call_count.fetch_add(1, Ordering::SeqCst);
        self.pushed.lock().unwrap().push(ip);

        let behavior = *self.behavior.lock().unwrap();
        match behavior {
            PushBehavior::Accept => {
                self.current_ip.set(ip);
                Ok(true)
            }
            PushBehavior::Decline => Ok(false),
            PushBehavior::Fail => Err(Error::update(self.name, "provider rejected the request")),
        }
    }

    fn current_ip(&self) -> Option<Ipv4Addr> {
        self.current_ip.get()
    }

    fn domain_name(&self) -> String {
        "home.example.com".to_string()
    }

    fn provider_name(&self) -> &'static str {
        self.name
    }

    fn extra_attributes(&self) -> BTreeMap<String, String> {
        BTreeMap::from([("record".to_string(), "home".to_string())])
    }

    fn update_interval(&self) -> UpdateInterval {
        *self.interval.lock().unwrap()
    }
}

/// Wire a coordinator over test doubles
pub fn coordinator(
    provider: &Arc<MockDnsProvider>,
    strategies: &Strategies,
    transport: &Arc<MockTransport>,
) -> UpdateCoordinator {
    let provider: Arc<dyn DnsProvider> = provider.clone();
    let transport: Arc<dyn HttpTransport> = transport.clone();
    UpdateCoordinator::new(provider, strategies.resolver("home.example.com"), transport)
}
