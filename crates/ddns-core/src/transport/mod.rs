//! Transport implementations that live in the core crate
//!
//! The production transport is in `ddns-http`; this module only carries the
//! deterministic fixture used by tests across the workspace.

pub mod mock;

pub use mock::MockTransport;
