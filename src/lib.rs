//! # Alliant Energy - electric usage poller
//!
//! Logs in to the Alliant Energy customer portal API, discovers the
//! account's meter, and turns historical and projected usage into a
//! snapshot of usage, cost and billing period figures.
//!
//! ## Features
//!
//! - **Session handling**: token refresh ahead of expiry, full login as fallback
//! - **Credential cache**: pluggable store so restarts skip the login
//! - **Cost estimation**: per-kWh rate from the last bill when the provider reports no cost
//! - **Polling**: fixed-interval coordinator publishing on a watch channel
//! - **Configuration**: YAML-based configuration with validation
//!
//! ## Architecture
//!
//! - `config`: Configuration management and validation
//! - `logging`: Structured logging and tracing
//! - `api`: Shared HTTP headers and request builders
//! - `account`: Account, premise and meter discovery
//! - `session`: Token lifecycle
//! - `cache`: Credential store trait and implementations
//! - `usage`: Historical and projected usage requests
//! - `derive`: Pure derivation of the usage snapshot
//! - `client`: One poll cycle end to end
//! - `poller`: Interval scheduling
//! - `sensors`: Published data points and attributes

pub mod account;
pub mod api;
pub mod cache;
pub mod client;
pub mod config;
pub mod derive;
pub mod error;
pub mod logging;
pub mod poller;
pub mod sensors;
pub mod session;
pub mod snapshot;
pub mod usage;

// Re-export commonly used types
pub use client::{AlliantClient, CredentialCheck, validate_credentials};
pub use config::Config;
pub use error::{AlliantError, Result};
pub use snapshot::UsageSnapshot;
