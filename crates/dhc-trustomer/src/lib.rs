//! Trustomer configuration: types, fetch client, and TTL cache.
//!
//! Per-site behaviour of the HL7 surface (timestamp format, MSH routing
//! fields, ORU enablement, oxygen mask codes) comes from the remote
//! trustomer API. The [`TrustomerCache`] keeps a short-TTL copy and prefers
//! a stale value over a hard failure.

pub mod cache;
pub mod client;
pub mod config;

use thiserror::Error;

pub use cache::TrustomerCache;
pub use client::TrustomerClient;
pub use config::{Hl7Config, OxygenMask, SendConfig, TrustomerConfig};

#[derive(Error, Debug)]
pub enum TrustomerError {
    #[error("Trustomer API request failed: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Trustomer API returned status {0}")]
    UnexpectedStatus(u16),

    #[error("No trustomer configuration source configured")]
    NotConfigured,
}
