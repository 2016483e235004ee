//! Trustomer configuration types
//!
//! A trustomer is a (tenant, customer) pair; its configuration drives
//! per-site behaviour of the outgoing HL7 surface.

use serde::{Deserialize, Serialize};

/// Per-trustomer configuration as served by the trustomer API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrustomerConfig {
    pub hl7_config: Hl7Config,
    pub send_config: SendConfig,
}

/// Settings for outgoing HL7 v2 messages
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hl7Config {
    /// strftime-style format for outgoing timestamps; `%L` means the
    /// three-digit millisecond fraction
    pub outgoing_timestamp_format: String,
    pub outgoing_sending_application: String,
    pub outgoing_sending_facility: String,
    pub outgoing_receiving_application: String,
    pub outgoing_receiving_facility: String,
    pub outgoing_processing_id: String,
}

/// Settings for the outbound (SEND) product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendConfig {
    pub generate_oru_messages: bool,
    #[serde(default)]
    pub oxygen_masks: Vec<OxygenMask>,
}

/// An oxygen mask known to the trust
///
/// The code may contain a literal `{mask_percent}` placeholder, substituted
/// with the observed oxygen percentage at ORU generation time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OxygenMask {
    pub code: String,
    pub name: String,
}
