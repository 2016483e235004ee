//! The persisted HL7 message record

use chrono::{DateTime, Utc};
use dhc_wrapper::Hl7Wrapper;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Routing descriptor for the internal platform
pub const SOURCE_DHOS: &str = "dhos";
/// Routing descriptor for the trust integration engine
pub const SOURCE_TIE: &str = "tie";
/// Routing descriptor for the CDA SOAP endpoint
pub const DEST_MIRTH: &str = "mirth";

/// A persisted HL7 message, inbound or outbound
///
/// `content` holds the decoded HL7 v2 text (or an XML CDA document);
/// `message_control_id` is globally unique or NULL (NULL marks a record
/// that was accepted but detected as a duplicate).
#[derive(Debug, Clone, PartialEq)]
pub struct Hl7Message {
    pub uuid: String,
    pub created: DateTime<Utc>,
    pub created_by: String,
    pub modified: DateTime<Utc>,
    pub modified_by: String,
    pub content: Option<String>,
    pub message_type: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub is_processed: bool,
    pub src_description: Option<String>,
    pub dst_description: Option<String>,
    pub message_control_id: Option<String>,
    pub ack: Option<String>,
    pub patient_identifiers: Option<Value>,
}

impl Hl7Message {
    /// A fresh unprocessed record with a new uuid
    pub fn new(src_description: &str, dst_description: &str) -> Self {
        let now = Utc::now();
        Self {
            uuid: Uuid::new_v4().to_string(),
            created: now,
            created_by: "system".to_string(),
            modified: now,
            modified_by: "system".to_string(),
            content: None,
            message_type: None,
            sent_at: None,
            is_processed: false,
            src_description: Some(src_description.to_string()),
            dst_description: Some(dst_description.to_string()),
            message_control_id: None,
            ack: None,
            patient_identifiers: None,
        }
    }

    /// Derived lifecycle status
    ///
    /// `is_processed` is terminal; otherwise a record sourced from the
    /// platform counts as sent, anything else as received.
    pub fn status(&self) -> &'static str {
        if self.is_processed {
            "processed"
        } else if self.src_description.as_deref() == Some(SOURCE_DHOS) {
            "sent"
        } else {
            "received"
        }
    }

    /// MSA-1 of the stored ACK, or `None` when absent or unparseable
    pub fn ack_status(&self) -> Option<String> {
        let ack = self.ack.as_deref()?;
        let wrapper = Hl7Wrapper::parse(ack).ok()?;
        wrapper.field("MSA.F1")
    }

    /// The JSON shape returned by the REST surface
    pub fn to_response(&self) -> MessageResponse {
        MessageResponse {
            uuid: self.uuid.clone(),
            created: self.created,
            created_by: self.created_by.clone(),
            modified: self.modified,
            modified_by: self.modified_by.clone(),
            content: self.content.clone(),
            message_type: self.message_type.clone(),
            sent_at: self.sent_at,
            is_processed: self.is_processed,
            src_description: self.src_description.clone(),
            dst_description: self.dst_description.clone(),
            message_control_id: self.message_control_id.clone(),
            ack_status: self.ack_status(),
        }
    }
}

/// Serialized message record for API responses
#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub uuid: String,
    pub created: DateTime<Utc>,
    pub created_by: String,
    pub modified: DateTime<Utc>,
    pub modified_by: String,
    pub content: Option<String>,
    pub message_type: Option<String>,
    pub sent_at: Option<DateTime<Utc>>,
    pub is_processed: bool,
    pub src_description: Option<String>,
    pub dst_description: Option<String>,
    pub message_control_id: Option<String>,
    pub ack_status: Option<String>,
}

/// Updatable fields of a message record
#[derive(Debug, Clone, Default)]
pub struct MessagePatch {
    pub is_processed: Option<bool>,
    pub ack: Option<String>,
}
