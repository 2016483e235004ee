//! ACK (Acknowledgment) message construction
//!
//! Builds the HL7 acknowledgement returned to the EPR for every parseable
//! inbound message. The MSH mirrors the inbound header with the sending and
//! receiving parties swapped; MSH-10 repeats the inbound control id so the
//! sender can correlate the response.

use chrono::Utc;
use dhc_core::{field::Field, message::Message, segment::Segment};

/// Acknowledgment codes (MSA-1)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AckCode {
    /// AA - Application Accept: message was successfully processed
    Accept,
    /// AE - Application Error: error in processing, sender may correct and resend
    Error,
    /// AR - Application Reject: message rejected, do not resend
    Reject,
}

impl AckCode {
    /// Get the HL7 code string
    pub fn as_str(&self) -> &'static str {
        match self {
            AckCode::Accept => "AA",
            AckCode::Error => "AE",
            AckCode::Reject => "AR",
        }
    }
}

/// Builder for ACK/NACK messages
#[derive(Debug, Clone)]
pub struct AckBuilder<'a> {
    original: &'a Message,
    ack_code: AckCode,
    error_code: Option<String>,
    error_msg: Option<String>,
    timestamp_override: Option<String>,
}

impl<'a> AckBuilder<'a> {
    /// Create an ACK builder for an inbound message
    pub fn for_message(original: &'a Message) -> Self {
        Self {
            original,
            ack_code: AckCode::Accept,
            error_code: None,
            error_msg: None,
            timestamp_override: None,
        }
    }

    /// Set the acknowledgment code
    pub fn ack_code(mut self, code: AckCode) -> Self {
        self.ack_code = code;
        self
    }

    /// Attach an ERR segment with the given error code and message
    pub fn error(mut self, error_code: &str, error_msg: &str) -> Self {
        self.error_code = Some(error_code.to_string());
        self.error_msg = Some(error_msg.to_string());
        self
    }

    /// Override MSH-7 (used by tests; defaults to now, UTC)
    pub fn timestamp(mut self, ts: &str) -> Self {
        self.timestamp_override = Some(ts.to_string());
        self
    }

    /// Build the ACK message
    pub fn build(self) -> Message {
        let mut message = Message::new();
        message.add_segment(self.build_msh());
        message.add_segment(self.build_msa());

        if self.error_code.is_some() || self.error_msg.is_some() {
            message.add_segment(self.build_err());
        }

        message
    }

    /// Build and encode in one step, segments separated by `\r`
    pub fn build_text(self) -> String {
        self.build().encode()
    }

    fn build_msh(&self) -> Segment {
        let mut msh = Segment::new("MSH");
        let delims = &self.original.delimiters;

        // MSH-1 / MSH-2
        msh.add_field(Field::from_value(delims.field_separator.to_string()));
        msh.add_field(Field::from_value(delims.encoding_characters()));

        // Sender and receiver swap roles in the response.
        msh.add_field(Field::from_value(
            self.original.receiving_application().unwrap_or(""),
        ));
        msh.add_field(Field::from_value(
            self.original.receiving_facility().unwrap_or(""),
        ));
        msh.add_field(Field::from_value(
            self.original.sending_application().unwrap_or(""),
        ));
        msh.add_field(Field::from_value(
            self.original.sending_facility().unwrap_or(""),
        ));

        // MSH-7: Date/Time of message
        let timestamp = self
            .timestamp_override
            .clone()
            .unwrap_or_else(|| Utc::now().format("%Y%m%d%H%M%S").to_string());
        msh.add_field(Field::from_value(timestamp));

        // MSH-8: Security (empty)
        msh.add_field(Field::from_value(""));

        // MSH-9: Message type
        msh.add_field(Field::from_value("ACK"));

        // MSH-10: control id repeats the inbound value, duplicates included
        msh.add_field(Field::from_value(self.original.control_id().unwrap_or("")));

        // MSH-11 / MSH-12 copied from the inbound message
        msh.add_field(Field::from_value(
            self.original.processing_id().unwrap_or("P"),
        ));
        msh.add_field(Field::from_value(
            self.original.version_id().unwrap_or("2.3"),
        ));

        msh
    }

    fn build_msa(&self) -> Segment {
        let mut msa = Segment::new("MSA");
        msa.add_field(Field::from_value(self.ack_code.as_str()));
        msa.add_field(Field::from_value(self.original.control_id().unwrap_or("")));
        msa
    }

    /// `ERR|||<error_code>|E||||<error_msg>`
    fn build_err(&self) -> Segment {
        let mut err = Segment::new("ERR");
        err.add_field(Field::from_value(""));
        err.add_field(Field::from_value(""));
        err.add_field(Field::from_value(self.error_code.as_deref().unwrap_or("")));
        err.add_field(Field::from_value("E"));
        err.add_field(Field::from_value(""));
        err.add_field(Field::from_value(""));
        err.add_field(Field::from_value(""));
        err.add_field(Field::from_value(self.error_msg.as_deref().unwrap_or("")));
        err
    }
}
