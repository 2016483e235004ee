//! HL7 message structures

use crate::delimiters::Delimiters;
use crate::error::{Error, Result};
use crate::segment::Segment;

/// An HL7 message
///
/// A message consists of multiple segments, starting with an MSH segment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    /// Message segments
    pub segments: Vec<Segment>,
    /// Delimiters used in this message
    pub delimiters: Delimiters,
}

impl Message {
    /// Create a new empty message with default delimiters
    pub fn new() -> Self {
        Self {
            segments: Vec::new(),
            delimiters: Delimiters::default(),
        }
    }

    /// Create a new message with custom delimiters
    pub fn with_delimiters(delimiters: Delimiters) -> Self {
        Self {
            segments: Vec::new(),
            delimiters,
        }
    }

    /// Add a segment to the message
    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Get the first segment with a specific ID
    pub fn segment(&self, id: &str) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id == id)
    }

    /// Get all segments with a specific ID
    pub fn segments_by_id(&self, id: &str) -> Vec<&Segment> {
        self.segments.iter().filter(|s| s.id == id).collect()
    }

    /// Test whether the message contains a segment with the given ID
    pub fn contains_segment(&self, id: &str) -> bool {
        self.segments.iter().any(|s| s.id == id)
    }

    /// Get the MSH segment (always the first segment)
    pub fn msh(&self) -> Option<&Segment> {
        self.segments.first().filter(|s| s.id == "MSH")
    }

    /// The full MSH-9 text, components included (e.g. `ADT^A01`)
    pub fn message_type(&self) -> Option<String> {
        self.msh()
            .and_then(|msh| msh.get_field(9))
            .map(|field| field.encode(&self.delimiters))
    }

    /// The message control ID from MSH-10
    pub fn control_id(&self) -> Option<&str> {
        self.msh().and_then(|msh| msh.get_field_value(10))
    }

    /// Sending application from MSH-3
    pub fn sending_application(&self) -> Option<&str> {
        self.msh().and_then(|msh| msh.get_field_value(3))
    }

    /// Sending facility from MSH-4
    pub fn sending_facility(&self) -> Option<&str> {
        self.msh().and_then(|msh| msh.get_field_value(4))
    }

    /// Receiving application from MSH-5
    pub fn receiving_application(&self) -> Option<&str> {
        self.msh().and_then(|msh| msh.get_field_value(5))
    }

    /// Receiving facility from MSH-6
    pub fn receiving_facility(&self) -> Option<&str> {
        self.msh().and_then(|msh| msh.get_field_value(6))
    }

    /// Processing ID from MSH-11
    pub fn processing_id(&self) -> Option<&str> {
        self.msh().and_then(|msh| msh.get_field_value(11))
    }

    /// Version ID from MSH-12
    pub fn version_id(&self) -> Option<&str> {
        self.msh().and_then(|msh| msh.get_field_value(12))
    }

    /// Validate the message structure
    pub fn validate(&self) -> Result<()> {
        if self.segments.is_empty() {
            return Err(Error::InvalidSegment(
                "Message must contain at least one segment".to_string(),
            ));
        }

        if self.segments[0].id != "MSH" {
            return Err(Error::InvalidSegment(
                "First segment must be MSH".to_string(),
            ));
        }

        for segment in &self.segments {
            segment.validate_id()?;
        }

        self.delimiters.validate()?;

        Ok(())
    }

    /// Encode the message to HL7 format, segments separated by `\r`
    pub fn encode(&self) -> String {
        self.encode_with_separator("\r")
    }

    /// Encode with a custom segment separator
    pub fn encode_with_separator(&self, separator: &str) -> String {
        self.segments
            .iter()
            .map(|s| s.encode(&self.delimiters))
            .collect::<Vec<_>>()
            .join(separator)
    }

    /// Get the number of segments
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }
}

impl Default for Message {
    fn default() -> Self {
        Self::new()
    }
}
