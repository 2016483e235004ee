//! HL7 segment structures

use crate::delimiters::Delimiters;
use crate::error::{Error, Result};
use crate::field::Field;

/// An HL7 segment
///
/// A segment consists of a 3-character segment ID (e.g., "MSH", "PID") and
/// fields separated by the field separator.
///
/// Note: For MSH segments, the encoding is special: MSH-1 is the field
/// separator itself and MSH-2 the encoding characters, so the wire form is
/// `MSH|^~\&|...`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    /// Segment ID (3 characters, e.g., "MSH", "PID")
    pub id: String,
    /// Fields in the segment (excluding the segment ID)
    pub fields: Vec<Field>,
}

impl Segment {
    /// Create a new segment with the given ID
    pub fn new<S: Into<String>>(id: S) -> Self {
        Self {
            id: id.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the segment
    pub fn add_field(&mut self, field: Field) {
        self.fields.push(field);
    }

    /// Get a field by index (1-based, as per HL7 convention)
    ///
    /// Note: Field 0 is the segment ID itself
    pub fn get_field(&self, index: usize) -> Option<&Field> {
        if index == 0 {
            None
        } else {
            self.fields.get(index - 1)
        }
    }

    /// Get a field value as a string (convenience method)
    pub fn get_field_value(&self, index: usize) -> Option<&str> {
        self.get_field(index).and_then(|f| f.value())
    }

    /// Set a field value at the given index (1-based), extending the
    /// fields vector with empty fields if necessary
    pub fn set_field_value<S: Into<String>>(&mut self, index: usize, value: S) -> Result<()> {
        if index == 0 {
            return Err(Error::InvalidFieldAccess(
                "Cannot set field 0 (segment ID)".to_string(),
            ));
        }

        let field_index = index - 1;
        while self.fields.len() <= field_index {
            self.fields.push(Field::new());
        }
        self.fields[field_index] = Field::from_value(value);
        Ok(())
    }

    /// Get the number of fields (excluding segment ID)
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Encode the segment to HL7 format
    pub fn encode(&self, delimiters: &Delimiters) -> String {
        let mut result = self.id.clone();

        if self.id == "MSH" {
            // MSH-1 is the separator itself, MSH-2 the encoding characters.
            result.push(delimiters.field_separator);
            result.push_str(&delimiters.encoding_characters());

            for field in self.fields.iter().skip(2) {
                result.push(delimiters.field_separator);
                result.push_str(&field.encode(delimiters));
            }
        } else {
            for field in &self.fields {
                result.push(delimiters.field_separator);
                result.push_str(&field.encode(delimiters));
            }
        }

        result
    }

    /// Validate segment ID (must be 3 alphanumeric characters)
    pub fn validate_id(&self) -> Result<()> {
        if self.id.len() != 3 {
            return Err(Error::InvalidSegment(format!(
                "Segment ID must be 3 characters, got: {}",
                self.id
            )));
        }

        if !self.id.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(Error::InvalidSegment(format!(
                "Segment ID must be alphanumeric, got: {}",
                self.id
            )));
        }

        Ok(())
    }
}
