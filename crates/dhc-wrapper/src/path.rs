//! Field path parsing
//!
//! This module handles parsing of dotted HL7 field paths like `PID.F3.R1.C5`.

use dhc_core::error::{Error, Result};

/// Parsed field path
///
/// Grammar: `SEG.F<n>[.R<r>][.C<c>][.S<s>]`, all indices 1-based. By HL7
/// convention `MSH.F1` addresses the field-separator literal itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    pub segment_id: String,
    pub field: usize,
    pub repetition: Option<usize>,
    pub component: Option<usize>,
    pub subcomponent: Option<usize>,
}

impl FieldPath {
    /// Parse a dotted field path string
    ///
    /// Examples:
    /// - `MSH.F9` (whole field 9 of the MSH segment)
    /// - `PID.F5.R1.C2` (field 5, first repetition, component 2)
    /// - `PID.F3.R2.C4.S1` (down to the subcomponent)
    pub fn parse(path: &str) -> Result<Self> {
        let mut parts = path.split('.');

        let segment_id = match parts.next() {
            Some(id) if id.len() == 3 && id.chars().all(|c| c.is_ascii_alphanumeric()) => {
                id.to_string()
            }
            _ => return Err(Error::field_path(format!("Invalid segment ID in '{path}'"))),
        };

        let field = match parts.next() {
            Some(part) => Self::parse_index(part, 'F', path)?,
            None => return Err(Error::field_path(format!("Missing field index in '{path}'"))),
        };

        let mut repetition = None;
        let mut component = None;
        let mut subcomponent = None;

        for (slot, prefix) in [
            (&mut repetition, 'R'),
            (&mut component, 'C'),
            (&mut subcomponent, 'S'),
        ] {
            match parts.clone().next() {
                Some(part) if part.starts_with(prefix) => {
                    *slot = Some(Self::parse_index(part, prefix, path)?);
                    parts.next();
                }
                _ => {}
            }
        }

        if parts.next().is_some() {
            return Err(Error::field_path(format!("Trailing path elements in '{path}'")));
        }

        Ok(FieldPath {
            segment_id,
            field,
            repetition,
            component,
            subcomponent,
        })
    }

    /// Parse a single `<prefix><n>` element with a 1-based index
    fn parse_index(part: &str, prefix: char, path: &str) -> Result<usize> {
        let digits = part
            .strip_prefix(prefix)
            .ok_or_else(|| Error::field_path(format!("Expected '{prefix}<n>' in '{path}'")))?;

        let index: usize = digits
            .parse()
            .map_err(|_| Error::field_path(format!("Invalid index '{part}' in '{path}'")))?;

        if index == 0 {
            return Err(Error::field_path(format!(
                "Index in '{part}' must be 1-based in '{path}'"
            )));
        }

        Ok(index)
    }
}
