//! HL7 escape sequence encoding and decoding
//!
//! The connector uses the five bidirectional HL7 escape sequences:
//! - `\F\` - Field separator (`|`)
//! - `\S\` - Component separator (`^`)
//! - `\R\` - Repetition separator (`~`)
//! - `\T\` - Subcomponent separator (`&`)
//! - `\E\` - Escape character (`\`)
//!
//! Escaping is applied to free-text values at the point they are inserted
//! into a segment, never to structural delimiters.

use crate::delimiters::Delimiters;

pub struct Encoding;

impl Encoding {
    /// Escape a free-text value for inclusion in an HL7 field
    pub fn escape(input: &str) -> String {
        Self::escape_with(input, &Delimiters::default())
    }

    /// Escape a free-text value using specific delimiters
    pub fn escape_with(input: &str, delimiters: &Delimiters) -> String {
        let mut result = String::with_capacity(input.len());

        for ch in input.chars() {
            let code = if ch == delimiters.escape_character {
                Some('E')
            } else if ch == delimiters.field_separator {
                Some('F')
            } else if ch == delimiters.repetition_separator {
                Some('R')
            } else if ch == delimiters.component_separator {
                Some('S')
            } else if ch == delimiters.subcomponent_separator {
                Some('T')
            } else {
                None
            };

            match code {
                Some(code) => {
                    result.push(delimiters.escape_character);
                    result.push(code);
                    result.push(delimiters.escape_character);
                }
                None => result.push(ch),
            }
        }

        result
    }

    /// Reverse [`Encoding::escape`]: replace escape sequences with their
    /// literal characters. Sequences that are not one of the five known
    /// codes are preserved verbatim.
    pub fn unescape(input: &str) -> String {
        Self::unescape_with(input, &Delimiters::default())
    }

    /// Unescape using specific delimiters
    pub fn unescape_with(input: &str, delimiters: &Delimiters) -> String {
        let mut result = String::with_capacity(input.len());
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != delimiters.escape_character {
                result.push(ch);
                continue;
            }

            let mut sequence = String::new();
            let mut terminated = false;
            while let Some(&next) = chars.peek() {
                chars.next();
                if next == delimiters.escape_character {
                    terminated = true;
                    break;
                }
                sequence.push(next);
            }

            if !terminated {
                // Trailing lone escape; keep what we consumed.
                result.push(delimiters.escape_character);
                result.push_str(&sequence);
                continue;
            }

            match sequence.as_str() {
                "E" => result.push(delimiters.escape_character),
                "F" => result.push(delimiters.field_separator),
                "R" => result.push(delimiters.repetition_separator),
                "S" => result.push(delimiters.component_separator),
                "T" => result.push(delimiters.subcomponent_separator),
                other => {
                    result.push(delimiters.escape_character);
                    result.push_str(other);
                    result.push(delimiters.escape_character);
                }
            }
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_delimiters() {
        assert_eq!(Encoding::escape("|"), "\\F\\");
        assert_eq!(Encoding::escape("^"), "\\S\\");
        assert_eq!(Encoding::escape("&"), "\\T\\");
        assert_eq!(Encoding::escape("~"), "\\R\\");
        assert_eq!(Encoding::escape("\\"), "\\E\\");
    }

    #[test]
    fn test_escape_mixed() {
        assert_eq!(
            Encoding::escape("Test|Value^Component"),
            "Test\\F\\Value\\S\\Component"
        );
    }

    #[test]
    fn test_escape_plain_text_unchanged() {
        assert_eq!(Encoding::escape("Humidified 35%"), "Humidified 35%");
    }

    #[test]
    fn test_unescape_delimiters() {
        assert_eq!(Encoding::unescape("\\F\\"), "|");
        assert_eq!(Encoding::unescape("\\S\\"), "^");
        assert_eq!(Encoding::unescape("\\T\\"), "&");
        assert_eq!(Encoding::unescape("\\R\\"), "~");
        assert_eq!(Encoding::unescape("\\E\\"), "\\");
    }

    #[test]
    fn test_unescape_unknown_sequence_preserved() {
        assert_eq!(Encoding::unescape("\\X0D\\"), "\\X0D\\");
    }

    #[test]
    fn test_roundtrip() {
        let original = "Test|Value^Component&Sub~Rep\\Escape";
        let escaped = Encoding::escape(original);
        assert_eq!(Encoding::unescape(&escaped), original);
    }
}
