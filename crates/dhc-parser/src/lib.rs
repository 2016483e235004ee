//! Parser for HL7 v2.x messages in ER7 (pipe-delimited) encoding.
//!
//! Segment boundaries are normalised first: EPR feeds routinely deliver
//! `\r\n` or bare `\n` where HL7 mandates `\r`. Values are stored exactly as
//! received; escape sequences are not decoded.

use dhc_core::{
    delimiters::Delimiters,
    error::{Error, Result},
    field::{Component, Field, Repetition, SubComponent},
    message::Message,
    segment::Segment,
};

/// Rewrite `\r\n` and bare `\n` segment boundaries to `\r`
pub fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\r").replace('\n', "\r")
}

/// Parse a complete HL7 message
///
/// The message must begin with an MSH segment; anything else is a hard
/// parse failure.
pub fn parse_message(input: &str) -> Result<Message> {
    let normalized = normalize_line_endings(input.trim());

    let delimiters = extract_delimiters(&normalized)?;

    let segment_strings: Vec<&str> = normalized
        .split('\r')
        .filter(|s| !s.is_empty())
        .collect();

    if segment_strings.is_empty() {
        return Err(Error::parse("Empty message"));
    }

    let mut message = Message::with_delimiters(delimiters);

    for (idx, seg_str) in segment_strings.iter().enumerate() {
        let segment = if idx == 0 {
            parse_msh_segment(seg_str, &delimiters)?
        } else {
            parse_segment(seg_str, &delimiters)?
        };
        message.add_segment(segment);
    }

    Ok(message)
}

/// Extract delimiters from the MSH segment
///
/// MSH format: `MSH|^~\&|...` — position 3 is the field separator, positions
/// 4-7 the encoding characters.
fn extract_delimiters(input: &str) -> Result<Delimiters> {
    if !input.starts_with("MSH") {
        return Err(Error::parse("Message must start with MSH segment"));
    }

    if input.len() < 8 {
        return Err(Error::parse("MSH segment too short"));
    }

    let field_sep = input
        .chars()
        .nth(3)
        .ok_or_else(|| Error::parse("Cannot extract field separator"))?;

    let encoding_chars: String = input.chars().skip(4).take(4).collect();

    Delimiters::from_encoding_characters(field_sep, &encoding_chars)
}

/// Parse the MSH segment (special handling)
///
/// MSH-1 (the separator literal) and MSH-2 (encoding characters) are stored
/// as the first two fields so that 1-based field access lines up with the
/// HL7 numbering.
fn parse_msh_segment(input: &str, delimiters: &Delimiters) -> Result<Segment> {
    let mut segment = Segment::new("MSH");

    segment.add_field(Field::from_value(delimiters.field_separator.to_string()));
    segment.add_field(Field::from_value(delimiters.encoding_characters()));

    // Fields from MSH-3 start after "MSH|^~\&|".
    let field_start = 9;
    if input.len() <= field_start {
        return Ok(segment);
    }

    for field_str in input[field_start..].split(delimiters.field_separator) {
        segment.add_field(parse_field(field_str, delimiters));
    }

    Ok(segment)
}

/// Parse a regular segment
fn parse_segment(input: &str, delimiters: &Delimiters) -> Result<Segment> {
    if input.len() < 3 {
        return Err(Error::parse("Segment too short"));
    }

    let segment_id = &input[0..3];
    let mut segment = Segment::new(segment_id);

    if input.len() <= 3 {
        return Ok(segment);
    }

    if input.chars().nth(3) != Some(delimiters.field_separator) {
        return Err(Error::parse(format!(
            "Expected field separator after segment ID, got '{}'",
            input.chars().nth(3).unwrap_or(' ')
        )));
    }

    for field_str in input[4..].split(delimiters.field_separator) {
        segment.add_field(parse_field(field_str, delimiters));
    }

    Ok(segment)
}

/// Parse a field (can contain repetitions)
fn parse_field(input: &str, delimiters: &Delimiters) -> Field {
    let mut field = Field::new();

    for rep_str in input.split(delimiters.repetition_separator) {
        field.add_repetition(parse_repetition(rep_str, delimiters));
    }

    field
}

/// Parse a repetition (can contain components)
fn parse_repetition(input: &str, delimiters: &Delimiters) -> Repetition {
    let mut repetition = Repetition::new();

    for comp_str in input.split(delimiters.component_separator) {
        repetition.add_component(parse_component(comp_str, delimiters));
    }

    repetition
}

/// Parse a component (can contain subcomponents)
fn parse_component(input: &str, delimiters: &Delimiters) -> Component {
    let mut component = Component::new();

    for sub_str in input.split(delimiters.subcomponent_separator) {
        component.add_subcomponent(SubComponent::new(sub_str));
    }

    component
}
