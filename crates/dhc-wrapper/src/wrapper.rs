//! The connector's view over a parsed HL7 message
//!
//! [`Hl7Wrapper`] abstracts the parsing layer away from the pipelines: field
//! access by dotted path with a default for anything missing, patient
//! identifier scans over PID-3 / MRG-1 repetitions, message metadata, and
//! ACK generation. Not to be confused with the persisted message record.

use chrono_tz::Tz;
use dhc_core::{error::Result, message::Message};
use serde::{Deserialize, Serialize};

use crate::ack::{AckBuilder, AckCode};
use crate::datetime;
use crate::path::FieldPath;

/// The HL7 "null representation": a field containing just two quote marks
const HL7_NULL: &str = "\"\"";

/// Patient identifiers extracted from a message, persisted alongside it for
/// lookup
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientIdentifiers {
    #[serde(rename = "NHS number")]
    pub nhs_number: Option<String>,
    #[serde(rename = "MRN")]
    pub mrn: Option<String>,
    #[serde(rename = "Visit ID")]
    pub visit_id: Option<String>,
}

/// An addressable HL7 message
#[derive(Debug, Clone)]
pub struct Hl7Wrapper {
    raw: String,
    message: Message,
}

impl Hl7Wrapper {
    /// Parse raw HL7 text into a wrapper
    ///
    /// Line endings are normalised to `\r`; a message without an MSH
    /// segment is a hard failure.
    pub fn parse(raw: &str) -> Result<Self> {
        let message = dhc_parser::parse_message(raw)?;
        Ok(Self {
            raw: dhc_parser::normalize_line_endings(raw.trim()),
            message,
        })
    }

    /// The normalised raw message text
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The underlying parsed message
    pub fn message(&self) -> &Message {
        &self.message
    }

    /// Test for the presence of a segment
    pub fn contains_segment(&self, segment_id: &str) -> bool {
        self.message.contains_segment(segment_id)
    }

    /// Get the text at a dotted field path (`SEG.F<n>[.R<r>][.C<c>][.S<s>]`)
    ///
    /// Returns `None` for a malformed path, a missing segment, an
    /// out-of-range index, or the HL7 null representation (`""`). A path
    /// addressing a node above subcomponent level returns the full node
    /// text, delimiters included.
    pub fn field(&self, path: &str) -> Option<String> {
        let path = FieldPath::parse(path).ok()?;
        let text = self.node_text(&path)?;
        if text == HL7_NULL {
            return None;
        }
        Some(text)
    }

    /// Like [`Hl7Wrapper::field`] but treating an empty value as absent
    pub fn non_empty_field(&self, path: &str) -> Option<String> {
        self.field(path).filter(|v| !v.is_empty())
    }

    fn node_text(&self, path: &FieldPath) -> Option<String> {
        let delims = &self.message.delimiters;
        let segment = self.message.segment(&path.segment_id)?;
        let field = segment.get_field(path.field)?;

        // A component addressed without an explicit repetition refers to
        // the first one.
        let repetition = match (path.repetition, path.component) {
            (Some(r), _) => Some(r),
            (None, Some(_)) => Some(1),
            (None, None) => None,
        };

        let Some(rep_index) = repetition else {
            return Some(field.encode(delims));
        };
        let rep = field.get_repetition(rep_index - 1)?;

        let Some(comp_index) = path.component else {
            return Some(rep.encode(delims));
        };
        let comp = rep.get_component(comp_index - 1)?;

        let Some(sub_index) = path.subcomponent else {
            return Some(comp.encode(delims));
        };
        comp.get_subcomponent(sub_index - 1)
            .map(|sc| sc.as_str().to_string())
    }

    /// The full MSH-9 text, e.g. `ADT^A01`
    pub fn message_type(&self) -> Option<String> {
        self.message.message_type()
    }

    /// The ADT trigger event from MSH-9, e.g. `A01`
    pub fn message_sub_type(&self) -> Option<String> {
        self.field("MSH.F9.R1.C2")
    }

    /// The message control id from MSH-10
    pub fn message_control_id(&self) -> Option<String> {
        self.field("MSH.F10.R1.C1")
    }

    /// MSH-7 as an ISO8601 instant; zoneless values adopt `default_tz`
    pub fn message_datetime_iso8601(
        &self,
        default_tz: Tz,
    ) -> datetime::Result<Option<String>> {
        self.iso_datetime("MSH.F7", default_tz)
    }

    /// An HL7 datetime value at `path` as an ISO8601 instant
    pub fn iso_datetime(
        &self,
        path: &str,
        default_tz: Tz,
    ) -> datetime::Result<Option<String>> {
        match self.non_empty_field(path) {
            Some(value) => datetime::hl7_to_iso8601_datetime(&value, default_tz).map(Some),
            None => Ok(None),
        }
    }

    /// An HL7 datetime value at `path` as an ISO8601 date
    pub fn iso_date(&self, path: &str) -> datetime::Result<Option<String>> {
        match self.non_empty_field(path) {
            Some(value) => datetime::hl7_to_iso8601_date(&value).map(Some),
            None => Ok(None),
        }
    }

    /// Scan PID-3 repetitions for the identifier of the requested kind
    ///
    /// The kind is matched against component 5 of each repetition. `NHS`
    /// additionally matches the `NHSNBR` and `NHSNMBR` spellings seen in
    /// EPR feeds.
    pub fn patient_identifier(&self, kind: &str) -> Option<String> {
        self.scan_identifier_repetitions("PID", 3, kind)
    }

    /// Scan MRG-1 repetitions for a previously used identifier
    pub fn merged_patient_identifier(&self, kind: &str) -> Option<String> {
        self.scan_identifier_repetitions("MRG", 1, kind)
    }

    fn scan_identifier_repetitions(
        &self,
        segment_id: &str,
        field: usize,
        kind: &str,
    ) -> Option<String> {
        let nhs_spellings = ["NHS", "NHSNBR", "NHSNMBR"];
        let exact = [kind];
        let kinds: &[&str] = if kind == "NHS" { &nhs_spellings } else { &exact };

        let reps = self
            .message
            .segment(segment_id)?
            .get_field(field)?
            .repetition_count();

        for r in 1..=reps {
            let id_kind = self.field(&format!("{segment_id}.F{field}.R{r}.C5"));
            if id_kind.as_deref().is_some_and(|k| kinds.contains(&k)) {
                return self.field(&format!("{segment_id}.F{field}.R{r}.C1"));
            }
        }
        None
    }

    /// The identifier map persisted with every message record
    pub fn patient_identifiers(&self) -> PatientIdentifiers {
        PatientIdentifiers {
            nhs_number: self.patient_identifier("NHS"),
            mrn: self.patient_identifier("MRN"),
            visit_id: self.field("PV1.F19"),
        }
    }

    /// Build an ACK/NACK for this message
    ///
    /// When an error code or message is supplied, an
    /// `ERR|||<code>|E||||<msg>` segment is appended.
    pub fn generate_ack(
        &self,
        ack_code: AckCode,
        error_code: Option<&str>,
        error_msg: Option<&str>,
    ) -> String {
        let mut builder = AckBuilder::for_message(&self.message).ack_code(ack_code);
        if error_code.is_some() || error_msg.is_some() {
            builder = builder.error(error_code.unwrap_or(""), error_msg.unwrap_or(""));
        }
        builder.build_text()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn a01() -> Hl7Wrapper {
        let raw = "MSH|^~\\&|OXON_TIE_ADT|OXON|DHOS|SENSYNE|20170731141348||ADT^A01|Q54356818T76757911|P|2.3\n\
                   EVN|A01|20170731141300\n\
                   PID|1|654321^^^^MRN|654321^^^^MRN~1239874560^^^^NHSNBR||ZZZEDUCATION^STEPHEN^^^^^CURRENT||19821103|1\n\
                   PV1|1|INPATIENT|NOC-Ward B^Day Room^Chair 6||||||||||||||||909127805|||||||||||||||||||||||||201707311413";
        Hl7Wrapper::parse(raw).unwrap()
    }

    fn a34() -> Hl7Wrapper {
        let raw = "MSH|^~\\&|OXON_TIE_ADT|OXON|DHOS|SENSYNE|20170731141348||ADT^A34|Q54356818T76757912|P|2.3\n\
                   PID|1|90532398^^^^MRN|90532398^^^^MRN||ZZZTEST^MERGE||19821103|1\n\
                   MRG|90532399^^^^MRN";
        Hl7Wrapper::parse(raw).unwrap()
    }

    #[test]
    fn test_contains_segment() {
        let m = a01();
        assert!(!m.contains_segment("ZZZ"));
        assert!(m.contains_segment("PV1"));
    }

    #[test]
    fn test_field_by_path() {
        let m = a01();
        assert_eq!(m.field("ZZZ.F5.R1.C1"), None);
        assert_eq!(m.field("PID.F5.R1.C1").as_deref(), Some("ZZZEDUCATION"));
        assert_eq!(m.field("PID.F5.R1.C2").as_deref(), Some("STEPHEN"));
    }

    #[test]
    fn test_field_returns_whole_node_text() {
        let m = a01();
        assert_eq!(
            m.field("PV1.F3").as_deref(),
            Some("NOC-Ward B^Day Room^Chair 6")
        );
        assert_eq!(m.field("PV1.F19").as_deref(), Some("909127805"));
    }

    #[test]
    fn test_field_null_representation() {
        let raw = "MSH|^~\\&|A|B|C|D|20170731141348||ADT^A01|X1|P|2.3\rPV1|1|INPATIENT|\"\"^Bay^Bed";
        let m = Hl7Wrapper::parse(raw).unwrap();
        assert_eq!(m.field("PV1.F3.R1.C1"), None);
        assert_eq!(m.field("PV1.F3.R1.C2").as_deref(), Some("Bay"));
    }

    #[test]
    fn test_malformed_path_yields_none() {
        let m = a01();
        assert_eq!(m.field("PID"), None);
        assert_eq!(m.field("PID.F0"), None);
        assert_eq!(m.field("PID.5.R1"), None);
    }

    #[test]
    fn test_out_of_range_yields_none() {
        let m = a01();
        assert_eq!(m.field("PID.F99"), None);
        assert_eq!(m.field("PID.F3.R9.C1"), None);
        assert_eq!(m.field("PID.F5.R1.C99"), None);
    }

    #[test]
    fn test_message_type() {
        let m = a01();
        assert_eq!(m.message_type().as_deref(), Some("ADT^A01"));
        assert_eq!(m.message_sub_type().as_deref(), Some("A01"));
    }

    #[test]
    fn test_message_control_id() {
        assert_eq!(
            a01().message_control_id().as_deref(),
            Some("Q54356818T76757911")
        );
    }

    #[test]
    fn test_message_datetime() {
        let m = a01();
        assert_eq!(
            m.message_datetime_iso8601(chrono_tz::UTC).unwrap().as_deref(),
            Some("2017-07-31T14:13:48.000Z")
        );
    }

    #[test]
    fn test_iso_datetime_localised() {
        let m = a01();
        assert_eq!(
            m.iso_datetime("PV1.F44", chrono_tz::UTC).unwrap().as_deref(),
            Some("2017-07-31T14:13:00.000Z")
        );
        assert_eq!(
            m.iso_datetime("PV1.F44", chrono_tz::Europe::London)
                .unwrap()
                .as_deref(),
            Some("2017-07-31T14:13:00.000+01:00")
        );
        assert_eq!(m.iso_datetime("ZZZ.F1", chrono_tz::UTC).unwrap(), None);
    }

    #[test]
    fn test_iso_date() {
        let m = a01();
        assert_eq!(m.iso_date("EVN.F2").unwrap().as_deref(), Some("2017-07-31"));
        assert_eq!(m.iso_date("PID.F7").unwrap().as_deref(), Some("1982-11-03"));
    }

    #[test]
    fn test_iso_datetime_invalid_value_errors() {
        let raw = "MSH|^~\\&|A|B|C|D|banana||ADT^A01|X1|P|2.3";
        let m = Hl7Wrapper::parse(raw).unwrap();
        assert!(m.message_datetime_iso8601(chrono_tz::UTC).is_err());
    }

    #[test]
    fn test_patient_identifier() {
        let m = a01();
        assert_eq!(m.patient_identifier("MRN").as_deref(), Some("654321"));
        assert_eq!(m.patient_identifier("NHS").as_deref(), Some("1239874560"));
        assert_eq!(m.patient_identifier("ZZZ"), None);
    }

    #[test]
    fn test_merged_patient_identifier() {
        let m = a34();
        assert_eq!(
            m.merged_patient_identifier("MRN").as_deref(),
            Some("90532399")
        );
        assert_eq!(m.merged_patient_identifier("NHS"), None);
        assert_eq!(a01().merged_patient_identifier("MRN"), None);
    }

    #[test]
    fn test_patient_identifiers_map() {
        let ids = a01().patient_identifiers();
        assert_eq!(ids.nhs_number.as_deref(), Some("1239874560"));
        assert_eq!(ids.mrn.as_deref(), Some("654321"));
        assert_eq!(ids.visit_id.as_deref(), Some("909127805"));

        let json = serde_json::to_value(&ids).unwrap();
        assert_eq!(json["NHS number"], "1239874560");
        assert_eq!(json["MRN"], "654321");
        assert_eq!(json["Visit ID"], "909127805");
    }

    #[test]
    fn test_generate_ack_with_err() {
        let ack = a01().generate_ack(
            AckCode::Reject,
            Some("Hl7ApplicationRejectException"),
            Some("this is an error"),
        );
        assert!(ack.starts_with("MSH|^~\\&|DHOS|SENSYNE|OXON_TIE_ADT|OXON|"));
        assert!(ack.contains("MSA|AR|Q54356818T76757911"));
        assert!(ack.ends_with("ERR|||Hl7ApplicationRejectException|E||||this is an error"));
    }
}
