//! Inbound ADT validation.
//!
//! Checks run in a fixed order and fail fast. A failure carries the HL7
//! acknowledgement code the pipeline must answer with: AR (application
//! reject) for messages we will never accept, AE (application error) for
//! messages the sender should correct and resend.

use dhc_wrapper::{AckCode, Hl7Wrapper};
use thiserror::Error;

/// ADT trigger events the platform consumes
pub const ADT_TYPE_WHITELIST: &[&str] = &[
    "A01", // Admit
    "A02", // Transfer
    "A03", // Discharge
    "A04", // Register a patient
    "A05", // Pre-admit
    "A08", // Update patient information
    "A11", // Cancel admit
    "A12", // Cancel transfer
    "A13", // Cancel discharge
    "A14", // Pending admit
    "A15", // Pending transfer
    "A21", // Patient goes on "leave of absence"
    "A22", // Patient returns from "leave of absence"
    "A23", // Delete patient record
    "A26", // Cancel pending transfer
    "A27", // Cancel pending admit
    "A28", // Add person information
    "A31", // Update person information
    "A34", // Merge patient information - patient ID only
    "A35", // Merge patient information - account number only
    "A38", // Cancel pre-admit
    "A40", // Merge patient - patient identifier list
    "A44", // Move account information - patient account number
    "A52", // Cancel patient goes on "leave of absence"
    "A53", // Cancel patient returns from "leave of absence"
];

/// Encounter types the platform does not track
pub const ENCOUNTER_TYPE_BLACKLIST: &[&str] = &["WAITLIST", "PREADMIT", "RECURRING"];

/// A validation failure, tagged with the acknowledgement branch it maps to
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// AR: the message category/type is not one we handle, or a hard
    /// identifier requirement failed
    #[error("{0}")]
    Reject(String),

    /// AE: the message is in scope but malformed; the sender should fix
    /// and resend
    #[error("{0}")]
    ApplicationError(String),
}

impl ValidationError {
    /// The MSA-1 code for the NACK
    pub fn ack_code(&self) -> AckCode {
        match self {
            ValidationError::Reject(_) => AckCode::Reject,
            ValidationError::ApplicationError(_) => AckCode::Error,
        }
    }

    /// The wire error code carried in ERR-3
    pub fn error_code(&self) -> &'static str {
        match self {
            ValidationError::Reject(_) => "Hl7ApplicationRejectException",
            ValidationError::ApplicationError(_) => "Hl7ApplicationErrorException",
        }
    }

    /// The human-readable reason carried in ERR-8
    pub fn reason(&self) -> &str {
        match self {
            ValidationError::Reject(reason) => reason,
            ValidationError::ApplicationError(reason) => reason,
        }
    }
}

/// Validate an inbound message against the connector's ADT contract
pub fn validate_hl7_message(wrapper: &Hl7Wrapper) -> Result<(), ValidationError> {
    // Reject messages that are not of the expected category/type.
    let message_category = wrapper.field("MSH.F9.R1.C1");
    if message_category.as_deref() != Some("ADT") {
        return Err(ValidationError::Reject(format!(
            "HL7 message of unexpected type '{}'",
            message_category.as_deref().unwrap_or("")
        )));
    }

    let adt_message_type = wrapper.field("MSH.F9.R1.C2");
    if !adt_message_type
        .as_deref()
        .is_some_and(|t| ADT_TYPE_WHITELIST.contains(&t))
    {
        return Err(ValidationError::Reject(format!(
            "HL7 message of unexpected ADT type '{}'",
            adt_message_type.as_deref().unwrap_or("")
        )));
    }

    // Application-error when expected segments/fields are missing.
    if !wrapper.contains_segment("PID") {
        return Err(ValidationError::ApplicationError(
            "HL7 PID segment missing".to_string(),
        ));
    }
    if wrapper.patient_identifier("NHS").is_none() && wrapper.patient_identifier("MRN").is_none()
    {
        return Err(ValidationError::Reject(
            "HL7 MRN and NHS number missing".to_string(),
        ));
    }

    if wrapper.contains_segment("PV1") {
        if let Some(encounter_type) = wrapper.field("PV1.F2") {
            if ENCOUNTER_TYPE_BLACKLIST.contains(&encounter_type.as_str()) {
                return Err(ValidationError::ApplicationError(format!(
                    "HL7 message concerns blacklisted encounter type '{encounter_type}'"
                )));
            }
        }

        if wrapper.non_empty_field("PV1.F3.R1.C1").is_none() {
            return Err(ValidationError::ApplicationError(
                "HL7 message contains an assigned patient location but the ward code is missing"
                    .to_string(),
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(raw: &str) -> Hl7Wrapper {
        Hl7Wrapper::parse(raw).unwrap()
    }

    fn a01(pv1: &str) -> String {
        format!(
            "MSH|^~\\&|OXON_TIE_ADT|OXON|DHOS|SENSYNE|20170731141348||ADT^A01|Q54356818T76757911|P|2.3\r\
             PID|1|654321^^^^MRN|654321^^^^MRN~1239874560^^^^NHSNBR||ZZZEDUCATION^STEPHEN||19821103|1\r\
             {pv1}"
        )
    }

    #[test]
    fn test_valid_a01() {
        let msg = a01("PV1|1|INPATIENT|NOC-Ward B^Day Room^Chair 6|||||||||||||||||909127805");
        assert!(validate_hl7_message(&wrap(&msg)).is_ok());
    }

    #[test]
    fn test_non_adt_category_rejected() {
        let raw = "MSH|^~\\&|A|B|C|D|20170731141348||ORU^R01|X1|P|2.3\rPID|1|654321^^^^MRN|654321^^^^MRN";
        let err = validate_hl7_message(&wrap(raw)).unwrap_err();
        assert!(matches!(err, ValidationError::Reject(_)));
        assert_eq!(err.ack_code(), AckCode::Reject);
        assert_eq!(err.error_code(), "Hl7ApplicationRejectException");
        assert!(err.reason().contains("unexpected type 'ORU'"));
    }

    #[test]
    fn test_unlisted_adt_type_rejected() {
        let raw = "MSH|^~\\&|A|B|C|D|20170731141348||ADT^A17|X1|P|2.3\rPID|1|654321^^^^MRN|654321^^^^MRN";
        let err = validate_hl7_message(&wrap(raw)).unwrap_err();
        assert!(matches!(err, ValidationError::Reject(_)));
        assert!(err.reason().contains("unexpected ADT type 'A17'"));
    }

    #[test]
    fn test_missing_pid_is_application_error() {
        let raw = "MSH|^~\\&|A|B|C|D|20170731141348||ADT^A01|X1|P|2.3\rEVN|A01|20170731141300";
        let err = validate_hl7_message(&wrap(raw)).unwrap_err();
        assert!(matches!(err, ValidationError::ApplicationError(_)));
        assert_eq!(err.ack_code(), AckCode::Error);
        assert_eq!(err.error_code(), "Hl7ApplicationErrorException");
        assert_eq!(err.reason(), "HL7 PID segment missing");
    }

    #[test]
    fn test_missing_identifiers_rejected() {
        let raw =
            "MSH|^~\\&|A|B|C|D|20170731141348||ADT^A01|X1|P|2.3\rPID|1||^^^^XXX||DOE^JOHN";
        let err = validate_hl7_message(&wrap(raw)).unwrap_err();
        assert!(matches!(err, ValidationError::Reject(_)));
        assert_eq!(err.reason(), "HL7 MRN and NHS number missing");
    }

    #[test]
    fn test_blacklisted_encounter_type() {
        let msg = a01("PV1|1|WAITLIST|NOC-Ward B^Day Room^Chair 6");
        let err = validate_hl7_message(&wrap(&msg)).unwrap_err();
        assert!(matches!(err, ValidationError::ApplicationError(_)));
        assert!(err.reason().contains("WAITLIST"));
    }

    #[test]
    fn test_missing_ward_code() {
        let msg = a01("PV1|1|INPATIENT|\"\"^Day Room^Chair 6");
        let err = validate_hl7_message(&wrap(&msg)).unwrap_err();
        assert!(matches!(err, ValidationError::ApplicationError(_)));
        assert!(err.reason().contains("ward code is missing"));
    }

    #[test]
    fn test_no_pv1_is_valid() {
        let raw = "MSH|^~\\&|A|B|C|D|20170731141348||ADT^A31|X1|P|2.3\rPID|1|654321^^^^MRN|654321^^^^MRN";
        assert!(validate_hl7_message(&wrap(raw)).is_ok());
    }
}
