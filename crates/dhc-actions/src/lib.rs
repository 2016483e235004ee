//! ADT message to platform action generation.
//!
//! A validated ADT message yields a list of actions for the internal event
//! bus. `process_patient` is always emitted; `process_location` and
//! `process_encounter` follow when the message carries an assigned location
//! with an admission datetime (A08 updates routinely omit PV1-44, in which
//! case location and encounter state is left untouched).

pub mod sex;

use chrono_tz::Tz;
use dhc_wrapper::{DatetimeError, Hl7Wrapper};
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub use sex::parse_sex_to_sct;

/// Result type alias for action generation
pub type Result<T> = std::result::Result<T, ActionError>;

#[derive(Error, Debug)]
pub enum ActionError {
    /// The message carried neither an MRN nor an NHS number
    #[error("No patient identifiers in message")]
    NoPatientIdentifiers,

    #[error(transparent)]
    Datetime(#[from] DatetimeError),

    #[error("Action payload could not be serialized: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// A named action with its JSON payload
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Action {
    pub name: String,
    pub data: Value,
}

impl Action {
    fn new<T: Serialize>(name: &str, data: &T) -> Result<Self> {
        Ok(Self {
            name: name.to_string(),
            data: serde_json::to_value(data)?,
        })
    }
}

/// `process_patient` payload
#[derive(Debug, Clone, Default, Serialize)]
pub struct PatientData {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub sex_sct: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nhs_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mrn: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_birth: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_of_death: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_nhs_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_mrn: Option<String>,
}

/// An EPR ward/bay/bed triplet
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct LocationTriplet {
    pub epr_ward_code: Option<String>,
    pub epr_bay_code: Option<String>,
    pub epr_bed_code: Option<String>,
}

/// `process_location` payload
#[derive(Debug, Clone, Serialize)]
pub struct LocationData {
    pub location: LocationTriplet,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_location: Option<LocationTriplet>,
}

/// `process_encounter` payload
#[derive(Debug, Clone, Serialize)]
pub struct EncounterData {
    pub epr_encounter_id: Option<String>,
    pub location: LocationTriplet,
    pub encounter_type: Option<String>,
    pub admitted_at: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub discharged_at: Option<String>,
    pub admission_cancelled: bool,
    pub transfer_cancelled: bool,
    pub discharge_cancelled: bool,
    pub encounter_moved: bool,
    pub patient_deceased: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_encounter_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub epr_previous_location_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_location: Option<LocationTriplet>,
}

/// Generate the full action list for a validated ADT message
pub fn generate_actions(wrapper: &Hl7Wrapper, server_tz: Tz) -> Result<Vec<Action>> {
    let mut actions = vec![generate_patient_action(wrapper)?];

    // A08 updates may carry PV1 without an admission datetime; location and
    // encounter state is only touched when PV1-44 is populated.
    if wrapper.contains_segment("PV1") && wrapper.non_empty_field("PV1.F44").is_some() {
        actions.push(generate_location_action(wrapper)?);
        actions.push(generate_encounter_action(wrapper, server_tz)?);
    }

    Ok(actions)
}

/// Generate the `process_patient` action
pub fn generate_patient_action(m: &Hl7Wrapper) -> Result<Action> {
    tracing::debug!("Generating patient action from ADT message");

    let mut data = PatientData {
        first_name: m.field("PID.F5.R1.C2"),
        last_name: m.field("PID.F5.R1.C1"),
        sex_sct: parse_sex_to_sct(m.field("PID.F8").as_deref()).to_string(),
        ..Default::default()
    };

    data.nhs_number = m.patient_identifier("NHS").filter(|v| !v.is_empty());
    data.mrn = m.patient_identifier("MRN").filter(|v| !v.is_empty());

    if m.non_empty_field("PID.F7").is_some() {
        data.date_of_birth = m.iso_date("PID.F7")?;
    }
    if m.non_empty_field("PID.F29").is_some() {
        data.date_of_death = m.iso_date("PID.F29")?;
    }

    if data.nhs_number.is_none() && data.mrn.is_none() {
        return Err(ActionError::NoPatientIdentifiers);
    }

    // Patient merges (A34/A40) also carry the superseded identifiers. A35
    // (account number merge) is excluded: account numbers are not used.
    if matches!(m.message_sub_type().as_deref(), Some("A34") | Some("A40")) {
        data.previous_nhs_number = m.merged_patient_identifier("NHS").filter(|v| !v.is_empty());
        data.previous_mrn = m.merged_patient_identifier("MRN").filter(|v| !v.is_empty());
    }

    Action::new("process_patient", &data)
}

/// Generate the `process_location` action
pub fn generate_location_action(m: &Hl7Wrapper) -> Result<Action> {
    tracing::debug!("Generating location action from ADT message");

    let data = LocationData {
        location: assigned_location(m),
        previous_location: previous_location(m),
    };

    Action::new("process_location", &data)
}

/// Generate the `process_encounter` action
pub fn generate_encounter_action(m: &Hl7Wrapper, server_tz: Tz) -> Result<Action> {
    tracing::debug!("Generating encounter action from ADT message");

    let message_type = m.message_sub_type();
    let message_type = message_type.as_deref();

    let mut data = EncounterData {
        epr_encounter_id: m.field("PV1.F19"),
        location: assigned_location(m),
        encounter_type: m.field("PV1.F2"),
        admitted_at: m.iso_datetime("PV1.F44", server_tz)?,
        discharged_at: None,
        admission_cancelled: matches!(message_type, Some("A11" | "A23" | "A27" | "A38")),
        transfer_cancelled: message_type == Some("A12"),
        discharge_cancelled: message_type == Some("A13"),
        encounter_moved: message_type == Some("A44"),
        patient_deceased: m.iso_date("PID.F29")?.is_some(),
        parent_encounter_id: None,
        epr_previous_location_code: None,
        previous_location: previous_location(m),
    };

    if m.non_empty_field("PV1.F45").is_some() {
        data.discharged_at = m.iso_datetime("PV1.F45", server_tz)?;
    }

    if m.contains_segment("MRG") {
        data.parent_encounter_id = m.field("MRG.F5.R1.C1");
        data.epr_previous_location_code = m.field("MRG.F6.R1.C1");
    }

    Action::new("process_encounter", &data)
}

fn assigned_location(m: &Hl7Wrapper) -> LocationTriplet {
    LocationTriplet {
        epr_ward_code: m.field("PV1.F3.R1.C1"),
        epr_bay_code: m.field("PV1.F3.R1.C2"),
        epr_bed_code: m.field("PV1.F3.R1.C3"),
    }
}

fn previous_location(m: &Hl7Wrapper) -> Option<LocationTriplet> {
    m.non_empty_field("PV1.F6.R1.C1")?;
    Some(LocationTriplet {
        epr_ward_code: m.field("PV1.F6.R1.C1"),
        epr_bay_code: m.field("PV1.F6.R1.C2"),
        epr_bed_code: m.field("PV1.F6.R1.C3"),
    })
}
