//! Input types for ORU generation
//!
//! These mirror the `process_observation_set` action payload published by
//! the observations service. Unknown fields are ignored.

use serde::de::Deserializer;
use serde::Deserialize;

/// Patient details for the PID segment
#[derive(Debug, Clone, Deserialize)]
pub struct Patient {
    pub uuid: String,
    #[serde(default)]
    pub hospital_number: Option<String>,
    #[serde(default)]
    pub nhs_number: Option<String>,
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub dob: Option<String>,
    #[serde(default)]
    pub sex: Option<String>,
}

/// Encounter details for the PV1 segment
#[derive(Debug, Clone, Deserialize)]
pub struct Encounter {
    #[serde(default)]
    pub epr_encounter_id: Option<String>,
    #[serde(default)]
    pub location_ods_code: Option<String>,
    #[serde(default)]
    pub admitted_at: Option<String>,
}

/// Clinician who recorded the observation set (OBR-10 collector)
#[derive(Debug, Clone, Deserialize)]
pub struct Clinician {
    #[serde(deserialize_with = "string_or_number")]
    pub send_entry_identifier: String,
    pub first_name: String,
    pub last_name: String,
}

/// An observation set and its member observations
#[derive(Debug, Clone, Deserialize)]
pub struct ObservationSet {
    pub uuid: String,
    pub record_time: String,
    #[serde(default)]
    pub score_system: Option<String>,
    #[serde(default)]
    pub score_value: Option<i64>,
    #[serde(default)]
    pub score_severity: Option<String>,
    #[serde(default)]
    pub spo2_scale: Option<i64>,
    #[serde(default)]
    pub time_next_obs_set_due: Option<String>,
    #[serde(default)]
    pub mins_late: Option<i64>,
    #[serde(default)]
    pub obx_reference_range: Option<String>,
    #[serde(default)]
    pub obx_abnormal_flags: Option<String>,
    #[serde(default)]
    pub observations: Vec<Observation>,
}

/// A single observation within a set
#[derive(Debug, Clone, Deserialize)]
pub struct Observation {
    pub observation_type: String,
    #[serde(default)]
    pub observation_value: Option<f64>,
    #[serde(default)]
    pub observation_string: Option<String>,
    #[serde(default)]
    pub observation_unit: Option<String>,
    #[serde(default)]
    pub patient_refused: Option<bool>,
    #[serde(default)]
    pub score_value: Option<i64>,
    pub measured_time: String,
    #[serde(default)]
    pub observation_metadata: Option<ObservationMetadata>,
}

/// Structured metadata attached to some observation types
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ObservationMetadata {
    #[serde(default)]
    pub patient_position: Option<String>,
    #[serde(default)]
    pub mask: Option<String>,
    #[serde(default)]
    pub mask_percent: Option<f64>,
    #[serde(default)]
    pub gcs_eyes: Option<i64>,
    #[serde(default)]
    pub gcs_eyes_description: Option<String>,
    #[serde(default)]
    pub gcs_verbal: Option<i64>,
    #[serde(default)]
    pub gcs_verbal_description: Option<String>,
    #[serde(default)]
    pub gcs_motor: Option<i64>,
    #[serde(default)]
    pub gcs_motor_description: Option<String>,
}

impl ObservationSet {
    /// Find an observation by type, skipping those with nothing to report
    ///
    /// An observation with no value, no string, and no refusal flag is
    /// silently dropped, matching the upstream feed's behaviour.
    pub fn observation_with_value(&self, observation_type: &str) -> Option<&Observation> {
        let obs = self
            .observations
            .iter()
            .find(|o| o.observation_type == observation_type)?;

        if obs.observation_value.is_none()
            && obs.observation_string.is_none()
            && obs.patient_refused != Some(true)
        {
            return None;
        }
        Some(obs)
    }
}

/// Accept either a JSON string or a bare number as a string value
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum StringOrNumber {
        String(String),
        Int(i64),
        Float(f64),
    }

    Ok(match StringOrNumber::deserialize(deserializer)? {
        StringOrNumber::String(s) => s,
        StringOrNumber::Int(n) => n.to_string(),
        StringOrNumber::Float(n) => n.to_string(),
    })
}
