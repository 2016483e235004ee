//! ORU^R01 message assembly
//!
//! Segment order is strict: MSH, PID, [PV1], OBR, OBX... The PV1 is only
//! present when the encounter carries an EPR encounter id.

use chrono_tz::Tz;
use dhc_core::{Delimiters, Encoding, Field, Message, Segment};
use dhc_trustomer::TrustomerConfig;
use dhc_wrapper::datetime::{hl7_datetime_now, iso8601_to_hl7};

use crate::obx::{self, ObxContext};
use crate::sex::parse_sct_to_sex;
use crate::types::{Clinician, Encounter, ObservationSet, Patient};
use crate::{OruError, Result};

/// Derive the message control id from the observation set identifier
///
/// The first 20 hex characters of an MD5 over the identifier: stable per
/// set, so a regenerated message collides in the store instead of being
/// sent twice.
pub fn derive_message_control_id(obs_set_uuid: &str) -> String {
    let digest = md5::compute(obs_set_uuid.as_bytes());
    format!("{digest:x}")[..20].to_string()
}

/// Generator for ORU^R01 messages
///
/// # Examples
///
/// ```no_run
/// # use dhc_oru::OruGenerator;
/// # fn demo(config: &dhc_trustomer::TrustomerConfig,
/// #         patient: &dhc_oru::Patient,
/// #         encounter: &dhc_oru::Encounter,
/// #         obs_set: &dhc_oru::ObservationSet) {
/// let generator = OruGenerator::new(config, chrono_tz::Europe::London);
/// let message = generator.generate(patient, encounter, obs_set, None).unwrap();
/// assert!(message.starts_with("MSH|^~\\&|"));
/// # }
/// ```
pub struct OruGenerator<'a> {
    config: &'a TrustomerConfig,
    server_tz: Tz,
    timestamp_override: Option<String>,
}

impl<'a> OruGenerator<'a> {
    /// Create a generator for the given trustomer configuration
    pub fn new(config: &'a TrustomerConfig, server_tz: Tz) -> Self {
        Self {
            config,
            server_tz,
            timestamp_override: None,
        }
    }

    /// Pin MSH-7 to a fixed value (used by tests; defaults to now)
    pub fn with_timestamp(mut self, timestamp: &str) -> Self {
        self.timestamp_override = Some(timestamp.to_string());
        self
    }

    /// Generate the complete ORU^R01 text, segments separated by `\r`
    pub fn generate(
        &self,
        patient: &Patient,
        encounter: &Encounter,
        obs_set: &ObservationSet,
        clinician: Option<&Clinician>,
    ) -> Result<String> {
        tracing::debug!(obs_set_uuid = %obs_set.uuid, "Generating ORU message");

        let collector = clinician.map(|c| {
            format!(
                "{}^{}^{}",
                c.send_entry_identifier,
                Encoding::escape(&c.last_name),
                Encoding::escape(&c.first_name)
            )
        });
        if collector.is_none() {
            tracing::warn!("No clinician information, ORU message will not contain collector field");
        }

        let control_id = derive_message_control_id(&obs_set.uuid);

        let mut message = Message::new();
        message.add_segment(self.msh_segment(&control_id));
        message.add_segment(self.pid_segment(patient)?);
        if let Some(pv1) = self.pv1_segment(encounter)? {
            message.add_segment(pv1);
        }
        message.add_segment(self.obr_segment(obs_set, collector.as_deref())?);

        let ctx = ObxContext {
            format: &self.config.hl7_config.outgoing_timestamp_format,
            server_tz: self.server_tz,
            collector: collector.as_deref(),
            oxygen_masks: &self.config.send_config.oxygen_masks,
        };

        let mut segments: Vec<Segment> = Vec::new();
        let sections: &[fn(&ObservationSet, &ObxContext<'_>, usize) -> Result<Vec<Segment>>] = &[
            obx::overall_score,
            obx::time_next_due,
            obx::mins_late,
            |s, c, i| obx::numeric_vital(s, c, i, "heart_rate", "HR"),
            |s, c, i| obx::numeric_vital(s, c, i, "respiratory_rate", "RR"),
            |s, c, i| obx::numeric_vital(s, c, i, "diastolic_blood_pressure", "DBP"),
            |s, c, i| obx::numeric_vital(s, c, i, "systolic_blood_pressure", "SBP"),
            obx::bp_posture,
            |s, c, i| obx::numeric_vital(s, c, i, "spo2", "SPO2"),
            obx::o2_therapy,
            obx::temperature,
            obx::acvpu,
            obx::gcs,
            obx::nurse_concern,
        ];

        for section in sections {
            // The next OBX-1 is always derived from what was actually
            // emitted, never from the section's position.
            let batch = section(obs_set, &ctx, segments.len() + 1)?;
            segments.extend(batch);
        }

        for segment in segments {
            message.add_segment(segment);
        }

        Ok(message.encode())
    }

    fn outgoing_timestamp(&self) -> String {
        match &self.timestamp_override {
            Some(ts) => ts.clone(),
            None => hl7_datetime_now(
                self.server_tz,
                &self.config.hl7_config.outgoing_timestamp_format,
            ),
        }
    }

    fn msh_segment(&self, control_id: &str) -> Segment {
        let hl7 = &self.config.hl7_config;
        let delims = Delimiters::default();

        let mut msh = Segment::new("MSH");
        msh.add_field(Field::from_value(delims.field_separator.to_string()));
        msh.add_field(Field::from_value(delims.encoding_characters()));
        msh.add_field(Field::from_value(Encoding::escape(
            &hl7.outgoing_sending_application,
        )));
        msh.add_field(Field::from_value(Encoding::escape(
            &hl7.outgoing_sending_facility,
        )));
        msh.add_field(Field::from_value(Encoding::escape(
            &hl7.outgoing_receiving_application,
        )));
        msh.add_field(Field::from_value(Encoding::escape(
            &hl7.outgoing_receiving_facility,
        )));
        msh.add_field(Field::from_value(self.outgoing_timestamp()));
        msh.add_field(Field::from_value(""));
        msh.add_field(Field::from_value("ORU^R01^ORU_R01"));
        msh.add_field(Field::from_value(control_id));
        msh.add_field(Field::from_value(Encoding::escape(
            &hl7.outgoing_processing_id,
        )));
        msh.add_field(Field::from_value("2.6"));
        msh
    }

    fn pid_segment(&self, patient: &Patient) -> Result<Segment> {
        let mut identifiers = Vec::new();
        if let Some(mrn) = patient.hospital_number.as_deref().filter(|v| !v.is_empty()) {
            identifiers.push(format!("{}^^^^MRN", Encoding::escape(mrn)));
        }
        if let Some(nhs) = patient.nhs_number.as_deref().filter(|v| !v.is_empty()) {
            identifiers.push(format!("{}^^^^NHS", Encoding::escape(nhs)));
        }

        let name = format!(
            "{}^{}",
            Encoding::escape(&patient.last_name),
            Encoding::escape(&patient.first_name)
        );

        let dob = match patient.dob.as_deref().filter(|v| !v.is_empty()) {
            Some(dob) => chrono::NaiveDate::parse_from_str(dob, "%Y-%m-%d")
                .map_err(|_| OruError::InvalidDate(dob.to_string()))?
                .format("%Y%m%d")
                .to_string(),
            None => String::new(),
        };

        let mut pid = Segment::new("PID");
        pid.set_field_value(1, "1").expect("valid PID field index");
        pid.set_field_value(2, Encoding::escape(&patient.uuid))
            .expect("valid PID field index");
        pid.set_field_value(3, identifiers.join("~"))
            .expect("valid PID field index");
        pid.set_field_value(5, name).expect("valid PID field index");
        pid.set_field_value(7, dob).expect("valid PID field index");
        pid.set_field_value(8, parse_sct_to_sex(patient.sex.as_deref()))
            .expect("valid PID field index");
        Ok(pid)
    }

    /// PV1 is only emitted for encounters the EPR knows about
    fn pv1_segment(&self, encounter: &Encounter) -> Result<Option<Segment>> {
        let Some(epr_encounter_id) = encounter.epr_encounter_id.as_deref() else {
            return Ok(None);
        };

        // The ODS code is a structured field; it is deliberately not escaped.
        let location = encounter
            .location_ods_code
            .as_deref()
            .ok_or(OruError::MissingField("location_ods_code"))?;
        let admitted_at = encounter
            .admitted_at
            .as_deref()
            .ok_or(OruError::MissingField("admitted_at"))?;
        let admission = iso8601_to_hl7(
            admitted_at,
            self.server_tz,
            &self.config.hl7_config.outgoing_timestamp_format,
        )?;

        let mut pv1 = Segment::new("PV1");
        pv1.set_field_value(1, "1").expect("valid PV1 field index");
        pv1.set_field_value(3, location).expect("valid PV1 field index");
        pv1.set_field_value(19, Encoding::escape(epr_encounter_id))
            .expect("valid PV1 field index");
        pv1.set_field_value(44, admission).expect("valid PV1 field index");
        Ok(Some(pv1))
    }

    fn obr_segment(&self, obs_set: &ObservationSet, collector: Option<&str>) -> Result<Segment> {
        let datetime = iso8601_to_hl7(
            &obs_set.record_time,
            self.server_tz,
            &self.config.hl7_config.outgoing_timestamp_format,
        )?;

        let mut obr = Segment::new("OBR");
        obr.set_field_value(1, "1").expect("valid OBR field index");
        obr.set_field_value(3, Encoding::escape(&obs_set.uuid))
            .expect("valid OBR field index");
        obr.set_field_value(4, "EWS").expect("valid OBR field index");
        obr.set_field_value(7, datetime).expect("valid OBR field index");
        if let Some(collector) = collector {
            obr.set_field_value(10, collector).expect("valid OBR field index");
        }
        obr.set_field_value(25, "F").expect("valid OBR field index");
        Ok(obr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dhc_trustomer::{Hl7Config, OxygenMask, SendConfig};

    fn config() -> TrustomerConfig {
        TrustomerConfig {
            hl7_config: Hl7Config {
                outgoing_timestamp_format: "%Y%m%d%H%M%S.%L%z".to_string(),
                outgoing_sending_application: "DHOS".to_string(),
                outgoing_sending_facility: "SENSYNE".to_string(),
                outgoing_receiving_application: "TRUST_TIE_ADT".to_string(),
                outgoing_receiving_facility: "TRUST".to_string(),
                outgoing_processing_id: "P".to_string(),
            },
            send_config: SendConfig {
                generate_oru_messages: true,
                oxygen_masks: vec![OxygenMask {
                    code: "H{mask_percent}".to_string(),
                    name: "Humidified".to_string(),
                }],
            },
        }
    }

    fn patient() -> Patient {
        serde_json::from_value(serde_json::json!({
            "uuid": "25e9c6e7-1b22-496d-9eda-6af919d7f254",
            "hospital_number": "111111",
            "nhs_number": "2222222222",
            "first_name": "Ugi",
            "last_name": "Maroon",
            "dob": "2002-11-23",
            "sex": "248152002"
        }))
        .unwrap()
    }

    #[test]
    fn test_derive_message_control_id() {
        assert_eq!(
            derive_message_control_id("0324e62b-88fb-4aef-b15c-ee0454ce997f"),
            "224ddf783bc4cc6c158f"
        );
        assert_eq!(
            derive_message_control_id("obs_set_uuid"),
            "0bcb18b24163b41f42e2"
        );
    }

    #[test]
    fn test_pid_segment() {
        let config = config();
        let generator = OruGenerator::new(&config, chrono_tz::UTC);
        let pid = generator.pid_segment(&patient()).unwrap();
        assert_eq!(
            pid.encode(&Delimiters::default()),
            "PID|1|25e9c6e7-1b22-496d-9eda-6af919d7f254|111111^^^^MRN~2222222222^^^^NHS||Maroon^Ugi||20021123|2"
        );
    }

    #[test]
    fn test_pid_segment_escapes_names() {
        let config = config();
        let generator = OruGenerator::new(&config, chrono_tz::UTC);
        let mut p = patient();
        p.first_name = "FIRST&NAME".to_string();
        p.nhs_number = None;
        p.dob = None;
        p.sex = Some("32570681000036106".to_string());

        let pid = generator.pid_segment(&p).unwrap();
        assert_eq!(
            pid.encode(&Delimiters::default()),
            "PID|1|25e9c6e7-1b22-496d-9eda-6af919d7f254|111111^^^^MRN||Maroon^FIRST\\T\\NAME|||4"
        );
    }

    #[test]
    fn test_pv1_segment() {
        let config = config();
        let generator = OruGenerator::new(&config, chrono_tz::UTC);
        let encounter: Encounter = serde_json::from_value(serde_json::json!({
            "epr_encounter_id": "2018L86699800",
            "location_ods_code": "J-WD 5A^Bay A^Bed 1",
            "admitted_at": "2018-07-25T11:00:00.000Z"
        }))
        .unwrap();

        let pv1 = generator.pv1_segment(&encounter).unwrap().unwrap();
        assert_eq!(
            pv1.encode(&Delimiters::default()),
            "PV1|1||J-WD 5A^Bay A^Bed 1||||||||||||||||2018L86699800|||||||||||||||||||||||||20180725110000.000+0000"
        );
    }

    #[test]
    fn test_pv1_absent_without_encounter_id() {
        let config = config();
        let generator = OruGenerator::new(&config, chrono_tz::UTC);
        let encounter: Encounter = serde_json::from_value(serde_json::json!({
            "location_ods_code": "BLARG",
            "admitted_at": "2019-05-23T11:27:18.483+04:00"
        }))
        .unwrap();

        assert!(generator.pv1_segment(&encounter).unwrap().is_none());
    }

    #[test]
    fn test_obr_segment_with_collector() {
        let config = config();
        let generator = OruGenerator::new(&config, chrono_tz::UTC);
        let obs_set: ObservationSet = serde_json::from_value(serde_json::json!({
            "uuid": "0324e62b-88fb-4aef-b15c-ee0454ce997f",
            "record_time": "2019-01-30T13:06:26.870Z"
        }))
        .unwrap();

        let obr = generator
            .obr_segment(&obs_set, Some("123456^Deer^Jane"))
            .unwrap();
        assert_eq!(
            obr.encode(&Delimiters::default()),
            "OBR|1||0324e62b-88fb-4aef-b15c-ee0454ce997f|EWS|||20190130130626.870+0000|||123456^Deer^Jane|||||||||||||||F"
        );
    }

    #[test]
    fn test_msh_segment() {
        let config = config();
        let generator =
            OruGenerator::new(&config, chrono_tz::UTC).with_timestamp("20190107123346.785+0000");
        let msh = generator.msh_segment("224ddf783bc4cc6c158f");
        assert_eq!(
            msh.encode(&Delimiters::default()),
            "MSH|^~\\&|DHOS|SENSYNE|TRUST_TIE_ADT|TRUST|20190107123346.785+0000||ORU^R01^ORU_R01|224ddf783bc4cc6c158f|P|2.6"
        );
    }
}
