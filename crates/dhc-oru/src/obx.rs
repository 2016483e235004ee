//! OBX segment generation
//!
//! Segments are produced in a fixed order: overall score block, time next
//! observation set due, minutes late, then one block per vital. OBX-1 is
//! always computed from the number of segments already emitted, so skipped
//! observations never leave gaps in the numbering.

use chrono_tz::Tz;
use dhc_core::{Encoding, Segment};
use dhc_trustomer::OxygenMask;
use dhc_wrapper::datetime::iso8601_to_hl7;

use crate::types::{Observation, ObservationSet};
use crate::{OruError, Result};

/// Score systems the EPR understands
pub const VALID_EWS_SCORE_SYSTEMS: &[&str] = &["NEWS2", "MEOWS"];

/// Shared generation context for the OBX ladder
pub(crate) struct ObxContext<'a> {
    pub format: &'a str,
    pub server_tz: Tz,
    pub collector: Option<&'a str>,
    pub oxygen_masks: &'a [OxygenMask],
}

impl ObxContext<'_> {
    fn hl7_datetime(&self, iso: &str) -> Result<String> {
        Ok(iso8601_to_hl7(iso, self.server_tz, self.format)?)
    }
}

struct Obx<'a> {
    idx: usize,
    category: &'a str,
    code: &'a str,
    value: String,
    datetime: &'a str,
    unit: Option<String>,
    collector: Option<&'a str>,
    reference_range: Option<String>,
    abnormal_flags: Option<String>,
    patient_refused: bool,
}

impl<'a> Obx<'a> {
    fn new(idx: usize, category: &'a str, code: &'a str, value: String, datetime: &'a str) -> Self {
        Self {
            idx,
            category,
            code,
            value,
            datetime,
            unit: None,
            collector: None,
            reference_range: None,
            abnormal_flags: None,
            patient_refused: false,
        }
    }

    fn unit(mut self, unit: Option<&str>) -> Self {
        self.unit = unit.filter(|u| !u.is_empty()).map(Encoding::escape);
        self
    }

    fn collector(mut self, collector: Option<&'a str>) -> Self {
        self.collector = collector;
        self
    }

    fn reference_range(mut self, range: Option<&str>) -> Self {
        self.reference_range = range.map(Encoding::escape);
        self
    }

    fn abnormal_flags(mut self, flags: Option<&str>) -> Self {
        self.abnormal_flags = flags.map(Encoding::escape);
        self
    }

    fn patient_refused(mut self, refused: Option<bool>) -> Self {
        self.patient_refused = refused == Some(true);
        self
    }

    fn build(self) -> Segment {
        let mut obx = Segment::new("OBX");
        let set = |seg: &mut Segment, idx, value: &str| {
            // Indices stay within the extendable range, so this cannot fail.
            seg.set_field_value(idx, value).expect("valid OBX field index");
        };

        set(&mut obx, 1, &self.idx.to_string());
        set(&mut obx, 2, self.category);
        set(&mut obx, 3, self.code);

        let value = if self.patient_refused {
            "patient_refused".to_string()
        } else {
            self.value
        };
        set(&mut obx, 5, &value);

        if let Some(unit) = &self.unit {
            set(&mut obx, 6, &format!("^{unit}"));
        }
        if let Some(range) = &self.reference_range {
            set(&mut obx, 7, range);
        }
        if let Some(flags) = &self.abnormal_flags {
            set(&mut obx, 8, flags);
        }

        set(&mut obx, 11, "F");
        set(&mut obx, 14, self.datetime);

        if let Some(collector) = self.collector {
            set(&mut obx, 16, collector);
        }

        obx
    }
}

/// Round a nominally integer vital to the nearest integer
pub(crate) fn format_rounded(value: Option<f64>) -> String {
    value.map(|v| (v.round() as i64).to_string()).unwrap_or_default()
}

/// Write a non-integer-bearing value verbatim
pub(crate) fn format_verbatim(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// ScoringSystem, SpO2Scale, TotalScore and Severity segments
pub(crate) fn overall_score(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    tracing::debug!("Generating OBX segments for overall score");
    let mut segments = Vec::new();
    let datetime = ctx.hl7_datetime(&obs_set.record_time)?;
    let mut idx = start_idx;

    let score_system = obs_set
        .score_system
        .as_deref()
        .filter(|s| !s.is_empty())
        .map(str::to_uppercase);

    if let Some(system) = &score_system {
        if !VALID_EWS_SCORE_SYSTEMS.contains(&system.as_str()) {
            return Err(OruError::UnexpectedScoreSystem(system.clone()));
        }
        segments.push(
            Obx::new(idx, "ST", "ScoringSystem", Encoding::escape(system), &datetime).build(),
        );
        idx += 1;
    }

    if score_system.as_deref() == Some("NEWS2") {
        if let Some(scale) = obs_set.spo2_scale {
            segments.push(
                Obx::new(idx, "ST", "SpO2Scale", format!("Scale {scale}"), &datetime).build(),
            );
            idx += 1;
        }
    }

    if let Some(score) = obs_set.score_value {
        segments.push(
            Obx::new(idx, "NM", "TotalScore", score.to_string(), &datetime)
                .reference_range(obs_set.obx_reference_range.as_deref())
                .abnormal_flags(obs_set.obx_abnormal_flags.as_deref())
                .build(),
        );
        idx += 1;
    }

    if let Some(severity) = obs_set.score_severity.as_deref().filter(|s| !s.is_empty()) {
        segments.push(Obx::new(idx, "ST", "Severity", severity.to_string(), &datetime).build());
    }

    Ok(segments)
}

/// TimeNextObsSetDue segment, when the set carries a due time
pub(crate) fn time_next_due(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();

    if let Some(due) = obs_set
        .time_next_obs_set_due
        .as_deref()
        .filter(|s| !s.is_empty())
    {
        let datetime = ctx.hl7_datetime(&obs_set.record_time)?;
        let due_hl7 = ctx.hl7_datetime(due)?;
        segments.push(Obx::new(start_idx, "TS", "TimeNextObsSetDue", due_hl7, &datetime).build());
    }

    Ok(segments)
}

/// MinutesLate segment, when the set was late (or early)
pub(crate) fn mins_late(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();

    if let Some(mins) = obs_set.mins_late.filter(|m| *m != 0) {
        let datetime = ctx.hl7_datetime(&obs_set.record_time)?;
        segments.push(Obx::new(start_idx, "NM", "MinutesLate", mins.to_string(), &datetime).build());
    }

    Ok(segments)
}

/// A rounded numeric vital (HR, RR, DBP, SBP, SpO2) with its score companion
pub(crate) fn numeric_vital(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
    observation_type: &str,
    code: &str,
) -> Result<Vec<Segment>> {
    tracing::debug!(observation_type, "Generating OBX segments");
    let mut segments = Vec::new();

    if let Some(obs) = obs_set.observation_with_value(observation_type) {
        let datetime = ctx.hl7_datetime(&obs.measured_time)?;
        segments.push(
            Obx::new(start_idx, "NM", code, format_rounded(obs.observation_value), &datetime)
                .unit(obs.observation_unit.as_deref())
                .collector(ctx.collector)
                .patient_refused(obs.patient_refused)
                .build(),
        );
        push_score(&mut segments, obs, code, start_idx + 1, &datetime);
    }

    Ok(segments)
}

/// BPPOS: patient position shared by the blood pressure pair
pub(crate) fn bp_posture(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    tracing::debug!("Generating OBX segments for bp posture");
    let mut segments = Vec::new();

    let position = ["systolic_blood_pressure", "diastolic_blood_pressure"]
        .into_iter()
        .filter_map(|t| obs_set.observation_with_value(t))
        .find_map(|obs| {
            let position = obs
                .observation_metadata
                .as_ref()?
                .patient_position
                .clone()
                .filter(|p| !p.is_empty())?;
            Some((position, obs.measured_time.clone()))
        });

    if let Some((position, measured_time)) = position {
        let datetime = ctx.hl7_datetime(&measured_time)?;
        segments.push(
            Obx::new(start_idx, "ST", "BPPOS", Encoding::escape(&position), &datetime)
                .collector(ctx.collector)
                .build(),
        );
    }

    Ok(segments)
}

/// O2Rate, O2Delivery (mask) and O2Score segments
pub(crate) fn o2_therapy(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    tracing::debug!("Generating OBX segments for oxygen therapy");
    let mut segments = Vec::new();

    let Some(obs) = obs_set.observation_with_value("o2_therapy_status") else {
        return Ok(segments);
    };

    let datetime = ctx.hl7_datetime(&obs.measured_time)?;
    let mut idx = start_idx;

    segments.push(
        Obx::new(idx, "NM", "O2Rate", format_verbatim(obs.observation_value), &datetime)
            .unit(obs.observation_unit.as_deref())
            .collector(ctx.collector)
            .build(),
    );
    idx += 1;

    if let Some((mask_code, mask_name)) = resolve_mask(obs, ctx.oxygen_masks) {
        let value = format!(
            "{}^{}",
            Encoding::escape(&mask_code),
            Encoding::escape(&mask_name)
        );
        segments.push(
            Obx::new(idx, "CE", "O2Delivery", value, &datetime)
                .collector(ctx.collector)
                .build(),
        );
        idx += 1;
    }

    if let Some(score) = obs.score_value {
        segments.push(Obx::new(idx, "NM", "O2Score", score.to_string(), &datetime).build());
    }

    Ok(segments)
}

/// Resolve the configured mask code and display name for an O2 observation
///
/// The configured code may carry a `{mask_percent}` placeholder, substituted
/// with the observed percentage (21, ambient air, when absent). The display
/// name gets a ` <percent>%` suffix when a percentage was observed.
fn resolve_mask(obs: &Observation, masks: &[OxygenMask]) -> Option<(String, String)> {
    let metadata = obs.observation_metadata.as_ref()?;
    let mask_name = metadata.mask.as_deref().filter(|m| !m.is_empty())?;

    let mapping = masks.iter().find(|m| m.name == mask_name)?;
    let percent = metadata.mask_percent;

    let code = mapping.code.replace(
        "{mask_percent}",
        &percent.map(|p| p.to_string()).unwrap_or_else(|| "21".to_string()),
    );

    let display_name = match percent {
        Some(p) => format!("{mask_name} {p}%"),
        None => mask_name.to_string(),
    };

    Some((code, display_name))
}

/// Temperature with its score companion (value written verbatim)
pub(crate) fn temperature(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    tracing::debug!("Generating OBX segments for temperature");
    let mut segments = Vec::new();

    if let Some(obs) = obs_set.observation_with_value("temperature") {
        let datetime = ctx.hl7_datetime(&obs.measured_time)?;
        segments.push(
            Obx::new(start_idx, "NM", "TEMP", format_verbatim(obs.observation_value), &datetime)
                .unit(obs.observation_unit.as_deref())
                .collector(ctx.collector)
                .patient_refused(obs.patient_refused)
                .build(),
        );
        push_score(&mut segments, obs, "TEMP", start_idx + 1, &datetime);
    }

    Ok(segments)
}

/// ACVPU consciousness as a coded value (`V^Voice`) with its score companion
pub(crate) fn acvpu(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    tracing::debug!("Generating OBX segments for ACVPU");
    let mut segments = Vec::new();

    if let Some(obs) = obs_set.observation_with_value("consciousness_acvpu") {
        let datetime = ctx.hl7_datetime(&obs.measured_time)?;
        let word = Encoding::escape(obs.observation_string.as_deref().unwrap_or(""));

        if let Some(initial) = word.chars().next() {
            segments.push(
                Obx::new(start_idx, "CE", "ACVPU", format!("{initial}^{word}"), &datetime)
                    .collector(ctx.collector)
                    .build(),
            );
            push_score(&mut segments, obs, "ACVPU", start_idx + 1, &datetime);
        }
    }

    Ok(segments)
}

/// GCS: per-component coded segments then the overall numeric value
pub(crate) fn gcs(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    tracing::debug!("Generating OBX segments for GCS");
    let mut segments = Vec::new();

    let Some(obs) = obs_set.observation_with_value("consciousness_gcs") else {
        return Ok(segments);
    };

    let datetime = ctx.hl7_datetime(&obs.measured_time)?;
    let mut idx = start_idx;

    if let Some(meta) = &obs.observation_metadata {
        let components = [
            ("GCS-Eyes", meta.gcs_eyes, meta.gcs_eyes_description.as_deref()),
            ("GCS-Verbal", meta.gcs_verbal, meta.gcs_verbal_description.as_deref()),
            ("GCS-Motor", meta.gcs_motor, meta.gcs_motor_description.as_deref()),
        ];

        for (code, value, description) in components {
            let (Some(value), Some(description)) =
                (value, description.filter(|d| !d.is_empty()))
            else {
                tracing::info!(code, "Skipping OBX segment, missing required metadata");
                continue;
            };

            let obx_value = format!("{value}^{}", Encoding::escape(description));
            segments.push(
                Obx::new(idx, "CE", code, obx_value, &datetime)
                    .collector(ctx.collector)
                    .build(),
            );
            idx += 1;
        }
    }

    let overall = obs
        .observation_value
        .map(|v| (v as i64).to_string())
        .unwrap_or_default();
    segments.push(
        Obx::new(idx, "NM", "GCS", overall, &datetime)
            .collector(ctx.collector)
            .build(),
    );

    Ok(segments)
}

/// One NC segment per comma-separated concern
pub(crate) fn nurse_concern(
    obs_set: &ObservationSet,
    ctx: &ObxContext<'_>,
    start_idx: usize,
) -> Result<Vec<Segment>> {
    tracing::debug!("Generating OBX segments for nurse concern");
    let mut segments = Vec::new();

    if let Some(obs) = obs_set.observation_with_value("nurse_concern") {
        let datetime = ctx.hl7_datetime(&obs.measured_time)?;

        if let Some(concerns) = &obs.observation_string {
            for (offset, concern) in concerns.split(',').enumerate() {
                segments.push(
                    Obx::new(
                        start_idx + offset,
                        "ST",
                        "NC",
                        Encoding::escape(concern.trim()),
                        &datetime,
                    )
                    .collector(ctx.collector)
                    .build(),
                );
            }
        }
    }

    Ok(segments)
}

fn push_score(
    segments: &mut Vec<Segment>,
    obs: &Observation,
    code: &str,
    idx: usize,
    datetime: &str,
) {
    if let Some(score) = obs.score_value {
        segments.push(
            Obx::new(idx, "NM", &format!("{code}Score"), score.to_string(), datetime).build(),
        );
    }
}
