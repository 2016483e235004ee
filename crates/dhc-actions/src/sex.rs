//! EPR sex code to SNOMED CT mapping

/// (SNOMED CT code, EPR spellings) per sex, in EPR numeric order
pub const EPR_SEX_MAP: &[(&str, &[&str])] = &[
    ("248153007", &["1", "M"]),          // male
    ("248152002", &["2", "F"]),          // female
    ("184115007", &["3", "U"]),          // unknown
    ("32570681000036106", &["4", "I"]),  // indeterminate
];

/// SNOMED CT code for "unknown" sex, the fallback for unrecognised input
pub const SCT_SEX_UNKNOWN: &str = "184115007";

/// Map a raw EPR sex code (PID-8) to a SNOMED CT code
pub fn parse_sex_to_sct(raw_sex: Option<&str>) -> &'static str {
    let raw = raw_sex.unwrap_or("").to_uppercase();
    for (sct, spellings) in EPR_SEX_MAP {
        if spellings.contains(&raw.as_str()) {
            return sct;
        }
    }
    tracing::info!(raw_sex = %raw, "Unknown sex code");
    SCT_SEX_UNKNOWN
}
