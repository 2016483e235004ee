//! SNOMED CT sex code to EPR code mapping (the reverse of the inbound map)

/// (SNOMED CT code, preferred EPR numeric code)
const SCT_SEX_MAP: &[(&str, &str)] = &[
    ("248153007", "1"),         // male
    ("248152002", "2"),         // female
    ("184115007", "3"),         // unknown
    ("32570681000036106", "4"), // indeterminate
];

/// EPR code for "unknown" sex, the fallback for unrecognised input
const EPR_SEX_UNKNOWN: &str = "3";

/// Map a SNOMED CT sex code to the EPR's preferred numeric code
pub fn parse_sct_to_sex(sex_sct: Option<&str>) -> &'static str {
    let Some(sct) = sex_sct.filter(|s| !s.is_empty()) else {
        return EPR_SEX_UNKNOWN;
    };

    match SCT_SEX_MAP.iter().find(|(code, _)| *code == sct) {
        Some((_, epr)) => epr,
        None => {
            tracing::info!(%sct, "Unknown sex SCT code");
            EPR_SEX_UNKNOWN
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes() {
        assert_eq!(parse_sct_to_sex(Some("248153007")), "1");
        assert_eq!(parse_sct_to_sex(Some("248152002")), "2");
        assert_eq!(parse_sct_to_sex(Some("184115007")), "3");
        assert_eq!(parse_sct_to_sex(Some("32570681000036106")), "4");
    }

    #[test]
    fn test_unknown_falls_back() {
        assert_eq!(parse_sct_to_sex(Some("12345")), "3");
        assert_eq!(parse_sct_to_sex(Some("")), "3");
        assert_eq!(parse_sct_to_sex(None), "3");
    }
}
