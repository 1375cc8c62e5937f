const ENABLED: [&str; 4] = ["1", "true", "yes", "on"];
const DISABLED: [&str; 4] = ["0", "false", "no", "off"];

/// Reads an on/off environment flag such as `STOREKIT_SANDBOX=Yes`. Case and surrounding whitespace are ignored.
/// A missing or unrecognised value yields `default`.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    value.as_deref().map(str::trim).and_then(flag_state).unwrap_or(default)
}

fn flag_state(value: &str) -> Option<bool> {
    let matches = |words: &[&str]| words.iter().any(|w| value.eq_ignore_ascii_case(w));
    if matches(&ENABLED) {
        Some(true)
    } else if matches(&DISABLED) {
        Some(false)
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn boolean_flags() {
        assert!(parse_boolean_flag(Some("YES".into()), false));
        assert!(parse_boolean_flag(Some(" on ".into()), false));
        assert!(!parse_boolean_flag(Some("0".into()), true));
        assert!(parse_boolean_flag(Some("maybe".into()), true));
        assert!(!parse_boolean_flag(None, false));
        assert!(parse_boolean_flag(None, true));
        assert!(!parse_boolean_flag(Some("Off\n".into()), true));
        assert!(!parse_boolean_flag(Some(String::new()), false));
    }
}
