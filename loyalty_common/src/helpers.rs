use std::str::FromStr;

/// Parse a boolean flag from a string value, or return the given default value otherwise.
pub fn parse_boolean_flag(value: Option<String>, default: bool) -> bool {
    let value = match value {
        Some(v) => v,
        None => return default,
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => default,
    }
}

/// Parse a numeric setting. Returns `Ok(None)` when the value is absent, and the raw string in the error when it
/// cannot be parsed, so that callers can log something useful before falling back to a default.
pub fn parse_numeric_setting<T: FromStr>(value: Option<String>) -> Result<Option<T>, String> {
    match value {
        None => Ok(None),
        Some(s) => s.trim().parse::<T>().map(Some).map_err(|_| s),
    }
}
