//! Environment overrides for policy constants.

pub const CONFIG_ENV: &str = "CISCOPE_CONFIG";
pub const WORKSPACE_ENV: &str = "CISCOPE_WORKSPACE";
pub const SMALL_LOG_BYTES_ENV: &str = "CISCOPE_SMALL_LOG_BYTES";
pub const LARGE_LOG_BYTES_ENV: &str = "CISCOPE_LARGE_LOG_BYTES";
pub const DIFF_SMALL_LINES_ENV: &str = "CISCOPE_DIFF_SMALL_LINES";
pub const DIFF_MEDIUM_LINES_ENV: &str = "CISCOPE_DIFF_MEDIUM_LINES";

/// Parse a raw override, keeping `current` when the value is missing, blank or malformed.
pub fn parse_override<T: std::str::FromStr + Copy>(
    name: &str,
    raw: Option<&str>,
    current: T,
) -> T {
    let Some(value) = raw.map(str::trim).filter(|v| !v.is_empty()) else {
        return current;
    };
    match value.parse::<T>() {
        Ok(parsed) => parsed,
        Err(_) => {
            log::warn!("Ignoring invalid value for {name}: {value:?}");
            current
        }
    }
}

pub fn override_from_env<T: std::str::FromStr + Copy>(name: &str, current: T) -> T {
    let raw = std::env::var(name).ok();
    parse_override(name, raw.as_deref(), current)
}

/// Non-empty string value of an environment variable.
pub fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_override_defaults_and_parses() {
        assert_eq!(parse_override("X", None, 5usize), 5);
        assert_eq!(parse_override("X", Some(""), 5usize), 5);
        assert_eq!(parse_override("X", Some("   "), 5usize), 5);
        assert_eq!(parse_override("X", Some("abc"), 5usize), 5);
        assert_eq!(parse_override("X", Some(" 42 "), 5usize), 42);
        assert_eq!(parse_override("X", Some("-1"), 5u64), 5);
    }
}
