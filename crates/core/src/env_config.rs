//! Environment variable parsing with warn-level logging for invalid values.

/// Parse an environment variable, falling back to `default`.
///
/// A missing variable is the expected case and stays silent. A variable that
/// is set but does not parse (after trimming) logs a warning naming the
/// variable and the rejected value.
pub fn env_parse_with_default<T: std::str::FromStr + std::fmt::Display>(
    var: &str,
    default: T,
) -> T {
    let Ok(raw) = std::env::var(var) else {
        return default;
    };
    match raw.trim().parse() {
        Ok(value) => value,
        Err(_) => {
            tracing::warn!(var, value = %raw, default = %default, "invalid env var value, using default");
            default
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(var: &str, value: &str) {
        // SAFETY: each test uses a unique variable name, so no other thread reads it.
        unsafe { std::env::set_var(var, value) };
    }

    fn unset(var: &str) {
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(var) };
    }

    #[test]
    fn parses_interval_override() {
        let var = "TREEWRIGHT_TEST_INTERVAL_41001";
        set(var, "90000");
        let interval: u64 = env_parse_with_default(var, 3_600_000);
        assert_eq!(interval, 90_000);
        unset(var);
    }

    #[test]
    fn trims_surrounding_whitespace() {
        let var = "TREEWRIGHT_TEST_TRIM_41002";
        set(var, "  25 ");
        let value: u32 = env_parse_with_default(var, 1);
        assert_eq!(value, 25);
        unset(var);
    }

    #[test]
    fn garbage_falls_back_to_default() {
        let var = "TREEWRIGHT_TEST_GARBAGE_41003";
        set(var, "hourly");
        let value: u64 = env_parse_with_default(var, 7);
        assert_eq!(value, 7);
        unset(var);
    }

    #[test]
    fn missing_var_uses_default() {
        let var = "TREEWRIGHT_TEST_MISSING_41004";
        unset(var);
        let value: u64 = env_parse_with_default(var, 11);
        assert_eq!(value, 11);
    }
}
