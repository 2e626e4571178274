use std::str::FromStr;

use super::ConfigError;

/// Read an environment variable, treating unset and blank values alike.
pub fn env_var(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Whether the variable is present at all (even if blank).
pub fn env_present(name: &str) -> bool {
    std::env::var_os(name).is_some()
}

/// Parse an environment variable into `T`, failing on malformed values.
pub fn parse_env<T>(name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(name)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{raw}': {e}"),
            })
        })
        .transpose()
}

/// Parse a boolean flag (`true/false`, `1/0`, `yes/no`, `on/off`).
pub fn parse_bool_env(name: &str) -> Result<Option<bool>, ConfigError> {
    env_var(name)
        .map(|raw| match raw.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Ok(true),
            "false" | "0" | "no" | "off" => Ok(false),
            _ => Err(ConfigError::InvalidValue {
                name: name.to_string(),
                message: format!("'{raw}' is not a boolean"),
            }),
        })
        .transpose()
}
