use std::env::VarError;
use std::fmt::Display;
use std::str::FromStr;

use crate::error::ConfigError;

/// Read an environment variable, treating unset and empty as absent.
pub(crate) fn optional_env(key: &str) -> Result<Option<String>, ConfigError> {
    match std::env::var(key) {
        Ok(value) if value.is_empty() => Ok(None),
        Ok(value) => Ok(Some(value)),
        Err(VarError::NotPresent) => Ok(None),
        Err(VarError::NotUnicode(_)) => Err(ConfigError::NotUnicode {
            key: key.to_string(),
        }),
    }
}

/// Parse an optional raw value, falling back to `default` when absent.
pub(crate) fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: Display,
{
    match raw {
        Some(value) => value
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_or_uses_default_when_absent() {
        let port: u16 = parse_or("PORT", None, 9080).unwrap();
        assert_eq!(port, 9080);
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        let err = parse_or::<u16>("PORT", Some("http".to_string()), 9080).unwrap_err();
        match err {
            ConfigError::InvalidValue { key, .. } => assert_eq!(key, "PORT"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_or_trims_whitespace() {
        let port: u16 = parse_or("PORT", Some(" 3100 ".to_string()), 0).unwrap();
        assert_eq!(port, 3100);
    }
}
