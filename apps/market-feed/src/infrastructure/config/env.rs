//! Environment Lookup
//!
//! Typed accessors over a key lookup. Settings are parsed through
//! [`EnvSource`] rather than `std::env` directly so tests can feed a map.

use std::collections::HashMap;
use std::time::Duration;

use super::settings::ConfigError;

/// Source of configuration values keyed by variable name.
pub struct EnvSource<'a> {
    lookup: Box<dyn Fn(&str) -> Option<String> + 'a>,
}

impl<'a> EnvSource<'a> {
    /// Read from the process environment.
    #[must_use]
    pub fn process() -> Self {
        Self::from_fn(|key| std::env::var(key).ok())
    }

    /// Read from an arbitrary lookup function.
    pub fn from_fn(lookup: impl Fn(&str) -> Option<String> + 'a) -> Self {
        Self {
            lookup: Box::new(lookup),
        }
    }

    /// Read from a fixed map.
    #[must_use]
    pub fn from_map(map: &'a HashMap<String, String>) -> Self {
        Self::from_fn(move |key| map.get(key).cloned())
    }

    /// Value of `key`, treating blank values as unset.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|v| !v.trim().is_empty())
    }

    /// Required, non-empty value.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingEnvVar`] when unset and
    /// [`ConfigError::EmptyValue`] when blank.
    pub fn required(&self, key: &str) -> Result<String, ConfigError> {
        match (self.lookup)(key) {
            None => Err(ConfigError::MissingEnvVar(key.to_string())),
            Some(v) if v.trim().is_empty() => Err(ConfigError::EmptyValue(key.to_string())),
            Some(v) => Ok(v.trim().to_string()),
        }
    }

    /// Value of `key` or `default`.
    #[must_use]
    pub fn string_or(&self, key: &str, default: &str) -> String {
        self.get(key)
            .map_or_else(|| default.to_string(), |v| v.trim().to_string())
    }

    /// Parsed value of `key`, or `default` when unset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when set but unparseable.
    pub fn parse_or<T>(&self, key: &str, default: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|e: T::Err| ConfigError::invalid(key, &raw, e.to_string())),
        }
    }

    /// Optional parsed value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when set but unparseable.
    pub fn parse_opt<T>(&self, key: &str) -> Result<Option<T>, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        self.get(key)
            .map(|raw| {
                raw.trim()
                    .parse()
                    .map_err(|e: T::Err| ConfigError::invalid(key, &raw, e.to_string()))
            })
            .transpose()
    }

    /// Duration string value of `key` (see [`parse_duration`]).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when set but unparseable.
    pub fn duration_or(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        match self.get(key) {
            None => Ok(default),
            Some(raw) => parse_duration(&raw).ok_or_else(|| {
                ConfigError::invalid(key, &raw, "expected <n>ms, <n>s, <n>m or <n>h")
            }),
        }
    }

    /// Whole seconds value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when set but not an integer.
    pub fn secs_or(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        self.parse_or(key, default.as_secs()).map(Duration::from_secs)
    }

    /// Whole milliseconds value of `key`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] when set but not an integer.
    pub fn millis_or(&self, key: &str, default: Duration) -> Result<Duration, ConfigError> {
        let default_ms = u64::try_from(default.as_millis()).unwrap_or(u64::MAX);
        self.parse_or(key, default_ms).map(Duration::from_millis)
    }
}

impl std::fmt::Debug for EnvSource<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EnvSource").finish_non_exhaustive()
    }
}

/// Parse a duration such as `500ms`, `10s`, `20m`, `1h` or bare `10` (seconds).
#[must_use]
pub fn parse_duration(raw: &str) -> Option<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (digits, unit) = raw.split_at(split);
    let value: u64 = digits.parse().ok()?;

    match unit.trim() {
        "ms" => Some(Duration::from_millis(value)),
        "" | "s" => Some(Duration::from_secs(value)),
        "m" => value.checked_mul(60).map(Duration::from_secs),
        "h" => value.checked_mul(3600).map(Duration::from_secs),
        _ => None,
    }
}

/// Load `.env` from the current directory or the nearest ancestor that has one.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_ok() {
        return;
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    fn source(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test_case("10s", Duration::from_secs(10) ; "seconds")]
    #[test_case("500ms", Duration::from_millis(500) ; "millis")]
    #[test_case("20m", Duration::from_secs(1200) ; "minutes")]
    #[test_case("1h", Duration::from_secs(3600) ; "hours")]
    #[test_case("15", Duration::from_secs(15) ; "bare seconds")]
    #[test_case(" 3s ", Duration::from_secs(3) ; "padded")]
    fn durations_parse(raw: &str, expected: Duration) {
        assert_eq!(parse_duration(raw), Some(expected));
    }

    #[test_case("" ; "empty")]
    #[test_case("s" ; "no digits")]
    #[test_case("10d" ; "unknown unit")]
    #[test_case("1.5s" ; "fractional")]
    #[test_case("-5s" ; "negative")]
    fn bad_durations_are_rejected(raw: &str) {
        assert_eq!(parse_duration(raw), None);
    }

    #[test]
    fn required_distinguishes_missing_from_blank() {
        let map = source(&[("BLANK", "  ")]);
        let env = EnvSource::from_map(&map);

        assert!(matches!(
            env.required("UNSET"),
            Err(ConfigError::MissingEnvVar(key)) if key == "UNSET"
        ));
        assert!(matches!(
            env.required("BLANK"),
            Err(ConfigError::EmptyValue(key)) if key == "BLANK"
        ));
    }

    #[test]
    fn parse_or_falls_back_only_when_unset() {
        let map = source(&[("PORT", "9100"), ("BAD_PORT", "ninety")]);
        let env = EnvSource::from_map(&map);

        assert_eq!(env.parse_or("PORT", 9000_u16).unwrap(), 9100);
        assert_eq!(env.parse_or("OTHER_PORT", 9000_u16).unwrap(), 9000);
        assert!(matches!(
            env.parse_or("BAD_PORT", 9000_u16),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
