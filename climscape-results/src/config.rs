//! Service configuration loaded from the environment.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use climscape_core::ConfigError;
use climscape_storage::CacheConfig;

pub const ENV_DATA_ROOT: &str = "CLIMSCAPE_DATA_ROOT";
pub const ENV_CACHE_MAX_ENTRIES: &str = "CLIMSCAPE_CACHE_MAX_ENTRIES";
pub const ENV_CACHE_TTL_SECS: &str = "CLIMSCAPE_CACHE_TTL_SECS";
pub const ENV_CACHE_SHARDS: &str = "CLIMSCAPE_CACHE_SHARDS";
pub const ENV_LOG_JSON: &str = "CLIMSCAPE_LOG_JSON";

/// Configuration of the results services.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultsConfig {
    /// Directory holding the `simulation/` tree.
    pub data_root: PathBuf,
    /// Policy applied to every cache.
    pub cache: CacheConfig,
    /// Emit logs as JSON lines instead of the human-readable format.
    pub log_json: bool,
}

impl Default for ResultsConfig {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from("./data"),
            cache: CacheConfig::default(),
            log_json: false,
        }
    }
}

impl ResultsConfig {
    /// Create ResultsConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CLIMSCAPE_DATA_ROOT`: data directory (default: ./data)
    /// - `CLIMSCAPE_CACHE_MAX_ENTRIES`: settled entries per cache (default: 512)
    /// - `CLIMSCAPE_CACHE_TTL_SECS`: value lifetime in seconds, 0 or unset disables expiry
    /// - `CLIMSCAPE_CACHE_SHARDS`: lock shards per cache (default: 16)
    /// - `CLIMSCAPE_LOG_JSON`: "true" or "1" for JSON logs (default: false)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let read = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let data_root = read(ENV_DATA_ROOT)
            .map(PathBuf::from)
            .unwrap_or(defaults.data_root);

        let mut cache = defaults.cache;
        if let Some(max) = read(ENV_CACHE_MAX_ENTRIES) {
            cache = cache.with_max_entries(parse_positive(ENV_CACHE_MAX_ENTRIES, &max)?);
        }
        if let Some(shards) = read(ENV_CACHE_SHARDS) {
            cache = cache.with_shards(parse_positive(ENV_CACHE_SHARDS, &shards)?);
        }
        if let Some(ttl) = read(ENV_CACHE_TTL_SECS) {
            let secs: u64 = parse(ENV_CACHE_TTL_SECS, &ttl)?;
            if secs > 0 {
                cache = cache.with_ttl(Duration::from_secs(secs));
            }
        }

        let log_json = match read(ENV_LOG_JSON) {
            None => defaults.log_json,
            Some(v) => parse_bool(ENV_LOG_JSON, &v)?,
        };

        Ok(Self {
            data_root,
            cache,
            log_json,
        })
    }
}

fn parse<T>(field: &str, value: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: e.to_string(),
    })
}

fn parse_positive(field: &str, value: &str) -> Result<usize, ConfigError> {
    match parse::<usize>(field, value)? {
        0 => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "must be greater than zero".to_string(),
        }),
        n => Ok(n),
    }
}

fn parse_bool(field: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            field: field.to_string(),
            value: value.to_string(),
            reason: "expected true or false".to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults_when_unset() {
        let config = ResultsConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ResultsConfig::default());
        assert_eq!(config.cache.max_entries, 512);
        assert_eq!(config.cache.entry_ttl, None);
    }

    #[test]
    fn test_values_are_read() {
        let config = ResultsConfig::from_lookup(lookup(&[
            (ENV_DATA_ROOT, "/srv/climscape"),
            (ENV_CACHE_MAX_ENTRIES, "64"),
            (ENV_CACHE_TTL_SECS, "300"),
            (ENV_CACHE_SHARDS, " 4 "),
            (ENV_LOG_JSON, "TRUE"),
        ]))
        .unwrap();

        assert_eq!(config.data_root, PathBuf::from("/srv/climscape"));
        assert_eq!(config.cache.max_entries, 64);
        assert_eq!(config.cache.entry_ttl, Some(Duration::from_secs(300)));
        assert_eq!(config.cache.shards, 4);
        assert!(config.log_json);
    }

    #[test]
    fn test_zero_ttl_disables_expiry() {
        let config = ResultsConfig::from_lookup(lookup(&[(ENV_CACHE_TTL_SECS, "0")])).unwrap();
        assert_eq!(config.cache.entry_ttl, None);
    }

    #[test]
    fn test_invalid_values_are_errors() {
        let err = ResultsConfig::from_lookup(lookup(&[(ENV_CACHE_MAX_ENTRIES, "lots")])).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, ref value, .. }
                if field == ENV_CACHE_MAX_ENTRIES && value == "lots"
        ));

        assert!(ResultsConfig::from_lookup(lookup(&[(ENV_CACHE_SHARDS, "0")])).is_err());
        assert!(ResultsConfig::from_lookup(lookup(&[(ENV_LOG_JSON, "maybe")])).is_err());
    }
}
