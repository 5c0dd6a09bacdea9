//! Engine configuration with environment overrides.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Per-attempt budget for one amenity mirror.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(25);
/// Search radius used until the user changes it.
pub const DEFAULT_RADIUS_M: u32 = 1500;
/// Quiet period before a suggestion query is issued.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(thiserror::Error, Debug)]
/// Errors raised while reading configuration.
pub enum ConfigError {
    /// Variable is set but cannot be parsed.
    #[error("Invalid value for {key}: {value:?}")]
    Invalid {
        /// Variable name.
        key: &'static str,
        /// Raw value.
        value: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Tunables shared by all engine components.
pub struct EngineConfig {
    /// Time budget for each mirror attempt.
    pub attempt_timeout: Duration,
    /// Initial search radius in metres.
    pub default_radius_m: u32,
    /// Debounce window for suggestions.
    pub debounce: Duration,
    /// Minimum characters before suggestions are requested.
    pub min_query_chars: usize,
    /// Maximum number of suggestions returned.
    pub suggestion_limit: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            default_radius_m: DEFAULT_RADIUS_M,
            debounce: DEFAULT_DEBOUNCE,
            min_query_chars: 2,
            suggestion_limit: 8,
        }
    }
}

impl EngineConfig {
    /// Load overrides from the process environment.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load overrides through an arbitrary lookup function.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when a variable is set but malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            attempt_timeout: parse_var(&lookup, "ROOST_ATTEMPT_TIMEOUT_SECS")?
                .map_or(defaults.attempt_timeout, Duration::from_secs),
            default_radius_m: parse_var(&lookup, "ROOST_RADIUS_M")?
                .unwrap_or(defaults.default_radius_m),
            debounce: parse_var(&lookup, "ROOST_DEBOUNCE_MS")?
                .map_or(defaults.debounce, Duration::from_millis),
            ..defaults
        })
    }
}

fn parse_var<T, F>(lookup: &F, key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_err| ConfigError::Invalid { key, value: raw })
}
