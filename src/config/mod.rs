//! Configuration module for the worldcache host.
//!
//! Loads configuration from environment variables, all of which are optional.

use std::env;
use std::time::Duration;

use crate::cache::CacheConfig;
use crate::error::ConfigError;

const TICK_INTERVAL_MS: &str = "WORLDCACHE_TICK_INTERVAL_MS";
const MAX_TICKS: &str = "WORLDCACHE_MAX_TICKS";
const SESSIONS: &str = "WORLDCACHE_SESSIONS";
const RELATIONS_CAPACITY: &str = "WORLDCACHE_RELATIONS_CAPACITY";
const INJURY_CAPACITY: &str = "WORLDCACHE_INJURY_CAPACITY";

/// Application configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Wall-clock time between simulation steps.
    pub tick_interval: Duration,

    /// Steps per session. 0 runs until interrupted.
    pub max_ticks: u64,

    /// How many sessions to load one after another.
    pub sessions: u32,

    pub relations_cache: CacheConfig,
    pub injury_cache: CacheConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            max_ticks: 600,
            sessions: 1,
            relations_cache: CacheConfig::relations(),
            injury_cache: CacheConfig::injury_bleeding(),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Call `dotenvy::dotenv()` first if a `.env` file should be honoured.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| env::var(var).ok())
    }

    /// Build a config from any variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        let number = |var: &'static str, default: u64| -> Result<u64, ConfigError> {
            match lookup(var) {
                None => Ok(default),
                Some(raw) => raw
                    .trim()
                    .parse::<u64>()
                    .map_err(|_| ConfigError::InvalidNumber { var, value: raw }),
            }
        };

        let tick_ms = number(TICK_INTERVAL_MS, defaults.tick_interval.as_millis() as u64)?;
        let sessions = number(SESSIONS, u64::from(defaults.sessions))?;
        let relations = number(RELATIONS_CAPACITY, defaults.relations_cache.capacity as u64)?;
        let injuries = number(INJURY_CAPACITY, defaults.injury_cache.capacity as u64)?;

        Ok(Self {
            tick_interval: Duration::from_millis(tick_ms.max(1)),
            max_ticks: number(MAX_TICKS, defaults.max_ticks)?,
            sessions: u32::try_from(sessions).unwrap_or(u32::MAX),
            relations_cache: CacheConfig::with_capacity(to_capacity(relations))
                .validate("relations")?,
            injury_cache: CacheConfig::with_capacity(to_capacity(injuries))
                .validate("injury-bleeding")?,
        })
    }
}

fn to_capacity(value: u64) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|var| vars.get(var).cloned())
    }

    #[test]
    fn test_defaults_when_unset() {
        assert_eq!(load(&[]).unwrap(), Config::default());
    }

    #[test]
    fn test_reads_overrides() {
        let config = load(&[
            (TICK_INTERVAL_MS, "25"),
            (MAX_TICKS, "0"),
            (SESSIONS, "3"),
            (RELATIONS_CAPACITY, " 64 "),
        ])
        .unwrap();

        assert_eq!(config.tick_interval, Duration::from_millis(25));
        assert_eq!(config.max_ticks, 0);
        assert_eq!(config.sessions, 3);
        assert_eq!(config.relations_cache.capacity, 64);
        assert_eq!(config.injury_cache, CacheConfig::injury_bleeding());
    }

    #[test]
    fn test_rejects_garbage() {
        let err = load(&[(MAX_TICKS, "forever")]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { var: MAX_TICKS, .. }));
    }

    #[test]
    fn test_rejects_zero_capacity() {
        let err = load(&[(INJURY_CAPACITY, "0")]).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroCapacity { name: "injury-bleeding" }));
    }
}
