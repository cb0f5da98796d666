//! # Configuration Module
//!
//! This module defines configuration structures for the bot: scheduling
//! policy, word queue paging, recovery probing, session workers and
//! backend access.
//! Every group has a `Default` holding the documented values and can be
//! overridden from the environment.

use std::env;
use std::str::FromStr;

use crate::errors::ConfigError;

// Constants for default configuration
pub const DEFAULT_BASE_INTERVAL_DAYS: u32 = 1;
pub const DEFAULT_MULTIPLIER: f64 = 2.0;
pub const DEFAULT_MAX_INTERVAL_DAYS: u32 = 32;
pub const DEFAULT_PAGE_SIZE: usize = 100;
pub const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_SESSION_IDLE_TIMEOUT_SECS: u64 = 1800;

/// How a revealed hint affects the scheduling of the following answer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HintPolicy {
    /// Hint usage counts as an unknown answer
    #[default]
    Failure,
    /// Hint usage keeps score and interval as they are for this turn
    FreezeInterval,
}

impl FromStr for HintPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "failure" => Ok(HintPolicy::Failure),
            "freeze" | "freeze_interval" => Ok(HintPolicy::FreezeInterval),
            other => Err(ConfigError::InvalidValue {
                name: "SCHEDULER_HINT_POLICY",
                value: other.to_string(),
            }),
        }
    }
}

/// Spaced-repetition scheduling constants
#[derive(Debug, Clone, PartialEq)]
pub struct SchedulerPolicy {
    /// Interval after a failure and after the first success, in days
    pub base_interval: u32,
    /// Growth factor applied on every further success
    pub multiplier: f64,
    /// Ceiling for the interval, in days
    pub max_interval: u32,
    pub hint_policy: HintPolicy,
}

impl Default for SchedulerPolicy {
    fn default() -> Self {
        Self {
            base_interval: DEFAULT_BASE_INTERVAL_DAYS,
            multiplier: DEFAULT_MULTIPLIER,
            max_interval: DEFAULT_MAX_INTERVAL_DAYS,
            hint_policy: HintPolicy::Failure,
        }
    }
}

/// Word queue paging configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueConfig {
    /// Number of study items requested per backend fetch
    pub page_size: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

/// Recovery configuration for backend failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryConfig {
    /// Maximum number of health probes per retry command
    pub max_probes: u32,
    /// Base delay between probes in milliseconds
    pub base_probe_delay_ms: u64,
    /// Maximum delay between probes in milliseconds
    pub max_probe_delay_ms: u64,
    /// Probe backend health before routing each event
    pub probe_before_dispatch: bool,
}

impl Default for RecoveryConfig {
    fn default() -> Self {
        Self {
            max_probes: 3,
            base_probe_delay_ms: 200,
            max_probe_delay_ms: 2000,
            probe_before_dispatch: true,
        }
    }
}

/// Per-user worker lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    /// Seconds without events after which a user's worker task is stopped
    pub idle_timeout_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: DEFAULT_SESSION_IDLE_TIMEOUT_SECS,
        }
    }
}

/// Backend gateway connection settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    /// Base URL of the REST backend; `None` selects the in-memory backend
    pub base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: None,
            timeout_secs: DEFAULT_BACKEND_TIMEOUT_SECS,
        }
    }
}

/// Complete application configuration
#[derive(Debug, Clone, PartialEq, Default)]
pub struct AppConfig {
    pub scheduler: SchedulerPolicy,
    pub queue: QueueConfig,
    pub recovery: RecoveryConfig,
    pub session: SessionConfig,
    pub backend: BackendConfig,
    pub admin_chat_ids: Vec<i64>,
}

impl AppConfig {
    /// Load the configuration from process environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load the configuration from an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = AppConfig::default();

        let scheduler = SchedulerPolicy {
            base_interval: parse_or(&lookup, "SCHEDULER_BASE_INTERVAL", defaults.scheduler.base_interval)?,
            multiplier: parse_or(&lookup, "SCHEDULER_MULTIPLIER", defaults.scheduler.multiplier)?,
            max_interval: parse_or(&lookup, "SCHEDULER_MAX_INTERVAL", defaults.scheduler.max_interval)?,
            hint_policy: match lookup("SCHEDULER_HINT_POLICY") {
                Some(raw) => raw.parse()?,
                None => defaults.scheduler.hint_policy,
            },
        };

        let queue = QueueConfig {
            page_size: parse_or(&lookup, "QUEUE_PAGE_SIZE", defaults.queue.page_size)?,
        };

        let recovery = RecoveryConfig {
            max_probes: parse_or(&lookup, "RECOVERY_MAX_PROBES", defaults.recovery.max_probes)?,
            base_probe_delay_ms: parse_or(
                &lookup,
                "RECOVERY_BASE_DELAY_MS",
                defaults.recovery.base_probe_delay_ms,
            )?,
            max_probe_delay_ms: parse_or(
                &lookup,
                "RECOVERY_MAX_DELAY_MS",
                defaults.recovery.max_probe_delay_ms,
            )?,
            probe_before_dispatch: parse_or(
                &lookup,
                "RECOVERY_PROBE_BEFORE_DISPATCH",
                defaults.recovery.probe_before_dispatch,
            )?,
        };

        let session = SessionConfig {
            idle_timeout_secs: parse_or(
                &lookup,
                "SESSION_IDLE_TIMEOUT_SECS",
                defaults.session.idle_timeout_secs,
            )?,
        };

        let backend = BackendConfig {
            base_url: lookup("BACKEND_URL")
                .map(|url| url.trim().trim_end_matches('/').to_string())
                .filter(|url| !url.is_empty()),
            timeout_secs: parse_or(&lookup, "BACKEND_TIMEOUT_SECS", DEFAULT_BACKEND_TIMEOUT_SECS)?,
        };

        let admin_chat_ids = match lookup("ADMIN_CHAT_IDS") {
            Some(raw) => raw
                .split(',')
                .map(str::trim)
                .filter(|id| !id.is_empty())
                .map(|id| {
                    id.parse::<i64>().map_err(|_| ConfigError::InvalidValue {
                        name: "ADMIN_CHAT_IDS",
                        value: id.to_string(),
                    })
                })
                .collect::<Result<Vec<_>, _>>()?,
            None => Vec::new(),
        };

        let config = AppConfig {
            scheduler,
            queue,
            recovery,
            session,
            backend,
            admin_chat_ids,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let s = &self.scheduler;
        if s.base_interval == 0 {
            return Err(ConfigError::Inconsistent(
                "base interval must be at least one day".to_string(),
            ));
        }
        if s.max_interval < s.base_interval {
            return Err(ConfigError::Inconsistent(format!(
                "max interval {} is below base interval {}",
                s.max_interval, s.base_interval
            )));
        }
        if !s.multiplier.is_finite() || s.multiplier < 1.0 {
            return Err(ConfigError::Inconsistent(format!(
                "multiplier {} must be a finite number >= 1",
                s.multiplier
            )));
        }
        if self.queue.page_size == 0 {
            return Err(ConfigError::Inconsistent("page size must be positive".to_string()));
        }
        if self.recovery.max_probes == 0 {
            return Err(ConfigError::Inconsistent(
                "at least one recovery probe is required".to_string(),
            ));
        }
        if self.session.idle_timeout_secs == 0 {
            return Err(ConfigError::Inconsistent(
                "session idle timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

fn parse_or<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        Some(raw) => raw.trim().parse::<T>().map_err(|_| ConfigError::InvalidValue {
            name,
            value: raw,
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_match_documented_values() {
        let config = AppConfig::default();
        assert_eq!(config.scheduler.base_interval, 1);
        assert_eq!(config.scheduler.multiplier, 2.0);
        assert_eq!(config.scheduler.max_interval, 32);
        assert_eq!(config.scheduler.hint_policy, HintPolicy::Failure);
        assert_eq!(config.queue.page_size, 100);
        assert_eq!(config.backend.timeout_secs, 10);
        assert_eq!(config.session.idle_timeout_secs, 1800);
        assert!(config.backend.base_url.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_lookup_overrides() {
        let config = AppConfig::from_lookup(lookup_from(&[
            ("SCHEDULER_MAX_INTERVAL", "64"),
            ("SCHEDULER_HINT_POLICY", "freeze"),
            ("QUEUE_PAGE_SIZE", "25"),
            ("SESSION_IDLE_TIMEOUT_SECS", "60"),
            ("BACKEND_URL", "http://localhost:8000/api/"),
            ("ADMIN_CHAT_IDS", "42, 7"),
        ]))
        .unwrap();

        assert_eq!(config.scheduler.max_interval, 64);
        assert_eq!(config.scheduler.hint_policy, HintPolicy::FreezeInterval);
        assert_eq!(config.queue.page_size, 25);
        assert_eq!(config.session.idle_timeout_secs, 60);
        assert_eq!(config.backend.base_url.as_deref(), Some("http://localhost:8000/api"));
        assert_eq!(config.admin_chat_ids, vec![42, 7]);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(AppConfig::from_lookup(lookup_from(&[("QUEUE_PAGE_SIZE", "many")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("QUEUE_PAGE_SIZE", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("SCHEDULER_MULTIPLIER", "0.5")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("SCHEDULER_MAX_INTERVAL", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("ADMIN_CHAT_IDS", "1,x")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("SESSION_IDLE_TIMEOUT_SECS", "0")])).is_err());
        assert!(AppConfig::from_lookup(lookup_from(&[("SCHEDULER_HINT_POLICY", "lenient")])).is_err());
    }
}
