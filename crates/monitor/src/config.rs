//! Monitor configuration loaded from environment variables.
//!
//! [`MonitorConfig::from_env`] reads and validates every setting; empty
//! variables count as unset. The binary loads a `.env` file first.

use std::str::FromStr;
use std::time::Duration;

use carewatch_core::paths::{ALERTS_PATH, DEVICE_HISTORY_PATH};
use carewatch_events::NotificationPolicy;
use carewatch_feed::ReconnectConfig;
use validator::{Validate, ValidationErrors};

/// Default ceiling for the transport's reconnect backoff.
const DEFAULT_RECONNECT_MAX_DELAY_SECS: u64 = 30;

/// Errors raised while loading [`MonitorConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} environment variable is required")]
    Missing(&'static str),

    #[error("{var} is invalid: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error("Configuration failed validation: {0}")]
    Validation(#[from] ValidationErrors),
}

/// Log output format for the binary.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("expected 'text' or 'json', got '{other}'")),
        }
    }
}

/// Monitor configuration loaded from environment variables.
#[derive(Debug, Clone, Validate)]
pub struct MonitorConfig {
    /// Realtime Database URL.
    #[validate(url)]
    pub rtdb_url: String,
    /// Database secret or ID token, sent with every stream request.
    pub rtdb_auth: Option<String>,
    /// Keyed device history collection.
    #[validate(length(min = 1))]
    pub device_path: String,
    /// Keyed alerts collection.
    #[validate(length(min = 1))]
    pub alerts_path: String,
    /// Per-sensor notification debounce window; `0` disables it.
    #[validate(range(max = 3600))]
    pub notify_debounce_secs: u64,
    /// Upper bound on the reconnect delay.
    #[validate(range(min = 1, max = 3600))]
    pub reconnect_max_delay_secs: u64,
    pub log_format: LogFormat,
}

impl MonitorConfig {
    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Required | Default                  |
    /// |----------------------------|----------|--------------------------|
    /// | `RTDB_URL`                 | yes      | --                       |
    /// | `RTDB_AUTH`                | no       | none                     |
    /// | `DEVICE_PATH`              | no       | `elderlyDevice1/history` |
    /// | `ALERTS_PATH`              | no       | `alerts`                 |
    /// | `NOTIFY_DEBOUNCE_SECS`     | no       | `0` (off)                |
    /// | `RECONNECT_MAX_DELAY_SECS` | no       | `30`                     |
    /// | `LOG_FORMAT`               | no       | `text`                   |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Load configuration through `lookup`. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| {
            lookup(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let rtdb_url = get("RTDB_URL").ok_or(ConfigError::Missing("RTDB_URL"))?;

        let config = Self {
            rtdb_url,
            rtdb_auth: get("RTDB_AUTH"),
            device_path: get("DEVICE_PATH").unwrap_or_else(|| DEVICE_HISTORY_PATH.into()),
            alerts_path: get("ALERTS_PATH").unwrap_or_else(|| ALERTS_PATH.into()),
            notify_debounce_secs: parse_var("NOTIFY_DEBOUNCE_SECS", get("NOTIFY_DEBOUNCE_SECS"), 0)?,
            reconnect_max_delay_secs: parse_var(
                "RECONNECT_MAX_DELAY_SECS",
                get("RECONNECT_MAX_DELAY_SECS"),
                DEFAULT_RECONNECT_MAX_DELAY_SECS,
            )?,
            log_format: parse_var("LOG_FORMAT", get("LOG_FORMAT"), LogFormat::Text)?,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn notification_policy(&self) -> NotificationPolicy {
        NotificationPolicy::with_debounce(Duration::from_secs(self.notify_debounce_secs))
    }

    pub fn reconnect_config(&self) -> ReconnectConfig {
        ReconnectConfig::with_max_delay(Duration::from_secs(self.reconnect_max_delay_secs))
    }
}

fn parse_var<T>(var: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            var,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> Result<MonitorConfig, ConfigError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        MonitorConfig::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn defaults_apply_when_only_url_is_set() {
        let config = load(&[("RTDB_URL", "https://demo.firebasedatabase.app")]).unwrap();

        assert_eq!(config.device_path, "elderlyDevice1/history");
        assert_eq!(config.alerts_path, "alerts");
        assert_eq!(config.rtdb_auth, None);
        assert_eq!(config.notify_debounce_secs, 0);
        assert_eq!(config.reconnect_max_delay_secs, 30);
        assert_eq!(config.log_format, LogFormat::Text);
        assert_eq!(config.notification_policy().debounce, None);
        assert_eq!(config.reconnect_config().max_delay, Duration::from_secs(30));
    }

    #[test]
    fn missing_url_is_reported() {
        assert_matches!(load(&[]), Err(ConfigError::Missing("RTDB_URL")));
        assert_matches!(
            load(&[("RTDB_URL", "  ")]),
            Err(ConfigError::Missing("RTDB_URL"))
        );
    }

    #[test]
    fn malformed_url_fails_validation() {
        assert_matches!(
            load(&[("RTDB_URL", "not a url")]),
            Err(ConfigError::Validation(_))
        );
    }

    #[test]
    fn overrides_are_parsed() {
        let config = load(&[
            ("RTDB_URL", "https://demo.firebasedatabase.app"),
            ("RTDB_AUTH", "secret"),
            ("DEVICE_PATH", "elderlyDevice2/history"),
            ("NOTIFY_DEBOUNCE_SECS", "10"),
            ("RECONNECT_MAX_DELAY_SECS", "5"),
            ("LOG_FORMAT", "JSON"),
        ])
        .unwrap();

        assert_eq!(config.rtdb_auth.as_deref(), Some("secret"));
        assert_eq!(config.device_path, "elderlyDevice2/history");
        assert_eq!(
            config.notification_policy().debounce,
            Some(Duration::from_secs(10))
        );
        assert_eq!(config.reconnect_config().max_delay, Duration::from_secs(5));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn unparseable_numbers_name_the_variable() {
        assert_matches!(
            load(&[
                ("RTDB_URL", "https://demo.firebasedatabase.app"),
                ("NOTIFY_DEBOUNCE_SECS", "soon"),
            ]),
            Err(ConfigError::Invalid { var: "NOTIFY_DEBOUNCE_SECS", .. })
        );
        assert_matches!(
            load(&[
                ("RTDB_URL", "https://demo.firebasedatabase.app"),
                ("LOG_FORMAT", "xml"),
            ]),
            Err(ConfigError::Invalid { var: "LOG_FORMAT", .. })
        );
    }

    #[test]
    fn out_of_range_values_fail_validation() {
        assert_matches!(
            load(&[
                ("RTDB_URL", "https://demo.firebasedatabase.app"),
                ("RECONNECT_MAX_DELAY_SECS", "0"),
            ]),
            Err(ConfigError::Validation(_))
        );
    }
}
