/// Service configuration.
///
/// Two sources:
/// - `MonitorConfig` comes from an optional TOML file and is validated once
///   at start-up. Every field has a default, so an absent file is fine.
/// - `NotifyConfig` comes from the environment (and `.env`). Missing
///   credentials are not a start-up fault; the notifier reports them on
///   each delivery attempt instead.

use serde::Deserialize;
use std::fmt;
use std::path::Path;

use crate::alert::thresholds::SeverityPolicy;
use crate::logging::LogLevel;

pub const DEFAULT_EMAILJS_ENDPOINT: &str = "https://api.emailjs.com/api/v1.0/email/send";

pub const ENV_ENDPOINT: &str = "EMAILJS_ENDPOINT";
pub const ENV_SERVICE_ID: &str = "EMAILJS_SERVICE_ID";
pub const ENV_TEMPLATE_ID: &str = "EMAILJS_TEMPLATE_ID";
pub const ENV_USER_ID: &str = "EMAILJS_USER_ID";
pub const ENV_RECIPIENT: &str = "ALERT_RECIPIENT";

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub enum ConfigError {
    Read { path: String, source: std::io::Error },
    Parse { path: String, message: String },
    Invalid(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Read { path, source } => write!(f, "cannot read config {}: {}", path, source),
            ConfigError::Parse { path, message } => write!(f, "cannot parse config {}: {}", path, message),
            ConfigError::Invalid(msg) => write!(f, "invalid config: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Read { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Monitor configuration (TOML)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Seconds between readings.
    pub tick_interval_secs: u64,
    /// Maximum readings kept in memory; the oldest are dropped first.
    pub history_capacity: usize,
    /// CSV of readings loaded into history before the first tick.
    pub seed_csv: Option<String>,
    /// CSV every labeled reading is appended to.
    pub log_csv: Option<String>,
    pub log_file: Option<String>,
    pub log_level: String,
    /// Seconds to wait at shutdown for alert deliveries still running.
    pub drain_timeout_secs: u64,
    pub severity: SeverityPolicy,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            tick_interval_secs: 5,
            history_capacity: 500,
            seed_csv: None,
            log_csv: None,
            log_file: None,
            log_level: "info".to_string(),
            drain_timeout_secs: 15,
            severity: SeverityPolicy::default(),
        }
    }
}

impl MonitorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval_secs == 0 {
            return Err(ConfigError::Invalid("tick_interval_secs must be at least 1".into()));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::Invalid("history_capacity must be at least 1".into()));
        }
        if LogLevel::parse(&self.log_level).is_none() {
            return Err(ConfigError::Invalid(format!("unknown log_level {:?}", self.log_level)));
        }
        self.severity.check().map_err(ConfigError::Invalid)
    }

    pub fn log_level(&self) -> LogLevel {
        LogLevel::parse(&self.log_level).unwrap_or(LogLevel::Info)
    }
}

pub fn parse_config(raw: &str, path: &str) -> Result<MonitorConfig, ConfigError> {
    let config: MonitorConfig = toml::from_str(raw).map_err(|e| ConfigError::Parse {
        path: path.to_string(),
        message: e.to_string(),
    })?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: impl AsRef<Path>) -> Result<MonitorConfig, ConfigError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path_str.clone(),
        source,
    })?;
    parse_config(&raw, &path_str)
}

// ---------------------------------------------------------------------------
// Notification configuration (environment)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct NotifyConfig {
    pub endpoint: String,
    pub service_id: Option<String>,
    pub template_id: Option<String>,
    pub user_id: Option<String>,
    pub recipient: Option<String>,
    pub timeout_secs: u64,
}

impl NotifyConfig {
    /// Reads the EmailJS settings, honouring a `.env` file if present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Blank values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        Self {
            endpoint: get(ENV_ENDPOINT).unwrap_or_else(|| DEFAULT_EMAILJS_ENDPOINT.to_string()),
            service_id: get(ENV_SERVICE_ID),
            template_id: get(ENV_TEMPLATE_ID),
            user_id: get(ENV_USER_ID),
            recipient: get(ENV_RECIPIENT),
            timeout_secs: 10,
        }
    }

    /// Names of the required variables that are not set.
    pub fn missing(&self) -> Vec<&'static str> {
        [
            (ENV_SERVICE_ID, &self.service_id),
            (ENV_TEMPLATE_ID, &self.template_id),
            (ENV_USER_ID, &self.user_id),
            (ENV_RECIPIENT, &self.recipient),
        ]
        .into_iter()
        .filter(|(_, value)| value.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    // --- MonitorConfig ------------------------------------------------------

    #[test]
    fn test_empty_file_yields_defaults() {
        let config = parse_config("", "empty.toml").expect("empty config should parse");
        assert_eq!(config, MonitorConfig::default());
        assert_eq!(config.severity, SeverityPolicy { warning_at: 50.0, critical_at: 120.0 });
    }

    #[test]
    fn test_partial_file_overrides_only_given_fields() {
        let raw = r#"
            tick_interval_secs = 2
            log_csv = "data/prediction_log.csv"

            [severity]
            critical_at = 150.0
        "#;
        let config = parse_config(raw, "partial.toml").expect("partial config should parse");
        assert_eq!(config.tick_interval_secs, 2);
        assert_eq!(config.history_capacity, 500);
        assert_eq!(config.drain_timeout_secs, 15);
        assert_eq!(config.log_csv.as_deref(), Some("data/prediction_log.csv"));
        assert_eq!(config.severity.warning_at, 50.0);
        assert_eq!(config.severity.critical_at, 150.0);
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            parse_config("tick_interval_secs = 0", "x.toml"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_config("history_capacity = 0", "x.toml"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_config("log_level = \"chatty\"", "x.toml"),
            Err(ConfigError::Invalid(_))
        ));
        assert!(matches!(
            parse_config("[severity]\nwarning_at = 200.0", "x.toml"),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn test_malformed_toml_is_a_parse_error() {
        let err = parse_config("tick_interval_secs = \"soon\"", "bad.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Parse { ref path, .. } if path == "bad.toml"));
    }

    #[test]
    fn test_shipped_sample_config_is_valid() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/disaster_sense.toml");
        let config = load_config(path).expect("sample config should load");
        assert_eq!(config.severity, SeverityPolicy::default());
        assert_eq!(config.log_csv.as_deref(), Some("data/prediction_log.csv"));
    }

    #[test]
    fn test_missing_file_is_a_read_error() {
        let err = load_config("/nonexistent/disaster_sense.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    // --- NotifyConfig -------------------------------------------------------

    #[test]
    fn test_notify_config_defaults_endpoint_and_reports_missing() {
        let config = NotifyConfig::from_lookup(lookup_from(&[(ENV_SERVICE_ID, "service_1")]));
        assert_eq!(config.endpoint, DEFAULT_EMAILJS_ENDPOINT);
        assert_eq!(config.service_id.as_deref(), Some("service_1"));
        assert_eq!(config.missing(), vec![ENV_TEMPLATE_ID, ENV_USER_ID, ENV_RECIPIENT]);
    }

    #[test]
    fn test_blank_values_count_as_unset() {
        let config = NotifyConfig::from_lookup(lookup_from(&[
            (ENV_SERVICE_ID, "  "),
            (ENV_ENDPOINT, ""),
        ]));
        assert!(config.service_id.is_none());
        assert_eq!(config.endpoint, DEFAULT_EMAILJS_ENDPOINT);
    }

    #[test]
    fn test_fully_configured_has_nothing_missing() {
        let config = NotifyConfig::from_lookup(lookup_from(&[
            (ENV_ENDPOINT, "http://127.0.0.1:9/send"),
            (ENV_SERVICE_ID, "service_1"),
            (ENV_TEMPLATE_ID, "template_1"),
            (ENV_USER_ID, "user_1"),
            (ENV_RECIPIENT, "ops@example.com"),
        ]));
        assert!(config.missing().is_empty());
        assert_eq!(config.endpoint, "http://127.0.0.1:9/send");
    }
}
